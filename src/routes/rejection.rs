use serde::Serialize;
use warp::reject;

use crate::errors::BackendError;

#[derive(Debug)]
pub struct Rejection {
    pub(crate) context: Context,
    pub(crate) error: BackendError,
}

impl Rejection {
    pub fn new(context: Context, error: BackendError) -> Self {
        Rejection { context, error }
    }

    pub fn flatten(&self) -> FlattenedRejection {
        FlattenedRejection {
            message: format!("{}", self.error),
        }
    }
}

impl reject::Reject for Rejection {}

/// The body sent back for every failed request.
#[derive(Debug, Serialize)]
pub struct FlattenedRejection {
    pub(crate) message: String,
}

/// What the request was trying to do. Only logged.
#[derive(Clone, Debug)]
pub enum Context {
    Create,
    Delete { id: String },
    List,
    Retrieve { id: String },
    Update { id: String },
}

impl Context {
    pub fn create() -> Context {
        Context::Create
    }

    pub fn delete(id: String) -> Context {
        Context::Delete { id }
    }

    pub fn list() -> Context {
        Context::List
    }

    pub fn retrieve(id: String) -> Context {
        Context::Retrieve { id }
    }

    pub fn update(id: String) -> Context {
        Context::Update { id }
    }
}
