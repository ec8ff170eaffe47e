use std::time::{Duration, Instant};

use bytes::Bytes;
use serde::de::DeserializeOwned;
use uuid::Uuid;
use warp::{
    http::StatusCode,
    reject,
    reply::{json, with_header, with_status, Reply},
};

use crate::environment::Environment;
use crate::errors::BackendError;
use crate::gear::{GearPatch, NewGear};
use crate::log::debug;
use crate::routes::{
    rejection::{Context, Rejection},
    response::SuccessResponse,
};

const SERVER_TIMING_HEADER: &str = "server-timing";
const DELETED_MESSAGE: &str = "Gear deleted";

type RouteResult = Result<Box<dyn Reply>, reject::Rejection>;

macro_rules! timed {
    ($($expression:stmt);+) => {
        let start = Instant::now();

        // TODO when `try` blocks are stabilized, we can wrap the body
        // and return the headers even on errors
        let result = { $($expression)+ };

        Ok(Box::new(with_header(
            result,
            SERVER_TIMING_HEADER,
            format_server_timing(start.elapsed()),
        )) as Box<dyn Reply>)
    };
}

pub async fn list(environment: Environment) -> RouteResult {
    timed! {
        let gear = environment
            .repository
            .list()
            .await
            .map_err(|e: BackendError| Rejection::new(Context::list(), e))?;

        debug!(environment.logger, "Listed gear"; "count" => gear.len());

        json(&gear)
    }
}

pub async fn create(environment: Environment, body: Bytes) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::create(), e);

        let fields: NewGear = parse_body(&body).map_err(error_handler)?;

        let gear = environment
            .repository
            .create(fields)
            .await
            .map_err(error_handler)?;
        debug!(environment.logger, "Created gear"; "id" => %gear.id);

        with_status(json(&gear), StatusCode::CREATED)
    }
}

pub async fn retrieve(environment: Environment, id: String) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::retrieve(id.clone()), e);

        let id = parse_id(&id).map_err(error_handler)?;
        debug!(environment.logger, "Retrieving gear..."; "id" => %id);

        let gear = environment
            .repository
            .find_by_id(&id)
            .await
            .map_err(error_handler)?;

        json(&gear)
    }
}

pub async fn update(environment: Environment, id: String, body: Bytes) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::update(id.clone()), e);

        let id = parse_id(&id).map_err(error_handler)?;
        let patch: GearPatch = parse_body(&body).map_err(error_handler)?;
        debug!(environment.logger, "Updating gear..."; "id" => %id);

        let gear = environment
            .repository
            .update(&id, patch)
            .await
            .map_err(error_handler)?;

        json(&gear)
    }
}

pub async fn delete(environment: Environment, id: String) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::delete(id.clone()), e);

        let id = parse_id(&id).map_err(error_handler)?;
        debug!(environment.logger, "Deleting gear..."; "id" => %id);

        environment
            .repository
            .delete_by_id(&id)
            .await
            .map_err(error_handler)?;

        json(&SuccessResponse::Message {
            message: DELETED_MESSAGE,
        })
    }
}

/// An ID that can't be parsed can't match anything, so it's treated like
/// an unknown one.
fn parse_id(id: &str) -> Result<Uuid, BackendError> {
    Uuid::parse_str(id).map_err(|_| BackendError::InvalidId(id.to_owned()))
}

/// An empty body is read as an object with no fields.
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, BackendError> {
    if body.is_empty() {
        return Ok(T::default());
    }

    serde_json::from_slice(body).map_err(|source| BackendError::MalformedBody { source })
}

fn format_server_timing(seconds: Duration) -> String {
    format!("handler;dur={}", seconds.as_secs_f64() * 1000.0)
}
