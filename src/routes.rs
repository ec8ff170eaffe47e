use std::sync::Arc;

use warp::http::StatusCode;
use warp::reject;
use warp::reply::{json, with_status, Json, Reply, WithStatus};
use warp::Filter;

use crate::environment::Environment;
use crate::errors::BackendError;
use crate::log::{debug, error, Logger};

pub mod admin;
mod handlers;
mod rejection;
mod response;

pub use internal::*;

/// The largest request body accepted.
const MAX_CONTENT_LENGTH: u64 = 1024 * 1024;

const NOT_FOUND_MESSAGE: &str = "Not found";

/// Combines every route, turning rejections into JSON replies and
/// allowing cross-origin calls.
pub fn make_routes(
    environment: Environment,
) -> impl Filter<Extract = (impl Reply,), Error = reject::Rejection> + Clone {
    let logger = environment.logger.clone();

    let cors = warp::cors()
        .allow_any_origin()
        .allow_header("content-type")
        .allow_methods(vec!["GET", "POST", "PUT", "DELETE"]);

    make_list_route(environment.clone())
        .or(make_create_route(environment.clone()))
        .or(make_retrieve_route(environment.clone()))
        .or(make_update_route(environment.clone()))
        .or(make_delete_route(environment))
        .or(admin::make_healthz_route())
        .recover(move |r| format_rejection(logger.clone(), r))
        .with(cors)
}

pub async fn format_rejection(
    logger: Arc<Logger>,
    rej: reject::Rejection,
) -> Result<WithStatus<Json>, reject::Rejection> {
    if let Some(r) = rej.find::<rejection::Rejection>() {
        let status = status_code_for(&r.error);

        if status.is_server_error() {
            error!(logger, "Backend error"; "context" => ?r.context, "error" => ?r.error, "status" => %status, "message" => %r.error);
        } else {
            debug!(logger, "Request failed"; "context" => ?r.context, "error" => ?r.error, "status" => %status, "message" => %r.error);
        }

        return Ok(with_status(json(&r.flatten()), status));
    }

    // combined rejections hold every route's reason, so the more specific
    // ones are checked first
    let (status, message) = if let Some(e) = rej.find::<reject::PayloadTooLarge>() {
        (StatusCode::PAYLOAD_TOO_LARGE, e.to_string())
    } else if let Some(e) = rej.find::<reject::LengthRequired>() {
        (StatusCode::LENGTH_REQUIRED, e.to_string())
    } else if let Some(e) = rej.find::<reject::MethodNotAllowed>() {
        (StatusCode::METHOD_NOT_ALLOWED, e.to_string())
    } else if rej.is_not_found() {
        (StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE.to_owned())
    } else {
        return Err(rej);
    };

    debug!(logger, "Request rejected"; "status" => %status, "message" => %message);

    Ok(with_status(
        json(&rejection::FlattenedRejection { message }),
        status,
    ))
}

fn status_code_for(e: &BackendError) -> StatusCode {
    use BackendError::*;

    match e {
        MalformedBody { .. } | MissingFields(..) | BlankField(..) => StatusCode::BAD_REQUEST,
        InvalidId(..) | NotFound(..) => StatusCode::NOT_FOUND,
        Sqlx { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

mod internal {
    use warp::body::{bytes, content_length_limit};
    use warp::filters::BoxedFilter;
    use warp::path::end;
    use warp::Filter;
    use warp::Reply;
    use warp::{delete, get as g, path as p, path::param as par, post, put};

    use super::{handlers, MAX_CONTENT_LENGTH};
    use crate::environment::Environment;

    type Route = BoxedFilter<(Box<dyn Reply>,)>;

    macro_rules! route_filter {
    ($route_variable:ident; $first:expr) => (let $route_variable = $route_variable.and($first););
    ($route_variable:ident; $first:expr, $($rest:expr),+) => (
        let $route_variable = $route_variable.and($first);
        route_filter!($route_variable; $($rest),+);
    )
}

    macro_rules! route {
    ($name:ident => $handler:ident, $route_variable:ident; $($filters:expr),+) => (
        pub fn $name(environment: Environment) -> Route {
            let $route_variable = warp::any()
                .map(move || environment.clone())
                .and(p("api"))
                .and(p("gear"));

            route_filter!($route_variable; $($filters),+);

            $route_variable.and_then(handlers::$handler)
                .boxed()
        }
    );
}

    route!(make_list_route => list, rt; end(), g());
    route!(make_create_route => create, rt; end(), post(), content_length_limit(MAX_CONTENT_LENGTH), bytes());
    route!(make_retrieve_route => retrieve, rt; par::<String>(), end(), g());
    route!(make_update_route => update, rt; par::<String>(), end(), put(), content_length_limit(MAX_CONTENT_LENGTH), bytes());
    route!(make_delete_route => delete, rt; par::<String>(), end(), delete());
}
