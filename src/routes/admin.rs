use warp::reject;
use warp::reply::{json, Reply};
use warp::Filter;

use super::response::SuccessResponse;
use crate::log;

/// Reports the build that's running.
pub fn make_healthz_route(
) -> impl warp::Filter<Extract = (impl Reply,), Error = reject::Rejection> + Clone {
    warp::path("healthz")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| {
            json(&SuccessResponse::Healthz {
                revision: log::REVISION,
                timestamp: log::BUILD_TIMESTAMP,
                version: log::VERSION,
            })
        })
}
