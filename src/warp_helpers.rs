use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use warp::{reject, Filter, Rejection, Reply};

use crate::config::Config;
use crate::error::{BoxdError, BoxdResult};
use crate::fetch::Fetch;
use crate::film::DiaryFilter;
use crate::poster_resolver::PosterResolver;
use crate::user::LetterboxdUser;

/// Shared handler state: configuration plus the long-lived fetcher and
/// poster resolver. Users are cheap and constructed per request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub fetcher: Arc<dyn Fetch>,
    pub resolver: Arc<PosterResolver>,
}

impl AppState {
    pub fn user_for(&self, username: &str, filter: DiaryFilter) -> LetterboxdUser {
        LetterboxdUser::new(
            username,
            &self.config.base_url,
            self.fetcher.clone(),
            Duration::from_millis(self.config.page_delay_ms),
        )
        .with_filter(filter)
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    pub timestamp: String,
}

#[derive(Debug)]
pub struct ScrapeFailure {
    pub error: BoxdError,
}

impl reject::Reject for ScrapeFailure {}

pub fn reject_with(error: BoxdError) -> Rejection {
    reject::custom(ScrapeFailure { error })
}

pub fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// Run a blocking core call off the async runtime and translate its errors
/// into rejections.
pub async fn run_blocking<T, F>(task: F) -> Result<T, Rejection>
where
    F: FnOnce() -> BoxdResult<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(task).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => Err(reject_with(error)),
        Err(join_error) => Err(reject_with(BoxdError::Transport(format!(
            "worker task failed: {}",
            join_error
        )))),
    }
}

pub fn jpeg_reply(bytes: Vec<u8>) -> impl Reply {
    let reply = warp::reply::with_header(bytes, "content-type", "image/jpeg");
    warp::reply::with_header(reply, "cache-control", "public, max-age=3600")
}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let code;
    let message;
    let timestamp = chrono::Utc::now().to_rfc3339();

    if err.is_not_found() {
        code = warp::http::StatusCode::NOT_FOUND;
        message = "Not Found".to_string();
    } else if let Some(failure) = err.find::<ScrapeFailure>() {
        match &failure.error {
            BoxdError::UserNotFound(_) | BoxdError::NothingToRender(_) => {
                code = warp::http::StatusCode::NOT_FOUND;
                message = failure.error.to_string();
            }
            BoxdError::InvalidRequest(_) => {
                code = warp::http::StatusCode::BAD_REQUEST;
                message = failure.error.to_string();
            }
            BoxdError::Transport(_) => {
                code = warp::http::StatusCode::BAD_GATEWAY;
                message = failure.error.to_string();
            }
        }
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        code = warp::http::StatusCode::BAD_REQUEST;
        message = "Invalid query parameters".to_string();
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        code = warp::http::StatusCode::METHOD_NOT_ALLOWED;
        message = "Method not allowed".to_string();
    } else {
        log::error!("Unhandled rejection: {:?}", err);
        code = warp::http::StatusCode::INTERNAL_SERVER_ERROR;
        message = "Internal server error".to_string();
    }

    let error_response = ErrorResponse {
        error: message,
        code: code.as_u16(),
        timestamp,
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&error_response),
        code,
    ))
}

pub fn cors() -> warp::cors::Builder {
    warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type"])
        .allow_methods(vec!["GET", "OPTIONS"])
}
