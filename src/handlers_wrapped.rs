use chrono::Datelike;
use serde::Deserialize;
use warp::{Filter, Rejection, Reply};

use crate::compositor;
use crate::error::BoxdError;
use crate::film::DiaryFilter;
use crate::warp_helpers::{jpeg_reply, run_blocking, with_state, AppState};
use crate::wrapped::{build_wrapped, LayoutStyle, WrappedOptions};

#[derive(Debug, Deserialize)]
pub struct WrappedQuery {
    pub username: String,
    pub month: Option<u32>,
    pub year: Option<i32>,
    #[serde(rename = "show-ratings", default)]
    pub show_ratings: bool,
    pub style: Option<String>,
}

pub async fn get_wrapped(query: WrappedQuery, state: AppState) -> Result<impl Reply, Rejection> {
    let today = chrono::Utc::now().date_naive();
    let mut options = WrappedOptions::new(
        query.month.unwrap_or_else(|| today.month()),
        query.year.unwrap_or_else(|| today.year()),
    );
    options.show_ratings = query.show_ratings;
    options.style = query
        .style
        .as_deref()
        .and_then(|s| s.parse::<LayoutStyle>().ok())
        .unwrap_or(LayoutStyle::Scatter);
    let username = query.username;

    let bytes = run_blocking(move || {
        let mut user = state.user_for(&username, DiaryFilter::default());
        let image = build_wrapped(&mut user, &state.resolver, &options)?;
        compositor::encode_jpeg(&image, 95)
            .map_err(|e| BoxdError::Transport(format!("jpeg encoding failed: {}", e)))
    })
    .await?;

    Ok(jpeg_reply(bytes))
}

pub fn build_wrapped_routes(
    state: AppState,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path("api")
        .and(warp::path("wrapped"))
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<WrappedQuery>())
        .and(with_state(state))
        .and_then(get_wrapped)
}
