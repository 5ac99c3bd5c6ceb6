use serde::Deserialize;
use warp::{Filter, Rejection, Reply};

use crate::collage::build_collage;
use crate::compositor;
use crate::error::BoxdError;
use crate::film::DiaryFilter;
use crate::warp_helpers::{jpeg_reply, run_blocking, with_state, AppState};

#[derive(Debug, Deserialize)]
pub struct CollageQuery {
    pub username: String,
    pub cols: Option<u32>,
    pub rows: Option<u32>,
    #[serde(rename = "hide-shorts", default)]
    pub hide_shorts: bool,
    #[serde(rename = "hide-tv", default)]
    pub hide_tv: bool,
    #[serde(rename = "hide-docs", default)]
    pub hide_docs: bool,
    #[serde(rename = "only-films", default)]
    pub only_films: bool,
}

pub async fn get_collage(query: CollageQuery, state: AppState) -> Result<impl Reply, Rejection> {
    let cols = query.cols.unwrap_or(5);
    let rows = query.rows.unwrap_or(5);
    let filter = DiaryFilter {
        hide_shorts: query.hide_shorts,
        hide_tv: query.hide_tv,
        hide_docs: query.hide_docs,
        only_films: query.only_films,
    };
    let username = query.username;

    let bytes = run_blocking(move || {
        let mut user = state.user_for(&username, filter);
        let image = build_collage(&mut user, &state.resolver, cols, rows)?;
        compositor::encode_jpeg(&image, 95)
            .map_err(|e| BoxdError::Transport(format!("jpeg encoding failed: {}", e)))
    })
    .await?;

    Ok(jpeg_reply(bytes))
}

pub fn build_collage_routes(
    state: AppState,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path("api")
        .and(warp::path("collage"))
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<CollageQuery>())
        .and(with_state(state))
        .and_then(get_collage)
}
