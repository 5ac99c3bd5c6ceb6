use serde::{Deserialize, Serialize};
use warp::{Filter, Rejection, Reply};

use crate::film::{DiaryEntry, DiaryFilter};
use crate::warp_helpers::{run_blocking, with_state, AppState};

#[derive(Debug, Deserialize)]
pub struct DiaryQuery {
    pub username: String,
    #[serde(rename = "since-days")]
    pub since_days: Option<i64>,
    #[serde(rename = "hide-shorts", default)]
    pub hide_shorts: bool,
    #[serde(rename = "hide-tv", default)]
    pub hide_tv: bool,
    #[serde(rename = "hide-docs", default)]
    pub hide_docs: bool,
    #[serde(rename = "only-films", default)]
    pub only_films: bool,
}

impl DiaryQuery {
    pub fn filter(&self) -> DiaryFilter {
        DiaryFilter {
            hide_shorts: self.hide_shorts,
            hide_tv: self.hide_tv,
            hide_docs: self.hide_docs,
            only_films: self.only_films,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DiaryEntryDto {
    pub title: String,
    pub year: Option<i32>,
    pub slug: String,
    pub watched: String,
    pub rating: Option<f32>,
    pub liked: bool,
    pub rewatch: bool,
}

impl From<&DiaryEntry> for DiaryEntryDto {
    fn from(entry: &DiaryEntry) -> Self {
        DiaryEntryDto {
            title: entry.film.title.clone(),
            year: entry.film.year,
            slug: entry.film.slug.clone(),
            watched: entry.watched.to_string(),
            rating: entry.rating.stars(),
            liked: entry.liked,
            rewatch: entry.rewatch,
        }
    }
}

pub async fn get_diary(query: DiaryQuery, state: AppState) -> Result<impl Reply, Rejection> {
    let since_days = query.since_days.unwrap_or(30).clamp(1, 365);
    let filter = query.filter();
    let username = query.username;

    let entries = run_blocking(move || {
        let mut user = state.user_for(&username, filter);
        let today = chrono::Utc::now().date_naive();
        let entries = user.recent_entries(since_days, today)?;
        Ok(entries
            .iter()
            .filter(|e| !filter.excludes(e))
            .map(DiaryEntryDto::from)
            .collect::<Vec<_>>())
    })
    .await?;

    Ok(warp::reply::json(&entries))
}

#[derive(Debug, Deserialize)]
pub struct ProfileQuery {
    pub username: String,
}

pub async fn get_profile(query: ProfileQuery, state: AppState) -> Result<impl Reply, Rejection> {
    let profile = run_blocking(move || {
        let mut user = state.user_for(&query.username, DiaryFilter::default());
        user.profile()
    })
    .await?;

    Ok(warp::reply::json(&profile))
}

pub fn build_diary_routes(
    state: AppState,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let diary = warp::path("api")
        .and(warp::path("diary"))
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<DiaryQuery>())
        .and(with_state(state.clone()))
        .and_then(get_diary);

    let profile = warp::path("api")
        .and(warp::path("profile"))
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<ProfileQuery>())
        .and(with_state(state))
        .and_then(get_profile);

    diary.or(profile)
}
