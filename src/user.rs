use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use log::{debug, info};

use crate::diary_parser::{parse_diary_page, DiaryPage};
use crate::error::{BoxdError, BoxdResult};
use crate::fetch::Fetch;
use crate::film::{DiaryEntry, DiaryFilter};
use crate::profile_parser::{parse_profile, Profile};

/// Explicit lazy-load state for memoized remote data.
#[derive(Debug, Clone)]
pub enum Lazy<T> {
    Unfetched,
    Fetched(T),
    Failed(String),
}

/// Per-user diary repository.
///
/// Diary pages are fetched sequentially, memoized by page number and never
/// re-fetched. A page without rows marks the end of pagination. Profile
/// metadata is loaded once on demand.
pub struct LetterboxdUser {
    username: String,
    profile_url: String,
    fetcher: Arc<dyn Fetch>,
    page_delay: Duration,
    filter: DiaryFilter,
    profile: Lazy<Profile>,
    pages: BTreeMap<u32, Vec<DiaryEntry>>,
    first_missing_page: Option<u32>,
}

impl LetterboxdUser {
    pub fn new(
        username: impl Into<String>,
        base_url: &str,
        fetcher: Arc<dyn Fetch>,
        page_delay: Duration,
    ) -> Self {
        let username = username.into();
        let profile_url = format!("{}/{}", base_url.trim_end_matches('/'), username);
        Self {
            username,
            profile_url,
            fetcher,
            page_delay,
            filter: DiaryFilter::default(),
            profile: Lazy::Unfetched,
            pages: BTreeMap::new(),
            first_missing_page: None,
        }
    }

    pub fn with_filter(mut self, filter: DiaryFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn profile_url(&self) -> &str {
        &self.profile_url
    }

    pub fn filter(&self) -> DiaryFilter {
        self.filter
    }

    /// Profile metadata, fetched once. A missing or unreadable profile
    /// yields safe fallback values; only transport failures propagate.
    pub fn profile(&mut self) -> BoxdResult<Profile> {
        if let Lazy::Unfetched = self.profile {
            self.profile = self.load_profile()?;
        }
        Ok(match &self.profile {
            Lazy::Fetched(profile) => profile.clone(),
            _ => Profile::fallback(&self.username),
        })
    }

    fn load_profile(&self) -> BoxdResult<Lazy<Profile>> {
        info!("fetching profile for {}", self.username);
        let response = self.fetcher.get(&self.profile_url)?;
        if !response.is_success() {
            return Ok(Lazy::Failed(format!(
                "profile fetch returned {}",
                response.status
            )));
        }
        Ok(match parse_profile(&response.text()) {
            Some(profile) => Lazy::Fetched(profile),
            None => Lazy::Failed("no recognizable profile markup".to_string()),
        })
    }

    /// Entries on the given diary page (1-based), or `None` once pagination
    /// is exhausted. Each page is fetched at most once.
    pub fn entries(&mut self, page: u32) -> BoxdResult<Option<&[DiaryEntry]>> {
        if let Some(first_missing) = self.first_missing_page {
            if page >= first_missing {
                return Ok(None);
            }
        }
        if !self.pages.contains_key(&page) {
            match self.fetch_page(page)? {
                DiaryPage::Entries(entries) => {
                    self.pages.insert(page, entries);
                }
                DiaryPage::NoMorePages => {
                    debug!("diary page {} of {} does not exist", page, self.username);
                    self.first_missing_page = Some(page);
                    return Ok(None);
                }
            }
        }
        Ok(self.pages.get(&page).map(Vec::as_slice))
    }

    fn fetch_page(&mut self, page: u32) -> BoxdResult<DiaryPage> {
        // Fixed delay between real requests so paging through a long diary
        // does not hammer the source.
        if !self.page_delay.is_zero() && !self.pages.is_empty() {
            std::thread::sleep(self.page_delay);
        }
        info!("fetching diary page {} for {}", page, self.username);
        let url = format!("{}/films/diary/page/{}/", self.profile_url, page);
        let response = self.fetcher.get(&url)?;
        if response.status == 404 {
            if page == 1 {
                return Err(BoxdError::UserNotFound(self.username.clone()));
            }
            return Ok(DiaryPage::NoMorePages);
        }
        if !response.is_success() {
            return Err(BoxdError::Transport(format!(
                "diary page {} returned {}",
                page, response.status
            )));
        }
        Ok(parse_diary_page(&response.text(), page))
    }

    /// Same as [`entries`](Self::entries) with the configured filter applied.
    pub fn entries_filtered(&mut self, page: u32) -> BoxdResult<Option<Vec<DiaryEntry>>> {
        let filter = self.filter;
        Ok(self.entries(page)?.map(|entries| {
            entries
                .iter()
                .filter(|e| !filter.excludes(e))
                .cloned()
                .collect()
        }))
    }

    /// Collect filtered entries page by page until `needed` are available or
    /// pagination ends, capped at `max_pages`.
    pub fn collect_entries(&mut self, needed: usize, max_pages: u32) -> BoxdResult<Vec<DiaryEntry>> {
        let mut collected = Vec::new();
        for page in 1..=max_pages {
            match self.entries_filtered(page)? {
                Some(entries) => collected.extend(entries),
                None => break,
            }
            if collected.len() >= needed {
                break;
            }
        }
        collected.truncate(needed);
        Ok(collected)
    }

    /// The prefix of page-1 entries watched on or after `cutoff`. Entries
    /// are reverse-chronological, so this is a linear prefix scan that stops
    /// at the first older entry.
    pub fn entries_until(&mut self, cutoff: NaiveDate) -> BoxdResult<Vec<DiaryEntry>> {
        let entries = self.entries(1)?.unwrap_or(&[]);
        Ok(entries
            .iter()
            .take_while(|e| e.watched >= cutoff)
            .cloned()
            .collect())
    }

    /// Page-1 entries from the last `since_days` days before `today`.
    pub fn recent_entries(&mut self, since_days: i64, today: NaiveDate) -> BoxdResult<Vec<DiaryEntry>> {
        self.entries_until(today - chrono::Duration::days(since_days))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;
    use crate::fetch::FetchResponse;

    struct StubFetch {
        responses: Mutex<std::collections::HashMap<String, String>>,
        hits: AtomicUsize,
    }

    impl StubFetch {
        fn new(pages: &[(u32, String)]) -> Self {
            let mut responses = std::collections::HashMap::new();
            for (page, html) in pages {
                responses.insert(
                    format!("https://example.test/alice/films/diary/page/{}/", page),
                    html.clone(),
                );
            }
            Self {
                responses: Mutex::new(responses),
                hits: AtomicUsize::new(0),
            }
        }

        fn hits(&self) -> usize {
            self.hits.load(Ordering::SeqCst)
        }
    }

    impl Fetch for StubFetch {
        fn get(&self, url: &str) -> BoxdResult<FetchResponse> {
            self.hits.fetch_add(1, Ordering::SeqCst);
            let responses = self.responses.lock().unwrap();
            match responses.get(url) {
                Some(html) => Ok(FetchResponse {
                    status: 200,
                    content_type: "text/html".to_string(),
                    body: html.clone().into_bytes(),
                }),
                None => Ok(FetchResponse {
                    status: 404,
                    content_type: String::new(),
                    body: Vec::new(),
                }),
            }
        }
    }

    fn row(day: u32, calendar: Option<(&str, i32)>, slug: &str, category: Option<&str>) -> String {
        let calendar_html = match calendar {
            Some((month, year)) => format!(
                r#"<td class="td-calendar"><div class="date"><strong>{month}</strong> <small>{year}</small></div></td>"#
            ),
            None => r#"<td class="td-calendar"></td>"#.to_string(),
        };
        let category_html = category
            .map(|c| format!(r#"<span class="film-category">{c}</span>"#))
            .unwrap_or_default();
        format!(
            r##"<tr class="diary-entry-row">
              {calendar_html}
              <td class="td-day"><a href="#">{day}</a></td>
              <td class="td-film-details"><h3 class="headline-3"><a href="#">Film {slug}</a></h3>{category_html}<div class="film-poster" data-film-slug="{slug}"></div></td>
              <td class="td-released">2001</td>
              <td class="td-rating"><span class="rating">★★★</span></td>
              <td class="td-like"></td>
              <td class="td-rewatch center icon-status-off"></td>
            </tr>"##
        )
    }

    fn page_html(rows: &[String]) -> String {
        format!("<html><body><table>{}</table></body></html>", rows.join("\n"))
    }

    fn empty_page() -> String {
        "<html><body><table></table></body></html>".to_string()
    }

    fn user_with(pages: &[(u32, String)]) -> (LetterboxdUser, Arc<StubFetch>) {
        let fetcher = Arc::new(StubFetch::new(pages));
        let user = LetterboxdUser::new(
            "alice",
            "https://example.test",
            fetcher.clone(),
            Duration::ZERO,
        );
        (user, fetcher)
    }

    #[test]
    fn pages_are_memoized() {
        let page1 = page_html(&[
            row(5, Some(("Mar", 2024)), "one", None),
            row(4, None, "two", None),
        ]);
        let (mut user, fetcher) = user_with(&[(1, page1)]);

        assert_eq!(user.entries(1).unwrap().unwrap().len(), 2);
        assert_eq!(user.entries(1).unwrap().unwrap().len(), 2);
        assert_eq!(fetcher.hits(), 1);
    }

    #[test]
    fn missing_page_terminates_pagination_without_refetch() {
        let page1 = page_html(&[row(5, Some(("Mar", 2024)), "one", None)]);
        let (mut user, fetcher) = user_with(&[(1, page1), (2, empty_page())]);

        assert!(user.entries(1).unwrap().is_some());
        assert!(user.entries(2).unwrap().is_none());
        assert!(user.entries(2).unwrap().is_none());
        assert!(user.entries(3).unwrap().is_none());
        assert_eq!(fetcher.hits(), 2);
    }

    #[test]
    fn missing_user_is_not_found() {
        let (mut user, _) = user_with(&[]);
        match user.entries(1) {
            Err(BoxdError::UserNotFound(name)) => assert_eq!(name, "alice"),
            other => panic!("expected UserNotFound, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn entries_until_is_an_idempotent_prefix() {
        let page1 = page_html(&[
            row(20, Some(("Mar", 2024)), "newest", None),
            row(12, None, "mid", None),
            row(2, None, "old", None),
        ]);
        let (mut user, _) = user_with(&[(1, page1)]);

        let cutoff = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let first = user.entries_until(cutoff).unwrap();
        let second = user.entries_until(cutoff).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);

        let all = user.entries(1).unwrap().unwrap().to_vec();
        assert_eq!(&all[..2], &first[..]);
        assert_eq!(
            first.len(),
            all.iter().filter(|e| e.watched >= cutoff).count()
        );
    }

    #[test]
    fn filter_drops_only_matching_categories_in_order() {
        let page1 = page_html(&[
            row(9, Some(("Mar", 2024)), "feature-a", None),
            row(8, None, "short-b", Some("Short")),
            row(7, None, "feature-c", None),
            row(6, None, "tv-d", Some("TV")),
        ]);
        let (mut user, _) = user_with(&[(1, page1)]);
        user = user.with_filter(DiaryFilter {
            hide_shorts: true,
            ..Default::default()
        });

        let filtered = user.entries_filtered(1).unwrap().unwrap();
        let slugs: Vec<&str> = filtered.iter().map(|e| e.film.slug.as_str()).collect();
        assert_eq!(slugs, vec!["feature-a", "feature-c", "tv-d"]);
    }

    #[test]
    fn collect_entries_spans_pages_and_truncates() {
        let page1 = page_html(&[
            row(5, Some(("Mar", 2024)), "one", None),
            row(4, None, "two", None),
        ]);
        let page2 = page_html(&[
            row(28, Some(("Feb", 2024)), "three", None),
            row(27, None, "four", None),
        ]);
        let (mut user, _) = user_with(&[(1, page1), (2, page2), (3, empty_page())]);

        let collected = user.collect_entries(3, 10).unwrap();
        let slugs: Vec<&str> = collected.iter().map(|e| e.film.slug.as_str()).collect();
        assert_eq!(slugs, vec!["one", "two", "three"]);
    }

    #[test]
    fn profile_failure_falls_back_to_defaults() {
        let (mut user, _) = user_with(&[]);
        let profile = user.profile().unwrap();
        assert_eq!(profile.display_name, "alice");
        assert_eq!(profile.total_films, 0);
    }
}
