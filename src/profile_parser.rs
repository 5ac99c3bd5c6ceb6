use scraper::{Html, Selector};
use serde::Serialize;

use crate::film::Film;

/// Profile metadata scraped from a user's landing page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    pub display_name: String,
    pub total_films: u32,
    pub films_this_year: u32,
    pub lists: u32,
    pub following: u32,
    pub followers: u32,
    pub pro: bool,
    pub bio: String,
    pub favorites: Vec<Film>,
}

impl Profile {
    /// Safe defaults for a user whose profile could not be read: the
    /// username is echoed back and every count is zero, so downstream
    /// rendering never has to special-case a bad username.
    pub fn fallback(username: &str) -> Self {
        Profile {
            display_name: username.to_string(),
            total_films: 0,
            films_this_year: 0,
            lists: 0,
            following: 0,
            followers: 0,
            pro: false,
            bio: String::new(),
            favorites: Vec::new(),
        }
    }
}

fn sel(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

/// Parse a profile page. Returns `None` when the document carries no
/// recognizable profile markup (deleted or mistyped username).
pub fn parse_profile(html: &str) -> Option<Profile> {
    let document = Html::parse_document(html);

    let name_sel = sel("div.profile-name-wrap h1");
    let display_name = document
        .select(&name_sel)
        .next()
        .map(|e| e.text().collect::<String>().trim().to_string())?;

    // The statistics row is a fixed-order list of counters. Non-pro
    // profiles omit the lists counter, so a four-item row means lists = 0.
    let stat_sel = sel("h4.profile-statistic");
    let mut stats: Vec<u32> = document
        .select(&stat_sel)
        .map(|e| {
            let digits: String = e
                .text()
                .collect::<String>()
                .chars()
                .filter(|c| c.is_ascii_digit())
                .collect();
            digits.parse().unwrap_or(0)
        })
        .collect();
    if stats.len() == 4 {
        stats.insert(2, 0);
    }
    while stats.len() < 5 {
        stats.push(0);
    }

    let pro = document.select(&sel("span.badge")).next().is_some();

    let bio = document
        .select(&sel("section#person-bio"))
        .next()
        .or_else(|| document.select(&sel("div.bio")).next())
        .map(|e| {
            e.text()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default();

    let fave_sel = sel("li.favourite-film-poster-container");
    let fave_img = sel("img");
    let fave_slug = sel("div[data-film-slug]");
    let favorites = document
        .select(&fave_sel)
        .filter_map(|li| {
            let title = li
                .select(&fave_img)
                .next()
                .and_then(|img| img.value().attr("alt"))?
                .to_string();
            let slug = li
                .select(&fave_slug)
                .next()
                .and_then(|div| div.value().attr("data-film-slug"))?
                .to_string();
            Some(Film::new(title, None, slug))
        })
        .collect();

    Some(Profile {
        display_name,
        total_films: stats[0],
        films_this_year: stats[1],
        lists: stats[2],
        following: stats[3],
        followers: stats[4],
        pro,
        bio,
        favorites,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile_html(stats: &[u32], with_badge: bool) -> String {
        let stats_html: String = stats
            .iter()
            .map(|n| format!(r#"<h4 class="profile-statistic"><span>{}</span></h4>"#, n))
            .collect();
        let badge = if with_badge {
            r#"<span class="badge">Pro</span>"#
        } else {
            ""
        };
        format!(
            r#"<html><body>
            <div class="profile-name-wrap"><h1>Alice</h1></div>
            {badge}
            {stats_html}
            <div class="bio"><div><p>Watches too much.</p></div></div>
            <ul>
              <li class="favourite-film-poster-container">
                <div class="film-poster" data-film-slug="stalker"><img alt="Stalker"/></div>
              </li>
            </ul>
            </body></html>"#
        )
    }

    #[test]
    fn parses_full_statistics_row() {
        let profile = parse_profile(&profile_html(&[321, 45, 7, 80, 120], true)).unwrap();
        assert_eq!(profile.display_name, "Alice");
        assert_eq!(profile.total_films, 321);
        assert_eq!(profile.films_this_year, 45);
        assert_eq!(profile.lists, 7);
        assert_eq!(profile.following, 80);
        assert_eq!(profile.followers, 120);
        assert!(profile.pro);
        assert_eq!(profile.bio, "Watches too much.");
        assert_eq!(profile.favorites.len(), 1);
        assert_eq!(profile.favorites[0].slug, "stalker");
    }

    #[test]
    fn four_statistics_means_no_lists() {
        let profile = parse_profile(&profile_html(&[321, 45, 80, 120], false)).unwrap();
        assert_eq!(profile.lists, 0);
        assert_eq!(profile.following, 80);
        assert_eq!(profile.followers, 120);
        assert!(!profile.pro);
    }

    #[test]
    fn unrecognizable_markup_is_none() {
        assert!(parse_profile("<html><body><p>404</p></body></html>").is_none());
    }

    #[test]
    fn fallback_echoes_username() {
        let profile = Profile::fallback("ghost");
        assert_eq!(profile.display_name, "ghost");
        assert_eq!(profile.total_films, 0);
        assert!(profile.favorites.is_empty());
    }
}
