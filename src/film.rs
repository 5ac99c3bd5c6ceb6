use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

/// A film as identified by the source site: title, optional release year and
/// the stable slug used in its URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Film {
    pub title: String,
    pub year: Option<i32>,
    pub slug: String,
}

impl Film {
    pub fn new(title: impl Into<String>, year: Option<i32>, slug: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            year,
            slug: slug.into(),
        }
    }

    /// Title plus "(year)" when the year is known. Used for placeholders.
    pub fn display_title(&self) -> String {
        match self.year {
            Some(year) => format!("{} ({})", self.title, year),
            None => self.title.clone(),
        }
    }
}

/// A star rating in half-star increments (0..=10 half stars), or empty.
/// An unrated entry is distinct from a zero rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rating(Option<u8>);

impl Rating {
    pub const EMPTY: Rating = Rating(None);

    pub fn from_half_stars(half_stars: u8) -> Self {
        Rating(Some(half_stars.min(10)))
    }

    /// Decode the textual star-glyph encoding used by the diary table:
    /// one '★' per full star, one '½' per half star. The text may carry a
    /// '×N' rewatch multiplier which does not affect the rating.
    pub fn parse_glyphs(text: &str) -> Self {
        let cleaned = text.replace('×', " ");
        let cleaned = cleaned.trim();
        if cleaned.is_empty() {
            return Rating::EMPTY;
        }
        let full = cleaned.chars().filter(|&c| c == '★').count() as u8;
        let half = cleaned.chars().filter(|&c| c == '½').count() as u8;
        if full == 0 && half == 0 {
            return Rating::EMPTY;
        }
        Rating::from_half_stars(full * 2 + half)
    }

    pub fn half_stars(&self) -> Option<u8> {
        self.0
    }

    pub fn stars(&self) -> Option<f32> {
        self.0.map(|h| f32::from(h) / 2.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(half_stars) = self.0 else {
            return Ok(());
        };
        for _ in 0..half_stars / 2 {
            write!(f, "★")?;
        }
        if half_stars % 2 == 1 {
            write!(f, "½")?;
        }
        Ok(())
    }
}

/// Best-effort category cues read from diary-row markup. Absence of a cue
/// means "feature film"; the markup is not reliable enough for anything
/// correctness-critical.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryFlags {
    pub short: bool,
    pub tv: bool,
    pub documentary: bool,
}

/// One logged watch: a film plus the diary-specific fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiaryEntry {
    pub film: Film,
    pub watched: NaiveDate,
    pub rating: Rating,
    pub liked: bool,
    pub rewatch: bool,
    pub categories: CategoryFlags,
}

/// Diary exclusion switches. `only_films` is shorthand for enabling the
/// other three at once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiaryFilter {
    pub hide_shorts: bool,
    pub hide_tv: bool,
    pub hide_docs: bool,
    pub only_films: bool,
}

impl DiaryFilter {
    pub fn films_only() -> Self {
        DiaryFilter {
            only_films: true,
            ..Default::default()
        }
    }

    pub fn is_noop(&self) -> bool {
        !(self.hide_shorts || self.hide_tv || self.hide_docs || self.only_films)
    }

    pub fn excludes(&self, entry: &DiaryEntry) -> bool {
        let hide_shorts = self.hide_shorts || self.only_films;
        let hide_tv = self.hide_tv || self.only_films;
        let hide_docs = self.hide_docs || self.only_films;
        (hide_shorts && entry.categories.short)
            || (hide_tv && entry.categories.tv)
            || (hide_docs && entry.categories.documentary)
    }
}
