use chrono::NaiveDate;
use log::warn;
use scraper::{ElementRef, Html, Selector};

use crate::film::{CategoryFlags, DiaryEntry, Film, Rating};

/// Result of parsing one diary page. A page without any diary rows does not
/// exist and terminates pagination; it is not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum DiaryPage {
    Entries(Vec<DiaryEntry>),
    NoMorePages,
}

struct RowSelectors {
    row: Selector,
    calendar: Selector,
    calendar_year: Selector,
    calendar_month: Selector,
    day: Selector,
    details: Selector,
    title: Selector,
    slug_holder: Selector,
    released: Selector,
    rating: Selector,
    liked: Selector,
    not_rewatch: Selector,
    category_span: Selector,
}

impl RowSelectors {
    fn new() -> Self {
        Self {
            row: sel("tr.diary-entry-row"),
            calendar: sel("td.td-calendar"),
            calendar_year: sel("td.td-calendar small"),
            calendar_month: sel("td.td-calendar strong"),
            day: sel("td.td-day"),
            details: sel("td.td-film-details"),
            title: sel("td.td-film-details h3"),
            slug_holder: sel("td.td-film-details div[data-film-slug]"),
            released: sel("td.td-released"),
            rating: sel("td.td-rating"),
            liked: sel("td.td-like span.icon-liked"),
            not_rewatch: sel("td.td-rewatch.icon-status-off"),
            category_span: sel("td.td-film-details span"),
        }
    }
}

fn sel(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

fn cell_text(element: &ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Parse a fetched diary-page document into its entries, in page order
/// (reverse-chronological as published).
///
/// The page only repeats the year/month calendar cell on rows where they
/// change; rows in between inherit the last-seen values, with only the day
/// cell updated. Rows missing the film-details cell, the slug or a usable
/// date are skipped individually.
pub fn parse_diary_page(html: &str, page: u32) -> DiaryPage {
    let document = Html::parse_document(html);
    let selectors = RowSelectors::new();

    let rows: Vec<ElementRef> = document.select(&selectors.row).collect();
    if rows.is_empty() {
        return DiaryPage::NoMorePages;
    }

    let mut current_year: Option<i32> = None;
    let mut current_month: Option<u32> = None;
    let mut entries = Vec::with_capacity(rows.len());

    for row in rows {
        if let Some(calendar) = row.select(&selectors.calendar).next() {
            if !cell_text(&calendar).is_empty() {
                current_year = row
                    .select(&selectors.calendar_year)
                    .next()
                    .and_then(|e| cell_text(&e).parse().ok())
                    .or(current_year);
                current_month = row
                    .select(&selectors.calendar_month)
                    .next()
                    .and_then(|e| month_from_name(&cell_text(&e)))
                    .or(current_month);
            }
        }

        match parse_row(&row, &selectors, current_year, current_month) {
            Some(entry) => entries.push(entry),
            None => warn!("skipping malformed diary row on page {}", page),
        }
    }

    DiaryPage::Entries(entries)
}

fn parse_row(
    row: &ElementRef,
    selectors: &RowSelectors,
    year: Option<i32>,
    month: Option<u32>,
) -> Option<DiaryEntry> {
    let details = row.select(&selectors.details).next()?;
    let slug = row
        .select(&selectors.slug_holder)
        .next()
        .and_then(|e| e.value().attr("data-film-slug"))?
        .to_string();

    let title = row
        .select(&selectors.title)
        .next()
        .map(|e| cell_text(&e))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| cell_text(&details));

    let day: u32 = row
        .select(&selectors.day)
        .next()
        .and_then(|e| cell_text(&e).parse().ok())?;
    let watched = NaiveDate::from_ymd_opt(year?, month?, day)?;

    let release_year = row.select(&selectors.released).next().and_then(|e| {
        let digits: String = cell_text(&e).chars().filter(|c| c.is_ascii_digit()).collect();
        digits.parse().ok()
    });

    let rating = row
        .select(&selectors.rating)
        .next()
        .map(|e| Rating::parse_glyphs(&cell_text(&e)))
        .unwrap_or(Rating::EMPTY);

    let liked = row.select(&selectors.liked).next().is_some();

    // The page marks rows that are NOT rewatches; an unmarked row is one.
    let rewatch = row.select(&selectors.not_rewatch).next().is_none();

    let categories = parse_categories(row, selectors);

    Some(DiaryEntry {
        film: Film::new(title, release_year, slug),
        watched,
        rating,
        liked,
        rewatch,
        categories,
    })
}

fn parse_categories(row: &ElementRef, selectors: &RowSelectors) -> CategoryFlags {
    let mut flags = CategoryFlags::default();
    for span in row.select(&selectors.category_span) {
        match cell_text(&span).to_ascii_lowercase().as_str() {
            "short" => flags.short = true,
            "tv" => flags.tv = true,
            "documentary" | "doc" => flags.documentary = true,
            _ => {}
        }
    }
    flags
}

/// Calendar-cell month names come in full and three-letter forms.
pub fn month_from_name(name: &str) -> Option<u32> {
    match name.trim().to_ascii_lowercase().as_str() {
        "january" | "jan" => Some(1),
        "february" | "feb" => Some(2),
        "march" | "mar" => Some(3),
        "april" | "apr" => Some(4),
        "may" => Some(5),
        "june" | "jun" => Some(6),
        "july" | "jul" => Some(7),
        "august" | "aug" => Some(8),
        "september" | "sep" => Some(9),
        "october" | "oct" => Some(10),
        "november" | "nov" => Some(11),
        "december" | "dec" => Some(12),
        _ => None,
    }
}
