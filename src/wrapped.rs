use std::fmt;
use std::str::FromStr;

use chrono::Datelike;
use image::{Rgb, RgbImage, Rgba};
use log::info;

use crate::compositor::{self, PlacedPoster, PosterStyle};
use crate::error::{BoxdError, BoxdResult};
use crate::film::{DiaryEntry, Film};
use crate::layout::{self, Bands};
use crate::poster_resolver::PosterResolver;
use crate::user::LetterboxdUser;

/// Instagram Story canvas.
pub const STORY_WIDTH: u32 = 1080;
pub const STORY_HEIGHT: u32 = 1920;

const BANDS: Bands = Bands {
    header: 350,
    footer: 150,
};
const MAX_POSTERS: usize = 25;
const MAX_PAGES: u32 = 5;
const GRID_SPACING: u32 = 12;
const RATING_PX: f32 = 22.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutStyle {
    Scatter,
    Grid,
}

impl FromStr for LayoutStyle {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scatter" => Ok(LayoutStyle::Scatter),
            "grid" => Ok(LayoutStyle::Grid),
            _ => Err(()),
        }
    }
}

impl fmt::Display for LayoutStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutStyle::Scatter => write!(f, "scatter"),
            LayoutStyle::Grid => write!(f, "grid"),
        }
    }
}

/// Caller-supplied styling: colors and decorative copy. The mechanism
/// (layout, compositing) stays in the core; the aesthetic lives here.
#[derive(Debug, Clone)]
pub struct Theme {
    pub background: Rgb<u8>,
    pub text: Rgb<u8>,
    pub accent: Rgb<u8>,
    pub title: String,
    /// Count line template; `{}` is replaced with the entry count.
    pub count_line: String,
}

impl Default for Theme {
    fn default() -> Self {
        Theme {
            background: Rgb([245, 217, 8]),
            text: Rgb([26, 26, 26]),
            accent: Rgb([229, 9, 20]),
            title: "LETTERBOXD WRAPPED".to_string(),
            count_line: "I watched {} movies.".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WrappedOptions {
    pub month: u32,
    pub year: i32,
    pub show_ratings: bool,
    pub style: LayoutStyle,
    pub theme: Theme,
}

impl WrappedOptions {
    pub fn new(month: u32, year: i32) -> Self {
        WrappedOptions {
            month,
            year,
            show_ratings: false,
            style: LayoutStyle::Scatter,
            theme: Theme::default(),
        }
    }
}

pub fn month_name(month: u32) -> &'static str {
    match month {
        1 => "January",
        2 => "February",
        3 => "March",
        4 => "April",
        5 => "May",
        6 => "June",
        7 => "July",
        8 => "August",
        9 => "September",
        10 => "October",
        11 => "November",
        12 => "December",
        _ => "Unknown",
    }
}

/// Build the monthly Wrapped image: scattered (or gridded) posters under a
/// themed header, with an optional per-poster rating overlay. The one hard
/// failure is a month with no diary entries.
pub fn build_wrapped(
    user: &mut LetterboxdUser,
    resolver: &PosterResolver,
    options: &WrappedOptions,
) -> BoxdResult<RgbImage> {
    if !(1..=12).contains(&options.month) {
        return Err(BoxdError::InvalidRequest(format!(
            "month {} out of range 1..=12",
            options.month
        )));
    }

    let monthly = monthly_entries(user, options.month, options.year)?;
    if monthly.is_empty() {
        return Err(BoxdError::NothingToRender(format!(
            "no diary entries for {} {}",
            month_name(options.month),
            options.year
        )));
    }
    info!(
        "building wrapped for {}: {} entries in {} {}",
        user.username(),
        monthly.len(),
        month_name(options.month),
        options.year
    );

    let subset = &monthly[..monthly.len().min(MAX_POSTERS)];
    let films: Vec<Film> = subset.iter().map(|e| e.film.clone()).collect();
    let images = resolver.resolve_batch(&films);

    let positions = match options.style {
        LayoutStyle::Scatter => layout::scatter_positions(
            images.len(),
            STORY_WIDTH,
            STORY_HEIGHT,
            BANDS,
            layout::scatter_seed(user.username(), options.month, options.year),
        ),
        LayoutStyle::Grid => layout::fitted_grid(
            images.len(),
            STORY_WIDTH,
            STORY_HEIGHT,
            BANDS,
            GRID_SPACING,
            3..=6,
        ),
    };

    let mut canvas = compositor::new_canvas(STORY_WIDTH, STORY_HEIGHT, options.theme.background);
    let placed: Vec<PlacedPoster> = positions
        .iter()
        .zip(images)
        .map(|(&position, image)| PlacedPoster { position, image })
        .collect();
    let poster_style = PosterStyle {
        rounded_radius: Some(10),
        shadow: true,
    };
    compositor::place_posters(&mut canvas, &placed, &poster_style);

    let fonts = resolver.fonts();
    if options.show_ratings {
        for (position, entry) in positions.iter().zip(subset.iter()) {
            if entry.rating.is_empty() {
                continue;
            }
            let text = entry.rating.to_string();
            let width = fonts.text_width(&text, RATING_PX);
            let x = position.x + (position.width as i32 - width as i32) / 2;
            let y = position.y + position.height as i32 - 30;
            fonts.draw_text(&mut canvas, x, y, RATING_PX, Rgba([255, 255, 255, 255]), &text);
        }
    }

    let text_color = opaque(options.theme.text);
    compositor::draw_text_centered(&mut canvas, fonts, 60, 45.0, text_color, &options.theme.title);
    let subtitle = format!(
        "{} {}",
        month_name(options.month).to_uppercase(),
        options.year
    );
    compositor::draw_text_centered(&mut canvas, fonts, 120, 50.0, text_color, &subtitle);
    let count_line = options
        .theme
        .count_line
        .replace("{}", &monthly.len().to_string());
    compositor::draw_text_centered(&mut canvas, fonts, 180, 35.0, text_color, &count_line);

    let heart_size = 40;
    compositor::draw_heart(
        &mut canvas,
        (STORY_WIDTH as i32 - heart_size) / 2,
        STORY_HEIGHT as i32 - 120,
        heart_size,
        opaque(options.theme.accent),
    );

    Ok(compositor::flatten(canvas))
}

fn monthly_entries(
    user: &mut LetterboxdUser,
    month: u32,
    year: i32,
) -> BoxdResult<Vec<DiaryEntry>> {
    let mut all = Vec::new();
    for page in 1..=MAX_PAGES {
        match user.entries_filtered(page)? {
            Some(entries) => all.extend(entries),
            None => break,
        }
    }
    Ok(all
        .into_iter()
        .filter(|e| e.watched.month() == month && e.watched.year() == year)
        .collect())
}

fn opaque(color: Rgb<u8>) -> Rgba<u8> {
    Rgba([color[0], color[1], color[2], 255])
}
