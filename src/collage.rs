use image::{Rgb, RgbImage};
use log::info;

use crate::compositor::{self, PlacedPoster, PosterStyle};
use crate::error::{BoxdError, BoxdResult};
use crate::film::Film;
use crate::layout;
use crate::poster_resolver::PosterResolver;
use crate::user::LetterboxdUser;

pub const MAX_CELLS: u32 = 100;
const MAX_PAGES: u32 = 10;

/// Build a cols x rows poster grid from the user's diary, newest first.
/// Cells use the native poster size, so the canvas is cols * poster_width
/// by rows * poster_height. Fewer matching entries than cells leaves the
/// remaining cells as background.
pub fn build_collage(
    user: &mut LetterboxdUser,
    resolver: &PosterResolver,
    cols: u32,
    rows: u32,
) -> BoxdResult<RgbImage> {
    if cols == 0 || rows == 0 || cols * rows > MAX_CELLS {
        return Err(BoxdError::InvalidRequest(format!(
            "collage size {}x{} out of range, needs 1..={} cells",
            cols, rows, MAX_CELLS
        )));
    }

    let needed = (cols * rows) as usize;
    let entries = user.collect_entries(needed, MAX_PAGES)?;
    if entries.is_empty() {
        return Err(BoxdError::NothingToRender(format!(
            "the diary of {} has no matching entries",
            user.username()
        )));
    }

    info!(
        "building {}x{} collage for {} from {} entries",
        cols,
        rows,
        user.username(),
        entries.len()
    );

    let films: Vec<Film> = entries.iter().map(|e| e.film.clone()).collect();
    let images = resolver.resolve_batch(&films);

    let (poster_width, poster_height) = resolver.poster_size();
    let positions = layout::grid_positions(images.len(), cols, poster_width, poster_height, 0, 0, 0);
    let placed: Vec<PlacedPoster> = positions
        .into_iter()
        .zip(images)
        .map(|(position, image)| PlacedPoster { position, image })
        .collect();

    let mut canvas = compositor::new_canvas(cols * poster_width, rows * poster_height, Rgb([0, 0, 0]));
    compositor::place_posters(&mut canvas, &placed, &PosterStyle::default());
    Ok(compositor::flatten(canvas))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_grid_is_rejected() {
        // validation happens before any network traffic, so a panicking
        // fetcher proves the request is rejected up front
        struct NoFetch;
        impl crate::fetch::Fetch for NoFetch {
            fn get(&self, _url: &str) -> BoxdResult<crate::fetch::FetchResponse> {
                panic!("no fetch expected");
            }
        }

        let mut user = LetterboxdUser::new(
            "alice",
            "https://example.test",
            std::sync::Arc::new(NoFetch),
            std::time::Duration::ZERO,
        );
        let dir = tempfile::TempDir::new().unwrap();
        let resolver = PosterResolver::new(
            std::sync::Arc::new(NoFetch),
            crate::poster_cache::PosterCache::new(dir.path()).unwrap(),
            "https://example.test",
            (230, 345),
            crate::fonts::FontStack::builtin(),
            1,
        )
        .unwrap();

        for (cols, rows) in [(0, 5), (5, 0), (11, 10)] {
            match build_collage(&mut user, &resolver, cols, rows) {
                Err(BoxdError::InvalidRequest(_)) => {}
                other => panic!("expected InvalidRequest, got {:?}", other.map(|_| ())),
            }
        }
    }
}
