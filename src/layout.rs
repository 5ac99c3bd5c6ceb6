use std::ops::RangeInclusive;

use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};
use sha2::{Digest, Sha256};

/// One placed poster: target rectangle, rotation and draw order. Positions
/// may extend past the canvas edges for intentional bleed; the compositor
/// clips.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutPosition {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub rotation: f32,
    pub z: u32,
}

/// Vertical bands reserved for header and footer decoration.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bands {
    pub header: u32,
    pub footer: u32,
}

/// Poster aspect ratio used when sizing grid cells (width : height = 2 : 3).
const CELL_ASPECT: f32 = 1.5;
const SIDE_MARGIN: u32 = 30;

/// A uniform grid chosen for a canvas: column/row counts, the cell size and
/// the top-left origin that centers the grid in the available space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridFit {
    pub cols: u32,
    pub rows: u32,
    pub cell_width: u32,
    pub cell_height: u32,
    pub origin_x: i32,
    pub origin_y: i32,
}

/// Uniform, non-overlapping grid of `n` cells with fixed spacing, laid out
/// row-major from the given origin.
pub fn grid_positions(
    n: usize,
    cols: u32,
    cell_width: u32,
    cell_height: u32,
    spacing: u32,
    origin_x: i32,
    origin_y: i32,
) -> Vec<LayoutPosition> {
    let cols = cols.max(1);
    (0..n)
        .map(|i| {
            let col = (i as u32) % cols;
            let row = (i as u32) / cols;
            LayoutPosition {
                x: origin_x + (col * (cell_width + spacing)) as i32,
                y: origin_y + (row * (cell_height + spacing)) as i32,
                width: cell_width,
                height: cell_height,
                rotation: 0.0,
                z: i as u32,
            }
        })
        .collect()
}

/// Pick a column count from `candidates` that maximizes poster size while
/// the whole grid fits between the header and footer bands. When no
/// candidate fits at full width the cells shrink to the available height
/// and the widest resulting cell wins. Deterministic for given inputs.
pub fn choose_columns(
    n: usize,
    canvas_width: u32,
    canvas_height: u32,
    bands: Bands,
    spacing: u32,
    candidates: RangeInclusive<u32>,
) -> GridFit {
    let avail_width = canvas_width.saturating_sub(2 * SIDE_MARGIN).max(1);
    let avail_height = canvas_height
        .saturating_sub(bands.header + bands.footer)
        .max(1);
    let n = n.max(1) as u32;
    let candidates = if candidates.is_empty() {
        1..=1
    } else {
        candidates
    };

    let mut best: Option<GridFit> = None;
    for cols in candidates {
        let cols = cols.max(1);
        let rows = n.div_ceil(cols);
        let width_cell = (avail_width.saturating_sub((cols - 1) * spacing) / cols).max(1);
        let mut cell_width = width_cell;
        let mut cell_height = (cell_width as f32 * CELL_ASPECT) as u32;
        let grid_height = rows * cell_height + (rows - 1) * spacing;
        if grid_height > avail_height {
            cell_height = (avail_height.saturating_sub((rows - 1) * spacing) / rows).max(1);
            cell_width = ((cell_height as f32 / CELL_ASPECT) as u32).min(width_cell).max(1);
            cell_height = (cell_width as f32 * CELL_ASPECT) as u32;
        }
        let fit = GridFit {
            cols,
            rows,
            cell_width,
            cell_height,
            origin_x: 0,
            origin_y: 0,
        };
        let better = match best {
            Some(ref current) => fit.cell_width > current.cell_width,
            None => true,
        };
        if better {
            best = Some(fit);
        }
    }

    let mut fit = best.expect("candidate range is non-empty");
    let grid_width = fit.cols * fit.cell_width + (fit.cols - 1) * spacing;
    let used_rows = n.div_ceil(fit.cols);
    let grid_height = used_rows * fit.cell_height + (used_rows - 1) * spacing;
    fit.rows = used_rows;
    fit.origin_x = ((canvas_width as i64 - grid_width as i64) / 2) as i32;
    fit.origin_y =
        bands.header as i32 + ((avail_height as i64 - grid_height as i64).max(0) / 2) as i32;
    fit
}

/// Grid policy: choose a column count, then lay out the cells centered in
/// the canvas.
pub fn fitted_grid(
    n: usize,
    canvas_width: u32,
    canvas_height: u32,
    bands: Bands,
    spacing: u32,
    candidates: RangeInclusive<u32>,
) -> Vec<LayoutPosition> {
    if n == 0 {
        return Vec::new();
    }
    let fit = choose_columns(n, canvas_width, canvas_height, bands, spacing, candidates);
    grid_positions(
        n,
        fit.cols,
        fit.cell_width,
        fit.cell_height,
        spacing,
        fit.origin_x,
        fit.origin_y,
    )
}

/// Deterministic seed for the scatter policy, derived from the identity of
/// the rendered artifact so repeated runs reproduce the same layout.
pub fn scatter_seed(username: &str, month: u32, year: i32) -> u64 {
    let digest = Sha256::digest(format!("{}{}{}", username, month, year).as_bytes());
    let mut eight = [0u8; 8];
    eight.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(eight)
}

const SCATTER_BASE_WIDTH: f32 = 180.0;
const SCATTER_MAX_POSTERS: usize = 25;

/// Cluster centers posters gravitate towards, as fractions of the available
/// area, with selection weights.
const FOCUS_AREAS: &[(f32, f32, f32)] = &[
    (0.50, 0.40, 2.0),
    (0.25, 0.20, 1.5),
    (0.75, 0.25, 1.3),
    (0.20, 0.75, 1.2),
    (0.80, 0.70, 1.1),
    (0.15, 0.50, 0.8),
    (0.85, 0.45, 0.9),
    (0.60, 0.15, 0.7),
    (0.40, 0.80, 0.6),
];

/// Scatter policy: weighted focus-area placement with bounded random
/// offsets, size tiers and rotation. Pure in (n, canvas, bands, seed) —
/// identical inputs give bit-identical output. Rectangles may bleed past
/// the side edges but never escape the canvas entirely.
pub fn scatter_positions(
    n: usize,
    canvas_width: u32,
    canvas_height: u32,
    bands: Bands,
    seed: u64,
) -> Vec<LayoutPosition> {
    let mut rng = StdRng::seed_from_u64(seed);
    let count = n.min(SCATTER_MAX_POSTERS);
    let canvas_width = canvas_width as i32;
    let canvas_height = canvas_height as i32;
    let header = bands.header as i32;
    let footer = bands.footer as i32;
    let avail_width = (canvas_width - 2 * SIDE_MARGIN as i32).max(1) as f32;
    let avail_height = (canvas_height - header - footer).max(1) as f32;

    let mut positions = Vec::with_capacity(count);
    for i in 0..count {
        let (fx, fy, _) = weighted_focus_area(&mut rng);

        // Size tiers: the first posters dominate, later ones recede.
        let size_multiplier = if i < 3 {
            rng.random_range(1.2..1.6)
        } else if i < 8 {
            rng.random_range(0.9..1.3)
        } else {
            rng.random_range(0.7..1.1)
        };
        let width = (SCATTER_BASE_WIDTH * size_multiplier) as i32;
        let height = (width as f32 * CELL_ASPECT) as i32;

        let spread: i32 = if i < 10 { 120 } else { 160 };
        let mut x = (avail_width * fx) as i32 + rng.random_range(-spread..=spread);
        let mut y = header + (avail_height * fy) as i32 + rng.random_range(-spread / 2..=spread / 2);

        // Allow partial bleed at the sides, keep the rest inside the bands.
        if x < -width / 2 {
            x = -width / 2;
        }
        if x > canvas_width - width / 2 {
            x = canvas_width - width / 2;
        }
        if y < header {
            y = header + rng.random_range(0..=50);
        }
        if y + height > canvas_height - footer {
            y = canvas_height - footer - height + rng.random_range(-30..=0);
        }

        let rotation = rng.random_range(-12..=12) as f32;

        positions.push(LayoutPosition {
            x,
            y,
            width: width as u32,
            height: height as u32,
            rotation,
            z: (count - i) as u32,
        });
    }

    // Drawn in ascending z-order: the earlier, larger posters end up on top.
    positions.sort_by_key(|p| p.z);
    positions
}

fn weighted_focus_area(rng: &mut StdRng) -> (f32, f32, f32) {
    let total: f32 = FOCUS_AREAS.iter().map(|(_, _, w)| w).sum();
    let mut pick = rng.random_range(0.0..total);
    for &area in FOCUS_AREAS {
        if pick < area.2 {
            return area;
        }
        pick -= area.2;
    }
    FOCUS_AREAS[FOCUS_AREAS.len() - 1]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overlaps(a: &LayoutPosition, b: &LayoutPosition) -> bool {
        let a_right = a.x + a.width as i32;
        let a_bottom = a.y + a.height as i32;
        let b_right = b.x + b.width as i32;
        let b_bottom = b.y + b.height as i32;
        a.x < b_right && b.x < a_right && a.y < b_bottom && b.y < a_bottom
    }

    const CANVAS: (u32, u32) = (1080, 1920);
    const BANDS: Bands = Bands {
        header: 350,
        footer: 150,
    };

    #[test]
    fn fitted_grid_cells_are_disjoint_and_in_bounds() {
        let positions = fitted_grid(25, CANVAS.0, CANVAS.1, BANDS, 12, 3..=6);
        assert_eq!(positions.len(), 25);
        for (i, a) in positions.iter().enumerate() {
            assert!(a.x >= 0 && a.y >= BANDS.header as i32);
            assert!(a.x + (a.width as i32) <= CANVAS.0 as i32);
            assert!(a.y + (a.height as i32) <= (CANVAS.1 - BANDS.footer) as i32);
            for b in &positions[i + 1..] {
                assert!(!overlaps(a, b), "cells {:?} and {:?} overlap", a, b);
            }
        }
    }

    #[test]
    fn fitted_grid_is_deterministic() {
        let a = fitted_grid(17, CANVAS.0, CANVAS.1, BANDS, 12, 3..=6);
        let b = fitted_grid(17, CANVAS.0, CANVAS.1, BANDS, 12, 3..=6);
        assert_eq!(a, b);
    }

    #[test]
    fn grid_area_grows_with_count_at_fixed_columns() {
        // Within a band of counts served by the same column choice, adding
        // a poster can only add area.
        let area = |n: usize| {
            let positions = fitted_grid(n, CANVAS.0, CANVAS.1, BANDS, 12, 3..=6);
            positions
                .iter()
                .map(|p| u64::from(p.width) * u64::from(p.height))
                .sum::<u64>()
        };
        for band in [13..=16usize, 17..=20, 21..=25, 26..=30] {
            let mut last = 0;
            for n in band {
                let total = area(n);
                assert!(total >= last, "area shrank at n={}", n);
                last = total;
            }
        }
    }

    #[test]
    fn explicit_grid_matches_native_cell_size() {
        let positions = grid_positions(6, 3, 230, 345, 0, 0, 0);
        assert_eq!(positions.len(), 6);
        assert_eq!(positions[0].x, 0);
        assert_eq!(positions[4].x, 230);
        assert_eq!(positions[4].y, 345);
        assert_eq!(positions[5].x, 460);
    }

    #[test]
    fn scatter_is_deterministic_for_identical_inputs() {
        let seed = scatter_seed("alice", 3, 2024);
        let a = scatter_positions(20, CANVAS.0, CANVAS.1, BANDS, seed);
        let b = scatter_positions(20, CANVAS.0, CANVAS.1, BANDS, seed);
        assert_eq!(a, b);
    }

    #[test]
    fn scatter_differs_across_seeds() {
        let a = scatter_positions(20, CANVAS.0, CANVAS.1, BANDS, scatter_seed("alice", 3, 2024));
        let b = scatter_positions(20, CANVAS.0, CANVAS.1, BANDS, scatter_seed("bob", 3, 2024));
        assert_ne!(a, b);
    }

    #[test]
    fn scatter_never_escapes_canvas_entirely() {
        let seed = scatter_seed("carol", 11, 2023);
        for p in scatter_positions(25, CANVAS.0, CANVAS.1, BANDS, seed) {
            // partial side bleed is allowed, full escape is not
            assert!(p.x >= -(p.width as i32) / 2);
            assert!(p.x <= CANVAS.0 as i32 - (p.width as i32) / 2);
            assert!(p.y >= BANDS.header as i32 - 30);
            assert!(p.y + (p.height as i32) <= (CANVAS.1 - BANDS.footer) as i32);
        }
    }

    #[test]
    fn scatter_draw_order_is_ascending_z() {
        let seed = scatter_seed("alice", 3, 2024);
        let positions = scatter_positions(15, CANVAS.0, CANVAS.1, BANDS, seed);
        for pair in positions.windows(2) {
            assert!(pair[0].z <= pair[1].z);
        }
    }

    #[test]
    fn scatter_caps_poster_count() {
        let seed = scatter_seed("alice", 3, 2024);
        assert_eq!(
            scatter_positions(80, CANVAS.0, CANVAS.1, BANDS, seed).len(),
            25
        );
    }

    #[test]
    fn seed_depends_on_every_input() {
        let base = scatter_seed("alice", 3, 2024);
        assert_ne!(base, scatter_seed("alice", 4, 2024));
        assert_ne!(base, scatter_seed("alice", 3, 2023));
        assert_ne!(base, scatter_seed("alicia", 3, 2024));
    }
}
