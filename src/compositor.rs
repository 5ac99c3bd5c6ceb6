use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_ellipse_mut, draw_filled_rect_mut, draw_polygon_mut};
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};
use imageproc::point::Point;
use imageproc::rect::Rect;
use log::warn;

use crate::fonts::FontStack;
use crate::layout::LayoutPosition;

const FALLBACK_BLOCK: Rgba<u8> = Rgba([120, 120, 120, 255]);
const SHADOW_OFFSET: i64 = 2;
const SHADOW_ALPHA: u16 = 30;

/// Decorations applied to each placed poster.
#[derive(Debug, Clone, Copy, Default)]
pub struct PosterStyle {
    pub rounded_radius: Option<u32>,
    pub shadow: bool,
}

/// A poster image paired with its computed position.
pub struct PlacedPoster {
    pub position: LayoutPosition,
    pub image: RgbImage,
}

pub fn new_canvas(width: u32, height: u32, background: Rgb<u8>) -> RgbaImage {
    RgbaImage::from_pixel(
        width,
        height,
        Rgba([background[0], background[1], background[2], 255]),
    )
}

/// Rasterize posters onto the canvas. Items are drawn in the order given,
/// which callers keep in ascending z-order. A failure placing one poster
/// paints a neutral block in its slot instead of aborting the render.
pub fn place_posters(canvas: &mut RgbaImage, posters: &[PlacedPoster], style: &PosterStyle) {
    for placed in posters {
        if let Err(reason) = place_poster(canvas, &placed.position, &placed.image, style) {
            warn!("degrading poster slot to a blank block: {}", reason);
            fallback_block(canvas, &placed.position);
        }
    }
}

fn place_poster(
    canvas: &mut RgbaImage,
    position: &LayoutPosition,
    image: &RgbImage,
    style: &PosterStyle,
) -> Result<(), String> {
    if position.width == 0 || position.height == 0 {
        return Err(format!("degenerate target rectangle {:?}", position));
    }
    if image.width() == 0 || image.height() == 0 {
        return Err("empty source image".to_string());
    }

    let resized = imageops::resize(image, position.width, position.height, FilterType::Lanczos3);
    let mut poster = DynamicImage::ImageRgb8(resized).to_rgba8();

    if let Some(radius) = style.rounded_radius {
        round_corners(&mut poster, radius);
    }
    if position.rotation != 0.0 {
        poster = rotate_expanded(&poster, position.rotation);
    }

    // Rotation grows the bounding box; re-center so the poster stays where
    // the layout put it.
    let paste_x = i64::from(position.x) - i64::from(poster.width() - position.width) / 2;
    let paste_y = i64::from(position.y) - i64::from(poster.height() - position.height) / 2;

    if style.shadow {
        let shadow = silhouette(&poster);
        imageops::overlay(canvas, &shadow, paste_x + SHADOW_OFFSET, paste_y + SHADOW_OFFSET);
    }
    imageops::overlay(canvas, &poster, paste_x, paste_y);
    Ok(())
}

/// Rotate without clipping: the canvas expands to hold the rotated corners
/// and the exposed area stays transparent.
pub fn rotate_expanded(image: &RgbaImage, degrees: f32) -> RgbaImage {
    let theta = degrees.to_radians();
    let (sin, cos) = (theta.sin().abs(), theta.cos().abs());
    let (w, h) = (image.width() as f32, image.height() as f32);
    let expanded_w = (w * cos + h * sin).ceil() as u32;
    let expanded_h = (w * sin + h * cos).ceil() as u32;

    let mut frame = RgbaImage::from_pixel(expanded_w, expanded_h, Rgba([0, 0, 0, 0]));
    imageops::overlay(
        &mut frame,
        image,
        i64::from((expanded_w - image.width()) / 2),
        i64::from((expanded_h - image.height()) / 2),
    );
    rotate_about_center(&frame, theta, Interpolation::Bilinear, Rgba([0, 0, 0, 0]))
}

/// Zero out the alpha of pixels outside a quarter-circle at each corner.
pub fn round_corners(image: &mut RgbaImage, radius: u32) {
    let (w, h) = image.dimensions();
    let radius = radius.min(w / 2).min(h / 2);
    if radius == 0 {
        return;
    }
    let r = radius as i64;
    let r_sq = r * r;
    let centers = [
        (r - 1, r - 1),
        (w as i64 - r, r - 1),
        (r - 1, h as i64 - r),
        (w as i64 - r, h as i64 - r),
    ];
    for y in 0..h as i64 {
        for x in 0..w as i64 {
            let in_corner_band = (x < r || x >= w as i64 - r) && (y < r || y >= h as i64 - r);
            if !in_corner_band {
                continue;
            }
            let outside = centers.iter().all(|&(cx, cy)| {
                let dx = x - cx;
                let dy = y - cy;
                dx * dx + dy * dy > r_sq
            });
            if outside {
                image.get_pixel_mut(x as u32, y as u32)[3] = 0;
            }
        }
    }
}

fn silhouette(poster: &RgbaImage) -> RgbaImage {
    let mut shadow = RgbaImage::new(poster.width(), poster.height());
    for (src, dst) in poster.pixels().zip(shadow.pixels_mut()) {
        if src[3] > 0 {
            *dst = Rgba([0, 0, 0, (u16::from(src[3]) * SHADOW_ALPHA / 255) as u8]);
        }
    }
    shadow
}

fn fallback_block(canvas: &mut RgbaImage, position: &LayoutPosition) {
    if position.width == 0 || position.height == 0 {
        return;
    }
    draw_filled_rect_mut(
        canvas,
        Rect::at(position.x, position.y).of_size(position.width, position.height),
        FALLBACK_BLOCK,
    );
}

/// Draw one line of text horizontally centered at the given top edge.
pub fn draw_text_centered(
    canvas: &mut RgbaImage,
    fonts: &FontStack,
    y: i32,
    px: f32,
    color: Rgba<u8>,
    text: &str,
) {
    let width = fonts.text_width(text, px);
    let x = (i64::from(canvas.width()) - i64::from(width)) / 2;
    fonts.draw_text(canvas, x as i32, y, px, color, text);
}

/// A filled heart built from two circles and a triangle, anchored at the
/// top-left of its bounding box.
pub fn draw_heart(canvas: &mut RgbaImage, x: i32, y: i32, size: i32, color: Rgba<u8>) {
    if size < 4 {
        return;
    }
    let lobe = size / 4;
    draw_filled_ellipse_mut(canvas, (x + lobe, y + lobe), lobe, lobe, color);
    draw_filled_ellipse_mut(canvas, (x + 3 * lobe, y + lobe), lobe, lobe, color);
    let triangle = [
        Point::new(x, y + size / 3),
        Point::new(x + size, y + size / 3),
        Point::new(x + size / 2, y + size),
    ];
    draw_polygon_mut(canvas, &triangle, color);
}

pub fn flatten(canvas: RgbaImage) -> RgbImage {
    DynamicImage::ImageRgba8(canvas).to_rgb8()
}

/// Encode a finished canvas for the caller-side boundary.
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let mut buffer = Vec::new();
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality);
    image.write_with_encoder(encoder)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poster(w: u32, h: u32) -> RgbImage {
        RgbImage::from_pixel(w, h, Rgb([200, 30, 30]))
    }

    #[test]
    fn rotation_expands_bounding_box() {
        let img = DynamicImage::ImageRgb8(poster(100, 150)).to_rgba8();
        let rotated = rotate_expanded(&img, 12.0);
        assert!(rotated.width() > 100);
        assert!(rotated.height() > 150);
    }

    #[test]
    fn zero_rotation_is_identity_size() {
        let img = DynamicImage::ImageRgb8(poster(100, 150)).to_rgba8();
        let rotated = rotate_expanded(&img, 0.0);
        assert_eq!(rotated.dimensions(), (100, 150));
    }

    #[test]
    fn rounded_corners_clear_the_corner_pixel() {
        let mut img = DynamicImage::ImageRgb8(poster(60, 90)).to_rgba8();
        round_corners(&mut img, 12);
        assert_eq!(img.get_pixel(0, 0)[3], 0);
        assert_eq!(img.get_pixel(59, 0)[3], 0);
        assert_eq!(img.get_pixel(0, 89)[3], 0);
        assert_eq!(img.get_pixel(59, 89)[3], 0);
        // center untouched
        assert_eq!(img.get_pixel(30, 45)[3], 255);
    }

    #[test]
    fn posters_with_bleed_are_clipped_not_fatal() {
        let mut canvas = new_canvas(300, 400, Rgb([255, 255, 255]));
        let placed = PlacedPoster {
            position: LayoutPosition {
                x: -50,
                y: 10,
                width: 100,
                height: 150,
                rotation: 8.0,
                z: 0,
            },
            image: poster(100, 150),
        };
        place_posters(
            &mut canvas,
            &[placed],
            &PosterStyle {
                rounded_radius: Some(8),
                shadow: true,
            },
        );
        // some poster pixels landed on-canvas
        let red = canvas.pixels().filter(|p| p[0] > 150 && p[1] < 100).count();
        assert!(red > 0);
    }

    #[test]
    fn degenerate_slot_paints_fallback_block() {
        let mut canvas = new_canvas(100, 100, Rgb([255, 255, 255]));
        let placed = PlacedPoster {
            position: LayoutPosition {
                x: 10,
                y: 10,
                width: 20,
                height: 30,
                rotation: 0.0,
                z: 0,
            },
            image: RgbImage::new(0, 0),
        };
        place_posters(&mut canvas, &[placed], &PosterStyle::default());
        assert_eq!(*canvas.get_pixel(15, 15), FALLBACK_BLOCK);
    }

    #[test]
    fn heart_paints_accent_pixels() {
        let mut canvas = new_canvas(100, 100, Rgb([255, 255, 255]));
        draw_heart(&mut canvas, 30, 30, 40, Rgba([229, 9, 20, 255]));
        let red = canvas.pixels().filter(|p| p[0] > 200 && p[1] < 50).count();
        assert!(red > 0);
    }

    #[test]
    fn jpeg_encoding_produces_bytes() {
        let img = poster(64, 64);
        let bytes = encode_jpeg(&img, 95).unwrap();
        assert!(!bytes.is_empty());
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }
}
