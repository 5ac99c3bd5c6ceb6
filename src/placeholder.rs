use image::{Rgb, RgbImage, Rgba, RgbaImage};

use crate::fonts::FontStack;

const BACKGROUND: Rgb<u8> = Rgb([96, 96, 96]);
const TEXT: Rgba<u8> = Rgba([255, 255, 255, 255]);
const TEXT_PX: f32 = 24.0;
const MARGIN: u32 = 16;

/// Synthesize a stand-in poster: solid background with the film title (and
/// year, when known) word-wrapped and centered. Used whenever no real
/// poster can be obtained.
pub fn render(label: &str, width: u32, height: u32, fonts: &FontStack) -> RgbImage {
    let mut canvas = RgbaImage::from_pixel(
        width,
        height,
        Rgba([BACKGROUND[0], BACKGROUND[1], BACKGROUND[2], 255]),
    );

    let max_text_width = width.saturating_sub(2 * MARGIN).max(1);
    let lines = fonts.wrap(label, TEXT_PX, max_text_width);
    let line_height = fonts.line_height(TEXT_PX);
    let block_height = line_height * lines.len() as u32;
    let mut y = (height.saturating_sub(block_height) / 2) as i32;

    for line in &lines {
        let line_width = fonts.text_width(line, TEXT_PX);
        let x = (i64::from(width) - i64::from(line_width)) / 2;
        fonts.draw_text(&mut canvas, x as i32, y, TEXT_PX, TEXT, line);
        y += line_height as i32;
    }

    image::DynamicImage::ImageRgba8(canvas).to_rgb8()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_has_requested_dimensions() {
        let fonts = FontStack::builtin();
        let img = render("The Long Goodbye (1973)", 230, 345, &fonts);
        assert_eq!(img.dimensions(), (230, 345));
    }

    #[test]
    fn placeholder_contains_text_pixels() {
        let fonts = FontStack::builtin();
        let img = render("Stalker", 230, 345, &fonts);
        let bright = img.pixels().filter(|p| p[0] > 200).count();
        assert!(bright > 0, "expected white text pixels on the gray canvas");
    }

    #[test]
    fn long_titles_stay_within_canvas() {
        let fonts = FontStack::builtin();
        let img = render(
            "An Extremely Long and Rambling Film Title That Must Wrap (2011)",
            230,
            345,
            &fonts,
        );
        assert_eq!(img.dimensions(), (230, 345));
    }
}
