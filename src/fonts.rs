use image::{Rgba, RgbaImage};
use log::{debug, info};
use rusttype::{point, Font, Scale};

/// Font locations probed in order, covering the usual Linux, macOS and
/// Windows install paths.
const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arialbd.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Text rendering with a fallback chain: the first loadable system font,
/// or a built-in 5x7 bitmap font when no font file is available, so text
/// drawing never fails outright.
#[derive(Clone)]
pub struct FontStack {
    truetype: Option<Font<'static>>,
}

impl FontStack {
    pub fn load() -> Self {
        for path in FONT_CANDIDATES {
            if let Ok(bytes) = std::fs::read(path) {
                if let Some(font) = Font::try_from_vec(bytes) {
                    info!("using font {}", path);
                    return Self {
                        truetype: Some(font),
                    };
                }
            }
        }
        debug!("no system font found, using built-in bitmap font");
        Self { truetype: None }
    }

    /// Bitmap-only stack, independent of the host's installed fonts.
    pub fn builtin() -> Self {
        Self { truetype: None }
    }

    pub fn line_height(&self, px: f32) -> u32 {
        match &self.truetype {
            Some(font) => {
                let metrics = font.v_metrics(Scale::uniform(px));
                (metrics.ascent - metrics.descent + metrics.line_gap).ceil() as u32
            }
            None => {
                let scale = bitmap_scale(px);
                7 * scale + scale
            }
        }
    }

    pub fn text_width(&self, text: &str, px: f32) -> u32 {
        match &self.truetype {
            Some(font) => {
                let scale = Scale::uniform(px);
                font.layout(text, scale, point(0.0, 0.0))
                    .last()
                    .map(|glyph| {
                        (glyph.position().x + glyph.unpositioned().h_metrics().advance_width)
                            .ceil() as u32
                    })
                    .unwrap_or(0)
            }
            None => {
                let scale = bitmap_scale(px);
                let glyphs = text.chars().count() as u32;
                glyphs * 6 * scale
            }
        }
    }

    /// Draw one line of text with its top-left corner at (x, y).
    pub fn draw_text(&self, canvas: &mut RgbaImage, x: i32, y: i32, px: f32, color: Rgba<u8>, text: &str) {
        match &self.truetype {
            Some(font) => {
                let scale = Scale::uniform(px);
                let ascent = font.v_metrics(scale).ascent;
                for glyph in font.layout(text, scale, point(x as f32, y as f32 + ascent)) {
                    if let Some(bb) = glyph.pixel_bounding_box() {
                        glyph.draw(|gx, gy, coverage| {
                            let px_x = bb.min.x + gx as i32;
                            let px_y = bb.min.y + gy as i32;
                            blend_pixel(canvas, px_x, px_y, color, coverage);
                        });
                    }
                }
            }
            None => draw_text_bitmap(canvas, x, y, bitmap_scale(px), color, text),
        }
    }

    /// Greedy word wrap against a pixel width. A single word wider than the
    /// limit gets its own line rather than being split.
    pub fn wrap(&self, text: &str, px: f32, max_width: u32) -> Vec<String> {
        let mut lines = Vec::new();
        let mut current = String::new();
        for word in text.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", current, word)
            };
            if self.text_width(&candidate, px) <= max_width || current.is_empty() {
                current = candidate;
            } else {
                lines.push(std::mem::take(&mut current));
                current = word.to_string();
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
        lines
    }
}

fn blend_pixel(canvas: &mut RgbaImage, x: i32, y: i32, color: Rgba<u8>, coverage: f32) {
    if x < 0 || y < 0 {
        return;
    }
    let (w, h) = canvas.dimensions();
    if x as u32 >= w || y as u32 >= h {
        return;
    }
    let alpha = (f32::from(color[3]) * coverage.clamp(0.0, 1.0)) / 255.0;
    if alpha <= 0.0 {
        return;
    }
    let dst = canvas.get_pixel_mut(x as u32, y as u32);
    for channel in 0..3 {
        let src = f32::from(color[channel]);
        let bottom = f32::from(dst[channel]);
        dst[channel] = (src * alpha + bottom * (1.0 - alpha)).round() as u8;
    }
    let dst_alpha = f32::from(dst[3]) / 255.0;
    dst[3] = ((alpha + dst_alpha * (1.0 - alpha)) * 255.0).round() as u8;
}

fn bitmap_scale(px: f32) -> u32 {
    ((px / 7.0).round() as u32).max(1)
}

fn draw_text_bitmap(canvas: &mut RgbaImage, mut x: i32, y: i32, scale: u32, color: Rgba<u8>, text: &str) {
    let advance = (6 * scale) as i32;
    for ch in text.chars() {
        if let Some(rows) = glyph_rows(ch) {
            draw_bitmap_glyph(canvas, x, y, scale, color, rows);
        }
        x += advance;
    }
}

fn draw_bitmap_glyph(canvas: &mut RgbaImage, x: i32, y: i32, scale: u32, color: Rgba<u8>, rows: [u8; 7]) {
    for (row_idx, row_bits) in rows.iter().enumerate() {
        for col in 0..5u32 {
            if (row_bits >> (4 - col)) & 1 == 1 {
                for dy in 0..scale {
                    for dx in 0..scale {
                        let px_x = x + (col * scale + dx) as i32;
                        let px_y = y + (row_idx as u32 * scale + dy) as i32;
                        blend_pixel(canvas, px_x, px_y, color, 1.0);
                    }
                }
            }
        }
    }
}

#[rustfmt::skip]
fn glyph_rows(ch: char) -> Option<[u8; 7]> {
    let rows = match ch.to_ascii_uppercase() {
        'A' => [0b01110,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001],
        'B' => [0b11110,0b10001,0b10001,0b11110,0b10001,0b10001,0b11110],
        'C' => [0b01110,0b10001,0b10000,0b10000,0b10000,0b10001,0b01110],
        'D' => [0b11100,0b10010,0b10001,0b10001,0b10001,0b10010,0b11100],
        'E' => [0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b11111],
        'F' => [0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b10000],
        'G' => [0b01110,0b10001,0b10000,0b10111,0b10001,0b10001,0b01111],
        'H' => [0b10001,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001],
        'I' => [0b01110,0b00100,0b00100,0b00100,0b00100,0b00100,0b01110],
        'J' => [0b00111,0b00010,0b00010,0b00010,0b00010,0b10010,0b01100],
        'K' => [0b10001,0b10010,0b10100,0b11000,0b10100,0b10010,0b10001],
        'L' => [0b10000,0b10000,0b10000,0b10000,0b10000,0b10000,0b11111],
        'M' => [0b10001,0b11011,0b10101,0b10101,0b10001,0b10001,0b10001],
        'N' => [0b10001,0b11001,0b10101,0b10011,0b10001,0b10001,0b10001],
        'O' => [0b01110,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110],
        'P' => [0b11110,0b10001,0b10001,0b11110,0b10000,0b10000,0b10000],
        'Q' => [0b01110,0b10001,0b10001,0b10001,0b10101,0b10010,0b01101],
        'R' => [0b11110,0b10001,0b10001,0b11110,0b10100,0b10010,0b10001],
        'S' => [0b01111,0b10000,0b10000,0b01110,0b00001,0b00001,0b11110],
        'T' => [0b11111,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100],
        'U' => [0b10001,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110],
        'V' => [0b10001,0b10001,0b10001,0b10001,0b10001,0b01010,0b00100],
        'W' => [0b10001,0b10001,0b10001,0b10101,0b10101,0b11011,0b10001],
        'X' => [0b10001,0b10001,0b01010,0b00100,0b01010,0b10001,0b10001],
        'Y' => [0b10001,0b10001,0b01010,0b00100,0b00100,0b00100,0b00100],
        'Z' => [0b11111,0b00001,0b00010,0b00100,0b01000,0b10000,0b11111],
        '0' => [0b01110,0b10001,0b10011,0b10101,0b11001,0b10001,0b01110],
        '1' => [0b00100,0b01100,0b00100,0b00100,0b00100,0b00100,0b01110],
        '2' => [0b01110,0b10001,0b00001,0b00010,0b00100,0b01000,0b11111],
        '3' => [0b11110,0b00001,0b00001,0b01110,0b00001,0b00001,0b11110],
        '4' => [0b00010,0b00110,0b01010,0b10010,0b11111,0b00010,0b00010],
        '5' => [0b11111,0b10000,0b11110,0b00001,0b00001,0b10001,0b01110],
        '6' => [0b00110,0b01000,0b10000,0b11110,0b10001,0b10001,0b01110],
        '7' => [0b11111,0b00001,0b00010,0b00100,0b01000,0b01000,0b01000],
        '8' => [0b01110,0b10001,0b10001,0b01110,0b10001,0b10001,0b01110],
        '9' => [0b01110,0b10001,0b10001,0b01111,0b00001,0b00010,0b01100],
        ' ' => [0b00000,0b00000,0b00000,0b00000,0b00000,0b00000,0b00000],
        '.' => [0b00000,0b00000,0b00000,0b00000,0b00000,0b01100,0b01100],
        ',' => [0b00000,0b00000,0b00000,0b00000,0b01100,0b00100,0b01000],
        '\'' => [0b00100,0b00100,0b00000,0b00000,0b00000,0b00000,0b00000],
        '-' => [0b00000,0b00000,0b00000,0b11111,0b00000,0b00000,0b00000],
        '(' => [0b00010,0b00100,0b01000,0b01000,0b01000,0b00100,0b00010],
        ')' => [0b01000,0b00100,0b00010,0b00010,0b00010,0b00100,0b01000],
        '!' => [0b00100,0b00100,0b00100,0b00100,0b00100,0b00000,0b00100],
        '?' => [0b01110,0b10001,0b00001,0b00010,0b00100,0b00000,0b00100],
        ':' => [0b00000,0b01100,0b01100,0b00000,0b01100,0b01100,0b00000],
        '/' => [0b00001,0b00010,0b00010,0b00100,0b01000,0b01000,0b10000],
        '&' => [0b01100,0b10010,0b10100,0b01000,0b10101,0b10010,0b01101],
        '*' => [0b00100,0b10101,0b01110,0b11111,0b01110,0b10101,0b00100],
        '★' => [0b00100,0b00100,0b11111,0b01110,0b01110,0b01010,0b10001],
        '½' => [0b10010,0b10100,0b01000,0b01011,0b10001,0b00010,0b00111],
        _ => return None,
    };
    Some(rows)
}
