//! Generated page visuals.
//!
//! Pages without an extractable embedded image get a deterministic
//! placeholder: a gradient tinted from the magazine title with the page
//! number drawn in the center. Encoded as PNG.

use image::{Rgba, RgbaImage};

/// 3x5 bitmap glyphs for the digits 0-9, row-major, one bit per pixel.
const DIGIT_GLYPHS: [[u8; 5]; 10] = [
    [0b111, 0b101, 0b101, 0b101, 0b111], // 0
    [0b010, 0b110, 0b010, 0b010, 0b111], // 1
    [0b111, 0b001, 0b111, 0b100, 0b111], // 2
    [0b111, 0b001, 0b111, 0b001, 0b111], // 3
    [0b101, 0b101, 0b111, 0b001, 0b001], // 4
    [0b111, 0b100, 0b111, 0b001, 0b111], // 5
    [0b111, 0b100, 0b111, 0b101, 0b111], // 6
    [0b111, 0b001, 0b001, 0b001, 0b001], // 7
    [0b111, 0b101, 0b111, 0b101, 0b111], // 8
    [0b111, 0b101, 0b111, 0b001, 0b111], // 9
];

/// Generate a placeholder page image as PNG bytes.
pub fn placeholder_page(title: &str, page_number: u32, width: u32, height: u32) -> Vec<u8> {
    let width = width.max(60);
    let height = height.max(80);

    // Color from title hash so every magazine gets a stable tint
    let hash = title
        .bytes()
        .fold(0u32, |acc, b| acc.wrapping_add(b as u32));
    let hue = (hash % 360) as f32;
    let (r, g, b) = hsv_to_rgb(hue, 0.25, 0.45);

    let mut img = RgbaImage::new(width, height);

    for y in 0..height {
        let factor = y as f32 / height as f32;
        let r2 = (r as f32 * (1.0 - factor * 0.3)) as u8;
        let g2 = (g as f32 * (1.0 - factor * 0.3)) as u8;
        let b2 = (b as f32 * (1.0 - factor * 0.3)) as u8;
        for x in 0..width {
            img.put_pixel(x, y, Rgba([r2, g2, b2, 255]));
        }
    }

    let border_color = Rgba([255, 255, 255, 60]);
    for x in 0..width {
        img.put_pixel(x, 0, border_color);
        img.put_pixel(x, height - 1, border_color);
    }
    for y in 0..height {
        img.put_pixel(0, y, border_color);
        img.put_pixel(width - 1, y, border_color);
    }

    draw_page_number(&mut img, page_number);

    let mut png_data = Vec::new();
    let _ = image::DynamicImage::ImageRgba8(img).write_to(
        &mut std::io::Cursor::new(&mut png_data),
        image::ImageFormat::Png,
    );

    png_data
}

/// Draw the page number centered, using scaled bitmap digits.
fn draw_page_number(img: &mut RgbaImage, page_number: u32) {
    let (width, height) = img.dimensions();
    let digits: Vec<usize> = page_number
        .to_string()
        .bytes()
        .map(|b| (b - b'0') as usize)
        .collect();

    // Scale so the number spans roughly a quarter of the page width
    let glyph_w = 3u32;
    let glyph_h = 5u32;
    let gap = 1u32;
    let total_cells = digits.len() as u32 * (glyph_w + gap) - gap;
    let scale = (width / 4 / total_cells).clamp(2, 16);

    let text_w = total_cells * scale;
    let text_h = glyph_h * scale;
    let origin_x = (width.saturating_sub(text_w)) / 2;
    let origin_y = (height.saturating_sub(text_h)) / 2;

    let ink = Rgba([255, 255, 255, 200]);
    for (i, &digit) in digits.iter().enumerate() {
        let cell_x = origin_x + i as u32 * (glyph_w + gap) * scale;
        for (row, bits) in DIGIT_GLYPHS[digit].iter().enumerate() {
            for col in 0..glyph_w {
                if bits & (1 << (glyph_w - 1 - col)) == 0 {
                    continue;
                }
                for dy in 0..scale {
                    for dx in 0..scale {
                        let px = cell_x + col * scale + dx;
                        let py = origin_y + row as u32 * scale + dy;
                        if px < width && py < height {
                            img.put_pixel(px, py, ink);
                        }
                    }
                }
            }
        }
    }
}

/// Convert HSV to RGB.
fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (u8, u8, u8) {
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = match h as u32 {
        0..=59 => (c, x, 0.0),
        60..=119 => (x, c, 0.0),
        120..=179 => (0.0, c, x),
        180..=239 => (0.0, x, c),
        240..=299 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    (
        ((r + m) * 255.0) as u8,
        ((g + m) * 255.0) as u8,
        ((b + m) * 255.0) as u8,
    )
}
