//! Helvetica metrics for laying out the text this crate draws.
//!
//! Both the marker and the re-rendered address block use the standard-14
//! Helvetica face, which every PDF consumer carries without embedding. Its
//! advance widths are published in the Adobe AFM file, so text can be
//! measured without loading a font program.

/// Ascender height, in thousandths of the font size.
const ASCENDER: f32 = 718.0;

/// Descender depth (positive), in thousandths of the font size.
const DESCENDER: f32 = 207.0;

/// Width used for characters outside printable ASCII.
const FALLBACK_WIDTH: u16 = 556;

/// Advance widths for `' '..='~'`, in thousandths of the font size.
#[rustfmt::skip]
const WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,                               // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015,                                             // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833,                // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,                // 'N'..'Z'
    278, 278, 278, 469, 556, 333,                                                   // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833,                // 'a'..'m'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500,                // 'n'..'z'
    334, 260, 334, 584,                                                             // '{'..'~'
];

fn advance(c: char) -> u16 {
    match c {
        ' '..='~' => WIDTHS[c as usize - ' ' as usize],
        _ => FALLBACK_WIDTH,
    }
}

/// Rendered width of `text` at `font_size`, in points.
pub fn text_width(text: &str, font_size: f32) -> f32 {
    let units: u32 = text.chars().map(|c| advance(c) as u32).sum();
    units as f32 * font_size / 1000.0
}

/// Distance from the baseline to the top of the tallest glyph, in points.
pub fn ascent(font_size: f32) -> f32 {
    ASCENDER * font_size / 1000.0
}

/// Distance from the baseline to the bottom of the deepest glyph, in points.
pub fn descent(font_size: f32) -> f32 {
    DESCENDER * font_size / 1000.0
}

/// Full glyph box height, ascender to descender.
pub fn line_height(font_size: f32) -> f32 {
    ascent(font_size) + descent(font_size)
}
