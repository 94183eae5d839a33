//! Backend-free drawing model.
//!
//! Charts and report pages are first laid out as a [`Scene`]: a page size
//! plus an ordered list of [`DrawOp`]s in points, top-left origin. Layout
//! code is pure and unit-tested; only [`crate::pipeline::paint`] knows how to
//! turn a scene into pdfium page objects.
//!
//! Text metrics are approximate (Helvetica average advance widths). That is
//! enough to centre titles, right-align axis labels and wrap paragraphs.

use std::path::PathBuf;

/// RGBA colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const DARK_GREY: Color = Color::rgb(64, 64, 64);
    pub const GREY: Color = Color::rgb(128, 128, 128);
    pub const LIGHT_GREY: Color = Color::rgb(215, 215, 215);
    pub const NAVY: Color = Color::rgb(31, 56, 100);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Linear interpolation towards `other`, `t` in `[0, 1]`.
    pub fn lerp(self, other: Color, t: f32) -> Color {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Color {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
            a: mix(self.a, other.a),
        }
    }

    /// Relative luminance in `[0, 1]`, used to pick a readable text colour.
    pub fn luminance(self) -> f32 {
        (0.2126 * self.r as f32 + 0.7152 * self.g as f32 + 0.0722 * self.b as f32) / 255.0
    }
}

/// Qualitative palette for series lines.
pub const PALETTE: [Color; 8] = [
    Color::rgb(31, 119, 180),
    Color::rgb(255, 127, 14),
    Color::rgb(44, 160, 44),
    Color::rgb(214, 39, 40),
    Color::rgb(148, 103, 189),
    Color::rgb(140, 86, 75),
    Color::rgb(227, 119, 194),
    Color::rgb(23, 190, 207),
];

pub fn series_color(index: usize) -> Color {
    PALETTE[index % PALETTE.len()]
}

const YL_OR_RD: [Color; 5] = [
    Color::rgb(255, 255, 204),
    Color::rgb(254, 217, 118),
    Color::rgb(253, 141, 60),
    Color::rgb(227, 26, 28),
    Color::rgb(128, 0, 38),
];

/// Sequential yellow → orange → red scale, `t` in `[0, 1]`.
pub fn heat_color(t: f32) -> Color {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let scaled = t * (YL_OR_RD.len() - 1) as f32;
    let i = (scaled.floor() as usize).min(YL_OR_RD.len() - 2);
    YL_OR_RD[i].lerp(YL_OR_RD[i + 1], scaled - i as f32)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FontStyle {
    #[default]
    Regular,
    Bold,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

/// One drawing instruction. Coordinates are points from the top-left corner.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        color: Color,
        width: f32,
    },
    Rect {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        fill: Option<Color>,
        stroke: Option<(Color, f32)>,
    },
    Circle {
        cx: f32,
        cy: f32,
        r: f32,
        fill: Color,
    },
    /// `y` is the text baseline; `x` is the anchor selected by `align`.
    Text {
        x: f32,
        y: f32,
        text: String,
        size: f32,
        style: FontStyle,
        color: Color,
        align: Align,
    },
    /// A raster image scaled into the given box.
    Image {
        path: PathBuf,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
    },
}

/// A page-sized list of draw operations.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub width: f32,
    pub height: f32,
    pub ops: Vec<DrawOp>,
}

impl Scene {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            ops: Vec::new(),
        }
    }

    pub fn push(&mut self, op: DrawOp) {
        self.ops.push(op);
    }

    pub fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, color: Color, width: f32) {
        self.push(DrawOp::Line {
            x1,
            y1,
            x2,
            y2,
            color,
            width,
        });
    }

    pub fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, fill: Color) {
        self.push(DrawOp::Rect {
            x,
            y,
            w,
            h,
            fill: Some(fill),
            stroke: None,
        });
    }

    pub fn stroke_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color, width: f32) {
        self.push(DrawOp::Rect {
            x,
            y,
            w,
            h,
            fill: None,
            stroke: Some((color, width)),
        });
    }

    pub fn circle(&mut self, cx: f32, cy: f32, r: f32, fill: Color) {
        self.push(DrawOp::Circle { cx, cy, r, fill });
    }

    #[allow(clippy::too_many_arguments)]
    pub fn text(
        &mut self,
        x: f32,
        y: f32,
        text: impl Into<String>,
        size: f32,
        style: FontStyle,
        color: Color,
        align: Align,
    ) {
        self.push(DrawOp::Text {
            x,
            y,
            text: text.into(),
            size,
            style,
            color,
            align,
        });
    }

    pub fn image(&mut self, path: impl Into<PathBuf>, x: f32, y: f32, w: f32, h: f32) {
        self.push(DrawOp::Image {
            path: path.into(),
            x,
            y,
            w,
            h,
        });
    }

    /// Every text string in draw order.
    pub fn texts(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

// ── Text metrics ─────────────────────────────────────────────────────────

/// Helvetica advance widths (1/1000 em) for ASCII 32..=126, from the
/// standard 14 font metrics. Oblique shares the regular widths.
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584,
    278, 333, 278, 278, 556, 556, 556, 556, 556, 556, 556, 556,
    556, 556, 278, 278, 584, 584, 584, 556, 1015, 667, 667, 722,
    722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278,
    278, 278, 469, 556, 333, 556, 556, 500, 556, 556, 278, 556,
    556, 222, 222, 500, 222, 833, 556, 556, 556, 556, 333, 500,
    278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584,
    278, 333, 278, 278, 556, 556, 556, 556, 556, 556, 556, 556,
    556, 556, 333, 333, 584, 584, 584, 611, 975, 722, 722, 722,
    722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333,
    278, 333, 584, 556, 333, 556, 611, 556, 611, 556, 333, 611,
    611, 278, 278, 556, 278, 889, 611, 611, 611, 611, 389, 556,
    333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Unaccented ASCII letter with the same advance as `c`.
fn width_proxy(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
        'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'A',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'É' | 'È' | 'Ê' | 'Ë' => 'E',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'O',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
        'ç' => 'c',
        'Ç' => 'C',
        'ñ' => 'n',
        'Ñ' => 'N',
        'º' | 'ª' => 'o',
        '–' => '-',
        '→' => 'M',
        _ => c,
    }
}

/// Advance of one character, in ems.
fn char_advance(c: char, style: FontStyle) -> f32 {
    let table = match style {
        FontStyle::Bold => &HELVETICA_BOLD,
        _ => &HELVETICA,
    };
    let code = width_proxy(c) as u32;
    let units = match code {
        32..=126 => table[(code - 32) as usize],
        _ => 556,
    };
    f32::from(units) / 1000.0
}

/// Width of `text` in points, set in Helvetica at `size`.
///
/// Used for layout before anything is painted; the painter re-measures
/// aligned text against the embedded font.
pub fn text_width(text: &str, size: f32, style: FontStyle) -> f32 {
    text.chars().map(|c| char_advance(c, style)).sum::<f32>() * size
}

/// Greedy word wrap to lines no wider than `max_width`. Paragraph breaks
/// (`\n`) are kept; a single word wider than the line stands alone.
pub fn wrap_text(text: &str, size: f32, style: FontStyle, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if !current.is_empty() && text_width(&candidate, size, style) > max_width {
                lines.push(std::mem::take(&mut current));
                current = word.to_string();
            } else {
                current = candidate;
            }
        }
        lines.push(current);
    }
    lines
}

/// Lowercase, ASCII-only file-name stem: `Lesão Corporal` → `lesao_corporal`.
pub fn slug(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for c in label.trim().to_lowercase().chars() {
        let mapped = match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            'ñ' => 'n',
            c if c.is_ascii_alphanumeric() => c,
            _ => '_',
        };
        if mapped == '_' && (out.is_empty() || out.ends_with('_')) {
            continue;
        }
        out.push(mapped);
    }
    while out.ends_with('_') {
        out.pop();
    }
    if out.is_empty() {
        out.push_str("unnamed");
    }
    out
}
