//! Page layout: the geometry a table strategy works from.
//!
//! ## Why a layout layer?
//!
//! Both table heuristics only need two things from a page: where each piece
//! of text sits and where the drawn lines are. Reading those once into plain
//! structs keeps the heuristics free of pdfium handles, so they can be unit
//! tested against hand-built layouts and the pdfium document can be dropped
//! before any table work starts.
//!
//! All coordinates are PDF points with a **top-left** origin: `y` grows
//! downwards, matching reading order.

use crate::config::PageSelection;
use crate::error::ExtractionError;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Axis-aligned box, top-left origin (`y0 <= y1`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    pub fn center_x(&self) -> f32 {
        (self.x0 + self.x1) / 2.0
    }

    pub fn center_y(&self) -> f32 {
        (self.y0 + self.y1) / 2.0
    }

    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }
}

/// A run of text with its bounding box.
#[derive(Debug, Clone, PartialEq)]
pub struct TextFragment {
    pub text: String,
    pub bbox: Rect,
}

impl TextFragment {
    pub fn new(text: impl Into<String>, x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            text: text.into(),
            bbox: Rect::new(x0, y0, x1, y1),
        }
    }
}

/// Text and vector paths of one page.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageLayout {
    /// 1-based page number.
    pub number: usize,
    pub width: f32,
    pub height: f32,
    /// Text fragments sorted top to bottom, then left to right.
    pub fragments: Vec<TextFragment>,
    /// Straight, axis-aligned path pieces: one box per line segment, so a
    /// grid drawn as a single path still yields every ruling.
    pub paths: Vec<Rect>,
}

impl PageLayout {
    pub fn sort_fragments(&mut self) {
        self.fragments.sort_by(|a, b| {
            a.bbox
                .y0
                .total_cmp(&b.bbox.y0)
                .then(a.bbox.x0.total_cmp(&b.bbox.x0))
        });
    }
}

/// Layouts of the selected pages of one document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocumentLayout {
    pub path: PathBuf,
    pub total_pages: usize,
    pub pages: Vec<PageLayout>,
}

/// Reads page layouts from a document.
///
/// The pdfium-backed [`PdfiumLayoutSource`] is used in production; tests
/// supply hand-built layouts.
pub trait LayoutSource {
    fn load(
        &self,
        path: &Path,
        pages: &PageSelection,
        password: Option<&str>,
    ) -> Result<DocumentLayout, ExtractionError>;
}

// ── pdfium ───────────────────────────────────────────────────────────────

/// Layout source backed by a bound pdfium library.
pub struct PdfiumLayoutSource<'a> {
    pdfium: &'a Pdfium,
}

impl<'a> PdfiumLayoutSource<'a> {
    pub fn new(pdfium: &'a Pdfium) -> Self {
        Self { pdfium }
    }
}

impl LayoutSource for PdfiumLayoutSource<'_> {
    fn load(
        &self,
        path: &Path,
        selection: &PageSelection,
        password: Option<&str>,
    ) -> Result<DocumentLayout, ExtractionError> {
        let document = self
            .pdfium
            .load_pdf_from_file(path, password)
            .map_err(|e| {
                let detail = format!("{:?}", e);
                if detail.contains("Password") || detail.contains("password") {
                    ExtractionError::PasswordRequired {
                        path: path.to_path_buf(),
                    }
                } else {
                    ExtractionError::CorruptPdf {
                        path: path.to_path_buf(),
                        detail,
                    }
                }
            })?;

        let pages = document.pages();
        let total_pages = pages.len() as usize;
        let indices = selection.to_indices(total_pages);
        info!(
            "{}: {} pages, reading {}",
            path.display(),
            total_pages,
            indices.len()
        );

        let mut layouts = Vec::with_capacity(indices.len());
        for idx in indices {
            let unreadable = |detail: String| ExtractionError::PageUnreadable {
                path: path.to_path_buf(),
                page: idx + 1,
                detail,
            };
            let page = pages
                .get(idx as u16)
                .map_err(|e| unreadable(format!("{:?}", e)))?;
            let layout = read_page(&page, idx + 1).map_err(|e| unreadable(format!("{:?}", e)))?;
            debug!(
                "Page {}: {} text fragments, {} paths",
                idx + 1,
                layout.fragments.len(),
                layout.paths.len()
            );
            layouts.push(layout);
        }

        Ok(DocumentLayout {
            path: path.to_path_buf(),
            total_pages,
            pages: layouts,
        })
    }
}

/// Collect text segments and path boxes, flipping to a top-left origin.
fn read_page(page: &PdfPage, number: usize) -> Result<PageLayout, PdfiumError> {
    let width = page.width().value;
    let height = page.height().value;

    let mut fragments = Vec::new();
    let text = page.text()?;
    for segment in text.segments().iter() {
        let content = segment.text();
        let content = content.trim();
        if content.is_empty() {
            continue;
        }
        let b = segment.bounds();
        fragments.push(TextFragment::new(
            content,
            b.left().value,
            height - b.top().value,
            b.right().value,
            height - b.bottom().value,
        ));
    }

    let mut paths = Vec::new();
    for object in page.objects().iter() {
        let Some(path) = object.as_path_object() else {
            continue;
        };
        let steps = path_steps(path, height);
        if steps.is_empty() {
            let b = object.bounds()?;
            paths.push(Rect::new(
                b.left().value,
                height - b.top().value,
                b.right().value,
                height - b.bottom().value,
            ));
        } else {
            paths.extend(path_lines(&steps));
        }
    }

    let mut layout = PageLayout {
        number,
        width,
        height,
        fragments,
        paths,
    };
    layout.sort_fragments();
    Ok(layout)
}

fn path_steps(path: &PdfPagePathObject, height: f32) -> Vec<PathStep> {
    let mut steps = Vec::new();
    for segment in path.segments().iter() {
        let (x, y) = (segment.x().value, height - segment.y().value);
        match segment.segment_type() {
            PdfPathSegmentType::MoveTo => steps.push(PathStep::MoveTo(x, y)),
            PdfPathSegmentType::LineTo => steps.push(PathStep::LineTo(x, y)),
            PdfPathSegmentType::BezierTo => steps.push(PathStep::CurveTo(x, y)),
            PdfPathSegmentType::Unknown => {}
        }
        if segment.is_close() {
            steps.push(PathStep::Close);
        }
    }
    steps
}

// ── Path segments ────────────────────────────────────────────────────────

/// Slack for a segment to count as horizontal or vertical.
const AXIS_TOLERANCE: f32 = 0.5;

/// One path construction step, already in top-left page coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathStep {
    MoveTo(f32, f32),
    LineTo(f32, f32),
    /// End point of a curve; the curve itself never forms a ruling.
    CurveTo(f32, f32),
    /// Close the current subpath back to its start.
    Close,
}

/// Horizontal and vertical line segments of a path, one box each.
///
/// Diagonal segments and curves are skipped; zero-length segments too.
pub fn path_lines(steps: &[PathStep]) -> Vec<Rect> {
    let mut lines = Vec::new();
    let mut current: Option<(f32, f32)> = None;
    let mut start: Option<(f32, f32)> = None;

    let mut push = |from: (f32, f32), to: (f32, f32)| {
        let (dx, dy) = ((to.0 - from.0).abs(), (to.1 - from.1).abs());
        if (dx <= AXIS_TOLERANCE) != (dy <= AXIS_TOLERANCE) {
            lines.push(Rect::new(from.0, from.1, to.0, to.1));
        }
    };

    for step in steps {
        match *step {
            PathStep::MoveTo(x, y) => {
                current = Some((x, y));
                start = Some((x, y));
            }
            PathStep::LineTo(x, y) => {
                if let Some(from) = current {
                    push(from, (x, y));
                }
                current = Some((x, y));
            }
            PathStep::CurveTo(x, y) => current = Some((x, y)),
            PathStep::Close => {
                if let (Some(from), Some(to)) = (current, start) {
                    push(from, to);
                }
                current = start;
            }
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_normalises_corners() {
        let r = Rect::new(10.0, 40.0, 2.0, 20.0);
        assert_eq!((r.x0, r.y0, r.x1, r.y1), (2.0, 20.0, 10.0, 40.0));
        assert_eq!(r.width(), 8.0);
        assert_eq!(r.center_y(), 30.0);
        assert!(r.contains_point(5.0, 25.0));
        assert!(!r.contains_point(11.0, 25.0));
    }

    #[test]
    fn fragments_sort_in_reading_order() {
        let mut page = PageLayout {
            fragments: vec![
                TextFragment::new("b", 50.0, 10.0, 60.0, 20.0),
                TextFragment::new("c", 0.0, 30.0, 10.0, 40.0),
                TextFragment::new("a", 0.0, 10.0, 10.0, 20.0),
            ],
            ..Default::default()
        };
        page.sort_fragments();
        let order: Vec<&str> = page.fragments.iter().map(|f| f.text.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn path_lines_splits_polylines_and_closes_boxes() {
        let steps = [
            PathStep::MoveTo(10.0, 10.0),
            PathStep::LineTo(110.0, 10.0),
            PathStep::LineTo(110.0, 60.0),
            PathStep::LineTo(10.0, 60.0),
            PathStep::Close,
        ];
        assert_eq!(
            path_lines(&steps),
            vec![
                Rect::new(10.0, 10.0, 110.0, 10.0),
                Rect::new(110.0, 10.0, 110.0, 60.0),
                Rect::new(10.0, 60.0, 110.0, 60.0),
                Rect::new(10.0, 10.0, 10.0, 60.0),
            ]
        );
    }

    #[test]
    fn path_lines_skips_diagonals_and_curves() {
        let steps = [
            PathStep::MoveTo(0.0, 0.0),
            PathStep::LineTo(50.0, 50.0),
            PathStep::CurveTo(80.0, 20.0),
            PathStep::LineTo(80.0, 20.0),
            PathStep::LineTo(80.0, 90.0),
        ];
        assert_eq!(path_lines(&steps), vec![Rect::new(80.0, 20.0, 80.0, 90.0)]);
    }
}
