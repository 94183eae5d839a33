//! Scene painting via pdfium: PDF pages and PNG rasters.
//!
//! ## Why paint through pdfium?
//!
//! The crate already binds pdfium to read yearbooks. The same library can
//! create documents, place text, paths and images on a page, and rasterise
//! that page. Charts are therefore painted as one-page vector PDFs and
//! rendered to PNG at the requested pixel width; the report is a multi-page
//! document painted the same way.
//!
//! Scenes use a top-left origin; PDF pages use bottom-left. Every `y` is
//! flipped here and nowhere else.

use crate::draw::{text_width, Align, Color, DrawOp, FontStyle, Scene};
use crate::error::YearbookError;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Clone, Copy)]
struct Fonts {
    regular: PdfFontToken,
    bold: PdfFontToken,
    italic: PdfFontToken,
}

impl Fonts {
    fn load(document: &mut PdfDocument) -> Self {
        let fonts = document.fonts_mut();
        Self {
            regular: fonts.helvetica(),
            bold: fonts.helvetica_bold(),
            italic: fonts.helvetica_oblique(),
        }
    }

    fn get(&self, style: FontStyle) -> PdfFontToken {
        match style {
            FontStyle::Regular => self.regular,
            FontStyle::Bold => self.bold,
            FontStyle::Italic => self.italic,
        }
    }
}

fn pdf_color(c: Color) -> PdfColor {
    PdfColor::new(c.r, c.g, c.b, c.a)
}

/// Paints [`Scene`]s with a bound pdfium library.
pub struct Painter<'a> {
    pdfium: &'a Pdfium,
}

impl<'a> Painter<'a> {
    pub fn new(pdfium: &'a Pdfium) -> Self {
        Self { pdfium }
    }

    /// Paint `scene` on a single page and save it as a PNG `width_px` wide.
    pub fn render_png(&self, scene: &Scene, path: &Path, width_px: u32) -> Result<(), YearbookError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let failed = |detail: String| YearbookError::ChartRenderFailed {
            name: name.clone(),
            detail,
        };

        let mut document = self
            .pdfium
            .create_new_pdf()
            .map_err(|e| failed(format!("{:?}", e)))?;
        let fonts = Fonts::load(&mut document);
        let mut page = document
            .pages_mut()
            .create_page_at_end(page_size(scene))
            .map_err(|e| failed(format!("{:?}", e)))?;
        paint_page(&mut page, scene, &fonts).map_err(|e| failed(format!("{:?}", e)))?;

        let render_config = PdfRenderConfig::new().set_target_width(width_px as i32);
        let image = page
            .render_with_config(&render_config)
            .map_err(|e| failed(format!("{:?}", e)))?
            .as_image();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| YearbookError::OutputWriteFailed {
                path: path.to_path_buf(),
                source,
            })?;
        }
        image
            .save_with_format(path, image::ImageFormat::Png)
            .map_err(|e| failed(e.to_string()))?;
        debug!("Rendered {} ({}x{} px)", path.display(), image.width(), image.height());
        Ok(())
    }

    /// Paint one page per scene and save the document to `path`.
    ///
    /// Uses atomic write (temp file + rename) so a failed run never leaves a
    /// truncated PDF behind.
    pub fn write_pdf(&self, scenes: &[Scene], path: &Path) -> Result<(), YearbookError> {
        let failed = |detail: String| YearbookError::ReportFailed {
            path: path.to_path_buf(),
            detail,
        };
        let write_err = |source: std::io::Error| YearbookError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        };

        let mut document = self
            .pdfium
            .create_new_pdf()
            .map_err(|e| failed(format!("{:?}", e)))?;
        let fonts = Fonts::load(&mut document);

        for (i, scene) in scenes.iter().enumerate() {
            let mut page = document
                .pages_mut()
                .create_page_at_end(page_size(scene))
                .map_err(|e| failed(format!("page {}: {:?}", i + 1, e)))?;
            paint_page(&mut page, scene, &fonts)
                .map_err(|e| failed(format!("page {}: {:?}", i + 1, e)))?;
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        let tmp_path = path.with_extension("pdf.tmp");
        let saved = document
            .save_to_file(&tmp_path)
            .map_err(|e| failed(format!("{:?}", e)))
            .and_then(|()| std::fs::rename(&tmp_path, path).map_err(write_err));
        if let Err(e) = saved {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(e);
        }
        debug!("Wrote {} pages to {}", scenes.len(), path.display());
        Ok(())
    }
}

fn page_size(scene: &Scene) -> PdfPagePaperSize {
    PdfPagePaperSize::Custom(PdfPoints::new(scene.width), PdfPoints::new(scene.height))
}

fn paint_page(page: &mut PdfPage, scene: &Scene, fonts: &Fonts) -> Result<(), PdfiumError> {
    let h = scene.height;
    let objects = page.objects_mut();

    for op in &scene.ops {
        match op {
            DrawOp::Line {
                x1,
                y1,
                x2,
                y2,
                color,
                width,
            } => {
                objects.create_path_object_line(
                    PdfPoints::new(*x1),
                    PdfPoints::new(h - y1),
                    PdfPoints::new(*x2),
                    PdfPoints::new(h - y2),
                    pdf_color(*color),
                    PdfPoints::new(*width),
                )?;
            }
            DrawOp::Rect {
                x,
                y,
                w,
                h: rh,
                fill,
                stroke,
            } => {
                let rect = PdfRect::new_from_values(h - (y + rh), *x, h - y, x + w);
                objects.create_path_object_rect(
                    rect,
                    stroke.map(|(c, _)| pdf_color(c)),
                    stroke.map(|(_, w)| PdfPoints::new(w)),
                    fill.map(pdf_color),
                )?;
            }
            DrawOp::Circle { cx, cy, r, fill } => {
                objects.create_path_object_circle_at(
                    PdfPoints::new(*cx),
                    PdfPoints::new(h - cy),
                    PdfPoints::new(*r),
                    None,
                    None,
                    Some(pdf_color(*fill)),
                )?;
            }
            DrawOp::Text {
                x,
                y,
                text,
                size,
                style,
                color,
                align,
            } => {
                if text.trim().is_empty() {
                    continue;
                }
                let mut object = objects.create_text_object(
                    PdfPoints::new(*x),
                    PdfPoints::new(h - y),
                    text,
                    fonts.get(*style),
                    PdfPoints::new(*size),
                )?;
                object.set_fill_color(pdf_color(*color))?;
                if *align != Align::Left {
                    let width = measured_width(&object)
                        .unwrap_or_else(|| text_width(text, *size, *style));
                    let shift = match align {
                        Align::Center => -width / 2.0,
                        _ => -width,
                    };
                    object.translate(PdfPoints::new(shift), PdfPoints::ZERO)?;
                }
            }
            DrawOp::Image { path, x, y, w, h: ih } => {
                let image = match image::open(path) {
                    Ok(img) => img,
                    Err(e) => {
                        warn!("Skipping image {}: {}", path.display(), e);
                        continue;
                    }
                };
                objects.create_image_object(
                    PdfPoints::new(*x),
                    PdfPoints::new(h - (y + ih)),
                    &image,
                    Some(PdfPoints::new(*w)),
                    Some(PdfPoints::new(*ih)),
                )?;
            }
        }
    }
    Ok(())
}

/// Width of a placed text object as pdfium lays it out with the embedded font.
fn measured_width(object: &PdfPageObject) -> Option<f32> {
    let bounds = object.bounds().ok()?;
    let width = bounds.right().value - bounds.left().value;
    (width.is_finite() && width > 0.0).then_some(width)
}
