//! pdfium binding.
//!
//! Every stage that touches a PDF (reading yearbooks, painting charts,
//! assembling the report) goes through one bound [`Pdfium`]. The library is
//! looked up in this order:
//!
//! 1. `PDFIUM_LIB_PATH`: the library file itself, or the directory holding it
//! 2. the platform library name in the current directory (`./libpdfium.so`, …)
//! 3. the system library search path
//!
//! The first candidate that binds wins. Pre-built libraries are published at
//! <https://github.com/bblanchon/pdfium-binaries/releases>.

use crate::error::YearbookError;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming the pdfium library (file or directory).
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Library files to try before the system search path.
pub fn library_candidates(env_value: Option<&str>) -> Vec<PathBuf> {
    let mut candidates = Vec::with_capacity(2);
    if let Some(value) = env_value.map(str::trim).filter(|v| !v.is_empty()) {
        let p = PathBuf::from(value);
        if p.is_dir() {
            candidates.push(Pdfium::pdfium_platform_library_name_at_path(&p));
        } else {
            candidates.push(p);
        }
    }
    candidates.push(Pdfium::pdfium_platform_library_name_at_path("./"));
    candidates
}

/// Bind to pdfium using the lookup order described in the module docs.
pub fn bind_pdfium() -> Result<Pdfium, YearbookError> {
    let env_value = std::env::var(PDFIUM_LIB_PATH_ENV).ok();
    let mut failures = Vec::new();

    for candidate in library_candidates(env_value.as_deref()) {
        match Pdfium::bind_to_library(&candidate) {
            Ok(bindings) => {
                info!("Bound pdfium from {}", candidate.display());
                return Ok(Pdfium::new(bindings));
            }
            Err(e) => {
                debug!("pdfium not bindable at {}: {:?}", candidate.display(), e);
                failures.push(format!("{}: {:?}", candidate.display(), e));
            }
        }
    }

    match Pdfium::bind_to_system_library() {
        Ok(bindings) => {
            info!("Bound system pdfium library");
            Ok(Pdfium::new(bindings))
        }
        Err(e) => {
            failures.push(format!("system library: {:?}", e));
            Err(YearbookError::PdfiumBindingFailed(failures.join("; ")))
        }
    }
}

/// Bind to the pdfium library at an explicit `path`.
pub fn bind_pdfium_from_path(path: &Path) -> Result<Pdfium, YearbookError> {
    Pdfium::bind_to_library(path)
        .map(Pdfium::new)
        .map_err(|e| YearbookError::PdfiumBindingFailed(format!("{}: {:?}", path.display(), e)))
}
