//! Pipeline stages for yearbook table extraction.
//!
//! Each submodule implements exactly one step. Keeping stages separate makes
//! each independently testable and keeps pdfium confined to two edges
//! ([`layout`] for reading, [`paint`] for writing).
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ layout ──▶ strategy ──▶ normalize
//! (path)    (pdfium)   (stream /    (filter, reshape,
//!                       lattice)     coerce)
//! ```
//!
//! 1. [`input`]    : manifest of `year → path`, `%PDF` check
//! 2. [`layout`]   : text fragments and path rectangles per page
//! 3. [`strategy`] : table-detection heuristics over a layout
//! 4. [`extract`]  : strategy cascade per document
//! 5. [`normalize`]: raw table → tagged rows → long records
//!
//! [`paint`] turns charts and report pages into pdfium page objects.

pub mod extract;
pub mod input;
pub mod layout;
pub mod normalize;
pub mod paint;
pub mod strategy;
