//! Input resolution: the year → document manifest and PDF sanity checks.
//!
//! ## Why check the magic bytes ourselves?
//!
//! pdfium reports a non-PDF file as a generic load failure. Reading the first
//! four bytes (`%PDF`) before handing the path over lets the batch summary
//! say "not a PDF" instead of "corrupt PDF", which is usually the more useful
//! hint (an HTML error page saved with a `.pdf` name, for instance).

use crate::error::{ExtractionError, YearbookError};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name used for a year's yearbook inside a data directory.
pub fn yearbook_file_name(year: i32) -> String {
    format!("anuario_{year}.pdf")
}

/// Ordered mapping from publication year to document path.
///
/// Iteration is always in ascending year order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: BTreeMap<i32, PathBuf>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the document for `year`.
    pub fn insert(&mut self, year: i32, path: impl Into<PathBuf>) {
        self.entries.insert(year, path.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn years(&self) -> Vec<i32> {
        self.entries.keys().copied().collect()
    }

    /// Years whose document exists on disk, ascending.
    pub fn available_years(&self) -> Vec<i32> {
        self.entries
            .iter()
            .filter(|(_, path)| path.is_file())
            .map(|(year, _)| *year)
            .collect()
    }

    pub fn get(&self, year: i32) -> Option<&Path> {
        self.entries.get(&year).map(PathBuf::as_path)
    }

    /// Entries in ascending year order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, &Path)> {
        self.entries.iter().map(|(y, p)| (*y, p.as_path()))
    }

    /// One `anuario_{year}.pdf` per year under `dir`. Files need not exist.
    pub fn from_dir(dir: impl AsRef<Path>, years: &[i32]) -> Self {
        let dir = dir.as_ref();
        years
            .iter()
            .map(|&y| (y, dir.join(yearbook_file_name(y))))
            .collect()
    }

    /// Load a JSON object mapping year strings to paths, e.g.
    /// `{"2020": "anuario_2020.pdf"}`. Relative paths resolve against the
    /// manifest's own directory.
    pub fn from_json(path: impl AsRef<Path>) -> Result<Self, YearbookError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| YearbookError::ManifestRead {
            path: path.to_path_buf(),
            source,
        })?;
        let invalid = |detail: String| YearbookError::InvalidManifest {
            path: path.to_path_buf(),
            detail,
        };

        let raw: BTreeMap<String, PathBuf> =
            serde_json::from_str(&text).map_err(|e| invalid(e.to_string()))?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));

        let mut manifest = Self::new();
        for (key, doc) in raw {
            let year = parse_year(&key).map_err(invalid)?;
            let doc = if doc.is_relative() { base.join(doc) } else { doc };
            manifest.insert(year, doc);
        }
        debug!("Loaded manifest {} ({} years)", path.display(), manifest.len());
        Ok(manifest)
    }

    /// Parse a `YEAR=PATH` command-line entry.
    pub fn parse_entry(entry: &str) -> Result<(i32, PathBuf), YearbookError> {
        let (year, path) = entry.split_once('=').ok_or_else(|| {
            YearbookError::InvalidConfig(format!("expected YEAR=PATH, got '{entry}'"))
        })?;
        let year = parse_year(year).map_err(YearbookError::InvalidConfig)?;
        let path = path.trim();
        if path.is_empty() {
            return Err(YearbookError::InvalidConfig(format!(
                "missing path for year {year}"
            )));
        }
        Ok((year, PathBuf::from(path)))
    }
}

impl FromIterator<(i32, PathBuf)> for Manifest {
    fn from_iter<T: IntoIterator<Item = (i32, PathBuf)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

fn parse_year(s: &str) -> Result<i32, String> {
    s.trim()
        .parse::<i32>()
        .ok()
        .filter(|y| (1900..=2999).contains(y))
        .ok_or_else(|| format!("invalid year '{}'", s.trim()))
}

/// Validate that `path` exists, is readable and starts with `%PDF`.
pub fn check_pdf(path: &Path) -> Result<(), ExtractionError> {
    if !path.exists() {
        return Err(ExtractionError::NotFound {
            path: path.to_path_buf(),
        });
    }

    match std::fs::File::open(path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(ExtractionError::NotAPdf {
                    path: path.to_path_buf(),
                    magic,
                });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ExtractionError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(ExtractionError::NotFound {
                path: path.to_path_buf(),
            });
        }
    }

    Ok(())
}
