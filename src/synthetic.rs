//! Synthetic dataset generator.
//!
//! Produces a plausible long-format dataset with the same schema as a real
//! extraction, for demos and for exercising the chart and report stages when
//! no yearbook yields data. Each value is
//!
//! ```text
//! base(category) · factor(region) + trend(category) · i + noise
//! noise ~ Normal(0, noise_fraction · base(category))
//! ```
//!
//! where `i` is the year's index in the sorted year list. Values are
//! truncated to whole counts and clamped at zero. The same seed always
//! produces the same dataset.

use crate::output::{Dataset, Record};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use tracing::info;

/// Years covered by the built-in demo dataset.
pub const DEMO_YEARS: RangeInclusive<i32> = 2015..=2025;

/// Seed used when none is given.
pub const DEFAULT_SEED: u64 = 42;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionProfile {
    pub name: String,
    /// Multiplier applied to every category base.
    pub factor: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryProfile {
    pub name: String,
    /// Yearly count for a region with factor 1.0.
    pub base: f64,
    /// Change per year step.
    pub trend: f64,
}

/// Regions, categories and noise level of a synthetic dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticProfile {
    pub regions: Vec<RegionProfile>,
    pub categories: Vec<CategoryProfile>,
    /// Standard deviation of the noise as a fraction of the category base.
    pub noise_fraction: f64,
}

impl Default for SyntheticProfile {
    fn default() -> Self {
        let region = |name: &str, factor| RegionProfile {
            name: name.to_string(),
            factor,
        };
        let category = |name: &str, base, trend| CategoryProfile {
            name: name.to_string(),
            base,
            trend,
        };
        Self {
            regions: vec![
                region("Amazonas", 2.5),
                region("Roraima", 1.2),
                region("Acre", 1.0),
            ],
            categories: vec![
                category("Feminicídio", 15.0, 0.5),
                category("Estupro", 120.0, -1.5),
                category("Lesão Corporal", 350.0, 2.0),
                category("Violência Doméstica", 280.0, 1.0),
            ],
            noise_fraction: 0.15,
        }
    }
}

impl SyntheticProfile {
    /// Generate one record per (region, category, year), iterating regions,
    /// then categories, then years in ascending order.
    pub fn generate(&self, years: &[i32], seed: u64) -> Dataset {
        let mut years = years.to_vec();
        years.sort_unstable();
        years.dedup();

        let mut rng = StdRng::seed_from_u64(seed);
        let mut records =
            Vec::with_capacity(self.regions.len() * self.categories.len() * years.len());

        for region in &self.regions {
            for category in &self.categories {
                let sd = (self.noise_fraction * category.base).abs();
                for (i, &year) in years.iter().enumerate() {
                    let z: f64 = rng.sample(StandardNormal);
                    let raw = category.base * region.factor + category.trend * i as f64 + z * sd;
                    let value = raw.trunc().max(0.0);
                    records.push(Record::new(year, &region.name, &category.name, value));
                }
            }
        }

        info!(
            "Generated {} synthetic records ({} regions, {} categories, {} years)",
            records.len(),
            self.regions.len(),
            self.categories.len(),
            years.len()
        );
        Dataset::new(records)
    }
}

/// Generate a dataset for `years` with the default profile.
pub fn generate(years: &[i32], seed: u64) -> Dataset {
    SyntheticProfile::default().generate(years, seed)
}

/// The demo dataset: default profile over [`DEMO_YEARS`].
pub fn demo_dataset(seed: u64) -> Dataset {
    let years: Vec<i32> = DEMO_YEARS.collect();
    generate(&years, seed)
}

/// Stand-in dataset for a batch that extracted nothing: covers the years
/// whose documents exist, or [`DEMO_YEARS`] when none do.
pub fn fallback_dataset(available_years: &[i32], seed: u64) -> Dataset {
    if available_years.is_empty() {
        demo_dataset(seed)
    } else {
        generate(available_years, seed)
    }
}
