//! Group-by views of a dataset that the charts plot.
//!
//! Duplicate records (several source tables reporting the same year, region
//! and category) are summed here, at render time; the dataset itself keeps
//! every row.

use crate::output::{Dataset, Record};

/// One plotted line: `(year, value)` points in ascending year order.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub points: Vec<(i32, f64)>,
}

impl Series {
    pub fn max_value(&self) -> f64 {
        self.points.iter().map(|p| p.1).fold(0.0, f64::max)
    }
}

/// Build one series per distinct `key` among the records passing `keep`,
/// summing values that share a year. Series follow first-appearance order.
pub fn series_by<'a>(
    dataset: &'a Dataset,
    keep: impl Fn(&Record) -> bool,
    key: impl Fn(&'a Record) -> &'a str,
) -> Vec<Series> {
    let mut out: Vec<Series> = Vec::new();
    for record in dataset.iter().filter(|r| keep(r)) {
        let label = key(record);
        let idx = match out.iter().position(|s| s.label == label) {
            Some(i) => i,
            None => {
                out.push(Series {
                    label: label.to_string(),
                    points: Vec::new(),
                });
                out.len() - 1
            }
        };
        let points = &mut out[idx].points;
        match points.iter_mut().find(|(y, _)| *y == record.year) {
            Some((_, v)) => *v += record.value,
            None => points.push((record.year, record.value)),
        }
    }
    for s in &mut out {
        s.points.sort_by_key(|(y, _)| *y);
    }
    out
}

/// One series per category for `region`.
pub fn region_timeseries(dataset: &Dataset, region: &str) -> Vec<Series> {
    series_by(dataset, |r| r.region == region, |r| r.category.as_str())
}

/// One series per region for `category`.
pub fn category_comparison(dataset: &Dataset, category: &str) -> Vec<Series> {
    series_by(dataset, |r| r.category == category, |r| r.region.as_str())
}

/// One series per category, summed over all regions.
pub fn overall_trend(dataset: &Dataset) -> Vec<Series> {
    series_by(dataset, |_| true, |r| r.category.as_str())
}

/// Region × year totals for one category.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatGrid {
    pub regions: Vec<String>,
    pub years: Vec<i32>,
    /// `values[region][year]`; `None` where no record exists.
    pub values: Vec<Vec<Option<f64>>>,
}

impl HeatGrid {
    /// Smallest and largest present value.
    pub fn range(&self) -> Option<(f64, f64)> {
        self.values
            .iter()
            .flatten()
            .flatten()
            .fold(None, |acc, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

pub fn heat_grid(dataset: &Dataset, category: &str) -> HeatGrid {
    let rows = category_comparison(dataset, category);
    let mut years: Vec<i32> = rows
        .iter()
        .flat_map(|s| s.points.iter().map(|p| p.0))
        .collect();
    years.sort_unstable();
    years.dedup();

    let values = rows
        .iter()
        .map(|s| {
            years
                .iter()
                .map(|y| s.points.iter().find(|p| p.0 == *y).map(|p| p.1))
                .collect()
        })
        .collect();

    HeatGrid {
        regions: rows.into_iter().map(|s| s.label).collect(),
        years,
        values,
    }
}
