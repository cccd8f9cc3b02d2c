//! Zonal stat vocabulary and aggregation kernel
//!
//! Stat names stay strings end-to-end: record keys are strings on the
//! output contract, and the dispatch layer's vocabulary check compares
//! requested names against this module's fixed set.

use crate::error::{Error, Result};
use crate::raster::GeoTransform;
use ndarray::Array2;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// Stats computed when the caller does not ask for any
pub const DEFAULT_STATS: [&str; 4] = ["count", "min", "max", "mean"];

/// The fixed stat vocabulary, shared by both engines. `percentile_N` is
/// accepted in addition to these exact names.
pub const VALID_STATS: [&str; 13] = [
    "count", "min", "max", "mean", "sum", "std", "median", "majority", "minority", "unique",
    "range", "nodata", "nan",
];

/// Whether a normalized stat name is a member of the fixed vocabulary
/// (including the parametrized percentile family).
pub fn is_supported_stat(name: &str) -> bool {
    VALID_STATS.contains(&name) || parse_percentile(name).is_ok()
}

/// Parse a `percentile_N` stat name into its rank.
pub fn parse_percentile(name: &str) -> Result<f64> {
    let raw = name
        .strip_prefix("percentile_")
        .ok_or_else(|| Error::InvalidInput(format!("{name} is not a percentile stat")))?;
    let q: f64 = raw
        .parse()
        .map_err(|_| Error::InvalidInput(format!("bad percentile rank in {name}")))?;
    if !(0.0..=100.0).contains(&q) {
        return Err(Error::InvalidInput(format!(
            "percentile rank must be between 0 and 100, got {q}"
        )));
    }
    Ok(q)
}

/// Normalize a requested stat list: lowercase, order-preserving dedup,
/// `"*"` expands to the whole vocabulary, `None` means the default set.
/// Unknown names are an invalid-input error regardless of which engine
/// will run.
pub fn check_stats(stats: Option<&[String]>, categorical: bool) -> Result<Vec<String>> {
    let mut out: Vec<String> = Vec::new();

    match stats {
        None => {
            if !categorical {
                out.extend(DEFAULT_STATS.iter().map(|s| s.to_string()));
            }
        }
        Some([star]) if star == "*" => {
            out.extend(VALID_STATS.iter().map(|s| s.to_string()));
        }
        Some(names) => {
            for name in names {
                let name = name.trim().to_ascii_lowercase();
                if !VALID_STATS.contains(&name.as_str()) {
                    // Validates the rank as a side effect
                    parse_percentile(&name).map_err(|_| {
                        Error::InvalidInput(format!(
                            "stat {name} is not valid; must be one of {VALID_STATS:?} or percentile_N"
                        ))
                    })?;
                }
                if !out.contains(&name) {
                    out.push(name);
                }
            }
        }
    }

    Ok(out)
}

/// A single output value: numeric, or the explicit missing marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StatValue {
    Int(i64),
    Float(f64),
    Null,
}

impl StatValue {
    /// Numeric view; `Null` has none
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            StatValue::Int(v) => Some(*v as f64),
            StatValue::Float(v) => Some(*v),
            StatValue::Null => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, StatValue::Null)
    }
}

/// Per-zone mini raster attached when full-raster output is requested
#[derive(Debug, Clone)]
pub struct MiniRaster {
    /// Masked window values; cells outside the zone carry `fill`
    pub array: Array2<f64>,
    /// Transform of the window in world space
    pub transform: GeoTransform,
    /// Fill value used outside the zone mask
    pub fill: f64,
}

/// One zone's aggregated output: stat name -> value, plus the optional
/// GeoJSON-echo and mini-raster payloads the reference engine can attach.
#[derive(Debug, Clone, Default)]
pub struct StatRecord {
    /// Stat name (optionally prefixed by the dispatch layer) -> value
    pub values: BTreeMap<String, StatValue>,
    /// Original feature properties, for GeoJSON-echo output
    pub properties: Option<crate::vector::Properties>,
    /// Original feature geometry, for GeoJSON-echo output
    pub geometry: Option<geo_types::Geometry<f64>>,
    /// Masked window, for full-raster-array output
    pub mini_raster: Option<Box<MiniRaster>>,
}

impl StatRecord {
    /// Numeric value of a stat, if present and not missing
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.values.get(name).and_then(StatValue::as_f64)
    }
}

fn sort_values(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    sorted
}

/// Linear-interpolated percentile over sorted values
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let q = q.clamp(0.0, 100.0);
    let n = sorted.len() as f64;
    let pos = (q / 100.0) * (n - 1.0);
    let low = pos.floor() as usize;
    let high = pos.ceil() as usize;
    if low == high {
        sorted[low]
    } else {
        let weight = pos - (low as f64);
        (sorted[low] * (1.0 - weight)) + (sorted[high] * weight)
    }
}

/// Bit-exact value histogram. Keys are the f64 bit patterns so distinct
/// NaN payloads or signed zeros never collapse by accident.
pub fn histogram(values: &[f64]) -> HashMap<u64, usize> {
    let mut map = HashMap::new();
    for v in values {
        *map.entry(v.to_bits()).or_insert(0) += 1;
    }
    map
}

/// Most (or least) frequent value; ties break toward the smaller bit
/// pattern so the result is deterministic.
pub fn mode_value(values: &[f64], majority: bool) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let hist = histogram(values);
    let mut selected: Option<(u64, usize)> = None;
    for (bits, count) in hist {
        selected = match selected {
            None => Some((bits, count)),
            Some((prev_bits, prev_count)) => {
                let better = if majority {
                    count > prev_count || (count == prev_count && bits < prev_bits)
                } else {
                    count < prev_count || (count == prev_count && bits < prev_bits)
                };
                if better {
                    Some((bits, count))
                } else {
                    Some((prev_bits, prev_count))
                }
            }
        }
    }
    selected.map(|(bits, _)| f64::from_bits(bits))
}

/// Stable display form for a categorical cell value; integral values
/// format without a fractional part so category-map keys stay readable.
pub fn format_category(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Aggregate one zone's valid values into a record over the requested
/// stats. An empty value set produces the cell counts and the missing
/// marker for everything else.
///
/// Infinite cells participate in "count" but never in any aggregate, so
/// a zone containing an infinity still reports finite min/max/mean.
/// NaN cells are tallied under "nan" and excluded from "count".
pub fn summarize(
    values: &[f64],
    stats: &[String],
    nodata_count: usize,
    nan_count: usize,
    infinite_count: usize,
) -> StatRecord {
    let mut record = StatRecord::default();

    if values.is_empty() {
        for stat in stats {
            let value = match stat.as_str() {
                "count" => StatValue::Int(infinite_count as i64),
                "nodata" => StatValue::Float(nodata_count as f64),
                "nan" => StatValue::Float(nan_count as f64),
                _ => StatValue::Null,
            };
            record.values.insert(stat.clone(), value);
        }
        return record;
    }

    let sorted = sort_values(values);
    let count = (values.len() + infinite_count) as i64;
    let n = values.len() as f64;
    let sum: f64 = values.iter().sum();
    let mean = sum / n;
    let min = sorted[0];
    let max = sorted[sorted.len() - 1];

    for stat in stats {
        let value = match stat.as_str() {
            "min" => StatValue::Float(min),
            "max" => StatValue::Float(max),
            "mean" => StatValue::Float(mean),
            "sum" => StatValue::Float(sum),
            "count" => StatValue::Int(count),
            "std" => {
                let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                StatValue::Float(var.sqrt())
            }
            "median" => StatValue::Float(percentile(&sorted, 50.0)),
            "majority" => match mode_value(values, true) {
                Some(v) => StatValue::Float(v),
                None => StatValue::Null,
            },
            "minority" => match mode_value(values, false) {
                Some(v) => StatValue::Float(v),
                None => StatValue::Null,
            },
            "unique" => StatValue::Int(histogram(values).len() as i64),
            "range" => StatValue::Float(max - min),
            "nodata" => StatValue::Float(nodata_count as f64),
            "nan" => StatValue::Float(nan_count as f64),
            _ => match parse_percentile(stat) {
                Ok(q) => StatValue::Float(percentile(&sorted, q)),
                Err(_) => StatValue::Null,
            },
        };
        record.values.insert(stat.clone(), value);
    }

    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_summarize_basics() {
        let stats = names(&["min", "max", "mean", "count"]);
        let rec = summarize(&[1.0, 2.0, 3.0], &stats, 0, 0, 0);
        assert_eq!(rec.get_f64("min"), Some(1.0));
        assert_eq!(rec.get_f64("max"), Some(3.0));
        assert_eq!(rec.get_f64("mean"), Some(2.0));
        assert_eq!(rec.values.get("count"), Some(&StatValue::Int(3)));
    }

    #[test]
    fn test_summarize_empty_zone_shape() {
        let stats = names(&["count", "mean", "nodata", "nan"]);
        let rec = summarize(&[], &stats, 4, 1, 0);
        assert_eq!(rec.values.get("count"), Some(&StatValue::Int(0)));
        assert_eq!(rec.values.get("mean"), Some(&StatValue::Null));
        assert_eq!(rec.get_f64("nodata"), Some(4.0));
        assert_eq!(rec.get_f64("nan"), Some(1.0));
    }

    #[test]
    fn test_infinite_cells_count_but_never_aggregate() {
        let stats = names(&["count", "min", "max", "mean"]);
        let rec = summarize(&[1.0, 2.0, 3.0], &stats, 0, 0, 1);
        assert_eq!(rec.values.get("count"), Some(&StatValue::Int(4)));
        assert_eq!(rec.get_f64("min"), Some(1.0));
        assert_eq!(rec.get_f64("max"), Some(3.0));
        assert_relative_eq!(rec.get_f64("mean").unwrap(), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_only_infinite_cells_still_counted() {
        let stats = names(&["count", "max"]);
        let rec = summarize(&[], &stats, 0, 0, 2);
        assert_eq!(rec.values.get("count"), Some(&StatValue::Int(2)));
        assert_eq!(rec.values.get("max"), Some(&StatValue::Null));
    }

    #[test]
    fn test_percentile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_relative_eq!(percentile(&sorted, 50.0), 2.5, epsilon = 1e-12);
        assert_relative_eq!(percentile(&sorted, 0.0), 1.0, epsilon = 1e-12);
        assert_relative_eq!(percentile(&sorted, 100.0), 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_mode_tie_breaks_to_smaller_value() {
        let values = [2.0, 2.0, 1.0, 1.0, 3.0];
        assert_eq!(mode_value(&values, true), Some(1.0));
        assert_eq!(mode_value(&values, false), Some(3.0));
    }

    #[test]
    fn test_check_stats_normalizes_and_dedups() {
        let stats = names(&["MEAN", "count", "mean"]);
        let out = check_stats(Some(&stats), false).unwrap();
        assert_eq!(out, vec!["mean".to_string(), "count".to_string()]);
    }

    #[test]
    fn test_check_stats_default_and_star() {
        assert_eq!(check_stats(None, false).unwrap().len(), 4);
        let star = names(&["*"]);
        assert_eq!(
            check_stats(Some(&star), false).unwrap().len(),
            VALID_STATS.len()
        );
        assert!(check_stats(None, true).unwrap().is_empty());
    }

    #[test]
    fn test_check_stats_rejects_unknown() {
        let stats = names(&["variance"]);
        assert!(check_stats(Some(&stats), false).is_err());
        let stats = names(&["percentile_abc"]);
        assert!(check_stats(Some(&stats), false).is_err());
        let stats = names(&["percentile_150"]);
        assert!(check_stats(Some(&stats), false).is_err());
    }

    #[test]
    fn test_percentile_stat_name() {
        let stats = names(&["percentile_90"]);
        let rec = summarize(&[1.0, 2.0, 3.0, 4.0, 5.0], &stats, 0, 0, 0);
        assert_relative_eq!(rec.get_f64("percentile_90").unwrap(), 4.6, epsilon = 1e-12);
    }

    #[test]
    fn test_format_category() {
        assert_eq!(format_category(3.0), "3");
        assert_eq!(format_category(-2.0), "-2");
        assert_eq!(format_category(1.5), "1.5");
    }
}
