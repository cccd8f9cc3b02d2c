//! Output sanitization at the public boundary
//!
//! Applied to both engine paths so the caller-observable contract is
//! identical regardless of which engine ran: no numeric field is ever
//! non-finite, and key prefixing happens exactly once, here.

use terrastat_core::request::{PointRecord, PointSample};
use terrastat_core::stats::{StatRecord, StatValue};

/// Replace every non-finite numeric value with the explicit missing
/// marker. Keys stay present; values are never dropped.
pub(crate) fn scrub_records(records: &mut [StatRecord]) {
    for record in records {
        for value in record.values.values_mut() {
            if let StatValue::Float(v) = value {
                if !v.is_finite() {
                    *value = StatValue::Null;
                }
            }
        }
    }
}

/// Prepend the configured prefix to every output key. Engines receive
/// requests with the prefix withheld, so this is the single place the
/// renaming happens.
pub(crate) fn apply_prefix(records: &mut [StatRecord], prefix: Option<&str>) {
    let Some(prefix) = prefix else { return };
    for record in records {
        record.values = record
            .values
            .iter()
            .map(|(k, v)| (format!("{prefix}{k}"), v.clone()))
            .collect();
    }
}

fn scrub_option(value: &mut Option<f64>) {
    if value.is_some_and(|v| !v.is_finite()) {
        *value = None;
    }
}

/// Scrub point samples. GeoJSON-echo properties need no pass of their
/// own: JSON numbers cannot hold non-finite values, so the mirrored
/// sample property is already null whenever the sample was.
pub(crate) fn scrub_point_records(records: &mut [PointRecord]) {
    for record in records {
        match &mut record.sample {
            PointSample::One(value) => scrub_option(value),
            PointSample::Many(values) => values.iter_mut().for_each(scrub_option),
        }
    }
}
