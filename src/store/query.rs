//! Range search and downsampling over a loaded file's columns.

use chrono::{DateTime, Utc};

use super::{DataPoint, TimeRange};

/// Index range `[start, end)` of `timestamps` covered by `range`.
///
/// `start` is the first index at or after `from`; `end` is the first index
/// strictly after `to`, so both bounds are inclusive.
pub fn range_bounds(timestamps: &[i64], range: &TimeRange) -> (usize, usize) {
    let start = match range.from {
        Some(from) => {
            let target = from.timestamp();
            timestamps.partition_point(|&t| t < target)
        }
        None => 0,
    };
    let end = match range.to {
        Some(to) => {
            let target = to.timestamp();
            timestamps.partition_point(|&t| t <= target)
        }
        None => timestamps.len(),
    };
    (start, end)
}

fn point(ts: i64, value: f64) -> Option<DataPoint> {
    DateTime::<Utc>::from_timestamp(ts, 0).map(|timestamp| DataPoint { timestamp, value })
}

/// Returns the non-NaN points in `[start, end)`, averaged into at most
/// `max_points` equal-width buckets when the range is larger than that.
///
/// Each bucket is stamped with its first sample's timestamp; buckets without
/// any real value are dropped.
pub fn collect_points(
    timestamps: &[i64],
    values: &[f64],
    start: usize,
    end: usize,
    max_points: usize,
) -> Vec<DataPoint> {
    if start >= end {
        return Vec::new();
    }

    let total = end - start;
    if total <= max_points || max_points == 0 {
        return (start..end)
            .filter(|&i| !values[i].is_nan())
            .filter_map(|i| point(timestamps[i], values[i]))
            .collect();
    }

    let bucket_size = total as f64 / max_points as f64;
    let mut points = Vec::with_capacity(max_points);

    for bucket in 0..max_points {
        let b_start = start + (bucket as f64 * bucket_size) as usize;
        let b_end = (start + ((bucket + 1) as f64 * bucket_size) as usize).min(end);
        if b_start >= b_end {
            continue;
        }

        let (sum, count) = values[b_start..b_end]
            .iter()
            .filter(|v| !v.is_nan())
            .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

        if count > 0 {
            if let Some(p) = point(timestamps[b_start], sum / count as f64) {
                points.push(p);
            }
        }
    }

    points
}
