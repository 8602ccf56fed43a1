// Pure time-bucketing: points -> fixed-length series with empty markers, average and peak.

use crate::models::BucketedSeries;

/// Splits `[window_start, window_end)` into `bucket_count` contiguous buckets and averages
/// the points falling in each. Bucket `i` covers `[start + ceil(span*i/n), start + ceil(span*(i+1)/n))`.
/// Points must be ascending by timestamp; points outside the window are ignored.
pub fn bucketize(
    points: &[(i64, f64)],
    window_start: i64,
    window_end: i64,
    bucket_count: usize,
) -> BucketedSeries {
    let span = (window_end - window_start).max(0);
    let mut sums = vec![0.0_f64; bucket_count];
    let mut counts = vec![0_u32; bucket_count];
    let mut peak: Option<f64> = None;

    if span > 0 && bucket_count > 0 {
        for &(ts, value) in points {
            if ts < window_start || ts >= window_end {
                continue;
            }
            let idx = bucket_index(ts - window_start, span, bucket_count);
            sums[idx] += value;
            counts[idx] += 1;
            peak = Some(peak.map_or(value, |p| p.max(value)));
        }
    }

    let buckets: Vec<Option<f64>> = sums
        .iter()
        .zip(&counts)
        .map(|(&sum, &count)| (count > 0).then(|| sum / count as f64))
        .collect();
    let filled: Vec<f64> = buckets.iter().flatten().copied().collect();
    let average = (!filled.is_empty()).then(|| mean_f64(&filled));

    BucketedSeries {
        window_start,
        window_end,
        bucket_width_secs: if bucket_count > 0 {
            span as f64 / bucket_count as f64
        } else {
            0.0
        },
        buckets,
        average,
        peak,
    }
}

fn bucket_index(offset: i64, span: i64, bucket_count: usize) -> usize {
    let idx = (offset as i128 * bucket_count as i128) / span as i128;
    (idx as usize).min(bucket_count - 1)
}

/// Sums values that share a collection timestamp, turning rows from many identities into one
/// site-wide total per instant. Input must be ascending by timestamp.
pub fn collapse_instants(points: &[(i64, f64)]) -> Vec<(i64, f64)> {
    let mut out: Vec<(i64, f64)> = Vec::new();
    for &(ts, value) in points {
        match out.last_mut() {
            Some((last_ts, total)) if *last_ts == ts => *total += value,
            _ => out.push((ts, value)),
        }
    }
    out
}

fn mean_f64(v: &[f64]) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    v.iter().sum::<f64>() / (v.len() as f64)
}
