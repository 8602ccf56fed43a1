// Windowed rate from cumulative counter snapshots, tolerant of counter resets.

use crate::models::WindowedRate;

/// Rate in units/sec between the first and last point of the latest monotone run.
///
/// A decrease between consecutive points is a reset boundary (client reconnect, device
/// reboot, counter rollover); only points from the last reset onward are used. Points must
/// be ascending by timestamp. Fewer than two usable points, or no elapsed time between
/// them, yields `InsufficientData`.
pub fn counter_rate(points: &[(i64, f64)]) -> WindowedRate {
    let start = last_reset_index(points);
    let run = &points[start..];
    let (Some(&(from_ts, first)), Some(&(to_ts, last))) = (run.first(), run.last()) else {
        return WindowedRate::InsufficientData;
    };
    if run.len() < 2 || to_ts <= from_ts {
        return WindowedRate::InsufficientData;
    }
    WindowedRate::Rate {
        bytes_per_sec: (last - first) / (to_ts - from_ts) as f64,
        from_ts,
        to_ts,
    }
}

/// Index of the first point after the most recent decrease, or 0 if the run never decreases.
fn last_reset_index(points: &[(i64, f64)]) -> usize {
    points
        .windows(2)
        .rposition(|w| w[1].1 < w[0].1)
        .map_or(0, |i| i + 1)
}

/// Sums per-identity rates. Identities without enough data are left out; if none has data the
/// result is `InsufficientData`. The reported span covers every contributing window.
pub fn sum_rates(rates: impl IntoIterator<Item = WindowedRate>) -> WindowedRate {
    rates
        .into_iter()
        .fold(WindowedRate::InsufficientData, |acc, r| match (acc, r) {
            (acc, WindowedRate::InsufficientData) => acc,
            (WindowedRate::InsufficientData, r) => r,
            (
                WindowedRate::Rate {
                    bytes_per_sec: a,
                    from_ts: af,
                    to_ts: at,
                },
                WindowedRate::Rate {
                    bytes_per_sec: b,
                    from_ts: bf,
                    to_ts: bt,
                },
            ) => WindowedRate::Rate {
                bytes_per_sec: a + b,
                from_ts: af.min(bf),
                to_ts: at.max(bt),
            },
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_point_is_insufficient() {
        assert_eq!(counter_rate(&[(0, 100.0)]), WindowedRate::InsufficientData);
        assert_eq!(counter_rate(&[]), WindowedRate::InsufficientData);
    }

    #[test]
    fn rate_over_monotone_run() {
        let r = counter_rate(&[(0, 1000.0), (30, 4000.0)]);
        assert_eq!(
            r,
            WindowedRate::Rate {
                bytes_per_sec: 100.0,
                from_ts: 0,
                to_ts: 30
            }
        );
    }

    #[test]
    fn reset_uses_only_post_reset_run() {
        let r = counter_rate(&[(0, 100.0), (10, 200.0), (20, 50.0), (30, 150.0)]);
        assert_eq!(
            r,
            WindowedRate::Rate {
                bytes_per_sec: 10.0,
                from_ts: 20,
                to_ts: 30
            }
        );
    }

    #[test]
    fn reset_on_last_point_leaves_insufficient_data() {
        let r = counter_rate(&[(0, 100.0), (10, 200.0), (20, 50.0)]);
        assert_eq!(r, WindowedRate::InsufficientData);
    }

    #[test]
    fn same_timestamp_points_do_not_divide_by_zero() {
        let r = counter_rate(&[(10, 100.0), (10, 200.0)]);
        assert_eq!(r, WindowedRate::InsufficientData);
    }

    #[test]
    fn flat_counter_is_a_zero_rate() {
        let r = counter_rate(&[(0, 500.0), (30, 500.0), (60, 500.0)]);
        assert_eq!(r.bytes_per_sec(), Some(0.0));
    }

    #[test]
    fn sum_rates_skips_insufficient_identities() {
        let total = sum_rates([
            WindowedRate::Rate {
                bytes_per_sec: 10.0,
                from_ts: 0,
                to_ts: 60,
            },
            WindowedRate::InsufficientData,
            WindowedRate::Rate {
                bytes_per_sec: 5.0,
                from_ts: 30,
                to_ts: 90,
            },
        ]);
        assert_eq!(
            total,
            WindowedRate::Rate {
                bytes_per_sec: 15.0,
                from_ts: 0,
                to_ts: 90
            }
        );
        assert_eq!(
            sum_rates([WindowedRate::InsufficientData]),
            WindowedRate::InsufficientData
        );
    }
}
