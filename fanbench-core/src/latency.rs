//! Rolling latency window with percentile metrics
//!
//! Every agent owns one [`LatencyTracker`]. The tracker keeps at most
//! `window_size` recent samples (seconds) and evicts the oldest first.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

/// Default number of samples retained per agent
pub const DEFAULT_WINDOW_SIZE: usize = 100;

/// Percentile snapshot over the retained window, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencyMetrics {
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

#[derive(Debug)]
struct Window {
    samples: VecDeque<f64>,
    last: Option<f64>,
}

/// Bounded FIFO of call durations.
///
/// Methods take `&self`; the harness never logs two samples for the same
/// agent concurrently, the lock only makes the tracker shareable across tasks.
#[derive(Debug)]
pub struct LatencyTracker {
    window_size: usize,
    inner: Mutex<Window>,
}

impl LatencyTracker {
    /// Create a tracker with the default window size
    pub fn new() -> Self {
        Self::with_window_size(DEFAULT_WINDOW_SIZE)
    }

    /// Create a tracker retaining at most `window_size` samples (minimum 1)
    pub fn with_window_size(window_size: usize) -> Self {
        let window_size = window_size.max(1);
        Self {
            window_size,
            inner: Mutex::new(Window {
                samples: VecDeque::with_capacity(window_size),
                last: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Window> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Maximum number of retained samples
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Record one call duration in seconds
    pub fn log_latency(&self, seconds: f64) {
        let mut window = self.lock();
        if window.samples.len() == self.window_size {
            window.samples.pop_front();
        }
        window.samples.push_back(seconds);
        window.last = Some(seconds);
    }

    /// Most recently logged sample, `None` before the first call
    pub fn last_latency(&self) -> Option<f64> {
        self.lock().last
    }

    /// Retained samples, oldest first
    pub fn samples(&self) -> Vec<f64> {
        self.lock().samples.iter().copied().collect()
    }

    /// Number of retained samples
    pub fn len(&self) -> usize {
        self.lock().samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// p50/p95/p99 of the retained window, `None` when nothing was logged
    pub fn get_latency_metrics(&self) -> Option<LatencyMetrics> {
        let mut sorted = self.samples();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(|a, b| a.total_cmp(b));

        Some(LatencyMetrics {
            p50: percentile(&sorted, 50.0),
            p95: percentile(&sorted, 95.0),
            p99: percentile(&sorted, 99.0),
        })
    }
}

impl Default for LatencyTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Linear-interpolation percentile over sorted values
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }

    let index = (p / 100.0) * (sorted.len() - 1) as f64;
    let lower = index.floor() as usize;
    let upper = index.ceil() as usize;
    let fraction = index - lower as f64;

    if lower == upper {
        sorted[lower]
    } else {
        sorted[lower] * (1.0 - fraction) + sorted[upper] * fraction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_empty_tracker_has_no_metrics() {
        let tracker = LatencyTracker::new();
        assert!(tracker.get_latency_metrics().is_none());
        assert!(tracker.last_latency().is_none());
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_single_sample_percentiles_collapse() {
        let tracker = LatencyTracker::new();
        tracker.log_latency(0.42);

        let metrics = tracker.get_latency_metrics().unwrap();
        assert_eq!(metrics.p50, 0.42);
        assert_eq!(metrics.p95, 0.42);
        assert_eq!(metrics.p99, 0.42);
        assert_eq!(tracker.last_latency(), Some(0.42));
    }

    #[test]
    fn test_window_keeps_last_samples() {
        for window in [1usize, 2, 5, 100] {
            let tracker = LatencyTracker::with_window_size(window);
            let total = window * 3 + 1;
            for i in 0..total {
                tracker.log_latency(i as f64);
            }

            let expected: Vec<f64> = ((total - window)..total).map(|i| i as f64).collect();
            assert_eq!(tracker.samples(), expected);
            assert_eq!(tracker.last_latency(), Some((total - 1) as f64));
        }
    }

    #[test]
    fn test_metrics_use_retained_window_only() {
        let tracker = LatencyTracker::with_window_size(3);
        tracker.log_latency(100.0);
        tracker.log_latency(1.0);
        tracker.log_latency(2.0);
        tracker.log_latency(3.0);

        let metrics = tracker.get_latency_metrics().unwrap();
        assert_eq!(metrics.p50, 2.0);
        assert!(metrics.p99 < 3.0 + 1e-9);
    }

    #[test]
    fn test_linear_interpolation() {
        let tracker = LatencyTracker::new();
        for v in [4.0, 1.0, 3.0, 2.0] {
            tracker.log_latency(v);
        }

        // index = p/100 * (n - 1) over [1, 2, 3, 4]
        let metrics = tracker.get_latency_metrics().unwrap();
        assert!(approx(metrics.p50, 2.5));
        assert!(approx(metrics.p95, 3.85));
        assert!(approx(metrics.p99, 3.97));
    }

    #[test]
    fn test_zero_window_is_clamped() {
        let tracker = LatencyTracker::with_window_size(0);
        tracker.log_latency(1.0);
        tracker.log_latency(2.0);
        assert_eq!(tracker.window_size(), 1);
        assert_eq!(tracker.samples(), vec![2.0]);
    }
}
