// ─── Progress Reporting ───

use std::sync::Mutex;

use tracing::debug;

/// Receives `(percent, message)` updates from long-running jobs.
pub trait ProgressSink: Send + Sync {
    fn report(&self, percent: f32, message: &str);
}

/// Sink that discards everything.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _percent: f32, _message: &str) {}
}

impl<F> ProgressSink for F
where
    F: Fn(f32, &str) + Send + Sync,
{
    fn report(&self, percent: f32, message: &str) {
        self(percent, message)
    }
}

/// Wraps a sink so that reported percentages stay within `0..=100` and never
/// go backwards within one job.
pub struct MonotonicProgress<'a> {
    inner: &'a dyn ProgressSink,
    last: Mutex<f32>,
}

impl<'a> MonotonicProgress<'a> {
    pub fn new(inner: &'a dyn ProgressSink) -> Self {
        Self {
            inner,
            last: Mutex::new(0.0),
        }
    }

    pub fn report(&self, percent: f32, message: &str) {
        let clamped = if percent.is_finite() {
            percent.clamp(0.0, 100.0)
        } else {
            0.0
        };
        let value = match self.last.lock() {
            Ok(mut last) => {
                if clamped > *last {
                    *last = clamped;
                }
                *last
            }
            Err(_) => clamped,
        };
        debug!("[{:>5.1}%] {}", value, message);
        self.inner.report(value, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentages_never_decrease() {
        let seen = Mutex::new(Vec::new());
        let sink = |p: f32, _m: &str| seen.lock().unwrap().push(p);
        let progress = MonotonicProgress::new(&sink);

        progress.report(10.0, "a");
        progress.report(5.0, "b");
        progress.report(150.0, "c");
        progress.report(f32::NAN, "d");

        assert_eq!(*seen.lock().unwrap(), vec![10.0, 10.0, 100.0, 100.0]);
    }
}
