//! Progress reporting shared by concurrent workers.
//!
//! One [`Progress`] is built per run and handed to the orchestrator. The
//! counter is only observed, never used to steer work.

use std::io::IsTerminal;
use std::sync::atomic::{AtomicU64, Ordering};

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Monotonic counter of completed units with an optional terminal bar
pub struct Progress {
    completed: AtomicU64,
    failed: AtomicU64,
    bar: ProgressBar,
}

impl Progress {
    /// Progress bar on stderr, hidden when stderr is not a terminal
    pub fn new(label: &str, total: u64) -> Self {
        let bar = if std::io::stderr().is_terminal() {
            ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::stderr())
        } else {
            ProgressBar::hidden()
        };
        bar.set_style(
            ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len} ({elapsed})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar.set_length(total);
        bar.set_message(label.to_string());
        Self::with_bar(bar)
    }

    /// Counter without any output
    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::hidden())
    }

    fn with_bar(bar: ProgressBar) -> Self {
        Self {
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            bar,
        }
    }

    /// Record `n` finished units
    pub fn advance(&self, n: u64) {
        self.completed.fetch_add(n, Ordering::Relaxed);
        self.bar.inc(n);
    }

    /// Record a finished unit that failed
    pub fn advance_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.advance(1);
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_concurrent_advances() {
        let progress = Arc::new(Progress::hidden());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let progress = progress.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        progress.advance(1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(progress.completed(), 800);
        assert_eq!(progress.failed(), 0);
    }

    #[test]
    fn test_failed_units_count_as_completed() {
        let progress = Progress::hidden();
        progress.advance_failed();
        progress.advance(3);
        assert_eq!(progress.completed(), 4);
        assert_eq!(progress.failed(), 1);
    }
}
