//! Progress reporting types for long-running operations.
//!
//! This module provides a callback-based progress reporting mechanism
//! for library users who want push-based progress updates rather than
//! polling. The database builder reports once per packed message during
//! the compaction pass, which is the only phase slow enough to matter.
//!
//! # Example
//!
//! ```rust
//! use chatstats::progress::{Progress, ProgressCallback};
//! use std::sync::Arc;
//!
//! // Create a progress callback
//! let callback: ProgressCallback = Arc::new(|progress| {
//!     if let Some(pct) = progress.percentage() {
//!         println!("Progress: {:.1}%", pct);
//!     }
//! });
//!
//! // Use the callback in your processing loop
//! for i in 0..10usize {
//!     callback(Progress::new(i + 1, Some(10)));
//! }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Progress information for long-running operations.
///
/// Counts items (messages, usually) rather than bytes: packed messages vary
/// wildly in bit width, so item counts are the honest unit here.
#[derive(Debug, Clone, Copy, Default)]
pub struct Progress {
    /// Number of items (e.g., messages) processed so far.
    pub items_processed: usize,

    /// Total items to process, if known.
    pub total_items: Option<usize>,
}

impl Progress {
    /// Creates a new progress instance.
    pub fn new(items_processed: usize, total_items: Option<usize>) -> Self {
        Self {
            items_processed,
            total_items,
        }
    }

    /// Returns the progress as a percentage (0.0 - 100.0).
    ///
    /// Returns `None` if the total is not known.
    ///
    /// # Example
    ///
    /// ```rust
    /// use chatstats::progress::Progress;
    ///
    /// let progress = Progress::new(50, Some(100));
    /// assert_eq!(progress.percentage(), Some(50.0));
    ///
    /// let unknown = Progress::new(50, None);
    /// assert_eq!(unknown.percentage(), None);
    /// ```
    pub fn percentage(&self) -> Option<f64> {
        self.total_items.map(|total| {
            if total == 0 {
                100.0
            } else {
                (self.items_processed as f64 / total as f64) * 100.0
            }
        })
    }

    /// Returns whether the operation is complete.
    ///
    /// An operation is considered complete when the processed count reaches
    /// the total (if known).
    pub fn is_complete(&self) -> bool {
        self.total_items
            .map(|total| self.items_processed >= total)
            .unwrap_or(false)
    }

    /// Returns the remaining items to process.
    ///
    /// Returns `None` if the total is not known.
    pub fn remaining_items(&self) -> Option<usize> {
        self.total_items
            .map(|total| total.saturating_sub(self.items_processed))
    }
}

/// Callback type for receiving progress updates.
///
/// This is a thread-safe callback that receives [`Progress`] updates
/// during long-running operations.
///
/// # Example
///
/// ```rust
/// use chatstats::progress::{Progress, ProgressCallback};
/// use std::sync::Arc;
///
/// let callback: ProgressCallback = Arc::new(|progress| {
///     println!("Processed {} messages", progress.items_processed);
/// });
///
/// // Call the callback
/// callback(Progress::new(1000, Some(2000)));
/// ```
pub type ProgressCallback = Arc<dyn Fn(Progress) + Send + Sync>;

/// Creates a no-op progress callback.
///
/// This is useful when you don't need progress updates but an API
/// requires a callback.
///
/// # Example
///
/// ```rust
/// use chatstats::progress::no_progress;
///
/// let callback = no_progress();
/// callback(chatstats::progress::Progress::default()); // Does nothing
/// ```
pub fn no_progress() -> ProgressCallback {
    Arc::new(|_| {})
}

/// Creates a progress callback that repaints a percentage line on stderr.
///
/// Useful for CLI applications that want simple progress output. Updates
/// are throttled to whole-percent changes and rewrite a single line, so
/// the once-per-message callbacks of a large packing run stay cheap.
///
/// # Example
///
/// ```rust
/// use chatstats::progress::stderr_progress;
///
/// let callback = stderr_progress();
/// // Repaints "   Packing: 50%" on stderr
/// callback(chatstats::progress::Progress::new(500, Some(1000)));
/// ```
pub fn stderr_progress() -> ProgressCallback {
    let last_pct = AtomicUsize::new(usize::MAX);
    Arc::new(move |progress| {
        let Some(pct) = progress.percentage() else {
            return;
        };
        let pct = pct as usize;
        if last_pct.swap(pct, Ordering::Relaxed) == pct {
            return;
        }
        eprint!("\r   Packing: {}%", pct);
        if progress.is_complete() {
            eprintln!();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_percentage() {
        let progress = Progress::new(50, Some(100));
        assert_eq!(progress.percentage(), Some(50.0));
    }

    #[test]
    fn test_progress_percentage_unknown_total() {
        let progress = Progress::new(50, None);
        assert_eq!(progress.percentage(), None);
    }

    #[test]
    fn test_progress_percentage_zero_total() {
        let progress = Progress::new(0, Some(0));
        assert_eq!(progress.percentage(), Some(100.0));
    }

    #[test]
    fn test_progress_is_complete() {
        let complete = Progress::new(100, Some(100));
        assert!(complete.is_complete());

        let incomplete = Progress::new(50, Some(100));
        assert!(!incomplete.is_complete());

        let unknown = Progress::new(50, None);
        assert!(!unknown.is_complete());
    }

    #[test]
    fn test_progress_remaining_items() {
        let progress = Progress::new(30, Some(100));
        assert_eq!(progress.remaining_items(), Some(70));

        let unknown = Progress::new(30, None);
        assert_eq!(unknown.remaining_items(), None);
    }

    #[test]
    fn test_no_progress_callback() {
        let callback = no_progress();
        callback(Progress::default()); // Should not panic
    }

    #[test]
    fn test_stderr_progress_handles_any_input() {
        let callback = stderr_progress();
        callback(Progress::new(5, None));
        for i in 0..=10 {
            callback(Progress::new(i, Some(10)));
        }
        // Repeats of the same percentage are throttled, not errors.
        callback(Progress::new(10, Some(10)));
    }

    #[test]
    fn test_progress_callback_type() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();

        let callback: ProgressCallback = Arc::new(move |progress| {
            counter_clone.store(progress.items_processed, Ordering::SeqCst);
        });

        callback(Progress::new(42, None));
        assert_eq!(counter.load(Ordering::SeqCst), 42);
    }
}
