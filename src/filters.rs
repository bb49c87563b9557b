//! Query predicate over a packed database.
//!
//! [`Filters`] holds the three axes a query can narrow: channel whitelist,
//! author membership, inclusive day range. Membership tests are O(1) (or a
//! linear scan over the short channel list); mutators replace an axis
//! wholesale. The aggregation engine decides which cached results a change
//! invalidates; filters themselves know nothing about blocks.
//!
//! A fresh filter excludes nothing: all channels, all authors, the full
//! covered day range.
//!
//! # Example
//!
//! ```rust
//! use chatstats::database::{Author, DatabaseBuilder, RawMessage};
//! use chatstats::filters::Filters;
//! use chatstats::time::Day;
//!
//! let mut builder = DatabaseBuilder::new("export")
//!     .with_channels(vec!["general".to_string(), "random".to_string()])
//!     .with_authors(vec![Author { name: "alice".to_string(), bot: false }]);
//! builder.add_message(0, &RawMessage {
//!     day: Day::new(2022, 3, 5),
//!     ..RawMessage::default()
//! })?;
//! let database = builder.build()?;
//!
//! let mut filters = Filters::new(&database)?;
//! assert!(filters.has_channel(1));
//! filters.update_channels(vec![0]);
//! assert!(!filters.has_channel(1));
//! # Ok::<(), chatstats::ChatstatsError>(())
//! ```

use crate::database::Database;
use crate::error::{ChatstatsError, Result};
use crate::time::gen_time_keys;

/// The current query predicate: which channels, authors and days count.
#[derive(Debug, Clone)]
pub struct Filters {
    /// Selected channel indexes. Empty means nothing is selected.
    channels: Vec<u32>,

    /// Dense membership table, always sized to the database's author count.
    authors: Vec<bool>,

    /// First selected day index, inclusive.
    start_day_index: u32,

    /// Last selected day index, inclusive.
    end_day_index: u32,

    /// Date key per day index, for mapping key strings back to indexes.
    day_keys: Vec<String>,
}

impl Filters {
    /// Creates a filter over `database` with everything selected.
    ///
    /// # Errors
    ///
    /// Fails only if the database's day range cannot be enumerated, which
    /// cannot happen for a builder-produced database.
    pub fn new(database: &Database) -> Result<Self> {
        let keys = gen_time_keys(database.time.min_day, database.time.max_day)?;
        Ok(Filters {
            channels: (0..database.channels.len() as u32).collect(),
            authors: vec![true; database.authors.len()],
            start_day_index: 0,
            end_day_index: keys.date_keys.len().saturating_sub(1) as u32,
            day_keys: keys.date_keys,
        })
    }

    // ==== membership tests ====

    /// Whether the channel is selected.
    #[must_use]
    pub fn has_channel(&self, channel_index: u32) -> bool {
        // channel lists are short
        self.channels.contains(&channel_index)
    }

    /// Whether the author is selected.
    ///
    /// `author_index` must come from the same database this filter was
    /// built over; the membership table is sized to it.
    #[must_use]
    pub fn has_author(&self, author_index: u32) -> bool {
        self.authors[author_index as usize]
    }

    /// Whether the day index falls inside the selected range, bounds
    /// included.
    #[must_use]
    pub fn in_time(&self, day_index: u32) -> bool {
        self.start_day_index <= day_index && day_index <= self.end_day_index
    }

    // ==== mutators ====

    /// Replaces the channel whitelist.
    pub fn update_channels(&mut self, channels: Vec<u32>) {
        self.channels = channels;
    }

    /// Replaces the author selection. Indexes outside the table are
    /// ignored.
    pub fn update_authors(&mut self, authors: &[u32]) {
        self.authors.fill(false);
        for &author_index in authors {
            if let Some(slot) = self.authors.get_mut(author_index as usize) {
                *slot = true;
            }
        }
    }

    /// Moves the start of the selected range to the given date key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key does not name a day inside the
    /// database's covered range.
    pub fn update_start_date(&mut self, key: &str) -> Result<()> {
        self.start_day_index = self.day_index_of(key)?;
        Ok(())
    }

    /// Moves the end of the selected range to the given date key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key does not name a day inside the
    /// database's covered range.
    pub fn update_end_date(&mut self, key: &str) -> Result<()> {
        self.end_day_index = self.day_index_of(key)?;
        Ok(())
    }

    // ==== accessors ====

    /// Selected channel indexes.
    #[must_use]
    pub fn channels(&self) -> &[u32] {
        &self.channels
    }

    /// First selected day index.
    #[must_use]
    pub fn start_day_index(&self) -> u32 {
        self.start_day_index
    }

    /// Last selected day index.
    #[must_use]
    pub fn end_day_index(&self) -> u32 {
        self.end_day_index
    }

    /// Date key per day index over the database's full range.
    #[must_use]
    pub fn day_keys(&self) -> &[String] {
        &self.day_keys
    }

    /// Number of days in the selected range (0 if the range is inverted).
    #[must_use]
    pub fn num_active_days(&self) -> usize {
        (self.end_day_index + 1).saturating_sub(self.start_day_index) as usize
    }

    fn day_index_of(&self, key: &str) -> Result<u32> {
        self.day_keys
            .iter()
            .position(|k| k == key)
            .map(|i| i as u32)
            .ok_or_else(|| ChatstatsError::invalid_date(key))
    }
}
