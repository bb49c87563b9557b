//! JSON archives: the interchange form between exporters and the packed
//! database.
//!
//! An [`Archive`] carries the same data a [`DatabaseBuilder`] consumes, in a
//! portable shape: per-channel message lists plus the dictionaries their
//! indices resolve against. Exporters for concrete chat platforms produce
//! this format; this crate only consumes it.
//!
//! The builder checks channel, author and date references on
//! [`add_message`](DatabaseBuilder::add_message) but trusts list indices and
//! language indices by contract. [`Archive::validate`] closes that gap for
//! untrusted input by sweeping every message against the dictionary lengths
//! before any packing starts.
//!
//! # Examples
//!
//! ```
//! use chatstats::archive::{Archive, ArchiveChannel};
//! use chatstats::database::{Author, RawMessage};
//! use chatstats::time::Day;
//!
//! let archive = Archive {
//!     title: "team chat".to_string(),
//!     channels: vec![ArchiveChannel {
//!         name: "general".to_string(),
//!         messages: vec![RawMessage {
//!             day: Day::new(2022, 3, 28),
//!             hour: 9,
//!             author_index: 0,
//!             ..RawMessage::default()
//!         }],
//!     }],
//!     authors: vec![Author {
//!         name: "alice".to_string(),
//!         bot: false,
//!     }],
//!     ..Archive::default()
//! };
//!
//! let database = archive.build_database()?;
//! assert_eq!(database.num_messages(), 1);
//! # Ok::<(), chatstats::ChatstatsError>(())
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::database::{Author, Database, DatabaseBuilder, RawMessage};
use crate::error::{ChatstatsError, Result};
use crate::indexed::IndexCounts;
use crate::progress::{ProgressCallback, no_progress};

// ============================================================================
// Archive model
// ============================================================================

/// A complete chat export with every cross-reference resolved to an index.
///
/// Message fields index into the dictionaries stored alongside them:
/// `author_index` into `authors`, word list entries into `words`, and so on
/// (see [`RawMessage`]). Only `title`, `channels` and `authors` are required
/// in the JSON form; absent dictionaries default to empty, which is valid as
/// long as no message references them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Archive {
    pub title: String,

    #[serde(default)]
    pub channels: Vec<ArchiveChannel>,

    #[serde(default)]
    pub authors: Vec<Author>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub words: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub emojis: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mentions: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub domains: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<String>,
}

/// One channel's name and messages, in posting order.
///
/// `RawMessage::reply_to` ordinals count positions within this list, so the
/// order is load-bearing, not cosmetic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchiveChannel {
    pub name: String,

    #[serde(default)]
    pub messages: Vec<RawMessage>,
}

impl Archive {
    /// Parses an archive from a JSON string.
    ///
    /// Parsing checks shape only; call [`validate`](Self::validate) (or
    /// [`build_database`](Self::build_database), which does) before trusting
    /// the indices.
    pub fn from_json(json: &str) -> Result<Archive> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes the archive to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reads and parses an archive file.
    pub fn load(path: impl AsRef<Path>) -> Result<Archive> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Writes the archive to a file as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Total messages across all channels.
    pub fn num_messages(&self) -> usize {
        self.channels.iter().map(|c| c.messages.len()).sum()
    }

    /// Checks every index in every message against the dictionaries.
    ///
    /// The packed codec stores indices at widths derived from the dictionary
    /// sizes, so an out-of-range index would not fail loudly later; it would
    /// silently truncate into some other entry. This pass rejects such
    /// archives up front with the channel and message position in the error.
    pub fn validate(&self) -> Result<()> {
        for (channel_index, channel) in self.channels.iter().enumerate() {
            for (message_index, raw) in channel.messages.iter().enumerate() {
                self.validate_message(raw).map_err(|what| {
                    ChatstatsError::invalid_archive(format!(
                        "channel {channel_index} ({:?}) message {message_index}: {what}",
                        channel.name
                    ))
                })?;
            }
        }
        Ok(())
    }

    fn validate_message(&self, raw: &RawMessage) -> std::result::Result<(), String> {
        if raw.day.to_date().is_none() {
            return Err(format!("impossible date '{}'", raw.day.date_key()));
        }
        if raw.hour > 23 {
            return Err(format!("hour {} out of range", raw.hour));
        }
        if raw.author_index as usize >= self.authors.len() {
            return Err(format!(
                "author index {} out of range ({} authors)",
                raw.author_index,
                self.authors.len()
            ));
        }
        if let Some(text) = &raw.text
            && text.lang_index as usize >= self.languages.len()
        {
            return Err(format!(
                "language index {} out of range ({} languages)",
                text.lang_index,
                self.languages.len()
            ));
        }
        if raw.text.is_none() && !raw.words.is_empty() {
            return Err("word list on a message without text".to_string());
        }
        check_indices(&raw.words, self.words.len(), "word")?;
        check_indices(&raw.emojis, self.emojis.len(), "emoji")?;
        check_indices(&raw.reactions, self.emojis.len(), "reaction emoji")?;
        check_indices(&raw.mentions, self.mentions.len(), "mention")?;
        check_indices(&raw.domains, self.domains.len(), "domain")?;
        Ok(())
    }

    /// Validates the archive and packs it into a [`Database`].
    pub fn build_database(&self) -> Result<Database> {
        self.build_database_with_progress(no_progress())
    }

    /// Like [`build_database`](Self::build_database), reporting packing
    /// progress through `progress`.
    pub fn build_database_with_progress(&self, progress: ProgressCallback) -> Result<Database> {
        self.validate()?;

        let mut builder = DatabaseBuilder::new(self.title.clone())
            .with_channels(self.channels.iter().map(|c| c.name.clone()).collect())
            .with_authors(self.authors.clone())
            .with_words(self.words.clone())
            .with_emojis(self.emojis.clone())
            .with_mentions(self.mentions.clone())
            .with_domains(self.domains.clone())
            .with_languages(self.languages.clone())
            .with_progress(progress);

        for (channel_index, channel) in self.channels.iter().enumerate() {
            for raw in &channel.messages {
                builder.add_message(channel_index, raw)?;
            }
        }
        builder.build()
    }
}

/// Checks that every `(index, count)` entry points inside a dictionary.
fn check_indices(
    list: &IndexCounts,
    dictionary_len: usize,
    what: &str,
) -> std::result::Result<(), String> {
    for &(index, _) in list {
        if index as usize >= dictionary_len {
            return Err(format!(
                "{what} index {index} out of range ({dictionary_len} dictionary entries)"
            ));
        }
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
