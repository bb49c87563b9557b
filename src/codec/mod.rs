//! Wire codecs for packed messages.
//!
//! Three layers sit on top of [`crate::bits`]:
//!
//! - [`index_counts`] — compresses `(index, count)` lists with run detection
//!   and a bounded entry budget
//! - [`message`] — packs whole messages under a [`MessageBitConfig`]
//! - [`view`] — decodes messages lazily, section by section
//!
//! All widths are decided once per database (see
//! [`crate::database::DatabaseBuilder`]); values wider than their field are
//! truncated on write. That is a deliberate trade: the builder sizes every
//! field from the actual dictionaries, so truncation only occurs when the
//! caller breaks that contract.

pub mod index_counts;
pub mod message;
pub mod view;

pub use index_counts::{
    read_index_counts, read_index_counts_into, skip_index_counts, write_index_counts,
};
pub use message::{
    AttachmentKind, Message, MessageBitConfig, MessageFlags, TextInfo, read_message, write_message,
};
pub use view::MessageView;
