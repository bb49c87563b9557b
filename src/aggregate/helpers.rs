//! The traversal primitive every block is built on.

use crate::bits::BitReader;
use crate::codec::MessageView;
use crate::database::Database;
use crate::filters::Filters;

/// Which filter axes a traversal applies.
///
/// Timeline-style blocks opt out of the time axis so their series always
/// covers the full date range no matter where the date filter sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveAxes {
    pub channels: bool,
    pub authors: bool,
    pub time: bool,
}

impl ActiveAxes {
    /// All three axes applied.
    pub const ALL: ActiveAxes = ActiveAxes {
        channels: true,
        authors: true,
        time: true,
    };

    /// Channel and author axes applied, time ignored.
    pub const IGNORE_TIME: ActiveAxes = ActiveAxes {
        time: false,
        ..ActiveAxes::ALL
    };
}

impl Default for ActiveAxes {
    fn default() -> Self {
        ActiveAxes::ALL
    }
}

/// Scans every message passing `filters` and hands it to `callback` as a
/// lazy view.
///
/// Channels are visited in index order; each selected channel is read as
/// `msg_count` consecutive views starting at its `msg_addr`. The author and
/// time tests run against the already-decoded header, so skipped messages
/// never touch their payload sections.
///
/// The callback receives the reader so it can pull payload sections through
/// the view's accessors. Whatever it does to the cursor is undone before
/// the next message is read: the reader is checkpointed around every
/// callback invocation.
pub fn filter_messages<F>(database: &Database, filters: &Filters, axes: ActiveAxes, mut callback: F)
where
    F: FnMut(&MessageView, &mut BitReader<'_>),
{
    let mut reader = database.reader();

    for (channel_index, channel) in database.channels.iter().enumerate() {
        if axes.channels && !filters.has_channel(channel_index as u32) {
            continue;
        }
        if channel.msg_count == 0 {
            continue;
        }

        reader.offset = channel.msg_addr;

        for _ in 0..channel.msg_count {
            let mut view = MessageView::read(&mut reader, &database.bit_config);
            view.channel_index = channel_index as u32;

            if (!axes.authors || filters.has_author(view.author_index))
                && (!axes.time || filters.in_time(view.day_index))
            {
                let mut guard = reader.checkpoint();
                callback(&view, &mut *guard);
            }
        }
    }
}
