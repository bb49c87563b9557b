//! Off-thread aggregation.
//!
//! [`AggregateWorker`] owns a [`Database`], the [`Filters`] and a
//! [`BlockEngine`] on a dedicated thread and talks to the caller over a pair
//! of channels: [`BlockRequest`]s in, [`BlockResult`]s out. Filter changes
//! ride on requests as a [`FilterPatch`], so the filter state the block is
//! computed under is exactly the state the requester asked for.
//!
//! The worker drains every request already queued before computing anything.
//! Within such a batch, a request is answered [`BlockState::Stale`] without
//! being computed when a later request would immediately invalidate it:
//! either the same block was requested again, or a later patch touches one
//! of the block's trigger axes. Patches always apply, stale or not.

use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

use crate::aggregate::engine::{
    BlockArgs, BlockData, BlockEngine, BlockKey, BlockRegistry, BlockTrigger,
};
use crate::database::Database;
use crate::error::{ChatstatsError, Result};
use crate::filters::Filters;

// ============================================================================
// Protocol types
// ============================================================================

/// Lifecycle of one requested block.
///
/// `Waiting` is never sent by the worker; it is the state a caller shows
/// between queueing a request and hearing back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    Waiting,
    Processing,
    Ready,
    /// Skipped: a later queued request would have invalidated this result.
    Stale,
    Error,
}

impl fmt::Display for BlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BlockState::Waiting => "waiting",
            BlockState::Processing => "processing",
            BlockState::Ready => "ready",
            BlockState::Stale => "stale",
            BlockState::Error => "error",
        })
    }
}

/// Filter changes carried by a request. `None` fields leave that axis
/// untouched; dates are period keys as accepted by
/// [`Filters::update_start_date`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPatch {
    pub channels: Option<Vec<u32>>,
    pub authors: Option<Vec<u32>>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl FilterPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_none()
            && self.authors.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
    }

    /// Whether applying this patch invalidates the given axis.
    #[must_use]
    pub fn touches(&self, trigger: BlockTrigger) -> bool {
        match trigger {
            BlockTrigger::Authors => self.authors.is_some(),
            BlockTrigger::Channels => self.channels.is_some(),
            BlockTrigger::Time => self.start_date.is_some() || self.end_date.is_some(),
        }
    }
}

/// One unit of work for the worker: a block to compute, plus any filter
/// changes to apply first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRequest {
    pub key: BlockKey,
    pub args: BlockArgs,
    pub patch: FilterPatch,
}

impl BlockRequest {
    #[must_use]
    pub fn new(key: BlockKey) -> Self {
        BlockRequest {
            key,
            args: BlockArgs::None,
            patch: FilterPatch::default(),
        }
    }

    #[must_use]
    pub fn with_args(mut self, args: BlockArgs) -> Self {
        self.args = args;
        self
    }

    #[must_use]
    pub fn with_patch(mut self, patch: FilterPatch) -> Self {
        self.patch = patch;
        self
    }
}

/// A state update for one request. `data` is set exactly when `state` is
/// [`BlockState::Ready`]; `error` exactly when it is [`BlockState::Error`].
#[derive(Debug, Clone, PartialEq)]
pub struct BlockResult {
    pub key: BlockKey,
    pub args: BlockArgs,
    pub state: BlockState,
    pub data: Option<BlockData>,
    pub error: Option<String>,
}

impl BlockResult {
    fn of(request: &BlockRequest, state: BlockState) -> Self {
        BlockResult {
            key: request.key,
            args: request.args.clone(),
            state,
            data: None,
            error: None,
        }
    }

    fn ready(request: &BlockRequest, data: BlockData) -> Self {
        let mut result = BlockResult::of(request, BlockState::Ready);
        result.data = Some(data);
        result
    }

    fn failed(request: &BlockRequest, error: &ChatstatsError) -> Self {
        let mut result = BlockResult::of(request, BlockState::Error);
        result.error = Some(error.to_string());
        result
    }
}

// ============================================================================
// Worker
// ============================================================================

/// Handle to the aggregation thread.
///
/// Dropping the handle shuts the worker down and joins it.
///
/// # Example
///
/// ```rust
/// use chatstats::aggregate::{AggregateWorker, BlockKey, BlockRegistry, BlockRequest, BlockState};
/// use chatstats::database::{Author, DatabaseBuilder, RawMessage};
/// use chatstats::time::Day;
///
/// let mut builder = DatabaseBuilder::new("demo")
///     .with_channels(vec!["general".into()])
///     .with_authors(vec![Author { name: "ada".into(), bot: false }]);
/// builder.add_message(0, &RawMessage {
///     day: Day::new(2024, 5, 1),
///     author_index: 0,
///     ..RawMessage::default()
/// })?;
/// let database = builder.build()?;
///
/// let worker = AggregateWorker::spawn(database, BlockRegistry::standard())?;
/// worker.request(BlockRequest::new(BlockKey::MessagesStats))?;
/// loop {
///     let result = worker.recv_result()?;
///     if result.state == BlockState::Ready {
///         assert!(result.data.is_some());
///         break;
///     }
/// }
/// # Ok::<(), chatstats::ChatstatsError>(())
/// ```
pub struct AggregateWorker {
    sender: Option<Sender<BlockRequest>>,
    receiver: Receiver<BlockResult>,
    handle: Option<JoinHandle<()>>,
}

impl AggregateWorker {
    /// Moves `database` onto a new worker thread with fresh
    /// everything-selected filters.
    ///
    /// # Errors
    ///
    /// Fails if the filters or engine cannot be built, or the thread cannot
    /// be spawned.
    pub fn spawn(database: Database, registry: BlockRegistry) -> Result<Self> {
        let filters = Filters::new(&database)?;
        let engine = BlockEngine::new(registry, &database)?;
        let (request_tx, request_rx) = mpsc::channel();
        let (result_tx, result_rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("aggregate-worker".to_string())
            .spawn(move || run_worker(&database, filters, engine, &request_rx, &result_tx))?;

        Ok(AggregateWorker {
            sender: Some(request_tx),
            receiver: result_rx,
            handle: Some(handle),
        })
    }

    /// Queues a request.
    ///
    /// # Errors
    ///
    /// [`ChatstatsError::WorkerDisconnected`] if the worker is gone.
    pub fn request(&self, request: BlockRequest) -> Result<()> {
        self.sender
            .as_ref()
            .ok_or(ChatstatsError::WorkerDisconnected)?
            .send(request)
            .map_err(|_| ChatstatsError::WorkerDisconnected)
    }

    /// Blocks until the next state update.
    ///
    /// # Errors
    ///
    /// [`ChatstatsError::WorkerDisconnected`] if the worker is gone.
    pub fn recv_result(&self) -> Result<BlockResult> {
        self.receiver
            .recv()
            .map_err(|_| ChatstatsError::WorkerDisconnected)
    }

    /// Like [`AggregateWorker::recv_result`] but non-blocking; `Ok(None)`
    /// means nothing is pending right now.
    pub fn try_recv_result(&self) -> Result<Option<BlockResult>> {
        match self.receiver.try_recv() {
            Ok(result) => Ok(Some(result)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(ChatstatsError::WorkerDisconnected),
        }
    }
}

impl Drop for AggregateWorker {
    fn drop(&mut self) {
        // Closing the request channel ends the worker loop.
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

// ============================================================================
// Worker loop
// ============================================================================

fn run_worker(
    database: &Database,
    mut filters: Filters,
    mut engine: BlockEngine,
    requests: &Receiver<BlockRequest>,
    results: &Sender<BlockResult>,
) {
    loop {
        let first = match requests.recv() {
            Ok(request) => request,
            // Handle dropped; shut down.
            Err(_) => return,
        };
        let mut batch = vec![first];
        while let Ok(request) = requests.try_recv() {
            batch.push(request);
        }

        for index in 0..batch.len() {
            let request = &batch[index];

            if let Err(err) = apply_patch(&mut filters, &mut engine, &request.patch) {
                if results.send(BlockResult::failed(request, &err)).is_err() {
                    return;
                }
                continue;
            }

            if superseded_later(&batch, index, engine.registry()) {
                if results.send(BlockResult::of(request, BlockState::Stale)).is_err() {
                    return;
                }
                continue;
            }

            if results
                .send(BlockResult::of(request, BlockState::Processing))
                .is_err()
            {
                return;
            }
            let outcome = match engine.compute(request.key, &request.args, database, &filters) {
                Ok(data) => BlockResult::ready(request, data.clone()),
                Err(err) => BlockResult::failed(request, &err),
            };
            if results.send(outcome).is_err() {
                return;
            }
        }
    }
}

/// Applies a patch to the filters, invalidating each touched axis.
///
/// Axes are applied in order and a date failure does not roll back axes
/// already applied; the error lands on the carrying request.
fn apply_patch(filters: &mut Filters, engine: &mut BlockEngine, patch: &FilterPatch) -> Result<()> {
    if let Some(channels) = &patch.channels {
        filters.update_channels(channels.clone());
        engine.invalidate(BlockTrigger::Channels);
    }
    if let Some(authors) = &patch.authors {
        filters.update_authors(authors);
        engine.invalidate(BlockTrigger::Authors);
    }
    if let Some(start) = &patch.start_date {
        filters.update_start_date(start)?;
        engine.invalidate(BlockTrigger::Time);
    }
    if let Some(end) = &patch.end_date {
        filters.update_end_date(end)?;
        engine.invalidate(BlockTrigger::Time);
    }
    Ok(())
}

/// Whether computing `batch[index]` now would be wasted work: a later
/// request in the batch re-asks for the same block, or patches an axis the
/// block depends on.
fn superseded_later(batch: &[BlockRequest], index: usize, registry: &BlockRegistry) -> bool {
    let request = &batch[index];
    let triggers = registry
        .get(request.key)
        .map(|descriptor| descriptor.triggers)
        .unwrap_or(&[]);

    batch[index + 1..].iter().any(|later| {
        (later.key == request.key && later.args == request.args)
            || triggers.iter().any(|&t| later.patch.touches(t))
    })
}

// ============================================================================
// Tests
// ============================================================================
