//! `fill` runs a generator over every cell of a [`VolumeBuffer`], usually on the rayon pool.

use crate::{Block, Coords, Error, Result, VolumeBuffer, job::JobId};
use crossbeam_channel::Sender;
use std::{
    any::Any,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

/// A pure function from local cell coordinates to the block that cell should hold.
///
/// Returning an error aborts the whole fill.
pub trait Generator: Fn(Coords) -> Result<Block> + Send + Sync + 'static {}
impl<T> Generator for T where T: Fn(Coords) -> Result<Block> + Send + Sync + 'static {}

/// A generator that can be moved onto a worker
pub type BoxedGenerator = Box<dyn Generator>;

/// Fills every cell with the same block.
///
/// ## Example
/// ```no_run
/// let torches = fill::uniform(Block::new("torch"));
/// ```
pub fn uniform(block: Block) -> BoxedGenerator {
    Box::new(move |_: Coords| -> Result<Block> { Ok(block.clone()) })
}

/// How a fill ended
#[derive(Debug)]
pub enum FillStatus {
    /// Every cell was generated, the buffer is handed back
    Done(VolumeBuffer),
    Failed(Error),
    /// The owning job was abandoned while filling
    Cancelled,
}

/// Sent exactly once per spawned fill
#[derive(Debug)]
pub struct FillOutcome {
    pub id: JobId,
    pub status: FillStatus,
}

/// Runs `generator` over every cell of `buffer` on the calling thread.
///
/// Cells are visited y, z, x (matching the buffer's storage layout). `cancel`
/// is checked once per row and stops the fill early, leaving the buffer partially filled.
pub fn fill<G>(buffer: &mut VolumeBuffer, generator: &G, cancel: &AtomicBool) -> FillStatusKind
where
    G: Fn(Coords) -> Result<Block> + ?Sized,
{
    let extent = buffer.extent();
    for y in 0..extent.y {
        for z in 0..extent.z {
            if cancel.load(Ordering::Acquire) {
                return FillStatusKind::Cancelled;
            }

            for x in 0..extent.x {
                let coords = Coords::new(x, y, z);
                let block = match generator(coords) {
                    Ok(b) => b,
                    Err(e) => return FillStatusKind::Failed(e),
                };
                if let Err(e) = buffer.set(coords, block) {
                    return FillStatusKind::Failed(e);
                }
            }
        }
    }

    if !buffer.is_fully_written() {
        return FillStatusKind::Failed(Error::FillFailure(format!(
            "only {} of {} cells were written",
            buffer.written_count(),
            buffer.volume()
        )));
    }

    FillStatusKind::Done
}

/// [`FillStatus`] without the buffer, for fills that ran on borrowed buffers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillStatusKind {
    Done,
    Failed(Error),
    Cancelled,
}

/// Moves `buffer` onto the rayon pool, fills it and sends back a [`FillOutcome`] on `done`.
///
/// Never blocks the caller. A panicking generator is reported as [`FillStatus::Failed`].
pub fn spawn_fill(
    id: JobId,
    mut buffer: VolumeBuffer,
    generator: BoxedGenerator,
    cancel: Arc<AtomicBool>,
    done: Sender<FillOutcome>,
) {
    rayon::spawn(move || {
        let result = catch_unwind(AssertUnwindSafe(|| {
            fill(&mut buffer, &*generator, &cancel)
        }));

        let status = match result {
            Ok(FillStatusKind::Done) => FillStatus::Done(buffer),
            Ok(FillStatusKind::Failed(e)) => FillStatus::Failed(e),
            Ok(FillStatusKind::Cancelled) => FillStatus::Cancelled,
            Err(panic) => FillStatus::Failed(Error::FillFailure(panic_reason(&*panic))),
        };

        // the scheduler may already be gone, nothing to report to then
        if done.send(FillOutcome { id, status }).is_err() {
            log::debug!("fill for job {id} finished after the scheduler stopped");
        }
    });
}

/// The message a panic was raised with, if it had one
pub(crate) fn panic_reason(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| String::from("panicked"))
}
