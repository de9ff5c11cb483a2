//! `scheduler` contains [`JobScheduler`], the single owner of every live [`EditJob`].
//!
//! Fills run on the rayon pool and report back through a channel, but nothing about a
//! job changes until the next [`tick`](JobScheduler::tick). A tick does, in order:
//!
//! 1. pick up finished fills, ignoring any for jobs that are gone or no longer filling
//! 2. time out every job whose deadline has passed
//! 3. commit every ready job through the [`CommitSink`], one at a time
//!
//! Resolved jobs are removed within the same tick.

use crate::{
    Coords, Error, Location, Result, SchedulerConfig, VolumeBuffer,
    fill::{BoxedGenerator, FillOutcome, FillStatus, spawn_fill},
    fill::panic_reason,
    job::{EditJob, JobId, JobOutcome, JobReport, JobState, OnCommit, OnResolved},
    sink::CommitSink,
};
use ahash::AHashMap;
use crossbeam_channel::{Receiver, Sender};
use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

/// Everything needed to start a job.
///
/// ## Example
/// ```no_run
/// let request = EditRequest::new((25, 25, 25), target, fill::uniform(Block::new("torch")))
///     .ttl(Duration::from_secs(60))
///     .on_commit(|id| println!("merging {id}"))
///     .on_resolved(|report| println!("{report}"));
/// ```
pub struct EditRequest {
    pub extent: Coords,
    pub origin: Coords,
    pub target: Location,
    pub generator: BoxedGenerator,
    /// Falls back to [`SchedulerConfig::default_ttl`]
    pub ttl: Option<Duration>,
    pub on_resolved: Option<OnResolved>,
    pub on_commit: Option<OnCommit>,
}

impl EditRequest {
    pub fn new<C: Into<Coords>>(extent: C, target: Location, generator: BoxedGenerator) -> Self {
        Self {
            extent: extent.into(),
            origin: Coords::ZERO,
            target,
            generator,
            ttl: None,
            on_resolved: None,
            on_commit: None,
        }
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn origin<C: Into<Coords>>(mut self, origin: C) -> Self {
        self.origin = origin.into();
        self
    }

    pub fn on_resolved<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(&JobReport) + Send + 'static,
    {
        self.on_resolved = Some(Box::new(callback));
        self
    }

    /// Runs once the fill is done and the buffer is about to be committed, never for jobs that fail earlier
    pub fn on_commit<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(JobId) + Send + 'static,
    {
        self.on_commit = Some(Box::new(callback));
        self
    }
}

/// Hands out job ids, shared between a scheduler and every handle submitting to it
#[derive(Debug, Clone, Default)]
pub(crate) struct JobIds(Arc<AtomicU64>);

impl JobIds {
    pub(crate) fn next(&self) -> JobId {
        JobId(self.0.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

/// A job that is set up but whose fill hasn't been started yet
pub(crate) struct PreparedJob {
    job: EditJob,
    buffer: VolumeBuffer,
    generator: BoxedGenerator,
}

impl PreparedJob {
    /// Validates the request and builds the job, nothing is running after this.
    ///
    /// Fails with [`Error::InvalidExtent`] if any extent dimension is `<= 0`, or with
    /// [`Error::ExtentTooLarge`] above [`SchedulerConfig::max_volume`] cells.
    pub(crate) fn new(
        request: EditRequest,
        id: JobId,
        config: &SchedulerConfig,
        now: Instant,
    ) -> Result<Self> {
        VolumeBuffer::checked_volume(request.extent, config.max_volume)?;
        let buffer = VolumeBuffer::with_origin(request.extent, request.origin)?;
        let mut job = EditJob::new(
            id,
            request.target,
            request.extent,
            now,
            request.ttl.unwrap_or(config.default_ttl),
            request.on_resolved,
        );
        job.on_commit = request.on_commit;

        Ok(Self {
            job,
            buffer,
            generator: request.generator,
        })
    }

    /// Hands the job to `register` and only then starts the fill, so a fill can never
    /// report back for a job the scheduler doesn't know about yet.
    pub(crate) fn start<F>(self, done: Sender<FillOutcome>, register: F) -> Result<JobId>
    where
        F: FnOnce(EditJob) -> Result<()>,
    {
        let PreparedJob {
            job,
            buffer,
            generator,
        } = self;
        let (id, cancel) = (job.id, job.cancel.clone());

        register(job)?;
        spawn_fill(id, buffer, generator, cancel, done);
        Ok(id)
    }
}

pub struct JobScheduler<S: CommitSink> {
    config: SchedulerConfig,
    sink: S,
    jobs: AHashMap<JobId, EditJob>,
    ids: JobIds,

    fill_tx: Sender<FillOutcome>,
    fill_rx: Receiver<FillOutcome>,
    /// Jobs submitted from other threads, registered at the start of the next tick
    queued_tx: Sender<EditJob>,
    queued_rx: Receiver<EditJob>,
}

impl<S: CommitSink> JobScheduler<S> {
    pub fn new(config: SchedulerConfig, sink: S) -> Self {
        let (fill_tx, fill_rx) = crossbeam_channel::unbounded();
        let (queued_tx, queued_rx) = crossbeam_channel::unbounded();
        Self {
            config,
            sink,
            jobs: AHashMap::new(),
            ids: JobIds::default(),
            fill_tx,
            fill_rx,
            queued_tx,
            queued_rx,
        }
    }

    /// Creates a job in [`JobState::Filling`], starts it's fill and returns immediately.
    ///
    /// Fails with [`Error::InvalidExtent`] if any extent dimension is `<= 0`, or with
    /// [`Error::ExtentTooLarge`] above [`SchedulerConfig::max_volume`] cells. No job is created then.
    ///
    /// ## Example
    /// ```no_run
    /// let id = scheduler.submit(
    ///     (25, 25, 25),
    ///     Location::new("overworld", (0, 64, 0)),
    ///     fill::uniform(Block::new("torch")),
    ///     Duration::from_secs(60),
    /// )?;
    /// ```
    pub fn submit<C: Into<Coords>>(
        &mut self,
        extent: C,
        target: Location,
        generator: BoxedGenerator,
        ttl: Duration,
    ) -> Result<JobId> {
        self.submit_request(EditRequest::new(extent, target, generator).ttl(ttl))
    }

    /// Same as [`JobScheduler::submit`] but takes a full [`EditRequest`]
    pub fn submit_request(&mut self, request: EditRequest) -> Result<JobId> {
        let prepared = PreparedJob::new(request, self.ids.next(), &self.config, Instant::now())?;
        prepared.start(self.fill_tx.clone(), |job| {
            self.insert(job);
            Ok(())
        })
    }

    fn insert(&mut self, job: EditJob) {
        log::debug!(
            "job {} queued: {:?} at {:?} in '{}'",
            job.id,
            job.extent,
            job.target.coords,
            job.target.world
        );
        self.jobs.insert(job.id, job);
    }

    /// Moves every job queued from other threads into the table
    fn register_queued(&mut self) {
        let queued: Vec<EditJob> = self.queued_rx.try_iter().collect();
        for job in queued {
            self.insert(job);
        }
    }

    /// Where handles on other threads queue their jobs, see [`PreparedJob::start`]
    pub(crate) fn queue_sender(&self) -> Sender<EditJob> {
        self.queued_tx.clone()
    }

    pub(crate) fn ids(&self) -> JobIds {
        self.ids.clone()
    }

    pub(crate) fn fill_sender(&self) -> Sender<FillOutcome> {
        self.fill_tx.clone()
    }

    /// Current state of a live job, [`None`] once it has been resolved and removed
    pub fn state(&self, id: JobId) -> Option<JobState> {
        self.jobs.get(&id).map(|j| j.state())
    }

    /// Amount of jobs that haven't resolved yet.
    ///
    /// Jobs queued from a [`SchedulerHandle`](crate::SchedulerHandle) only count once a tick registered them.
    pub fn live_jobs(&self) -> usize {
        self.jobs.len()
    }

    /// [`JobScheduler::tick_at`] with the current time
    pub fn tick(&mut self) -> Vec<JobReport> {
        self.tick_at(Instant::now())
    }

    /// Runs one polling cycle as if it was `now`, returns the reports of every job resolved by it.
    pub fn tick_at(&mut self, now: Instant) -> Vec<JobReport> {
        let mut reports = vec![];

        // 1. completions
        // snapshot fills before registering queued jobs: a job is always queued before
        // it's fill starts, so every outcome taken here belongs to a job in the table
        let outcomes: Vec<FillOutcome> = self.fill_rx.try_iter().collect();
        self.register_queued();
        for FillOutcome { id, status } in outcomes {
            let job = match self.jobs.get_mut(&id) {
                Some(job) if job.state() == JobState::Filling => job,
                _ => {
                    log::debug!("ignoring fill result for job {id}, it has already resolved");
                    continue;
                }
            };

            let failure = match status {
                FillStatus::Done(buffer) => {
                    job.buffer = Some(buffer);
                    match job.transition(JobState::Ready) {
                        Ok(()) => None,
                        Err(e) => Some(e.to_string()),
                    }
                }
                FillStatus::Failed(e) => Some(e.to_string()),
                FillStatus::Cancelled => Some(String::from("fill was cancelled")),
            };

            if let Some(reason) = failure {
                reports.extend(self.resolve(id, JobOutcome::FillFailed(reason), now));
            }
        }

        let mut ids: Vec<JobId> = self.jobs.keys().copied().collect();
        ids.sort_unstable();

        // 2. deadlines
        ids.retain(|id| {
            let expired = self.jobs.get(id).is_some_and(|j| j.is_expired(now));
            if expired {
                reports.extend(self.resolve(*id, JobOutcome::TimedOut, now));
            }
            !expired
        });

        // 3. commits
        for id in ids {
            let Some(job) = self.jobs.get_mut(&id) else {
                continue;
            };
            if job.state() != JobState::Ready {
                continue;
            }

            let Some(buffer) = job.buffer.take() else {
                let reason = String::from("ready without a buffer");
                reports.extend(self.resolve(id, JobOutcome::CommitFailed(reason), now));
                continue;
            };
            if let Some(callback) = job.on_commit.take() {
                callback(id);
            }

            log::debug!(
                "job {id} merging {} cell(s) of {} block type(s)",
                buffer.volume(),
                buffer.palette().len()
            );
            // a panicking sink fails this job, the loop and every other job carry on
            let sink = &mut self.sink;
            let target = &job.target;
            let result = catch_unwind(AssertUnwindSafe(|| sink.apply(&buffer, target)));
            let outcome = match result {
                Ok(Ok(())) => JobOutcome::Committed,
                Ok(Err(Error::CommitFailure(reason))) => JobOutcome::CommitFailed(reason),
                Ok(Err(e)) => JobOutcome::CommitFailed(e.to_string()),
                Err(panic) => JobOutcome::CommitFailed(panic_reason(&*panic)),
            };
            reports.extend(self.resolve(id, outcome, now));
        }

        reports
    }

    /// Cancels every live job, their fills stop at the next row and their results are ignored.
    pub fn shutdown(&mut self) -> Vec<JobReport> {
        self.register_queued();
        let now = Instant::now();
        let mut ids: Vec<JobId> = self.jobs.keys().copied().collect();
        ids.sort_unstable();

        if !ids.is_empty() {
            log::info!("cancelling {} live edit job(s)", ids.len());
        }
        ids.into_iter()
            .filter_map(|id| self.resolve(id, JobOutcome::Cancelled, now))
            .collect()
    }

    /// Moves a job into it's terminal state, removes it and notifies whoever submitted it
    fn resolve(&mut self, id: JobId, outcome: JobOutcome, now: Instant) -> Option<JobReport> {
        let mut job = self.jobs.remove(&id)?;
        if let Err(e) = job.transition(outcome.state()) {
            log::error!("job {id} could not resolve as {outcome:?}: {e}");
            return None;
        }

        let report = job.report(outcome, now);
        match &report.outcome {
            JobOutcome::Committed => log::info!(
                "job {id} committed {:?} at {:?} in '{}' after {:?}",
                job.extent,
                job.target.coords,
                job.target.world,
                report.elapsed
            ),
            JobOutcome::Cancelled => log::debug!("job {id} cancelled"),
            other => log::warn!("job {id} failed: {other:?}"),
        }

        if let Some(callback) = job.on_resolved.take() {
            callback(&report);
        }
        Some(report)
    }
}

impl<S: CommitSink> std::fmt::Debug for JobScheduler<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "JobScheduler\n  > live jobs: {}\n  > {:?}",
            self.jobs.len(),
            self.config
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{Block, MemoryWorld, World, fill};
    use std::{
        collections::HashSet,
        sync::{Mutex, mpsc},
        thread,
    };

    fn config() -> SchedulerConfig {
        SchedulerConfig {
            tick_interval: Duration::from_millis(10),
            default_ttl: Duration::from_secs(30),
            ..SchedulerConfig::default()
        }
    }

    fn world() -> MemoryWorld {
        let world = MemoryWorld::new();
        world.load_world("overworld");
        world
    }

    /// Ticks until `id` has resolved, sleeping a little in between
    fn tick_until_resolved<S: CommitSink>(
        scheduler: &mut JobScheduler<S>,
        id: JobId,
    ) -> Vec<JobReport> {
        let mut reports = vec![];
        for _ in 0..500 {
            reports.extend(scheduler.tick());
            if scheduler.state(id).is_none() {
                return reports;
            }
            thread::sleep(Duration::from_millis(10));
        }
        panic!("job {id} never resolved");
    }

    #[test]
    fn invalid_extent_creates_no_job() {
        let mut scheduler = JobScheduler::new(config(), world());
        let result = scheduler.submit(
            (0, 5, 5),
            Location::new("overworld", (0, 0, 0)),
            fill::uniform(Block::new("stone")),
            Duration::from_secs(5),
        );
        assert_eq!(result, Err(Error::InvalidExtent(Coords::new(0, 5, 5))));
        assert_eq!(scheduler.live_jobs(), 0);
        assert!(scheduler.tick().is_empty());
    }

    #[test]
    fn oversized_extent_creates_no_job() {
        let mut scheduler = JobScheduler::new(config(), world());
        let extent = Coords::new(100_000, 100_000, 1_000);
        let result = scheduler.submit(
            extent,
            Location::new("overworld", (0, 0, 0)),
            fill::uniform(Block::new("stone")),
            Duration::from_secs(5),
        );
        assert_eq!(
            result,
            Err(Error::ExtentTooLarge {
                extent,
                max: config().max_volume
            })
        );
        assert_eq!(scheduler.live_jobs(), 0);
    }

    #[test]
    fn max_volume_is_configurable() -> Result<()> {
        let mut scheduler = JobScheduler::new(
            SchedulerConfig {
                max_volume: 8,
                ..config()
            },
            world(),
        );
        let target = Location::new("overworld", (0, 0, 0));
        let stone = || fill::uniform(Block::new("stone"));
        let ttl = Duration::from_secs(5);

        scheduler.submit((2, 2, 2), target.clone(), stone(), ttl)?;
        assert!(matches!(
            scheduler.submit((3, 3, 1), target, stone(), ttl),
            Err(Error::ExtentTooLarge { max: 8, .. })
        ));
        assert_eq!(scheduler.live_jobs(), 1);
        Ok(())
    }

    #[test]
    fn target_at_coordinate_limit_fails_commit() -> Result<()> {
        let world = world();
        let mut scheduler = JobScheduler::new(config(), world.clone());
        let id = scheduler.submit(
            (2, 1, 1),
            Location::new("overworld", (i32::MAX, 64, 0)),
            fill::uniform(Block::new("stone")),
            Duration::from_secs(5),
        )?;

        let reports = tick_until_resolved(&mut scheduler, id);
        assert!(
            matches!(reports[0].outcome, JobOutcome::CommitFailed(_)),
            "{:?}",
            reports[0].outcome
        );
        assert_eq!(world.block_count("overworld")?, 0);

        // the scheduler keeps working afterwards
        let target = Location::new("overworld", (0, 64, 0));
        let id = scheduler.submit(
            (1, 1, 1),
            target.clone(),
            fill::uniform(Block::new("stone")),
            Duration::from_secs(5),
        )?;
        let reports = tick_until_resolved(&mut scheduler, id);
        assert_eq!(reports[0].outcome, JobOutcome::Committed);
        assert_eq!(world.get_block(&target)?, Block::new("stone"));
        Ok(())
    }

    #[test]
    fn panicking_sink_fails_only_its_job() -> Result<()> {
        let sink = |_: &VolumeBuffer, target: &Location| -> Result<()> {
            if target.coords.x < 0 {
                panic!("sink exploded");
            }
            Ok(())
        };
        let mut scheduler = JobScheduler::new(config(), sink);
        let bad = scheduler.submit(
            (1, 1, 1),
            Location::new("overworld", (-1, 0, 0)),
            fill::uniform(Block::new("stone")),
            Duration::from_secs(5),
        )?;
        let good = scheduler.submit(
            (1, 1, 1),
            Location::new("overworld", (1, 0, 0)),
            fill::uniform(Block::new("stone")),
            Duration::from_secs(5),
        )?;

        let mut reports = vec![];
        for _ in 0..500 {
            reports.extend(scheduler.tick());
            if scheduler.live_jobs() == 0 {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        reports.sort_by_key(|r| r.id);
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].id, bad);
        assert_eq!(
            reports[0].outcome,
            JobOutcome::CommitFailed(String::from("sink exploded"))
        );
        assert_eq!(reports[1].id, good);
        assert_eq!(reports[1].outcome, JobOutcome::Committed);
        Ok(())
    }

    #[test]
    fn commit_hook_runs_before_commit() -> Result<()> {
        let events = Arc::new(Mutex::new(vec![]));
        let sink_events = events.clone();
        let sink = move |_: &VolumeBuffer, _: &Location| -> Result<()> {
            sink_events.lock().expect("lock").push("commit");
            Ok(())
        };
        let mut scheduler = JobScheduler::new(config(), sink);

        let (merging, resolved) = (events.clone(), events.clone());
        let request = EditRequest::new(
            (2, 2, 2),
            Location::new("overworld", (0, 0, 0)),
            fill::uniform(Block::new("stone")),
        )
        .on_commit(move |_| merging.lock().expect("lock").push("merging"))
        .on_resolved(move |_| resolved.lock().expect("lock").push("resolved"));
        let id = scheduler.submit_request(request)?;

        tick_until_resolved(&mut scheduler, id);
        assert_eq!(
            *events.lock().expect("lock"),
            vec!["merging", "commit", "resolved"]
        );
        Ok(())
    }

    #[test]
    fn commit_hook_skipped_for_failed_fill() -> Result<()> {
        let mut scheduler = JobScheduler::new(config(), world());
        let (tx, rx) = mpsc::channel();
        let generator: BoxedGenerator = Box::new(|_: Coords| -> Result<Block> {
            Err(Error::FillFailure(String::from("nope")))
        });
        let target = Location::new("overworld", (0, 0, 0));
        let request = EditRequest::new((1, 1, 1), target, generator).on_commit(move |id| {
            let _ = tx.send(id);
        });
        let id = scheduler.submit_request(request)?;

        let reports = tick_until_resolved(&mut scheduler, id);
        assert!(matches!(reports[0].outcome, JobOutcome::FillFailed(_)));
        assert!(rx.try_recv().is_err());
        Ok(())
    }

    #[test]
    fn solid_and_empty_scenario() -> Result<()> {
        let received = Arc::new(Mutex::new(vec![]));
        let seen = received.clone();
        let sink = move |buffer: &VolumeBuffer, _: &Location| -> Result<()> {
            let mut seen = seen.lock().expect("lock");
            seen.push((buffer.get((0, 0, 0))?.clone(), buffer.get((1, 0, 0))?.clone()));
            Ok(())
        };
        let mut scheduler = JobScheduler::new(config(), sink);

        let generator: BoxedGenerator = Box::new(|c: Coords| -> Result<Block> {
            Ok(if c == (0, 0, 0) {
                Block::new("stone")
            } else {
                Block::air()
            })
        });
        let id = scheduler.submit(
            (2, 1, 1),
            Location::new("overworld", (0, 0, 0)),
            generator,
            Duration::from_secs(5),
        )?;
        assert_eq!(scheduler.state(id), Some(JobState::Filling));

        let reports = tick_until_resolved(&mut scheduler, id);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].outcome, JobOutcome::Committed);
        assert_eq!(
            *received.lock().expect("lock"),
            vec![(Block::new("stone"), Block::air())]
        );
        Ok(())
    }

    #[test]
    fn committed_world_matches_generator() -> Result<()> {
        let world = world();
        let mut scheduler = JobScheduler::new(config(), world.clone());
        let generator: BoxedGenerator = Box::new(|c: Coords| -> Result<Block> {
            Ok(if (c.x + c.y + c.z) % 2 == 0 {
                Block::new("white_wool")
            } else {
                Block::new("black_wool")
            })
        });
        let target = Location::new("overworld", (10, 64, -10));
        let id = scheduler.submit((3, 4, 5), target.clone(), generator, Duration::from_secs(5))?;

        let reports = tick_until_resolved(&mut scheduler, id);
        assert!(reports[0].outcome.is_success());

        for x in 0..3 {
            for y in 0..4 {
                for z in 0..5 {
                    let expected = if (x + y + z) % 2 == 0 {
                        "minecraft:white_wool"
                    } else {
                        "minecraft:black_wool"
                    };
                    let block = world.get_block(&Location::new("overworld", (10 + x, 64 + y, -10 + z)))?;
                    assert_eq!(block.name, expected);
                }
            }
        }
        Ok(())
    }

    #[test]
    fn fill_is_only_observed_on_tick() -> Result<()> {
        let mut scheduler = JobScheduler::new(config(), world());
        let id = scheduler.submit(
            (1, 1, 1),
            Location::new("overworld", (0, 0, 0)),
            fill::uniform(Block::new("stone")),
            Duration::from_secs(5),
        )?;

        thread::sleep(Duration::from_millis(200));
        assert_eq!(scheduler.state(id), Some(JobState::Filling));
        let reports = scheduler.tick();
        assert_eq!(reports.len(), 1);
        assert_eq!(scheduler.state(id), None);
        Ok(())
    }

    #[test]
    fn timeout_then_late_fill_has_no_effect() -> Result<()> {
        let world = world();
        let mut scheduler = JobScheduler::new(config(), world.clone());

        let (release_tx, release_rx) = mpsc::channel::<()>();
        let release_rx = Mutex::new(release_rx);
        let generator: BoxedGenerator = Box::new(move |_: Coords| -> Result<Block> {
            // blocks the first cell until the test lets it go
            let _ = release_rx.lock().expect("lock").recv();
            Ok(Block::new("stone"))
        });

        let target = Location::new("overworld", (0, 64, 0));
        let id = scheduler.submit((1, 1, 1), target.clone(), generator, Duration::from_millis(50))?;

        let reports = scheduler.tick_at(Instant::now() + Duration::from_millis(100));
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].id, id);
        assert_eq!(reports[0].outcome, JobOutcome::TimedOut);
        assert_eq!(scheduler.live_jobs(), 0);

        // let the stalled fill finish and give it time to report back
        release_tx.send(()).expect("send");
        thread::sleep(Duration::from_millis(200));

        assert!(scheduler.tick().is_empty());
        assert_eq!(scheduler.live_jobs(), 0);
        assert!(world.get_block(&target)?.is_air());
        Ok(())
    }

    #[test]
    fn ready_job_past_deadline_times_out() -> Result<()> {
        let world = world();
        let mut scheduler = JobScheduler::new(config(), world.clone());
        let target = Location::new("overworld", (0, 64, 0));
        let id = scheduler.submit(
            (1, 1, 1),
            target.clone(),
            fill::uniform(Block::new("stone")),
            Duration::from_millis(50),
        )?;

        thread::sleep(Duration::from_millis(200));
        let reports = scheduler.tick_at(Instant::now() + Duration::from_secs(1));
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].id, id);
        assert_eq!(reports[0].outcome, JobOutcome::TimedOut);
        assert!(world.get_block(&target)?.is_air());
        Ok(())
    }

    #[test]
    fn failing_generator_never_commits() -> Result<()> {
        let world = world();
        let mut scheduler = JobScheduler::new(config(), world.clone());
        let generator: BoxedGenerator = Box::new(|c: Coords| -> Result<Block> {
            if c.y == 1 {
                Err(Error::FillFailure(String::from("no blocks above ground")))
            } else {
                Ok(Block::new("stone"))
            }
        });
        let target = Location::new("overworld", (0, 64, 0));
        let id = scheduler.submit((2, 2, 2), target.clone(), generator, Duration::from_secs(5))?;

        let reports = tick_until_resolved(&mut scheduler, id);
        assert_eq!(
            reports[0].outcome,
            JobOutcome::FillFailed(
                Error::FillFailure(String::from("no blocks above ground")).to_string()
            )
        );
        assert!(world.get_block(&target)?.is_air());
        Ok(())
    }

    #[test]
    fn commit_failure_leaves_world_untouched() -> Result<()> {
        let world = world();
        let mut scheduler = JobScheduler::new(config(), world.clone());
        let target = Location::new("overworld", (0, 319, 0));
        // two blocks tall at the build limit, the top one doesn't fit
        let id = scheduler.submit(
            (1, 2, 1),
            target.clone(),
            fill::uniform(Block::new("stone")),
            Duration::from_secs(5),
        )?;

        let reports = tick_until_resolved(&mut scheduler, id);
        assert!(matches!(reports[0].outcome, JobOutcome::CommitFailed(_)));
        assert_eq!(reports[0].outcome.state(), JobState::Failed);
        assert!(world.get_block(&target)?.is_air());
        Ok(())
    }

    #[test]
    fn callback_runs_once_with_report() -> Result<()> {
        let mut scheduler = JobScheduler::new(config(), world());
        let (tx, rx) = mpsc::channel();
        let request = EditRequest::new(
            (2, 2, 2),
            Location::new("overworld", (0, 0, 0)),
            fill::uniform(Block::new("stone")),
        )
        .on_resolved(move |report| {
            let _ = tx.send(report.clone());
        });
        let id = scheduler.submit_request(request)?;

        let reports = tick_until_resolved(&mut scheduler, id);
        let notified = rx.recv_timeout(Duration::from_secs(1)).expect("report");
        assert_eq!(notified, reports[0]);
        assert!(rx.try_recv().is_err());
        Ok(())
    }

    #[test]
    fn many_jobs_commit_exactly_once() -> Result<()> {
        let world = world();
        let mut scheduler = JobScheduler::new(config(), world.clone());

        let mut ids = HashSet::new();
        for i in 0..50 {
            let block = Block::new(format!("block_{i}"));
            let target = Location::new("overworld", (i * 10, 0, 0));
            ids.insert(scheduler.submit(
                (4, 4, 4),
                target,
                fill::uniform(block),
                Duration::from_secs(30),
            )?);
        }
        assert_eq!(ids.len(), 50);

        let mut reports = vec![];
        for _ in 0..500 {
            reports.extend(scheduler.tick());
            if scheduler.live_jobs() == 0 {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }

        assert_eq!(reports.len(), 50);
        let resolved: HashSet<JobId> = reports.iter().map(|r| r.id).collect();
        assert_eq!(resolved, ids);
        assert!(reports.iter().all(|r| r.outcome == JobOutcome::Committed));

        for i in 0..50 {
            let expected = Block::new(format!("block_{i}"));
            for x in 0..4 {
                for y in 0..4 {
                    for z in 0..4 {
                        let loc = Location::new("overworld", (i * 10 + x, y, z));
                        assert_eq!(world.get_block(&loc)?, expected);
                    }
                }
            }
        }
        Ok(())
    }

    #[test]
    fn shutdown_cancels_everything() -> Result<()> {
        let mut scheduler = JobScheduler::new(config(), world());
        for i in 0..3 {
            scheduler.submit(
                (2, 2, 2),
                Location::new("overworld", (i, 0, 0)),
                fill::uniform(Block::new("stone")),
                Duration::from_secs(30),
            )?;
        }

        let reports = scheduler.shutdown();
        assert_eq!(reports.len(), 3);
        assert!(reports.iter().all(|r| r.outcome == JobOutcome::Cancelled));
        assert_eq!(scheduler.live_jobs(), 0);

        thread::sleep(Duration::from_millis(100));
        assert!(scheduler.tick().is_empty());
        Ok(())
    }
}
