//! `service` runs a [`JobScheduler`] on it's own thread and hands out [`SchedulerHandle`]s to submit to it.

use crate::{
    Coords, Error, Location, Result, SchedulerConfig,
    fill::{BoxedGenerator, FillOutcome},
    job::{EditJob, JobId, JobReport},
    scheduler::{EditRequest, JobIds, JobScheduler, PreparedJob},
    sink::CommitSink,
};
use crossbeam_channel::{Sender, select};
use std::{
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

/// Cheap to clone, can be used from any thread.
///
/// Submitting validates the extent right away, then queues the job for the scheduler
/// thread and starts it's fill. It never waits on the scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    ids: JobIds,
    queue: Sender<EditJob>,
    fills: Sender<FillOutcome>,
    config: SchedulerConfig,
}

impl SchedulerHandle {
    /// See [`JobScheduler::submit`]
    pub fn submit<C: Into<Coords>>(
        &self,
        extent: C,
        target: Location,
        generator: BoxedGenerator,
        ttl: Duration,
    ) -> Result<JobId> {
        self.submit_request(EditRequest::new(extent, target, generator).ttl(ttl))
    }

    /// Fails with [`Error::InvalidExtent`] or [`Error::ExtentTooLarge`] before anything is queued, or with
    /// [`Error::SchedulerStopped`] if the scheduler thread is gone (the fill is never started then).
    pub fn submit_request(&self, request: EditRequest) -> Result<JobId> {
        let prepared = PreparedJob::new(request, self.ids.next(), &self.config, Instant::now())?;
        prepared.start(self.fills.clone(), |job| {
            self.queue.send(job).map_err(|_| Error::SchedulerStopped)
        })
    }
}

/// Owns the scheduler thread, which ticks on a fixed interval until shut down.
///
/// ## Example
/// ```no_run
/// let service = SchedulerService::spawn(SchedulerConfig::default(), world.clone())?;
/// let handle = service.handle();
/// // .. submit from anywhere
/// let cancelled = service.shutdown();
/// ```
#[derive(Debug)]
pub struct SchedulerService {
    handle: SchedulerHandle,
    stop: Sender<()>,
    thread: Option<JoinHandle<Vec<JobReport>>>,
}

impl SchedulerService {
    pub fn spawn<S: CommitSink>(config: SchedulerConfig, sink: S) -> Result<Self> {
        let mut scheduler = JobScheduler::new(config.clone(), sink);
        let handle = SchedulerHandle {
            ids: scheduler.ids(),
            queue: scheduler.queue_sender(),
            fills: scheduler.fill_sender(),
            config: config.clone(),
        };
        let (stop, stop_rx) = crossbeam_channel::bounded::<()>(1);

        let thread = thread::Builder::new()
            .name(String::from("foxedit-scheduler"))
            .spawn(move || {
                log::debug!("scheduler ticking every {:?}", config.tick_interval);
                let ticker = crossbeam_channel::tick(config.tick_interval);
                loop {
                    let stopped = select! {
                        recv(ticker) -> _ => {
                            scheduler.tick();
                            false
                        }
                        // a dropped service counts as a stop too
                        recv(stop_rx) -> _ => true,
                    };
                    if stopped {
                        break;
                    }
                }
                scheduler.shutdown()
            })
            .map_err(|e| Error::SchedulerSpawn(e.to_string()))?;

        Ok(Self {
            handle,
            stop,
            thread: Some(thread),
        })
    }

    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    /// Stops ticking, cancels every live job and waits for the scheduler thread.
    ///
    /// Returns the reports of the cancelled jobs.
    pub fn shutdown(mut self) -> Vec<JobReport> {
        self.stop_and_join()
    }

    fn stop_and_join(&mut self) -> Vec<JobReport> {
        let Some(thread) = self.thread.take() else {
            return vec![];
        };

        let _ = self.stop.try_send(());
        match thread.join() {
            Ok(reports) => reports,
            Err(_) => {
                log::error!("scheduler thread panicked");
                vec![]
            }
        }
    }
}

impl Drop for SchedulerService {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}
