use std::any::Any;
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info, trace, warn};

use crate::job::{TileFailure, TileJob, TileOutcome, TileResult};
use crate::kernel::{EscapeTimeKernel, TileKernel};
use crate::palette::Palette;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Identifies one submitted batch. The only thing a caller can wait on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BatchHandle {
    epoch: u64,
}

impl BatchHandle {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

/// Totals for a batch whose every tile has reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub epoch: u64,
    pub tiles_total: usize,
    pub tiles_rendered: usize,
    pub tiles_failed: usize,
    pub elapsed: Duration,
}

/// Where a batch stands from the caller's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    /// Tiles are still outstanding.
    Pending,
    /// Every tile reported, rendered or failed.
    Complete(BatchSummary),
    /// A newer batch was submitted. This batch will never complete and none
    /// of its remaining tiles will reach the callback.
    Superseded,
}

/// Running counters, kept for logging and diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub batches_submitted: u64,
    pub batches_superseded: u64,
    pub tiles_rendered: u64,
    pub tiles_failed: u64,
    /// Finished results that arrived for an older epoch and were discarded.
    pub stale_results_dropped: u64,
    /// Jobs a worker skipped or stopped because their epoch was superseded.
    pub jobs_abandoned: u64,
}

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

type TileCallback = Box<dyn FnMut(TileOutcome)>;

struct ActiveBatch {
    epoch: u64,
    total: usize,
    pending: usize,
    rendered: usize,
    failed: usize,
    started: Instant,
    completed: Option<BatchSummary>,
    /// Origins of tiles that reported failure and have not been retried.
    failed_tiles: HashSet<(u32, u32)>,
    on_tile: TileCallback,
}

impl ActiveBatch {
    fn summary(&self) -> BatchSummary {
        BatchSummary {
            epoch: self.epoch,
            tiles_total: self.total,
            tiles_rendered: self.rendered,
            tiles_failed: self.failed,
            elapsed: self.started.elapsed(),
        }
    }
}

/// What a worker sends back for every job it was given.
enum WorkerReply {
    Finished(TileOutcome),
    Abandoned(TileJob),
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// A fixed pool of persistent workers fed with epoch-stamped tile jobs.
///
/// The scheduler lives on one coordinating thread. Workers never touch its
/// state: they take a [`TileJob`] by value and send one reply over a
/// channel. Replies are handled, and the per-tile callback invoked, only
/// inside [`poll`](Self::poll), [`wait`](Self::wait) and
/// [`wait_timeout`](Self::wait_timeout) on the owning thread.
///
/// Every [`submit`](Self::submit) bumps the epoch and replaces the active
/// batch. Results carrying any other epoch are dropped without reaching a
/// callback, so an older render can never paint over a newer one.
pub struct TileScheduler {
    pool: ThreadPool,
    worker_count: usize,
    kernel: Arc<dyn TileKernel>,
    /// Workers' copy of the current epoch; lets them give up on superseded
    /// jobs early. Correctness does not depend on it.
    active_epoch: Arc<AtomicU64>,
    current_epoch: u64,
    batch: Option<ActiveBatch>,
    tx: Sender<WorkerReply>,
    rx: Receiver<WorkerReply>,
    stats: SchedulerStats,
}

impl TileScheduler {
    /// Pool size used when none is given: the hardware parallelism, or 4.
    pub fn default_worker_count() -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
    }

    /// Build a scheduler running `kernel` on `worker_count` threads
    /// (`None` = [`default_worker_count`](Self::default_worker_count)).
    pub fn new(worker_count: Option<usize>, kernel: Arc<dyn TileKernel>) -> crate::Result<Self> {
        let worker_count = worker_count
            .filter(|&n| n > 0)
            .unwrap_or_else(Self::default_worker_count);
        let pool = ThreadPoolBuilder::new()
            .num_threads(worker_count)
            .thread_name(|i| format!("brotzoom-worker-{i}"))
            .build()?;
        let (tx, rx) = mpsc::channel();

        info!(worker_count, "Tile scheduler started");

        Ok(Self {
            pool,
            worker_count,
            kernel,
            active_epoch: Arc::new(AtomicU64::new(0)),
            current_epoch: 0,
            batch: None,
            tx,
            rx,
            stats: SchedulerStats::default(),
        })
    }

    /// Escape-time scheduler colouring with `palette`.
    pub fn with_palette(worker_count: Option<usize>, palette: Palette) -> crate::Result<Self> {
        Self::new(worker_count, Arc::new(EscapeTimeKernel::new(palette)))
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Epoch of the most recent submission (0 before the first).
    pub fn current_epoch(&self) -> u64 {
        self.current_epoch
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    /// Submit a batch, superseding whatever was active.
    ///
    /// Every job is stamped with the new epoch and queued; idle workers pull
    /// them in no particular order. `on_tile` is called once per tile of
    /// this batch, rendered or failed, on the thread that drives
    /// `poll`/`wait`. An empty batch is complete immediately.
    pub fn submit<F>(&mut self, jobs: Vec<TileJob>, on_tile: F) -> BatchHandle
    where
        F: FnMut(TileOutcome) + 'static,
    {
        self.current_epoch += 1;
        let epoch = self.current_epoch;
        self.active_epoch.store(epoch, Ordering::Release);

        if let Some(old) = self.batch.take() {
            if old.completed.is_none() {
                self.stats.batches_superseded += 1;
                debug!(
                    epoch = old.epoch,
                    pending = old.pending,
                    "Batch superseded before completion"
                );
            }
        }
        self.stats.batches_submitted += 1;

        let total = jobs.len();
        self.batch = Some(ActiveBatch {
            epoch,
            total,
            pending: total,
            rendered: 0,
            failed: 0,
            started: Instant::now(),
            completed: None,
            failed_tiles: HashSet::new(),
            on_tile: Box::new(on_tile),
        });
        debug!(epoch, tiles = total, "Submitting batch");

        for job in jobs {
            self.dispatch(job.stamped(epoch));
        }
        if total == 0 {
            self.complete_active();
        }

        BatchHandle { epoch }
    }

    /// Queue a failed tile again under the still-active epoch.
    ///
    /// Returns `false` when the failure belongs to a superseded batch, or
    /// when that tile is not currently failed (e.g. it was already retried).
    pub fn retry(&mut self, failure: TileFailure) -> bool {
        if failure.epoch != self.current_epoch {
            debug!(
                epoch = failure.epoch,
                current = self.current_epoch,
                "Not retrying tile from superseded batch"
            );
            return false;
        }
        let Some(batch) = self.batch.as_mut() else {
            return false;
        };
        let origin = (failure.job.tile.x, failure.job.tile.y);
        if !batch.failed_tiles.remove(&origin) {
            debug!(
                epoch = failure.epoch,
                x = origin.0,
                y = origin.1,
                "Not retrying tile that is not failed"
            );
            return false;
        }
        batch.failed = batch.failed.saturating_sub(1);
        batch.pending += 1;
        batch.completed = None;
        debug!(
            epoch = failure.epoch,
            x = failure.job.tile.x,
            y = failure.job.tile.y,
            "Retrying tile"
        );
        self.dispatch(failure.job);
        true
    }

    /// Non-blocking status of `handle`.
    pub fn status(&self, handle: BatchHandle) -> BatchStatus {
        if handle.epoch != self.current_epoch {
            return BatchStatus::Superseded;
        }
        match &self.batch {
            Some(batch) => match batch.completed {
                Some(summary) => BatchStatus::Complete(summary),
                None => BatchStatus::Pending,
            },
            None => BatchStatus::Superseded,
        }
    }

    /// Handle every reply that has already arrived. Returns how many.
    pub fn poll(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(reply) = self.rx.try_recv() {
            self.handle_reply(reply);
            handled += 1;
        }
        handled
    }

    /// Block, handling replies, until `handle` completes or is superseded.
    ///
    /// A handle superseded before the call returns [`BatchStatus::Superseded`]
    /// right away rather than blocking forever.
    pub fn wait(&mut self, handle: BatchHandle) -> BatchStatus {
        loop {
            let status = self.status(handle);
            if status != BatchStatus::Pending {
                return status;
            }
            match self.rx.recv() {
                Ok(reply) => self.handle_reply(reply),
                // Unreachable while `self.tx` is alive.
                Err(_) => return status,
            }
        }
    }

    /// Like [`wait`](Self::wait), but gives up after `timeout` and reports
    /// [`BatchStatus::Pending`].
    pub fn wait_timeout(&mut self, handle: BatchHandle, timeout: Duration) -> BatchStatus {
        let deadline = Instant::now() + timeout;
        loop {
            let status = self.status(handle);
            if status != BatchStatus::Pending {
                return status;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(reply) => self.handle_reply(reply),
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return self.status(handle)
                }
            }
        }
    }

    fn dispatch(&self, job: TileJob) {
        let kernel = Arc::clone(&self.kernel);
        let active_epoch = Arc::clone(&self.active_epoch);
        let tx = self.tx.clone();
        self.pool.spawn(move || {
            let reply = run_job(job, kernel.as_ref(), &active_epoch);
            // The scheduler may already be gone; nobody is left to tell.
            let _ = tx.send(reply);
        });
    }

    fn handle_reply(&mut self, reply: WorkerReply) {
        let outcome = match reply {
            WorkerReply::Finished(outcome) => outcome,
            WorkerReply::Abandoned(job) => {
                if job.epoch == self.current_epoch {
                    // Abandoned on a stale read of the epoch; still wanted.
                    self.dispatch(job);
                } else {
                    self.stats.jobs_abandoned += 1;
                    trace!(epoch = job.epoch, "Worker abandoned superseded job");
                }
                return;
            }
        };

        let epoch = outcome.epoch();
        let Some(batch) = self.batch.as_mut().filter(|b| b.epoch == epoch) else {
            self.stats.stale_results_dropped += 1;
            debug!(
                epoch,
                current = self.current_epoch,
                "Dropping stale tile result"
            );
            return;
        };

        match &outcome {
            TileOutcome::Rendered(_) => {
                batch.rendered += 1;
                self.stats.tiles_rendered += 1;
            }
            TileOutcome::Failed(failure) => {
                batch.failed += 1;
                batch.failed_tiles.insert((failure.job.tile.x, failure.job.tile.y));
                self.stats.tiles_failed += 1;
                warn!(
                    epoch,
                    x = failure.job.tile.x,
                    y = failure.job.tile.y,
                    reason = %failure.reason,
                    "Tile failed"
                );
            }
        }
        batch.pending = batch.pending.saturating_sub(1);
        (batch.on_tile)(outcome);

        if batch.pending == 0 {
            self.complete_active();
        }
    }

    fn complete_active(&mut self) {
        let Some(batch) = self.batch.as_mut() else {
            return;
        };
        let summary = batch.summary();
        batch.completed = Some(summary);
        info!(
            epoch = summary.epoch,
            tiles = summary.tiles_total,
            rendered = summary.tiles_rendered,
            failed = summary.tiles_failed,
            elapsed_ms = summary.elapsed.as_millis(),
            "Batch complete"
        );
    }
}

// ---------------------------------------------------------------------------
// Worker side
// ---------------------------------------------------------------------------

fn run_job(job: TileJob, kernel: &dyn TileKernel, active_epoch: &AtomicU64) -> WorkerReply {
    let is_current = || active_epoch.load(Ordering::Acquire) == job.epoch;
    if !is_current() {
        return WorkerReply::Abandoned(job);
    }

    let result = panic::catch_unwind(AssertUnwindSafe(|| kernel.render(&job, &is_current)));
    match result {
        Ok(Ok(Some(pixels))) => {
            let expected = job.tile.pixel_count() * 4;
            if pixels.len() != expected {
                return WorkerReply::Finished(TileOutcome::Failed(TileFailure {
                    epoch: job.epoch,
                    job,
                    reason: format!(
                        "kernel returned {} bytes for a {}×{} tile, expected {expected}",
                        pixels.len(),
                        job.tile.width,
                        job.tile.height
                    ),
                }));
            }
            WorkerReply::Finished(TileOutcome::Rendered(TileResult {
                epoch: job.epoch,
                tile: job.tile,
                pixels,
            }))
        }
        Ok(Ok(None)) => WorkerReply::Abandoned(job),
        Ok(Err(e)) => WorkerReply::Finished(TileOutcome::Failed(TileFailure {
            epoch: job.epoch,
            job,
            reason: e.to_string(),
        })),
        Err(payload) => WorkerReply::Finished(TileOutcome::Failed(TileFailure {
            epoch: job.epoch,
            job,
            reason: format!("worker panicked: {}", panic_message(payload.as_ref())),
        })),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::atomic::AtomicBool;

    use brotzoom_core::{FractalParams, RasterSize, Viewport};

    use crate::error::RenderError;
    use crate::tile::decompose;

    fn jobs(width: u32, height: u32, max_iterations: u32) -> Vec<TileJob> {
        let raster = RasterSize::new(width, height).unwrap();
        let viewport = Viewport::default_mandelbrot(&raster);
        let tiles = decompose(width, height, 32, 32).unwrap();
        TileJob::for_tiles(
            &tiles,
            viewport,
            &raster,
            FractalParams::new(max_iterations).unwrap(),
        )
    }

    fn collecting() -> (Rc<RefCell<Vec<TileOutcome>>>, impl FnMut(TileOutcome) + 'static) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        (seen, move |outcome| sink.borrow_mut().push(outcome))
    }

    fn sorted_results(outcomes: &[TileOutcome]) -> Vec<TileResult> {
        let mut results: Vec<TileResult> = outcomes
            .iter()
            .filter_map(|o| match o {
                TileOutcome::Rendered(r) => Some(r.clone()),
                TileOutcome::Failed(_) => None,
            })
            .collect();
        results.sort_by_key(|r| (r.tile.y, r.tile.x));
        results
    }

    /// Sleeps before delegating, so batches stay in flight for a while.
    struct SlowKernel {
        inner: EscapeTimeKernel,
        delay: Duration,
    }

    impl TileKernel for SlowKernel {
        fn render(
            &self,
            job: &TileJob,
            keep_going: &dyn Fn() -> bool,
        ) -> crate::Result<Option<Vec<u8>>> {
            std::thread::sleep(self.delay);
            self.inner.render(job, keep_going)
        }
    }

    /// Panics on the top-left tile, renders everything else.
    struct PanicsAtOrigin(EscapeTimeKernel);

    impl TileKernel for PanicsAtOrigin {
        fn render(
            &self,
            job: &TileJob,
            keep_going: &dyn Fn() -> bool,
        ) -> crate::Result<Option<Vec<u8>>> {
            if job.tile.x == 0 && job.tile.y == 0 {
                panic!("kernel blew up");
            }
            self.0.render(job, keep_going)
        }
    }

    /// Returns a single pixel no matter the tile size.
    struct ShortBuffer;

    impl TileKernel for ShortBuffer {
        fn render(
            &self,
            _job: &TileJob,
            _keep_going: &dyn Fn() -> bool,
        ) -> crate::Result<Option<Vec<u8>>> {
            Ok(Some(vec![1u8; 4]))
        }
    }

    /// Fails the first tile it sees, then behaves.
    struct FailsOnce {
        inner: EscapeTimeKernel,
        tripped: AtomicBool,
    }

    impl TileKernel for FailsOnce {
        fn render(
            &self,
            job: &TileJob,
            keep_going: &dyn Fn() -> bool,
        ) -> crate::Result<Option<Vec<u8>>> {
            if !self.tripped.swap(true, Ordering::SeqCst) {
                return Err(RenderError::InvalidJob {
                    reason: "transient".into(),
                });
            }
            self.inner.render(job, keep_going)
        }
    }

    #[test]
    fn batch_completes_with_every_tile() {
        let mut scheduler = TileScheduler::with_palette(Some(3), Palette::default()).unwrap();
        let batch = jobs(100, 70, 64);
        let expected = batch.len();
        let (seen, on_tile) = collecting();

        let handle = scheduler.submit(batch, on_tile);
        let BatchStatus::Complete(summary) = scheduler.wait(handle) else {
            panic!("batch should complete");
        };

        assert_eq!(summary.epoch, handle.epoch());
        assert_eq!(summary.tiles_total, expected);
        assert_eq!(summary.tiles_rendered, expected);
        assert_eq!(summary.tiles_failed, 0);
        assert_eq!(seen.borrow().len(), expected);
        assert!(seen.borrow().iter().all(|o| o.epoch() == handle.epoch()));
        assert_eq!(scheduler.worker_count(), 3);
    }

    #[test]
    fn epochs_increase_per_submit() {
        let mut scheduler = TileScheduler::with_palette(Some(1), Palette::default()).unwrap();
        assert_eq!(scheduler.current_epoch(), 0);
        let a = scheduler.submit(Vec::new(), |_| {});
        let b = scheduler.submit(Vec::new(), |_| {});
        assert!(b.epoch() > a.epoch());
        assert_eq!(scheduler.current_epoch(), b.epoch());
    }

    #[test]
    fn empty_batch_is_complete_immediately() {
        let mut scheduler = TileScheduler::with_palette(Some(1), Palette::default()).unwrap();
        let handle = scheduler.submit(Vec::new(), |_| panic!("no tiles, no callbacks"));
        match scheduler.status(handle) {
            BatchStatus::Complete(summary) => assert_eq!(summary.tiles_total, 0),
            other => panic!("unexpected status {other:?}"),
        }
    }

    #[test]
    fn resubmitting_same_jobs_is_pixel_identical() {
        let mut scheduler = TileScheduler::with_palette(Some(4), Palette::default()).unwrap();
        let batch = jobs(96, 64, 256);

        let (first, on_first) = collecting();
        let h1 = scheduler.submit(batch.clone(), on_first);
        assert!(matches!(scheduler.wait(h1), BatchStatus::Complete(_)));

        let (second, on_second) = collecting();
        let h2 = scheduler.submit(batch, on_second);
        assert!(matches!(scheduler.wait(h2), BatchStatus::Complete(_)));

        let a = sorted_results(&first.borrow());
        let b = sorted_results(&second.borrow());
        assert_eq!(a.len(), b.len());
        for (ra, rb) in a.iter().zip(&b) {
            assert_eq!(ra.tile, rb.tile);
            assert_eq!(ra.pixels, rb.pixels);
        }
    }

    #[test]
    fn superseded_batch_never_reports() {
        let kernel = Arc::new(SlowKernel {
            inner: EscapeTimeKernel::default(),
            delay: Duration::from_millis(20),
        });
        let mut scheduler = TileScheduler::new(Some(2), kernel).unwrap();

        let (seen_a, on_a) = collecting();
        let a = scheduler.submit(jobs(128, 128, 64), on_a);
        let (seen_b, on_b) = collecting();
        let b = scheduler.submit(jobs(64, 64, 64), on_b);

        assert!(matches!(scheduler.wait(b), BatchStatus::Complete(_)));
        assert_eq!(scheduler.wait(a), BatchStatus::Superseded);
        assert_eq!(scheduler.status(a), BatchStatus::Superseded);

        // Let the rest of A drain through the coordinator.
        std::thread::sleep(Duration::from_millis(100));
        scheduler.poll();

        assert!(seen_a.borrow().is_empty(), "stale batch reached its callback");
        assert_eq!(seen_b.borrow().len(), 4);
        assert!(seen_b.borrow().iter().all(|o| o.epoch() == b.epoch()));
        assert_eq!(scheduler.stats().batches_superseded, 1);
    }

    #[test]
    fn panicking_tile_reported_as_failure() {
        let kernel = Arc::new(PanicsAtOrigin(EscapeTimeKernel::default()));
        let mut scheduler = TileScheduler::new(Some(2), kernel).unwrap();
        let batch = jobs(64, 64, 32);
        let (seen, on_tile) = collecting();

        let handle = scheduler.submit(batch, on_tile);
        let BatchStatus::Complete(summary) = scheduler.wait(handle) else {
            panic!("batch should still complete");
        };
        assert_eq!(summary.tiles_failed, 1);
        assert_eq!(summary.tiles_rendered, 3);

        let seen = seen.borrow();
        let failure = seen
            .iter()
            .find_map(|o| match o {
                TileOutcome::Failed(f) => Some(f.clone()),
                TileOutcome::Rendered(_) => None,
            })
            .unwrap();
        assert_eq!((failure.job.tile.x, failure.job.tile.y), (0, 0));
        assert!(failure.reason.contains("kernel blew up"), "{}", failure.reason);
    }

    #[test]
    fn invalid_job_fails_without_blocking_siblings() {
        let mut scheduler = TileScheduler::with_palette(Some(2), Palette::default()).unwrap();
        let mut batch = jobs(64, 32, 32);
        batch[0].max_iterations = 0;
        let (seen, on_tile) = collecting();

        let handle = scheduler.submit(batch, on_tile);
        let BatchStatus::Complete(summary) = scheduler.wait(handle) else {
            panic!("batch should complete");
        };
        assert_eq!(summary.tiles_failed, 1);
        assert_eq!(summary.tiles_rendered, 1);
        assert_eq!(seen.borrow().len(), 2);
        assert_eq!(scheduler.stats().tiles_failed, 1);
    }

    #[test]
    fn retry_recovers_failed_tile() {
        let kernel = Arc::new(FailsOnce {
            inner: EscapeTimeKernel::default(),
            tripped: AtomicBool::new(false),
        });
        let mut scheduler = TileScheduler::new(Some(1), kernel).unwrap();
        let (seen, on_tile) = collecting();

        let handle = scheduler.submit(jobs(64, 64, 32), on_tile);
        let BatchStatus::Complete(summary) = scheduler.wait(handle) else {
            panic!("batch should complete");
        };
        assert_eq!(summary.tiles_failed, 1);

        let failure = seen
            .borrow()
            .iter()
            .find_map(|o| match o {
                TileOutcome::Failed(f) => Some(f.clone()),
                TileOutcome::Rendered(_) => None,
            })
            .unwrap();
        assert!(scheduler.retry(failure));
        assert_eq!(scheduler.status(handle), BatchStatus::Pending);

        let BatchStatus::Complete(summary) = scheduler.wait(handle) else {
            panic!("retried batch should complete");
        };
        assert_eq!(summary.tiles_failed, 0);
        assert_eq!(summary.tiles_rendered, 4);
    }

    #[test]
    fn retry_of_superseded_failure_refused() {
        let mut scheduler = TileScheduler::with_palette(Some(1), Palette::default()).unwrap();
        let mut batch = jobs(32, 32, 32);
        batch[0].max_iterations = 0;
        let (seen, on_tile) = collecting();
        let handle = scheduler.submit(batch, on_tile);
        scheduler.wait(handle);
        let failure = match seen.borrow()[0].clone() {
            TileOutcome::Failed(f) => f,
            TileOutcome::Rendered(_) => panic!("tile should have failed"),
        };

        scheduler.submit(Vec::new(), |_| {});
        assert!(!scheduler.retry(failure));
    }

    #[test]
    fn double_retry_refused() {
        let mut scheduler = TileScheduler::with_palette(Some(2), Palette::default()).unwrap();
        let mut batch = jobs(64, 32, 32);
        batch[0].max_iterations = 0;
        let (seen, on_tile) = collecting();
        let handle = scheduler.submit(batch, on_tile);
        scheduler.wait(handle);

        let mut failure = seen
            .borrow()
            .iter()
            .find_map(|o| match o {
                TileOutcome::Failed(f) => Some(f.clone()),
                TileOutcome::Rendered(_) => None,
            })
            .unwrap();
        failure.job.max_iterations = 32;

        assert!(scheduler.retry(failure.clone()));
        assert!(!scheduler.retry(failure.clone()));

        let BatchStatus::Complete(summary) = scheduler.wait(handle) else {
            panic!("retried batch should complete");
        };
        assert_eq!(summary.tiles_total, 2);
        assert_eq!(summary.tiles_rendered, 2);
        assert_eq!(summary.tiles_failed, 0);
        // Two original outcomes plus one for the retried tile.
        assert_eq!(seen.borrow().len(), 3);

        // Rendered now, so nothing left to retry.
        assert!(!scheduler.retry(failure));
    }

    #[test]
    fn short_kernel_buffer_is_a_tile_failure() {
        let mut scheduler = TileScheduler::new(Some(2), Arc::new(ShortBuffer)).unwrap();
        let raster = RasterSize::new(64, 32).unwrap();
        let buffer = Rc::new(RefCell::new(crate::buffer::RenderBuffer::new(&raster)));
        let failures = Rc::new(RefCell::new(Vec::new()));
        let (sink_buffer, sink_failures) = (Rc::clone(&buffer), Rc::clone(&failures));

        let handle = scheduler.submit(jobs(64, 32, 32), move |outcome| match outcome {
            TileOutcome::Rendered(result) => sink_buffer.borrow_mut().write_result(&result),
            TileOutcome::Failed(failure) => sink_failures.borrow_mut().push(failure),
        });
        let BatchStatus::Complete(summary) = scheduler.wait(handle) else {
            panic!("batch should complete");
        };

        assert_eq!(summary.tiles_failed, 2);
        assert_eq!(summary.tiles_rendered, 0);
        assert!(failures.borrow()[0].reason.contains("expected 4096"));
        assert!(buffer
            .borrow()
            .pixels
            .chunks_exact(4)
            .all(|px| px == crate::buffer::RenderBuffer::BLANK));
    }

    #[test]
    fn wait_timeout_reports_pending() {
        let kernel = Arc::new(SlowKernel {
            inner: EscapeTimeKernel::default(),
            delay: Duration::from_millis(200),
        });
        let mut scheduler = TileScheduler::new(Some(1), kernel).unwrap();
        let handle = scheduler.submit(jobs(32, 32, 16), |_| {});

        assert_eq!(
            scheduler.wait_timeout(handle, Duration::from_millis(1)),
            BatchStatus::Pending
        );
        assert!(matches!(scheduler.wait(handle), BatchStatus::Complete(_)));
    }

    #[test]
    fn panic_message_extraction() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let borrowed: Box<dyn Any + Send> = Box::new("borrowed");
        let other: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(owned.as_ref()), "owned");
        assert_eq!(panic_message(borrowed.as_ref()), "borrowed");
        assert_eq!(panic_message(other.as_ref()), "unknown panic");
    }
}
