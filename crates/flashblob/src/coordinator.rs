//! Frame-pair coordination and the detection worker.
//!
//! The camera side calls [`ProcessingCoordinator::update`] for every frame it
//! captures. Each flash state has a single slot holding the latest frame;
//! a newer frame evicts the older one. A dedicated worker thread waits until
//! both slots are filled, takes the pair under an exclusive processing flag,
//! runs the configured extractor and hands the result to the sink.
//!
//! `update` never blocks. While the worker holds the processing flag (or the
//! slot is momentarily locked) the incoming frame is recycled on the spot and
//! [`UpdateOutcome::Busy`] is returned.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, TryLockError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use flashblob_core::{DiffMask, DiffThreshold, RgbImageView};
use flashblob_extract::Region;
use serde::Serialize;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::config::{ConfigError, ProcessingConfig};
use crate::extractor::{Detections, Extractor};

/// A camera frame owned by the coordinator until it is recycled.
pub trait Frame: Send + 'static {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    /// Interleaved RGB pixels.
    fn view(&self) -> RgbImageView<'_>;
    /// Return the frame to its producer. Called exactly once per frame
    /// passed to `update`, whether it was processed or dropped.
    fn recycle(self);
}

/// Receives the result of every completed cycle.
pub trait DetectionSink: Send + 'static {
    fn deliver(&mut self, detections: Detections);
}

impl<F> DetectionSink for F
where
    F: FnMut(Detections) + Send + 'static,
{
    fn deliver(&mut self, detections: Detections) {
        self(detections)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Flash {
    On,
    Off,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Stored; visible to the next cycle.
    Accepted,
    /// Rejected because a cycle is running. The frame was recycled.
    Busy,
    /// Rejected because processing is disabled. The frame was recycled.
    Disabled,
}

impl UpdateOutcome {
    pub fn is_accepted(self) -> bool {
        self == UpdateOutcome::Accepted
    }
}

#[derive(thiserror::Error, Debug)]
pub enum CoordinatorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to spawn detection worker: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("detection worker panicked")]
    WorkerPanicked,
}

/// Snapshot of the coordinator counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CoordinatorStats {
    /// Completed detection cycles.
    pub cycles: u64,
    /// Frames stored by `update`.
    pub accepted: u64,
    /// Frames rejected while the worker was busy.
    pub dropped_busy: u64,
    /// Frames rejected while processing was disabled.
    pub dropped_disabled: u64,
}

#[derive(Default)]
struct Counters {
    cycles: AtomicU64,
    accepted: AtomicU64,
    dropped_busy: AtomicU64,
    dropped_disabled: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CoordinatorStats {
        CoordinatorStats {
            cycles: self.cycles.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
            dropped_busy: self.dropped_busy.load(Ordering::Relaxed),
            dropped_disabled: self.dropped_disabled.load(Ordering::Relaxed),
        }
    }
}

/// Single-frame mailbox for one flash state.
pub(crate) struct FrameSlot<F> {
    inner: Mutex<Option<F>>,
}

impl<F: Frame> FrameSlot<F> {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(None),
        }
    }

    /// Store `frame` without blocking and return the evicted one. A
    /// contended slot hands `frame` back as the error.
    pub(crate) fn replace(&self, frame: F) -> Result<Option<F>, F> {
        let mut guard = match self.inner.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return Err(frame),
        };
        Ok(guard.replace(frame))
    }

    pub(crate) fn take(&self) -> Option<F> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Put a frame back unless a newer one arrived meanwhile.
    pub(crate) fn restore(&self, frame: F) {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.is_none() {
            *guard = Some(frame);
        } else {
            frame.recycle();
        }
    }

    pub(crate) fn is_filled(&self) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn drain(&self) {
        if let Some(frame) = self.take() {
            frame.recycle();
        }
    }
}

struct Shared<F> {
    on: FrameSlot<F>,
    off: FrameSlot<F>,
    processing: AtomicBool,
    enabled: AtomicBool,
    shutdown: AtomicBool,
    counters: Counters,
}

impl<F: Frame> Shared<F> {
    fn slot(&self, flash: Flash) -> &FrameSlot<F> {
        match flash {
            Flash::On => &self.on,
            Flash::Off => &self.off,
        }
    }

    fn acquire(&self) -> ProcessingGuard<'_> {
        if self
            .processing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            panic!("processing flag acquired twice");
        }
        ProcessingGuard(&self.processing)
    }
}

/// Holds the processing flag; clears it on drop, unwinding included.
struct ProcessingGuard<'a>(&'a AtomicBool);

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Per-cycle settings the worker needs besides the extractor.
struct CycleSettings {
    width: usize,
    height: usize,
    region: Region,
    threshold: DiffThreshold,
    normalize: bool,
    max_aspect_ratio: Option<f64>,
    poll_interval: Duration,
}

/// Owns the frame slots and the detection worker.
///
/// Dropping the coordinator stops the worker like [`stop`](Self::stop) but
/// only logs a worker panic.
pub struct ProcessingCoordinator<F: Frame> {
    shared: Arc<Shared<F>>,
    width: usize,
    height: usize,
    join: Option<JoinHandle<()>>,
}

impl<F: Frame> ProcessingCoordinator<F> {
    /// Validate `config` and start the worker thread.
    pub fn spawn<S: DetectionSink>(
        config: &ProcessingConfig,
        sink: S,
    ) -> Result<Self, CoordinatorError> {
        let extractor = config.build_extractor()?;
        let settings = CycleSettings {
            width: config.width,
            height: config.height,
            region: config.region(),
            threshold: config.threshold,
            normalize: config.normalize_output,
            max_aspect_ratio: config.max_aspect_ratio,
            poll_interval: config.poll_interval(),
        };
        let shared = Arc::new(Shared {
            on: FrameSlot::new(),
            off: FrameSlot::new(),
            processing: AtomicBool::new(false),
            enabled: AtomicBool::new(true),
            shutdown: AtomicBool::new(false),
            counters: Counters::default(),
        });
        let worker_shared = Arc::clone(&shared);
        let join = std::thread::Builder::new()
            .name("flashblob-worker".to_string())
            .spawn(move || run_worker(worker_shared, extractor, sink, settings))
            .map_err(CoordinatorError::Spawn)?;

        Ok(Self {
            shared,
            width: config.width,
            height: config.height,
            join: Some(join),
        })
    }

    /// Offer a new frame for one flash state.
    ///
    /// The busy check and the slot store are two separate steps: a frame that
    /// lands just as the worker takes the flag is accepted while the flag is
    /// held. Such a frame either joins the pair being taken or waits in its
    /// slot for the next cycle; it is never processed twice.
    ///
    /// Panics when the frame size differs from the configured size.
    pub fn update(&self, frame: F, flash: Flash) -> UpdateOutcome {
        assert!(
            frame.width() == self.width && frame.height() == self.height,
            "frame is {}x{} but the coordinator expects {}x{}",
            frame.width(),
            frame.height(),
            self.width,
            self.height
        );
        let shared = &self.shared;
        if !shared.enabled.load(Ordering::Acquire) {
            frame.recycle();
            Counters::bump(&shared.counters.dropped_disabled);
            return UpdateOutcome::Disabled;
        }
        if shared.processing.load(Ordering::Acquire) {
            frame.recycle();
            Counters::bump(&shared.counters.dropped_busy);
            log::trace!("worker busy, dropped {flash:?} frame");
            return UpdateOutcome::Busy;
        }
        match shared.slot(flash).replace(frame) {
            Ok(evicted) => {
                if let Some(old) = evicted {
                    old.recycle();
                }
                Counters::bump(&shared.counters.accepted);
                UpdateOutcome::Accepted
            }
            Err(frame) => {
                frame.recycle();
                Counters::bump(&shared.counters.dropped_busy);
                log::trace!("slot contended, dropped {flash:?} frame");
                UpdateOutcome::Busy
            }
        }
    }

    /// Turn processing on or off. Disabling recycles any pending frames; a
    /// cycle already running still completes.
    pub fn set_enabled(&self, enabled: bool) {
        let was = self.shared.enabled.swap(enabled, Ordering::AcqRel);
        if was != enabled {
            log::info!(
                "frame processing {}",
                if enabled { "enabled" } else { "disabled" }
            );
        }
        if !enabled {
            self.shared.on.drain();
            self.shared.off.drain();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.enabled.load(Ordering::Acquire)
    }

    /// Whether the worker currently holds the processing flag.
    pub fn is_processing(&self) -> bool {
        self.shared.processing.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> CoordinatorStats {
        self.shared.counters.snapshot()
    }

    /// Stop the worker after its current cycle and recycle pending frames.
    pub fn stop(mut self) -> Result<(), CoordinatorError> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<(), CoordinatorError> {
        self.shared.shutdown.store(true, Ordering::Release);
        let joined = match self.join.take() {
            Some(join) => join.join().map_err(|_| CoordinatorError::WorkerPanicked),
            None => Ok(()),
        };
        self.shared.on.drain();
        self.shared.off.drain();
        joined
    }
}

impl<F: Frame> Drop for ProcessingCoordinator<F> {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            log::error!("{err}");
        }
    }
}

fn run_worker<F: Frame, S: DetectionSink>(
    shared: Arc<Shared<F>>,
    extractor: Extractor,
    mut sink: S,
    settings: CycleSettings,
) {
    log::info!(
        "detection worker started ({}x{}, {})",
        settings.width,
        settings.height,
        extractor_name(&extractor)
    );
    while !shared.shutdown.load(Ordering::Acquire) {
        if !shared.enabled.load(Ordering::Acquire)
            || !shared.on.is_filled()
            || !shared.off.is_filled()
        {
            std::thread::sleep(settings.poll_interval);
            continue;
        }

        let _processing = shared.acquire();
        match (shared.on.take(), shared.off.take()) {
            (Some(on), Some(off)) => {
                let cycle = shared.counters.cycles.load(Ordering::Relaxed) + 1;
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    run_cycle(&extractor, &settings, &on, &off, cycle)
                }));
                // Detections own their data; the frames go back before delivery.
                on.recycle();
                off.recycle();
                let detections = result.unwrap_or_else(|payload| panic::resume_unwind(payload));
                Counters::bump(&shared.counters.cycles);
                sink.deliver(detections);
            }
            (on, off) => {
                // A slot was drained between the check and the take.
                if let Some(frame) = on {
                    shared.on.restore(frame);
                }
                if let Some(frame) = off {
                    shared.off.restore(frame);
                }
            }
        }
    }
    log::info!("detection worker stopped");
}

#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(extractor, settings, on, off), fields(width = settings.width, height = settings.height))
)]
fn run_cycle<F: Frame>(
    extractor: &Extractor,
    settings: &CycleSettings,
    on: &F,
    off: &F,
    cycle: u64,
) -> Detections {
    let started = Instant::now();
    let mask = DiffMask::new(on.view(), off.view(), settings.threshold);
    let mut detections = extractor.run(&mask, settings.region);
    if let Some(r) = settings.max_aspect_ratio {
        detections.retain_aspect(r);
    }
    if settings.normalize {
        detections = detections.normalized(settings.width, settings.height);
    }
    log::debug!(
        "cycle {cycle}: {} detections in {:.2?}",
        detections.len(),
        started.elapsed()
    );
    detections
}

fn extractor_name(extractor: &Extractor) -> &'static str {
    match extractor {
        Extractor::BoundingBox(_) => "bounding_box",
        Extractor::ContourTrace(_) => "contour_trace",
    }
}
