#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Background chunk generation around a moving player.
//!
//! A [`StreamingLevel`] shares one [`Level`] between the foreground and at
//! most one worker thread per side. Workers clone their reference region
//! under a read lock, optimize without holding any lock and splice the
//! winner under a short write lock. Left workers only ever grow the left end
//! and right workers the right end, so the two never contend for the same
//! columns. Running workers cannot be cancelled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use clockrun_core::{GeneratorConfig, Side};
use clockrun_system_optimizer::{ChunkGenerator, ChunkReport, GenerationError};
use clockrun_world::{query, Level};
use parking_lot::{Mutex, RwLock};
use thiserror::Error;

/// Failures surfaced when collecting background work.
#[derive(Debug, Error)]
pub enum StreamingError {
    /// A worker failed to generate its chunk.
    #[error("background generation on the {side} side failed")]
    Generation {
        /// Side the worker was growing.
        side: &'static str,
        /// Underlying failure.
        #[source]
        source: GenerationError,
    },
    /// A worker thread panicked.
    #[error("background generation on the {side} side panicked")]
    WorkerPanicked {
        /// Side the worker was growing.
        side: &'static str,
    },
    /// The worker thread could not be started.
    #[error("failed to spawn a generation worker")]
    Spawn(#[from] std::io::Error),
}

type Worker = (Side, JoinHandle<Result<Vec<ChunkReport>, GenerationError>>);

/// Level that grows itself in the background as the player approaches an edge.
#[derive(Debug)]
pub struct StreamingLevel {
    level: Arc<RwLock<Level>>,
    generator: Arc<ChunkGenerator>,
    left_busy: Arc<AtomicBool>,
    right_busy: Arc<AtomicBool>,
    workers: Mutex<Vec<Worker>>,
    reaped: Mutex<Vec<ChunkReport>>,
}

impl StreamingLevel {
    /// Wraps an existing level and generator.
    #[must_use]
    pub fn new(level: Level, generator: ChunkGenerator) -> Self {
        Self {
            level: Arc::new(RwLock::new(level)),
            generator: Arc::new(generator),
            left_busy: Arc::new(AtomicBool::new(false)),
            right_busy: Arc::new(AtomicBool::new(false)),
            workers: Mutex::new(Vec::new()),
            reaped: Mutex::new(Vec::new()),
        }
    }

    /// Builds the base level and synchronously pre-generates `chunks` chunks.
    pub fn bootstrap(
        config: GeneratorConfig,
        chunks: u32,
    ) -> Result<(Self, Vec<ChunkReport>), GenerationError> {
        let generator = ChunkGenerator::new(config)?;
        let mut level = Level::new(&config.chunks)?;
        let reports = generator.pregenerate(&mut level, chunks)?;
        Ok((Self::new(level, generator), reports))
    }

    /// Shared handle to the level.
    #[must_use]
    pub fn level(&self) -> Arc<RwLock<Level>> {
        Arc::clone(&self.level)
    }

    /// Generator the workers run.
    #[must_use]
    pub fn generator(&self) -> &ChunkGenerator {
        &self.generator
    }

    /// Runs `read` against the level under a read lock.
    pub fn with_level<R>(&self, read: impl FnOnce(&Level) -> R) -> R {
        read(&self.level.read())
    }

    /// Whether a worker is currently growing `side`.
    #[must_use]
    pub fn is_busy(&self, side: Side) -> bool {
        self.busy_flag(side).load(Ordering::Acquire)
    }

    /// Worker handles not yet collected.
    #[must_use]
    pub fn pending_workers(&self) -> usize {
        self.workers.lock().len()
    }

    /// Starts workers for every edge within the trigger distance of `player_x`.
    ///
    /// Finished workers are collected first; their reports are returned by the
    /// next [`StreamingLevel::join_all`]. Returns the sides a worker was
    /// started for on this call. Never blocks on running workers.
    pub fn poll(&self, player_x: i32) -> Result<Vec<Side>, StreamingError> {
        self.reap_finished()?;
        let trigger = i64::from(self.generator.config().streaming.trigger_distance);
        let (leftmost, rightmost) = self.with_level(|level| {
            (
                query::leftmost_global_x(level),
                query::rightmost_global_x(level),
            )
        });
        let mut started = Vec::new();
        if i64::from(player_x) - i64::from(leftmost) < trigger && self.request(Side::Left)? {
            started.push(Side::Left);
        }
        if i64::from(rightmost) - i64::from(player_x) < trigger && self.request(Side::Right)? {
            started.push(Side::Right);
        }
        Ok(started)
    }

    /// Starts a worker on `side` unless one is already running there.
    ///
    /// Returns whether a worker was started.
    pub fn request(&self, side: Side) -> Result<bool, StreamingError> {
        let busy = Arc::clone(self.busy_flag(side));
        if busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(false);
        }
        let guard = BusyGuard(busy);
        let level = Arc::clone(&self.level);
        let generator = Arc::clone(&self.generator);
        let chunks = generator.config().streaming.chunks_per_request;

        let handle = thread::Builder::new()
            .name(format!("clockrun-{}", side.label()))
            .spawn(move || {
                let _guard = guard;
                grow(&level, &generator, side, chunks)
            })?;
        tracing::debug!(side = side.label(), chunks, "started generation worker");
        self.workers.lock().push((side, handle));
        Ok(true)
    }

    /// Waits for every running worker and returns what was committed since
    /// the previous call.
    pub fn join_all(&self) -> Result<Vec<ChunkReport>, StreamingError> {
        let workers = std::mem::take(&mut *self.workers.lock());
        let mut reports = std::mem::take(&mut *self.reaped.lock());
        for worker in workers {
            reports.extend(collect(worker)?);
        }
        Ok(reports)
    }

    fn reap_finished(&self) -> Result<(), StreamingError> {
        let finished: Vec<Worker> = {
            let mut workers = self.workers.lock();
            let (finished, running): (Vec<Worker>, Vec<Worker>) = std::mem::take(&mut *workers)
                .into_iter()
                .partition(|(_, handle)| handle.is_finished());
            *workers = running;
            finished
        };
        for worker in finished {
            let reports = collect(worker)?;
            self.reaped.lock().extend(reports);
        }
        Ok(())
    }

    fn busy_flag(&self, side: Side) -> &Arc<AtomicBool> {
        match side {
            Side::Left => &self.left_busy,
            Side::Right => &self.right_busy,
        }
    }
}

fn collect((side, handle): Worker) -> Result<Vec<ChunkReport>, StreamingError> {
    let result = handle.join().map_err(|_| StreamingError::WorkerPanicked {
        side: side.label(),
    })?;
    result.map_err(|source| StreamingError::Generation {
        side: side.label(),
        source,
    })
}

/// Clears a side's busy flag when its worker ends, including by panic.
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn grow(
    level: &RwLock<Level>,
    generator: &ChunkGenerator,
    side: Side,
    chunks: u32,
) -> Result<Vec<ChunkReport>, GenerationError> {
    let mut reports = Vec::with_capacity(chunks as usize);
    for _ in 0..chunks {
        let mut ticket = generator.begin_chunk(side);
        let population = generator.prepare_population(&level.read(), &mut ticket)?;
        let outcome = generator.evolve(population, &mut ticket)?;
        let report = generator.commit(&mut level.write(), ticket, outcome)?;
        reports.push(report);
    }
    Ok(reports)
}
