//! The chunk task scheduler: a three-priority thread pool plus a per-frame
//! main-thread driver covering chunk generation, lighting, lazy and forced
//! meshing, eviction, and the rate-limited `loadNewChunks`/`clean` kicks.
//!
//! Immediate-priority tasks run on a dedicated single-thread pool so a long
//! Normal-priority backlog can never starve a player-initiated edit; High
//! and Normal share a worker pool, with High drained first whenever both
//! have work.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Select, Sender};

use crate::arrays::BlockArrayBox;
use crate::block::{BlockRegistry, BlockType};
use crate::chunk::Chunk;
use crate::concurrency::WorkSet;
use crate::container::ChunkContainer;
use crate::index::GlobalIndex;
use crate::lighting;
use crate::mesher::{self, MeshedDraw};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Priority {
    Immediate,
    High,
    Normal,
}

/// One unit of pipeline work. Every variant's dedup key is the chunk it
/// targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    GenerateNewChunk(GlobalIndex),
    EraseChunk(GlobalIndex),
    Lighting(GlobalIndex),
    LazyMeshing(GlobalIndex),
    ForceMeshing(GlobalIndex),
}

impl TaskKind {
    pub fn key(&self) -> GlobalIndex {
        match *self {
            TaskKind::GenerateNewChunk(i)
            | TaskKind::EraseChunk(i)
            | TaskKind::Lighting(i)
            | TaskKind::LazyMeshing(i)
            | TaskKind::ForceMeshing(i) => i,
        }
    }

    pub fn priority(&self) -> Priority {
        match self {
            TaskKind::GenerateNewChunk(_) | TaskKind::Lighting(_) | TaskKind::LazyMeshing(_) => Priority::Normal,
            TaskKind::EraseChunk(_) => Priority::High,
            TaskKind::ForceMeshing(_) => Priority::Immediate,
        }
    }
}

/// The result of running a task, handed back to the driver for upload or
/// further scheduling (lighting's cross-chunk notification re-submits
/// `Lighting` tasks for affected neighbours).
#[derive(Debug)]
pub enum TaskOutcome {
    Generated(GlobalIndex),
    Erased(GlobalIndex),
    /// `affected` is the cross-chunk notification list: neighbours whose
    /// boundary lighting changed and which therefore need their own
    /// `Lighting` task resubmitted. The driver owns resubmission so the
    /// worker pool doesn't need a handle back to the `Scheduler`.
    Lit { index: GlobalIndex, affected: Vec<GlobalIndex> },
    Meshed { index: GlobalIndex, immediate: bool, opaque: MeshedDraw, transparent: MeshedDraw },
}

/// Everything a worker thread needs to execute a task, shared across the
/// whole scheduler. `generate` is left abstract (terrain noise is an
/// explicit Non-goal) so callers supply whatever elevation/biome/classifier
/// stack they like.
pub struct PipelineContext {
    pub container: Arc<ChunkContainer>,
    pub registry: Arc<BlockRegistry>,
    pub edge: i32,
    pub max_sunlight: crate::chunk::BlockLight,
    pub generate: Arc<dyn Fn(GlobalIndex) -> BlockArrayBox<BlockType> + Send + Sync>,
}

fn run_task(ctx: &PipelineContext, task: TaskKind) -> Option<TaskOutcome> {
    match task {
        TaskKind::GenerateNewChunk(idx) => {
            if ctx.container.contains(idx) {
                return None;
            }
            let composition = (ctx.generate)(idx);
            let mut chunk = Chunk::new_empty(idx, ctx.edge, ctx.max_sunlight);
            chunk.set_composition(composition, &ctx.registry);
            ctx.container.insert(idx, Arc::new(parking_lot::RwLock::new(chunk)));
            Some(TaskOutcome::Generated(idx))
        }
        TaskKind::EraseChunk(idx) => {
            ctx.container.erase(idx);
            Some(TaskOutcome::Erased(idx))
        }
        TaskKind::Lighting(idx) => {
            let Some(handle) = ctx.container.get(idx) else {
                log::trace!("dropping lighting task for {idx:?}: chunk erased before the task ran");
                return None;
            };
            let (new_lighting, affected) = {
                let guard = handle.read();
                lighting::update_lighting(&ctx.container, &guard, &ctx.registry)
            };
            handle.write().set_lighting(new_lighting);
            Some(TaskOutcome::Lit { index: idx, affected })
        }
        TaskKind::LazyMeshing(idx) | TaskKind::ForceMeshing(idx) => {
            let Some(handle) = ctx.container.get(idx) else {
                log::trace!("dropping mesh task for {idx:?}: chunk erased before the task ran");
                return None;
            };
            let guard = handle.read();
            let (opaque, transparent) = mesher::mesh_chunk(&ctx.container, &guard, &ctx.registry);
            Some(TaskOutcome::Meshed { index: idx, immediate: matches!(task, TaskKind::ForceMeshing(_)), opaque, transparent })
        }
    }
}

/// Owns the worker threads and the submission/result channels. Dropping it
/// signals shutdown and joins every worker (`WorkSet`'s mutex is
/// uncontended here; tasks are coarse-grained).
pub struct Scheduler {
    immediate_tx: Sender<TaskKind>,
    high_tx: Sender<TaskKind>,
    normal_tx: Sender<TaskKind>,
    results_rx: Receiver<TaskOutcome>,
    work_set: WorkSet<GlobalIndex>,
    shutdown: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new(ctx: Arc<PipelineContext>, shared_worker_count: usize) -> Self {
        let (immediate_tx, immediate_rx) = unbounded::<TaskKind>();
        let (high_tx, high_rx) = unbounded::<TaskKind>();
        let (normal_tx, normal_rx) = unbounded::<TaskKind>();
        let (results_tx, results_rx) = unbounded::<TaskOutcome>();
        let shutdown = Arc::new(AtomicBool::new(false));
        let work_set = WorkSet::new();

        let mut workers = Vec::new();

        // Dedicated pool: one thread that only ever drains Immediate, so a
        // busy shared pool can never delay a player-initiated edit.
        {
            let ctx = ctx.clone();
            let rx = immediate_rx;
            let tx = results_tx.clone();
            let shutdown = shutdown.clone();
            let work_set = work_set.clone();
            workers.push(std::thread::spawn(move || immediate_worker_loop(ctx, rx, tx, shutdown, work_set)));
        }

        // Shared pool: High drained ahead of Normal whenever both are ready.
        for _ in 0..shared_worker_count.max(1) {
            let ctx = ctx.clone();
            let high_rx = high_rx.clone();
            let normal_rx = normal_rx.clone();
            let tx = results_tx.clone();
            let shutdown = shutdown.clone();
            let work_set = work_set.clone();
            workers.push(std::thread::spawn(move || shared_worker_loop(ctx, high_rx, normal_rx, tx, shutdown, work_set)));
        }

        Self { immediate_tx, high_tx, normal_tx, results_rx, work_set, shutdown, workers }
    }

    /// Submits a task if its key isn't already queued or running. Returns
    /// `false` if the submission was dropped as a duplicate.
    pub fn submit(&self, task: TaskKind) -> bool {
        if !self.work_set.try_claim(task.key()) {
            return false;
        }
        let sent = match task.priority() {
            Priority::Immediate => self.immediate_tx.send(task),
            Priority::High => self.high_tx.send(task),
            Priority::Normal => self.normal_tx.send(task),
        };
        sent.is_ok()
    }

    pub fn results(&self) -> &Receiver<TaskOutcome> {
        &self.results_rx
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

fn immediate_worker_loop(ctx: Arc<PipelineContext>, rx: Receiver<TaskKind>, tx: Sender<TaskOutcome>, shutdown: Arc<AtomicBool>, work_set: WorkSet<GlobalIndex>) {
    while !shutdown.load(Ordering::Relaxed) {
        match rx.recv_timeout(Duration::from_millis(50)) {
            Ok(task) => {
                if let Some(outcome) = run_task(&ctx, task) {
                    let _ = tx.send(outcome);
                }
                work_set.release(&task.key());
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

fn shared_worker_loop(
    ctx: Arc<PipelineContext>,
    high_rx: Receiver<TaskKind>,
    normal_rx: Receiver<TaskKind>,
    tx: Sender<TaskOutcome>,
    shutdown: Arc<AtomicBool>,
    work_set: WorkSet<GlobalIndex>,
) {
    while !shutdown.load(Ordering::Relaxed) {
        if let Ok(task) = high_rx.try_recv() {
            execute_and_release(&ctx, task, &tx, &work_set);
            continue;
        }

        let mut select = Select::new();
        let high_op = select.recv(&high_rx);
        let normal_op = select.recv(&normal_rx);
        let selected = match select.ready_timeout(Duration::from_millis(50)) {
            Ok(index) => index,
            Err(_) => continue,
        };

        let task = if selected == high_op {
            high_rx.try_recv()
        } else if selected == normal_op {
            normal_rx.try_recv()
        } else {
            continue;
        };
        if let Ok(task) = task {
            execute_and_release(&ctx, task, &tx, &work_set);
        }
    }
}

fn execute_and_release(ctx: &PipelineContext, task: TaskKind, tx: &Sender<TaskOutcome>, work_set: &WorkSet<GlobalIndex>) {
    if let Some(outcome) = run_task(ctx, task) {
        let _ = tx.send(outcome);
    }
    work_set.release(&task.key());
}

/// Per-frame main-thread work: drains ready results and rate-limits the two
/// periodic kicks. Owns no locks; everything it touches is already
/// thread-safe.
pub struct PipelineDriver {
    load_new_chunks_interval: Duration,
    clean_interval: Duration,
    last_load_new_chunks: Instant,
    last_clean: Instant,
    last_origin: Option<GlobalIndex>,
}

impl PipelineDriver {
    pub fn new(now: Instant) -> Self {
        Self {
            load_new_chunks_interval: Duration::from_millis(25),
            clean_interval: Duration::from_millis(50),
            last_load_new_chunks: now,
            last_clean: now,
            last_origin: None,
        }
    }

    /// Drains every outcome currently available without blocking, splitting
    /// immediate-priority mesh results (uploaded first) from everything
    /// else. Bounded by a short blocking wait so an in-flight immediate
    /// force-mesh is given a chance to land this frame.
    pub fn drain_results(&mut self, scheduler: &Scheduler) -> (Vec<TaskOutcome>, Vec<TaskOutcome>) {
        let mut immediate = Vec::new();
        let mut rest = Vec::new();

        if let Ok(first) = scheduler.results().recv_timeout(Duration::from_millis(2)) {
            bucket(first, &mut immediate, &mut rest);
        }
        while let Ok(outcome) = scheduler.results().try_recv() {
            bucket(outcome, &mut immediate, &mut rest);
        }
        (immediate, rest)
    }

    /// Returns `true` if `loadNewChunks` should be kicked off this frame
    /// (at most once per 25ms).
    pub fn should_load_new_chunks(&mut self, now: Instant) -> bool {
        if now.duration_since(self.last_load_new_chunks) >= self.load_new_chunks_interval {
            self.last_load_new_chunks = now;
            true
        } else {
            false
        }
    }

    /// Returns `true` if `clean` should be kicked off this frame (at most
    /// once per 50ms, and only if the origin index changed).
    pub fn should_clean(&mut self, now: Instant, origin: GlobalIndex) -> bool {
        let origin_changed = self.last_origin != Some(origin);
        self.last_origin = Some(origin);
        if origin_changed && now.duration_since(self.last_clean) >= self.clean_interval {
            self.last_clean = now;
            true
        } else {
            false
        }
    }
}

fn bucket(outcome: TaskOutcome, immediate: &mut Vec<TaskOutcome>, rest: &mut Vec<TaskOutcome>) {
    match &outcome {
        TaskOutcome::Meshed { immediate: true, .. } => immediate.push(outcome),
        _ => rest.push(outcome),
    }
}
