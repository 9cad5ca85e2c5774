//! Background blinking.
//!
//! A blink task saves the color the session just set, then alternates
//! between restoring it and switching the light off until it is superseded.
//!
//! # Superseding
//!
//! Every task is stamped with a generation. The session bumps the shared
//! generation counter while it holds the device lock, and a task re-checks
//! its generation under that same lock before each write. A superseded task
//! therefore never writes after the session's next color command, even if it
//! was in the middle of a hold when it was superseded.
//!
//! Cancellation is cooperative: a sleeping task notices it is stale at its
//! next write or cycle boundary, at the latest `on + off` later. Tasks are
//! never aborted and the session never waits for them.

use crate::capabilities::DeviceColor;
use crate::error::LightResult;
use crate::transport::{BlinkCycle, SharedDevice};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Handle of a running blink loop.
#[derive(Debug)]
pub struct BlinkTask {
    generation: u64,
    color: DeviceColor,
    cycle: BlinkCycle,
    handle: JoinHandle<()>,
}

impl BlinkTask {
    /// Generation the task was started with.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Color the task blinks.
    pub fn color(&self) -> DeviceColor {
        self.color
    }

    /// Durations the task was started with.
    pub fn cycle(&self) -> BlinkCycle {
        self.cycle
    }

    /// Whether the loop has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Owns the blink generation counter and the current task of one session.
#[derive(Debug, Default)]
pub struct BlinkScheduler {
    generation: Arc<AtomicU64>,
    live: Arc<AtomicUsize>,
    active: Option<BlinkTask>,
}

impl BlinkScheduler {
    /// Create a scheduler with no task.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current generation. Tasks stamped with an older one are stale.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Mark every existing task stale and forget the active one.
    ///
    /// Callers must hold the device lock so no stale write can slip in
    /// between this call and their next command.
    pub fn cancel(&mut self) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(task) = self.active.take() {
            tracing::debug!(
                superseded = task.generation,
                generation,
                "Cancelled blink task"
            );
        }
        generation
    }

    /// Start a new loop for the current generation.
    ///
    /// [`BlinkScheduler::cancel`] must have run first, under the device lock,
    /// together with the command that set `color`.
    pub fn start(
        &mut self,
        device: SharedDevice,
        color: DeviceColor,
        cycle: BlinkCycle,
    ) -> &BlinkTask {
        let generation = self.generation();
        let blink = BlinkLoop {
            device,
            cycle,
            generation,
            current: self.generation.clone(),
        };
        let guard = LiveGuard::enter(self.live.clone());
        let handle = tokio::spawn(async move {
            let _guard = guard;
            if let Err(e) = blink.run().await {
                tracing::warn!(generation, error = %e, "Blink task stopped on device error");
            }
        });

        tracing::debug!(
            generation,
            %color,
            on_ms = cycle.on.as_millis() as u64,
            period_ms = cycle.period().as_millis() as u64,
            "Started blink task"
        );
        self.active.insert(BlinkTask {
            generation,
            color,
            cycle,
            handle,
        })
    }

    /// The task started last, if it has not been cancelled.
    pub fn active(&self) -> Option<&BlinkTask> {
        self.active.as_ref()
    }

    /// Number of loops that have not exited yet, stale ones included.
    pub fn live_tasks(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

/// Counts a loop as live from spawn until it exits.
struct LiveGuard(Arc<AtomicUsize>);

impl LiveGuard {
    fn enter(live: Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::SeqCst);
        Self(live)
    }
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

enum Step {
    Save,
    Resume,
    Off,
}

struct BlinkLoop {
    device: SharedDevice,
    cycle: BlinkCycle,
    generation: u64,
    current: Arc<AtomicU64>,
}

impl BlinkLoop {
    fn is_stale(&self) -> bool {
        self.current.load(Ordering::SeqCst) != self.generation
    }

    /// Issue one command unless the task went stale. Returns `false` when stale.
    async fn write(&self, step: Step) -> LightResult<bool> {
        let mut device = self.device.lock().await;
        if self.is_stale() {
            return Ok(false);
        }
        match step {
            Step::Save => device.save_color().await?,
            Step::Resume => device.resume_color().await?,
            Step::Off => device.set_color(DeviceColor::Off).await?,
        }
        Ok(true)
    }

    async fn run(self) -> LightResult<()> {
        if !self.write(Step::Save).await? {
            return Ok(());
        }
        loop {
            if self.is_stale() {
                break;
            }
            if !self.write(Step::Resume).await? {
                break;
            }
            tokio::time::sleep(self.cycle.on).await;
            if !self.write(Step::Off).await? {
                break;
            }
            tokio::time::sleep(self.cycle.off).await;
        }
        tracing::trace!(generation = self.generation, "Blink loop exited");
        Ok(())
    }
}
