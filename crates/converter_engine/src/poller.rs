use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use converter_logging::{conv_debug, conv_info, conv_warn};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{
    CompleteEvent, ConversionService, HostEvent, JobId, PollTarget, ProgressEvent, RemoteStatus,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerSettings {
    pub interval: Duration,
    pub max_consecutive_failures: u32,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(700),
            max_consecutive_failures: 5,
        }
    }
}

/// Receives events produced by pollers.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: HostEvent);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Converted,
    Failed,
    /// Too many consecutive failed polls; a failure was synthesized.
    Exhausted,
    Cancelled,
}

/// Polls one job until it is terminal, gives up, or is cancelled.
///
/// The first poll happens one interval after the call. Polls never overlap: a
/// tick waits for its request before the next tick is taken, so events for the
/// job are emitted in order and `Complete` is always last. A result that
/// arrives after cancellation is dropped.
pub async fn run_poller(
    service: &dyn ConversionService,
    target: &PollTarget,
    settings: PollerSettings,
    sink: &dyn EventSink,
    cancel: &CancellationToken,
) -> PollOutcome {
    let period = settings.interval.max(Duration::from_millis(1));
    let max_failures = settings.max_consecutive_failures.max(1);
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut failures = 0u32;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return PollOutcome::Cancelled,
            _ = ticker.tick() => {}
        }

        let result = service.status(&target.job_id).await;
        if cancel.is_cancelled() {
            conv_debug!("Dropping late status for cancelled job {}", target.job_id);
            return PollOutcome::Cancelled;
        }

        match result {
            Ok(report) => {
                failures = 0;
                sink.emit(HostEvent::Progress(progress_event(
                    target,
                    report.status,
                    report.progress,
                )));
                if report.status.is_terminal() {
                    sink.emit(HostEvent::Complete(complete_event(target, report.status)));
                    conv_info!("Job {} finished: {}", target.job_id, report.status);
                    return if report.status == RemoteStatus::Converted {
                        PollOutcome::Converted
                    } else {
                        PollOutcome::Failed
                    };
                }
            }
            Err(err) => {
                failures += 1;
                conv_warn!(
                    "Status poll for job {} failed ({}/{}): {}",
                    target.job_id,
                    failures,
                    max_failures,
                    err
                );
                if failures >= max_failures {
                    sink.emit(HostEvent::Progress(progress_event(
                        target,
                        RemoteStatus::Failed,
                        0,
                    )));
                    sink.emit(HostEvent::Complete(complete_event(
                        target,
                        RemoteStatus::Failed,
                    )));
                    return PollOutcome::Exhausted;
                }
            }
        }
    }
}

fn progress_event(target: &PollTarget, status: RemoteStatus, progress: u8) -> ProgressEvent {
    ProgressEvent {
        job_id: target.job_id.clone(),
        output_name: target.output_name.clone(),
        input_name: target.input_name.clone(),
        status,
        progress,
    }
}

fn complete_event(target: &PollTarget, status: RemoteStatus) -> CompleteEvent {
    CompleteEvent {
        job_id: target.job_id.clone(),
        output_name: target.output_name.clone(),
        input_name: target.input_name.clone(),
        status,
    }
}

struct PollerEntry {
    generation: u64,
    token: CancellationToken,
    handle: JoinHandle<PollOutcome>,
}

/// Process-scoped set of running pollers, keyed by job id.
pub struct PollerRegistry {
    root: CancellationToken,
    next_generation: AtomicU64,
    entries: Mutex<HashMap<JobId, PollerEntry>>,
}

impl Default for PollerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PollerRegistry {
    pub fn new() -> Self {
        Self {
            root: CancellationToken::new(),
            next_generation: AtomicU64::new(0),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Spawns `task` for `job_id`, replacing (and cancelling) any poller
    /// already registered for it. The task is handed its cancellation token.
    ///
    /// Must be called from within a tokio runtime.
    pub fn register<T, F>(self: &Arc<Self>, job_id: JobId, task: T)
    where
        T: FnOnce(CancellationToken) -> F,
        F: Future<Output = PollOutcome> + Send + 'static,
    {
        let token = self.root.child_token();
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let future = task(token.clone());
        let registry = Arc::downgrade(self);
        let key = job_id.clone();

        // Hold the lock across spawn so the task cannot finish before it is listed.
        let mut entries = self.lock_entries();
        let handle = tokio::spawn(async move {
            let outcome = future.await;
            if let Some(registry) = registry.upgrade() {
                registry.finish(&key, generation);
            }
            outcome
        });
        let entry = PollerEntry {
            generation,
            token,
            handle,
        };
        if let Some(previous) = entries.insert(job_id.clone(), entry) {
            conv_debug!("Replacing running poller for job {}", job_id);
            previous.token.cancel();
        }
    }

    /// Stops every poller. Requests already in flight finish but their
    /// results are ignored. Pollers registered afterwards stop immediately.
    pub fn cancel_all(&self) -> usize {
        let drained = self.drain();
        if !drained.is_empty() {
            conv_info!("Cancelled {} active poller(s)", drained.len());
        }
        drained.len()
    }

    /// Cancels every poller and waits for their tasks to wind down.
    pub async fn shutdown(&self) {
        for handle in self.drain() {
            let _ = handle.await;
        }
    }

    pub fn active_count(&self) -> usize {
        self.lock_entries().len()
    }

    pub fn is_active(&self, job_id: &str) -> bool {
        self.lock_entries().contains_key(job_id)
    }

    fn drain(&self) -> Vec<JoinHandle<PollOutcome>> {
        self.root.cancel();
        self.lock_entries()
            .drain()
            .map(|(_, entry)| {
                entry.token.cancel();
                entry.handle
            })
            .collect()
    }

    fn finish(&self, job_id: &str, generation: u64) {
        let mut entries = self.lock_entries();
        if entries
            .get(job_id)
            .is_some_and(|entry| entry.generation == generation)
        {
            entries.remove(job_id);
        }
    }

    fn lock_entries(&self) -> MutexGuard<'_, HashMap<JobId, PollerEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Starts registered pollers against one service and sink.
#[derive(Clone)]
pub struct StatusPoller {
    service: Arc<dyn ConversionService>,
    sink: Arc<dyn EventSink>,
    settings: PollerSettings,
    registry: Arc<PollerRegistry>,
}

impl StatusPoller {
    pub fn new(
        service: Arc<dyn ConversionService>,
        sink: Arc<dyn EventSink>,
        settings: PollerSettings,
        registry: Arc<PollerRegistry>,
    ) -> Self {
        Self {
            service,
            sink,
            settings,
            registry,
        }
    }

    pub fn start(&self, target: PollTarget) {
        let service = Arc::clone(&self.service);
        let sink = Arc::clone(&self.sink);
        let settings = self.settings;
        conv_debug!("Polling job {} every {:?}", target.job_id, settings.interval);
        self.registry.register(target.job_id.clone(), move |cancel| async move {
            run_poller(service.as_ref(), &target, settings, sink.as_ref(), &cancel).await
        });
    }

    pub fn registry(&self) -> &Arc<PollerRegistry> {
        &self.registry
    }
}
