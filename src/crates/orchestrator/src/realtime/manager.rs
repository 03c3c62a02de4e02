//! Fan-out of task progress to live observers
//!
//! Each task with at least one observer has exactly one listener. The
//! listener relays bus events to every observer and falls back to polling
//! the store, since a bus event can be missed. When the store shows the task
//! finished it sends one final summary and exits.

use futures::future::join_all;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::error::{WsError, WsResult};
use super::events::{FinalSummary, ObserverMessage, ProgressEvent};
use super::observer::Observer;
use crate::store::TaskStore;
use crate::OrchestratorError;

/// Handle identifying one subscription
pub type ObserverId = Uuid;

/// Timing for listeners and deliveries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionSettings {
    /// How often a listener re-reads the store
    pub poll_interval: Duration,
    /// Longest a single delivery may take before the observer is dropped
    pub send_timeout: Duration,
}

impl Default for SubscriptionSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            send_timeout: Duration::from_secs(2),
        }
    }
}

struct ListenerSlot {
    generation: u64,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct TaskSubscriptions {
    observers: HashMap<ObserverId, Arc<dyn Observer>>,
    /// Observers that have been sent the final summary
    finalized: HashSet<ObserverId>,
    listener: Option<ListenerSlot>,
}

struct Inner {
    store: TaskStore,
    settings: SubscriptionSettings,
    tasks: Mutex<HashMap<String, TaskSubscriptions>>,
    generations: AtomicU64,
}

/// Accepts observers per task and keeps one listener per observed task.
#[derive(Clone)]
pub struct SubscriptionManager {
    inner: Arc<Inner>,
}

impl SubscriptionManager {
    pub fn new(store: TaskStore, settings: SubscriptionSettings) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                settings,
                tasks: Mutex::new(HashMap::new()),
                generations: AtomicU64::new(0),
            }),
        }
    }

    pub fn settings(&self) -> SubscriptionSettings {
        self.inner.settings
    }

    /// Register an observer for a task.
    ///
    /// The observer first receives a snapshot of the task, or a not-found
    /// message. A listener is started if the task has none.
    ///
    /// # Errors
    ///
    /// Fails if the snapshot cannot be delivered; the observer is then not
    /// registered.
    pub async fn subscribe(&self, task_id: &str, observer: Arc<dyn Observer>) -> WsResult<ObserverId> {
        let inner = &self.inner;
        let observer_id = Uuid::new_v4();

        // Open the receiver before reading the snapshot so no write in between is missed
        let rx = inner.store.bus().subscribe(task_id);

        let snapshot = match inner.store.get(task_id).await {
            Ok(record) => ObserverMessage::Snapshot(record.view()),
            Err(OrchestratorError::TaskNotFound(_)) => ObserverMessage::not_found(task_id),
            Err(e) => {
                warn!(task_id, error = %e, "Snapshot read failed");
                ObserverMessage::not_found(task_id)
            }
        };

        if let Err(e) = inner.deliver(observer_id, observer.as_ref(), snapshot).await {
            drop(rx);
            inner.store.bus().release_if_unused(task_id);
            return Err(e);
        }

        let mut tasks = inner.tasks.lock();
        let entry = tasks.entry(task_id.to_string()).or_default();
        entry.observers.insert(observer_id, observer);
        if entry.listener.is_none() {
            let generation = inner.generations.fetch_add(1, Ordering::Relaxed);
            let handle = tokio::spawn(run_listener(
                Arc::clone(inner),
                task_id.to_string(),
                generation,
                rx,
            ));
            entry.listener = Some(ListenerSlot { generation, handle });
            debug!(task_id, generation, "Started listener");
        }
        info!(task_id, observer = %observer_id, observers = entry.observers.len(), "Observer subscribed");
        Ok(observer_id)
    }

    /// Remove an observer. The task's listener stops when its last observer
    /// leaves.
    pub fn unsubscribe(&self, task_id: &str, observer_id: ObserverId) -> bool {
        let (removed, stopped) = {
            let mut tasks = self.inner.tasks.lock();
            let Some(entry) = tasks.get_mut(task_id) else {
                return false;
            };
            let removed = entry.observers.remove(&observer_id).is_some();
            entry.finalized.remove(&observer_id);
            let stopped = if entry.observers.is_empty() {
                let slot = entry.listener.take();
                tasks.remove(task_id);
                slot
            } else {
                None
            };
            (removed, stopped)
        };

        if let Some(slot) = stopped {
            slot.handle.abort();
            debug!(task_id, generation = slot.generation, "Stopped listener, no observers left");
        }
        if removed {
            info!(task_id, observer = %observer_id, "Observer unsubscribed");
        }
        removed
    }

    pub fn observer_count(&self, task_id: &str) -> usize {
        self.inner
            .tasks
            .lock()
            .get(task_id)
            .map_or(0, |entry| entry.observers.len())
    }

    pub fn has_listener(&self, task_id: &str) -> bool {
        self.inner
            .tasks
            .lock()
            .get(task_id)
            .is_some_and(|entry| entry.listener.is_some())
    }

    /// Number of tasks with at least one observer
    pub fn active_tasks(&self) -> usize {
        self.inner.tasks.lock().len()
    }
}

impl Inner {
    async fn deliver(
        &self,
        observer_id: ObserverId,
        observer: &dyn Observer,
        message: ObserverMessage,
    ) -> WsResult<()> {
        match timeout(self.settings.send_timeout, observer.deliver(message)).await {
            Ok(result) => result,
            Err(_) => Err(WsError::Timeout {
                observer_id: observer_id.to_string(),
                timeout_ms: self.settings.send_timeout.as_millis() as u64,
            }),
        }
    }

    /// Send `message` to every observer of the task, dropping any that fail.
    ///
    /// Returns false once the task has no observers left, after clearing the
    /// calling listener's slot.
    async fn broadcast(&self, task_id: &str, generation: u64, message: ObserverMessage) -> bool {
        let targets: Vec<(ObserverId, Arc<dyn Observer>)> = {
            let tasks = self.tasks.lock();
            tasks
                .get(task_id)
                .map(|entry| {
                    entry
                        .observers
                        .iter()
                        .map(|(id, observer)| (*id, Arc::clone(observer)))
                        .collect()
                })
                .unwrap_or_default()
        };

        let failed = self.send_to(task_id, &targets, message).await;
        self.prune(task_id, generation, &failed)
    }

    /// Release the listener's slot and pick the observers still owed a final
    /// summary, in one step.
    ///
    /// An observer arriving after this finds no listener and starts its own,
    /// so it cannot fall between the final broadcast and the slot clearing.
    fn finish(&self, task_id: &str, generation: u64) -> Vec<(ObserverId, Arc<dyn Observer>)> {
        let mut tasks = self.tasks.lock();
        let Some(entry) = tasks.get_mut(task_id) else {
            return Vec::new();
        };
        if entry
            .listener
            .as_ref()
            .is_some_and(|slot| slot.generation == generation)
        {
            entry.listener = None;
        }

        let TaskSubscriptions {
            observers,
            finalized,
            ..
        } = entry;
        observers
            .iter()
            .filter(|(id, _)| finalized.insert(**id))
            .map(|(id, observer)| (*id, Arc::clone(observer)))
            .collect()
    }

    /// Deliver `message` to each target concurrently, returning the ids
    /// whose delivery failed.
    async fn send_to(
        &self,
        task_id: &str,
        targets: &[(ObserverId, Arc<dyn Observer>)],
        message: ObserverMessage,
    ) -> Vec<ObserverId> {
        let results = join_all(targets.iter().map(|(id, observer)| {
            let message = message.clone();
            async move { (*id, self.deliver(*id, observer.as_ref(), message).await) }
        }))
        .await;

        results
            .into_iter()
            .filter_map(|(id, result)| match result {
                Ok(()) => None,
                Err(e) => {
                    warn!(task_id, observer = %id, error = %e, transient = e.is_transient(), "Dropping observer");
                    Some(id)
                }
            })
            .collect()
    }

    /// Drop failed observers. Returns false once none are left.
    fn prune(&self, task_id: &str, generation: u64, failed: &[ObserverId]) -> bool {
        let mut tasks = self.tasks.lock();
        let Some(entry) = tasks.get_mut(task_id) else {
            return false;
        };
        for id in failed {
            entry.observers.remove(id);
            entry.finalized.remove(id);
        }
        if entry.observers.is_empty() {
            if entry
                .listener
                .as_ref()
                .is_some_and(|slot| slot.generation == generation)
            {
                entry.listener = None;
            }
            if entry.listener.is_none() {
                tasks.remove(task_id);
            }
            return false;
        }
        true
    }

    /// Clear the slot of an exiting listener, if it is still the current one.
    fn retire(&self, task_id: &str, generation: u64) {
        let mut tasks = self.tasks.lock();
        if let Some(entry) = tasks.get_mut(task_id) {
            if entry
                .listener
                .as_ref()
                .is_some_and(|slot| slot.generation == generation)
            {
                entry.listener = None;
            }
            if entry.observers.is_empty() && entry.listener.is_none() {
                tasks.remove(task_id);
            }
        }
    }
}

/// Clears the listener slot however the listener ends, abort included.
struct ListenerGuard {
    inner: Arc<Inner>,
    task_id: String,
    generation: u64,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        self.inner.retire(&self.task_id, self.generation);
        self.inner.store.bus().release_if_unused(&self.task_id);
    }
}

async fn run_listener(
    inner: Arc<Inner>,
    task_id: String,
    generation: u64,
    rx: broadcast::Receiver<ProgressEvent>,
) {
    let _guard = ListenerGuard {
        inner: Arc::clone(&inner),
        task_id: task_id.clone(),
        generation,
    };
    listen(&inner, &task_id, generation, rx).await;
    debug!(task_id = %task_id, generation, "Listener finished");
}

enum Wake {
    Event(Result<ProgressEvent, RecvError>),
    Tick,
}

async fn listen(
    inner: &Inner,
    task_id: &str,
    generation: u64,
    mut rx: broadcast::Receiver<ProgressEvent>,
) {
    let poll = inner.settings.poll_interval;
    let mut ticker = interval_at(Instant::now() + poll, poll);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let wake = tokio::select! {
            biased;
            received = rx.recv() => Wake::Event(received),
            _ = ticker.tick() => Wake::Tick,
        };

        let check_store = match wake {
            Wake::Event(Ok(event)) => {
                let terminal = event.is_terminal();
                if !inner
                    .broadcast(task_id, generation, ObserverMessage::Progress(event))
                    .await
                {
                    return;
                }
                terminal
            }
            Wake::Event(Err(RecvError::Lagged(skipped))) => {
                warn!(task_id, skipped, "Listener lagged, checking store");
                true
            }
            Wake::Event(Err(RecvError::Closed)) => {
                rx = inner.store.bus().subscribe(task_id);
                false
            }
            Wake::Tick => true,
        };

        if !check_store {
            continue;
        }

        match inner.store.get(task_id).await {
            Ok(record) if record.status.is_terminal() => {
                // Relay anything still queued before the summary
                loop {
                    match rx.try_recv() {
                        Ok(event) => {
                            if !inner.broadcast(task_id, generation, ObserverMessage::Progress(event)).await {
                                return;
                            }
                        }
                        Err(TryRecvError::Lagged(_)) => continue,
                        Err(_) => break,
                    }
                }
                let summary = FinalSummary::from_record(&record);
                let targets = inner.finish(task_id, generation);
                info!(task_id, status = %summary.status, observers = targets.len(), "Task finished, sending final summary");
                let failed = inner
                    .send_to(task_id, &targets, ObserverMessage::Final(summary))
                    .await;
                inner.prune(task_id, generation, &failed);
                return;
            }
            Ok(_) => {}
            Err(OrchestratorError::TaskNotFound(_)) => {
                debug!(task_id, "Observed task not found, still waiting");
            }
            Err(e) => warn!(task_id, error = %e, "Store poll failed"),
        }
    }
}
