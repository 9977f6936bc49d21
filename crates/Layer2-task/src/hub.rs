//! Notification Hub - per-task status fan-out
//!
//! Each task id owns a channel. A channel keeps one bounded queue per
//! subscriber, so every subscriber reads the full sequence from the point it
//! joined, independently of the others.
//!
//! ## Delivery policy
//!
//! - A full queue makes `publish` wait for space.
//! - A queue whose subscription was dropped is pruned on the next publish.
//! - A queue that stays full for longer than `publish_timeout` is evicted;
//!   its subscription ends without a terminal status.
//! - A new subscriber first receives the latest published status, so it
//!   never starts with a gap. Joining after the terminal status yields that
//!   status once and ends.

use crate::state::TaskStatus;
use crate::task::TaskId;
use futures::future::join_all;
use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;
use taskflow_foundation::HubConfig;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;
use tracing::{debug, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct SubscriberId(u64);

struct Subscriber {
    id: SubscriberId,
    tx: mpsc::Sender<TaskStatus>,
}

#[derive(Default)]
struct Channel {
    /// Most recent published status
    last: Option<TaskStatus>,
    subscribers: Vec<Subscriber>,
}

/// Outcome of a single publish
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Subscribers that received the status
    pub delivered: usize,
    /// Subscribers whose subscription had been dropped
    pub pruned: usize,
    /// Subscribers removed because their queue stayed full
    pub evicted: usize,
}

enum Delivery {
    Delivered,
    Closed,
    Stalled,
}

/// Status fan-out keyed by task id
pub struct NotificationHub {
    capacity: usize,
    publish_timeout: Option<Duration>,
    channels: Mutex<HashMap<TaskId, Channel>>,
    subscriber_counter: AtomicU64,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::with_config(&HubConfig::default())
    }

    pub fn with_config(config: &HubConfig) -> Self {
        Self {
            capacity: config.channel_capacity.max(1),
            publish_timeout: config.publish_timeout(),
            channels: Mutex::new(HashMap::new()),
            subscriber_counter: AtomicU64::new(0),
        }
    }

    /// Create the channel for `task_id` if missing. Returns `true` when it
    /// was created by this call.
    pub fn ensure_channel(&self, task_id: TaskId) -> bool {
        let mut channels = self.channels.lock();
        if channels.contains_key(&task_id) {
            return false;
        }
        channels.insert(task_id, Channel::default());
        trace!(task_id = %task_id, "notification channel created");
        true
    }

    pub fn has_channel(&self, task_id: TaskId) -> bool {
        self.channels.lock().contains_key(&task_id)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.lock().len()
    }

    /// Live subscribers of a task
    pub fn subscriber_count(&self, task_id: TaskId) -> usize {
        self.channels
            .lock()
            .get(&task_id)
            .map(|channel| channel.subscribers.len())
            .unwrap_or(0)
    }

    /// Subscribe to a task's statuses. `None` when the task has no channel.
    pub fn subscribe(&self, task_id: TaskId) -> Option<StatusSubscription> {
        let mut channels = self.channels.lock();
        let channel = channels.get_mut(&task_id)?;

        let (tx, rx) = mpsc::channel(self.capacity);
        if let Some(last) = channel.last {
            let replayed = tx.try_send(last);
            debug_assert!(replayed.is_ok(), "fresh queue has capacity >= 1");
            if last.is_terminal() {
                return Some(StatusSubscription::new(task_id, rx));
            }
        }

        let id = SubscriberId(self.subscriber_counter.fetch_add(1, Ordering::Relaxed));
        channel.subscribers.push(Subscriber { id, tx });
        debug!(
            task_id = %task_id,
            subscribers = channel.subscribers.len(),
            "status subscriber added"
        );

        Some(StatusSubscription::new(task_id, rx))
    }

    /// Deliver `status` to every subscriber of `task_id`.
    ///
    /// Returns `None` when the task has no channel. The lock is released
    /// before any queue is awaited.
    pub async fn publish(&self, task_id: TaskId, status: TaskStatus) -> Option<PublishReport> {
        let targets: Vec<(SubscriberId, mpsc::Sender<TaskStatus>)> = {
            let mut channels = self.channels.lock();
            let channel = channels.get_mut(&task_id)?;
            channel.last = Some(status);

            if status.is_terminal() {
                // nothing follows a terminal status; hand the senders over so
                // the queues close once drained
                channel
                    .subscribers
                    .drain(..)
                    .map(|s| (s.id, s.tx))
                    .collect()
            } else {
                channel
                    .subscribers
                    .iter()
                    .map(|s| (s.id, s.tx.clone()))
                    .collect()
            }
        };

        let outcomes = join_all(
            targets
                .iter()
                .map(|(id, tx)| async move { (*id, self.deliver(tx, status).await) }),
        )
        .await;

        let mut report = PublishReport::default();
        let mut dropped = Vec::new();
        for (id, outcome) in outcomes {
            match outcome {
                Delivery::Delivered => report.delivered += 1,
                Delivery::Closed => {
                    report.pruned += 1;
                    dropped.push(id);
                }
                Delivery::Stalled => {
                    report.evicted += 1;
                    dropped.push(id);
                }
            }
        }

        if report.evicted > 0 {
            warn!(
                task_id = %task_id,
                status = %status,
                evicted = report.evicted,
                "evicted subscribers whose queue stayed full"
            );
        }

        if !dropped.is_empty() && !status.is_terminal() {
            let mut channels = self.channels.lock();
            if let Some(channel) = channels.get_mut(&task_id) {
                channel.subscribers.retain(|s| !dropped.contains(&s.id));
            }
        }

        trace!(
            task_id = %task_id,
            status = %status,
            delivered = report.delivered,
            pruned = report.pruned,
            "status published"
        );

        Some(report)
    }

    async fn deliver(&self, tx: &mpsc::Sender<TaskStatus>, status: TaskStatus) -> Delivery {
        match self.publish_timeout {
            Some(timeout) => match tx.send_timeout(status, timeout).await {
                Ok(()) => Delivery::Delivered,
                Err(SendTimeoutError::Closed(_)) => Delivery::Closed,
                Err(SendTimeoutError::Timeout(_)) => Delivery::Stalled,
            },
            None => match tx.send(status).await {
                Ok(()) => Delivery::Delivered,
                Err(_) => Delivery::Closed,
            },
        }
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// StatusSubscription
// ============================================================================

/// Single-pass stream of one task's statuses.
///
/// Ends right after a terminal status, or early if the hub evicted it.
/// Dropping it releases its queue; the engine is never blocked by it.
pub struct StatusSubscription {
    task_id: TaskId,
    rx: mpsc::Receiver<TaskStatus>,
    terminal: Option<TaskStatus>,
    finished: bool,
}

impl StatusSubscription {
    fn new(task_id: TaskId, rx: mpsc::Receiver<TaskStatus>) -> Self {
        Self {
            task_id,
            rx,
            terminal: None,
            finished: false,
        }
    }

    /// Next status, or `None` once the stream has ended
    pub async fn recv(&mut self) -> Option<TaskStatus> {
        self.next().await
    }

    /// Terminal status, once it has been yielded
    pub fn terminal(&self) -> Option<TaskStatus> {
        self.terminal
    }

    /// Drain the remaining statuses
    pub async fn collect_all(self) -> Vec<TaskStatus> {
        self.collect().await
    }
}

impl Stream for StatusSubscription {
    type Item = TaskStatus;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<TaskStatus>> {
        if self.finished {
            return Poll::Ready(None);
        }

        match self.rx.poll_recv(cx) {
            Poll::Ready(Some(status)) => {
                if status.is_terminal() {
                    self.finished = true;
                    self.terminal = Some(status);
                    self.rx.close();
                }
                Poll::Ready(Some(status))
            }
            Poll::Ready(None) => {
                self.finished = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl std::fmt::Debug for StatusSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusSubscription")
            .field("task_id", &self.task_id)
            .field("terminal", &self.terminal)
            .field("finished", &self.finished)
            .finish()
    }
}
