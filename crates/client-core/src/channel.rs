//! Single-consumer notification delivery bound to a host lifecycle.
//!
//! Publishers enqueue without waiting. A consumer drains the queue only while its
//! host is foregrounded, one event at a time, holding a drain lock so stale or
//! duplicate consumers never present concurrently. An event leaves the queue only
//! after it was shown and hidden, so an interrupted display resumes at that event.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tokio::{
    sync::{Notify, watch},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::{
    error::{ClientError, RenderError},
    lifecycle::LifecycleSignal,
    state_machine::{DrainState, DrainStateMachine},
    types::NotificationEvent,
};

pub const DEFAULT_DISPLAY: Duration = Duration::from_millis(3_000);
pub const DEFAULT_GAP: Duration = Duration::from_millis(500);
pub const DEFAULT_CAPACITY: usize = 64;

/// How long each event stays on screen and the pause before the next one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationTiming {
    pub display: Duration,
    pub gap: Duration,
}

impl Default for NotificationTiming {
    fn default() -> Self {
        Self {
            display: DEFAULT_DISPLAY,
            gap: DEFAULT_GAP,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Maximum queued events; `None` is unbounded.
    pub capacity: Option<usize>,
    pub timing: NotificationTiming,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            capacity: Some(DEFAULT_CAPACITY),
            timing: NotificationTiming::default(),
        }
    }
}

/// Host-side renderer for notifications.
pub trait NotificationPresenter: Send + Sync + 'static {
    fn show(&self, event: &NotificationEvent) -> Result<(), RenderError>;

    fn hide(&self) -> Result<(), RenderError>;
}

impl<P: NotificationPresenter + ?Sized> NotificationPresenter for Arc<P> {
    fn show(&self, event: &NotificationEvent) -> Result<(), RenderError> {
        (**self).show(event)
    }

    fn hide(&self) -> Result<(), RenderError> {
        (**self).hide()
    }
}

#[derive(Debug, Clone)]
struct Queued {
    seq: u64,
    event: NotificationEvent,
}

#[derive(Debug, Default)]
struct QueueState {
    events: VecDeque<Queued>,
    next_seq: u64,
    on_display: Option<u64>,
    closed: bool,
}

#[derive(Debug)]
struct ChannelInner {
    queue: Mutex<QueueState>,
    wake: Notify,
    drain_lock: tokio::sync::Mutex<()>,
    closed: CancellationToken,
    config: ChannelConfig,
}

/// Shared notification queue. Cloning yields another handle to the same queue.
#[derive(Debug, Clone)]
pub struct NotificationChannel {
    inner: Arc<ChannelInner>,
}

impl Default for NotificationChannel {
    fn default() -> Self {
        Self::new(ChannelConfig::default())
    }
}

impl NotificationChannel {
    pub fn new(config: ChannelConfig) -> Self {
        let config = ChannelConfig {
            capacity: config.capacity.map(|capacity| capacity.max(1)),
            ..config
        };
        Self {
            inner: Arc::new(ChannelInner {
                queue: Mutex::new(QueueState::default()),
                wake: Notify::new(),
                drain_lock: tokio::sync::Mutex::new(()),
                closed: CancellationToken::new(),
                config,
            }),
        }
    }

    pub fn config(&self) -> ChannelConfig {
        self.inner.config
    }

    /// Enqueue an event. Never waits on a draining consumer.
    ///
    /// When the queue is full the oldest event not currently on screen is dropped.
    pub fn publish(&self, event: NotificationEvent) -> Result<(), ClientError> {
        {
            let mut queue = self.inner.lock_queue();
            if queue.closed {
                return Err(ClientError::ChannelClosed);
            }

            if let Some(capacity) = self.inner.config.capacity
                && queue.events.len() >= capacity
            {
                let on_display = queue.on_display;
                if let Some(idx) = queue.events.iter().position(|q| Some(q.seq) != on_display)
                    && let Some(evicted) = queue.events.remove(idx)
                {
                    warn!(
                        capacity,
                        title = %evicted.event.title,
                        "notification queue full; dropped oldest event"
                    );
                }
            }

            let seq = queue.next_seq;
            queue.next_seq += 1;
            trace!(seq, title = %event.title, "queued notification");
            queue.events.push_back(Queued { seq, event });
        }

        self.inner.wake.notify_one();
        Ok(())
    }

    /// Number of events waiting, including one currently on screen.
    pub fn pending(&self) -> usize {
        self.inner.lock_queue().events.len()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock_queue().closed
    }

    /// Tear the channel down. Queued events are discarded and further publishes
    /// fail. Idle or backgrounded consumers exit at once; a draining consumer
    /// exits after its current display or gap step.
    pub fn close(&self) {
        let discarded = {
            let mut queue = self.inner.lock_queue();
            queue.closed = true;
            let discarded = queue.events.len();
            queue.events.clear();
            discarded
        };
        debug!(discarded, "notification channel closed");
        self.inner.closed.cancel();
        self.inner.wake.notify_one();
    }

    /// Spawn a consumer that drains while `lifecycle` reports the foreground.
    pub fn attach_consumer<P>(&self, lifecycle: LifecycleSignal, presenter: P) -> NotificationConsumer
    where
        P: NotificationPresenter,
    {
        let stop = CancellationToken::new();
        let stop_child = stop.child_token();
        let (state_tx, state_rx) = watch::channel(DrainState::Idle);
        let inner = Arc::clone(&self.inner);

        let task = tokio::spawn(async move {
            inner
                .run_consumer(lifecycle, presenter, state_tx, stop_child)
                .await;
        });

        NotificationConsumer {
            stop,
            task,
            state: state_rx,
        }
    }
}

enum Interrupt {
    Stopped,
    Backgrounded,
    Detached,
    Finished(Result<(), ClientError>),
}

impl ChannelInner {
    fn lock_queue(&self) -> MutexGuard<'_, QueueState> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn run_consumer<P: NotificationPresenter>(
        &self,
        mut lifecycle: LifecycleSignal,
        presenter: P,
        state_tx: watch::Sender<DrainState>,
        stop: CancellationToken,
    ) {
        let mut machine = DrainStateMachine::default();

        loop {
            let foregrounded = tokio::select! {
                _ = stop.cancelled() => false,
                _ = self.closed.cancelled() => false,
                foregrounded = lifecycle.wait_foreground() => foregrounded,
            };
            if !foregrounded {
                break;
            }
            debug!("host entered foreground; draining notifications");

            let interrupt = tokio::select! {
                biased;
                _ = stop.cancelled() => Interrupt::Stopped,
                attached = lifecycle.wait_background() => {
                    if attached { Interrupt::Backgrounded } else { Interrupt::Detached }
                }
                result = self.drain(&presenter, &mut machine, &state_tx) => Interrupt::Finished(result),
            };

            state_tx.send_replace(machine.on_background());
            match interrupt {
                Interrupt::Backgrounded => debug!("host left foreground; drain suspended"),
                Interrupt::Stopped | Interrupt::Detached | Interrupt::Finished(Ok(())) => break,
                Interrupt::Finished(Err(err)) => {
                    error!(error = %err, "notification drain loop failed");
                    break;
                }
            }
        }

        debug!("notification consumer finished");
    }

    /// Drain until the channel closes. Cancelling drops the lock and leaves the
    /// head event queued.
    async fn drain<P: NotificationPresenter>(
        &self,
        presenter: &P,
        machine: &mut DrainStateMachine,
        state_tx: &watch::Sender<DrainState>,
    ) -> Result<(), ClientError> {
        let _drain = self.drain_lock.lock().await;
        trace!("drain lock acquired");
        let timing = self.config.timing;

        while let Some(display) = self.claim_next(machine, state_tx).await? {
            state_tx.send_replace(machine.begin_drain()?);
            state_tx.send_replace(machine.display()?);
            let head = &display.event;

            if let Err(err) = presenter.show(head) {
                warn!(error = %err, title = %head.title, "failed rendering notification; dropping it");
                display.complete();
                state_tx.send_replace(machine.render_failed()?);
                continue;
            }
            info!(title = %head.title, "displaying notification");
            tokio::time::sleep(timing.display).await;

            if let Err(err) = presenter.hide() {
                warn!(error = %err, "failed hiding notification");
            }
            display.complete();

            state_tx.send_replace(machine.start_gap()?);
            tokio::time::sleep(timing.gap).await;
            state_tx.send_replace(machine.finish_gap()?);
        }

        Ok(())
    }

    /// Mark the queue head as on display without removing it; `None` once closed.
    ///
    /// The head is marked under the same lock it is read with, so a concurrent
    /// publish into a full queue can never evict it.
    async fn claim_next(
        &self,
        machine: &mut DrainStateMachine,
        state_tx: &watch::Sender<DrainState>,
    ) -> Result<Option<DisplayGuard<'_>>, ClientError> {
        loop {
            {
                let mut queue = self.lock_queue();
                if queue.closed {
                    return Ok(None);
                }
                if let Some(head) = queue.events.front().cloned() {
                    queue.on_display = Some(head.seq);
                    return Ok(Some(DisplayGuard {
                        inner: self,
                        seq: head.seq,
                        event: head.event,
                    }));
                }
            }

            if machine.state() != DrainState::Idle {
                state_tx.send_replace(machine.queue_empty()?);
            }
            self.wake.notified().await;
        }
    }
}

/// Claimed queue head. Dropping without `complete` leaves it queued.
struct DisplayGuard<'a> {
    inner: &'a ChannelInner,
    seq: u64,
    event: NotificationEvent,
}

impl DisplayGuard<'_> {
    /// Remove the displayed event from the queue.
    fn complete(self) {
        let mut queue = self.inner.lock_queue();
        if let Some(idx) = queue.events.iter().position(|q| q.seq == self.seq) {
            queue.events.remove(idx);
        }
    }
}

impl Drop for DisplayGuard<'_> {
    fn drop(&mut self) {
        let mut queue = self.inner.lock_queue();
        if queue.on_display == Some(self.seq) {
            queue.on_display = None;
        }
    }
}

/// Handle to a spawned consumer.
///
/// Dropping the handle detaches it; the consumer then ends when its lifecycle
/// controller is dropped or the channel closes.
#[derive(Debug)]
pub struct NotificationConsumer {
    stop: CancellationToken,
    task: JoinHandle<()>,
    state: watch::Receiver<DrainState>,
}

impl NotificationConsumer {
    pub fn state(&self) -> DrainState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<DrainState> {
        self.state.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel the consumer and wait for it to exit.
    pub async fn stop(self) {
        self.stop.cancel();
        if let Err(err) = self.task.await {
            warn!(error = %err, "notification consumer task failed");
        }
    }
}
