//! Foreground/background signal passed explicitly to lifecycle-bound consumers.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Visibility of the host screen.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Lifecycle {
    /// Screen is hidden or stopped.
    #[default]
    Background,
    /// Screen is visible and may consume notifications.
    Foreground,
}

impl Lifecycle {
    pub fn is_foreground(self) -> bool {
        self == Self::Foreground
    }
}

/// Create a controller/signal pair starting at `initial`.
pub fn lifecycle_channel(initial: Lifecycle) -> (LifecycleController, LifecycleSignal) {
    let (tx, rx) = watch::channel(initial);
    (LifecycleController { tx }, LifecycleSignal { rx })
}

/// Host-side handle that reports lifecycle transitions.
///
/// Dropping the controller ends every consumer bound to its signals.
#[derive(Debug)]
pub struct LifecycleController {
    tx: watch::Sender<Lifecycle>,
}

impl LifecycleController {
    pub fn current(&self) -> Lifecycle {
        *self.tx.borrow()
    }

    pub fn foreground(&self) {
        self.set(Lifecycle::Foreground);
    }

    pub fn background(&self) {
        self.set(Lifecycle::Background);
    }

    /// Report a transition. Repeated reports of the same state are ignored.
    pub fn set(&self, next: Lifecycle) {
        self.tx.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }

    pub fn subscribe(&self) -> LifecycleSignal {
        LifecycleSignal {
            rx: self.tx.subscribe(),
        }
    }
}

/// Consumer-side view of the host lifecycle.
#[derive(Debug, Clone)]
pub struct LifecycleSignal {
    rx: watch::Receiver<Lifecycle>,
}

impl LifecycleSignal {
    pub fn current(&self) -> Lifecycle {
        *self.rx.borrow()
    }

    /// Wait until the host is foregrounded.
    ///
    /// Returns `false` when the controller is gone and the host is not foregrounded.
    pub async fn wait_foreground(&mut self) -> bool {
        self.wait_until(Lifecycle::Foreground).await
    }

    /// Wait until the host leaves the foreground.
    ///
    /// Returns `false` when the controller is gone while still foregrounded.
    pub async fn wait_background(&mut self) -> bool {
        self.wait_until(Lifecycle::Background).await
    }

    async fn wait_until(&mut self, target: Lifecycle) -> bool {
        loop {
            if *self.rx.borrow_and_update() == target {
                return true;
            }
            if self.rx.changed().await.is_err() {
                return false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;

    #[tokio::test]
    async fn signal_observes_transitions() {
        let (controller, mut signal) = lifecycle_channel(Lifecycle::Background);
        assert_eq!(signal.current(), Lifecycle::Background);

        controller.foreground();
        assert!(
            timeout(Duration::from_secs(1), signal.wait_foreground())
                .await
                .expect("foreground wait timeout")
        );

        controller.background();
        assert!(
            timeout(Duration::from_secs(1), signal.wait_background())
                .await
                .expect("background wait timeout")
        );
    }

    #[tokio::test]
    async fn dropped_controller_ends_waits() {
        let (controller, mut signal) = lifecycle_channel(Lifecycle::Foreground);
        drop(controller);

        assert!(!signal.wait_background().await);
        // current state still satisfies the predicate
        assert!(signal.wait_foreground().await);
    }

    #[test]
    fn subscribed_signals_share_state() {
        let (controller, _signal) = lifecycle_channel(Lifecycle::Background);
        let other = controller.subscribe();
        controller.foreground();
        controller.foreground();
        assert_eq!(other.current(), Lifecycle::Foreground);
        assert_eq!(controller.current(), Lifecycle::Foreground);
    }
}
