//! Single-slot toast state with last-write-wins replacement.
//!
//! Each `show` issues a fresh token. Deferred dismissals carry the token they
//! were scheduled for and are ignored once a newer toast has taken the slot.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;
use tokio::time::Instant;

use crate::notifier::payload::{Alert, AlertAction};

#[derive(Debug, Clone)]
pub struct ActiveNotification<A> {
    pub token: u64,
    pub payload: A,
    pub shown_at: Instant,
}

pub struct Presenter<A> {
    tx: watch::Sender<Option<ActiveNotification<A>>>,
    next_token: AtomicU64,
}

impl<A: Alert> Default for Presenter<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Alert> Presenter<A> {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            tx,
            next_token: AtomicU64::new(0),
        }
    }

    /// Display `payload`, replacing whatever is showing. Returns its token.
    pub fn show(&self, payload: A) -> u64 {
        let mut token = 0;
        self.tx.send_modify(|slot| {
            // Allocated under the channel lock so tokens match slot order
            token = self.next_token.fetch_add(1, Ordering::SeqCst) + 1;
            *slot = Some(ActiveNotification {
                token,
                payload,
                shown_at: Instant::now(),
            });
        });
        token
    }

    /// Manual dismiss. Returns whether something was showing.
    pub fn dismiss(&self) -> bool {
        self.tx.send_if_modified(|slot| slot.take().is_some())
    }

    /// Clear the slot only if `token` still owns it.
    pub fn dismiss_if_current(&self, token: u64) -> bool {
        self.tx.send_if_modified(|slot| {
            if slot.as_ref().map(|a| a.token) == Some(token) {
                *slot = None;
                true
            } else {
                false
            }
        })
    }

    /// "Act on this": returns the toast's action and closes it.
    pub fn act(&self) -> Option<AlertAction> {
        let mut action = None;
        self.tx.send_if_modified(|slot| match slot.take() {
            Some(active) => {
                action = Some(active.payload.action());
                true
            }
            None => false,
        });
        action
    }

    pub fn current(&self) -> Option<ActiveNotification<A>> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<ActiveNotification<A>>> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::payload::LiveStreamAlert;

    fn alert(id: &str) -> LiveStreamAlert {
        LiveStreamAlert {
            id: id.into(),
            title: format!("Stream {}", id),
            user_id: None,
            created_at: None,
        }
    }

    #[tokio::test]
    async fn newer_toast_replaces_older() {
        let presenter = Presenter::new();
        let a = presenter.show(alert("a"));
        let b = presenter.show(alert("b"));
        assert!(b > a);

        assert!(!presenter.dismiss_if_current(a));
        assert_eq!(presenter.current().unwrap().payload.id, "b");

        assert!(presenter.dismiss_if_current(b));
        assert!(presenter.current().is_none());
    }

    #[tokio::test]
    async fn act_returns_action_and_clears() {
        let presenter = Presenter::new();
        assert_eq!(presenter.act(), None);

        presenter.show(alert("s1"));
        assert_eq!(
            presenter.act(),
            Some(AlertAction::OpenStream {
                path: "/stream/s1".into()
            })
        );
        assert!(presenter.current().is_none());
        assert!(!presenter.dismiss());
    }

    #[tokio::test]
    async fn subscribers_observe_changes() {
        let presenter = Presenter::new();
        let mut rx = presenter.subscribe();

        presenter.show(alert("a"));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().as_ref().unwrap().payload.id, "a");

        presenter.dismiss();
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_none());
    }
}
