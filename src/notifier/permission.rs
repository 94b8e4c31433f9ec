//! One-time permission handshake for OS-level notifications.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;

use crate::notifier::payload::SystemNotification;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    /// The user has not decided yet.
    Default,
    Granted,
    Denied,
}

/// Host facility able to show OS notifications.
#[async_trait]
pub trait NotificationPlatform: Send + Sync + 'static {
    /// Current decision, without prompting.
    fn permission(&self) -> PermissionState;

    /// Ask the user. Called at most once per [`PermissionGate`].
    async fn request_permission(&self) -> PermissionState;

    async fn show(&self, notification: &SystemNotification) -> anyhow::Result<()>;
}

/// Records the permission outcome for a session. Shared by every widget so the
/// user is prompted at most once.
pub struct PermissionGate {
    platform: Option<Arc<dyn NotificationPlatform>>,
    resolved: OnceCell<PermissionState>,
}

impl PermissionGate {
    pub fn new(platform: Arc<dyn NotificationPlatform>) -> Self {
        Self {
            platform: Some(platform),
            resolved: OnceCell::new(),
        }
    }

    /// No notification facility on this host; resolves to `Denied`.
    pub fn unsupported() -> Self {
        Self {
            platform: None,
            resolved: OnceCell::new(),
        }
    }

    /// Read the platform state, prompting only if it is still undecided.
    /// Later and concurrent calls reuse the first outcome.
    pub async fn resolve(&self) -> PermissionState {
        *self
            .resolved
            .get_or_init(|| async {
                let Some(platform) = self.platform.as_ref() else {
                    tracing::debug!("System notifications unsupported on this host");
                    return PermissionState::Denied;
                };
                match platform.permission() {
                    PermissionState::Default => {
                        let outcome = platform.request_permission().await;
                        tracing::info!("Notification permission request answered: {:?}", outcome);
                        outcome
                    }
                    decided => decided,
                }
            })
            .await
    }

    /// Recorded outcome, or `Default` while unresolved.
    pub fn current(&self) -> PermissionState {
        self.resolved
            .get()
            .copied()
            .unwrap_or(PermissionState::Default)
    }

    pub fn platform(&self) -> Option<&Arc<dyn NotificationPlatform>> {
        self.platform.as_ref()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Platform double recording prompts and shown notifications.
    pub(crate) struct FakePlatform {
        pub initial: PermissionState,
        pub answer: PermissionState,
        pub prompts: AtomicUsize,
        pub shown: Mutex<Vec<SystemNotification>>,
    }

    impl FakePlatform {
        pub(crate) fn new(initial: PermissionState, answer: PermissionState) -> Arc<Self> {
            Arc::new(Self {
                initial,
                answer,
                prompts: AtomicUsize::new(0),
                shown: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn shown(&self) -> Vec<SystemNotification> {
            self.shown.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl NotificationPlatform for FakePlatform {
        fn permission(&self) -> PermissionState {
            self.initial
        }

        async fn request_permission(&self) -> PermissionState {
            self.prompts.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.answer
        }

        async fn show(&self, notification: &SystemNotification) -> anyhow::Result<()> {
            self.shown.lock().unwrap().push(notification.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn prompts_at_most_once() {
        let platform = FakePlatform::new(PermissionState::Default, PermissionState::Granted);
        let gate = PermissionGate::new(platform.clone());

        assert_eq!(gate.current(), PermissionState::Default);
        assert_eq!(gate.resolve().await, PermissionState::Granted);
        assert_eq!(gate.resolve().await, PermissionState::Granted);
        assert_eq!(platform.prompts.load(Ordering::SeqCst), 1);
        assert_eq!(gate.current(), PermissionState::Granted);
    }

    #[tokio::test]
    async fn concurrent_resolution_shares_one_prompt() {
        let platform = FakePlatform::new(PermissionState::Default, PermissionState::Denied);
        let gate = Arc::new(PermissionGate::new(platform.clone()));

        let (a, b) = tokio::join!(gate.resolve(), gate.resolve());
        assert_eq!((a, b), (PermissionState::Denied, PermissionState::Denied));
        assert_eq!(platform.prompts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn decided_state_is_read_without_prompting() {
        for decided in [PermissionState::Granted, PermissionState::Denied] {
            let platform = FakePlatform::new(decided, PermissionState::Default);
            let gate = PermissionGate::new(platform.clone());
            assert_eq!(gate.resolve().await, decided);
            assert_eq!(platform.prompts.load(Ordering::SeqCst), 0);
        }
    }

    #[tokio::test]
    async fn unsupported_host_is_denied() {
        let gate = PermissionGate::unsupported();
        assert_eq!(gate.resolve().await, PermissionState::Denied);
        assert!(gate.platform().is_none());
    }
}
