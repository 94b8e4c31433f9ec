//! Mounted notification widgets.
//!
//! A widget owns two delivery paths, the poll loop against an [`AlertSource`]
//! and a listener on the [`EventBus`]. Both feed one [`AlertHandler`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::WidgetConfig;
use crate::notifier::audio::AudioOutput;
use crate::notifier::events::{EventBus, LocalEvent};
use crate::notifier::payload::{Alert, AlertAction, HelpRequestAlert, LiveStreamAlert};
use crate::notifier::permission::{PermissionGate, PermissionState};
use crate::notifier::presenter::Presenter;
use crate::notifier::source::AlertSource;

pub type LiveStreamWidget = NotificationWidget<LiveStreamAlert>;
pub type ExpertHelpWidget = NotificationWidget<HelpRequestAlert>;

const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Collaborators a widget is mounted with. Gate and bus are usually shared by
/// every widget in the session.
#[derive(Clone)]
pub struct WidgetDeps {
    pub source: Option<Arc<dyn AlertSource>>,
    pub bus: EventBus,
    pub gate: Arc<PermissionGate>,
    pub audio: Arc<dyn AudioOutput>,
}

pub struct AlertHandler<A: Alert> {
    presenter: Arc<Presenter<A>>,
    gate: Arc<PermissionGate>,
    audio: Arc<dyn AudioOutput>,
    dismiss_after: Duration,
    mounted: AtomicBool,
}

impl<A: Alert> AlertHandler<A> {
    fn new(
        presenter: Arc<Presenter<A>>,
        gate: Arc<PermissionGate>,
        audio: Arc<dyn AudioOutput>,
        dismiss_after: Duration,
    ) -> Self {
        Self {
            presenter,
            gate,
            audio,
            dismiss_after,
            mounted: AtomicBool::new(true),
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    /// Decode an untyped payload and handle it. Malformed payloads are dropped.
    pub fn handle_value(self: &Arc<Self>, value: serde_json::Value) {
        match A::from_value(value) {
            Some(alert) => self.handle(alert),
            None => tracing::debug!("Dropping malformed {} payload", A::EVENT_NAME),
        }
    }

    pub fn handle(self: &Arc<Self>, alert: A) {
        if !self.is_mounted() {
            tracing::debug!("Widget unmounted, discarding {} {}", A::EVENT_NAME, alert.id());
            return;
        }

        if let Err(e) = self.audio.play(&alert.sound()) {
            tracing::debug!("Alert sound unavailable: {:#}", e);
        }

        let token = self.presenter.show(alert.clone());
        tracing::info!("{}: {}", A::EVENT_NAME, alert.headline());

        if self.gate.current() == PermissionState::Granted {
            if let Some(platform) = self.gate.platform().cloned() {
                let notification = alert.system_notification();
                tokio::spawn(async move {
                    if let Err(e) = platform.show(&notification).await {
                        tracing::warn!("System notification failed: {:#}", e);
                    }
                });
            }
        }

        let presenter = Arc::downgrade(&self.presenter);
        let delay = self.dismiss_after;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(presenter) = presenter.upgrade() {
                presenter.dismiss_if_current(token);
            }
        });
    }
}

pub struct NotificationWidget<A: Alert> {
    handler: Arc<AlertHandler<A>>,
    tasks: Vec<JoinHandle<()>>,
}

impl<A: Alert> NotificationWidget<A> {
    /// Must be called from within a tokio runtime.
    pub fn mount(config: WidgetConfig, deps: WidgetDeps) -> Self {
        let presenter = Arc::new(Presenter::new());
        let handler = Arc::new(AlertHandler::new(
            presenter,
            deps.gate.clone(),
            deps.audio,
            config.dismiss_after,
        ));

        let gate = deps.gate;
        let mut tasks = vec![tokio::spawn(async move {
            gate.resolve().await;
        })];

        if config.enabled {
            // Subscribe before returning so events dispatched right after mount are seen
            let events = deps.bus.subscribe();
            tasks.push(tokio::spawn(listen(events, handler.clone())));

            if let Some(source) = deps.source {
                tasks.push(tokio::spawn(poll(
                    source,
                    config.poll_interval.max(MIN_POLL_INTERVAL),
                    handler.clone(),
                )));
            }
        } else {
            tracing::debug!("{} widget disabled", A::EVENT_NAME);
        }

        Self { handler, tasks }
    }

    pub fn presenter(&self) -> &Arc<Presenter<A>> {
        &self.handler.presenter
    }

    pub fn handler(&self) -> &Arc<AlertHandler<A>> {
        &self.handler
    }

    pub fn dismiss(&self) -> bool {
        self.handler.presenter.dismiss()
    }

    pub fn act(&self) -> Option<AlertAction> {
        self.handler.presenter.act()
    }

    pub fn unmount(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        self.handler.mounted.store(false, Ordering::SeqCst);
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl<A: Alert> Drop for NotificationWidget<A> {
    fn drop(&mut self) {
        self.teardown();
    }
}

async fn listen<A: Alert>(mut rx: broadcast::Receiver<LocalEvent>, handler: Arc<AlertHandler<A>>) {
    loop {
        match rx.recv().await {
            Ok(event) if event.name == A::EVENT_NAME => {
                if let Some(detail) = event.payload() {
                    handler.handle_value(detail.clone());
                }
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!("{} listener lagged, skipped {} events", A::EVENT_NAME, skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
}

async fn poll<A: Alert>(
    source: Arc<dyn AlertSource>,
    period: Duration,
    handler: Arc<AlertHandler<A>>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        // Fetches are not cancelled by later ticks; each one resolves on its own
        let source = source.clone();
        let handler = handler.clone();
        tokio::spawn(async move {
            match source.check().await {
                Ok(Some(value)) => handler.handle_value(value),
                Ok(None) => {}
                Err(e) => tracing::debug!("{} check failed: {:#}", A::EVENT_NAME, e),
            }
        });
    }
}
