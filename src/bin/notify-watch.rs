//! Terminal front end for the notification widgets.
//!
//! Polls a running server for new live streams and help requests, renders
//! toasts to stdout and accepts manual test triggers on stdin:
//! `live`, `help [low|medium|high]`, `dismiss`, `act`, `quit`.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use livestream_hub::config::WatcherConfig;
use livestream_hub::notifier::audio::{default_output, AudioOutput, WavFileOutput};
use livestream_hub::notifier::events::{test_help_request, test_live_stream, EventBus};
use livestream_hub::notifier::native::CommandPlatform;
use livestream_hub::notifier::payload::{Accent, Alert, Urgency};
use livestream_hub::notifier::permission::PermissionGate;
use livestream_hub::notifier::presenter::ActiveNotification;
use livestream_hub::notifier::source::{AlertSource, HttpAlertSource};
use livestream_hub::notifier::widget::{ExpertHelpWidget, LiveStreamWidget, WidgetDeps};

fn ansi(accent: Accent) -> &'static str {
    match accent {
        Accent::Primary => "\x1b[35m",
        Accent::Blue => "\x1b[34m",
        Accent::Amber => "\x1b[33m",
        Accent::Red => "\x1b[31m",
    }
}

async fn render<A: Alert>(mut rx: watch::Receiver<Option<ActiveNotification<A>>>) {
    while rx.changed().await.is_ok() {
        let current = rx.borrow_and_update().clone();
        match current {
            Some(active) => println!(
                "{}{}\x1b[0m",
                ansi(active.payload.accent()),
                active.payload.headline()
            ),
            None => println!("\x1b[2m({} dismissed)\x1b[0m", A::EVENT_NAME),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "livestream_hub=info,notify_watch=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = WatcherConfig::from_env()?;
    tracing::info!("Watching {}", config.api_base_url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(10))
        .build()?;

    let audio: Arc<dyn AudioOutput> = match config.sound_file.as_deref() {
        Some(path) => Arc::new(WavFileOutput::new(path)),
        None => default_output(),
    };
    let bus = EventBus::new();
    let gate = Arc::new(PermissionGate::new(Arc::new(CommandPlatform)));

    let live_source: Arc<dyn AlertSource> = Arc::new(HttpAlertSource::live_streams(
        client.clone(),
        &config.api_base_url,
    )?);
    let help_source: Arc<dyn AlertSource> = Arc::new(HttpAlertSource::help_requests(
        client,
        &config.api_base_url,
        config.expert_email.as_deref(),
    )?);

    let deps = WidgetDeps {
        source: None,
        bus: bus.clone(),
        gate,
        audio,
    };
    let live = LiveStreamWidget::mount(
        config.live,
        WidgetDeps {
            source: Some(live_source),
            ..deps.clone()
        },
    );
    let help = ExpertHelpWidget::mount(
        config.help,
        WidgetDeps {
            source: Some(help_source),
            ..deps
        },
    );

    let renderers = [
        tokio::spawn(render(live.presenter().subscribe())),
        tokio::spawn(render(help.presenter().subscribe())),
    ];

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => line?,
        };
        // stdin closed
        let Some(line) = line else { break };

        let mut words = line.split_whitespace();
        match words.next() {
            Some("live") => {
                bus.dispatch_alert(&test_live_stream());
            }
            Some("help") => match words.next().unwrap_or("medium").parse::<Urgency>() {
                Ok(urgency) => {
                    bus.dispatch_alert(&test_help_request(urgency));
                }
                Err(e) => eprintln!("{}", e),
            },
            Some("dismiss") => {
                live.dismiss();
                help.dismiss();
            }
            Some("act") => match help.act().or_else(|| live.act()) {
                Some(action) => println!("-> {:?}", action),
                None => println!("nothing to act on"),
            },
            Some("quit") => break,
            Some(other) => eprintln!("unknown command: {}", other),
            None => {}
        }
    }

    live.unmount();
    help.unmount();
    for r in renderers {
        r.abort();
    }

    tracing::info!("Watcher stopped");
    Ok(())
}
