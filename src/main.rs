//! Launcher card demo binary wiring a card controller to a simulated process manager.

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use tokio::time::sleep;
use tracing::{info, trace, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use launcher_card::{
    config::AppConfig,
    dto::{
        card::Card,
        status::{GameActivity, Progress},
    },
    services::{
        bridge::{BackendEndpoint, BackendPublisher, ProcessBridge, ProcessRequest},
        lifecycle::{CardController, CardDeps},
        process::SKIP_VERSION_CHECK_ARG,
        prompt::ConsolePrompt,
    },
    state::status_store::StatusStore,
};

const DEMO_APP: &str = "Sugar";
const STALE_REPORT: &str = "ERROR: Game is out of date";
const TRANSFER_STEPS: u32 = 10;
const TRANSFER_SIZE_MB: u32 = 800;
const STEP_DELAY: Duration = Duration::from_millis(300);
const SESSION_LENGTH: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let store = StatusStore::new(config.status_channel_capacity());
    let (bridge, endpoint) = ProcessBridge::new(store.clone(), config.progress_channel_capacity());
    let publisher = endpoint.publisher();
    let backend = tokio::spawn(run_backend(endpoint));

    let deps = CardDeps {
        store: store.clone(),
        process: Arc::new(bridge.clone()),
        progress: Arc::new(bridge),
        prompt: Arc::new(ConsolePrompt),
        config,
    };

    let mut controller = CardController::mount(demo_card(false), deps);
    info!(view = ?controller.view(), "card mounted");

    // Install the game, logging the card every time the progress moves.
    let mut progress = controller
        .progress_watch()
        .context("card controller has no progress poller")?;
    let install = tokio::spawn(simulate_transfer(
        publisher.clone(),
        GameActivity::Installing,
    ));
    while !install.is_finished() {
        tokio::select! {
            changed = progress.changed() => {
                if changed.is_err() {
                    break;
                }
                info!(
                    badge = ?controller.view().badge,
                    artwork = %controller.view().artwork.css(),
                    "installing"
                );
            }
            _ = sleep(STEP_DELAY) => {}
        }
    }
    install.await.context("install simulation panicked")?;
    publisher.publish_status(DEMO_APP, GameActivity::Done);

    controller.set_card(demo_card(true)).await;
    info!(view = ?controller.view(), "game installed");

    match controller.handle_play_toggle().await {
        Ok(outcome) => info!(?outcome, "play toggle finished"),
        Err(err) => warn!(error = %err, "play toggle rejected"),
    }
    info!(status = ?controller.status(), view = ?controller.view(), "card settled");

    controller.unmount().await;
    backend.abort();

    Ok(())
}

fn demo_card(is_installed: bool) -> Card {
    Card {
        cover: format!("https://cdn.example/{DEMO_APP}/cover.jpg"),
        logo: None,
        title: "Sugar".into(),
        app_name: DEMO_APP.into(),
        is_installed,
    }
}

/// Serve the requests of the card controllers the way an external process manager would.
async fn run_backend(mut endpoint: BackendEndpoint) {
    let publisher = endpoint.publisher();

    while let Some(request) = endpoint.next_request().await {
        match request {
            ProcessRequest::Launch {
                app_name,
                args,
                reply,
            } => {
                tokio::spawn(async move {
                    if !args.iter().any(|arg| arg == SKIP_VERSION_CHECK_ARG) {
                        info!(app_name = %app_name, "refusing stale game");
                        let _ = reply.send(Some(STALE_REPORT.into()));
                        return;
                    }
                    info!(app_name = %app_name, ?args, "game running");
                    sleep(SESSION_LENGTH).await;
                    let _ = reply.send(None);
                });
            }
            ProcessRequest::Terminate { app_name } => {
                info!(app_name = %app_name, "game terminated");
            }
            ProcessRequest::Update { app_name, reply } => {
                let publisher = publisher.clone();
                tokio::spawn(async move {
                    info!(app_name = %app_name, "updating game");
                    simulate_transfer(publisher, GameActivity::Updating).await;
                    let _ = reply.send(());
                });
            }
            ProcessRequest::RequestProgress { app_name } => {
                trace!(app_name = %app_name, "progress requested");
            }
        }
    }
}

/// Report a transfer of the demo game, step by step.
async fn simulate_transfer(publisher: BackendPublisher, activity: GameActivity) {
    if activity == GameActivity::Installing {
        publisher.publish_status(DEMO_APP, activity);
    }

    for step in 1..=TRANSFER_STEPS {
        sleep(STEP_DELAY).await;
        let done = TRANSFER_SIZE_MB * step / TRANSFER_STEPS;
        let percent = f64::from(step) * 100.0 / f64::from(TRANSFER_STEPS);
        publisher.publish_progress(
            DEMO_APP,
            Progress::new(
                format!("{percent:.2}%"),
                format!("{done}/{TRANSFER_SIZE_MB}MB"),
            ),
        );
    }
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,launcher_card=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
