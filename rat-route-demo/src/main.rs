//! Mail client demo for rat-route.
//!
//! Routes between an inbox, a message view and a compose sheet while the
//! lifecycle log panel shows every hook as it fires. Logs go to
//! `rat-route-demo.log`; set `RUST_LOG` to change the filter.

mod app;
mod screens;

use std::sync::Arc;

use rat_route::{FailurePolicy, Registry, RouterSettings};
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use crate::app::{App, Handles, LifecycleLog};
use crate::screens::{ComposeRoute, InboxRoute, MessageRoute};

const LOG_FILE: &str = "rat-route-demo.log";

fn init_tracing() -> anyhow::Result<()> {
    let file = std::fs::File::create(LOG_FILE)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rat_route=debug,info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// Errors are shown in the status line, so the demo reports instead of
/// panicking unless the environment asks otherwise.
fn settings() -> RouterSettings {
    match std::env::var(RouterSettings::FAILURE_POLICY_ENV) {
        Ok(_) => RouterSettings::from_env(),
        Err(_) => RouterSettings::default().with_failure_policy(FailurePolicy::Report),
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing()?;

    let mut builder = Registry::builder(settings());
    let inbox = builder.route(InboxRoute).named("inbox")?.handle().clone();
    let message = builder.route(MessageRoute).named("message")?.handle().clone();
    let compose = builder.route(ComposeRoute).named("compose")?.handle().clone();
    let handles = Handles {
        inbox: inbox.upcast(),
        message: message.upcast(),
        compose: compose.upcast(),
    };
    let registry = builder.finish();

    let (refresh_tx, refresh_rx) = mpsc::unbounded_channel();
    let log = Arc::new(LifecycleLog::new(refresh_tx));
    registry.notifier().subscribe(log.clone())?;

    let rt = Runtime::new().map_err(|e| anyhow::anyhow!("Failed to start tokio: {}", e))?;

    let mut app = App::new(registry, handles, log);
    app.install_root()?;
    tracing::info!("Starting demo");

    rt.block_on(app.run(refresh_rx))
}
