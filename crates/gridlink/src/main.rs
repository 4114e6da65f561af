// ── Gridlink daemon ──
//
// Wires configured adapters, the registry store, and the mediator together,
// then runs until interrupted. With no adapters configured, a demo sim
// network is started so the event flow is observable out of the box.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use gridlink_adapters::{SimAdapter, spawn_traffic};
use gridlink_config::{AdapterSettings, Settings};
use gridlink_core::{EventBus, Mediator, MediatorConfig, RegistryStore};

#[derive(Parser)]
#[command(name = "gridlink", version, about = "Hardware network to registry mediator")]
struct Cli {
    /// Path to the config file (defaults to the platform config dir).
    #[arg(short, long, env = "GRIDLINK_CONFIG")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v: debug, -vv: trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let settings = match gridlink_config::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("gridlink: {err}");
            process::exit(2);
        }
    };

    init_tracing(cli.verbose, &settings.log.filter);
    run(settings).await;
}

fn init_tracing(verbosity: u8, configured: &str) {
    let filter = match verbosity {
        0 => configured.to_owned(),
        1 => "debug".into(),
        _ => "trace".into(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();
}

async fn run(settings: Settings) {
    let store = Arc::new(RegistryStore::new());
    let bus = EventBus::new(settings.mediator.bus_capacity);
    let mediator = Arc::new(Mediator::new(
        Arc::clone(&store),
        bus.clone(),
        MediatorConfig {
            registration_wait: settings.mediator.registration_wait(),
        },
    ));

    let (event_tx, event_rx) = mpsc::channel(settings.mediator.queue_capacity);
    let cancel = CancellationToken::new();
    let mut handles: Vec<JoinHandle<()>> = Vec::new();

    handles.push(tokio::spawn(
        Arc::clone(&mediator).run(event_rx, cancel.child_token()),
    ));
    handles.push(tokio::spawn(wire_log_task(
        bus.clone(),
        cancel.child_token(),
    )));
    handles.push(tokio::spawn(registry_watch_task(
        Arc::clone(&store),
        cancel.child_token(),
    )));

    // Adapter sections; a demo sim network when none are configured.
    let adapters: Vec<(String, AdapterSettings)> = if settings.adapters.is_empty() {
        info!("no adapters configured, starting demo sim network");
        vec![("sim-net".to_owned(), AdapterSettings::default())]
    } else {
        settings.adapters.into_iter().collect()
    };

    for (name, adapter_settings) in adapters {
        match adapter_settings.kind.as_str() {
            "sim" => {
                let adapter = Arc::new(SimAdapter::new(&name, adapter_settings.permit_join));
                handles.push(spawn_traffic(
                    adapter,
                    event_tx.clone(),
                    cancel.child_token(),
                    adapter_settings.report_interval(),
                ));
                info!(adapter = %name, "sim adapter started");
            }
            other => warn!(adapter = %name, kind = other, "unknown adapter kind, skipping"),
        }
    }
    drop(event_tx);

    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
    }
    info!("shutting down");
    cancel.cancel();
    for handle in handles {
        let _ = handle.await;
    }
}

/// Log every external-shape event as it would leave the process.
async fn wire_log_task(bus: EventBus, cancel: CancellationToken) {
    let mut rx = bus.subscribe_wire();
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            event = rx.recv() => match event {
                Ok(event) => {
                    info!(kind = %event.kind, adapter = %event.adapter, data = %event.data, "event");
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "wire log fell behind");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
        }
    }
}

/// Log registry population changes.
async fn registry_watch_task(store: Arc<RegistryStore>, cancel: CancellationToken) {
    let mut devices = store.subscribe_devices().into_stream();
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            snapshot = devices.next() => {
                let Some(snapshot) = snapshot else { break };
                info!(
                    devices = snapshot.len(),
                    gadgets = store.gadget_count(),
                    "registry changed"
                );
            }
        }
    }
}
