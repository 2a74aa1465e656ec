use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use liftsync::{
    client::OfflineClient,
    config::{ClientConfig, SyncConfig},
    connectivity::ConnectivityMonitor,
    dispatch::Dispatched,
    op::now_ms,
    payload::{Payload, SessionCompletion, SetLog, WeightLog},
    queue::store::OperationStore,
    runtime::events::SyncEvent,
    remote::{
        RemoteApi, RemoteError, RemoteResult,
        http::{HttpRemote, StaticToken, check_server},
    },
    sync::{PassOutcome, SkipReason},
};

#[derive(Parser)]
#[command(name = "liftsync")]
#[command(version)]
#[command(about = "Log workouts offline and sync them when the server is reachable", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log a set against a session
    LogSet {
        #[arg(long)]
        session: String,
        #[arg(long)]
        exercise: String,
        #[arg(long, default_value_t = 1)]
        set_number: u32,
        /// Load in kilograms
        #[arg(long)]
        weight: f64,
        #[arg(long)]
        reps: u32,
        #[arg(long)]
        rpe: Option<f32>,
    },

    /// Mark a session as completed
    CompleteSession {
        #[arg(long)]
        session: String,
        #[arg(long)]
        duration_secs: Option<u32>,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Record a body-weight entry
    LogWeight {
        /// Body weight in kilograms
        #[arg(long)]
        weight: f64,
        #[arg(long)]
        body_fat: Option<f32>,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Replay queued writes against the server
    Sync,

    /// Show pending and abandoned counts
    Status,

    /// List queued writes that have not synced yet
    Pending,

    /// Drop records already confirmed by the server
    Purge,

    /// Keep probing the server and syncing until interrupted
    Watch,
}

/// Stand-in used when no server URL is configured; every call is a transport failure.
struct Unconfigured;

#[async_trait]
impl RemoteApi for Unconfigured {
    async fn log_set(&self, _set: &SetLog) -> RemoteResult<Value> {
        Err(not_configured())
    }

    async fn complete_session(&self, _completion: &SessionCompletion) -> RemoteResult<Value> {
        Err(not_configured())
    }

    async fn log_weight(&self, _entry: &WeightLog) -> RemoteResult<Value> {
        Err(not_configured())
    }
}

fn not_configured() -> RemoteError {
    RemoteError::Transport("no server configured".to_string())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "liftsync=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = ClientConfig::load(cli.config)?;

    let db_path = &config.database_path.value;
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let store = OperationStore::open_sqlite(db_path)?;
    tracing::debug!(path = %db_path.display(), source = %config.database_path.source, "opened queue");

    let connectivity = ConnectivityMonitor::new(false);
    let mut health_url = None;
    let remote: Arc<dyn RemoteApi> = match &config.server_url {
        Some(url) => {
            let remote = HttpRemote::new(
                url.value.clone(),
                Arc::new(StaticToken(config.api_token.clone())),
                config.sync.request_timeout(),
            )?;
            let http = reqwest::Client::builder()
                .timeout(config.sync.request_timeout())
                .build()?;
            let url = format!("{}/health", remote.base_url());
            connectivity.set_online(check_server(&http, &url).await);
            health_url = Some(url);
            Arc::new(remote)
        }
        None => Arc::new(Unconfigured),
    };

    let client = OfflineClient::new(store, connectivity, Arc::clone(&remote), config.sync.clone());
    client.refresh_status().await?;

    match cli.command {
        Commands::LogSet {
            session,
            exercise,
            set_number,
            weight,
            reps,
            rpe,
        } => {
            let set = SetLog {
                session_id: session,
                exercise_id: exercise,
                set_number,
                weight_kg: weight,
                reps,
                rpe,
                performed_at_ms: now_ms(),
            };
            write(&client, remote.as_ref(), set.into()).await?;
        }
        Commands::CompleteSession {
            session,
            duration_secs,
            notes,
        } => {
            let completion = SessionCompletion {
                session_id: session,
                completed_at_ms: now_ms(),
                duration_secs,
                notes,
            };
            write(&client, remote.as_ref(), completion.into()).await?;
        }
        Commands::LogWeight {
            weight,
            body_fat,
            notes,
        } => {
            let entry = WeightLog {
                weight_kg: weight,
                body_fat_pct: body_fat,
                logged_at_ms: now_ms(),
                notes,
            };
            write(&client, remote.as_ref(), entry.into()).await?;
        }
        Commands::Sync => match client.coordinator.run_sync_pass().await? {
            PassOutcome::Completed(report) => {
                println!(
                    "Synced {}, failed {}, abandoned {}, {} still pending",
                    report.synced,
                    report.failed,
                    report.abandoned,
                    client.status.current().pending_count
                );
            }
            PassOutcome::Skipped(SkipReason::Offline) => {
                println!(
                    "Server unreachable; {} write(s) remain queued",
                    client.status.current().pending_count
                );
            }
            PassOutcome::Skipped(SkipReason::AlreadyRunning) => {
                println!("A sync is already running");
            }
        },
        Commands::Status => {
            let status = client.status.current();
            let abandoned = client.store.list_abandoned().await?.len();
            println!(
                "Online: {}",
                if client.connectivity.is_online() { "yes" } else { "no" }
            );
            println!("Pending: {}", status.pending_count);
            println!("Abandoned: {}", abandoned);
            if let Some(file) = &config.config_file {
                println!("Config: {}", file.display());
            }
        }
        Commands::Pending => {
            let ops = client.store.snapshot().await?;
            let live: Vec<_> = ops.iter().filter(|op| op.status.is_live()).collect();
            if live.is_empty() {
                println!("No pending writes");
            }
            for op in live {
                println!(
                    "{}  {:<16} {:<8} attempts={}{}",
                    op.id,
                    op.kind,
                    op.status,
                    op.attempts,
                    op.last_error
                        .as_deref()
                        .map(|e| format!("  last_error={e}"))
                        .unwrap_or_default()
                );
            }
        }
        Commands::Purge => {
            let purged = client.store.purge_retired().await?;
            println!("Purged {} synced record(s)", purged);
        }
        Commands::Watch => watch(&client, health_url, &config.sync).await?,
    }

    client.store.flush().await?;
    Ok(())
}

async fn write(
    client: &OfflineClient<dyn RemoteApi>,
    remote: &dyn RemoteApi,
    payload: Payload,
) -> Result<(), Box<dyn std::error::Error>> {
    match client.dispatcher.dispatch_via(remote, payload).await? {
        Dispatched::Confirmed(response) => {
            println!("Saved: {}", response);
        }
        Dispatched::Optimistic(result) => {
            println!(
                "Offline: queued as {} ({} pending)",
                result.placeholder_id,
                client.status.current().pending_count
            );
        }
    }
    Ok(())
}

async fn watch(
    client: &OfflineClient<dyn RemoteApi>,
    health_url: Option<String>,
    sync: &SyncConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let checker = match health_url {
        Some(url) => Some(client.connectivity.spawn_probe(
            url,
            sync.probe_interval(),
            sync.request_timeout(),
        )?),
        None => {
            println!("No server configured; writes stay queued");
            None
        }
    };
    let handle = client.spawn_runtime();
    let mut events = handle.subscribe();
    println!("Watching ({} pending), Ctrl-C to stop", client.status.current().pending_count);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            event = events.recv() => match event {
                Ok(SyncEvent::ConnectivityChanged { online }) => {
                    println!("{}", if online { "Server reachable" } else { "Server unreachable" });
                }
                Ok(SyncEvent::PassFinished { trigger, report }) if report.synced + report.failed > 0 => {
                    println!(
                        "Sync ({:?}): synced {}, failed {}, abandoned {}",
                        trigger, report.synced, report.failed, report.abandoned
                    );
                }
                Ok(SyncEvent::PassFailed { error, .. }) => eprintln!("Sync failed: {error}"),
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
        }
    }

    if let Some(checker) = checker {
        checker.abort();
    }
    handle.shutdown().await?;
    Ok(())
}
