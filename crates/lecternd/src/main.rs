//! lecternd - The lectern background service
//!
//! This is the main entry point for the lecternd service.
//! It wires together all the components:
//! - Configuration loading
//! - Store initialization
//! - Presentation book and refresh ticker
//! - IPC server

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use lectern_api::{
    Command, ErrorCode, ErrorInfo, Event, EventPayload, HealthStatus, Response, ResponsePayload,
};
use lectern_config::{LecternConfig, load_config};
use lectern_core::{CoreEvent, PresentationBook, RefreshTicker};
use lectern_ipc::{IpcServer, ServerMessage};
use lectern_store::{AuditEvent, AuditEventType, SqliteStore, Store};
use lectern_util::{ClientId, LecternError, SystemClock, default_config_path};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// lecternd - Presentation schedule service
#[derive(Parser, Debug)]
#[command(name = "lecternd")]
#[command(about = "Tracks scheduled project presentations and their live status", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/lectern/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Socket path override (or set LECTERN_SOCKET env var)
    #[arg(short, long, env = "LECTERN_SOCKET")]
    socket: Option<PathBuf>,

    /// Data directory override (or set LECTERN_DATA_DIR env var)
    #[arg(short, long, env = "LECTERN_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Status refresh interval in seconds, overriding the config
    #[arg(short, long)]
    refresh_interval: Option<u64>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

/// Main service state
struct Service {
    book: PresentationBook,
    ipc: Arc<IpcServer>,
    store: Arc<dyn Store>,
    refresh_interval: Duration,
}

impl Service {
    async fn new(args: &Args) -> Result<Self> {
        let config = if args.config.exists() {
            let config = load_config(&args.config)
                .with_context(|| format!("Failed to load config from {:?}", args.config))?;
            info!(
                config_path = %args.config.display(),
                seed_count = config.seed_presentations.len(),
                "Configuration loaded"
            );
            config
        } else {
            info!(
                config_path = %args.config.display(),
                "No config file found, using defaults"
            );
            LecternConfig::default()
        };

        let socket_path = args
            .socket
            .clone()
            .unwrap_or_else(|| config.service.socket_path.clone());

        let data_dir = args
            .data_dir
            .clone()
            .unwrap_or_else(|| config.service.data_dir.clone());

        let refresh_interval = match args.refresh_interval {
            Some(0) => return Err(anyhow!("Refresh interval must be at least one second")),
            Some(secs) => Duration::from_secs(secs),
            None => config.service.refresh_interval,
        };

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

        let db_path = data_dir.join("lecternd.db");
        let store: Arc<dyn Store> = Arc::new(
            SqliteStore::open(&db_path)
                .with_context(|| format!("Failed to open database {:?}", db_path))?,
        );

        info!(db_path = %db_path.display(), "Store initialized");

        store.append_audit(AuditEvent::new(AuditEventType::ServiceStarted))?;
        let _ = store.append_audit(AuditEvent::new(AuditEventType::ConfigLoaded {
            seed_count: config.seed_presentations.len(),
        }));

        let mut book = PresentationBook::open(store.clone(), Arc::new(SystemClock))
            .context("Failed to load presentations")?;
        let seeded = book
            .seed_if_empty(&config.seed_presentations)
            .context("Failed to seed presentations")?;

        info!(
            presentation_count = book.list().len(),
            seeded,
            "Presentation book ready"
        );

        let mut ipc = IpcServer::new(&socket_path);
        ipc.start().await?;

        info!(socket_path = %socket_path.display(), "IPC server started");

        Ok(Self {
            book,
            ipc: Arc::new(ipc),
            store,
            refresh_interval,
        })
    }

    async fn run(self) -> Result<()> {
        let ipc_ref = self.ipc.clone();
        let mut ipc_messages = ipc_ref
            .take_message_receiver()
            .await
            .ok_or_else(|| anyhow!("IPC message receiver already taken"))?;

        let mut snapshots = self.book.subscribe();
        let book = Arc::new(Mutex::new(self.book));
        let store = self.store.clone();

        let ipc_accept = ipc_ref.clone();
        tokio::spawn(async move {
            if let Err(e) = ipc_accept.run().await {
                error!(error = %e, "IPC server error");
            }
        });

        let (refresh_tx, mut refresh_events) = mpsc::unbounded_channel();
        let mut ticker = RefreshTicker::start(book.clone(), self.refresh_interval, refresh_tx);

        let mut sigterm = signal(SignalKind::terminate())
            .context("Failed to create SIGTERM handler")?;
        let mut sigint = signal(SignalKind::interrupt())
            .context("Failed to create SIGINT handler")?;
        let mut sighup = signal(SignalKind::hangup())
            .context("Failed to create SIGHUP handler")?;

        info!("Service running");

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break;
                }
                _ = sighup.recv() => {
                    info!("Received SIGHUP, shutting down gracefully");
                    break;
                }

                // Periodic refresh moved some statuses
                Some(event) = refresh_events.recv() => {
                    ipc_ref.broadcast_event(Event::new(event_payload(event)));
                }

                // Every write publishes a full snapshot
                Ok(()) = snapshots.changed() => {
                    let presentations = snapshots.borrow_and_update().to_vec();
                    debug!(count = presentations.len(), "Broadcasting snapshot");
                    ipc_ref.broadcast_event(Event::new(EventPayload::PresentationsChanged {
                        presentations,
                    }));
                }

                Some(msg) = ipc_messages.recv() => {
                    Self::handle_ipc_message(&book, &ipc_ref, &store, msg).await;
                }
            }
        }

        info!("Shutting down lecternd");

        ticker.cancel();
        ipc_ref.broadcast_event(Event::new(EventPayload::Shutdown));

        if let Err(e) = store.append_audit(AuditEvent::new(AuditEventType::ServiceStopped)) {
            warn!(error = %e, "Failed to log service shutdown");
        }

        ipc_ref.shutdown();

        info!("Shutdown complete");
        Ok(())
    }

    async fn handle_ipc_message(
        book: &Arc<Mutex<PresentationBook>>,
        ipc: &Arc<IpcServer>,
        store: &Arc<dyn Store>,
        msg: ServerMessage,
    ) {
        match msg {
            ServerMessage::Request { client_id, request } => {
                let (response, event) = {
                    let mut book = book.lock().await;
                    handle_command(&mut book, &client_id, request.request_id, request.command)
                };

                let _ = ipc.send_response(&client_id, response).await;

                if let Some(event) = event {
                    ipc.broadcast_event(Event::new(event_payload(event)));
                }
            }

            ServerMessage::ClientConnected { client_id, info } => {
                info!(client_id = %client_id, uid = ?info.uid, "Client connected");

                let _ = store.append_audit(AuditEvent::new(AuditEventType::ClientConnected {
                    client_id: client_id.to_string(),
                    uid: info.uid,
                }));
            }

            ServerMessage::ClientDisconnected { client_id } => {
                debug!(client_id = %client_id, "Client disconnected");

                let _ = store.append_audit(AuditEvent::new(AuditEventType::ClientDisconnected {
                    client_id: client_id.to_string(),
                }));
            }
        }
    }
}

/// Run one command against the book.
///
/// Returns the response for the caller plus the event to broadcast, if any.
fn handle_command(
    book: &mut PresentationBook,
    client_id: &ClientId,
    request_id: u64,
    command: Command,
) -> (Response, Option<CoreEvent>) {
    match command {
        Command::ListPresentations { filter } => {
            let presentations = book.list_filtered(filter);
            (
                Response::success(request_id, ResponsePayload::Presentations { presentations }),
                None,
            )
        }

        Command::GetPresentation { id } => match book.get(&id) {
            Some(presentation) => (
                Response::success(request_id, ResponsePayload::Presentation { presentation }),
                None,
            ),
            None => (
                error_response(request_id, &LecternError::PresentationNotFound(id)),
                None,
            ),
        },

        Command::CreatePresentation { draft } => match book.create(draft) {
            Ok(event) => {
                let response = match &event {
                    CoreEvent::PresentationCreated { presentation } => Response::success(
                        request_id,
                        ResponsePayload::Created {
                            presentation: presentation.clone(),
                        },
                    ),
                    _ => unexpected_event(request_id),
                };
                (response, Some(event))
            }
            Err(e) => (error_response(request_id, &e), None),
        },

        Command::UpdatePresentation { id, patch } => match book.update(&id, patch) {
            Ok(event) => {
                let response = match &event {
                    CoreEvent::PresentationUpdated { presentation } => Response::success(
                        request_id,
                        ResponsePayload::Updated {
                            presentation: presentation.clone(),
                        },
                    ),
                    _ => unexpected_event(request_id),
                };
                (response, Some(event))
            }
            Err(e) => (error_response(request_id, &e), None),
        },

        Command::DeletePresentation { id } => match book.delete(&id) {
            Ok(event) => (
                Response::success(request_id, ResponsePayload::Deleted { id }),
                Some(event),
            ),
            Err(e) => (error_response(request_id, &e), None),
        },

        Command::RefreshStatuses => match book.refresh() {
            Ok(Some(event)) => {
                let changes = match &event {
                    CoreEvent::StatusesRefreshed { changes } => changes.clone(),
                    _ => Vec::new(),
                };
                (
                    Response::success(request_id, ResponsePayload::Refreshed { changes }),
                    Some(event),
                )
            }
            Ok(None) => (
                Response::success(request_id, ResponsePayload::Refreshed { changes: Vec::new() }),
                None,
            ),
            Err(e) => (error_response(request_id, &e), None),
        },

        // Subscription state itself is tracked by the IPC layer
        Command::SubscribeEvents => (
            Response::success(
                request_id,
                ResponsePayload::Subscribed {
                    client_id: client_id.clone(),
                },
            ),
            None,
        ),

        Command::UnsubscribeEvents => (
            Response::success(request_id, ResponsePayload::Unsubscribed),
            None,
        ),

        Command::GetHealth => {
            let store_ok = book.is_healthy();
            let health = HealthStatus {
                live: true,
                ready: store_ok,
                store_ok,
                presentation_count: book.list().len(),
            };
            (Response::success(request_id, ResponsePayload::Health(health)), None)
        }

        Command::Ping => (Response::success(request_id, ResponsePayload::Pong), None),
    }
}

fn error_response(request_id: u64, error: &LecternError) -> Response {
    let code = match error {
        LecternError::InvalidWindow { .. } => ErrorCode::InvalidWindow,
        LecternError::PresentationNotFound(_) => ErrorCode::NotFound,
        LecternError::StoreError(_) => ErrorCode::StoreError,
    };

    Response::error(request_id, ErrorInfo::new(code, error.to_string()))
}

fn unexpected_event(request_id: u64) -> Response {
    Response::error(
        request_id,
        ErrorInfo::new(ErrorCode::InternalError, "Unexpected core event"),
    )
}

fn event_payload(event: CoreEvent) -> EventPayload {
    match event {
        CoreEvent::PresentationCreated { presentation } => {
            EventPayload::PresentationCreated { presentation }
        }
        CoreEvent::PresentationUpdated { presentation } => {
            EventPayload::PresentationUpdated { presentation }
        }
        CoreEvent::PresentationDeleted { id } => EventPayload::PresentationDeleted { id },
        CoreEvent::StatusesRefreshed { changes } => EventPayload::StatusesRefreshed { changes },
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        mock_time = lectern_util::is_mock_time_active(),
        "lecternd starting"
    );

    let service = Service::new(&args).await?;
    service.run().await
}
