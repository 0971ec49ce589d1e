//! Cloak Router Node
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Cloak Router Node                         │
//! │                                                                 │
//! │  ┌─────────────┐   ┌──────────────────┐   ┌─────────────────┐   │
//! │  │  HTTP API   │──►│  Action Router   │──►│ Verifier Adapter│   │
//! │  │  (axum)     │   │  (tokio Mutex)   │   │ groth16 / mock  │   │
//! │  └─────────────┘   └────────┬─────────┘   └─────────────────┘   │
//! │                             │                                   │
//! │         ┌───────────────────┼────────────────────┐              │
//! │         ▼                   ▼                    ▼              │
//! │  ┌─────────────┐   ┌──────────────────┐   ┌─────────────────┐   │
//! │  │  RocksDB    │   │ Commitment Index │   │  Audit sinks    │   │
//! │  │  (ledger)   │   │ (all domains)    │   │  log + memory   │   │
//! │  └─────────────┘   └──────────────────┘   └─────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use cloak_core::api::{ApiState, create_router};
use cloak_core::router::{
    ActionRouter, CommitmentIndex, LogEventSink, MemoryEventSink, events::DEFAULT_EVENT_CAPACITY,
};
use cloak_core::storage::{LedgerStore, MemoryStore, RocksDbStore};
use cloak_core::CloakConfig;
use cloak_privacy::ActionDomain;
use log::{info, warn};
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::Mutex;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    let config = CloakConfig::load()?;
    config.validate().context("Invalid configuration")?;

    info!("============================================");
    info!("          CLOAK ROUTER v{}", env!("CARGO_PKG_VERSION"));
    info!("============================================");
    if config.database.in_memory {
        info!("Ledger            : in-memory");
    } else {
        info!("Ledger            : {}", config.database.path);
    }
    info!("API               : {}:{}", config.api.host, config.api.port);
    info!("Admin             : {}", config.router.admin);
    info!("Relayer           : {}", config.router.relayer);
    info!("Verifier mode     : {}", config.verifier.mode);
    info!("============================================");

    if config.router.relayer.is_placeholder() {
        warn!("No relayer configured: intents can never be finalized");
    }

    // Open ledger
    let store: Arc<dyn LedgerStore> = if config.database.in_memory {
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(
            RocksDbStore::open(&config.database.path)
                .with_context(|| format!("Failed to open ledger at {}", config.database.path))?,
        )
    };
    let snapshot = store.load().context("Failed to load ledger")?;

    // Commitment index seeded from persisted records
    let index = Arc::new(CommitmentIndex::from_records(snapshot.commitments.values()));
    info!("Commitment index loaded: {} commitments", index.len());

    let settings = config.to_router_settings();
    let admin = settings.admin;
    let mut router = ActionRouter::restore(settings, store, snapshot);

    let events = Arc::new(MemoryEventSink::new(DEFAULT_EVENT_CAPACITY));
    router.add_event_sink(Arc::new(LogEventSink));
    router.add_event_sink(events.clone());

    for domain in ActionDomain::ALL {
        router.register_handler(domain, index.clone());
    }

    let adapter = config.build_verifier()?;
    router
        .set_verifier(&admin, adapter)
        .context("Failed to install verifier")?;

    let status = router.status();
    info!(
        "Router ready: active pool {}, {} nullifiers, {} pending intents",
        status.active_version, status.nullifiers_used, status.pending_intents
    );

    // Create API state
    let api_state = ApiState {
        router: Arc::new(Mutex::new(router)),
        events,
        index,
        start_time: Instant::now(),
    };

    // Create and start HTTP server
    let app = create_router(api_state);
    let addr: SocketAddr = format!("{}:{}", config.api.host, config.api.port)
        .parse()
        .with_context(|| format!("Invalid API address {}:{}", config.api.host, config.api.port))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("HTTP API listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = signal::ctrl_c().await {
                log::error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutdown signal received");
        })
        .await
        .context("HTTP server failed")?;

    info!("Cloak router stopped");
    Ok(())
}
