use sitepulse::config::{AccountSeed, Config};
use sitepulse::ingest::handler::AppState;
use sitepulse::server;
use sitepulse::storage::duckdb_store::DuckDbStore;
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "sitepulse=info,tower_http=info".into());
    let json = std::env::var("SITEPULSE_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn seed_accounts(store: &DuckDbStore, seeds: &[AccountSeed]) {
    for seed in seeds {
        let account = match store.register_account(&seed.api_key) {
            Ok(account) => account,
            Err(e) => {
                tracing::error!(error = %e, "Failed to register account");
                continue;
            }
        };
        for domain in &seed.domains {
            match store.register_domain(&account, domain) {
                Ok(domain) => tracing::info!(account = %account, domain = %domain, "Domain registered"),
                Err(e) => tracing::error!(domain = %domain, error = %e, "Failed to register domain"),
            }
        }
    }
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() {
    init_tracing();

    // Load configuration
    let config_path = std::env::args().nth(1);
    let config = Config::load(config_path.as_deref().map(std::path::Path::new));

    tracing::info!(
        host = %config.host,
        port = config.port,
        database = ?config.database,
        accounts = config.accounts.len(),
        "Starting sitepulse"
    );

    if let Some(parent) = config.database.as_deref().and_then(std::path::Path::parent) {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).expect("Failed to create database directory");
        }
    }
    let store = Arc::new(DuckDbStore::open(config.database.as_deref()).expect("Failed to open DuckDB"));
    seed_accounts(&store, &config.accounts);

    let secret = config.secret.clone().unwrap_or_else(|| {
        tracing::warn!("No SITEPULSE_SECRET set, using a random secret. Derived visitor IDs will not survive a restart.");
        uuid::Uuid::new_v4().to_string()
    });

    let mut state = AppState::new(store, secret);
    state.dashboard_origin.clone_from(&config.dashboard_origin);
    state.request_timeout_secs = config.request_timeout_secs;
    let app = server::build_router(Arc::new(state));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to {addr}: {e}"));
    tracing::info!(addr = %addr, "Listening");

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let mut graceful_rx = shutdown_rx.clone();
    let serve = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = graceful_rx.wait_for(|stop| *stop).await;
        })
        .into_future();

    let mut deadline_rx = shutdown_rx;
    let drain_timeout = Duration::from_secs(config.shutdown_timeout_secs);
    let deadline = async move {
        let _ = deadline_rx.wait_for(|stop| *stop).await;
        tokio::time::sleep(drain_timeout).await;
    };

    tokio::select! {
        result = serve => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Server error");
            }
        }
        () = deadline => {
            tracing::warn!(timeout_secs = config.shutdown_timeout_secs, "Shutdown timeout elapsed, dropping open connections");
        }
    }
    tracing::info!("Stopped");
}
