use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use vcache_core::{
    purge_local_copies, router, AppState, CacheConfig, Metrics, ObjectStoreSource, RefreshLoop,
    RefreshSettings, SnapshotStore, Track,
};

mod args;

use args::{Args, LogFormat};

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let args = Args::parse();
    init_tracing(args.debug, args.log_format);

    if let Err(e) = run(args).await {
        error!(error = %e, "fatal");
        eprintln!("fatal: {e:?}");
        std::process::exit(2);
    }
}

fn init_tracing(debug: bool, format: LogFormat) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn load_config(args: &Args) -> Result<CacheConfig> {
    let mut config = match &args.config {
        Some(path) => CacheConfig::from_json_file(path)?,
        None => CacheConfig::from_env()?,
    };
    if let Some(port) = args.port {
        config = config.with_http_port(port);
    }
    if let Some(dir) = &args.data_dir {
        config = config.with_data_dir(dir.clone());
    }
    config.validate()?;
    Ok(config)
}

async fn run(args: Args) -> Result<()> {
    let config = load_config(&args).context("invalid configuration")?;
    info!(?config, "starting");

    let removed = purge_local_copies(&config.data_dir)
        .await
        .context("failed to purge local copies")?;
    info!(dir = %config.data_dir.display(), removed, "local copies purged");

    let registry = prometheus::Registry::new();
    let metrics = Metrics::new(&registry)?;
    let store = SnapshotStore::new();
    let settings = RefreshSettings::from_config(&config);

    // Both tracks must have shapes before the listener is bound.
    let mut loops = Vec::with_capacity(Track::ALL.len());
    for track in Track::ALL {
        let source = Arc::new(
            ObjectStoreSource::from_settings(&config.remote)
                .context("failed to create remote client")?,
        );
        let mut refresh = RefreshLoop::new(
            track,
            source,
            store.clone(),
            metrics.clone(),
            &config.data_dir,
            settings.clone(),
        );
        refresh
            .bootstrap()
            .await
            .with_context(|| format!("failed to bootstrap {} track", track))?;
        loops.push(refresh);
    }

    for refresh in loops {
        let track = refresh.track();
        tokio::spawn(async move {
            if let Err(e) = refresh.run().await {
                error!(%track, error = %e, "refresh loop stopped");
            }
        });
    }

    let app = router(AppState::new(store.reader(), metrics, registry));
    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!(%addr, "server is running");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server error")?;
    Ok(())
}
