use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use telecast_engine::context::{ContextPaths, DataContext};

use telecast_server::infra::app_state::{AppState, NullCaptionIndex};
use telecast_server::routes;

/// Command line arguments for the telecast query server.
#[derive(Parser, Debug)]
#[command(name = "telecast-server")]
#[command(about = "HTTP surface for the telecast interval-analytics query engine")]
struct Args {
    /// Path to a TOML config file (§10.3).
    #[arg(long, env = "TELECAST_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Server port (overrides config).
    #[arg(short, long, env = "SERVER_PORT")]
    port: Option<u16>,

    /// Server host (overrides config).
    #[arg(long, env = "SERVER_HOST")]
    host: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "telecast_server=info,telecast_engine=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = telecast_config::load(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.server_port = port;
    }
    if let Some(host) = args.host {
        config.server_host = host;
    }
    let config = Arc::new(config);

    info!(data_dir = %config.data_dir.display(), "loading data context");
    let data = DataContext::load(&ContextPaths {
        data_dir: config.data_dir.clone(),
        timezone: config.timezone,
        min_person_screen_time_ms: (config.min_person_screen_time_seconds * 1000.0) as u64,
        person_name_filter: None,
    })?;
    info!(videos = data.videos.len(), persons = data.persons.len(), "data context loaded");
    let data = Arc::new(data);

    if config.caption_index_dir.is_none() {
        warn!("no caption_index_dir configured; transcript search will always return no matches");
    }
    let captions: Arc<dyn telecast_engine::transcript::CaptionIndex> = Arc::new(NullCaptionIndex);

    let state = AppState { data, captions, config: config.clone() };
    let app = routes::create_router(state);

    let addr = SocketAddr::from((
        config.server_host.parse::<std::net::IpAddr>().unwrap_or([0, 0, 0, 0].into()),
        config.server_port,
    ));
    info!("starting telecast server on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
