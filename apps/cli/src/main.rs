mod args;
mod config;
mod dirs;

use std::io;
use std::net::{IpAddr, SocketAddr};

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use app_api::AppContext;
use http_api::{HttpState, TOKEN_HEADER, generate_api_token};
use watchdog_app::{AppPaths, AppState, ensure_app_data_dir};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = args::parse_args().map_err(|err| {
        eprintln!("{err}");
        args::print_help();
        io::Error::new(io::ErrorKind::InvalidInput, "invalid arguments")
    })?;

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    let data_dir = dirs::resolve_data_dir(args.data_dir.clone()).map_err(io::Error::other)?;
    let paths = AppPaths::new(data_dir);
    ensure_app_data_dir(&paths).map_err(|err| io::Error::other(err.to_string()))?;
    info!(data_dir = %paths.app_data_dir.display(), "using data dir");

    let config_file = args.config.clone().unwrap_or(paths.config_path.clone());
    let config = config::load_or_create(&config_file).map_err(io::Error::other)?;
    if config.created {
        info!(path = %config.file.display(), "created default config");
    }
    let settings = config.config;
    let host: IpAddr = settings
        .server
        .host
        .parse()
        .map_err(|err| io::Error::other(format!("invalid server.host: {err}")))?;
    let port = args.port.unwrap_or(settings.server.port);

    let app_state = AppState::new(paths.db_path.clone(), settings)
        .map_err(|err| io::Error::other(err.to_string()))?;
    let is_fresh_db = app_state.is_fresh_db();
    if let Err(err) = app_state.setup_db() {
        return Err(io::Error::other(format!("failed to initialize database: {}", err)).into());
    }
    if is_fresh_db {
        info!(path = %paths.db_path.display(), "created database");
    }

    let context = AppContext {
        app_state,
        app_data_dir: paths.app_data_dir,
    };

    let api_token = generate_api_token();
    let state = HttpState::new(context, api_token.clone());
    let router = http_api::router(state);

    let (listener, actual_port, used_fallback) = bind_port(host, port).await?;
    if used_fallback {
        warn!(port, actual_port, "configured port was unavailable");
    }

    let url = format!("http://{}", SocketAddr::new(host, actual_port));
    println!("API Watchdog is proxying at {url}/v1/chat/completions");
    println!("Dashboard API token ({TOKEN_HEADER}): {api_token}");
    println!("Press Ctrl+C to stop.");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shut down");
    Ok(())
}

async fn bind_port(
    host: IpAddr,
    port: u16,
) -> Result<(tokio::net::TcpListener, u16, bool), io::Error> {
    if port == 0 {
        let listener = tokio::net::TcpListener::bind(SocketAddr::new(host, 0)).await?;
        let actual_port = listener.local_addr()?.port();
        return Ok((listener, actual_port, false));
    }

    match tokio::net::TcpListener::bind(SocketAddr::new(host, port)).await {
        Ok(listener) => Ok((listener, port, false)),
        Err(_) => {
            let listener = tokio::net::TcpListener::bind(SocketAddr::new(host, 0)).await?;
            let actual_port = listener.local_addr()?.port();
            Ok((listener, actual_port, true))
        }
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
