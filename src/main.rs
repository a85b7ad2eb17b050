//! Server entry point.

use mini_redis::{Config, Server, DEFAULT_PORT};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let port = match parse_args(&args) {
        Ok(port) => port,
        Err(message) => {
            eprintln!("{message}");
            std::process::exit(1);
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(false).init();

    let config = Config {
        port,
        ..Config::default()
    };
    let server = Server::bind(config).await?;

    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        if let Err(e) = wait_for_signal().await {
            error!("signal handler failed: {}", e);
            return;
        }
        info!("received shutdown signal");
        shutdown.shutdown();
    });

    server.run().await?;
    Ok(())
}

/// Accept exactly `mini-redis` or `mini-redis --port <1..65535>`.
fn parse_args(args: &[String]) -> Result<u16, String> {
    let usage = || format!("Usage: {} [--port <1-65535>]", args[0]);
    match args.len() {
        1 => Ok(DEFAULT_PORT),
        3 if args[1] == "--port" => match args[2].parse::<u16>() {
            Ok(port) if port > 0 => Ok(port),
            _ => Err(format!("Invalid port: {}", args[2])),
        },
        _ => Err(usage()),
    }
}

/// Resolve on SIGINT or SIGTERM.
async fn wait_for_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut interrupt = signal(SignalKind::interrupt())?;
        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            _ = interrupt.recv() => {}
            _ = terminate.recv() => {}
        }
        Ok(())
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}
