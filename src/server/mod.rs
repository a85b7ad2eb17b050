//! TCP server and connection management.

mod config;
mod connection;
mod executor;

pub use config::Config;
pub use connection::Connection;
pub use executor::Executor;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{debug, error, info};

/// The TCP server: one listener, one processor task, one session task per
/// accepted connection.
pub struct Server {
    config: Config,
    listener: TcpListener,
    executor: Executor,
    shutdown: Arc<Notify>,
}

/// Cloneable handle that asks a running [`Server`] to stop accepting and
/// return from [`Server::run`].
#[derive(Clone)]
pub struct ShutdownHandle(Arc<Notify>);

impl ShutdownHandle {
    /// Initiate shutdown. In-flight command batches run to completion;
    /// sessions die with their sockets when the process exits.
    pub fn shutdown(&self) {
        self.0.notify_one();
    }
}

impl Server {
    /// Bind the listener and spawn the processor task.
    pub async fn bind(config: Config) -> io::Result<Self> {
        let listener = TcpListener::bind((config.bind.as_str(), config.port)).await?;
        let executor = Executor::spawn(&config);
        Ok(Self {
            config,
            listener,
            executor,
            shutdown: Arc::new(Notify::new()),
        })
    }

    /// The address the listener actually bound (relevant with port 0).
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// A handle for initiating shutdown from another task.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle(self.shutdown.clone())
    }

    /// Accept connections until shutdown is requested or the listener
    /// fails.
    pub async fn run(self) -> io::Result<()> {
        info!(
            "mini-redis {} listening on {}",
            crate::VERSION,
            self.listener.local_addr()?
        );

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer_addr)) => {
                            debug!("new connection from {}", peer_addr);
                            let connection = Connection::new(
                                stream,
                                peer_addr,
                                self.executor.clone(),
                                &self.config,
                            );
                            tokio::spawn(connection.run());
                        }
                        Err(e) => {
                            error!("accept failed: {}", e);
                            return Err(e);
                        }
                    }
                }
                _ = self.shutdown.notified() => {
                    info!("shutdown requested, stopping accept loop");
                    return Ok(());
                }
            }
        }
    }
}
