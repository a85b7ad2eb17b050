//! Per-connection session handling.
//!
//! Each session runs a receive → parse → execute → send loop. Everything
//! parsed out of one chunk executes as a single batch on the processor
//! before any reply bytes go out, and replies preserve request order.
//!
//! A protocol error from the parser becomes the final reply: the session
//! appends it after the batch's replies, flushes, and closes.

use crate::protocol::{Frame, Parser};
use crate::server::{Config, Executor};
use bytes::BytesMut;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time;
use tracing::{debug, trace};

/// Receive buffer size per read.
const READ_BUFFER_SIZE: usize = 4096;

/// A connection to a single client.
pub struct Connection {
    stream: TcpStream,
    peer_addr: SocketAddr,
    parser: Parser,
    executor: Executor,
    idle_timeout: Option<Duration>,
    write_buf: BytesMut,
}

impl Connection {
    /// Wrap an accepted socket.
    pub fn new(
        stream: TcpStream,
        peer_addr: SocketAddr,
        executor: Executor,
        config: &Config,
    ) -> Self {
        let idle_timeout = match config.conn_idle_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };
        Self {
            stream,
            peer_addr,
            parser: Parser::new(config.parser_limits()),
            executor,
            idle_timeout,
            write_buf: BytesMut::with_capacity(4096),
        }
    }

    /// Drive the session until the peer disconnects, errors out, idles
    /// past the timeout, or commits a protocol error.
    pub async fn run(mut self) {
        let mut read_buf = vec![0u8; READ_BUFFER_SIZE];

        loop {
            let n = match self.receive(&mut read_buf).await {
                Ok(0) => {
                    debug!("connection closed by peer: {}", self.peer_addr);
                    return;
                }
                Ok(n) => n,
                Err(e) => {
                    debug!("receive failed for {}: {}", self.peer_addr, e);
                    return;
                }
            };
            trace!("read {} bytes from {}", n, self.peer_addr);

            self.parser.append(&read_buf[..n]);
            self.parser.parse();

            let mut batch = Vec::with_capacity(self.parser.available());
            while let Some(frame) = self.parser.pop_data() {
                batch.push(frame);
            }
            let protocol_error = self.parser.take_error();

            if batch.is_empty() && protocol_error.is_none() {
                continue;
            }

            let mut replies = if batch.is_empty() {
                Vec::new()
            } else {
                match self.executor.run_batch(batch).await {
                    Some(replies) => replies,
                    // Processor gone: the server is shutting down.
                    None => return,
                }
            };

            let close_after_send = protocol_error.is_some();
            if let Some(msg) = protocol_error {
                debug!("protocol error from {}: {}", self.peer_addr, msg);
                replies.push(Frame::Error(msg));
            }

            self.write_buf.clear();
            for reply in &replies {
                reply.serialize(&mut self.write_buf);
            }
            if let Err(e) = self.send().await {
                debug!("send failed for {}: {}", self.peer_addr, e);
                return;
            }

            if close_after_send {
                debug!("closing {} after protocol error", self.peer_addr);
                return;
            }
        }
    }

    /// Read one chunk, subject to the idle timeout.
    async fn receive(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.idle_timeout {
            Some(timeout) => match time::timeout(timeout, self.stream.read(buf)).await {
                Ok(result) => result,
                Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "idle timeout")),
            },
            None => self.stream.read(buf).await,
        }
    }

    /// Flush the whole write buffer, subject to the idle timeout.
    async fn send(&mut self) -> io::Result<()> {
        let idle_timeout = self.idle_timeout;
        let write = async {
            self.stream.write_all(&self.write_buf).await?;
            self.stream.flush().await
        };
        match idle_timeout {
            Some(timeout) => match time::timeout(timeout, write).await {
                Ok(result) => result,
                Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "idle timeout")),
            },
            None => write.await,
        }
    }
}
