//! The single-writer execution context.
//!
//! All keyspace state lives behind one dedicated task that drains a queue
//! of jobs and runs them to completion one at a time, in post order. That
//! total ordering is the crate's whole concurrency story: sessions on any
//! number of runtime threads post batches here and no lock ever guards the
//! keyspace.

use crate::commands::Processor;
use crate::protocol::Frame;
use crate::server::Config;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// One session's parsed batch, paired with the channel its replies go
/// back on.
struct Job {
    commands: Vec<Frame>,
    reply: oneshot::Sender<Vec<Frame>>,
}

/// Handle for posting command batches to the processor task.
///
/// Cloning is cheap; every connection holds one.
#[derive(Clone)]
pub struct Executor {
    tx: mpsc::UnboundedSender<Job>,
}

impl Executor {
    /// Spawn the processor task and return a handle to it.
    ///
    /// The task exits once every handle has been dropped and the queue has
    /// drained, which is how server shutdown reaches it.
    pub fn spawn(config: &Config) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        let mut processor = Processor::new(config);

        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                let mut replies = Vec::with_capacity(job.commands.len());
                for command in job.commands {
                    replies.push(processor.execute(command));
                }
                // The session may have died mid-flight; its replies are
                // then simply dropped.
                let _ = job.reply.send(replies);
            }
            debug!("processor task finished");
        });

        Self { tx }
    }

    /// Execute a batch of commands, in order, and collect their replies.
    ///
    /// Returns `None` only when the processor task is gone, i.e. during
    /// shutdown.
    pub async fn run_batch(&self, commands: Vec<Frame>) -> Option<Vec<Frame>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Job {
                commands,
                reply: reply_tx,
            })
            .ok()?;
        reply_rx.await.ok()
    }
}
