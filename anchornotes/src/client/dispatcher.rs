//! Serial delivery of store notifications.
//!
//! Every store posts its listener callbacks here instead of invoking them on
//! the mutating thread. A single task drains the queue, so callbacks run one
//! at a time, in the order they were posted, and never under a store lock.

use std::panic::{catch_unwind, AssertUnwindSafe};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

pub type Job = Box<dyn FnOnce() + Send + 'static>;

enum Command {
    Run(Job),
    Flush(oneshot::Sender<()>),
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    tx: mpsc::UnboundedSender<Command>,
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

impl NotificationDispatcher {
    /// Starts the delivery task on the current runtime. The task exits when
    /// `cancel` fires or every dispatcher handle has been dropped.
    pub fn spawn(cancel: CancellationToken) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run(rx, cancel));
        (Self { tx }, handle)
    }

    /// Queues `job`. Returns `false` if the delivery task is gone.
    pub fn post(&self, job: Job) -> bool {
        if self.tx.send(Command::Run(job)).is_err() {
            debug!("Notification dispatcher closed, dropping job");
            return false;
        }
        true
    }

    /// Waits until every job posted before this call has run.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Command::Flush(done_tx)).is_err() {
            return;
        }
        let _ = done_rx.await;
    }
}

async fn run(mut rx: mpsc::UnboundedReceiver<Command>, cancel: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Notification dispatcher cancelled");
                break;
            }
            command = rx.recv() => match command {
                Some(Command::Run(job)) => {
                    if catch_unwind(AssertUnwindSafe(job)).is_err() {
                        error!("Store listener panicked");
                    }
                }
                Some(Command::Flush(done)) => {
                    let _ = done.send(());
                }
                None => break,
            },
        }
    }
}
