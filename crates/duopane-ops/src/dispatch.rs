//! Marshalling callbacks onto the presentation thread.

use std::fmt;

use tokio::sync::mpsc;

/// A callback waiting to run on the presentation thread.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs callbacks on the thread that owns the user interface.
pub trait Dispatcher: Send + Sync {
    /// Queue `job` for the presentation thread.
    fn dispatch(&self, job: Job);
}

/// Runs every job immediately on the calling thread.
///
/// Useful for headless front ends and tests where no UI thread exists.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineDispatcher;

impl Dispatcher for InlineDispatcher {
    fn dispatch(&self, job: Job) {
        job();
    }
}

/// Sends jobs over a channel that the presentation thread drains.
#[derive(Clone)]
pub struct ChannelDispatcher {
    tx: mpsc::UnboundedSender<Job>,
}

impl ChannelDispatcher {
    /// Create a dispatcher and the queue the presentation thread drains.
    pub fn new() -> (Self, DispatchQueue) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, DispatchQueue { rx })
    }
}

impl Dispatcher for ChannelDispatcher {
    fn dispatch(&self, job: Job) {
        if self.tx.send(job).is_err() {
            tracing::debug!("Dispatch queue closed, dropping callback");
        }
    }
}

impl fmt::Debug for ChannelDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelDispatcher")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

/// The receiving end of a [`ChannelDispatcher`], owned by the presentation
/// thread.
pub struct DispatchQueue {
    rx: mpsc::UnboundedReceiver<Job>,
}

impl DispatchQueue {
    /// Wait for the next job without running it.
    pub async fn next(&mut self) -> Option<Job> {
        self.rx.recv().await
    }

    /// Block the current (non-async) thread until the next job arrives.
    pub fn blocking_next(&mut self) -> Option<Job> {
        self.rx.blocking_recv()
    }

    /// Run every job already queued. Returns how many ran.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            job();
            ran += 1;
        }
        ran
    }
}

impl fmt::Debug for DispatchQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchQueue").finish_non_exhaustive()
    }
}
