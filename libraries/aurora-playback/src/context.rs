//! Device-control execution context
//!
//! One dedicated thread runs every hardware call and every completion
//! handler, in submission order. Callers post work and return immediately;
//! [`DeviceContext::run`] is available when the caller needs the result.

use crate::error::{PlaybackError, Result};
use crossbeam_channel::{bounded, unbounded, Sender};
use std::sync::{Mutex, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};

type Job = Box<dyn FnOnce() + Send>;

enum Message {
    Run(Job),
    Shutdown,
}

pub struct DeviceContext {
    sender: Sender<Message>,
    thread_id: ThreadId,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl DeviceContext {
    pub fn spawn(name: &str) -> Result<Self> {
        let (sender, receiver) = unbounded::<Message>();

        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                while let Ok(message) = receiver.recv() {
                    match message {
                        Message::Run(job) => job(),
                        Message::Shutdown => break,
                    }
                }
                tracing::debug!("Device control thread exiting");
            })
            .map_err(|e| PlaybackError::Device(format!("Failed to spawn device thread: {}", e)))?;

        Ok(Self {
            sender,
            thread_id: handle.thread().id(),
            handle: Mutex::new(Some(handle)),
        })
    }

    /// True when called from the context's own thread
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    /// Queue `job` behind everything already posted
    pub fn post(&self, job: impl FnOnce() + Send + 'static) -> Result<()> {
        post(&self.sender, job)
    }

    /// Cheap handle for posting from other threads (audio callbacks)
    pub fn handle(&self) -> ContextHandle {
        ContextHandle {
            sender: self.sender.clone(),
        }
    }

    /// Queue `job` and wait for its result
    ///
    /// Runs inline when already on the context thread, which would otherwise
    /// wait on itself.
    pub fn run<R: Send + 'static>(&self, job: impl FnOnce() -> R + Send + 'static) -> Result<R> {
        if self.is_current() {
            return Ok(job());
        }

        let (tx, rx) = bounded(1);
        self.post(move || {
            let _ = tx.send(job());
        })?;
        rx.recv().map_err(|_| PlaybackError::ContextClosed)
    }
}

/// Posting end of a [`DeviceContext`]
///
/// Does not keep the context thread alive: once the context is dropped,
/// posting fails with [`PlaybackError::ContextClosed`] or the job is dropped
/// unrun.
#[derive(Clone)]
pub struct ContextHandle {
    sender: Sender<Message>,
}

impl ContextHandle {
    pub fn post(&self, job: impl FnOnce() + Send + 'static) -> Result<()> {
        post(&self.sender, job)
    }
}

fn post(sender: &Sender<Message>, job: impl FnOnce() + Send + 'static) -> Result<()> {
    sender
        .send(Message::Run(Box::new(job)))
        .map_err(|_| PlaybackError::ContextClosed)
}

impl Drop for DeviceContext {
    fn drop(&mut self) {
        let _ = self.sender.send(Message::Shutdown);
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        // the last owner may be a job running on the context itself
        if let Some(handle) = handle {
            if !self.is_current() {
                let _ = handle.join();
            }
        }
    }
}
