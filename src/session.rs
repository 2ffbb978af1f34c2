// THEORY:
// A `DetectionSession` is the asynchronous front door of one `VisionPipeline`.
// It follows the actor pattern: a single task owns the pipeline (and
// therefore all tracker and speech state), and every other part of the program
// talks to it through a cloneable `SessionHandle` that sends messages over a
// bounded channel and awaits the answer on a oneshot.
//
// Key architectural principles:
// 1.  **Single Owner**: tracker state is only ever mutated by the actor,
//     so it never needs a lock.
// 2.  **Off The Reactor**: frame processing is CPU-bound, so the actor runs on
//     tokio's blocking pool (`spawn_blocking` + `blocking_recv`) and never
//     stalls an async worker thread.
// 3.  **One Frame In Flight**: a semaphore with a single permit guards frame
//     submission. `process` waits for the permit; `try_submit` gives up with
//     `SessionError::Busy` instead, which is how a live source drops frames
//     it cannot afford to queue. The permit travels to the actor with the
//     frame and back with the response, and is released when the caller
//     takes that response.
// 4.  **Isolation**: each session owns its own pipeline. Two sessions never
//     share identities.

use crate::config::DetectorSettings;
use crate::pipeline::VisionPipeline;
use crate::protocol::{FrameRequest, FrameResponse};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("A frame is already being processed; frame dropped")]
    Busy,

    #[error("Detection session has shut down")]
    Closed,
}

/// A response together with the in-flight permit of its frame.
type FrameReply = (FrameResponse, OwnedSemaphorePermit);

/// Messages understood by the session actor.
pub enum SessionMessage {
    Frame {
        request: FrameRequest,
        permit: OwnedSemaphorePermit,
        reply: oneshot::Sender<FrameReply>,
    },
    Reset {
        reply: oneshot::Sender<()>,
    },
    Shutdown,
}

/// Cloneable client side of a session.
#[derive(Clone)]
pub struct SessionHandle {
    sender: mpsc::Sender<SessionMessage>,
    in_flight: Arc<Semaphore>,
}

/// A frame accepted by `try_submit`. The session stays busy until
/// `response` has been awaited or this value is dropped.
pub struct PendingFrame {
    receiver: oneshot::Receiver<FrameReply>,
}

impl PendingFrame {
    pub async fn response(self) -> Result<FrameResponse, SessionError> {
        let (response, permit) = self.receiver.await.map_err(|_| SessionError::Closed)?;
        drop(permit);
        Ok(response)
    }
}

/// Spawns and owns the actor task.
pub struct DetectionSession;

impl DetectionSession {
    /// Starts a session on the blocking pool of the current tokio runtime.
    pub fn spawn(settings: DetectorSettings) -> (SessionHandle, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::channel::<SessionMessage>(1);
        let mut pipeline = VisionPipeline::new(settings);

        let task = tokio::task::spawn_blocking(move || {
            info!("detection session started");
            while let Some(message) = receiver.blocking_recv() {
                match message {
                    SessionMessage::Frame { request, permit, reply } => {
                        let response = pipeline.process(&request);
                        // A failed send hands the permit back and drops it here.
                        if reply.send((response, permit)).is_err() {
                            debug!("frame response discarded; caller went away");
                        }
                    }
                    SessionMessage::Reset { reply } => {
                        pipeline.reset();
                        let _ = reply.send(());
                    }
                    SessionMessage::Shutdown => break,
                }
            }
            info!("detection session stopped");
        });

        let handle = SessionHandle {
            sender,
            in_flight: Arc::new(Semaphore::new(1)),
        };
        (handle, task)
    }
}

impl SessionHandle {
    /// Processes a frame, waiting for any frame already in flight.
    pub async fn process(&self, request: FrameRequest) -> Result<FrameResponse, SessionError> {
        let permit = Arc::clone(&self.in_flight)
            .acquire_owned()
            .await
            .map_err(|_| SessionError::Closed)?;
        let (reply, receiver) = oneshot::channel();
        self.sender
            .send(SessionMessage::Frame { request, permit, reply })
            .await
            .map_err(|_| SessionError::Closed)?;
        PendingFrame { receiver }.response().await
    }

    /// Submits a frame only if no other frame is in flight.
    pub fn try_submit(&self, request: FrameRequest) -> Result<PendingFrame, SessionError> {
        let permit = Arc::clone(&self.in_flight)
            .try_acquire_owned()
            .map_err(|_| SessionError::Busy)?;
        let (reply, receiver) = oneshot::channel();
        self.sender
            .try_send(SessionMessage::Frame { request, permit, reply })
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => SessionError::Busy,
                mpsc::error::TrySendError::Closed(_) => SessionError::Closed,
            })?;
        Ok(PendingFrame { receiver })
    }

    /// Starts a new tracking session inside the same actor.
    pub async fn reset(&self) -> Result<(), SessionError> {
        let (reply, receiver) = oneshot::channel();
        self.sender
            .send(SessionMessage::Reset { reply })
            .await
            .map_err(|_| SessionError::Closed)?;
        receiver.await.map_err(|_| SessionError::Closed)
    }

    /// Asks the actor to stop after the messages already queued.
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.sender
            .send(SessionMessage::Shutdown)
            .await
            .map_err(|_| SessionError::Closed)
    }
}
