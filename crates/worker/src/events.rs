//! Worker event model.
//!
//! Every entry point into the worker is a tagged event, dispatched by
//! [`crate::Worker`] onto the owning component. Each event maps to one unit
//! of work the host platform awaits before considering the event handled;
//! that await is what guarantees, for example, that generation cleanup
//! finished before the next event runs.

use crate::control::ControlEnvelope;
use crate::notify::Notification;
use crate::strategy::FetchOutcome;
use offcache_core::Request;
use tokio::task::JoinHandle;

/// One inbound event from the host platform.
#[derive(Debug)]
pub enum Event {
    /// Precache the manifest into a fresh generation.
    Install,
    /// Promote the installed generation and garbage-collect the rest.
    Activate,
    /// An intercepted outbound resource request.
    Fetch(Request),
    /// A control-channel message from the hosting application.
    Message(ControlEnvelope),
    /// A background-sync wakeup with its tag.
    Sync(String),
    /// A push payload.
    Push(Vec<u8>),
}

/// What handling an event produced.
#[derive(Debug)]
pub enum Outcome {
    Installed,
    Activated,
    /// The resolved response for a Fetch event.
    Response(FetchOutcome),
    /// A control message was processed; CACHE_URLS hands back the handle
    /// of its detached work.
    MessageHandled(Option<JoinHandle<()>>),
    Synced,
    /// A push event produced a notification to surface.
    Notified(Notification),
}
