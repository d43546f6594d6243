//! Shared reconnect loop
//!
//! Transports only know how to run one session: open the connection, pump
//! messages into the sink, and return when it ends. [`run`] wraps such a
//! session function in the connection state machine and the backoff policy,
//! so every provider reconnects the same way.
//!
//! ```text
//! loop:
//!     state ← Reconnecting
//!     end   ← session(ctx)            (session sets Live itself on open)
//!     state ← Offline
//!     stop if cancelled
//!     sleep backoff.next_delay()      (reset first if the session had opened)
//! ```

use std::future::Future;

use greenhouse_core::ConnectionState;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::backoff::{Backoff, BackoffPolicy};
use crate::{EventSink, SharedStats};

/// How a single session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// The connection never opened
    Failed(String),
    /// The connection was live and then closed, with an error if any
    Closed(Option<String>),
    /// `disconnect` was called
    Cancelled,
}

/// Handles a session uses to report back
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Notification sink
    pub sink: EventSink,
    /// Provider statistics
    pub stats: SharedStats,
    /// Fires on `disconnect`
    pub cancel: CancellationToken,
}

impl SessionContext {
    /// Announce a successful open
    pub fn opened(&self) {
        self.stats.update(|s| s.connections += 1);
        self.sink.state(ConnectionState::Live);
    }
}

/// Run sessions until cancelled, backing off between them
pub async fn run<F, Fut>(
    name: &'static str,
    ctx: SessionContext,
    policy: BackoffPolicy,
    mut session: F,
) where
    F: FnMut(SessionContext) -> Fut,
    Fut: Future<Output = SessionEnd>,
{
    let mut backoff = Backoff::new(policy);

    loop {
        if ctx.cancel.is_cancelled() {
            break;
        }

        ctx.stats.update(|s| s.attempts += 1);
        ctx.sink.state(ConnectionState::Reconnecting);

        let end = session(ctx.clone()).await;
        match &end {
            SessionEnd::Failed(reason) => {
                log::warn!("{}: connection attempt failed: {}", name, reason);
                ctx.stats.update(|s| s.last_error = Some(reason.clone()));
            }
            SessionEnd::Closed(Some(reason)) => {
                log::warn!("{}: connection lost: {}", name, reason);
                ctx.stats.update(|s| s.last_error = Some(reason.clone()));
                backoff.reset();
            }
            SessionEnd::Closed(None) => {
                log::info!("{}: connection closed by peer", name);
                backoff.reset();
            }
            SessionEnd::Cancelled => {}
        }

        ctx.sink.state(ConnectionState::Offline);

        if end == SessionEnd::Cancelled || ctx.cancel.is_cancelled() {
            break;
        }
        if ctx.sink.is_closed() {
            log::debug!("{}: consumer gone, not reconnecting", name);
            break;
        }

        let delay = backoff.next_delay();
        log::info!("{}: reconnecting in {} ms", name, delay.as_millis());
        tokio::select! {
            _ = ctx.cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    log::debug!("{}: reconnect loop stopped", name);
}

/// Spawn `task` once `previous` has fully stopped
///
/// A provider reconnected right after `disconnect` still has its old task
/// winding down; chaining keeps that task's trailing `Offline` ahead of the
/// new connection's `Reconnecting`.
pub fn spawn_after<T>(name: &'static str, previous: Option<JoinHandle<()>>, task: T) -> JoinHandle<()>
where
    T: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        if let Some(previous) = previous {
            if let Err(e) = previous.await {
                log::error!("{}: previous connection task failed: {}", name, e);
            }
        }
        task.await;
    })
}
