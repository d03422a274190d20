//! Streaming roster projections

use tokio::task::JoinHandle;

use mole_core::{MoleResult, PlayerId, Session, SessionId};
use mole_store::{Snapshot, Subscription};

use crate::{GameConfig, RosterView};

/// One step of a session as seen by a client
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WatchEvent {
    Updated(RosterView),
    /// The session was deleted (reaped, or never existed). Also reported
    /// for a remnant recreated by a write that raced the delete.
    Gone,
}

/// Subscription to one session, projected for one viewer.
/// Dropping it unsubscribes.
#[derive(Debug)]
pub struct SessionWatch {
    session_id: SessionId,
    viewer: PlayerId,
    config: GameConfig,
    subscription: Subscription,
}

impl SessionWatch {
    pub fn new(
        session_id: SessionId,
        viewer: PlayerId,
        config: GameConfig,
        subscription: Subscription,
    ) -> Self {
        SessionWatch {
            session_id,
            viewer,
            config,
            subscription,
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Wait for the next snapshot and project it.
    /// `None` once the store has gone away.
    pub async fn next(&mut self) -> Option<MoleResult<WatchEvent>> {
        let snapshot = self.subscription.recv().await?;
        Some(self.project(snapshot))
    }

    /// Project the next snapshot if one is already queued
    pub fn try_next(&mut self) -> Option<MoleResult<WatchEvent>> {
        let snapshot = self.subscription.try_recv()?;
        Some(self.project(snapshot))
    }

    fn project(&self, snapshot: Snapshot) -> MoleResult<WatchEvent> {
        match snapshot.value {
            Some(value) if Session::is_complete(&value) => {
                let session = Session::from_value(self.session_id.clone(), value)?;
                Ok(WatchEvent::Updated(RosterView::project(
                    &session,
                    &self.viewer,
                    &self.config,
                )))
            }
            // Absent, or only a remnant left by a write racing the delete
            _ => {
                tracing::debug!(session = %self.session_id, "watched session is gone");
                Ok(WatchEvent::Gone)
            }
        }
    }

    /// Drive the watch on a task, calling `on_event` for every projection
    /// until the store goes away or the task is aborted
    pub fn spawn<F>(mut self, mut on_event: F) -> JoinHandle<()>
    where
        F: FnMut(MoleResult<WatchEvent>) + Send + 'static,
    {
        tokio::spawn(async move {
            while let Some(event) = self.next().await {
                on_event(event);
            }
        })
    }
}
