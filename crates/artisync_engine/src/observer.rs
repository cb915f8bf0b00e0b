//! Pass observers.
//!
//! Observers are injected into the driver at construction and receive every
//! lifecycle change and every pass result.

use crate::error::{EngineError, EngineResult};
use crate::result::PassResult;
use artisync_core::Lifecycle;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// One lifecycle change of one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange {
    /// Family the pass ran for.
    pub family: String,
    /// Owning synchronizer id.
    pub synchronizer: String,
    /// Artifact location.
    pub location: String,
    /// Artifact name.
    pub name: String,
    /// Previous lifecycle, `None` for a first sighting.
    pub from: Option<Lifecycle>,
    /// New lifecycle.
    pub to: Lifecycle,
    /// Error message for failures.
    pub error: Option<String>,
}

/// Receives pass notifications.
pub trait PassObserver: Send + Sync {
    /// Called for every lifecycle change.
    fn on_state_change(&self, change: &StateChange);

    /// Called once per pass, including skipped and disabled passes.
    fn on_pass_result(&self, result: &PassResult);
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl PassObserver for NoopObserver {
    fn on_state_change(&self, _change: &StateChange) {}

    fn on_pass_result(&self, _result: &PassResult) {}
}

/// Observer that mirrors notifications into `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl PassObserver for TracingObserver {
    fn on_state_change(&self, change: &StateChange) {
        let from = change.from.map(|l| l.as_str()).unwrap_or("-");
        match &change.error {
            Some(error) => warn!(
                family = %change.family,
                synchronizer = %change.synchronizer,
                location = %change.location,
                name = %change.name,
                from,
                lifecycle = %change.to,
                error = %error,
                "artifact failed"
            ),
            None => debug!(
                family = %change.family,
                synchronizer = %change.synchronizer,
                location = %change.location,
                name = %change.name,
                from,
                lifecycle = %change.to,
                "artifact state changed"
            ),
        }
    }

    fn on_pass_result(&self, result: &PassResult) {
        if result.is_successful() {
            info!(family = %result.family, "{}", result.summary());
        } else {
            warn!(
                family = %result.family,
                diagnostics = result.diagnostics.len(),
                "{}",
                result.summary()
            );
        }
    }
}

/// An event emitted by a [`ChannelObserver`].
#[derive(Debug, Clone)]
pub enum PassEvent {
    /// A lifecycle change.
    StateChanged(StateChange),
    /// A finished pass.
    PassFinished(PassResult),
}

/// Observer that forwards events to a consumer thread.
///
/// Sends never block; events are dropped once the receiver is gone.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    sender: Sender<PassEvent>,
}

impl ChannelObserver {
    /// Creates an observer and the receiving end of its channel.
    #[must_use]
    pub fn new() -> (Self, Receiver<PassEvent>) {
        let (sender, receiver) = mpsc::channel();
        (Self { sender }, receiver)
    }

    /// Creates an observer whose events are consumed by `handler` on a
    /// dedicated thread.
    ///
    /// The thread exits once every clone of the observer is dropped; join the
    /// returned handle to wait for the remaining events.
    ///
    /// # Errors
    ///
    /// Returns an error if the consumer thread cannot be spawned.
    pub fn spawn<F>(mut handler: F) -> EngineResult<(Self, JoinHandle<()>)>
    where
        F: FnMut(PassEvent) + Send + 'static,
    {
        let (observer, events) = Self::new();
        let handle = thread::Builder::new()
            .name("artisync-observer".into())
            .spawn(move || {
                for event in events {
                    handler(event);
                }
            })
            .map_err(|e| EngineError::Scheduler(format!("cannot spawn observer thread: {e}")))?;
        Ok((observer, handle))
    }
}

impl PassObserver for ChannelObserver {
    fn on_state_change(&self, change: &StateChange) {
        let _ = self.sender.send(PassEvent::StateChanged(change.clone()));
    }

    fn on_pass_result(&self, result: &PassResult) {
        let _ = self.sender.send(PassEvent::PassFinished(result.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn change() -> StateChange {
        StateChange {
            family: "security".into(),
            synchronizer: "role".into(),
            location: "/a.roles".into(),
            name: "admin".into(),
            from: None,
            to: Lifecycle::New,
            error: None,
        }
    }

    #[test]
    fn channel_observer_forwards_events() {
        let (observer, events) = ChannelObserver::new();
        observer.on_state_change(&change());
        observer.on_pass_result(&PassResult::new("security", false));

        match events.recv().unwrap() {
            PassEvent::StateChanged(c) => assert_eq!(c.name, "admin"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(events.recv().unwrap(), PassEvent::PassFinished(r) if r.family == "security"));
    }

    #[test]
    fn spawned_observer_consumes_on_its_thread() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (observer, handle) = {
            let seen = Arc::clone(&seen);
            ChannelObserver::spawn(move |event| {
                let name = thread::current().name().map(str::to_string);
                seen.lock().push((event, name));
            })
            .unwrap()
        };
        observer.on_state_change(&change());
        observer.on_pass_result(&PassResult::new("security", false));
        drop(observer);
        handle.join().unwrap();

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert!(matches!(seen[0].0, PassEvent::StateChanged(ref c) if c.name == "admin"));
        assert!(matches!(seen[1].0, PassEvent::PassFinished(_)));
        assert!(seen.iter().all(|(_, name)| name.as_deref() == Some("artisync-observer")));
    }

    #[test]
    fn channel_observer_survives_dropped_receiver() {
        let (observer, events) = ChannelObserver::new();
        drop(events);
        observer.on_state_change(&change());
    }

    #[test]
    fn tracing_and_noop_observers_accept_events() {
        let mut failed = change();
        failed.to = Lifecycle::Failed;
        failed.error = Some("boom".into());
        for observer in [&TracingObserver as &dyn PassObserver, &NoopObserver] {
            observer.on_state_change(&change());
            observer.on_state_change(&failed);
            observer.on_pass_result(&PassResult::new("security", false));
        }
    }
}
