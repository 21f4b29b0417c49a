//! Event channel plumbing over crossbeam-channel.

use crossbeam_channel::{unbounded, Receiver, Sender};

use super::Event;

/// Sending half of the pipeline's event stream. Cheap to clone, safe to
/// share across worker threads.
#[derive(Clone)]
pub struct EventSender {
    inner: Sender<Event>,
}

impl EventSender {
    /// Send an event. If the receiver has been dropped the event is
    /// discarded: progress reporting is always optional.
    pub fn send(&self, event: Event) {
        let _ = self.inner.send(event);
    }
}

/// Receiving half, held by whoever renders progress.
pub struct EventReceiver {
    inner: Receiver<Event>,
}

impl EventReceiver {
    /// Block until the next event, or `None` once all senders are gone.
    pub fn recv(&self) -> Option<Event> {
        self.inner.recv().ok()
    }

    /// Non-blocking receive.
    pub fn try_recv(&self) -> Option<Event> {
        self.inner.try_recv().ok()
    }

    /// Iterate events until the pipeline drops its sender.
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.inner.iter()
    }
}

/// Create a connected sender/receiver pair.
pub struct EventChannel;

impl EventChannel {
    pub fn new() -> (EventSender, EventReceiver) {
        let (sender, receiver) = unbounded();
        (EventSender { inner: sender }, EventReceiver { inner: receiver })
    }
}

/// A sender with no receiver, for callers that don't want progress.
pub fn null_sender() -> EventSender {
    let (sender, _receiver) = EventChannel::new();
    sender
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::HashEvent;
    use std::thread;

    #[test]
    fn events_cross_threads() {
        let (sender, receiver) = EventChannel::new();

        let handle = thread::spawn(move || {
            sender.send(Event::Hash(HashEvent::Hashed {
                source: Some("a.png".to_string()),
            }));
        });
        handle.join().unwrap();

        match receiver.recv() {
            Some(Event::Hash(HashEvent::Hashed { source })) => {
                assert_eq!(source.as_deref(), Some("a.png"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn null_sender_discards_silently() {
        let sender = null_sender();
        // No receiver; must not block or panic.
        sender.send(Event::Pipeline(crate::events::PipelineEvent::Cancelled));
    }
}
