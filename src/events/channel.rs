//! Crossbeam-backed event channel.
//!
//! Worker-pool tasks send from many threads at once; the CLI drains
//! the receiver on its own thread until every sender is gone.

use crossbeam_channel::{unbounded, Receiver, Sender};

use super::Event;

/// Sending half, cloned into every task that reports progress
#[derive(Clone)]
pub struct EventSender {
    inner: Sender<Event>,
}

impl EventSender {
    /// Fire and forget. A hung-up receiver only means nobody is listening.
    pub fn send(&self, event: Event) {
        let _ = self.inner.send(event);
    }
}

/// Receiving half, owned by whoever renders progress
pub struct EventReceiver {
    inner: Receiver<Event>,
}

impl EventReceiver {
    /// Events in send order; ends once every sender has been dropped
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.inner.iter()
    }
}

pub struct EventChannel;

impl EventChannel {
    /// Unbounded; `send` never blocks a worker
    pub fn new() -> (EventSender, EventReceiver) {
        let (sender, receiver) = unbounded();
        (
            EventSender { inner: sender },
            EventReceiver { inner: receiver },
        )
    }
}

/// Sender whose receiver is already gone, for runs without a listener
pub fn null_sender() -> EventSender {
    EventChannel::new().0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{PipelineEvent, PipelineStage, ScanEvent};
    use std::path::PathBuf;
    use std::thread;

    #[test]
    fn events_from_many_threads_all_arrive() {
        let (sender, receiver) = EventChannel::new();

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let sender = sender.clone();
                thread::spawn(move || {
                    sender.send(Event::Scan(ScanEvent::DuplicateSkipped {
                        path: PathBuf::from(format!("/photos/{}.jpg", i)),
                    }));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        drop(sender);

        let mut paths: Vec<PathBuf> = receiver
            .iter()
            .filter_map(|event| match event {
                Event::Scan(ScanEvent::DuplicateSkipped { path }) => Some(path),
                _ => None,
            })
            .collect();
        paths.sort();
        assert_eq!(paths.len(), 4);
        assert_eq!(paths[0], PathBuf::from("/photos/0.jpg"));
    }

    #[test]
    fn iteration_ends_when_senders_hang_up() {
        let (sender, receiver) = EventChannel::new();
        sender.send(Event::Pipeline(PipelineEvent::StageStarted {
            stage: PipelineStage::Collect,
        }));
        drop(sender);

        assert_eq!(receiver.iter().count(), 1);
    }

    #[test]
    fn null_sender_swallows_events() {
        null_sender().send(Event::Pipeline(PipelineEvent::Completed { duration_ms: 0 }));
    }
}
