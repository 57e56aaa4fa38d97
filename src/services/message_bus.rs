use log::debug;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Messages exchanged between the foreground console and the background monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusMessage {
    IntervalChanged {
        interval_secs: u64,
    },
    StreamerLive {
        display_name: String,
        channel: String,
        title: String,
    },
}

/// Fan-out bus. Each subscriber gets its own unbounded queue, so a busy
/// listener falls behind but never loses a message.
#[derive(Clone, Default)]
pub struct MessageBus {
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<BusMessage>>>>,
}

impl MessageBus {
    /// Returns how many subscribers received the message.
    pub fn publish(&self, message: BusMessage) -> usize {
        let mut subscribers = match self.subscribers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        subscribers.retain(|tx| tx.send(message.clone()).is_ok());

        if subscribers.is_empty() {
            debug!("[Bus] No listeners for {:?}", message);
        }
        subscribers.len()
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<BusMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        match self.subscribers.lock() {
            Ok(mut guard) => guard.push(tx),
            Err(poisoned) => poisoned.into_inner().push(tx),
        }
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_every_subscriber() {
        let bus = MessageBus::default();
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        let message = BusMessage::IntervalChanged { interval_secs: 60 };
        assert_eq!(bus.publish(message.clone()), 2);
        assert_eq!(first.recv().await.unwrap(), message);
        assert_eq!(second.recv().await.unwrap(), message);
    }

    #[tokio::test]
    async fn test_slow_subscriber_keeps_every_message() {
        let bus = MessageBus::default();
        let mut rx = bus.subscribe();

        for interval_secs in 0..500 {
            bus.publish(BusMessage::IntervalChanged { interval_secs });
        }

        for interval_secs in 0..500 {
            assert_eq!(
                rx.recv().await.unwrap(),
                BusMessage::IntervalChanged { interval_secs }
            );
        }
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let bus = MessageBus::default();
        let kept = bus.subscribe();
        drop(bus.subscribe());

        assert_eq!(bus.publish(BusMessage::IntervalChanged { interval_secs: 10 }), 1);
        drop(kept);
    }

    #[test]
    fn test_publish_without_subscribers_is_harmless() {
        let bus = MessageBus::default();
        assert_eq!(
            bus.publish(BusMessage::IntervalChanged { interval_secs: 10 }),
            0
        );
    }
}
