//! Publish/subscribe contract
//!
//! The messaging client is not part of this crate. Peripherals publish
//! state through [`Publisher`] and register control handlers through
//! [`Subscriber`]. When a topic-name parameter changes, its group callback
//! is what prompts the owner to subscribe again.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;
use embedded_storage::nor_flash::NorFlash;
use heapless::{Deque, String, Vec};

use crate::access::ConfigAccess;
use crate::config::{Callback, ConfigError, ConfigStore, Value};

/// Maximum topic length in bytes
pub const MAX_TOPIC_LEN: usize = 64;

/// Maximum payload length in bytes
pub const MAX_PAYLOAD_LEN: usize = 64;

/// Errors from the messaging layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PublishError {
    /// Outbound queue is full
    QueueFull,
    /// Topic longer than [`MAX_TOPIC_LEN`]
    TopicTooLong,
    /// Payload longer than [`MAX_PAYLOAD_LEN`]
    PayloadTooLong,
    /// Subscription table is full
    TooManySubscriptions,
}

/// Handler for messages arriving on a subscribed topic
pub type MessageHandler = &'static (dyn Fn(&[u8]) + Sync);

/// Outbound messages
pub trait Publisher {
    /// Publish `payload` on `topic`; retained messages are kept by the broker
    fn publish(&self, topic: &str, payload: &[u8], retain: bool) -> Result<(), PublishError>;
}

/// Inbound messages
pub trait Subscriber {
    /// Route messages on `topic` to `handler`, replacing any previous
    /// handler for the same topic
    fn subscribe(&self, topic: &str, handler: MessageHandler) -> Result<(), PublishError>;
}

impl<T: Publisher + ?Sized> Publisher for &T {
    fn publish(&self, topic: &str, payload: &[u8], retain: bool) -> Result<(), PublishError> {
        (**self).publish(topic, payload, retain)
    }
}

impl<T: Subscriber + ?Sized> Subscriber for &T {
    fn subscribe(&self, topic: &str, handler: MessageHandler) -> Result<(), PublishError> {
        (**self).subscribe(topic, handler)
    }
}

/// Group shared by every topic-name parameter
pub const TOPIC_GROUP: &str = "mqtt_config";

/// Register a topic-name parameter
///
/// Control topics join [`TOPIC_GROUP`]; the first one creates the group
/// with `on_change`, later ones share that callback. Pass `None` for a
/// publish-only topic, which needs no re-subscription.
pub fn add_topic_param<'a, F: NorFlash>(
    store: &mut ConfigStore<'a, F>,
    name: &str,
    default: &str,
    on_change: Option<Callback<'a>>,
) -> Result<(), ConfigError> {
    let default = Value::str(default)?;
    match on_change {
        None => store.add_param(name, default, None, None, None),
        Some(_) if store.has_group(TOPIC_GROUP) => {
            store.add_param(name, default, None, None, Some(TOPIC_GROUP))
        }
        Some(callback) => store.add_param(name, default, None, Some(callback), Some(TOPIC_GROUP)),
    }
}

/// Current value of the topic-name parameter `name`
pub fn topic<A: ConfigAccess + ?Sized>(config: &A, name: &str) -> Option<String<MAX_TOPIC_LEN>> {
    config.read(|p| p.str(name).and_then(|t| String::try_from(t).ok()))
}

/// A message waiting in the outbound queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: String<MAX_TOPIC_LEN>,
    pub payload: Vec<u8, MAX_PAYLOAD_LEN>,
    pub retain: bool,
}

/// Outbound queue depth of [`LocalBroker`]
pub const QUEUE_DEPTH: usize = 16;

/// Subscription table size of [`LocalBroker`]
pub const MAX_SUBSCRIPTIONS: usize = 8;

struct BrokerState {
    queue: Deque<Message, QUEUE_DEPTH>,
    subscriptions: Vec<(String<MAX_TOPIC_LEN>, MessageHandler), MAX_SUBSCRIPTIONS>,
}

/// In-process broker
///
/// Queues outbound messages for a drain task and routes inbound messages
/// to subscribed handlers. Stands between the peripherals and whatever
/// messaging client the board runs.
pub struct LocalBroker {
    state: Mutex<CriticalSectionRawMutex, RefCell<BrokerState>>,
    ready: Signal<CriticalSectionRawMutex, ()>,
}

impl Default for LocalBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalBroker {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(BrokerState {
                queue: Deque::new(),
                subscriptions: Vec::new(),
            })),
            ready: Signal::new(),
        }
    }

    /// Take the oldest queued message
    pub fn pop(&self) -> Option<Message> {
        self.state.lock(|s| s.borrow_mut().queue.pop_front())
    }

    /// Wait until a message has been queued
    pub async fn wait(&self) {
        self.ready.wait().await
    }

    /// Number of queued messages
    pub fn pending(&self) -> usize {
        self.state.lock(|s| s.borrow().queue.len())
    }

    /// Whether a handler is registered for `topic`
    pub fn is_subscribed(&self, topic: &str) -> bool {
        self.handler(topic).is_some()
    }

    /// Hand an inbound message to the handler subscribed to `topic`
    ///
    /// Returns `false` if nobody is subscribed.
    pub fn deliver(&self, topic: &str, payload: &[u8]) -> bool {
        // Handler runs outside the lock so it may publish
        match self.handler(topic) {
            Some(handler) => {
                handler(payload);
                true
            }
            None => false,
        }
    }

    fn handler(&self, topic: &str) -> Option<MessageHandler> {
        self.state.lock(|s| {
            s.borrow()
                .subscriptions
                .iter()
                .find(|(t, _)| t.as_str() == topic)
                .map(|(_, h)| *h)
        })
    }
}

impl Publisher for LocalBroker {
    fn publish(&self, topic: &str, payload: &[u8], retain: bool) -> Result<(), PublishError> {
        let message = Message {
            topic: String::try_from(topic).map_err(|_| PublishError::TopicTooLong)?,
            payload: Vec::from_slice(payload).map_err(|_| PublishError::PayloadTooLong)?,
            retain,
        };
        self.state.lock(|s| {
            s.borrow_mut()
                .queue
                .push_back(message)
                .map_err(|_| PublishError::QueueFull)
        })?;
        self.ready.signal(());
        Ok(())
    }
}

impl Subscriber for LocalBroker {
    fn subscribe(&self, topic: &str, handler: MessageHandler) -> Result<(), PublishError> {
        let topic: String<MAX_TOPIC_LEN> =
            String::try_from(topic).map_err(|_| PublishError::TopicTooLong)?;
        self.state.lock(|s| {
            let mut s = s.borrow_mut();
            if let Some(slot) = s.subscriptions.iter_mut().find(|(t, _)| *t == topic) {
                slot.1 = handler;
                return Ok(());
            }
            s.subscriptions
                .push((topic, handler))
                .map_err(|_| PublishError::TooManySubscriptions)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portable_atomic::{AtomicU32, Ordering};

    static RECEIVED: AtomicU32 = AtomicU32::new(0);

    fn on_message(payload: &[u8]) {
        RECEIVED.store(payload.len() as u32, Ordering::Relaxed);
    }

    #[test]
    fn test_publish_queue_order() {
        let broker = LocalBroker::new();
        broker.publish("a", b"1", false).unwrap();
        broker.publish("b", b"22", true).unwrap();
        assert_eq!(broker.pending(), 2);

        let first = broker.pop().unwrap();
        assert_eq!(first.topic.as_str(), "a");
        assert_eq!(first.payload.as_slice(), b"1");
        assert!(!first.retain);
        assert!(broker.pop().unwrap().retain);
        assert!(broker.pop().is_none());
    }

    #[test]
    fn test_queue_full() {
        let broker = LocalBroker::new();
        for _ in 0..QUEUE_DEPTH {
            broker.publish("t", b"x", false).unwrap();
        }
        assert_eq!(
            broker.publish("t", b"x", false),
            Err(PublishError::QueueFull)
        );
    }

    #[test]
    fn test_topic_too_long() {
        let broker = LocalBroker::new();
        let topic = "t".repeat(MAX_TOPIC_LEN + 1);
        assert_eq!(
            broker.publish(&topic, b"x", false),
            Err(PublishError::TopicTooLong)
        );
    }

    #[test]
    fn test_subscribe_and_deliver() {
        let broker = LocalBroker::new();
        assert!(!broker.deliver("relay1/set", b"1"));

        broker.subscribe("relay1/set", &on_message).unwrap();
        // Re-subscribing replaces rather than duplicates
        broker.subscribe("relay1/set", &on_message).unwrap();
        assert!(broker.is_subscribed("relay1/set"));
        assert!(broker.deliver("relay1/set", b"abc"));
        assert_eq!(RECEIVED.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_topic_params_share_one_group() {
        use core::cell::RefCell;
        use pixelnode_hal::mock::MemFlash;
        use pixelnode_hal::{ConfigRegion, BLOCK_SIZE};

        static CHANGES: AtomicU32 = AtomicU32::new(0);
        let on_change = |_: &crate::ParamTable| {
            CHANGES.fetch_add(1, Ordering::Relaxed);
        };

        let region = ConfigRegion::new(MemFlash::<BLOCK_SIZE>::new(), 0).unwrap();
        let mut store = ConfigStore::new(region, false);
        add_topic_param(&mut store, "led_status", "led", None).unwrap();
        add_topic_param(&mut store, "led_control", "led/set", Some(&on_change)).unwrap();
        add_topic_param(&mut store, "relay1_control", "relay1/set", Some(&on_change)).unwrap();
        assert!(store.has_group(TOPIC_GROUP));

        let store = RefCell::new(store);
        store
            .update(&[
                ("led_control", Value::str("a").unwrap()),
                ("relay1_control", Value::str("b").unwrap()),
            ])
            .unwrap();
        assert_eq!(CHANGES.load(Ordering::Relaxed), 1);
        assert_eq!(topic(&store, "relay1_control").unwrap().as_str(), "b");
        assert_eq!(topic(&store, "missing"), None);
    }
}
