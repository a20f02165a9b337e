//! Binary GPIO sensor
//!
//! Woken by the pin interrupt through an [`IsrLatch`]; publishes `1` or
//! `0`, retained, whenever the level differs from the last one published.
//! The first step publishes the level found at start-up.

use embedded_storage::nor_flash::NorFlash;
use pixelnode_core::access::ConfigAccess;
use pixelnode_core::config::{ConfigError, ConfigStore};
use pixelnode_core::pubsub::{add_topic_param, topic, Publisher};
use pixelnode_core::task::{IsrLatch, Peripheral, TaskError, Wake};
use pixelnode_hal::InputPin;

/// Register the topic parameter `name` a sensor publishes to
pub fn register_params<F: NorFlash>(
    store: &mut ConfigStore<'_, F>,
    name: &str,
    default_topic: &str,
) -> Result<(), ConfigError> {
    add_topic_param(store, name, default_topic, None)
}

pub struct BinarySensor<'a, I, A, P> {
    pin: I,
    latch: &'a IsrLatch,
    config: A,
    publisher: P,
    topic_param: &'static str,
    last: Option<bool>,
}

impl<'a, I: InputPin, A: ConfigAccess, P: Publisher> BinarySensor<'a, I, A, P> {
    /// # Arguments
    /// * `pin` - Sensor input
    /// * `latch` - Latch fired by the pin's edge interrupt
    /// * `config` - Parameter access
    /// * `publisher` - State sink
    /// * `topic_param` - Name of the parameter holding the state topic
    pub fn new(
        pin: I,
        latch: &'a IsrLatch,
        config: A,
        publisher: P,
        topic_param: &'static str,
    ) -> Self {
        Self {
            pin,
            latch,
            config,
            publisher,
            topic_param,
            last: None,
        }
    }

    /// Last published level
    pub fn last(&self) -> Option<bool> {
        self.last
    }
}

impl<I: InputPin, A: ConfigAccess, P: Publisher> Peripheral for BinarySensor<'_, I, A, P> {
    fn name(&self) -> &'static str {
        "binary sensor"
    }

    fn step(&mut self, _now_ms: u32) -> Result<Wake, TaskError> {
        self.latch.take();
        let level = self.pin.is_high();

        if self.last != Some(level) {
            let topic = topic(&self.config, self.topic_param).ok_or(ConfigError::UnknownParam)?;
            let payload: &[u8] = if level { b"1" } else { b"0" };
            self.publisher.publish(&topic, payload, true)?;
            self.last = Some(level);
        }

        Ok(Wake::OnInterrupt)
    }
}
