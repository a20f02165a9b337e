//! Ambient light sensor
//!
//! Polls one ADC channel and publishes the raw reading, retained, when it
//! has moved more than the threshold away from the last published value.

use embedded_storage::nor_flash::NorFlash;
use pixelnode_core::access::ConfigAccess;
use pixelnode_core::config::{ConfigError, ConfigStore, Rejected, Value};
use pixelnode_core::pubsub::{add_topic_param, topic, Publisher};
use pixelnode_core::task::{Peripheral, TaskError, Wake};
use pixelnode_hal::AnalogInput;

use crate::decimal;

pub const PARAM_TOPIC: &str = "mqtt_topic_sensor_light";
pub const PARAM_INTERVAL: &str = "sensor_ambient_interval";
pub const PARAM_THRESHOLD: &str = "sensor_ambient_threshold";

pub const DEFAULT_TOPIC: &str = "neopixel/sensor/light";

/// Seconds between readings
pub const DEFAULT_INTERVAL_S: i32 = 60;

pub const DEFAULT_THRESHOLD: i32 = 10;

fn validate_interval(_name: &str, value: &Value) -> Result<(), Rejected> {
    match value {
        Value::Int(1..=86_400) => Ok(()),
        _ => Err(Rejected),
    }
}

fn validate_threshold(_name: &str, value: &Value) -> Result<(), Rejected> {
    match value {
        Value::Int(v) if *v >= 0 => Ok(()),
        _ => Err(Rejected),
    }
}

/// Register the sensor topic, interval and threshold
pub fn register_params<F: NorFlash>(store: &mut ConfigStore<'_, F>) -> Result<(), ConfigError> {
    add_topic_param(store, PARAM_TOPIC, DEFAULT_TOPIC, None)?;
    store.add_param(
        PARAM_INTERVAL,
        Value::Int(DEFAULT_INTERVAL_S),
        Some(validate_interval),
        None,
        None,
    )?;
    store.add_param(
        PARAM_THRESHOLD,
        Value::Int(DEFAULT_THRESHOLD),
        Some(validate_threshold),
        None,
        None,
    )
}

pub struct AmbientSensor<S, A, P> {
    adc: S,
    config: A,
    publisher: P,
    last: i32,
}

impl<S: AnalogInput, A: ConfigAccess, P: Publisher> AmbientSensor<S, A, P> {
    pub fn new(adc: S, config: A, publisher: P) -> Self {
        Self {
            adc,
            config,
            publisher,
            last: 0,
        }
    }

    /// Last published reading
    pub fn last(&self) -> i32 {
        self.last
    }

    fn interval_ms(&self) -> u32 {
        let seconds = self.config.int(PARAM_INTERVAL).unwrap_or(DEFAULT_INTERVAL_S);
        (seconds.max(1) as u32).saturating_mul(1000)
    }
}

impl<S: AnalogInput, A: ConfigAccess, P: Publisher> Peripheral for AmbientSensor<S, A, P> {
    fn name(&self) -> &'static str {
        "ambient sensor"
    }

    fn step(&mut self, _now_ms: u32) -> Result<Wake, TaskError> {
        let value = i32::from(self.adc.read()?);
        let threshold = self.config.int(PARAM_THRESHOLD).unwrap_or(DEFAULT_THRESHOLD);

        if (value - self.last).abs() > threshold {
            let topic = topic(&self.config, PARAM_TOPIC).ok_or(ConfigError::UnknownParam)?;
            self.publisher
                .publish(&topic, decimal(value).as_bytes(), true)?;
            debug!("ambient light {=i32}", value);
            self.last = value;
        }

        Ok(Wake::After(self.interval_ms()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::{Cell, RefCell};

    use pixelnode_core::pubsub::LocalBroker;
    use pixelnode_hal::mock::{MemFlash, MockAnalog};
    use pixelnode_hal::{AnalogError, ConfigRegion, BLOCK_SIZE};

    fn store<'a>() -> RefCell<ConfigStore<'a, MemFlash<BLOCK_SIZE>>> {
        let region = ConfigRegion::new(MemFlash::new(), 0).unwrap();
        let mut store = ConfigStore::new(region, false);
        register_params(&mut store).unwrap();
        RefCell::new(store)
    }

    #[test]
    fn test_publishes_on_threshold_delta() {
        let config = store();
        let broker = LocalBroker::new();
        let reading = Cell::new(5);
        let mut sensor = AmbientSensor::new(MockAnalog::new(&reading), &config, &broker);

        // Within threshold of the initial 0
        assert_eq!(sensor.step(0).unwrap(), Wake::After(60_000));
        assert_eq!(broker.pending(), 0);

        reading.set(200);
        sensor.step(0).unwrap();
        let message = broker.pop().unwrap();
        assert_eq!(message.topic.as_str(), DEFAULT_TOPIC);
        assert_eq!(message.payload.as_slice(), b"200");
        assert!(message.retain);

        // Compared against the last published value, not the last reading
        reading.set(206);
        sensor.step(0).unwrap();
        reading.set(211);
        sensor.step(0).unwrap();
        assert_eq!(broker.pop().unwrap().payload.as_slice(), b"211");
        assert_eq!(sensor.last(), 211);
    }

    #[test]
    fn test_interval_and_threshold_follow_config() {
        let config = store();
        config
            .borrow_mut()
            .update(&[(PARAM_INTERVAL, Value::Int(5)), (PARAM_THRESHOLD, Value::Int(0))])
            .unwrap();
        let broker = LocalBroker::new();
        let reading = Cell::new(1);
        let mut sensor = AmbientSensor::new(MockAnalog::new(&reading), &config, &broker);

        assert_eq!(sensor.step(0).unwrap(), Wake::After(5000));
        assert_eq!(broker.pop().unwrap().payload.as_slice(), b"1");
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let config = store();
        assert_eq!(
            config.borrow_mut().update(&[(PARAM_INTERVAL, Value::Int(0))]),
            Err(ConfigError::ValidationFailed)
        );
        assert_eq!(
            config.borrow_mut().update(&[(PARAM_THRESHOLD, Value::Int(-1))]),
            Err(ConfigError::ValidationFailed)
        );
    }

    #[test]
    fn test_read_failure_is_a_task_error() {
        let config = store();
        let broker = LocalBroker::new();
        let reading = Cell::new(u16::MAX);
        let mut sensor = AmbientSensor::new(MockAnalog::new(&reading), &config, &broker);

        assert_eq!(
            sensor.step(0),
            Err(TaskError::Analog(AnalogError::Conversion))
        );
        assert_eq!(sensor.last(), 0);
    }
}
