//! Relay output
//!
//! A relay is switched through its REST resource or its control topic and
//! reports its state, `0` or `1`, retained on its status topic. Each relay
//! owns a numbered pair of topic parameters:
//!
//! ```text
//! mqtt_topic_relay<N>_status   default "relay<N>"
//! mqtt_topic_relay<N>_control  default "relay<N>/set", group mqtt_config
//! ```

use core::fmt::Write;

use embedded_storage::nor_flash::NorFlash;
use heapless::String;
use pixelnode_core::access::ConfigAccess;
use pixelnode_core::config::{Callback, ConfigError, ConfigStore};
use pixelnode_core::pubsub::{add_topic_param, topic, MessageHandler, PublishError, Publisher, Subscriber};
use pixelnode_core::resource::{write_message, ErrorResponse, Resource};
use pixelnode_hal::OutputPin;
use serde::{Deserialize, Serialize};

/// Longest generated parameter name or default topic
const NAME_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RelayError {
    /// State other than 0 or 1
    InvalidState,
    /// Body is not `{"state": n}`
    InvalidRequest,
}

impl From<RelayError> for ErrorResponse {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::InvalidState => ErrorResponse::new("Invalid state", 400),
            RelayError::InvalidRequest => ErrorResponse::new("malformed request", 400),
        }
    }
}

fn numbered(number: u8, suffix: &str) -> String<NAME_LEN> {
    let mut name = String::new();
    let _ = write!(name, "mqtt_topic_relay{}_{}", number, suffix);
    name
}

/// Name of the status topic parameter of relay `number`
pub fn status_param(number: u8) -> String<NAME_LEN> {
    numbered(number, "status")
}

/// Name of the control topic parameter of relay `number`
pub fn control_param(number: u8) -> String<NAME_LEN> {
    numbered(number, "control")
}

/// Register the topic parameters of relay `number`
///
/// # Arguments
/// * `store` - Store to register with
/// * `number` - Relay number, from 1
/// * `on_topics` - Called when a control topic changes
pub fn register_params<'a, F: NorFlash>(
    store: &mut ConfigStore<'a, F>,
    number: u8,
    on_topics: Callback<'a>,
) -> Result<(), ConfigError> {
    let mut status: String<NAME_LEN> = String::new();
    let mut control: String<NAME_LEN> = String::new();
    let _ = write!(status, "relay{}", number);
    let _ = write!(control, "relay{}/set", number);

    add_topic_param(store, &status_param(number), &status, None)?;
    add_topic_param(store, &control_param(number), &control, Some(on_topics))
}

#[derive(Deserialize, Serialize)]
struct StateBody {
    state: i32,
}

pub struct Relay<O, A, P> {
    number: u8,
    pin: O,
    config: A,
    publisher: P,
    state: bool,
}

impl<O: OutputPin, A: ConfigAccess, P: Publisher> Relay<O, A, P> {
    /// Create relay `number`, switched off
    pub fn new(number: u8, mut pin: O, config: A, publisher: P) -> Self {
        pin.set_low();
        Self {
            number,
            pin,
            config,
            publisher,
            state: false,
        }
    }

    pub fn number(&self) -> u8 {
        self.number
    }

    pub fn state(&self) -> i32 {
        i32::from(self.state)
    }

    /// Drive the relay to `state` (0 or 1) and publish it
    pub fn set_state(&mut self, state: i32) -> Result<(), RelayError> {
        let on = match state {
            0 => false,
            1 => true,
            _ => return Err(RelayError::InvalidState),
        };
        self.pin.set_state(on);
        self.state = on;
        info!("relay {=u8} set to {=i32}", self.number, state);
        self.publish_state();
        Ok(())
    }

    /// Apply a control-topic payload: `0` or `1`
    pub fn control(&mut self, payload: &[u8]) -> Result<(), RelayError> {
        let state = core::str::from_utf8(payload)
            .ok()
            .and_then(|s| s.trim().parse::<i32>().ok())
            .ok_or(RelayError::InvalidState)?;
        self.set_state(state)
    }

    /// Subscribe `handler` to the current control topic
    pub fn subscribe<T: Subscriber + ?Sized>(
        &self,
        subscriber: &T,
        handler: MessageHandler,
    ) -> Result<(), PublishError> {
        match topic(&self.config, &control_param(self.number)) {
            Some(topic) => subscriber.subscribe(&topic, handler),
            None => Ok(()),
        }
    }

    fn publish_state(&self) {
        let Some(topic) = topic(&self.config, &status_param(self.number)) else {
            return;
        };
        let payload: &[u8] = if self.state { b"1" } else { b"0" };
        if let Err(e) = self.publisher.publish(&topic, payload, true) {
            warn!("relay {=u8} state not published: {}", self.number, e);
        }
    }
}

impl<O: OutputPin, A: ConfigAccess, P: Publisher> Resource for Relay<O, A, P> {
    fn get(&mut self, out: &mut [u8]) -> Result<usize, ErrorResponse> {
        serde_json_core::to_slice(&StateBody { state: self.state() }, out)
            .map_err(|_| ErrorResponse::RESPONSE_TOO_LARGE)
    }

    fn post(&mut self, body: &[u8], out: &mut [u8]) -> Result<usize, ErrorResponse> {
        let (request, _) = serde_json_core::from_slice::<StateBody>(body)
            .map_err(|_| RelayError::InvalidRequest)?;
        self.set_state(request.state)?;
        write_message("OK", out)
    }
}
