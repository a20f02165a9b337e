//! Strip controller
//!
//! Binds a [`SharedEngine`] to the parameter store and the messaging
//! layer. Requests come in as JSON, from the REST layer (one resource per
//! [`Action`]) or from the control topic:
//!
//! ```text
//! {"pixels": {"1-10": "#ff0000", "11": "#00ff00"}, "length": 20, "delay": 20}
//! {"effect": "fade", "color": "#ffffff00"}
//! ```
//!
//! Without `pixels`, the whole strip takes `color`, or the last color the
//! strip was switched on with.

use core::fmt;
use core::marker::PhantomData;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_storage::nor_flash::NorFlash;
use heapless::{String, Vec};
use pixelnode_hal::{Clock, PixelStrip};
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;

use super::engine::{FadeOutcome, SharedEngine, Targets, MAX_EXPRS};
use super::expr::{parse_color, Color};
use super::LedError;
use crate::access::ConfigAccess;
use crate::config::{Callback, ConfigError, ConfigStore, Rejected, Value};
use crate::pubsub::{add_topic_param, topic, MessageHandler, PublishError, Publisher, Subscriber};
use crate::resource::{write_message, ErrorResponse, Resource};

/// Group of the strip geometry parameters
pub const NEOPIX_GROUP: &str = "neopix";

/// Color used by `on` when none was ever given
pub const DEFAULT_ON_COLOR: &str = "#ffffffff";

pub const DEFAULT_FADE_STEPS: u16 = 20;
pub const DEFAULT_FADE_DELAY_MS: u32 = 20;

pub const PARAM_COUNT: &str = "neopixel_cnt";
pub const PARAM_CHANNELS: &str = "neopixel_colors";
pub const PARAM_LAST_ON: &str = "led_last_on_color";
pub const PARAM_STATUS_TOPIC: &str = "mqtt_topic_led_status";
pub const PARAM_CONTROL_TOPIC: &str = "mqtt_topic_led_control";

fn validate_count(_name: &str, value: &Value) -> Result<(), Rejected> {
    match value {
        Value::Int(1..=500) => Ok(()),
        _ => Err(Rejected),
    }
}

fn validate_channels(_name: &str, value: &Value) -> Result<(), Rejected> {
    match value {
        Value::Int(3 | 4) => Ok(()),
        _ => Err(Rejected),
    }
}

fn validate_color(_name: &str, value: &Value) -> Result<(), Rejected> {
    match value.as_str().map(parse_color) {
        Some(Ok(_)) => Ok(()),
        _ => Err(Rejected),
    }
}

/// Register the strip parameters
///
/// # Arguments
/// * `store` - Store to register with
/// * `on_geometry` - Called when pixel or channel count change
/// * `on_topics` - Called when a control topic changes
pub fn register_params<'a, F: NorFlash>(
    store: &mut ConfigStore<'a, F>,
    on_geometry: Callback<'a>,
    on_topics: Callback<'a>,
) -> Result<(), ConfigError> {
    store.add_param(
        PARAM_COUNT,
        Value::Int(1),
        Some(validate_count),
        Some(on_geometry),
        Some(NEOPIX_GROUP),
    )?;
    store.add_param(
        PARAM_CHANNELS,
        Value::Int(3),
        Some(validate_channels),
        None,
        Some(NEOPIX_GROUP),
    )?;
    store.add_param(
        PARAM_LAST_ON,
        Value::str(DEFAULT_ON_COLOR)?,
        Some(validate_color),
        None,
        None,
    )?;
    add_topic_param(store, PARAM_STATUS_TOPIC, "neopixel/led", None)?;
    add_topic_param(store, PARAM_CONTROL_TOPIC, "neopixel/led/set", Some(on_topics))
}

/// Strip actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Action {
    On,
    Off,
    Fade,
}

impl Action {
    pub fn parse(name: &str) -> Result<Self, LedError> {
        match name {
            "on" => Ok(Action::On),
            "off" => Ok(Action::Off),
            "fade" => Ok(Action::Fade),
            _ => Err(LedError::UnknownEffect),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::On => "on",
            Action::Off => "off",
            Action::Fade => "fade",
        }
    }
}

/// `"<range>": "<color>"` pairs in body order
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PixelMap<'a>(pub Vec<(&'a str, &'a str), MAX_EXPRS>);

impl<'de: 'a, 'a> Deserialize<'de> for PixelMap<'a> {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        struct PixelVisitor<'a>(PhantomData<&'a ()>);

        impl<'de: 'a, 'a> Visitor<'de> for PixelVisitor<'a> {
            type Value = PixelMap<'a>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object of range: color pairs")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut pairs = Vec::new();
                while let Some(pair) = map.next_entry::<&'de str, &'de str>()? {
                    pairs
                        .push(pair)
                        .map_err(|_| de::Error::invalid_length(MAX_EXPRS + 1, &self))?;
                }
                Ok(PixelMap(pairs))
            }
        }

        d.deserialize_map(PixelVisitor(PhantomData))
    }
}

/// Request body shared by every action
#[derive(Debug, Default, PartialEq, Eq, Deserialize)]
pub struct LedRequest<'a> {
    #[serde(borrow, default)]
    pub pixels: Option<PixelMap<'a>>,
    #[serde(borrow, default)]
    pub color: Option<&'a str>,
    /// Fade steps
    #[serde(default)]
    pub length: Option<u16>,
    /// Milliseconds between fade steps
    #[serde(default)]
    pub delay: Option<u32>,
    /// Action, for requests arriving on the control topic
    #[serde(borrow, default)]
    pub effect: Option<&'a str>,
}

impl<'a> LedRequest<'a> {
    /// Parse a JSON body; an empty body is an empty request
    pub fn parse(body: &'a [u8]) -> Result<Self, LedError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json_core::from_slice(body)
            .map(|(request, _)| request)
            .map_err(|_| LedError::InvalidRequest)
    }
}

/// Strip behaviour on top of a shared engine
pub struct StripController<'a, M: RawMutex, S, A: ?Sized, P: ?Sized> {
    engine: &'a SharedEngine<M, S>,
    config: &'a A,
    publisher: &'a P,
}

impl<'a, M, S, A, P> StripController<'a, M, S, A, P>
where
    M: RawMutex,
    S: PixelStrip,
    A: ConfigAccess + ?Sized,
    P: Publisher + ?Sized,
{
    pub fn new(engine: &'a SharedEngine<M, S>, config: &'a A, publisher: &'a P) -> Self {
        Self {
            engine,
            config,
            publisher,
        }
    }

    pub fn engine(&self) -> &'a SharedEngine<M, S> {
        self.engine
    }

    /// Whether any pixel is lit
    pub fn is_on(&self) -> bool {
        self.engine.lock(|e| e.is_lit())
    }

    /// Resize the buffer from the geometry parameters
    pub fn reconfigure(&self) -> Result<(), LedError> {
        let (count, channels) = self.config.read(|p| (p.int(PARAM_COUNT), p.int(PARAM_CHANNELS)));
        let count = count
            .and_then(|c| u16::try_from(c).ok())
            .ok_or(LedError::InvalidCount)?;
        let channels = channels
            .and_then(|c| u8::try_from(c).ok())
            .ok_or(LedError::InvalidChannels)?;
        self.engine.lock(|e| e.reconfigure(count, channels))
    }

    /// Run `action` with the parameters in `request`
    pub fn handle(&self, action: Action, request: &LedRequest<'_>) -> Result<(), LedError> {
        debug!("led action {=str}", action.as_str());
        match action {
            Action::Off => {
                self.engine.lock(|e| e.fill(Color::BLACK))?;
                self.publish_state(Color::BLACK);
            }
            Action::On => {
                let targets = self.targets(request)?;
                self.engine.lock(|e| e.set_targets(&targets))?;
                self.publish_state(last_color(&targets));
            }
            Action::Fade => {
                let targets = self.targets(request)?;
                let last = last_color(&targets);
                let steps = request.length.unwrap_or(DEFAULT_FADE_STEPS);
                let delay = request.delay.unwrap_or(DEFAULT_FADE_DELAY_MS);
                if self.engine.fade_to(targets, steps, delay)?.is_none() {
                    self.publish_state(last);
                }
            }
        }
        Ok(())
    }

    /// Parse `body` and run `action`
    pub fn post(&self, action: Action, body: &[u8]) -> Result<(), LedError> {
        self.handle(action, &LedRequest::parse(body)?)
    }

    /// Handle a message from the control topic; `effect` picks the action
    pub fn control(&self, payload: &[u8]) -> Result<(), LedError> {
        let request = LedRequest::parse(payload)?;
        let action = Action::parse(request.effect.unwrap_or("on"))?;
        self.handle(action, &request)
    }

    /// Subscribe `handler` to the current control topic
    pub fn subscribe<T: Subscriber + ?Sized>(
        &self,
        subscriber: &T,
        handler: MessageHandler,
    ) -> Result<(), PublishError> {
        let control = topic(self.config, PARAM_CONTROL_TOPIC).ok_or(PublishError::TopicTooLong)?;
        subscriber.subscribe(&control, handler)
    }

    /// Wait for the next fade and drive it, and any fade replacing it, to
    /// the end; publishes the final color on completion
    pub async fn run_next_fade<C: Clock>(&self, clock: &C) -> Result<FadeOutcome, LedError> {
        let mut generation = self.engine.next_fade().await;
        loop {
            match self.engine.run_fade(generation, clock).await? {
                FadeOutcome::Superseded(next) => generation = next,
                FadeOutcome::Completed(color) => {
                    self.publish_state(color);
                    return Ok(FadeOutcome::Completed(color));
                }
                FadeOutcome::Cancelled => return Ok(FadeOutcome::Cancelled),
            }
        }
    }

    /// Parse the request's pixels, or fill with its color; remembers a
    /// given color as the last-on color
    fn targets(&self, request: &LedRequest<'_>) -> Result<Targets, LedError> {
        let color: String<16> = match request.color {
            Some(color) => String::try_from(color).map_err(|_| LedError::InvalidRequest)?,
            None => self
                .config
                .read(|p| p.str(PARAM_LAST_ON).and_then(|c| String::try_from(c).ok()))
                .ok_or(LedError::InvalidRequest)?,
        };

        let fill = [("all", color.as_str())];
        let pixels = match &request.pixels {
            Some(map) => map.0.as_slice(),
            None => &fill[..],
        };
        let targets = self.engine.lock(|e| e.parse_targets(pixels))?;

        if let Some(given) = request.color {
            parse_color(given)?;
            self.config.update(&[(PARAM_LAST_ON, Value::str(given)?)])?;
        }
        Ok(targets)
    }

    fn publish_state(&self, color: Color) {
        let Some(status) = topic(self.config, PARAM_STATUS_TOPIC) else {
            return;
        };
        if let Err(e) = self.publisher.publish(&status, color.to_hex().as_bytes(), true) {
            warn!("led status not published: {}", e);
        }
    }
}

fn last_color(targets: &Targets) -> Color {
    targets.last().map(|&(_, color)| color).unwrap_or_default()
}

/// REST endpoint for one strip action
pub struct LedResource<'c, 'a, M: RawMutex, S, A: ?Sized, P: ?Sized> {
    controller: &'c StripController<'a, M, S, A, P>,
    action: Action,
}

impl<'c, 'a, M: RawMutex, S, A: ?Sized, P: ?Sized> LedResource<'c, 'a, M, S, A, P> {
    pub fn new(controller: &'c StripController<'a, M, S, A, P>, action: Action) -> Self {
        Self { controller, action }
    }
}

impl<M, S, A, P> Resource for LedResource<'_, '_, M, S, A, P>
where
    M: RawMutex,
    S: PixelStrip,
    A: ConfigAccess + ?Sized,
    P: Publisher + ?Sized,
{
    fn get(&mut self, out: &mut [u8]) -> Result<usize, ErrorResponse> {
        self.post(b"", out)
    }

    fn post(&mut self, body: &[u8], out: &mut [u8]) -> Result<usize, ErrorResponse> {
        self.controller.post(self.action, body)?;
        write_message("color changed", out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request() {
        let request = LedRequest::parse(
            br##"{"pixels": {"1-3": "#ff0000", "all": "0x00ff00"}, "length": 5, "extra": [1]}"##,
        )
        .unwrap();
        let pixels = request.pixels.unwrap();
        assert_eq!(pixels.0.as_slice(), &[("1-3", "#ff0000"), ("all", "0x00ff00")]);
        assert_eq!(request.length, Some(5));
        assert_eq!(request.delay, None);
        assert_eq!(request.color, None);
    }

    #[test]
    fn test_parse_empty_and_malformed() {
        assert_eq!(LedRequest::parse(b""), Ok(LedRequest::default()));
        assert_eq!(LedRequest::parse(b"  \n"), Ok(LedRequest::default()));
        assert_eq!(LedRequest::parse(b"{"), Err(LedError::InvalidRequest));
        assert_eq!(
            LedRequest::parse(br#"{"pixels": {"1": 5}}"#),
            Err(LedError::InvalidRequest)
        );
    }

    #[test]
    fn test_actions() {
        assert_eq!(Action::parse("fade"), Ok(Action::Fade));
        assert_eq!(Action::parse("rainbow"), Err(LedError::UnknownEffect));
        assert_eq!(ErrorResponse::from(LedError::UnknownEffect).code, 404);
    }

    #[test]
    fn test_validators() {
        assert!(validate_count("n", &Value::Int(500)).is_ok());
        assert!(validate_count("n", &Value::Int(0)).is_err());
        assert!(validate_channels("n", &Value::Int(4)).is_ok());
        assert!(validate_channels("n", &Value::Int(5)).is_err());
        assert!(validate_color("c", &Value::str("#ffffffff").unwrap()).is_ok());
        assert!(validate_color("c", &Value::str("white").unwrap()).is_err());
    }
}
