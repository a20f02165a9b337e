//! Embassy async tasks
//!
//! Peripheral tasks run their driver under `supervise`; the rest wait on
//! the signals in `channels`.

pub mod button;
pub mod led;
pub mod messaging;
pub mod sensors;
pub mod status;
pub mod wifi;

pub use button::setup_button_task;
pub use led::{led_control_task, led_fade_task, led_reconfigure_task};
pub use messaging::{publish_drain_task, topic_task};
pub use sensors::{ambient_task, binary_sensor_task};
pub use status::status_led_task;
pub use wifi::wifi_task;
