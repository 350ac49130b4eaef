//! Peripheral session core for the heater control board: an SSD1306 status
//! panel, DS18B20 temperature probes on a one-wire bus, and PWM-dimmed solid
//! state relays, each wrapped in an owned session with explicit init,
//! operate and teardown phases.
//!
//! Vendor drivers sit behind the [`display::Panel`], [`thermo::ProbeBus`],
//! [`thermo::ProbeDevice`] and [`dimmer::PwmChannel`] traits, and all timing
//! goes through an injected [`embedded_hal_async::delay::DelayNs`], so the
//! whole crate runs unmodified on the host for testing.

#![cfg_attr(not(test), no_std)]
#![allow(async_fn_in_trait)]

pub mod config;
pub mod dimmer;
pub mod display;
pub mod error;
pub mod slot;
pub mod tasks;
pub mod thermo;

#[cfg(test)]
pub(crate) mod testutil;

pub use error::Error;
