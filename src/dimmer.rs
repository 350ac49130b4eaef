use core::fmt::Debug;

use log::{error, warn};

use crate::config::{
    DEFAULT_SSR_CHANNEL, DEFAULT_SSR_FREQUENCY_HZ, DEFAULT_SSR_PIN, DEFAULT_SSR_RESOLUTION_BITS,
    SSR_MAX_RESOLUTION_BITS,
};
use crate::error::Error;

/// Output level a stopped PWM channel parks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IdleLevel {
    #[default]
    Low,
    High,
}

/// PWM timer/channel pair as exposed by the platform driver.
pub trait PwmChannel {
    type Error: Debug;

    /// Configure the timer and channel for `config`, leaving the output
    /// stopped at zero duty.
    fn configure(&mut self, config: &SsrConfig) -> Result<(), Self::Error>;

    /// Set and commit a new duty value. The caller guarantees the value fits
    /// the configured resolution.
    fn set_duty(&mut self, duty: u32) -> Result<(), Self::Error>;

    /// Stop the channel, parking the output at `idle`.
    fn stop(&mut self, idle: IdleLevel) -> Result<(), Self::Error>;
}

/// Drive parameters for one solid-state relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SsrConfig {
    pub pin: u8,
    pub channel: u8,
    pub resolution_bits: u8,
    pub frequency_hz: u16,
    pub idle_level: IdleLevel,
}

impl Default for SsrConfig {
    fn default() -> Self {
        Self {
            pin: DEFAULT_SSR_PIN,
            channel: DEFAULT_SSR_CHANNEL,
            resolution_bits: DEFAULT_SSR_RESOLUTION_BITS,
            frequency_hz: DEFAULT_SSR_FREQUENCY_HZ,
            idle_level: IdleLevel::Low,
        }
    }
}

impl SsrConfig {
    /// Largest duty value expressible at the configured resolution.
    /// Saturates at `u32::MAX` for resolutions wider than the counter;
    /// [`Ssr::init`] rejects those before a session exists.
    pub fn max_duty(&self) -> u32 {
        1u32.checked_shl(self.resolution_bits as u32)
            .map_or(u32::MAX, |steps| steps - 1)
    }

    fn validate(&self) -> Result<(), Error> {
        if self.resolution_bits == 0 || self.resolution_bits > SSR_MAX_RESOLUTION_BITS {
            return Err(Error::InvalidArgument("resolution out of range"));
        }
        if self.frequency_hz == 0 {
            return Err(Error::InvalidArgument("frequency is zero"));
        }
        Ok(())
    }
}

/// One solid-state relay behind a PWM channel.
///
/// [`Ssr::init`] configures the underlying timer and channel; the output
/// starts stopped. Duty values are validated against the configured
/// resolution before the driver is touched.
pub struct Ssr<C: PwmChannel> {
    channel: Option<C>,
    config: SsrConfig,
}

impl<C: PwmChannel> Ssr<C> {
    /// Configure `channel` for `config` and wrap it as a session.
    pub fn init(mut channel: C, config: SsrConfig) -> Result<Self, Error> {
        config.validate()?;
        if let Err(e) = channel.configure(&config) {
            error!("SSR channel {} configuration failed: {:?}", config.channel, e);
            return Err(Error::DriverInit);
        }
        Ok(Self {
            channel: Some(channel),
            config,
        })
    }

    /// Drive parameters this session was configured with.
    pub fn config(&self) -> &SsrConfig {
        &self.config
    }

    /// Apply a new duty value.
    ///
    /// Zero stops the channel at the idle level. A value above
    /// `config().max_duty()` is rejected without touching the hardware.
    pub fn set_duty(&mut self, duty: u32) -> Result<(), Error> {
        let channel = self.channel.as_mut().ok_or(Error::NotInitialized)?;
        let max_duty = self.config.max_duty();
        if duty > max_duty {
            error!(
                "duty {} exceeds maximum {} at {} bit(s)",
                duty, max_duty, self.config.resolution_bits
            );
            return Err(Error::InvalidArgument("duty exceeds resolution maximum"));
        }
        let result = if duty == 0 {
            channel.stop(self.config.idle_level)
        } else {
            channel.set_duty(duty)
        };
        result.map_err(|e| {
            warn!(
                "SSR channel {} duty update failed: {:?}",
                self.config.channel, e
            );
            Error::OperationFailed
        })
    }

    /// Stop the output regardless of the last duty value.
    pub fn turn_off(&mut self) -> Result<(), Error> {
        let channel = self.channel.as_mut().ok_or(Error::NotInitialized)?;
        channel.stop(self.config.idle_level).map_err(|e| {
            warn!("SSR channel {} stop failed: {:?}", self.config.channel, e);
            Error::OperationFailed
        })
    }

    /// Stop the output and release the channel. A second call returns
    /// [`Error::NotInitialized`].
    pub fn teardown(&mut self) -> Result<(), Error> {
        let mut channel = self.channel.take().ok_or(Error::NotInitialized)?;
        if let Err(e) = channel.stop(self.config.idle_level) {
            warn!(
                "SSR channel {} stop during teardown failed: {:?}",
                self.config.channel, e
            );
        }
        Ok(())
    }
}
