use core::fmt::Debug;

use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;
use log::{error, warn};

use crate::config::{
    DEFAULT_PANEL_I2C_ADDR, DEFAULT_PANEL_I2C_HZ, DEFAULT_PANEL_I2C_PORT,
    DEFAULT_PANEL_RESET_PIN, DEFAULT_PANEL_SCL_PIN, DEFAULT_PANEL_SDA_PIN, PANEL_RESET_PREP_MS,
    PANEL_RESET_PULSE_MS, PANEL_RESET_RECOVERY_MS,
};
use crate::error::Error;

/// Character height the panel driver renders text at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FontHeight {
    /// 12 px glyphs.
    Small,
    /// 16 px glyphs.
    #[default]
    Tall,
}

/// Foreground/background polarity of drawn text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DrawMode {
    Inverted,
    #[default]
    Normal,
}

/// Frame-buffer panel driver as exposed by the vendor display library.
pub trait Panel {
    type Error: Debug;

    /// Bring up the controller. Called once, after the reset sequence.
    async fn init(&mut self) -> Result<(), Self::Error>;

    /// Fill the whole frame buffer with `fill`.
    async fn clear(&mut self, fill: u8) -> Result<(), Self::Error>;

    /// Draw `text` into the frame buffer at pixel position (`x`, `y`).
    async fn draw_text(
        &mut self,
        x: u8,
        y: u8,
        text: &str,
        height: FontHeight,
        mode: DrawMode,
    ) -> Result<(), Self::Error>;

    /// Push the frame buffer to the glass.
    async fn flush(&mut self) -> Result<(), Self::Error>;
}

/// Wiring and bus parameters for one panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DisplayConfig {
    pub i2c_port: u8,
    pub i2c_address: u8,
    pub i2c_hz: u32,
    pub sda_pin: u8,
    pub scl_pin: u8,
    pub reset_pin: u8,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            i2c_port: DEFAULT_PANEL_I2C_PORT,
            i2c_address: DEFAULT_PANEL_I2C_ADDR,
            i2c_hz: DEFAULT_PANEL_I2C_HZ,
            sda_pin: DEFAULT_PANEL_SDA_PIN,
            scl_pin: DEFAULT_PANEL_SCL_PIN,
            reset_pin: DEFAULT_PANEL_RESET_PIN,
        }
    }
}

impl DisplayConfig {
    fn validate(&self) -> Result<(), Error> {
        if self.i2c_address > 0x7f {
            return Err(Error::InvalidArgument("i2c address is not 7-bit"));
        }
        if self.i2c_hz == 0 {
            return Err(Error::InvalidArgument("i2c clock is zero"));
        }
        Ok(())
    }
}

/// One panel behind a reset line.
///
/// [`Display::init`] owns the full bring-up: reset pulse on the dedicated
/// line, then the driver's own init. Afterwards the session draws through
/// [`Display::write_at`] and [`Display::write_message`].
pub struct Display<P: Panel, RST: OutputPin> {
    panel: Option<P>,
    reset: RST,
    config: DisplayConfig,
}

impl<P: Panel, RST: OutputPin> Display<P, RST> {
    /// Reset the controller and bring up the panel driver.
    pub async fn init<D: DelayNs>(
        mut panel: P,
        reset: RST,
        delay: &mut D,
        config: DisplayConfig,
    ) -> Result<Self, Error> {
        config.validate()?;
        let mut display = Self {
            panel: None,
            reset,
            config,
        };
        display.pulse_reset(delay).await?;
        if let Err(e) = panel.init().await {
            error!("panel init on port {} failed: {:?}", config.i2c_port, e);
            return Err(Error::DriverInit);
        }
        display.panel = Some(panel);
        Ok(display)
    }

    // Settle high, pulse low to reset the controller, release and give it
    // time to come back up. The session keeps the line owned and driven
    // high afterwards.
    async fn pulse_reset<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), Error> {
        self.reset.set_high().map_err(|_| Error::DriverInit)?;
        delay.delay_ms(PANEL_RESET_PREP_MS).await;
        self.reset.set_low().map_err(|_| Error::DriverInit)?;
        delay.delay_ms(PANEL_RESET_PULSE_MS).await;
        self.reset.set_high().map_err(|_| Error::DriverInit)?;
        delay.delay_ms(PANEL_RESET_RECOVERY_MS).await;
        Ok(())
    }

    /// Wiring this session was configured with.
    pub fn config(&self) -> &DisplayConfig {
        &self.config
    }

    /// Blank the panel's frame buffer.
    pub async fn clear(&mut self) -> Result<(), Error> {
        let panel = self.panel.as_mut().ok_or(Error::NotInitialized)?;
        panel.clear(0x00).await.map_err(|e| {
            warn!("panel clear failed: {:?}", e);
            Error::OperationFailed
        })
    }

    /// Draw `text` at pixel position (`x`, `y`) and flush.
    pub async fn write_at(
        &mut self,
        x: u8,
        y: u8,
        text: &str,
        height: FontHeight,
        mode: DrawMode,
    ) -> Result<(), Error> {
        let panel = self.panel.as_mut().ok_or(Error::NotInitialized)?;
        if let Err(e) = panel.draw_text(x, y, text, height, mode).await {
            warn!("panel draw failed: {:?}", e);
            return Err(Error::OperationFailed);
        }
        panel.flush().await.map_err(|e| {
            warn!("panel flush failed: {:?}", e);
            Error::OperationFailed
        })
    }

    /// Clear the panel and draw `text` as a single status line at the
    /// origin.
    pub async fn write_message(&mut self, text: &str) -> Result<(), Error> {
        self.clear().await?;
        self.write_at(0, 0, text, FontHeight::default(), DrawMode::default())
            .await
    }

    /// Release the panel driver. A second call returns
    /// [`Error::NotInitialized`].
    pub fn teardown(&mut self) -> Result<(), Error> {
        match self.panel.take() {
            Some(panel) => {
                drop(panel);
                Ok(())
            }
            None => Err(Error::NotInitialized),
        }
    }
}
