use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embedded_hal_async::delay::DelayNs;
use log::{error, info, warn};

use crate::config::DIMMER_APPLY_INTERVAL_MS;
use crate::dimmer::{PwmChannel, Ssr};
use crate::error::Error;
use crate::slot::Slot;

pub type DutySlotType = Slot<CriticalSectionRawMutex, u32>;

/// Latest requested duty value, written by producers and applied by the
/// dimmer task. Zero stops the output.
pub static DUTY_COMMAND: DutySlotType = Slot::new(0);

/// Dimmer loop: apply each new duty command to the SSR.
pub struct DimmerTask<C: PwmChannel, D: DelayNs> {
    ssr: Ssr<C>,
    command: &'static DutySlotType,
    delay: D,
    applied_generation: u32,
}

impl<C: PwmChannel, D: DelayNs> DimmerTask<C, D> {
    /// Wrap an initialized SSR session.
    pub fn new(ssr: Ssr<C>, command: &'static DutySlotType, delay: D) -> Self {
        Self {
            ssr,
            command,
            delay,
            applied_generation: 0,
        }
    }

    /// One loop iteration. Returns the wait until the next one.
    pub async fn step(&mut self) -> u32 {
        let (duty, generation) = self.command.latest().await;
        if generation != self.applied_generation {
            match self.ssr.set_duty(duty) {
                Ok(()) => {}
                Err(Error::InvalidArgument(reason)) => {
                    error!("dropping duty command {}: {}", duty, reason);
                }
                Err(e) => warn!("duty apply failed: {}", e),
            }
            // A failed command is not retried; the next publish wins.
            self.applied_generation = generation;
        }
        DIMMER_APPLY_INTERVAL_MS
    }

    /// Drive the loop forever. On target, wrap this in an executor task.
    pub async fn run(mut self) -> ! {
        info!("Starting dimmer task");
        loop {
            let wait_ms = self.step().await;
            self.delay.delay_ms(wait_ms).await;
        }
    }
}
