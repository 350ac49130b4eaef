use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embedded_hal_async::delay::DelayNs;
use heapless::Vec;
use log::{debug, info, warn};

use crate::config::{DEFAULT_MAX_PROBES, INIT_RETRY_INTERVAL_MS, SAMPLE_INTERVAL_MS};
use crate::slot::Slot;
use crate::thermo::{ProbeAddress, ProbeBus, ProbeRegistry, ScanConfig};

/// One probe's latest reading as published to the readings slot.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Reading {
    pub address: ProbeAddress,
    pub celsius: f32,
}

/// Readings from the most recent successful sampling pass.
pub type Readings = Vec<Reading, DEFAULT_MAX_PROBES>;

pub type ReadingsSlotType = Slot<CriticalSectionRawMutex, Readings>;

/// Latest readings, written by the temperature task and read by consumers.
pub static READINGS: ReadingsSlotType = Slot::new(Vec::new());

/// Periodic sampling loop: scan until the bus yields probes, then sample on
/// a fixed cadence and publish into the readings slot.
///
/// A failed scan is retried on the back-off cadence; a failed sampling pass
/// is logged and the loop keeps going with the previous slot contents.
pub struct TemperatureTask<B: ProbeBus, D: DelayNs> {
    bus: B,
    config: ScanConfig,
    registry: Option<ProbeRegistry<B::Device, DEFAULT_MAX_PROBES>>,
    readings: &'static ReadingsSlotType,
    delay: D,
}

impl<B: ProbeBus, D: DelayNs> TemperatureTask<B, D> {
    pub fn new(bus: B, config: ScanConfig, readings: &'static ReadingsSlotType, delay: D) -> Self {
        Self {
            bus,
            config,
            registry: None,
            readings,
            delay,
        }
    }

    /// Registered probe count; zero before the first successful scan.
    pub fn found(&self) -> usize {
        self.registry.as_ref().map_or(0, |registry| registry.found())
    }

    /// One loop iteration. Returns the wait until the next one.
    pub async fn step(&mut self) -> u32 {
        if self.registry.is_none() {
            match ProbeRegistry::scan(&mut self.bus, self.config).await {
                Ok(registry) => {
                    info!(
                        "Temperature task initialized: {} probe(s) on pin {}",
                        registry.found(),
                        registry.pin()
                    );
                    self.registry = Some(registry);
                }
                Err(e) => {
                    warn!("probe scan failed: {}; retrying", e);
                    return INIT_RETRY_INTERVAL_MS;
                }
            }
        }

        // The first sampling pass runs on the same tick the scan succeeded.
        if let Some(registry) = &mut self.registry {
            match registry.sample_all(&mut self.delay).await {
                Ok(()) => {
                    let mut readings = Readings::new();
                    for probe in registry.probes() {
                        if let Some(celsius) = probe.last_celsius() {
                            debug!("probe {}: {} C", probe.address(), celsius);
                            let _ = readings.push(Reading {
                                address: probe.address(),
                                celsius,
                            });
                        }
                    }
                    self.readings.publish(readings).await;
                }
                Err(e) => warn!("temperature sampling failed: {}", e),
            }
        }
        SAMPLE_INTERVAL_MS
    }

    /// Drive the loop forever. On target, wrap this in an executor task.
    pub async fn run(mut self) -> ! {
        info!("Starting temperature task");
        loop {
            let wait_ms = self.step().await;
            self.delay.delay_ms(wait_ms).await;
        }
    }
}
