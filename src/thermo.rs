use core::fmt::Debug;

use embedded_hal_async::delay::DelayNs;
use heapless::Vec;
use log::{debug, info, warn};

use crate::config::{
    CONVERSION_POLL_INTERVAL_MS, DEFAULT_PROBE_PIN, DS18B20_FAMILY_CODE, DS18B20_TCONV_MS,
};
use crate::error::Error;

/// 64-bit ROM code of a device on the one-wire bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProbeAddress(pub u64);

impl ProbeAddress {
    /// Family code in the low byte of the ROM code.
    pub const fn family(self) -> u8 {
        (self.0 & 0xff) as u8
    }

    /// Whether this address belongs to the DS18B20 family.
    pub const fn is_ds18b20(self) -> bool {
        self.family() == DS18B20_FAMILY_CODE
    }
}

impl core::fmt::Display for ProbeAddress {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Search-capable one-wire bus as exposed by the platform driver.
///
/// The search cursor lives in the bus: `begin_search` resets it,
/// `search_next` advances it and `end_search` releases any driver-side
/// search resources. [`ProbeRegistry::scan`] pairs every begin with exactly
/// one end, on error paths included.
pub trait ProbeBus {
    type Device: ProbeDevice;
    type Error: Debug;

    /// Start a new address search, discarding any previous search state.
    fn begin_search(&mut self);

    /// Next device address in the running search, or `None` once exhausted.
    async fn search_next(&mut self) -> Result<Option<ProbeAddress>, Self::Error>;

    /// Finish the running search.
    fn end_search(&mut self);

    /// Create a driver handle for the device at `address`.
    async fn attach(&mut self, address: ProbeAddress) -> Result<Self::Device, Self::Error>;
}

/// Driver handle for one temperature device on the bus.
pub trait ProbeDevice {
    type Error: Debug;

    /// Start a temperature conversion.
    async fn trigger_conversion(&mut self) -> Result<(), Self::Error>;

    /// Whether the pending conversion has finished. Drivers without a ready
    /// signal return `None` and the caller waits out the datasheet maximum.
    async fn poll_ready(&mut self) -> Result<Option<bool>, Self::Error> {
        Ok(None)
    }

    /// Read back the most recently completed conversion.
    async fn read_celsius(&mut self) -> Result<f32, Self::Error>;
}

/// How a scan treats a device it cannot register: one with a foreign
/// family code, or a DS18B20 whose attach fails.
///
/// Multi-probe deployments historically skipped such devices while the
/// single-probe path failed the whole scan on one. Whether an
/// unregistrable device indicates a wiring fault depends on the board, so
/// the choice stays with the caller instead of being unified here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScanPolicy {
    /// Skip the device and keep searching.
    #[default]
    SkipForeign,
    /// Abort the scan on the first such device.
    RejectForeign,
}

/// Parameters for a probe bus scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScanConfig {
    /// GPIO the bus data line hangs off, recorded for diagnostics.
    pub pin: u8,
    pub policy: ScanPolicy,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            pin: DEFAULT_PROBE_PIN,
            policy: ScanPolicy::default(),
        }
    }
}

/// One discovered probe: driver handle, ROM address and the last good
/// reading.
pub struct Probe<DEV> {
    device: DEV,
    address: ProbeAddress,
    last_celsius: Option<f32>,
}

impl<DEV: ProbeDevice> Probe<DEV> {
    pub fn address(&self) -> ProbeAddress {
        self.address
    }

    /// Reading taken by the most recent sampling pass, if any yet.
    pub fn last_celsius(&self) -> Option<f32> {
        self.last_celsius
    }

    async fn sample<D: DelayNs>(&mut self, delay: &mut D) -> Result<f32, Error> {
        if let Err(e) = self.device.trigger_conversion().await {
            warn!("probe {}: conversion trigger failed: {:?}", self.address, e);
            return Err(Error::OperationFailed);
        }
        self.wait_conversion(delay).await?;
        match self.device.read_celsius().await {
            Ok(celsius) => {
                self.last_celsius = Some(celsius);
                Ok(celsius)
            }
            Err(e) => {
                warn!("probe {}: readback failed: {:?}", self.address, e);
                Err(Error::OperationFailed)
            }
        }
    }

    // Poll the ready signal where the driver has one; otherwise sleep
    // through the datasheet maximum. The fixed wait also caps the polled
    // path so a stuck ready line cannot hang the loop.
    async fn wait_conversion<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), Error> {
        let mut waited_ms = 0u32;
        loop {
            match self.device.poll_ready().await {
                Err(e) => {
                    warn!("probe {}: ready poll failed: {:?}", self.address, e);
                    return Err(Error::OperationFailed);
                }
                Ok(None) => {
                    delay.delay_ms(DS18B20_TCONV_MS).await;
                    return Ok(());
                }
                Ok(Some(true)) => return Ok(()),
                Ok(Some(false)) => {
                    if waited_ms >= DS18B20_TCONV_MS {
                        return Ok(());
                    }
                    delay.delay_ms(CONVERSION_POLL_INTERVAL_MS).await;
                    waited_ms += CONVERSION_POLL_INTERVAL_MS;
                }
            }
        }
    }
}

/// Fixed-capacity, append-only set of probes discovered on one bus scan.
pub struct ProbeRegistry<DEV, const N: usize> {
    probes: Option<Vec<Probe<DEV>, N>>,
    pin: u8,
}

impl<DEV: ProbeDevice, const N: usize> ProbeRegistry<DEV, N> {
    /// Enumerate the bus and register every DS18B20 found, up to `N`.
    ///
    /// Foreign devices are handled per the configured [`ScanPolicy`].
    /// Returns [`Error::NoDevicesFound`] if the search finishes without a
    /// single match.
    pub async fn scan<B>(bus: &mut B, config: ScanConfig) -> Result<Self, Error>
    where
        B: ProbeBus<Device = DEV>,
    {
        if N == 0 {
            return Err(Error::InvalidArgument("registry capacity is zero"));
        }
        let mut probes: Vec<Probe<DEV>, N> = Vec::new();
        bus.begin_search();
        let outcome = Self::run_search(bus, config, &mut probes).await;
        bus.end_search();
        outcome?;
        if probes.is_empty() {
            return Err(Error::NoDevicesFound);
        }
        info!(
            "one-wire scan on pin {} registered {} probe(s)",
            config.pin,
            probes.len()
        );
        Ok(Self {
            probes: Some(probes),
            pin: config.pin,
        })
    }

    async fn run_search<B>(
        bus: &mut B,
        config: ScanConfig,
        probes: &mut Vec<Probe<DEV>, N>,
    ) -> Result<(), Error>
    where
        B: ProbeBus<Device = DEV>,
    {
        while probes.len() < N {
            let address = match bus.search_next().await {
                Ok(Some(address)) => address,
                Ok(None) => break,
                Err(e) => {
                    warn!("one-wire search on pin {} failed: {:?}", config.pin, e);
                    return Err(Error::DriverInit);
                }
            };
            if !address.is_ds18b20() {
                match config.policy {
                    ScanPolicy::SkipForeign => {
                        debug!(
                            "skipping foreign device {} (family {:#04x})",
                            address,
                            address.family()
                        );
                        continue;
                    }
                    ScanPolicy::RejectForeign => {
                        warn!("foreign device {} on pin {}", address, config.pin);
                        return Err(Error::DriverInit);
                    }
                }
            }
            match bus.attach(address).await {
                Ok(device) => {
                    let probe = Probe {
                        device,
                        address,
                        last_celsius: None,
                    };
                    if probes.push(probe).is_err() {
                        break;
                    }
                }
                Err(e) => match config.policy {
                    ScanPolicy::SkipForeign => {
                        warn!("attach to {} failed, skipping: {:?}", address, e);
                    }
                    ScanPolicy::RejectForeign => {
                        warn!("attach to {} failed: {:?}", address, e);
                        return Err(Error::DriverInit);
                    }
                },
            }
        }
        Ok(())
    }

    /// Number of registered probes.
    pub fn found(&self) -> usize {
        self.probes.as_ref().map_or(0, |probes| probes.len())
    }

    /// Registered probes in discovery order. Empty once torn down.
    pub fn probes(&self) -> &[Probe<DEV>] {
        self.probes.as_deref().unwrap_or(&[])
    }

    /// GPIO the registry was scanned on.
    pub fn pin(&self) -> u8 {
        self.pin
    }

    /// Cached reading of the probe at `index`; `Ok(None)` until that probe
    /// has been sampled successfully.
    pub fn last_celsius(&self, index: usize) -> Result<Option<f32>, Error> {
        let probes = self.probes.as_ref().ok_or(Error::NotInitialized)?;
        let probe = probes
            .get(index)
            .ok_or(Error::InvalidArgument("probe index out of range"))?;
        Ok(probe.last_celsius())
    }

    /// Trigger and read back every probe, refreshing the cached readings.
    ///
    /// A failing probe does not stop the pass; the remaining probes are
    /// still sampled and the first failure is returned at the end.
    pub async fn sample_all<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), Error> {
        let probes = self.probes.as_mut().ok_or(Error::NotInitialized)?;
        let mut first_failure = None;
        for probe in probes.iter_mut() {
            if let Err(e) = probe.sample(delay).await {
                if first_failure.is_none() {
                    first_failure = Some(e);
                }
            }
        }
        match first_failure {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }

    /// Release every probe handle. A second call returns
    /// [`Error::NotInitialized`].
    pub fn teardown(&mut self) -> Result<(), Error> {
        match self.probes.take() {
            Some(probes) => {
                drop(probes);
                Ok(())
            }
            None => Err(Error::NotInitialized),
        }
    }
}
