// Recording fakes for the driver traits, shared by the per-module tests.
// Call logs and counters live behind `Rc` handles so a test can keep
// observing after the fake has been moved into a session.

use std::cell::RefCell;
use std::rc::Rc;

use embassy_futures::yield_now;
use embedded_hal::digital::{ErrorType, OutputPin};
use embedded_hal_async::delay::DelayNs;

use crate::dimmer::{IdleLevel, PwmChannel, SsrConfig};
use crate::display::{DrawMode, FontHeight, Panel};
use crate::thermo::{ProbeAddress, ProbeBus, ProbeDevice};

type Shared<T> = Rc<RefCell<T>>;

fn shared<T>(value: T) -> Shared<T> {
    Rc::new(RefCell::new(value))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FakeDriverError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PwmCall {
    Configure(SsrConfig),
    SetDuty(u32),
    Stop(IdleLevel),
}

pub(crate) struct FakePwm {
    pub(crate) calls: Shared<Vec<PwmCall>>,
    pub(crate) fail_configure: bool,
    pub(crate) fail_ops: Shared<bool>,
    pub(crate) released: Shared<u32>,
}

impl FakePwm {
    pub(crate) fn new() -> Self {
        Self {
            calls: shared(Vec::new()),
            fail_configure: false,
            fail_ops: shared(false),
            released: shared(0),
        }
    }
}

impl PwmChannel for FakePwm {
    type Error = FakeDriverError;

    fn configure(&mut self, config: &SsrConfig) -> Result<(), FakeDriverError> {
        if self.fail_configure {
            return Err(FakeDriverError);
        }
        self.calls.borrow_mut().push(PwmCall::Configure(*config));
        Ok(())
    }

    fn set_duty(&mut self, duty: u32) -> Result<(), FakeDriverError> {
        if *self.fail_ops.borrow() {
            return Err(FakeDriverError);
        }
        self.calls.borrow_mut().push(PwmCall::SetDuty(duty));
        Ok(())
    }

    fn stop(&mut self, idle: IdleLevel) -> Result<(), FakeDriverError> {
        if *self.fail_ops.borrow() {
            return Err(FakeDriverError);
        }
        self.calls.borrow_mut().push(PwmCall::Stop(idle));
        Ok(())
    }
}

impl Drop for FakePwm {
    fn drop(&mut self) {
        *self.released.borrow_mut() += 1;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PanelCall {
    Init,
    Clear(u8),
    Draw {
        x: u8,
        y: u8,
        text: String,
        height: FontHeight,
        mode: DrawMode,
    },
    Flush,
}

pub(crate) struct FakePanel {
    pub(crate) calls: Shared<Vec<PanelCall>>,
    pub(crate) fail_init: bool,
    pub(crate) fail_ops: Shared<bool>,
    pub(crate) released: Shared<u32>,
}

impl FakePanel {
    pub(crate) fn new() -> Self {
        Self {
            calls: shared(Vec::new()),
            fail_init: false,
            fail_ops: shared(false),
            released: shared(0),
        }
    }

    fn guard(&self) -> Result<(), FakeDriverError> {
        if *self.fail_ops.borrow() {
            Err(FakeDriverError)
        } else {
            Ok(())
        }
    }
}

impl Panel for FakePanel {
    type Error = FakeDriverError;

    async fn init(&mut self) -> Result<(), FakeDriverError> {
        if self.fail_init {
            return Err(FakeDriverError);
        }
        self.calls.borrow_mut().push(PanelCall::Init);
        Ok(())
    }

    async fn clear(&mut self, fill: u8) -> Result<(), FakeDriverError> {
        self.guard()?;
        self.calls.borrow_mut().push(PanelCall::Clear(fill));
        Ok(())
    }

    async fn draw_text(
        &mut self,
        x: u8,
        y: u8,
        text: &str,
        height: FontHeight,
        mode: DrawMode,
    ) -> Result<(), FakeDriverError> {
        self.guard()?;
        self.calls.borrow_mut().push(PanelCall::Draw {
            x,
            y,
            text: text.into(),
            height,
            mode,
        });
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), FakeDriverError> {
        self.guard()?;
        self.calls.borrow_mut().push(PanelCall::Flush);
        Ok(())
    }
}

impl Drop for FakePanel {
    fn drop(&mut self) {
        *self.released.borrow_mut() += 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PinLevel {
    Low,
    High,
}

pub(crate) struct FakeResetPin {
    pub(crate) transitions: Shared<Vec<PinLevel>>,
}

impl FakeResetPin {
    pub(crate) fn new() -> Self {
        Self {
            transitions: shared(Vec::new()),
        }
    }
}

impl ErrorType for FakeResetPin {
    type Error = core::convert::Infallible;
}

impl OutputPin for FakeResetPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.transitions.borrow_mut().push(PinLevel::Low);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.transitions.borrow_mut().push(PinLevel::High);
        Ok(())
    }
}

/// Delay that records instead of sleeping.
#[derive(Clone)]
pub(crate) struct SpyDelay {
    pub(crate) total_ns: Shared<u64>,
    pub(crate) ms_calls: Shared<Vec<u32>>,
}

impl SpyDelay {
    pub(crate) fn new() -> Self {
        Self {
            total_ns: shared(0),
            ms_calls: shared(Vec::new()),
        }
    }

    pub(crate) fn total_ms(&self) -> u64 {
        *self.total_ns.borrow() / 1_000_000
    }
}

impl DelayNs for SpyDelay {
    async fn delay_ns(&mut self, ns: u32) {
        *self.total_ns.borrow_mut() += ns as u64;
    }

    async fn delay_us(&mut self, us: u32) {
        *self.total_ns.borrow_mut() += us as u64 * 1_000;
    }

    async fn delay_ms(&mut self, ms: u32) {
        *self.total_ns.borrow_mut() += ms as u64 * 1_000_000;
        self.ms_calls.borrow_mut().push(ms);
    }
}

/// Delay that records like [`SpyDelay`] but suspends once per call, so a
/// test can interleave a never-returning producer with an observer future.
pub(crate) struct YieldingDelay {
    pub(crate) ms_calls: Shared<Vec<u32>>,
}

impl YieldingDelay {
    pub(crate) fn new() -> Self {
        Self {
            ms_calls: shared(Vec::new()),
        }
    }
}

impl DelayNs for YieldingDelay {
    async fn delay_ns(&mut self, _ns: u32) {
        yield_now().await;
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.ms_calls.borrow_mut().push(ms);
        yield_now().await;
    }
}

/// Behavior of one device the fake bus will report during a search.
///
/// The specs stay shared with the bus, so a test can flip failure flags on
/// a device that has already been attached.
#[derive(Debug, Clone)]
pub(crate) struct FakeDeviceSpec {
    pub(crate) address: u64,
    pub(crate) attach_ok: bool,
    pub(crate) celsius: f32,
    pub(crate) ready_after_polls: Option<u32>,
    pub(crate) fail_trigger: bool,
    pub(crate) fail_read: bool,
}

impl FakeDeviceSpec {
    pub(crate) fn ds18b20(serial: u64, celsius: f32) -> Self {
        Self {
            address: (serial << 8) | 0x28,
            attach_ok: true,
            celsius,
            ready_after_polls: None,
            fail_trigger: false,
            fail_read: false,
        }
    }

    // A DS2438 battery monitor, family 0x26.
    pub(crate) fn foreign(serial: u64) -> Self {
        Self {
            address: (serial << 8) | 0x26,
            ..Self::ds18b20(serial, 0.0)
        }
    }
}

pub(crate) struct FakeProbeBus {
    pub(crate) specs: Shared<Vec<FakeDeviceSpec>>,
    pub(crate) begins: Shared<u32>,
    pub(crate) ends: Shared<u32>,
    pub(crate) released: Shared<u32>,
    pub(crate) fail_search_at: Option<usize>,
    cursor: usize,
    search_active: bool,
}

impl FakeProbeBus {
    pub(crate) fn new(specs: Vec<FakeDeviceSpec>) -> Self {
        Self {
            specs: shared(specs),
            begins: shared(0),
            ends: shared(0),
            released: shared(0),
            fail_search_at: None,
            cursor: 0,
            search_active: false,
        }
    }
}

impl ProbeBus for FakeProbeBus {
    type Device = FakeProbeDevice;
    type Error = FakeDriverError;

    fn begin_search(&mut self) {
        assert!(!self.search_active, "begin_search while a search is running");
        *self.begins.borrow_mut() += 1;
        self.cursor = 0;
        self.search_active = true;
    }

    async fn search_next(&mut self) -> Result<Option<ProbeAddress>, FakeDriverError> {
        assert!(self.search_active, "search_next outside an active search");
        if self.fail_search_at == Some(self.cursor) {
            return Err(FakeDriverError);
        }
        let next = self
            .specs
            .borrow()
            .get(self.cursor)
            .map(|spec| ProbeAddress(spec.address));
        if next.is_some() {
            self.cursor += 1;
        }
        Ok(next)
    }

    fn end_search(&mut self) {
        assert!(self.search_active, "end_search without begin_search");
        self.search_active = false;
        *self.ends.borrow_mut() += 1;
    }

    async fn attach(&mut self, address: ProbeAddress) -> Result<FakeProbeDevice, FakeDriverError> {
        let attach_ok = self
            .specs
            .borrow()
            .iter()
            .find(|spec| spec.address == address.0)
            .map(|spec| spec.attach_ok)
            .expect("attach for an address the bus never reported");
        if !attach_ok {
            return Err(FakeDriverError);
        }
        Ok(FakeProbeDevice {
            specs: self.specs.clone(),
            address: address.0,
            polls_seen: 0,
            released: self.released.clone(),
        })
    }
}

pub(crate) struct FakeProbeDevice {
    specs: Shared<Vec<FakeDeviceSpec>>,
    address: u64,
    polls_seen: u32,
    released: Shared<u32>,
}

impl FakeProbeDevice {
    // Reads the current spec so flag changes made after attach apply.
    fn spec(&self) -> FakeDeviceSpec {
        self.specs
            .borrow()
            .iter()
            .find(|spec| spec.address == self.address)
            .cloned()
            .expect("spec for an attached device")
    }
}

impl ProbeDevice for FakeProbeDevice {
    type Error = FakeDriverError;

    async fn trigger_conversion(&mut self) -> Result<(), FakeDriverError> {
        if self.spec().fail_trigger {
            return Err(FakeDriverError);
        }
        self.polls_seen = 0;
        Ok(())
    }

    async fn poll_ready(&mut self) -> Result<Option<bool>, FakeDriverError> {
        match self.spec().ready_after_polls {
            None => Ok(None),
            Some(polls) => {
                let ready = self.polls_seen >= polls;
                self.polls_seen += 1;
                Ok(Some(ready))
            }
        }
    }

    async fn read_celsius(&mut self) -> Result<f32, FakeDriverError> {
        let spec = self.spec();
        if spec.fail_read {
            return Err(FakeDriverError);
        }
        Ok(spec.celsius)
    }
}

impl Drop for FakeProbeDevice {
    fn drop(&mut self) {
        *self.released.borrow_mut() += 1;
    }
}
