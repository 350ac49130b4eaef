// Timing constants, capacities and default assignments for the supported
// peripherals. Settle times and cadences are named here rather than inlined
// at the call sites so the datasheet-mandated minimums stay auditable.

// DS18B20 conversion wait. The datasheet maximum for a 12-bit conversion is
// 750 ms; reading earlier returns the previous scratchpad contents.
pub const DS18B20_TCONV_MS: u32 = 750; // ms

// Poll step while waiting on a conversion-ready signal, for drivers that
// expose one. The fixed conversion wait above stays the upper bound.
pub const CONVERSION_POLL_INTERVAL_MS: u32 = 10; // ms

/// ROM family code shared by all DS18B20 devices.
pub const DS18B20_FAMILY_CODE: u8 = 0x28;

// Panel reset line sequence: held high to settle, pulled low to reset the
// controller, then released and given time to come back up.
pub const PANEL_RESET_PREP_MS: u32 = 50; // ms
pub const PANEL_RESET_PULSE_MS: u32 = 200; // ms
pub const PANEL_RESET_RECOVERY_MS: u32 = 50; // ms

// Task loop cadences.
pub const SAMPLE_INTERVAL_MS: u32 = 1_000; // ms; temperature sampling period
pub const INIT_RETRY_INTERVAL_MS: u32 = 2_000; // ms; back-off while a peripheral stays unavailable
pub const DISPLAY_REFRESH_INTERVAL_MS: u32 = 2_000; // ms
pub const DIMMER_APPLY_INTERVAL_MS: u32 = 10; // ms

/// Longest message the panel task draws in one refresh. Longer input is
/// truncated at a character boundary.
pub const MESSAGE_CAPACITY: usize = 20;

/// Registry capacity used by the temperature task.
pub const DEFAULT_MAX_PROBES: usize = 10;

// Default panel wiring (Heltec-style board with an onboard SSD1306).
pub const DEFAULT_PANEL_I2C_PORT: u8 = 1;
pub const DEFAULT_PANEL_I2C_ADDR: u8 = 0x3c;
pub const DEFAULT_PANEL_I2C_HZ: u32 = 100_000; // Hz
pub const DEFAULT_PANEL_SDA_PIN: u8 = 4;
pub const DEFAULT_PANEL_SCL_PIN: u8 = 15;
pub const DEFAULT_PANEL_RESET_PIN: u8 = 16;

// Default one-wire bus pin for the probe string.
pub const DEFAULT_PROBE_PIN: u8 = 13;

// Default SSR drive parameters: 10-bit duty at 1 kHz.
pub const DEFAULT_SSR_PIN: u8 = 12;
pub const DEFAULT_SSR_CHANNEL: u8 = 0;
pub const DEFAULT_SSR_RESOLUTION_BITS: u8 = 10; // bits; 1024 duty steps
pub const DEFAULT_SSR_FREQUENCY_HZ: u16 = 1_000; // Hz

// Widest duty counter the PWM peripheral's timer supports.
pub const SSR_MAX_RESOLUTION_BITS: u8 = 20; // bits
