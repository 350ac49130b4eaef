pub mod dimmer;
pub mod display;
pub mod temperature;
