use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;
use heapless::String;
use log::{info, warn};

use crate::config::{DISPLAY_REFRESH_INTERVAL_MS, MESSAGE_CAPACITY};
use crate::display::{Display, Panel};
use crate::slot::Slot;

/// Status line shown on the panel.
pub type Message = String<MESSAGE_CAPACITY>;

pub type MessageSlotType = Slot<CriticalSectionRawMutex, Message>;

/// Latest status message, written by producers and drawn by the display
/// task.
pub static MESSAGE: MessageSlotType = Slot::new(String::new());

/// Queue `text` for the next panel refresh. Input longer than
/// [`MESSAGE_CAPACITY`] bytes is truncated at a character boundary.
pub async fn publish_message(slot: &MessageSlotType, text: &str) {
    let mut message = Message::new();
    let mut end = text.len().min(MESSAGE_CAPACITY);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let _ = message.push_str(&text[..end]);
    slot.publish(message).await;
}

/// Greeting strings cycled by [`rotate_greetings`].
pub const GREETINGS: [&str; 12] = [
    "Hello, World!",
    "Ola, Mundo!",
    "Bonjour, Monde!",
    "Hallo, Welt!",
    "Ciao, Mondo!",
    "Hola, Mundo!",
    "Hej, Verden!",
    "Hei, Maailma!",
    "Salut, Monde!",
    "Hallo, Wereld!",
    "Hallo, Verden!",
    "deu certo!",
];

/// Demo producer: cycle [`GREETINGS`] through the message slot on the
/// refresh cadence.
pub async fn rotate_greetings<D: DelayNs>(slot: &MessageSlotType, delay: &mut D) -> ! {
    let mut index = 0;
    loop {
        publish_message(slot, GREETINGS[index]).await;
        index = (index + 1) % GREETINGS.len();
        delay.delay_ms(DISPLAY_REFRESH_INTERVAL_MS).await;
    }
}

/// Panel refresh loop: redraw whenever the message slot has a new value.
///
/// A failed redraw leaves the shown generation untouched, so the same
/// message is retried on the next tick.
pub struct DisplayTask<P: Panel, RST: OutputPin, D: DelayNs> {
    display: Display<P, RST>,
    message: &'static MessageSlotType,
    delay: D,
    shown_generation: u32,
}

impl<P: Panel, RST: OutputPin, D: DelayNs> DisplayTask<P, RST, D> {
    /// Wrap an initialized display. Nothing is drawn until the first
    /// publish.
    pub fn new(display: Display<P, RST>, message: &'static MessageSlotType, delay: D) -> Self {
        Self {
            display,
            message,
            delay,
            shown_generation: 0,
        }
    }

    /// One loop iteration. Returns the wait until the next one.
    pub async fn step(&mut self) -> u32 {
        let (message, generation) = self.message.latest().await;
        if generation != self.shown_generation {
            match self.display.write_message(message.as_str()).await {
                Ok(()) => self.shown_generation = generation,
                Err(e) => warn!("panel refresh failed: {}", e),
            }
        }
        DISPLAY_REFRESH_INTERVAL_MS
    }

    /// Drive the loop forever. On target, wrap this in an executor task.
    pub async fn run(mut self) -> ! {
        info!("Starting display task");
        loop {
            let wait_ms = self.step().await;
            self.delay.delay_ms(wait_ms).await;
        }
    }
}
