//! Driver library for the Sitronix ST7789 family of RGB565 TFT display controllers.

#![cfg_attr(not(feature = "std"), no_std)]

// This has to be here in order to be usable by mods declared afterwards.
#[cfg(test)]
#[macro_use]
mod testing {
    macro_rules! send {
        ([$($d:tt),*]) => {Sent::Data(vec![$($d,)*])};
        ($c:tt) => {Sent::Cmd($c)};
    }
    macro_rules! sends {
        ($($e:tt),*) => {&[$(send!($e),)*]};
    }
}

pub mod color;
pub mod command;
pub mod config;
pub mod display;
pub mod error;
pub mod interface;

// Re-exports for primary API.
pub use color::Rgb565;
pub use command::consts;
pub use config::Config;
pub use display::geometry::{PixelCoord, Rotation, Window};
pub use display::transfer::TransferState;
pub use display::Display;
pub use error::Error;
pub use interface::spi::{NoPin, SpiInterface};
pub use interface::{Clock, CompletionSignal, DisplayInterface};
