//! Bootloader wire protocol: constants and command codec.

pub mod command;
pub mod constants;

pub use command::DeviceStatus;
