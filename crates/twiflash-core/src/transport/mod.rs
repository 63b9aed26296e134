//! Transport layer module.

pub mod i2cdev;
pub mod mock;
pub mod traits;

pub use i2cdev::I2cdevBus;
pub use mock::MockBus;
pub use traits::{BusError, TwiBus, WriteOutcome};
