//! Linux i2cdev-based two-wire bus implementation.

use i2cdev::core::I2CDevice;
use i2cdev::linux::LinuxI2CDevice;
use tracing::{debug, instrument};

use super::traits::{BusError, TwiBus, WriteOutcome};

// errno values the kernel uses for unacknowledged transfers
// (Documentation/i2c/fault-codes.rst).
const ENXIO: i32 = 6;
const EREMOTEIO: i32 = 121;

/// Two-wire bus backed by a Linux `/dev/i2c-*` device node.
pub struct I2cdevBus {
    dev: LinuxI2CDevice,
    path: String,
}

impl I2cdevBus {
    /// Open the bus device at `path`, addressing the target at `address`.
    #[instrument(level = "info")]
    pub fn open(path: &str, address: u8) -> Result<Self, BusError> {
        let dev = LinuxI2CDevice::new(path, address as u16).map_err(|e| BusError::Open {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            dev,
            path: path.to_string(),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl TwiBus for I2cdevBus {
    fn write(&mut self, bytes: &[u8]) -> Result<WriteOutcome, BusError> {
        match self.dev.write(bytes) {
            Ok(()) => {
                debug!(len = bytes.len(), "write acknowledged");
                Ok(WriteOutcome::Ack)
            }
            Err(err) => {
                let io_err: std::io::Error = err.into();
                match io_err.raw_os_error() {
                    Some(ENXIO) => Ok(WriteOutcome::AddrNack),
                    Some(EREMOTEIO) => Ok(WriteOutcome::DataNack),
                    _ => Err(BusError::Write(io_err.to_string())),
                }
            }
        }
    }

    fn read(&mut self, len: usize) -> Result<Vec<u8>, BusError> {
        let mut buf = vec![0u8; len];
        self.dev
            .read(&mut buf)
            .map_err(|e| BusError::Read(e.to_string()))?;
        debug!(len = buf.len(), "read complete");
        Ok(buf)
    }
}
