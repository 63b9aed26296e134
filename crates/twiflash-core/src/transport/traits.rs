//! Two-wire bus abstraction.
//!
//! Defines the `TwiBus` trait the updater drives its transactions over,
//! allowing different implementations (Linux i2cdev, mock, etc.).

use std::fmt;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BusError {
    #[error("failed to open bus device {path}: {message}")]
    Open { path: String, message: String },

    #[error("write failed: {0}")]
    Write(String),

    #[error("read failed: {0}")]
    Read(String),

    #[error("timeout after {timeout_ms}ms waiting for a reply")]
    Timeout { timeout_ms: u64 },

    #[error("bus disconnected")]
    Disconnected,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Completion status of one write transaction, mirroring the classic
/// two-wire controller status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Every byte was acknowledged.
    Ack,
    /// Message exceeded the controller's buffer.
    DataTooLong,
    /// No acknowledgement of the device address.
    AddrNack,
    /// A data byte was not acknowledged.
    DataNack,
    /// Any other controller-reported failure.
    Other(u8),
}

impl WriteOutcome {
    /// The numeric status code as the wire protocol counts them.
    pub fn code(&self) -> u8 {
        match self {
            WriteOutcome::Ack => 0,
            WriteOutcome::DataTooLong => 1,
            WriteOutcome::AddrNack => 2,
            WriteOutcome::DataNack => 3,
            WriteOutcome::Other(code) => *code,
        }
    }

    pub fn from_code(code: u8) -> Self {
        match code {
            0 => WriteOutcome::Ack,
            1 => WriteOutcome::DataTooLong,
            2 => WriteOutcome::AddrNack,
            3 => WriteOutcome::DataNack,
            other => WriteOutcome::Other(other),
        }
    }

    pub fn is_ack(&self) -> bool {
        matches!(self, WriteOutcome::Ack)
    }
}

impl fmt::Display for WriteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteOutcome::Ack => write!(f, "ACK"),
            WriteOutcome::DataTooLong => write!(f, "data too long"),
            WriteOutcome::AddrNack => write!(f, "NACK on address"),
            WriteOutcome::DataNack => write!(f, "NACK on data"),
            WriteOutcome::Other(code) => write!(f, "bus status {code}"),
        }
    }
}

/// Abstract two-wire bus interface.
///
/// The updater owns the bus exclusively for the duration of a run; no two
/// transactions are ever in flight at once.
pub trait TwiBus: Send {
    /// Issue one write transaction to the device and report how the device
    /// acknowledged it.
    fn write(&mut self, bytes: &[u8]) -> Result<WriteOutcome, BusError>;

    /// Read `len` reply bytes from the device. Implementations may return
    /// fewer bytes than requested if the device stops answering.
    fn read(&mut self, len: usize) -> Result<Vec<u8>, BusError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_codes_round_trip() {
        for code in 0u8..=5 {
            assert_eq!(WriteOutcome::from_code(code).code(), code);
        }
    }

    #[test]
    fn test_only_zero_is_ack() {
        assert!(WriteOutcome::Ack.is_ack());
        assert!(!WriteOutcome::DataNack.is_ack());
        assert!(!WriteOutcome::Other(7).is_ack());
    }
}
