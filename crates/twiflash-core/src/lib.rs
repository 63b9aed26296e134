//! twiflash-core: two-wire bootloader flashing in Rust.
//!
//! This crate implements the host side of a small-microcontroller bootloader
//! protocol: firmware bytes are merged into a blank memory image, compacted
//! into the pages that actually carry content, and written to the device
//! page by page, frame by frame, with CRC-16 verification before and after
//! the transfer.
//!
//! # Architecture
//!
//! The crate is organized into layers:
//!
//! - **Image**: blank-filled device memory image built from decoded firmware
//! - **Plan**: page compaction into an ordered transfer plan
//! - **Crc16**: the device's exact checksum fold
//! - **Protocol**: command constants and wire codec
//! - **Transport**: two-wire bus abstraction (i2cdev, mock)
//! - **Updater**: the probe/erase/write/verify/restart state machine
//! - **Events**: observer pattern for UI decoupling
//! - **Session**: high-level orchestrator
//! - **Artifact**: exportable transfer-plan parameter set
//!
//! # Example
//!
//! ```no_run
//! use twiflash_core::session::{SessionConfig, UpdateSession};
//!
//! let config = SessionConfig {
//!     firmware_path: Some("firmware.bin".to_string()),
//!     ..Default::default()
//! };
//!
//! let session = UpdateSession::new(config);
//! session.run().expect("update failed");
//! ```

pub mod artifact;
pub mod crc16;
pub mod events;
pub mod image;
pub mod plan;
pub mod protocol;
pub mod session;
pub mod transport;
pub mod updater;

// Re-exports for convenience
pub use artifact::PlanArtifact;
pub use events::{NullObserver, TracingObserver, UpdateEvent, UpdateObserver, UpdatePhase};
pub use image::{ImageError, MemoryImage};
pub use plan::{Page, PlanError, TransferPlan};
pub use protocol::DeviceStatus;
pub use session::{SessionConfig, UpdateSession};
pub use transport::{BusError, I2cdevBus, MockBus, TwiBus, WriteOutcome};
pub use updater::{UpdateError, UpdateReport, Updater, UpdaterConfig};
