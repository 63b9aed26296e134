//! Bootloader wire-protocol constants.
//!
//! All of these are fixed by the device firmware and must match it exactly.

// ============================================================================
// Device geometry
// ============================================================================

/// Two-wire address the bootloader answers on.
pub const DEVICE_ADDRESS: u8 = 0x58;

/// Size of the device's writable address space in bytes.
pub const DEVICE_MEMORY_SIZE: usize = 8192;

/// Flash page size; the unit the device addresses writes by.
pub const PAGE_SIZE: usize = 64;

/// Frame size; the unit of one write transaction.
pub const FRAME_SIZE: usize = 16;

/// Byte value meaning "no firmware content" at an address.
pub const BLANK: u8 = 0xFF;

// ============================================================================
// Commands (Host -> Device)
// ============================================================================

/// Set the page address for subsequent frame writes: offset lo, hi.
pub const CMD_SET_PAGE_ADDRESS: u8 = 0x01;

/// Write one frame into the current page: payload, crc lo, crc hi, trailer.
pub const CMD_WRITE_FRAME: u8 = 0x02;

/// Leave the bootloader and start the written application.
pub const CMD_EXECUTE_APPLICATION: u8 = 0x03;

/// Erase the user firmware space.
pub const CMD_ERASE_USER_SPACE: u8 = 0x04;

/// Query bootloader version and CRC-16 of a range: offset lo, hi, length lo, hi.
pub const CMD_GET_VERSION_AND_CHECKSUM: u8 = 0x06;

// ============================================================================
// Replies and framing
// ============================================================================

/// Reply length for [`CMD_GET_VERSION_AND_CHECKSUM`]: version, crc lo, crc hi.
pub const STATUS_REPLY_LEN: usize = 3;

/// Fixed byte terminating every frame write.
pub const FRAME_TRAILER: u8 = 0x00;

/// The bootloader buffers an accepted frame and NACKs its final byte, so the
/// two-wire status for a successful frame write is the data-NACK code, not
/// an ACK. Anything else means the frame was not taken.
pub const FRAME_ACCEPT_STATUS: u8 = 3;

/// The bootloader's reset-vector preservation rewrites the first bytes of
/// the application after flashing; verification skips them.
pub const RESET_VECTOR_PREFIX: usize = 4;

// ============================================================================
// Timing
// ============================================================================

/// Pause after every transaction of the write phase.
pub const FRAME_DELAY_MS: u64 = 1;

/// Pause between attempts while waiting for the device to answer a query.
pub const PROBE_RETRY_DELAY_MS: u64 = 100;
