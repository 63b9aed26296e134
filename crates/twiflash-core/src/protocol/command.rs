//! Command payload construction and reply parsing.
//!
//! Every transaction the updater issues is built here, so the exact wire
//! layout is testable without a device on the bus. Multi-byte fields are
//! little-endian throughout.

use byteorder::{ByteOrder, LittleEndian};

use super::constants::{
    CMD_ERASE_USER_SPACE, CMD_EXECUTE_APPLICATION, CMD_GET_VERSION_AND_CHECKSUM,
    CMD_SET_PAGE_ADDRESS, CMD_WRITE_FRAME, FRAME_TRAILER, STATUS_REPLY_LEN,
};
use crate::crc16;

/// Version and checksum as reported by the bootloader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceStatus {
    pub version: u8,
    pub checksum: u16,
}

/// Parse the reply to a version/checksum query. Returns `None` on a short
/// reply, which the updater treats as the device not being ready yet.
pub fn parse_status_reply(reply: &[u8]) -> Option<DeviceStatus> {
    if reply.len() < STATUS_REPLY_LEN {
        return None;
    }
    Some(DeviceStatus {
        version: reply[0],
        checksum: LittleEndian::read_u16(&reply[1..3]),
    })
}

/// Build the version/checksum query over `[offset, offset + length)`.
pub fn get_version_and_checksum(offset: u16, length: u16) -> [u8; 5] {
    let mut cmd = [CMD_GET_VERSION_AND_CHECKSUM, 0, 0, 0, 0];
    LittleEndian::write_u16(&mut cmd[1..3], offset);
    LittleEndian::write_u16(&mut cmd[3..5], length);
    cmd
}

/// Build the set-page-address command.
pub fn set_page_address(offset: u16) -> [u8; 3] {
    let mut cmd = [CMD_SET_PAGE_ADDRESS, 0, 0];
    LittleEndian::write_u16(&mut cmd[1..3], offset);
    cmd
}

/// Build a frame write: command byte, the payload, its CRC-16 (lo, hi) and
/// the trailer byte.
pub fn write_frame(payload: &[u8]) -> Vec<u8> {
    let crc = crc16::of(payload);
    let mut cmd = Vec::with_capacity(payload.len() + 4);
    cmd.push(CMD_WRITE_FRAME);
    cmd.extend_from_slice(payload);
    cmd.push((crc & 0xFF) as u8);
    cmd.push((crc >> 8) as u8);
    cmd.push(FRAME_TRAILER);
    cmd
}

/// Build the erase-user-space command.
pub fn erase_user_space() -> [u8; 1] {
    [CMD_ERASE_USER_SPACE]
}

/// Build the execute-application command.
pub fn execute_application() -> [u8; 1] {
    [CMD_EXECUTE_APPLICATION]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_layout() {
        assert_eq!(
            get_version_and_checksum(0x1234, 0x2000),
            [0x06, 0x34, 0x12, 0x00, 0x20]
        );
    }

    #[test]
    fn test_set_page_address_layout() {
        assert_eq!(set_page_address(0x1040), [0x01, 0x40, 0x10]);
    }

    #[test]
    fn test_write_frame_layout() {
        let payload = [0xAB; 16];
        let cmd = write_frame(&payload);

        assert_eq!(cmd.len(), 20);
        assert_eq!(cmd[0], 0x02);
        assert_eq!(&cmd[1..17], &payload);
        let crc = crc16::of(&payload);
        assert_eq!(cmd[17], (crc & 0xFF) as u8);
        assert_eq!(cmd[18], (crc >> 8) as u8);
        assert_eq!(cmd[19], 0x00);
    }

    #[test]
    fn test_single_byte_commands() {
        assert_eq!(erase_user_space(), [0x04]);
        assert_eq!(execute_application(), [0x03]);
    }

    #[test]
    fn test_parse_status_reply() {
        assert_eq!(
            parse_status_reply(&[0x07, 0xCD, 0xAB]),
            Some(DeviceStatus {
                version: 0x07,
                checksum: 0xABCD,
            })
        );
        assert_eq!(parse_status_reply(&[0x07, 0xCD]), None);
        assert_eq!(parse_status_reply(&[]), None);
    }
}
