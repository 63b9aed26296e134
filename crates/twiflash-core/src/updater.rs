//! The firmware update state machine.
//!
//! Drives a connected bootloader through the full update sequence: probe,
//! erase, page-by-page frame-by-frame write, checksum verification, and
//! application restart. The whole run is strictly sequential; every
//! transaction depends on the device being in the state the previous one
//! left it in.

use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::crc16;
use crate::events::{UpdateEvent, UpdateObserver, UpdatePhase};
use crate::plan::{Page, TransferPlan};
use crate::protocol::command::{self, DeviceStatus};
use crate::protocol::constants::{
    BLANK, FRAME_ACCEPT_STATUS, FRAME_DELAY_MS, FRAME_SIZE, PROBE_RETRY_DELAY_MS,
    RESET_VECTOR_PREFIX, STATUS_REPLY_LEN,
};
use crate::transport::{BusError, TwiBus, WriteOutcome};

#[derive(Error, Debug)]
pub enum UpdateError {
    #[error("transfer plan contains no pages")]
    EmptyPlan,

    #[error("device did not answer after {attempts} probe attempts")]
    DeviceUnresponsive { attempts: u32 },

    #[error("erase was not acknowledged ({status})")]
    EraseFailed { status: WriteOutcome },

    #[error("device rejected address {offset:#06x} of page {page} ({status})")]
    AddressSetFailed {
        page: usize,
        offset: u16,
        status: WriteOutcome,
    },

    #[error("device rejected frame {frame} of page {page} at {offset:#06x} ({status})")]
    FrameRejected {
        page: usize,
        frame: usize,
        offset: u16,
        status: WriteOutcome,
    },

    #[error("checksum mismatch after write: device reports {device:#06x}, host computed {host:#06x}")]
    VerificationMismatch { device: u16, host: u16 },

    #[error("bus error: {0}")]
    Bus(#[from] BusError),
}

/// Retry and timing policy for an update run.
#[derive(Debug, Clone)]
pub struct UpdaterConfig {
    /// Give up probing after this many attempts. `None` retries forever;
    /// the device is assumed to answer eventually, and the operator can
    /// abort externally.
    pub probe_retry_limit: Option<u32>,
    /// Wait between probe attempts.
    pub probe_retry_delay: Duration,
    /// Pause after each transaction of the write phase.
    pub frame_delay: Duration,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            probe_retry_limit: None,
            probe_retry_delay: Duration::from_millis(PROBE_RETRY_DELAY_MS),
            frame_delay: Duration::from_millis(FRAME_DELAY_MS),
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct UpdateReport {
    /// Bootloader version the device reported before the write.
    pub device_version: u8,
    /// Device checksum of the target range before erase, diagnostic only.
    pub checksum_before: u16,
    /// Verified checksum of the written firmware.
    pub checksum_after: u16,
    /// Number of pages transferred.
    pub pages_written: usize,
    /// Whether the device acknowledged the restart command. The firmware is
    /// verified either way.
    pub restarted: bool,
}

/// Drives one update run over an exclusively-owned bus.
pub struct Updater<'a, B: TwiBus, O: UpdateObserver> {
    bus: &'a mut B,
    observer: &'a O,
    config: UpdaterConfig,
    phase: UpdatePhase,
}

impl<'a, B: TwiBus, O: UpdateObserver> Updater<'a, B, O> {
    pub fn new(bus: &'a mut B, observer: &'a O, config: UpdaterConfig) -> Self {
        Self {
            bus,
            observer,
            config,
            phase: UpdatePhase::Probe,
        }
    }

    /// Run the complete update sequence for `plan`.
    ///
    /// Returns a report once the written firmware has been verified, or the
    /// first fatal error. There is no rollback; on a fatal error the device
    /// is left in whatever state the last successful transaction produced.
    pub fn run(&mut self, plan: &TransferPlan) -> Result<UpdateReport, UpdateError> {
        let first_offset = plan.first_offset().ok_or(UpdateError::EmptyPlan)?;
        let data = plan.flattened();
        let length = data.len() as u16;

        info!(
            pages = plan.page_count(),
            bytes = data.len(),
            first_offset = %format!("{:#06x}", first_offset),
            "Starting update"
        );

        let before = self.probe_until_ready(0, length)?;
        debug!(
            version = before.version,
            checksum = %format!("{:04X}", before.checksum),
            "Device state before write"
        );

        self.goto_phase(UpdatePhase::Erase);
        self.erase()?;

        self.goto_phase(UpdatePhase::WritePages);
        for (index, page) in plan.pages().iter().enumerate() {
            self.write_page(index, plan.page_count(), page)?;
        }

        self.goto_phase(UpdatePhase::Verify);
        let skip = RESET_VECTOR_PREFIX as u16;
        let after = self.probe_until_ready(first_offset + skip, length - skip)?;
        let host = crc16::of(&data[RESET_VECTOR_PREFIX..]);
        if after.checksum != host {
            return Err(UpdateError::VerificationMismatch {
                device: after.checksum,
                host,
            });
        }
        info!(checksum = %format!("{:04X}", host), "Checksum verified");

        self.goto_phase(UpdatePhase::Restart);
        let restarted = self.restart();

        self.goto_phase(UpdatePhase::Complete);
        self.observer.on_event(&UpdateEvent::Complete);

        Ok(UpdateReport {
            device_version: before.version,
            checksum_before: before.checksum,
            checksum_after: after.checksum,
            pages_written: plan.page_count(),
            restarted,
        })
    }

    /// Query version and checksum over `[offset, offset + length)` until the
    /// device answers. Unanswered attempts are absorbed and retried; only a
    /// configured retry limit turns them into an error.
    fn probe_until_ready(
        &mut self,
        offset: u16,
        length: u16,
    ) -> Result<DeviceStatus, UpdateError> {
        let mut attempts: u32 = 0;
        loop {
            attempts += 1;
            match self.probe_once(offset, length) {
                Ok(Some(status)) => {
                    self.observer.on_event(&UpdateEvent::DeviceProbed {
                        version: status.version,
                        checksum: status.checksum,
                    });
                    return Ok(status);
                }
                Ok(None) => {
                    debug!(attempt = attempts, "device not ready");
                }
                Err(err) => {
                    debug!(attempt = attempts, error = %err, "probe attempt failed");
                }
            }
            if let Some(limit) = self.config.probe_retry_limit
                && attempts >= limit
            {
                return Err(UpdateError::DeviceUnresponsive { attempts });
            }
            thread::sleep(self.config.probe_retry_delay);
        }
    }

    fn probe_once(&mut self, offset: u16, length: u16) -> Result<Option<DeviceStatus>, BusError> {
        let outcome = self
            .bus
            .write(&command::get_version_and_checksum(offset, length))?;
        if !outcome.is_ack() {
            debug!(status = %outcome, "query not acknowledged");
            return Ok(None);
        }
        let reply = self.bus.read(STATUS_REPLY_LEN)?;
        Ok(command::parse_status_reply(&reply))
    }

    fn erase(&mut self) -> Result<(), UpdateError> {
        let outcome = self.bus.write(&command::erase_user_space())?;
        if !outcome.is_ack() {
            return Err(UpdateError::EraseFailed { status: outcome });
        }
        info!("User space erased");
        Ok(())
    }

    fn write_page(&mut self, index: usize, total: usize, page: &Page) -> Result<(), UpdateError> {
        let outcome = self.bus.write(&command::set_page_address(page.offset()))?;
        thread::sleep(self.config.frame_delay);
        if !outcome.is_ack() {
            return Err(UpdateError::AddressSetFailed {
                page: index,
                offset: page.offset(),
                status: outcome,
            });
        }

        for frame in 0..page.bytes().len().div_ceil(FRAME_SIZE) {
            let payload = frame_payload(page.bytes(), frame, FRAME_SIZE, BLANK);
            let outcome = self.bus.write(&command::write_frame(&payload))?;
            if outcome.code() != FRAME_ACCEPT_STATUS {
                return Err(UpdateError::FrameRejected {
                    page: index,
                    frame,
                    offset: page.offset(),
                    status: outcome,
                });
            }
            thread::sleep(self.config.frame_delay);
        }

        debug!(page = index, offset = %format!("{:#06x}", page.offset()), "Page written");
        self.observer.on_event(&UpdateEvent::Progress {
            phase: UpdatePhase::WritePages,
            operation: "page".to_string(),
            current: (index + 1) as u64,
            total: total as u64,
        });
        Ok(())
    }

    /// Ask the device to start the application. Diagnostic only; by this
    /// point the firmware is verified.
    fn restart(&mut self) -> bool {
        match self.bus.write(&command::execute_application()) {
            Ok(outcome) if outcome.is_ack() => true,
            Ok(outcome) => {
                warn!(status = %outcome, "Restart command not acknowledged");
                false
            }
            Err(err) => {
                warn!(error = %err, "Restart command failed");
                false
            }
        }
    }

    fn goto_phase(&mut self, to: UpdatePhase) {
        info!(from = %self.phase, to = %to, "Phase transition");
        self.observer.on_event(&UpdateEvent::PhaseChanged {
            from: self.phase,
            to,
        });
        self.phase = to;
    }
}

/// One frame's worth of page bytes, padded with the blank sentinel past the
/// end of the page data.
fn frame_payload(bytes: &[u8], frame: usize, frame_size: usize, blank: u8) -> Vec<u8> {
    let start = frame * frame_size;
    let mut payload = vec![blank; frame_size];
    if start < bytes.len() {
        let end = (start + frame_size).min(bytes.len());
        payload[..end - start].copy_from_slice(&bytes[start..end]);
    }
    payload
}
