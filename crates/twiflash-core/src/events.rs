//! Event system for UI decoupling.
//!
//! Allows CLI or other front ends to follow an update run without tight
//! coupling to the protocol logic.

use std::fmt;

/// Log level for events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Phases of an update run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePhase {
    /// Querying version/checksum until the device answers.
    Probe,
    /// Erasing the user firmware space.
    Erase,
    /// Writing pages frame by frame.
    WritePages,
    /// Re-querying the checksum and comparing against the host's.
    Verify,
    /// Asking the device to start the application.
    Restart,
    /// Run finished, firmware verified.
    Complete,
}

impl fmt::Display for UpdatePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdatePhase::Probe => write!(f, "Probe"),
            UpdatePhase::Erase => write!(f, "Erase"),
            UpdatePhase::WritePages => write!(f, "Write Pages"),
            UpdatePhase::Verify => write!(f, "Verify"),
            UpdatePhase::Restart => write!(f, "Restart"),
            UpdatePhase::Complete => write!(f, "Complete"),
        }
    }
}

/// Events emitted during an update run.
#[derive(Debug, Clone)]
pub enum UpdateEvent {
    /// Phase changed.
    PhaseChanged { from: UpdatePhase, to: UpdatePhase },
    /// The device answered a version/checksum query.
    DeviceProbed { version: u8, checksum: u16 },
    /// Progress update for the current operation.
    Progress {
        phase: UpdatePhase,
        operation: String,
        current: u64,
        total: u64,
    },
    /// Log message.
    Log { level: LogLevel, message: String },
    /// Run completed with a verified checksum.
    Complete,
}

/// Observer trait for receiving update events.
///
/// Implement this trait in your UI layer to receive updates.
pub trait UpdateObserver: Send + Sync {
    /// Called when an event occurs.
    fn on_event(&self, event: &UpdateEvent);
}

/// No-op observer that discards all events.
pub struct NullObserver;

impl UpdateObserver for NullObserver {
    fn on_event(&self, _event: &UpdateEvent) {
        // Do nothing
    }
}

/// Observer that logs events using tracing.
pub struct TracingObserver;

impl UpdateObserver for TracingObserver {
    fn on_event(&self, event: &UpdateEvent) {
        match event {
            UpdateEvent::PhaseChanged { from, to } => {
                tracing::info!(from = %from, to = %to, "Phase changed");
            }
            UpdateEvent::DeviceProbed { version, checksum } => {
                tracing::info!(
                    version = version,
                    checksum = %format!("{:04X}", checksum),
                    "Device answered"
                );
            }
            UpdateEvent::Progress {
                phase,
                operation,
                current,
                total,
            } => {
                let pct = if *total > 0 {
                    (*current * 100) / *total
                } else {
                    0
                };
                tracing::debug!(phase = %phase, operation = %operation, progress = %format!("{}%", pct), "Progress");
            }
            UpdateEvent::Log { level, message } => match level {
                LogLevel::Trace => tracing::trace!("{}", message),
                LogLevel::Debug => tracing::debug!("{}", message),
                LogLevel::Info => tracing::info!("{}", message),
                LogLevel::Warn => tracing::warn!("{}", message),
                LogLevel::Error => tracing::error!("{}", message),
            },
            UpdateEvent::Complete => {
                tracing::info!("Update complete");
            }
        }
    }
}
