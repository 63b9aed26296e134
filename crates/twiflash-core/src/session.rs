//! Update session - high-level orchestrator for a flash run.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::events::{TracingObserver, UpdateObserver};
use crate::image::MemoryImage;
use crate::plan::TransferPlan;
use crate::protocol::constants::{
    BLANK, DEVICE_ADDRESS, DEVICE_MEMORY_SIZE, FRAME_DELAY_MS, PAGE_SIZE, PROBE_RETRY_DELAY_MS,
};
use crate::transport::{I2cdevBus, TwiBus};
use crate::updater::{UpdateReport, Updater, UpdaterConfig};

/// Configuration for an update session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Path to the firmware binary.
    pub firmware_path: Option<String>,
    /// Device offset the firmware binary is loaded at.
    pub load_offset: usize,
    /// Bus device node to open.
    pub bus_path: String,
    /// Two-wire address of the bootloader.
    pub device_address: u8,
    /// Probe attempt cap; `None` retries forever.
    pub probe_retry_limit: Option<u32>,
    /// Wait between probe attempts, in milliseconds.
    pub probe_retry_delay_ms: u64,
    /// Pause after each write-phase transaction, in milliseconds.
    pub frame_delay_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            firmware_path: None,
            load_offset: 0,
            bus_path: "/dev/i2c-1".to_string(),
            device_address: DEVICE_ADDRESS,
            probe_retry_limit: None,
            probe_retry_delay_ms: PROBE_RETRY_DELAY_MS,
            frame_delay_ms: FRAME_DELAY_MS,
        }
    }
}

impl SessionConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SessionConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn updater_config(&self) -> UpdaterConfig {
        UpdaterConfig {
            probe_retry_limit: self.probe_retry_limit,
            probe_retry_delay: Duration::from_millis(self.probe_retry_delay_ms),
            frame_delay: Duration::from_millis(self.frame_delay_ms),
        }
    }
}

/// Update session - orchestrates one complete flash run.
pub struct UpdateSession<O: UpdateObserver> {
    config: SessionConfig,
    observer: Arc<O>,
}

impl UpdateSession<TracingObserver> {
    /// Create a new session with the default tracing observer.
    pub fn new(config: SessionConfig) -> Self {
        Self::with_observer(config, Arc::new(TracingObserver))
    }
}

impl<O: UpdateObserver + 'static> UpdateSession<O> {
    /// Create a new session with a custom observer.
    pub fn with_observer(config: SessionConfig, observer: Arc<O>) -> Self {
        Self { config, observer }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Load the firmware binary and derive the transfer plan.
    pub fn build_plan(&self) -> Result<TransferPlan> {
        let path = self
            .config
            .firmware_path
            .as_ref()
            .context("no firmware file configured")?;
        info!(path = %path, "Loading firmware");
        let data = std::fs::read(path).with_context(|| format!("reading {path}"))?;

        let mut image = MemoryImage::new(DEVICE_MEMORY_SIZE, BLANK);
        image.write(self.config.load_offset, &data)?;
        let plan = TransferPlan::compact(&image, PAGE_SIZE)?;
        info!(
            pages = plan.page_count(),
            bytes = plan.data_len(),
            "Transfer plan ready"
        );
        Ok(plan)
    }

    /// Run the complete update against the configured bus device.
    #[instrument(skip(self))]
    pub fn run(&self) -> Result<UpdateReport> {
        let plan = self.build_plan()?;
        let mut bus = I2cdevBus::open(&self.config.bus_path, self.config.device_address)?;
        self.run_plan(&plan, &mut bus)
    }

    /// Run the complete update over a caller-supplied bus.
    pub fn run_with_bus<B: TwiBus>(&self, bus: &mut B) -> Result<UpdateReport> {
        let plan = self.build_plan()?;
        self.run_plan(&plan, bus)
    }

    fn run_plan<B: TwiBus>(&self, plan: &TransferPlan, bus: &mut B) -> Result<UpdateReport> {
        let mut updater = Updater::new(bus, self.observer.as_ref(), self.config.updater_config());
        let report = updater.run(plan)?;
        info!(
            pages = report.pages_written,
            checksum = %format!("{:04X}", report.checksum_after),
            restarted = report.restarted,
            "Update finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_match_device_contract() {
        let config = SessionConfig::default();
        assert_eq!(config.device_address, 0x58);
        assert_eq!(config.frame_delay_ms, 1);
        assert_eq!(config.probe_retry_limit, None);
    }

    #[test]
    fn test_config_toml_round_trip() {
        let config = SessionConfig {
            firmware_path: Some("firmware.bin".to_string()),
            probe_retry_limit: Some(30),
            ..Default::default()
        };
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: SessionConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.firmware_path.as_deref(), Some("firmware.bin"));
        assert_eq!(parsed.probe_retry_limit, Some(30));
        assert_eq!(parsed.bus_path, config.bus_path);
    }
}
