//! Exportable transfer-plan parameter set.
//!
//! Everything a downstream consumer needs to drive the transfer itself:
//! page geometry, blank sentinel, timing, the page offsets and the
//! flattened page bytes. This is the core's externally visible output
//! besides the run status.

use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::plan::{Page, TransferPlan};
use crate::protocol::constants::{BLANK, FRAME_DELAY_MS, FRAME_SIZE};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanArtifact {
    pub page_size: usize,
    pub frame_size: usize,
    pub blank: u8,
    pub frame_delay_ms: u64,
    /// Total number of bytes the device will receive.
    pub total_length: usize,
    /// Device offset of each transferred page, in transfer order.
    pub page_offsets: Vec<u16>,
    /// All page bytes concatenated in transfer order.
    pub data: Vec<u8>,
}

impl PlanArtifact {
    pub fn from_plan(plan: &TransferPlan) -> Self {
        Self {
            page_size: plan.page_size(),
            frame_size: FRAME_SIZE,
            blank: BLANK,
            frame_delay_ms: FRAME_DELAY_MS,
            total_length: plan.data_len(),
            page_offsets: plan.pages().iter().map(Page::offset).collect(),
            data: plan.flattened(),
        }
    }

    /// Serialize to TOML text.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write the artifact to a TOML file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }
}
