//! Mock two-wire bus for testing.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::traits::{BusError, TwiBus, WriteOutcome};

/// Mock bus for unit testing updater logic without hardware.
///
/// Write outcomes and read replies are scripted up front; every write is
/// captured for later inspection.
pub struct MockBus {
    /// Scripted outcomes returned for successive writes.
    outcome_queue: Arc<Mutex<VecDeque<WriteOutcome>>>,
    /// Scripted replies returned for successive reads.
    reply_queue: Arc<Mutex<VecDeque<Vec<u8>>>>,
    /// Captured writes.
    write_log: Arc<Mutex<Vec<Vec<u8>>>>,
    /// Whether the device is "connected".
    connected: Arc<Mutex<bool>>,
}

impl MockBus {
    pub fn new() -> Self {
        Self {
            outcome_queue: Arc::new(Mutex::new(VecDeque::new())),
            reply_queue: Arc::new(Mutex::new(VecDeque::new())),
            write_log: Arc::new(Mutex::new(Vec::new())),
            connected: Arc::new(Mutex::new(true)),
        }
    }

    /// Queue the outcome for the next unscripted write.
    pub fn queue_outcome(&self, outcome: WriteOutcome) {
        self.outcome_queue.lock().unwrap().push_back(outcome);
    }

    /// Queue the same outcome `n` times.
    pub fn queue_outcomes(&self, outcome: WriteOutcome, n: usize) {
        for _ in 0..n {
            self.queue_outcome(outcome);
        }
    }

    /// Queue a reply to be returned on the next read.
    pub fn queue_reply(&self, reply: &[u8]) {
        self.reply_queue.lock().unwrap().push_back(reply.to_vec());
    }

    /// Queue a version/checksum reply (version, crc lo, crc hi).
    pub fn queue_status_reply(&self, version: u8, checksum: u16) {
        self.queue_reply(&[version, (checksum & 0xFF) as u8, (checksum >> 8) as u8]);
    }

    /// Get all captured writes.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.write_log.lock().unwrap().clone()
    }

    /// Clear captured writes.
    pub fn clear_writes(&self) {
        self.write_log.lock().unwrap().clear();
    }

    /// Simulate the device dropping off the bus.
    pub fn disconnect(&self) {
        *self.connected.lock().unwrap() = false;
    }

    pub fn reconnect(&self) {
        *self.connected.lock().unwrap() = true;
    }
}

impl Default for MockBus {
    fn default() -> Self {
        Self::new()
    }
}

impl TwiBus for MockBus {
    fn write(&mut self, bytes: &[u8]) -> Result<WriteOutcome, BusError> {
        if !*self.connected.lock().unwrap() {
            return Err(BusError::Disconnected);
        }
        self.write_log.lock().unwrap().push(bytes.to_vec());
        Ok(self
            .outcome_queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(WriteOutcome::Ack))
    }

    fn read(&mut self, _len: usize) -> Result<Vec<u8>, BusError> {
        if !*self.connected.lock().unwrap() {
            return Err(BusError::Disconnected);
        }
        self.reply_queue
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(BusError::Timeout { timeout_ms: 1000 })
    }
}
