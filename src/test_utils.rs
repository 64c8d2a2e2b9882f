#![expect(
    clippy::unwrap_used,
    reason = "Test utilities use .unwrap() for brevity"
)]

//! Shared test utilities for `hapticbind` unit tests.
//!
//! Only compiled during testing (`#[cfg(test)]`).

use crate::device::{DeviceLink, LinkEventSink};
use crate::error::{HapticError, Result, StringError};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Helper function to create a temporary test directory using tempfile.
/// Returns a `TempDir` that automatically cleans up when dropped.
pub fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

/// Everything a `RecordingLink` observed
#[derive(Debug, Default)]
pub struct LinkLog {
    /// Server addresses passed to `connect`
    pub connects: Vec<String>,
    /// Intensities passed to `send_intensity`, in order
    pub intensities: Vec<f64>,
    /// Number of `disconnect` calls
    pub disconnects: usize,
    /// Sends currently awaiting `send_delay`
    pub in_flight: usize,
    /// Highest `in_flight` value seen
    pub max_in_flight: usize,
}

/// In-memory `DeviceLink` that records every call
///
/// `find_device` returns `device_name` after `scan_delay`; a `None` delay
/// makes scanning hang forever, like a server with no devices.
pub struct RecordingLink {
    /// Shared call log
    pub log: Arc<Mutex<LinkLog>>,
    /// Name reported for the discovered device
    pub device_name: String,
    /// How long scanning takes
    pub scan_delay: Option<Duration>,
    /// Error message to return from `connect`
    pub connect_error: Option<String>,
    /// Whether `send_intensity` reports an unsupported device
    pub unsupported: bool,
    /// How long each accepted send takes to complete
    pub send_delay: Duration,
    connected: bool,
}

impl RecordingLink {
    /// Create a link that finds `device_name` immediately
    pub fn new(device_name: &str) -> (Self, Arc<Mutex<LinkLog>>) {
        let log = Arc::new(Mutex::new(LinkLog::default()));
        (
            Self {
                log: Arc::clone(&log),
                device_name: device_name.to_string(),
                scan_delay: Some(Duration::ZERO),
                connect_error: None,
                unsupported: false,
                send_delay: Duration::ZERO,
                connected: false,
            },
            log,
        )
    }
}

impl DeviceLink for RecordingLink {
    async fn connect(&mut self, server_address: &str, _client_name: &str) -> Result<()> {
        self.log.lock().connects.push(server_address.to_string());
        if let Some(message) = &self.connect_error {
            return Err(HapticError::ConnectionFailed(StringError::new(message.clone())));
        }
        Ok(())
    }

    async fn find_device(&mut self, _events: LinkEventSink) -> Result<String> {
        match self.scan_delay {
            Some(delay) => tokio::time::sleep(delay).await,
            None => std::future::pending::<()>().await,
        }
        self.connected = true;
        Ok(self.device_name.clone())
    }

    async fn send_intensity(&mut self, intensity: f64) -> Result<()> {
        if !self.connected {
            return Err(HapticError::NoDevice);
        }
        if self.unsupported {
            return Err(HapticError::UnsupportedDevice);
        }
        {
            let mut log = self.log.lock();
            log.intensities.push(intensity);
            log.in_flight += 1;
            log.max_in_flight = log.max_in_flight.max(log.in_flight);
        }
        tokio::time::sleep(self.send_delay).await;
        self.log.lock().in_flight -= 1;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.connected = false;
        self.log.lock().disconnects += 1;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

/// Assert two intensities are equal within float noise
pub fn assert_intensity(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected intensity {expected}, got {actual}"
    );
}

/// Unwrap helper kept here so test modules do not each need the lint expectation
pub fn recv_within<T>(rx: &std::sync::mpsc::Receiver<T>, timeout: Duration) -> T {
    rx.recv_timeout(timeout).unwrap()
}
