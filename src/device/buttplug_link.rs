//! Intiface server link
//!
//! `DeviceLink` implementation on top of the Buttplug client. Connects over
//! WebSocket, selects the first device the server reports and drives its
//! first usable actuator type.

use crate::device::{DeviceEvent, DeviceLink, LinkEventSink};
use crate::error::{HapticError, Result, StringError};
use buttplug::client::{
    ButtplugClient, ButtplugClientDevice, ButtplugClientEvent, LinearCommand, RotateCommand,
    ScalarValueCommand,
};
use buttplug::core::connector::new_json_ws_client_connector;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How often the device list is checked while scanning
const SCAN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Movement duration used when driving a linear actuator
const LINEAR_DURATION_MS: u32 = 250;

/// Buttplug client connection with one selected device
#[derive(Default)]
pub struct ButtplugLink {
    client: Option<ButtplugClient>,
    device: Option<Arc<ButtplugClientDevice>>,
    forwarder: Option<tokio::task::JoinHandle<()>>,
}

impl ButtplugLink {
    /// Create an unconnected link
    pub fn new() -> Self {
        Self::default()
    }
}

/// Forward a disconnect without blocking the dispatcher runtime
fn report_disconnect(events: &LinkEventSink) {
    if let Err(e) = events.try_send(DeviceEvent::Disconnected) {
        warn!("Could not report device disconnect: {}", e);
    }
}

impl DeviceLink for ButtplugLink {
    async fn connect(&mut self, server_address: &str, client_name: &str) -> Result<()> {
        if self.client.is_some() {
            debug!("Dropping stale Buttplug client before reconnecting");
            self.disconnect().await?;
        }

        let client = ButtplugClient::new(client_name);
        let connector = new_json_ws_client_connector(server_address);
        client
            .connect(connector)
            .await
            .map_err(|e| HapticError::ConnectionFailed(Box::new(e)))?;

        info!("Connected to Intiface server at {}", server_address);
        self.client = Some(client);
        Ok(())
    }

    async fn find_device(&mut self, events: LinkEventSink) -> Result<String> {
        let Some(client) = self.client.as_ref() else {
            return Err(HapticError::ConnectionFailed(StringError::new(
                "not connected to a server",
            )));
        };

        client
            .start_scanning()
            .await
            .map_err(|e| HapticError::ConnectionFailed(Box::new(e)))?;
        debug!("Scanning for devices");

        let device = loop {
            if !client.connected() {
                return Err(HapticError::ConnectionFailed(StringError::new(
                    "server closed the connection while scanning",
                )));
            }
            if let Some(device) = client.devices().into_iter().next() {
                break device;
            }
            tokio::time::sleep(SCAN_POLL_INTERVAL).await;
        };

        if let Err(e) = client.stop_scanning().await {
            // Some device managers end scanning on their own
            warn!("Failed to stop scanning: {}", e);
        }

        let name = device.name().clone();
        info!(
            "Selected device {} (index {}): {} vibrate, {} linear, {} rotate actuator(s)",
            name,
            device.index(),
            device.vibrate_attributes().len(),
            device.linear_attributes().len(),
            device.rotate_attributes().len()
        );

        let selected = device.index();
        let mut stream = client.event_stream();
        self.forwarder = Some(tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                match event {
                    ButtplugClientEvent::DeviceRemoved(removed) if removed.index() == selected => {
                        info!("Device {} removed", removed.name());
                        report_disconnect(&events);
                        break;
                    }
                    ButtplugClientEvent::ServerDisconnect => {
                        warn!("Intiface server disconnected");
                        report_disconnect(&events);
                        break;
                    }
                    ButtplugClientEvent::PingTimeout => {
                        warn!("Intiface server ping timeout");
                    }
                    ButtplugClientEvent::Error(e) => {
                        warn!("Buttplug client error: {}", e);
                    }
                    other => debug!("Ignoring client event {:?}", other),
                }
            }
        }));

        self.device = Some(device);
        Ok(name)
    }

    async fn send_intensity(&mut self, intensity: f64) -> Result<()> {
        let Some(device) = self.device.as_ref().filter(|device| device.connected()) else {
            return Err(HapticError::NoDevice);
        };

        let result = if !device.vibrate_attributes().is_empty() {
            device
                .vibrate(&ScalarValueCommand::ScalarValue(intensity))
                .await
        } else if !device.linear_attributes().is_empty() {
            device
                .linear(&LinearCommand::Linear(LINEAR_DURATION_MS, intensity))
                .await
        } else if !device.rotate_attributes().is_empty() {
            device
                .rotate(&RotateCommand::Rotate(intensity, true))
                .await
        } else {
            return Err(HapticError::UnsupportedDevice);
        };

        result.map_err(|e| HapticError::DeviceCommandFailed(Box::new(e)))
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }

        if let Some(device) = self.device.take()
            && device.connected()
            && let Err(e) = device.stop().await
        {
            debug!("Failed to stop device {}: {}", device.name(), e);
        }

        if let Some(client) = self.client.take()
            && client.connected()
        {
            client
                .disconnect()
                .await
                .map_err(|e| HapticError::ConnectionFailed(Box::new(e)))?;
            info!("Disconnected from Intiface server");
        }

        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.client.as_ref().is_some_and(ButtplugClient::connected)
            && self
                .device
                .as_ref()
                .is_some_and(|device| device.connected())
    }
}
