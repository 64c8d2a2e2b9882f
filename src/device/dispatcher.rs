//! Device command dispatcher
//!
//! Owns the `DeviceLink` on a dedicated thread running a current-thread
//! tokio runtime. Any thread can submit commands through a `CommandSender`;
//! the worker executes them strictly in order and awaits each device call
//! before starting the next, so sends never overlap.

use crate::config::DEFAULT_SERVER_ADDRESS;
use crate::device::{CLIENT_NAME, DeviceCommand, DeviceEvent, DeviceLink};
use crate::error::{HapticError, Result, StringError};
use std::ops::ControlFlow;
use std::sync::{Arc, mpsc};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::{mpsc as async_mpsc, watch};
use tracing::{debug, error, info, warn};

/// Connection parameters for the dispatcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherOptions {
    /// Intiface server address (`ws://host:port`)
    pub server_address: String,
    /// Client name announced to the server
    pub client_name: String,
}

impl Default for DispatcherOptions {
    fn default() -> Self {
        Self {
            server_address: DEFAULT_SERVER_ADDRESS.to_string(),
            client_name: CLIENT_NAME.to_string(),
        }
    }
}

/// Thread-safe handle for submitting commands
///
/// `submit` never blocks, so it is safe to call from GUI callbacks and from
/// the OS input-hook callback.
#[derive(Debug, Clone)]
pub struct CommandSender {
    commands: async_mpsc::UnboundedSender<DeviceCommand>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl CommandSender {
    /// Queue `command` for the worker
    ///
    /// `Shutdown` also cancels a connection attempt that is still scanning.
    pub fn submit(&self, command: DeviceCommand) -> Result<()> {
        if matches!(command, DeviceCommand::Shutdown) {
            self.shutdown.send_replace(true);
        }
        self.commands
            .send(command)
            .map_err(|_| HapticError::DispatcherStopped)
    }

    /// Create a sender whose commands are delivered to `commands`
    ///
    /// Used by tests that inspect submitted commands without a worker.
    pub fn detached() -> (Self, async_mpsc::UnboundedReceiver<DeviceCommand>) {
        let (commands, receiver) = async_mpsc::unbounded_channel();
        let (shutdown, _) = watch::channel(false);
        (
            Self {
                commands,
                shutdown: Arc::new(shutdown),
            },
            receiver,
        )
    }
}

/// Background worker that serializes device commands
pub struct CommandDispatcher {
    sender: CommandSender,
    done: mpsc::Receiver<()>,
    handle: Option<JoinHandle<()>>,
}

impl CommandDispatcher {
    /// Start the worker thread
    ///
    /// `events` receives progress and failures; it is also handed to the
    /// link so device removal can be reported.
    pub fn spawn<L: DeviceLink>(
        link: L,
        options: DispatcherOptions,
        events: mpsc::SyncSender<DeviceEvent>,
    ) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let (command_tx, command_rx) = async_mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (done_tx, done_rx) = mpsc::sync_channel(1);

        let worker = Worker {
            link,
            options,
            commands: command_rx,
            shutdown: shutdown_rx,
            events,
            last_sent: None,
        };

        let handle = thread::Builder::new()
            .name("device-dispatcher".to_string())
            .spawn(move || {
                runtime.block_on(worker.run());
                // Receiver may already have given up waiting
                done_tx.send(()).ok();
            })?;

        info!("Device command dispatcher started");

        Ok(Self {
            sender: CommandSender {
                commands: command_tx,
                shutdown: Arc::new(shutdown_tx),
            },
            done: done_rx,
            handle: Some(handle),
        })
    }

    /// Get a handle for submitting commands
    pub fn sender(&self) -> CommandSender {
        self.sender.clone()
    }

    /// Stop the device, disconnect and wait for the worker to exit
    ///
    /// Commands queued before the call still run first. Returns an error if
    /// the worker does not finish within `timeout`; the thread is then left
    /// to finish on its own.
    pub fn shutdown(mut self, timeout: Duration) -> Result<()> {
        info!("Shutting down device command dispatcher");
        if self.sender.submit(DeviceCommand::Shutdown).is_err() {
            debug!("Dispatcher worker already stopped");
        }

        match self.done.recv_timeout(timeout) {
            Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => {
                if let Some(handle) = self.handle.take()
                    && handle.join().is_err()
                {
                    error!("Device dispatcher thread panicked");
                }
                info!("Device command dispatcher stopped");
                Ok(())
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!(
                    "Device dispatcher did not stop within {:?}, abandoning it",
                    timeout
                );
                Err(HapticError::DeviceCommandFailed(StringError::new(format!(
                    "device shutdown timed out after {timeout:?}"
                ))))
            }
        }
    }
}

impl Drop for CommandDispatcher {
    fn drop(&mut self) {
        if self.handle.is_some() {
            // Best effort; the worker closes the connection on its own
            self.sender.submit(DeviceCommand::Shutdown).ok();
        }
    }
}

/// Collapse a batch of queued commands
///
/// Consecutive `Vibrate` commands are reduced to the last one, so at most one
/// intensity is pending at a time. Commands after `Shutdown` are dropped.
pub fn coalesce(batch: Vec<DeviceCommand>) -> Vec<DeviceCommand> {
    let mut commands: Vec<DeviceCommand> = Vec::with_capacity(batch.len());
    for command in batch {
        if matches!(command, DeviceCommand::Vibrate(_))
            && matches!(commands.last(), Some(DeviceCommand::Vibrate(_)))
        {
            commands.pop();
        }
        commands.push(command);
        if matches!(command, DeviceCommand::Shutdown) {
            break;
        }
    }
    commands
}

struct Worker<L> {
    link: L,
    options: DispatcherOptions,
    commands: async_mpsc::UnboundedReceiver<DeviceCommand>,
    shutdown: watch::Receiver<bool>,
    events: mpsc::SyncSender<DeviceEvent>,
    /// Last intensity the device acknowledged
    last_sent: Option<f64>,
}

impl<L: DeviceLink> Worker<L> {
    async fn run(mut self) {
        while let Some(first) = self.commands.recv().await {
            let mut batch = vec![first];
            while let Ok(next) = self.commands.try_recv() {
                batch.push(next);
            }

            let received = batch.len();
            let batch = coalesce(batch);
            if batch.len() < received {
                debug!("Coalesced {} queued commands into {}", received, batch.len());
            }

            for command in batch {
                if self.execute(command).await.is_break() {
                    info!("Device dispatcher worker exiting");
                    return;
                }
            }
        }

        debug!("All command senders dropped, closing device connection");
        self.close().await;
    }

    async fn execute(&mut self, command: DeviceCommand) -> ControlFlow<()> {
        match command {
            DeviceCommand::Connect => self.connect().await,
            DeviceCommand::Vibrate(intensity) => {
                self.vibrate(intensity).await;
                ControlFlow::Continue(())
            }
            DeviceCommand::Shutdown => {
                self.close().await;
                ControlFlow::Break(())
            }
        }
    }

    async fn connect(&mut self) -> ControlFlow<()> {
        if self.link.is_connected() {
            debug!("Already connected to a device, ignoring connect request");
            return ControlFlow::Continue(());
        }

        info!("Connecting to Intiface at {}", self.options.server_address);
        self.last_sent = None;
        self.emit(DeviceEvent::Connecting);

        let outcome = {
            let establish = establish(&mut self.link, &self.options, &self.events);
            tokio::select! {
                biased;
                result = establish => Some(result),
                _ = self.shutdown.wait_for(|stop| *stop) => None,
            }
        };

        match outcome {
            Some(Ok(name)) => {
                info!("Connected to device: {}", name);
                self.emit(DeviceEvent::Connected { name });
                ControlFlow::Continue(())
            }
            Some(Err(e)) => {
                error!("Connection attempt failed: {}", e);
                if let Err(close_error) = self.link.disconnect().await {
                    debug!("Ignoring cleanup error after failed connect: {}", close_error);
                }
                self.emit(DeviceEvent::ConnectFailed(e.to_string()));
                ControlFlow::Continue(())
            }
            None => {
                info!("Shutdown requested while connecting");
                self.close().await;
                ControlFlow::Break(())
            }
        }
    }

    async fn vibrate(&mut self, intensity: f64) {
        if !intensity.is_finite() {
            warn!("Ignoring non-finite intensity {}", intensity);
            return;
        }
        let intensity = intensity.clamp(0.0, 1.0);

        if !self.link.is_connected() {
            debug!("No device connected, dropping intensity {}", intensity);
            return;
        }

        if self
            .last_sent
            .is_some_and(|last| (last - intensity).abs() < f64::EPSILON)
        {
            debug!("Intensity {} already active, skipping send", intensity);
            return;
        }

        match self.link.send_intensity(intensity).await {
            Ok(()) => {
                debug!("Device intensity set to {}", intensity);
                self.last_sent = Some(intensity);
            }
            Err(HapticError::UnsupportedDevice) => {
                warn!("Selected device has no vibrate, linear or rotate actuator");
                self.emit(DeviceEvent::Unsupported);
            }
            Err(e) => {
                error!("Error during vibration: {}", e);
                self.emit(DeviceEvent::CommandFailed(e.to_string()));
            }
        }
    }

    /// Stop and disconnect, ignoring errors
    async fn close(&mut self) {
        if self.link.is_connected()
            && let Err(e) = self.link.send_intensity(0.0).await
        {
            debug!("Ignoring stop error during shutdown: {}", e);
        }
        if let Err(e) = self.link.disconnect().await {
            debug!("Ignoring disconnect error during shutdown: {}", e);
        }
        self.last_sent = None;
    }

    fn emit(&self, event: DeviceEvent) {
        emit(&self.events, event);
    }
}

/// Report `event` without blocking the runtime
fn emit(events: &mpsc::SyncSender<DeviceEvent>, event: DeviceEvent) {
    match events.try_send(event) {
        Ok(()) => {}
        Err(mpsc::TrySendError::Full(dropped)) => {
            warn!("Device event queue full, dropping {:?}", dropped);
        }
        Err(mpsc::TrySendError::Disconnected(dropped)) => {
            debug!("Device event receiver gone, dropping {:?}", dropped);
        }
    }
}

async fn establish<L: DeviceLink>(
    link: &mut L,
    options: &DispatcherOptions,
    events: &mpsc::SyncSender<DeviceEvent>,
) -> Result<String> {
    link.connect(&options.server_address, &options.client_name)
        .await?;
    emit(events, DeviceEvent::Scanning);
    link.find_device(events.clone()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{LinkLog, RecordingLink, assert_intensity, recv_within};

    const WAIT: Duration = Duration::from_secs(5);

    fn spawn(link: RecordingLink) -> (CommandDispatcher, mpsc::Receiver<DeviceEvent>) {
        let (tx, rx) = mpsc::sync_channel(32);
        let dispatcher = CommandDispatcher::spawn(link, DispatcherOptions::default(), tx).unwrap();
        (dispatcher, rx)
    }

    fn wait_for_connected(rx: &mpsc::Receiver<DeviceEvent>) -> String {
        assert_eq!(recv_within(rx, WAIT), DeviceEvent::Connecting);
        assert_eq!(recv_within(rx, WAIT), DeviceEvent::Scanning);
        match recv_within(rx, WAIT) {
            DeviceEvent::Connected { name } => name,
            other => panic!("expected Connected, got {other:?}"),
        }
    }

    fn wait_for_log(log: &Arc<parking_lot::Mutex<LinkLog>>, condition: impl Fn(&LinkLog) -> bool) {
        let deadline = std::time::Instant::now() + WAIT;
        while !condition(&log.lock()) {
            assert!(std::time::Instant::now() < deadline, "link never reached expected state");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_coalesce_keeps_last_vibrate() {
        let batch = vec![
            DeviceCommand::Vibrate(0.2),
            DeviceCommand::Vibrate(0.4),
            DeviceCommand::Vibrate(0.0),
        ];
        assert_eq!(coalesce(batch), vec![DeviceCommand::Vibrate(0.0)]);
    }

    #[test]
    fn test_coalesce_preserves_connect_position() {
        let batch = vec![
            DeviceCommand::Vibrate(0.2),
            DeviceCommand::Connect,
            DeviceCommand::Vibrate(0.4),
            DeviceCommand::Vibrate(0.6),
        ];
        assert_eq!(
            coalesce(batch),
            vec![
                DeviceCommand::Vibrate(0.2),
                DeviceCommand::Connect,
                DeviceCommand::Vibrate(0.6),
            ]
        );
    }

    #[test]
    fn test_coalesce_drops_commands_after_shutdown() {
        let batch = vec![
            DeviceCommand::Vibrate(1.0),
            DeviceCommand::Shutdown,
            DeviceCommand::Connect,
        ];
        assert_eq!(
            coalesce(batch),
            vec![DeviceCommand::Vibrate(1.0), DeviceCommand::Shutdown]
        );
    }

    #[test]
    fn test_connect_then_vibrate() {
        let (link, log) = RecordingLink::new("Lush 3");
        let (dispatcher, rx) = spawn(link);
        let sender = dispatcher.sender();

        sender.submit(DeviceCommand::Connect).unwrap();
        assert_eq!(wait_for_connected(&rx), "Lush 3");

        sender.submit(DeviceCommand::Vibrate(0.5)).unwrap();
        dispatcher.shutdown(WAIT).unwrap();

        let log = log.lock();
        assert_eq!(log.connects, vec![DEFAULT_SERVER_ADDRESS.to_string()]);
        assert_eq!(log.intensities.len(), 2);
        assert_intensity(log.intensities[0], 0.5);
        // Shutdown stops the device before disconnecting
        assert_intensity(log.intensities[1], 0.0);
        assert_eq!(log.disconnects, 1);
    }

    #[test]
    fn test_vibrates_queued_behind_slow_send_collapse() {
        let (mut link, log) = RecordingLink::new("Edge");
        link.send_delay = Duration::from_millis(200);
        let (dispatcher, rx) = spawn(link);
        let sender = dispatcher.sender();

        sender.submit(DeviceCommand::Connect).unwrap();
        wait_for_connected(&rx);

        sender.submit(DeviceCommand::Vibrate(0.2)).unwrap();
        wait_for_log(&log, |log| log.in_flight == 1);

        // Queued while 0.2 is still being sent
        for intensity in [0.4, 0.6, 0.8] {
            sender.submit(DeviceCommand::Vibrate(intensity)).unwrap();
        }
        dispatcher.shutdown(WAIT).unwrap();

        let log = log.lock();
        assert_eq!(log.intensities.len(), 3, "sent {:?}", log.intensities);
        assert_intensity(log.intensities[0], 0.2);
        assert_intensity(log.intensities[1], 0.8);
        assert_intensity(log.intensities[2], 0.0);
        assert_eq!(log.max_in_flight, 1);
        assert_eq!(log.in_flight, 0);
    }

    #[test]
    fn test_full_event_queue_does_not_stall_worker() {
        let (link, log) = RecordingLink::new("Edge");
        // Room for Connecting only; nobody drains it until shutdown
        let (tx, rx) = mpsc::sync_channel(1);
        let dispatcher = CommandDispatcher::spawn(link, DispatcherOptions::default(), tx).unwrap();
        let sender = dispatcher.sender();

        sender.submit(DeviceCommand::Connect).unwrap();
        sender.submit(DeviceCommand::Vibrate(0.5)).unwrap();
        // Shutting down mid-connect would cancel the scan
        wait_for_log(&log, |log| !log.intensities.is_empty());
        dispatcher.shutdown(WAIT).unwrap();

        let log = log.lock();
        assert_eq!(log.intensities.len(), 2);
        assert_intensity(log.intensities[0], 0.5);
        assert_intensity(log.intensities[1], 0.0);
        assert_eq!(rx.try_recv().unwrap(), DeviceEvent::Connecting);
    }

    #[test]
    fn test_vibrate_without_device_is_dropped() {
        let (link, log) = RecordingLink::new("Lush 3");
        let (dispatcher, _rx) = spawn(link);

        dispatcher
            .sender()
            .submit(DeviceCommand::Vibrate(0.8))
            .unwrap();
        dispatcher.shutdown(WAIT).unwrap();

        assert!(log.lock().intensities.is_empty());
    }

    #[test]
    fn test_repeated_intensity_sent_once() {
        let (link, log) = RecordingLink::new("Edge");
        let (dispatcher, rx) = spawn(link);
        let sender = dispatcher.sender();

        sender.submit(DeviceCommand::Connect).unwrap();
        wait_for_connected(&rx);

        sender.submit(DeviceCommand::Vibrate(0.3)).unwrap();
        sender.submit(DeviceCommand::Connect).unwrap();
        sender.submit(DeviceCommand::Vibrate(0.3)).unwrap();
        dispatcher.shutdown(WAIT).unwrap();

        let log = log.lock();
        // One 0.3, then the shutdown stop; the second connect was ignored
        assert_eq!(log.intensities.len(), 2);
        assert_intensity(log.intensities[0], 0.3);
        assert_eq!(log.connects.len(), 1);
    }

    #[test]
    fn test_intensity_is_clamped() {
        let (link, log) = RecordingLink::new("Edge");
        let (dispatcher, rx) = spawn(link);
        let sender = dispatcher.sender();

        sender.submit(DeviceCommand::Connect).unwrap();
        wait_for_connected(&rx);
        sender.submit(DeviceCommand::Vibrate(1.7)).unwrap();
        dispatcher.shutdown(WAIT).unwrap();

        assert_intensity(log.lock().intensities[0], 1.0);
    }

    #[test]
    fn test_connect_failure_reports_and_allows_retry() {
        let (mut link, log) = RecordingLink::new("Edge");
        link.connect_error = Some("connection refused".to_string());
        let (dispatcher, rx) = spawn(link);
        let sender = dispatcher.sender();

        sender.submit(DeviceCommand::Connect).unwrap();
        assert_eq!(recv_within(&rx, WAIT), DeviceEvent::Connecting);
        match recv_within(&rx, WAIT) {
            DeviceEvent::ConnectFailed(message) => {
                assert!(message.contains("connection refused"));
            }
            other => panic!("expected ConnectFailed, got {other:?}"),
        }

        sender.submit(DeviceCommand::Connect).unwrap();
        assert_eq!(recv_within(&rx, WAIT), DeviceEvent::Connecting);
        dispatcher.shutdown(WAIT).unwrap();

        assert_eq!(log.lock().connects.len(), 2);
    }

    #[test]
    fn test_unsupported_device_reported() {
        let (mut link, _log) = RecordingLink::new("Mystery Box");
        link.unsupported = true;
        let (dispatcher, rx) = spawn(link);
        let sender = dispatcher.sender();

        sender.submit(DeviceCommand::Connect).unwrap();
        wait_for_connected(&rx);
        sender.submit(DeviceCommand::Vibrate(0.5)).unwrap();

        assert_eq!(recv_within(&rx, WAIT), DeviceEvent::Unsupported);
        dispatcher.shutdown(WAIT).unwrap();
    }

    #[test]
    fn test_shutdown_cancels_endless_scan() {
        let (mut link, log) = RecordingLink::new("Never Found");
        link.scan_delay = None;
        let (dispatcher, rx) = spawn(link);

        dispatcher.sender().submit(DeviceCommand::Connect).unwrap();
        assert_eq!(recv_within(&rx, WAIT), DeviceEvent::Connecting);
        assert_eq!(recv_within(&rx, WAIT), DeviceEvent::Scanning);

        dispatcher.shutdown(WAIT).unwrap();

        let log = log.lock();
        assert!(log.intensities.is_empty());
        assert_eq!(log.disconnects, 1);
    }

    #[test]
    fn test_submit_after_shutdown_fails() {
        let (link, _log) = RecordingLink::new("Edge");
        let (dispatcher, _rx) = spawn(link);
        let sender = dispatcher.sender();

        dispatcher.shutdown(WAIT).unwrap();

        assert!(matches!(
            sender.submit(DeviceCommand::Vibrate(0.5)),
            Err(HapticError::DispatcherStopped)
        ));
    }

    #[test]
    fn test_detached_sender_delivers_commands() {
        let (sender, mut rx) = CommandSender::detached();
        sender.submit(DeviceCommand::Connect).unwrap();
        assert_eq!(rx.try_recv().unwrap(), DeviceCommand::Connect);
    }
}
