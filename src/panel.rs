// MIT License - Copyright (c) 2026 Peter Wright
// Panel session: connection lifecycle, inbound pipeline and commands

use std::sync::Arc;

use tokio::net::tcp::OwnedReadHalf;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, timeout, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::PanelConfig;
use crate::error::{AlarmError, Result};
use crate::event::{event_channel, EventReceiver, EventSender, PanelEvent};
use crate::protocol::Command;
use crate::state::{Reconciler, Snapshot};
use crate::translate::{translate, CommandResponse, PanelMessage};
use crate::transport::listener::read_frames;
use crate::transport::Transport;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Time the panel needs to register a bypass before arming.
const ARM_NIGHT_SETTLE: Duration = Duration::from_secs(1);

/// The main public API for interacting with an Arrowhead alarm panel.
///
/// # Example
///
/// ```no_run
/// use arrowhead_bridge::{ArrowheadPanel, PanelConfig, ZoneKind};
/// use tokio_util::sync::CancellationToken;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = PanelConfig::builder()
///         .host("192.168.0.50")
///         .zone(1, "Front door", ZoneKind::Door)
///         .zone(2, "Lounge", ZoneKind::Motion)
///         .build();
///
///     let panel = std::sync::Arc::new(ArrowheadPanel::new(config)?);
///
///     // Every published snapshot
///     let mut snapshots = panel.subscribe();
///     tokio::spawn(async move {
///         while snapshots.changed().await.is_ok() {
///             let snapshot = snapshots.borrow_and_update().clone();
///             println!("{:?} open={:?}", snapshot.partition_status, snapshot.open_zones());
///         }
///     });
///
///     // Connect, set mode and request status every scan interval
///     let cancel = CancellationToken::new();
///     let runner = {
///         let panel = panel.clone();
///         let cancel = cancel.clone();
///         tokio::spawn(async move { panel.run(cancel).await })
///     };
///
///     tokio::signal::ctrl_c().await?;
///     cancel.cancel();
///     runner.await?;
///     Ok(())
/// }
/// ```
pub struct ArrowheadPanel {
    config: PanelConfig,
    snapshot_tx: Arc<watch::Sender<Arc<Snapshot>>>,
    event_tx: EventSender,
    transport: watch::Sender<Option<Arc<Transport>>>,
    session: Mutex<Option<Session>>,
    shutdown: CancellationToken,
}

/// Tasks and transport belonging to one TCP connection.
struct Session {
    transport: Arc<Transport>,
    cancel: CancellationToken,
    listener: JoinHandle<()>,
    consumer: JoinHandle<()>,
}

impl ArrowheadPanel {
    /// Create a panel handle. Nothing is connected until [`connect`](Self::connect)
    /// or [`refresh`](Self::refresh) is called.
    pub fn new(config: PanelConfig) -> Result<Self> {
        config.validate()?;

        let initial = Arc::new(Snapshot::initial(config.zone_numbers()));
        let (snapshot_tx, _) = watch::channel(initial);
        let (event_tx, _) = event_channel(EVENT_CHANNEL_CAPACITY);
        let (transport, _) = watch::channel(None);

        Ok(Self {
            config,
            snapshot_tx: Arc::new(snapshot_tx),
            event_tx,
            transport,
            session: Mutex::new(None),
            shutdown: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    /// Receive every published snapshot. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.snapshot_tx.subscribe()
    }

    /// Subscribe to panel events.
    pub fn events(&self) -> EventReceiver {
        self.event_tx.subscribe()
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot_tx.borrow().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.transport
            .borrow()
            .as_ref()
            .is_some_and(|t| t.is_connected())
    }

    /// Open a connection and start the listener and consumer tasks.
    ///
    /// Does nothing if a live connection already exists. A dead one is torn
    /// down first.
    pub async fn connect(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        if matches!(&*session, Some(s) if s.transport.is_connected()) {
            return Ok(());
        }
        if let Some(stale) = session.take() {
            debug!("Tearing down stale session");
            self.teardown(stale).await;
        }

        let (transport, reader) = Transport::connect(
            &self.config.host,
            self.config.port,
            self.config.connect_timeout(),
        )
        .await?;
        let transport = Arc::new(transport);
        let cancel = self.shutdown.child_token();
        let (frame_tx, frame_rx) = mpsc::unbounded_channel();

        info!("Connection to panel at {} established", transport.peer());
        let _ = self.event_tx.send(PanelEvent::Connected);

        let reconciler = Reconciler::resume(self.snapshot(), self.config.policy.clone());
        let consumer = tokio::spawn(consume_frames(
            frame_rx,
            reconciler,
            Arc::clone(&self.snapshot_tx),
            self.event_tx.clone(),
            cancel.clone(),
        ));
        let listener = tokio::spawn(listen(
            reader,
            Arc::clone(&transport),
            frame_tx,
            self.event_tx.clone(),
            cancel.clone(),
        ));

        self.transport.send_replace(Some(Arc::clone(&transport)));
        *session = Some(Session {
            transport,
            cancel,
            listener,
            consumer,
        });
        Ok(())
    }

    /// Stop both tasks and close the connection. Safe to call when not connected.
    pub async fn disconnect(&self) -> Result<()> {
        let Some(session) = self.session.lock().await.take() else {
            return Ok(());
        };
        info!("Disconnecting from panel");
        self.teardown(session).await;
        let _ = self.event_tx.send(PanelEvent::Disconnected);
        Ok(())
    }

    async fn teardown(&self, session: Session) {
        session.cancel.cancel();
        for (name, handle) in [("listener", session.listener), ("consumer", session.consumer)] {
            if let Err(e) = handle.await {
                warn!("Panel {} task ended abnormally: {}", name, e);
            }
        }
        if let Err(e) = session.transport.close().await {
            debug!("Error closing transport: {}", e);
        }
        self.transport.send_replace(None);
    }

    /// One refresh cycle: reconnect if needed, set the configured mode and
    /// request a status dump, all within the refresh timeout.
    ///
    /// Returns the snapshot current when the cycle completed. The status dump
    /// itself is applied asynchronously as the panel answers.
    pub async fn refresh(&self) -> Result<Arc<Snapshot>> {
        timeout(self.config.refresh_timeout(), self.refresh_cycle())
            .await
            .map_err(|_| AlarmError::RefreshTimeout {
                timeout_ms: self.config.refresh_timeout_ms,
            })?
    }

    async fn refresh_cycle(&self) -> Result<Arc<Snapshot>> {
        if !self.is_connected() {
            self.connect().await?;
        }
        self.set_mode(self.config.mode).await?;
        self.request_status().await?;
        Ok(self.snapshot())
    }

    /// Drive [`refresh`](Self::refresh) every scan interval until `cancel`
    /// fires, then disconnect. Failures are logged and retried next tick.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = interval(self.config.scan_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                result = self.refresh() => result,
            };

            match result {
                Ok(snapshot) => debug!(
                    status = ?snapshot.partition_status,
                    "Refresh cycle complete"
                ),
                Err(e) if e.is_retryable() => {
                    warn!("Refresh failed, retrying in {:?}: {}", self.config.scan_interval(), e);
                }
                Err(e) => error!("Refresh failed: {}", e),
            }
        }

        if let Err(e) = self.disconnect().await {
            warn!("Error disconnecting panel: {}", e);
        }
    }

    // --- Commands ---

    /// Validate, encode and write a command. The panel's answer arrives later
    /// as [`PanelEvent::CommandSucceeded`] or [`PanelEvent::CommandFailed`].
    pub async fn send(&self, command: Command) -> Result<()> {
        command.validate()?;
        let transport = self
            .transport
            .borrow()
            .clone()
            .ok_or(AlarmError::NotConnected)?;

        debug!(verb = command.verb(), "Sending command");
        transport
            .write(command.encode(self.config.delimiter).as_bytes())
            .await
    }

    /// Set the communication mode (1, 2 or 3).
    pub async fn set_mode(&self, mode: u8) -> Result<()> {
        self.send(Command::SetMode { mode }).await
    }

    pub async fn arm_away(&self, area: u32) -> Result<()> {
        self.send(Command::ArmAway { area }).await
    }

    pub async fn arm_stay(&self, area: u32) -> Result<()> {
        self.send(Command::ArmStay { area }).await
    }

    pub async fn disarm(&self, pin: &str, area: u32) -> Result<()> {
        self.send(Command::Disarm {
            area,
            pin: pin.to_string(),
        })
        .await
    }

    pub async fn bypass_zone(&self, zone: u32) -> Result<()> {
        self.send(Command::Bypass { zone }).await
    }

    pub async fn unbypass_zone(&self, zone: u32) -> Result<()> {
        self.send(Command::Unbypass { zone }).await
    }

    pub async fn trigger_output(&self, output: u32) -> Result<()> {
        info!("Triggering output {}", output);
        self.send(Command::OutputOn { output }).await
    }

    pub async fn output_off(&self, output: u32) -> Result<()> {
        self.send(Command::OutputOff { output }).await
    }

    /// Ask for a full status dump (`OK STATUS` followed by every active status).
    pub async fn request_status(&self) -> Result<()> {
        self.send(Command::Status).await
    }

    pub async fn request_version(&self) -> Result<()> {
        self.send(Command::Version).await
    }

    /// Bind `user` (1-99) to `pin` for this connection.
    pub async fn set_user(&self, pin: &str, user: u32) -> Result<()> {
        self.send(Command::SetUser {
            user,
            pin: pin.to_string(),
        })
        .await
    }

    /// Bypass `bypass_zone`, give the panel a second to register it, then arm
    /// stay.
    pub async fn arm_night(&self, bypass_zone: u32, area: u32) -> Result<()> {
        Command::ArmStay { area }.validate()?;
        self.bypass_zone(bypass_zone).await?;
        sleep(ARM_NIGHT_SETTLE).await;
        self.arm_stay(area).await
    }
}

impl Drop for ArrowheadPanel {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Listener task: framing and acks. Marks the transport dead when it stops so
/// the next refresh reconnects.
async fn listen(
    reader: OwnedReadHalf,
    transport: Arc<Transport>,
    frames: mpsc::UnboundedSender<String>,
    event_tx: EventSender,
    cancel: CancellationToken,
) {
    let result = read_frames(reader, &transport, &frames, &cancel).await;
    transport.mark_disconnected();

    if cancel.is_cancelled() {
        return;
    }
    match result {
        Ok(()) => {
            warn!("Panel closed the connection");
            let _ = event_tx.send(PanelEvent::Disconnected);
        }
        Err(e) => {
            error!("Connection to panel lost: {}", e);
            let _ = event_tx.send(PanelEvent::ConnectionLost {
                reason: e.to_string(),
            });
        }
    }
}

/// Consumer task: translate, reconcile, publish. The only writer of the
/// snapshot while the session lives.
async fn consume_frames(
    mut frames: mpsc::UnboundedReceiver<String>,
    mut reconciler: Reconciler,
    snapshot_tx: Arc<watch::Sender<Arc<Snapshot>>>,
    event_tx: EventSender,
    cancel: CancellationToken,
) {
    loop {
        let frame = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            frame = frames.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
        };
        handle_frame(&frame, &mut reconciler, &snapshot_tx, &event_tx);
    }
    debug!("Frame consumer stopped");
}

fn handle_frame(
    frame: &str,
    reconciler: &mut Reconciler,
    snapshot_tx: &watch::Sender<Arc<Snapshot>>,
    event_tx: &EventSender,
) {
    let message = translate(frame);

    match &message {
        PanelMessage::SyncStart => {
            let _ = event_tx.send(PanelEvent::SyncStarted);
        }
        PanelMessage::CommandResponse(CommandResponse::Success { command }) => {
            debug!("Panel accepted command: {}", command);
            let _ = event_tx.send(PanelEvent::CommandSucceeded {
                command: command.clone(),
            });
        }
        PanelMessage::CommandResponse(CommandResponse::Failure { code }) => {
            error!("Alarm panel returned {}", code);
            let _ = event_tx.send(PanelEvent::CommandFailed { code: *code });
        }
        PanelMessage::Zone(update) if !update.status_type.is_tracked() => {
            info!(zone = update.zone_id, "{}", update.description);
            let _ = event_tx.send(PanelEvent::ZoneCondition {
                zone_id: update.zone_id,
                status_type: update.status_type,
                active: update.action,
            });
        }
        PanelMessage::System(update) => {
            if update.condition.is_fault() {
                warn!(pendant = ?update.pendant, "{}", update.condition.description());
            } else {
                info!(pendant = ?update.pendant, "{}", update.condition.description());
            }
            let _ = event_tx.send(PanelEvent::SystemCondition {
                condition: update.condition,
                pendant: update.pendant,
            });
        }
        PanelMessage::Unrecognized(text) => {
            debug!("Dropping unrecognized frame {:?}", text);
        }
        PanelMessage::Zone(_) | PanelMessage::Partition(_) => {}
    }

    let was_syncing = reconciler.sync_in_progress();
    if let Some(snapshot) = reconciler.apply(&message) {
        snapshot_tx.send_replace(Arc::clone(&snapshot));
        let _ = event_tx.send(PanelEvent::SnapshotUpdated(snapshot));
    }
    if was_syncing && !reconciler.sync_in_progress() {
        let _ = event_tx.send(PanelEvent::SyncCompleted);
    }
}
