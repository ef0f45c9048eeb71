//! Diameter peer state machine per RFC 6733 Section 5.6
//!
//! One [`PeerStateMachine`] drives the base-protocol exchanges over a single
//! full-duplex transport:
//! - Capabilities-Exchange (CER/CEA) at connection start
//! - Device-Watchdog (DWR/DWA) after silent intervals, per RFC 3539
//! - Disconnect-Peer (DPR/DPA) for graceful tear-down
//!
//! State transitions:
//! ```text
//!   AwaitingPeerCER -> Connected     (received CER, sent CEA)
//!   AwaitingPeerCEA -> Connected     (sent CER, received CEA)
//!   Connected       -> HalfClosed    (user initiated disconnect, DPR sent)
//!   Connected       -> Disconnected  (received DPR, sent DPA)
//!   HalfClosed      -> Disconnected  (received DPA)
//! ```
//!
//! The machine runs as a task with exclusive ownership of its transport. A
//! dedicated reader task feeds decoded messages into a single selection
//! loop which also waits on the watchdog timer, the user command channel
//! and a quit signal; all transport writes are serialised through that
//! loop. Lifecycle and message events are published on an outbound channel
//! in the order of the underlying wire events.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};

use crate::avp::Avp;
use crate::common::{avp_code, base_cmd, BASE_APPLICATION_ID};
use crate::config::PeerConfig;
use crate::entity::DiameterEntity;
use crate::error::{DiameterError, DiameterResult};
use crate::framer::MessageStreamReader;
use crate::message::{msg_flags, Message};
use crate::sequence::SequenceGenerator;

/// Consecutive unanswered watchdog requests tolerated before the
/// connection is declared dead
const MAX_MISSED_WATCHDOGS: u32 = 3;

/// Upper bound of the uniform jitter added to each watchdog interval
const WATCHDOG_JITTER_MILLIS: u64 = 4000;

/// Peer connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    /// The peer opened the transport; waiting for its CER
    AwaitingPeerCer,
    /// We opened the transport and sent our CER; waiting for the CEA
    AwaitingPeerCea,
    /// Capabilities exchanged; the diameter connection is operational
    Connected,
    /// We sent a DPR and await the DPA
    HalfClosed,
    /// The diameter connection is closed (terminal)
    Disconnected,
}

/// The six base-protocol control messages, classified by command code and
/// the request flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ControlKind {
    Cer,
    Cea,
    Dwr,
    Dwa,
    Dpr,
    Dpa,
}

/// Events published on a peer's outbound channel during its lifetime
#[derive(Debug)]
pub enum PeerEvent {
    /// A listener accepted a transport from the peer (emitted by the
    /// embedding agent, which hands the transport to a responder machine)
    TransportAccepted,
    /// Capabilities-Exchange completed; the connection is operational
    ConnectionEstablished { peer: DiameterEntity },
    /// The diameter connection closed (DPR/DPA completed or a protocol
    /// error forced the close)
    ConnectionClosed,
    /// The remote end closed the transport
    PeerClosedTransport,
    /// This state machine closed the transport on its way out
    ClosedTransportToPeer,
    /// A base-protocol control message arrived
    ControlMessageReceived(Message),
    /// A base-protocol control message was written to the transport
    ControlMessageSent(Message),
    /// An application message arrived
    MessageReceived(Message),
    /// A protocol or transport error occurred
    Error(DiameterError),
}

/// True if the message belongs to the connection state machine: base
/// application id with a CER/CEA, DWR/DWA or DPR/DPA command code.
pub fn is_connection_state_message(message: &Message) -> bool {
    control_kind(message).is_some()
}

fn control_kind(message: &Message) -> Option<ControlKind> {
    if message.app_id != BASE_APPLICATION_ID {
        return None;
    }

    match message.code {
        base_cmd::CAPABILITIES_EXCHANGE if message.is_request() => Some(ControlKind::Cer),
        base_cmd::CAPABILITIES_EXCHANGE => Some(ControlKind::Cea),
        base_cmd::DEVICE_WATCHDOG if message.is_request() => Some(ControlKind::Dwr),
        base_cmd::DEVICE_WATCHDOG => Some(ControlKind::Dwa),
        base_cmd::DISCONNECT_PEER if message.is_request() => Some(ControlKind::Dpr),
        base_cmd::DISCONNECT_PEER => Some(ControlKind::Dpa),
        _ => None,
    }
}

/// What the state machine does with a control message in a given state
#[derive(Debug)]
enum ControlAction {
    /// Extract peer identity, answer with CEA, enter Connected
    EstablishFromCer,
    /// Extract peer identity, enter Connected
    EstablishFromCea,
    /// Answer with DWA, stay in the current state
    AnswerWatchdog,
    /// Absorb without answering, stay in the current state
    Accept,
    /// Answer with DPA, enter Disconnected
    AnswerDisconnect,
    /// The DPA for our DPR arrived; enter Disconnected
    CompleteDisconnect,
    /// Protocol error; close the diameter connection
    Fail(DiameterError),
}

/// The transition table: one row per (state, control message) pair.
fn transition(state: PeerState, kind: ControlKind) -> ControlAction {
    use ControlKind::*;

    match (state, kind) {
        (PeerState::AwaitingPeerCer, Cer) => ControlAction::EstablishFromCer,
        (PeerState::AwaitingPeerCer, _) => ControlAction::Fail(
            DiameterError::UnexpectedStateMessage(
                "expected a Capabilities-Exchange request".to_string(),
            ),
        ),

        (PeerState::AwaitingPeerCea, Cea) => ControlAction::EstablishFromCea,
        (PeerState::AwaitingPeerCea, _) => ControlAction::Fail(
            DiameterError::UnexpectedStateMessage(
                "expected a Capabilities-Exchange answer".to_string(),
            ),
        ),

        (PeerState::Connected, Dwr) => ControlAction::AnswerWatchdog,
        (PeerState::Connected, Dwa) => ControlAction::Accept,
        (PeerState::Connected, Dpr) => ControlAction::AnswerDisconnect,
        (PeerState::Connected, Dpa) => ControlAction::Fail(DiameterError::UnsolicitedAnswer(
            "received Disconnect-Peer answer without an outstanding request".to_string(),
        )),
        (PeerState::Connected, Cer | Cea) => ControlAction::Fail(
            DiameterError::UnexpectedStateMessage(
                "received Capabilities-Exchange message on an established connection".to_string(),
            ),
        ),

        (PeerState::HalfClosed, Dwr | Dwa) => ControlAction::Accept,
        (PeerState::HalfClosed, Dpa) => ControlAction::CompleteDisconnect,
        (PeerState::HalfClosed, Cer | Cea | Dpr) => ControlAction::Fail(
            DiameterError::UnexpectedStateMessage(
                "unexpected control message on a half-closed connection".to_string(),
            ),
        ),

        (PeerState::Disconnected, _) => ControlAction::Fail(
            DiameterError::UnexpectedStateMessage(
                "received message from a disconnected peer".to_string(),
            ),
        ),
    }
}

/// Watchdog timer per RFC 3539: each armed interval is the base Tw plus a
/// one-sided uniform jitter of up to 4 seconds. Every received message
/// resets it.
#[derive(Debug)]
struct WatchdogTimer {
    base: Duration,
    deadline: tokio::time::Instant,
}

impl WatchdogTimer {
    fn new(base: Duration) -> Self {
        Self {
            base,
            deadline: Self::jittered_deadline(base),
        }
    }

    fn reset(&mut self) {
        self.deadline = Self::jittered_deadline(self.base);
    }

    fn jittered_deadline(base: Duration) -> tokio::time::Instant {
        let jitter = Duration::from_millis(rand::rng().random_range(0..WATCHDOG_JITTER_MILLIS));
        tokio::time::Instant::now() + base + jitter
    }

    async fn expired(&self) {
        tokio::time::sleep_until(self.deadline).await;
    }
}

enum PeerCommand {
    SendMessage(Message, oneshot::Sender<DiameterResult<()>>),
    InitiateDisconnect(oneshot::Sender<DiameterResult<()>>),
}

/// A cloneable handle for interacting with a running peer state machine
#[derive(Debug, Clone)]
pub struct PeerHandle {
    command_tx: mpsc::Sender<PeerCommand>,
    quit_tx: mpsc::Sender<()>,
}

impl PeerHandle {
    /// Send an application message to the peer. Requests whose hop-by-hop
    /// or end-to-end identifier is zero are stamped with freshly generated
    /// identifiers before the write. Connection state machine messages
    /// cannot be sent this way, and sends are only legal while the
    /// connection is established.
    pub async fn send_message(&self, message: Message) -> DiameterResult<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(PeerCommand::SendMessage(message, reply_tx))
            .await
            .map_err(|_| DiameterError::PeerTerminated)?;
        reply_rx.await.map_err(|_| DiameterError::PeerTerminated)?
    }

    /// Start the Disconnect-Peer procedure. Returns the outcome of sending
    /// the DPR; it does not wait for the DPA. Only legal while the
    /// connection is established, and at most once.
    pub async fn initiate_disconnect(&self) -> DiameterResult<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(PeerCommand::InitiateDisconnect(reply_tx))
            .await
            .map_err(|_| DiameterError::PeerTerminated)?;
        reply_rx.await.map_err(|_| DiameterError::PeerTerminated)?
    }

    /// Ask the state machine to exit. The transport is closed on the way
    /// out and a final `ClosedTransportToPeer` event is emitted.
    pub async fn shutdown(&self) {
        let _ = self.quit_tx.send(()).await;
    }
}

/// A per-peer state machine bound to one transport
///
/// Construct with [`initiator`](Self::initiator) when this node opened the
/// transport (it will send the CER) or [`responder`](Self::responder) when
/// the peer opened it (the machine waits for the peer's CER). Obtain a
/// [`PeerHandle`] before calling [`run`](Self::run), which consumes the
/// machine and drives the connection until it ends.
pub struct PeerStateMachine<T> {
    config: PeerConfig,
    transport: T,
    locally_initiated: bool,
    event_tx: mpsc::Sender<PeerEvent>,
    command_tx: mpsc::Sender<PeerCommand>,
    command_rx: mpsc::Receiver<PeerCommand>,
    quit_tx: mpsc::Sender<()>,
    quit_rx: mpsc::Receiver<()>,
    sequence: Arc<SequenceGenerator>,
}

impl<T> PeerStateMachine<T>
where
    T: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    /// A state machine for a transport this node opened toward the peer
    pub fn initiator(config: PeerConfig, transport: T, event_tx: mpsc::Sender<PeerEvent>) -> Self {
        Self::new(config, transport, true, event_tx)
    }

    /// A state machine for a transport the peer opened toward this node
    pub fn responder(config: PeerConfig, transport: T, event_tx: mpsc::Sender<PeerEvent>) -> Self {
        Self::new(config, transport, false, event_tx)
    }

    fn new(
        config: PeerConfig,
        transport: T,
        locally_initiated: bool,
        event_tx: mpsc::Sender<PeerEvent>,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::channel(16);
        let (quit_tx, quit_rx) = mpsc::channel(1);

        Self {
            config,
            transport,
            locally_initiated,
            event_tx,
            command_tx,
            command_rx,
            quit_tx,
            quit_rx,
            sequence: Arc::new(SequenceGenerator::new()),
        }
    }

    /// A handle for sending messages and initiating disconnect
    pub fn handle(&self) -> PeerHandle {
        PeerHandle {
            command_tx: self.command_tx.clone(),
            quit_tx: self.quit_tx.clone(),
        }
    }

    /// The identifier generator this machine stamps outgoing requests with
    pub fn sequence_generator(&self) -> Arc<SequenceGenerator> {
        Arc::clone(&self.sequence)
    }

    /// Drive the connection until it ends: the peer closes the transport, a
    /// protocol or transport error occurs, or the machine reaches
    /// `Disconnected`. The transport is always closed on exit and a final
    /// `ClosedTransportToPeer` event is emitted.
    pub async fn run(self) {
        let PeerStateMachine {
            config,
            transport,
            locally_initiated,
            event_tx,
            command_tx,
            mut command_rx,
            quit_tx,
            mut quit_rx,
            sequence,
        } = self;

        // Held so the command/quit channels stay open for the whole run
        // even if every handle is dropped.
        let _command_guard = command_tx;
        let _quit_guard = quit_tx;

        let (read_half, write_half) = tokio::io::split(transport);
        let (message_tx, mut message_rx) = mpsc::channel(16);
        let reader = tokio::spawn(read_incoming_messages(read_half, message_tx));

        let mut driver = Driver {
            state: PeerState::AwaitingPeerCer,
            peer: None,
            config,
            write_half,
            event_tx: event_tx.clone(),
            sequence,
            result_code_2001: Avp::new(avp_code::RESULT_CODE, 0, true, &2001u32.to_be_bytes()),
            missed_watchdogs: 0,
        };

        driver
            .drive(locally_initiated, &mut message_rx, &mut command_rx, &mut quit_rx)
            .await;

        let _ = driver.write_half.shutdown().await;
        reader.abort();
        let _ = event_tx.send(PeerEvent::ClosedTransportToPeer).await;
    }
}

/// Reader task: owns the read half and its framer, publishing each decoded
/// message (or the terminal error) onto the state machine's channel.
async fn read_incoming_messages<R: AsyncRead + Unpin>(
    read_half: R,
    message_tx: mpsc::Sender<DiameterResult<Message>>,
) {
    let mut reader = MessageStreamReader::new(read_half);
    loop {
        match reader.read_next().await {
            Ok(message) => {
                if message_tx.send(Ok(message)).await.is_err() {
                    return;
                }
            }
            Err(e) => {
                let _ = message_tx.send(Err(e)).await;
                return;
            }
        }
    }
}

struct Driver<W> {
    state: PeerState,
    peer: Option<DiameterEntity>,
    config: PeerConfig,
    write_half: W,
    event_tx: mpsc::Sender<PeerEvent>,
    sequence: Arc<SequenceGenerator>,
    result_code_2001: Avp,
    missed_watchdogs: u32,
}

impl<W: AsyncWrite + Unpin> Driver<W> {
    async fn drive(
        &mut self,
        locally_initiated: bool,
        message_rx: &mut mpsc::Receiver<DiameterResult<Message>>,
        command_rx: &mut mpsc::Receiver<PeerCommand>,
        quit_rx: &mut mpsc::Receiver<()>,
    ) {
        if locally_initiated {
            let cer = self.build_cer();
            if !self.send_control(cer).await {
                return;
            }
            self.state = PeerState::AwaitingPeerCea;
        } else {
            self.state = PeerState::AwaitingPeerCer;
        }

        let mut watchdog = WatchdogTimer::new(self.config.watchdog_interval);

        loop {
            tokio::select! {
                incoming = message_rx.recv() => {
                    match incoming {
                        Some(Ok(message)) => {
                            watchdog.reset();
                            if !self.handle_incoming(message).await {
                                return;
                            }
                        }
                        Some(Err(e)) => {
                            self.handle_reader_failure(e).await;
                            return;
                        }
                        None => return,
                    }
                }

                _ = watchdog.expired() => {
                    if !self.handle_watchdog_expiry().await {
                        return;
                    }
                    watchdog.reset();
                }

                command = command_rx.recv() => {
                    match command {
                        Some(command) => {
                            if !self.handle_command(command).await {
                                return;
                            }
                        }
                        None => return,
                    }
                }

                _ = quit_rx.recv() => {
                    return;
                }
            }
        }
    }

    /// Returns false when the state machine must exit.
    async fn handle_incoming(&mut self, message: Message) -> bool {
        match control_kind(&message) {
            Some(kind) => {
                self.emit(PeerEvent::ControlMessageReceived(message.clone())).await;
                if kind == ControlKind::Dwa {
                    self.missed_watchdogs = 0;
                }
                self.handle_control(kind, message).await
            }
            None => self.handle_application_message(message).await,
        }
    }

    async fn handle_control(&mut self, kind: ControlKind, message: Message) -> bool {
        match transition(self.state, kind) {
            ControlAction::EstablishFromCer => {
                let peer = match DiameterEntity::from_capabilities_exchange(&message) {
                    Ok(peer) => peer,
                    Err(e) => {
                        self.fail(e).await;
                        return false;
                    }
                };

                let cea = message.generate_matching_response(
                    self.config
                        .identity
                        .capabilities_exchange_avps_with_result_code(&self.result_code_2001),
                    vec![],
                );
                if !self.send_control(cea).await {
                    return false;
                }

                self.enter_connected(peer).await;
                true
            }

            ControlAction::EstablishFromCea => {
                match DiameterEntity::from_capabilities_exchange(&message) {
                    Ok(peer) => {
                        self.enter_connected(peer).await;
                        true
                    }
                    Err(e) => {
                        self.fail(e).await;
                        false
                    }
                }
            }

            ControlAction::AnswerWatchdog => {
                let dwa = message.generate_matching_response(self.answer_avps(), vec![]);
                self.send_control(dwa).await
            }

            ControlAction::Accept => true,

            ControlAction::AnswerDisconnect => {
                let dpa = message.generate_matching_response(self.answer_avps(), vec![]);
                self.send_control(dpa).await;
                self.enter_disconnected().await;
                false
            }

            ControlAction::CompleteDisconnect => {
                self.enter_disconnected().await;
                false
            }

            ControlAction::Fail(e) => {
                self.fail(e).await;
                false
            }
        }
    }

    async fn handle_application_message(&mut self, message: Message) -> bool {
        match self.state {
            PeerState::Connected => {
                self.emit(PeerEvent::MessageReceived(message)).await;
                true
            }
            PeerState::AwaitingPeerCer => {
                self.fail(DiameterError::UnexpectedStateMessage(
                    "received application message before a Capabilities-Exchange request"
                        .to_string(),
                ))
                .await;
                false
            }
            PeerState::AwaitingPeerCea => {
                self.fail(DiameterError::UnexpectedStateMessage(
                    "received application message before a Capabilities-Exchange answer"
                        .to_string(),
                ))
                .await;
                false
            }
            PeerState::HalfClosed => {
                self.fail(DiameterError::UnexpectedStateMessage(
                    "received application message on a half-closed connection".to_string(),
                ))
                .await;
                false
            }
            PeerState::Disconnected => false,
        }
    }

    async fn handle_watchdog_expiry(&mut self) -> bool {
        // A DPR is already outstanding in HalfClosed; no DWR is sent there
        // or before the connection is established.
        if self.state != PeerState::Connected {
            return true;
        }

        if self.missed_watchdogs >= MAX_MISSED_WATCHDOGS {
            log::warn!(
                "peer {:?} missed {} watchdogs, closing",
                self.peer.as_ref().map(|p| p.origin_host.as_str()),
                self.missed_watchdogs
            );
            self.fail(DiameterError::WatchdogTimeoutExceeded).await;
            return false;
        }

        let dwr = self.build_dwr();
        if !self.send_control(dwr).await {
            return false;
        }
        self.missed_watchdogs += 1;
        true
    }

    async fn handle_command(&mut self, command: PeerCommand) -> bool {
        match command {
            PeerCommand::SendMessage(message, reply_tx) => {
                let result = self.send_application_message(message).await;
                let _ = reply_tx.send(result);
                true
            }

            PeerCommand::InitiateDisconnect(reply_tx) => {
                if self.state != PeerState::Connected {
                    let _ = reply_tx.send(Err(DiameterError::UnexpectedStateMessage(
                        "cannot initiate disconnect in the current state".to_string(),
                    )));
                    return true;
                }

                let dpr = self.build_dpr();
                match self.write_message(&dpr).await {
                    Ok(()) => {
                        self.emit(PeerEvent::ControlMessageSent(dpr)).await;
                        self.state = PeerState::HalfClosed;
                        let _ = reply_tx.send(Ok(()));
                        true
                    }
                    Err(e) => {
                        log::warn!("failed to send DPR: {e}");
                        let _ = reply_tx.send(Err(e));
                        false
                    }
                }
            }
        }
    }

    async fn send_application_message(&mut self, mut message: Message) -> DiameterResult<()> {
        if is_connection_state_message(&message) {
            return Err(DiameterError::UnexpectedStateMessage(
                "connection state machine messages cannot be sent by the application".to_string(),
            ));
        }
        if self.state != PeerState::Connected {
            return Err(DiameterError::UnexpectedStateMessage(format!(
                "cannot send application message in state {:?}",
                self.state
            )));
        }

        if message.is_request() {
            if message.end_to_end_id == 0 {
                message.end_to_end_id = self.sequence.next_end_to_end_id();
            }
            if message.hop_by_hop_id == 0 {
                message.hop_by_hop_id = self.sequence.next_hop_by_hop_id();
            }
        }

        self.write_message(&message).await
    }

    async fn handle_reader_failure(&mut self, e: DiameterError) {
        match e {
            // End-of-stream is expected while a DPR is outstanding; in any
            // other state the peer vanished under an open connection.
            DiameterError::TransportClosedByPeer => {
                if self.state == PeerState::HalfClosed {
                    self.emit(PeerEvent::PeerClosedTransport).await;
                } else {
                    log::warn!("peer closed the transport unexpectedly");
                    self.emit(PeerEvent::Error(DiameterError::TransportClosedByPeer))
                        .await;
                }
            }
            e => {
                log::warn!("incoming message stream failed: {e}");
                self.emit(PeerEvent::Error(e)).await;
            }
        }
    }

    async fn write_message(&mut self, message: &Message) -> DiameterResult<()> {
        self.write_half.write_all(&message.encode()).await?;
        Ok(())
    }

    /// Send a control message and publish the sent event. On transport
    /// failure an error event is emitted and false is returned.
    async fn send_control(&mut self, message: Message) -> bool {
        match self.write_message(&message).await {
            Ok(()) => {
                self.emit(PeerEvent::ControlMessageSent(message)).await;
                true
            }
            Err(e) => {
                log::warn!("failed to send control message: {e}");
                self.emit(PeerEvent::Error(e)).await;
                false
            }
        }
    }

    async fn enter_connected(&mut self, peer: DiameterEntity) {
        log::info!(
            "diameter connection established with {} ({})",
            peer.origin_host,
            peer.origin_realm
        );
        self.state = PeerState::Connected;
        self.peer = Some(peer.clone());
        self.emit(PeerEvent::ConnectionEstablished { peer }).await;
    }

    async fn enter_disconnected(&mut self) {
        log::info!(
            "diameter connection with {:?} closed",
            self.peer.as_ref().map(|p| p.origin_host.as_str())
        );
        self.state = PeerState::Disconnected;
        self.emit(PeerEvent::ConnectionClosed).await;
    }

    /// Emit the error and close the diameter connection. The closed event
    /// is only published once a connection had actually been established.
    async fn fail(&mut self, e: DiameterError) {
        log::warn!("peer state machine error: {e}");
        let established = matches!(self.state, PeerState::Connected | PeerState::HalfClosed);
        self.emit(PeerEvent::Error(e)).await;

        if established {
            self.enter_disconnected().await;
        } else {
            self.state = PeerState::Disconnected;
        }
    }

    async fn emit(&self, event: PeerEvent) {
        let _ = self.event_tx.send(event).await;
    }

    fn answer_avps(&self) -> Vec<Avp> {
        vec![
            self.result_code_2001.clone(),
            self.config.identity.origin_host_avp(),
            self.config.identity.origin_realm_avp(),
        ]
    }

    fn build_cer(&self) -> Message {
        Message::new(
            msg_flags::REQUEST,
            base_cmd::CAPABILITIES_EXCHANGE,
            BASE_APPLICATION_ID,
            self.sequence.next_hop_by_hop_id(),
            self.sequence.next_end_to_end_id(),
            self.config.identity.capabilities_exchange_avps(),
            vec![],
        )
    }

    fn build_dwr(&self) -> Message {
        Message::new(
            msg_flags::REQUEST,
            base_cmd::DEVICE_WATCHDOG,
            BASE_APPLICATION_ID,
            self.sequence.next_hop_by_hop_id(),
            self.sequence.next_end_to_end_id(),
            vec![
                self.config.identity.origin_host_avp(),
                self.config.identity.origin_realm_avp(),
            ],
            vec![],
        )
    }

    fn build_dpr(&self) -> Message {
        Message::new(
            msg_flags::REQUEST,
            base_cmd::DISCONNECT_PEER,
            BASE_APPLICATION_ID,
            self.sequence.next_hop_by_hop_id(),
            self.sequence.next_end_to_end_id(),
            vec![
                self.config.identity.origin_host_avp(),
                self.config.identity.origin_realm_avp(),
                Avp::new(
                    avp_code::DISCONNECT_CAUSE,
                    0,
                    true,
                    &(self.config.disconnect_cause as i32).to_be_bytes(),
                ),
            ],
            vec![],
        )
    }
}
