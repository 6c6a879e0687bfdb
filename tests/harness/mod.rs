//! Shared in-memory fakes for coordinator integration tests
//!
//! The relay channel, media engine, capture hardware and ICE discovery are
//! capability traits, so the tests script them: the signaling channel records
//! every push, the connector hands out inspectable connections whose event
//! channels the tests drive by hand.

#![allow(dead_code)]

use async_trait::async_trait;
use conference_webrtc::{
    ConferenceConfig, ConferenceCoordinator, ConferenceEvent, ConnectionEvent, ConnectionEvents,
    Error, IceCandidateInit, IceServer, IceServerProvider, IceServerSet, LocalStream, LocalTrack,
    MediaConnection, MediaConnector, MediaConstraints, MediaDevices, MediaSender, Result,
    SenderParameters, SessionDescription, SignalingChannel, SignalingMessage, TrackKind,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Signaling channel that records every pushed message
pub struct RecordingSignaling {
    messages: Mutex<Vec<SignalingMessage>>,
    fail: AtomicBool,
}

impl RecordingSignaling {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            messages: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        })
    }

    pub fn sent(&self) -> Vec<SignalingMessage> {
        self.messages.lock().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.messages
            .lock()
            .iter()
            .filter(|m| m.event() == event)
            .count()
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl SignalingChannel for RecordingSignaling {
    async fn push(&self, message: SignalingMessage) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Signaling("relay rejected the push".to_string()));
        }
        self.messages.lock().push(message);
        Ok(())
    }
}

/// Sender whose parameters live in memory
pub struct FakeSender {
    kind: TrackKind,
    parameters: Mutex<SenderParameters>,
}

impl FakeSender {
    pub fn new(kind: TrackKind, parameters: SenderParameters) -> Arc<Self> {
        Arc::new(Self {
            kind,
            parameters: Mutex::new(parameters),
        })
    }
}

impl MediaSender for FakeSender {
    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn parameters(&self) -> SenderParameters {
        self.parameters.lock().clone()
    }

    fn set_parameters(&self, parameters: SenderParameters) -> Result<()> {
        *self.parameters.lock() = parameters;
        Ok(())
    }
}

/// Scriptable media connection: records what the coordinator applies to it
/// and lets tests emit connection events by hand.
pub struct FakeConnection {
    peer_id: String,
    closed: AtomicBool,
    fail_negotiation: AtomicBool,
    remote_descriptions: Mutex<Vec<SessionDescription>>,
    remote_candidates: Mutex<Vec<IceCandidateInit>>,
    senders: Mutex<Vec<Arc<FakeSender>>>,
    events: mpsc::UnboundedSender<ConnectionEvent>,
}

impl FakeConnection {
    pub fn emit(&self, event: ConnectionEvent) {
        let _ = self.events.send(event);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn set_fail_negotiation(&self, fail: bool) {
        self.fail_negotiation.store(fail, Ordering::SeqCst);
    }

    pub fn remote_descriptions(&self) -> Vec<SessionDescription> {
        self.remote_descriptions.lock().clone()
    }

    pub fn remote_candidates(&self) -> Vec<IceCandidateInit> {
        self.remote_candidates.lock().clone()
    }

    pub fn senders_by_kind(&self, kind: TrackKind) -> Vec<Arc<FakeSender>> {
        self.senders
            .lock()
            .iter()
            .filter(|s| s.kind() == kind)
            .cloned()
            .collect()
    }

    fn check_usable(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::Negotiation("connection is closed".to_string()));
        }
        if self.fail_negotiation.load(Ordering::SeqCst) {
            return Err(Error::Negotiation("scripted negotiation failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl MediaConnection for FakeConnection {
    async fn create_offer(&self) -> Result<SessionDescription> {
        self.check_usable()?;
        Ok(SessionDescription::offer(format!(
            "v=0 offer for {}",
            self.peer_id
        )))
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        self.check_usable()?;
        Ok(SessionDescription::answer(format!(
            "v=0 answer for {}",
            self.peer_id
        )))
    }

    async fn apply_remote_description(&self, description: SessionDescription) -> Result<()> {
        self.check_usable()?;
        self.remote_descriptions.lock().push(description);
        Ok(())
    }

    async fn add_remote_candidate(&self, candidate: IceCandidateInit) -> Result<()> {
        self.check_usable()?;
        self.remote_candidates.lock().push(candidate);
        Ok(())
    }

    fn senders(&self) -> Vec<Arc<dyn MediaSender>> {
        self.senders
            .lock()
            .iter()
            .map(|s| Arc::clone(s) as Arc<dyn MediaSender>)
            .collect()
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Connector handing out [`FakeConnection`]s, one sender per local track
pub struct FakeConnector {
    connections: Mutex<HashMap<String, Arc<FakeConnection>>>,
    last_ice: Mutex<Option<IceServerSet>>,
    connect_calls: AtomicUsize,
}

impl FakeConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            connections: Mutex::new(HashMap::new()),
            last_ice: Mutex::new(None),
            connect_calls: AtomicUsize::new(0),
        })
    }

    pub fn connection(&self, peer_id: &str) -> Arc<FakeConnection> {
        self.connections
            .lock()
            .get(peer_id)
            .cloned()
            .unwrap_or_else(|| panic!("no connection was created for {}", peer_id))
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn last_ice(&self) -> Option<IceServerSet> {
        self.last_ice.lock().clone()
    }
}

#[async_trait]
impl MediaConnector for FakeConnector {
    async fn connect(
        &self,
        peer_id: &str,
        ice_servers: &IceServerSet,
        local_tracks: &[Arc<LocalTrack>],
    ) -> Result<(Arc<dyn MediaConnection>, ConnectionEvents)> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_ice.lock() = Some(ice_servers.clone());

        let (tx, rx) = mpsc::unbounded_channel();
        let senders = local_tracks
            .iter()
            .map(|track| {
                FakeSender::new(
                    track.kind(),
                    SenderParameters {
                        encodings: vec![Default::default()],
                    },
                )
            })
            .collect();

        let connection = Arc::new(FakeConnection {
            peer_id: peer_id.to_string(),
            closed: AtomicBool::new(false),
            fail_negotiation: AtomicBool::new(false),
            remote_descriptions: Mutex::new(Vec::new()),
            remote_candidates: Mutex::new(Vec::new()),
            senders: Mutex::new(senders),
            events: tx,
        });

        self.connections
            .lock()
            .insert(peer_id.to_string(), Arc::clone(&connection));

        Ok((connection as Arc<dyn MediaConnection>, rx))
    }
}

/// Capture capability returning fixed track kinds
pub struct FakeDevices {
    kinds: Vec<TrackKind>,
    fail: AtomicBool,
}

impl FakeDevices {
    pub fn new(kinds: Vec<TrackKind>) -> Arc<Self> {
        Arc::new(Self {
            kinds,
            fail: AtomicBool::new(false),
        })
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl MediaDevices for FakeDevices {
    async fn get_user_media(&self, _constraints: &MediaConstraints) -> Result<LocalStream> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Media("capture device unavailable".to_string()));
        }
        Ok(LocalStream::new(
            self.kinds
                .iter()
                .map(|k| Arc::new(LocalTrack::new(*k)))
                .collect(),
        ))
    }
}

/// ICE discovery returning a fixed descriptor list
pub struct FakeIceProvider {
    servers: Mutex<Vec<IceServer>>,
    fail: AtomicBool,
}

impl FakeIceProvider {
    pub fn new(servers: Vec<IceServer>) -> Arc<Self> {
        Arc::new(Self {
            servers: Mutex::new(servers),
            fail: AtomicBool::new(false),
        })
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn set_servers(&self, servers: Vec<IceServer>) {
        *self.servers.lock() = servers;
    }
}

#[async_trait]
impl IceServerProvider for FakeIceProvider {
    async fn fetch_ice_servers(&self) -> Result<Vec<IceServer>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::IceDiscovery("discovery endpoint down".to_string()));
        }
        Ok(self.servers.lock().clone())
    }
}

/// A coordinator wired to fakes, plus handles to all of them
pub struct TestConference {
    pub coordinator: ConferenceCoordinator,
    pub events: mpsc::UnboundedReceiver<ConferenceEvent>,
    pub signaling: Arc<RecordingSignaling>,
    pub connector: Arc<FakeConnector>,
    pub devices: Arc<FakeDevices>,
    pub ice: Arc<FakeIceProvider>,
}

pub fn conference() -> TestConference {
    init_tracing();

    let signaling = RecordingSignaling::new();
    let connector = FakeConnector::new();
    let devices = FakeDevices::new(vec![TrackKind::Audio, TrackKind::Video]);
    let ice = FakeIceProvider::new(vec![IceServer::stun("stun:stun.test.example:3478")]);
    let (tx, rx) = mpsc::unbounded_channel();

    let coordinator = ConferenceCoordinator::new(
        ConferenceConfig::default(),
        signaling.clone(),
        connector.clone(),
        devices.clone(),
        ice.clone(),
        tx,
    )
    .expect("default config is valid");

    TestConference {
        coordinator,
        events: rx,
        signaling,
        connector,
        devices,
        ice,
    }
}

pub async fn initialized_conference() -> TestConference {
    let conference = conference();
    conference
        .coordinator
        .initialize(false)
        .await
        .expect("initialization succeeds against fakes");
    conference
}

/// Receive the next conference event or panic after one second
pub async fn recv_event(events: &mut mpsc::UnboundedReceiver<ConferenceEvent>) -> ConferenceEvent {
    tokio::time::timeout(Duration::from_secs(1), events.recv())
        .await
        .expect("timed out waiting for a conference event")
        .expect("event channel closed")
}

/// Receive the next conference event if one arrives within `wait`
pub async fn try_recv_event(
    events: &mut mpsc::UnboundedReceiver<ConferenceEvent>,
    wait: Duration,
) -> Option<ConferenceEvent> {
    tokio::time::timeout(wait, events.recv()).await.ok().flatten()
}

/// Poll a synchronous condition until it holds or panic after two seconds
pub async fn wait_for(what: &str, condition: impl Fn() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {}", what);
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}
