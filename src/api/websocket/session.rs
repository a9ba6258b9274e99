//! One WebSocket connection from welcome frame to close
//!
//! A session sends the welcome text, then processes inbound frames strictly
//! in arrival order until the peer closes, the connection goes idle, the
//! transport fails or the server shuts down. Failures stay local to the
//! session.

use std::borrow::Cow;
use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::time::{interval_at, sleep, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::api::server::AppState;
use crate::models::SessionMode;
use crate::protocol::{ack_for, parse_frame, CloseReason, InboundFrame, ParsedFrame, WELCOME_MESSAGE};
use crate::state::SharedState;

/// Why a session stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// Peer sent a close frame
    Closed(Option<CloseReason>),
    /// No inbound frame within the idle timeout
    IdleTimeout,
    /// Stream ended without a close frame
    Disconnected,
    /// Server asked the session to close
    Shutdown,
    /// Forced shutdown deadline passed
    Terminated,
    TransportError(String),
}

pub struct Session {
    id: Uuid,
    peer: Option<SocketAddr>,
    mode: SessionMode,
    store: SharedState,
    ping_period: Option<Duration>,
    idle_timeout: Option<Duration>,
    shutdown: CancellationToken,
}

impl Session {
    /// Session without keepalive pings or idle timeout
    pub fn new(mode: SessionMode, store: SharedState, shutdown: CancellationToken) -> Self {
        Self {
            id: Uuid::new_v4(),
            peer: None,
            mode,
            store,
            ping_period: None,
            idle_timeout: None,
            shutdown,
        }
    }

    /// Session configured from the running server's state
    pub fn from_state(state: &AppState, peer: SocketAddr) -> Self {
        Self::new(state.mode, state.store.clone(), state.shutdown.clone())
            .with_keepalive(state.server.ping_period, state.server.idle_timeout)
            .with_peer(peer)
    }

    pub fn with_keepalive(mut self, ping_period: Option<Duration>, idle_timeout: Option<Duration>) -> Self {
        self.ping_period = ping_period.filter(|p| !p.is_zero());
        self.idle_timeout = idle_timeout.filter(|t| !t.is_zero());
        self
    }

    pub fn with_peer(mut self, peer: SocketAddr) -> Self {
        self.peer = Some(peer);
        self
    }

    /// Run the session on an upgraded socket until it ends or `kill` fires
    pub async fn run(self, socket: WebSocket, kill: CancellationToken) -> SessionEnd {
        let (sink, stream) = socket.split();
        self.serve(sink, stream, kill).await
    }

    /// Drive the session over any frame transport; `kill` drops it mid-write
    pub(crate) async fn serve<K, S>(self, sink: K, stream: S, kill: CancellationToken) -> SessionEnd
    where
        K: Sink<Message, Error = axum::Error> + Unpin,
        S: Stream<Item = Result<Message, axum::Error>> + Unpin,
    {
        info!(
            session = %self.id,
            peer = ?self.peer,
            mode = self.mode.as_str(),
            "WebSocket session opened"
        );

        let end = tokio::select! {
            biased;

            _ = kill.cancelled() => SessionEnd::Terminated,
            end = self.drive(sink, stream) => end,
        };

        self.log_end(&end);
        end
    }

    /// Welcome the peer, then receive until the session ends
    pub async fn drive<K, S>(&self, mut sink: K, mut stream: S) -> SessionEnd
    where
        K: Sink<Message, Error = axum::Error> + Unpin,
        S: Stream<Item = Result<Message, axum::Error>> + Unpin,
    {
        if let Err(e) = sink.send(Message::Text(WELCOME_MESSAGE.to_string())).await {
            return SessionEnd::TransportError(e.to_string());
        }

        let end = self.receive(&mut sink, &mut stream).await;

        // Flushes any pending close reply; the peer may already be gone.
        if !matches!(end, SessionEnd::TransportError(_)) {
            let _ = sink.close().await;
        }

        end
    }

    async fn receive<K, S>(&self, sink: &mut K, stream: &mut S) -> SessionEnd
    where
        K: Sink<Message, Error = axum::Error> + Unpin,
        S: Stream<Item = Result<Message, axum::Error>> + Unpin,
    {
        let mut ping = self.ping_period.map(|period| {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        let idle = sleep(self.idle_timeout.unwrap_or_default());
        tokio::pin!(idle);

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => {
                    let frame = CloseFrame {
                        code: close_code::AWAY,
                        reason: Cow::from("server shutting down"),
                    };
                    let _ = sink.send(Message::Close(Some(frame))).await;
                    return SessionEnd::Shutdown;
                }

                next = stream.next() => {
                    let msg = match next {
                        Some(Ok(msg)) => msg,
                        Some(Err(e)) => return SessionEnd::TransportError(e.to_string()),
                        None => return SessionEnd::Disconnected,
                    };

                    if let Some(timeout) = self.idle_timeout {
                        idle.as_mut().reset(Instant::now() + timeout);
                    }

                    match InboundFrame::from(msg) {
                        InboundFrame::Text(text) => {
                            if let Err(e) = self.on_text(sink, text).await {
                                return SessionEnd::TransportError(e.to_string());
                            }
                        }
                        InboundFrame::Close(reason) => return SessionEnd::Closed(reason),
                        InboundFrame::Other => {
                            trace!(session = %self.id, "Ignoring non-text frame");
                        }
                    }
                }

                _ = &mut idle, if self.idle_timeout.is_some() => {
                    return SessionEnd::IdleTimeout;
                }

                _ = next_tick(&mut ping) => {
                    if let Err(e) = sink.send(Message::Ping(Vec::new())).await {
                        return SessionEnd::TransportError(e.to_string());
                    }
                }
            }
        }
    }

    async fn on_text<K>(&self, sink: &mut K, text: String) -> Result<(), axum::Error>
    where
        K: Sink<Message, Error = axum::Error> + Unpin,
    {
        info!(session = %self.id, text = %text, "Message received");

        match self.mode {
            SessionMode::Telemetry => match parse_frame(&text) {
                ParsedFrame::Telemetry(update) => {
                    debug!(session = %self.id, key = %update.key, value = %update.value, "Telemetry updated");
                    self.store.telemetry.apply(update);
                }
                ParsedFrame::Raw(raw) => {
                    debug!(session = %self.id, "Message is not a telemetry field");
                    self.store.telemetry.set_status(raw);
                }
            },
            SessionMode::Chat => {
                let seq = self.store.messages.append(text.as_str());
                debug!(session = %self.id, seq, "Message appended to log");
                sink.send(Message::Text(ack_for(&text))).await?;
            }
        }

        Ok(())
    }

    fn log_end(&self, end: &SessionEnd) {
        match end {
            SessionEnd::Closed(Some(reason)) => {
                info!(session = %self.id, "Connection closed: {}", reason)
            }
            SessionEnd::Closed(None) => info!(session = %self.id, "Connection closed"),
            SessionEnd::IdleTimeout => {
                info!(session = %self.id, "Connection closed after idle timeout")
            }
            SessionEnd::Disconnected => {
                info!(session = %self.id, "Connection dropped without close frame")
            }
            SessionEnd::Shutdown => info!(session = %self.id, "Connection closed by shutdown"),
            SessionEnd::Terminated => {
                warn!(session = %self.id, "Connection terminated after shutdown deadline")
            }
            SessionEnd::TransportError(e) => {
                warn!(session = %self.id, "Connection failed: {}", e)
            }
        }
    }
}

/// Next keepalive tick, or never when pings are disabled
async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TelemetryKey, AWAITING};
    use futures::channel::mpsc;
    use futures::stream;

    type TestSink = futures::sink::SinkMapErr<
        mpsc::UnboundedSender<Message>,
        fn(mpsc::SendError) -> axum::Error,
    >;

    fn to_axum_error(e: mpsc::SendError) -> axum::Error {
        axum::Error::new(e)
    }

    fn test_sink() -> (TestSink, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded();
        let map: fn(mpsc::SendError) -> axum::Error = to_axum_error;
        (tx.sink_map_err(map), rx)
    }

    /// Frames followed by a stream that never yields
    fn frames(
        msgs: Vec<Message>,
    ) -> impl Stream<Item = Result<Message, axum::Error>> + Unpin {
        stream::iter(msgs.into_iter().map(Ok)).chain(stream::pending())
    }

    fn text(s: &str) -> Message {
        Message::Text(s.to_string())
    }

    fn close(reason: &str) -> Message {
        Message::Close(Some(CloseFrame {
            code: close_code::NORMAL,
            reason: Cow::from(reason.to_string()),
        }))
    }

    fn texts(sent: &[Message]) -> Vec<String> {
        sent.iter()
            .filter_map(|m| match m {
                Message::Text(t) => Some(t.clone()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_welcome_is_first_frame() {
        let store = SharedState::default();
        let session = Session::new(SessionMode::Telemetry, store, CancellationToken::new());
        let (sink, rx) = test_sink();

        let end = session.drive(sink, frames(vec![close("bye")])).await;
        let sent: Vec<Message> = rx.collect().await;

        assert!(matches!(end, SessionEnd::Closed(Some(_))));
        assert_eq!(sent.first(), Some(&text(WELCOME_MESSAGE)));
    }

    #[tokio::test]
    async fn test_telemetry_frames_update_store() {
        let store = SharedState::default();
        let session = Session::new(SessionMode::Telemetry, store.clone(), CancellationToken::new());
        let (sink, rx) = test_sink();

        let msgs = vec![
            text("latitude:-23.55"),
            text("longitude:-46.63"),
            text("hello"),
            text("azimuth:1:2"),
            close("done"),
        ];
        let end = session.drive(sink, frames(msgs)).await;
        let sent: Vec<Message> = rx.collect().await;

        assert_eq!(
            end,
            SessionEnd::Closed(Some(CloseReason {
                code: 1000,
                reason: "done".to_string(),
            }))
        );
        let snapshot = store.telemetry.snapshot();
        assert_eq!(snapshot.latitude, "-23.55");
        assert_eq!(snapshot.longitude, "-46.63");
        assert_eq!(snapshot.azimuth, AWAITING);
        // last non-telemetry frame lands in the status slot
        assert_eq!(snapshot.status, "azimuth:1:2");
        // telemetry mode never acknowledges
        assert_eq!(texts(&sent), vec![WELCOME_MESSAGE.to_string()]);
        assert!(store.messages.is_empty());
    }

    #[tokio::test]
    async fn test_close_stops_processing_buffered_frames() {
        let store = SharedState::default();
        let session = Session::new(SessionMode::Telemetry, store.clone(), CancellationToken::new());
        let (sink, _rx) = test_sink();

        let msgs = vec![text("latitude:1"), Message::Close(None), text("latitude:2")];
        let end = session.drive(sink, frames(msgs)).await;

        assert_eq!(end, SessionEnd::Closed(None));
        assert_eq!(store.telemetry.get(TelemetryKey::Latitude), "1");
    }

    #[tokio::test]
    async fn test_chat_mode_appends_and_acknowledges() {
        let store = SharedState::default();
        let session = Session::new(SessionMode::Chat, store.clone(), CancellationToken::new());
        let (sink, rx) = test_sink();

        let inputs = ["oi", "latitude:5", "tudo bem?", ""];
        let mut msgs: Vec<Message> = inputs.iter().map(|s| text(s)).collect();
        msgs.push(close("bye"));

        session.drive(sink, frames(msgs)).await;
        let sent: Vec<Message> = rx.collect().await;

        assert_eq!(store.messages.snapshot(), inputs.to_vec());

        let mut expected = vec![WELCOME_MESSAGE.to_string()];
        expected.extend(inputs.iter().map(|s| format!("Recebido: {}", s)));
        assert_eq!(texts(&sent), expected);

        // chat mode leaves telemetry alone
        assert_eq!(store.telemetry.get(TelemetryKey::Latitude), AWAITING);
    }

    #[tokio::test]
    async fn test_other_frames_are_ignored() {
        let store = SharedState::default();
        let session = Session::new(SessionMode::Chat, store.clone(), CancellationToken::new());
        let (sink, rx) = test_sink();

        let msgs = vec![
            Message::Binary(vec![0xde, 0xad]),
            Message::Ping(vec![1]),
            Message::Pong(vec![]),
            text("still here"),
            Message::Close(None),
        ];
        session.drive(sink, frames(msgs)).await;
        let sent: Vec<Message> = rx.collect().await;

        assert_eq!(store.messages.snapshot(), vec!["still here"]);
        assert_eq!(texts(&sent).len(), 2);
    }

    #[tokio::test]
    async fn test_stream_end_and_errors_are_local() {
        let store = SharedState::default();
        let session = Session::new(SessionMode::Telemetry, store.clone(), CancellationToken::new());

        let (sink, _rx) = test_sink();
        let ended = stream::iter(vec![Ok::<_, axum::Error>(text("azimuth:90"))]);
        assert_eq!(session.drive(sink, ended).await, SessionEnd::Disconnected);
        assert_eq!(store.telemetry.get(TelemetryKey::Azimuth), "90");

        let (sink, _rx) = test_sink();
        let broken = stream::iter(vec![
            Err(axum::Error::new(std::io::Error::from(std::io::ErrorKind::ConnectionReset))),
            Ok(text("azimuth:180")),
        ]);
        let end = session.drive(sink, broken).await;
        assert!(matches!(end, SessionEnd::TransportError(_)));
        assert_eq!(store.telemetry.get(TelemetryKey::Azimuth), "90");
    }

    #[tokio::test]
    async fn test_write_failure_ends_session() {
        let store = SharedState::default();
        let session = Session::new(SessionMode::Chat, store, CancellationToken::new());
        let (sink, rx) = test_sink();
        drop(rx);

        let end = session.drive(sink, frames(vec![text("lost")])).await;
        assert!(matches!(end, SessionEnd::TransportError(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_timeout_ends_session() {
        let store = SharedState::default();
        let session = Session::new(SessionMode::Telemetry, store, CancellationToken::new())
            .with_keepalive(None, Some(Duration::from_secs(15)));
        let (sink, _rx) = test_sink();

        let started = Instant::now();
        let end = session.drive(sink, frames(vec![])).await;

        assert_eq!(end, SessionEnd::IdleTimeout);
        assert!(started.elapsed() >= Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_inbound_activity_resets_idle_timer() {
        let store = SharedState::default();
        let session = Session::new(SessionMode::Telemetry, store, CancellationToken::new())
            .with_keepalive(None, Some(Duration::from_secs(15)));
        let (sink, _rx) = test_sink();
        let (tx, inbound) = mpsc::unbounded::<Result<Message, axum::Error>>();

        tokio::spawn(async move {
            for _ in 0..3 {
                tokio::time::sleep(Duration::from_secs(10)).await;
                if tx.unbounded_send(Ok(Message::Pong(vec![]))).is_err() {
                    return;
                }
            }
            // keep the stream open so only the idle timer can end it
            std::future::pending::<()>().await;
        });

        let started = Instant::now();
        let end = session.drive(sink, inbound).await;

        assert_eq!(end, SessionEnd::IdleTimeout);
        assert!(started.elapsed() >= Duration::from_secs(45));
    }

    #[tokio::test(start_paused = true)]
    async fn test_keepalive_pings_are_sent() {
        let store = SharedState::default();
        let shutdown = CancellationToken::new();
        let session = Session::new(SessionMode::Telemetry, store, shutdown.clone())
            .with_keepalive(Some(Duration::from_secs(10)), None);
        let (sink, rx) = test_sink();

        let task = tokio::spawn(async move { session.drive(sink, frames(vec![])).await });

        tokio::time::sleep(Duration::from_secs(25)).await;
        shutdown.cancel();

        assert_eq!(task.await.unwrap(), SessionEnd::Shutdown);
        let sent: Vec<Message> = rx.collect().await;
        let pings = sent.iter().filter(|m| matches!(m, Message::Ping(_))).count();
        assert_eq!(pings, 2);
    }

    #[tokio::test]
    async fn test_shutdown_sends_going_away_close() {
        let store = SharedState::default();
        let shutdown = CancellationToken::new();
        let session = Session::new(SessionMode::Chat, store, shutdown.clone());
        let (sink, rx) = test_sink();

        shutdown.cancel();
        let end = session.drive(sink, frames(vec![text("late")])).await;
        let sent: Vec<Message> = rx.collect().await;

        assert_eq!(end, SessionEnd::Shutdown);
        assert!(matches!(
            sent.last(),
            Some(Message::Close(Some(frame))) if frame.code == close_code::AWAY
        ));
        // shutdown wins over buffered frames
        assert_eq!(texts(&sent), vec![WELCOME_MESSAGE.to_string()]);
    }

    #[tokio::test]
    async fn test_kill_terminates_before_graceful_close() {
        let store = SharedState::default();
        let shutdown = CancellationToken::new();
        let kill = CancellationToken::new();
        let session = Session::new(SessionMode::Telemetry, store, shutdown.clone());
        let (sink, rx) = test_sink();

        shutdown.cancel();
        kill.cancel();
        let end = session.serve(sink, frames(vec![]), kill).await;
        let sent: Vec<Message> = rx.collect().await;

        assert_eq!(end, SessionEnd::Terminated);
        assert!(sent.is_empty());
    }

    #[test]
    fn test_keepalive_zero_disables() {
        let session = Session::new(
            SessionMode::Telemetry,
            SharedState::default(),
            CancellationToken::new(),
        )
        .with_keepalive(Some(Duration::ZERO), Some(Duration::ZERO));

        assert!(session.ping_period.is_none());
        assert!(session.idle_timeout.is_none());
    }
}
