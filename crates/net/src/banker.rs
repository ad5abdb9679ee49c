//! Banker session server.
//!
//! The banker accepts player connections on the primary port and serves the
//! out-of-focus port (primary + 1) next to it.
//!
//! # Session
//!
//! 1. A player connects; the banker assigns the next player id.
//! 2. The first frame the player receives is its id in decimal (`"1"`).
//! 3. Every frame the player sends becomes a [`BankerEvent`]: a
//!    [`BankerEvent::Status`] when it parses as a status update (`"1busy 3"`),
//!    otherwise a [`BankerEvent::Message`].
//! 4. The game side answers with [`Outbound`] messages.
//!
//! A malformed frame ends that player's session only.
//!
//! # Tasks
//!
//! - accept loop (this function)
//! - one reader and one writer task per player
//! - an outbound dispatcher routing [`Outbound`] to writer queues
//! - one short-lived task per [`Outbound::Notify`]
//! - the out-of-focus accept loop

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Runtime;
use tokio::sync::{mpsc, oneshot, Notify, RwLock};

use terminal_monopoly_types::{Status, StatusChange, StatusUpdate, TERMINAL_COUNT};

use crate::config::BankerConfig;
use crate::error::NetError;
use crate::frame::{read_frame, write_frame};
use crate::listener::{serve_notifications, InboundNotice};
use crate::notify::{notification_addr, send_notification_async};

/// Event delivered to the game side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BankerEvent {
    Joined { player_id: u32, addr: SocketAddr },
    Message { player_id: u32, text: String },
    Status { player_id: u32, update: StatusUpdate },
    /// Frame pushed over a player's out-of-focus link.
    OutOfFocus { player_id: u32, text: String },
    Left { player_id: u32, reason: String },
}

/// Message from the game side to players.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    ToPlayer { player_id: u32, text: String },
    Broadcast { text: String },
    /// Out-of-band notice on the player's notification port.
    Notify { player_id: u32, text: String },
    Disconnect { player_id: u32 },
}

#[derive(Debug)]
enum PlayerOutbound {
    Frame(String),
    Close,
}

struct PlayerHandle {
    id: u32,
    addr: SocketAddr,
    tx: mpsc::UnboundedSender<PlayerOutbound>,
    hangup: Arc<Notify>,
}

struct BankerState {
    config: BankerConfig,
    players: RwLock<Vec<PlayerHandle>>,
}

/// Fails if `host:port` cannot be bound right now.
pub fn check_tcp_listen_available(host: &str, port: u16) -> std::io::Result<()> {
    let listener = std::net::TcpListener::bind((host, port))?;
    drop(listener);
    Ok(())
}

/// Run the banker until the accept loop fails.
pub async fn run_banker(
    config: BankerConfig,
    event_tx: mpsc::UnboundedSender<BankerEvent>,
    mut out_rx: mpsc::UnboundedReceiver<Outbound>,
    ready_tx: Option<oneshot::Sender<SocketAddr>>,
) -> Result<(), NetError> {
    let listener = TcpListener::bind(config.socket_addr()?).await?;
    let bound = listener.local_addr()?;
    tracing::info!(%bound, max_players = config.max_players, "banker listening");

    spawn_out_of_focus(bound, event_tx.clone()).await;

    if let Some(ready) = ready_tx {
        let _ = ready.send(bound);
    }

    let state = Arc::new(BankerState {
        config,
        players: RwLock::new(Vec::new()),
    });

    // Outbound dispatcher.
    {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                dispatch(&state, msg).await;
            }
        });
    }

    let mut next_id = 0u32;
    loop {
        let (socket, addr) = listener.accept().await?;

        let mut players = state.players.write().await;
        if players.len() >= state.config.max_players {
            tracing::warn!(%addr, "banker full, connection refused");
            drop(socket);
            continue;
        }

        next_id += 1;
        let player_id = next_id;
        let (tx, rx) = mpsc::unbounded_channel::<PlayerOutbound>();
        let hangup = Arc::new(Notify::new());

        // Welcome goes first in the queue.
        let _ = tx.send(PlayerOutbound::Frame(player_id.to_string()));
        players.push(PlayerHandle {
            id: player_id,
            addr,
            tx,
            hangup: Arc::clone(&hangup),
        });
        drop(players);

        tracing::info!(player_id, %addr, "player joined");
        let _ = event_tx.send(BankerEvent::Joined { player_id, addr });

        let state = Arc::clone(&state);
        let event_tx = event_tx.clone();
        tokio::spawn(async move {
            let reason = match handle_player(socket, player_id, rx, &hangup, &event_tx).await {
                Ok(reason) => reason,
                Err(e) => {
                    tracing::warn!(player_id, error = %e, "player session failed");
                    e.to_string()
                }
            };
            state.players.write().await.retain(|p| p.id != player_id);
            tracing::info!(player_id, %reason, "player left");
            let _ = event_tx.send(BankerEvent::Left { player_id, reason });
        });
    }
}

async fn spawn_out_of_focus(bound: SocketAddr, event_tx: mpsc::UnboundedSender<BankerEvent>) {
    let oof_addr = match notification_addr(bound) {
        Ok(addr) => addr,
        Err(e) => {
            tracing::warn!(error = %e, "no out-of-focus port");
            return;
        }
    };
    let listener = match TcpListener::bind(oof_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::warn!(%oof_addr, error = %e, "out-of-focus port unavailable");
            return;
        }
    };
    tracing::info!(%oof_addr, "out-of-focus port listening");

    let (tx, mut rx) = mpsc::unbounded_channel::<InboundNotice>();
    tokio::spawn(async move {
        if let Err(e) = serve_notifications(listener, tx).await {
            tracing::warn!(error = %e, "out-of-focus listener stopped");
        }
    });
    tokio::spawn(async move {
        while let Some(inbound) = rx.recv().await {
            match inbound.notice.oof_player() {
                Some(player_id) => {
                    let event = BankerEvent::OutOfFocus {
                        player_id,
                        text: inbound.notice.body,
                    };
                    if event_tx.send(event).is_err() {
                        break;
                    }
                }
                None => tracing::debug!(from = %inbound.from, "untagged out-of-focus frame ignored"),
            }
        }
    });
}

async fn dispatch(state: &BankerState, msg: Outbound) {
    let players = state.players.read().await;
    match msg {
        Outbound::ToPlayer { player_id, text } => {
            if let Some(p) = players.iter().find(|p| p.id == player_id) {
                let _ = p.tx.send(PlayerOutbound::Frame(text));
            }
        }
        Outbound::Broadcast { text } => {
            for p in players.iter() {
                let _ = p.tx.send(PlayerOutbound::Frame(text.clone()));
            }
        }
        Outbound::Notify { player_id, text } => {
            let Some(p) = players.iter().find(|p| p.id == player_id) else {
                return;
            };
            let addr = p.addr;
            let tag = state.config.notify_tag.clone();
            let timeout = state.config.connect_timeout;
            tokio::spawn(async move {
                if let Err(e) = send_notification_async(addr, &text, &tag, timeout).await {
                    tracing::warn!(player_id, error = %e, "notification dropped");
                }
            });
        }
        Outbound::Disconnect { player_id } => {
            if let Some(p) = players.iter().find(|p| p.id == player_id) {
                let _ = p.tx.send(PlayerOutbound::Close);
                p.hangup.notify_one();
            }
        }
    }
}

/// Serve one player. Returns the reason the session ended.
async fn handle_player(
    socket: TcpStream,
    player_id: u32,
    mut rx: mpsc::UnboundedReceiver<PlayerOutbound>,
    hangup: &Notify,
    event_tx: &mpsc::UnboundedSender<BankerEvent>,
) -> Result<String, NetError> {
    socket.set_nodelay(true)?;
    let (mut reader, mut writer) = socket.into_split();

    tokio::spawn(async move {
        use tokio::io::AsyncWriteExt;

        while let Some(msg) = rx.recv().await {
            match msg {
                PlayerOutbound::Frame(text) => {
                    if let Err(e) = write_frame(&mut writer, &text).await {
                        tracing::debug!(player_id, error = %e, "write failed");
                        break;
                    }
                }
                PlayerOutbound::Close => break,
            }
        }
        let _ = writer.shutdown().await;
    });

    read_player(&mut reader, player_id, hangup, event_tx).await
}

async fn read_player(
    reader: &mut OwnedReadHalf,
    player_id: u32,
    hangup: &Notify,
    event_tx: &mpsc::UnboundedSender<BankerEvent>,
) -> Result<String, NetError> {
    loop {
        let text = tokio::select! {
            read = read_frame(&mut *reader) => match read {
                Ok(text) => text,
                Err(e) if e.is_clean_disconnect() => return Ok("disconnected".to_string()),
                Err(e) => return Err(e),
            },
            _ = hangup.notified() => return Ok("disconnected by banker".to_string()),
        };

        let event = match text.parse::<StatusUpdate>() {
            Ok(update) => BankerEvent::Status { player_id, update },
            Err(_) => BankerEvent::Message { player_id, text },
        };
        if event_tx.send(event).is_err() {
            return Ok("banker shut down".to_string());
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct TerminalState {
    status: Status,
    killed: bool,
}

/// The banker's view of every player's terminals.
#[derive(Debug, Clone, Default)]
pub struct StatusBoard {
    players: BTreeMap<u32, [TerminalState; TERMINAL_COUNT]>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an update. Ignored (returns false) for an unknown terminal index
    /// or a terminal that has been killed.
    pub fn apply(&mut self, player_id: u32, update: &StatusUpdate) -> bool {
        let Some(slot) = (update.terminal as usize).checked_sub(1) else {
            return false;
        };
        if slot >= TERMINAL_COUNT {
            return false;
        }

        let terminal = &mut self.players.entry(player_id).or_default()[slot];
        if terminal.killed {
            return false;
        }
        terminal.status = update.change.resulting_status();
        terminal.killed = update.change == StatusChange::Killed;
        true
    }

    pub fn status(&self, player_id: u32, terminal: u8) -> Option<Status> {
        self.terminal(player_id, terminal).map(|t| t.status)
    }

    pub fn is_killed(&self, player_id: u32, terminal: u8) -> bool {
        self.terminal(player_id, terminal)
            .map(|t| t.killed)
            .unwrap_or(false)
    }

    pub fn remove_player(&mut self, player_id: u32) {
        self.players.remove(&player_id);
    }

    pub fn players(&self) -> impl Iterator<Item = u32> + '_ {
        self.players.keys().copied()
    }

    fn terminal(&self, player_id: u32, terminal: u8) -> Option<&TerminalState> {
        let slot = (terminal as usize).checked_sub(1)?;
        self.players.get(&player_id)?.get(slot)
    }
}

/// Running banker with a blocking interface for the game loop.
pub struct Banker {
    rt: Runtime,
    event_rx: mpsc::UnboundedReceiver<BankerEvent>,
    out_tx: mpsc::UnboundedSender<Outbound>,
    local_addr: SocketAddr,
    statuses: StatusBoard,
}

impl Banker {
    /// Bind and start serving. Bind errors are returned.
    pub fn start(config: BankerConfig) -> Result<Self, NetError> {
        let rt = Runtime::new()?;
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = oneshot::channel();

        let server = rt.spawn(run_banker(config, event_tx, out_rx, Some(ready_tx)));
        let local_addr = match rt.block_on(ready_rx) {
            Ok(addr) => addr,
            Err(_) => {
                return Err(match rt.block_on(server) {
                    Ok(Err(e)) => e,
                    _ => NetError::ListenerStopped,
                });
            }
        };

        Ok(Self {
            rt,
            event_rx,
            out_tx,
            local_addr,
            statuses: StatusBoard::new(),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn try_recv(&mut self) -> Option<BankerEvent> {
        let event = self.event_rx.try_recv().ok()?;
        self.observe(&event);
        Some(event)
    }

    /// Wait up to `timeout` for the next event.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Option<BankerEvent> {
        let rx = &mut self.event_rx;
        let event = self
            .rt
            .block_on(async { tokio::time::timeout(timeout, rx.recv()).await })
            .ok()
            .flatten()?;
        self.observe(&event);
        Some(event)
    }

    pub fn send(&self, msg: Outbound) -> Result<(), NetError> {
        self.out_tx.send(msg).map_err(|_| NetError::ListenerStopped)
    }

    pub fn statuses(&self) -> &StatusBoard {
        &self.statuses
    }

    fn observe(&mut self, event: &BankerEvent) {
        match event {
            BankerEvent::Status { player_id, update } => {
                if !self.statuses.apply(*player_id, update) {
                    tracing::debug!(player_id, %update, "status update ignored");
                }
            }
            BankerEvent::Left { player_id, .. } => self.statuses.remove_player(*player_id),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn board_tracks_transitions() {
        let mut board = StatusBoard::new();
        assert!(board.apply(1, &StatusUpdate::new(1, StatusChange::Busy, 2)));
        assert_eq!(board.status(1, 2), Some(Status::Busy));
        assert_eq!(board.status(1, 1), Some(Status::Active));
        assert_eq!(board.status(2, 1), None);

        assert!(board.apply(1, &StatusUpdate::new(1, StatusChange::Disabled, 2)));
        assert!(board.apply(1, &StatusUpdate::new(1, StatusChange::Active, 2)));
        assert_eq!(board.status(1, 2), Some(Status::Active));
    }

    #[test]
    fn board_kill_latches() {
        let mut board = StatusBoard::new();
        assert!(board.apply(4, &StatusUpdate::new(4, StatusChange::Killed, 3)));
        assert!(board.is_killed(4, 3));
        assert!(!board.apply(4, &StatusUpdate::new(4, StatusChange::Active, 3)));
        assert_eq!(board.status(4, 3), Some(Status::Disabled));
    }

    #[test]
    fn board_rejects_bad_terminal() {
        let mut board = StatusBoard::new();
        assert!(!board.apply(1, &StatusUpdate::new(1, StatusChange::Busy, 0)));
        assert!(!board.apply(1, &StatusUpdate::new(1, StatusChange::Busy, 5)));
        assert_eq!(board.players().count(), 0);
    }

    #[test]
    fn port_check_fails_when_in_use() {
        let listener = std::net::TcpListener::bind(("127.0.0.1", 0)).unwrap();
        let port = listener.local_addr().unwrap().port();
        let err = check_tcp_listen_available("127.0.0.1", port).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::AddrInUse);
    }
}
