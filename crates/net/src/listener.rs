//! Receiving side of the notification channel.
//!
//! The accept loop runs on tokio. Each inbound connection gets its own task,
//! which reads frames until the sender closes and forwards each one, parsed into
//! a [`Notice`], over an mpsc queue. The UI thread drains that queue; the
//! listener itself never touches screen state.
//!
//! [`NotificationListener`] is the blocking front end: it owns the runtime and
//! exposes `try_recv` for a poll-driven UI loop.

use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::runtime::Runtime;
use tokio::sync::{mpsc, oneshot};

use crate::error::NetError;
use crate::frame::read_frame;
use crate::notify::{notification_addr, Notice};

/// A notice together with the address it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundNotice {
    pub from: SocketAddr,
    pub notice: Notice,
}

/// Bind `addr` and serve notifications until the receiver is dropped.
pub async fn run_listener(
    addr: SocketAddr,
    tx: mpsc::UnboundedSender<InboundNotice>,
    ready_tx: Option<oneshot::Sender<SocketAddr>>,
) -> Result<(), NetError> {
    let listener = TcpListener::bind(addr).await?;
    let bound = listener.local_addr()?;
    tracing::info!(%bound, "notification listener bound");
    if let Some(ready) = ready_tx {
        let _ = ready.send(bound);
    }
    serve_notifications(listener, tx).await
}

/// Accept loop over an already bound listener.
pub async fn serve_notifications(
    listener: TcpListener,
    tx: mpsc::UnboundedSender<InboundNotice>,
) -> Result<(), NetError> {
    loop {
        let (socket, from) = listener.accept().await?;
        if tx.is_closed() {
            return Ok(());
        }

        let tx = tx.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_sender(socket, from, tx).await {
                tracing::warn!(%from, error = %e, "notification connection failed");
            }
        });
    }
}

async fn handle_sender(
    mut socket: tokio::net::TcpStream,
    from: SocketAddr,
    tx: mpsc::UnboundedSender<InboundNotice>,
) -> Result<(), NetError> {
    loop {
        match read_frame(&mut socket).await {
            Ok(text) => {
                let notice = Notice::parse(&text);
                tracing::debug!(%from, tag = %notice.tag, "notification received");
                if tx.send(InboundNotice { from, notice }).is_err() {
                    return Ok(());
                }
            }
            Err(e) if e.is_clean_disconnect() => return Ok(()),
            Err(e) => return Err(e),
        }
    }
}

/// Notification listener running on its own runtime.
pub struct NotificationListener {
    rt: Runtime,
    rx: mpsc::UnboundedReceiver<InboundNotice>,
    local_addr: SocketAddr,
}

impl NotificationListener {
    /// Bind `addr` now and serve in the background. Bind errors are returned.
    pub fn start(addr: SocketAddr) -> Result<Self, NetError> {
        let rt = Runtime::new()?;
        let listener = rt.block_on(TcpListener::bind(addr))?;
        let local_addr = listener.local_addr()?;
        tracing::info!(%local_addr, "notification listener bound");

        let (tx, rx) = mpsc::unbounded_channel();
        rt.spawn(async move {
            if let Err(e) = serve_notifications(listener, tx).await {
                tracing::warn!(error = %e, "notification listener stopped");
            }
        });

        Ok(Self { rt, rx, local_addr })
    }

    /// Listen on the port paired with the local end of `primary`.
    pub fn for_primary(primary: &TcpStream) -> Result<Self, NetError> {
        Self::start(notification_addr(primary.local_addr()?)?)
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Next queued notice, if any.
    pub fn try_recv(&mut self) -> Result<Option<InboundNotice>, NetError> {
        match self.rx.try_recv() {
            Ok(notice) => Ok(Some(notice)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => Err(NetError::ListenerStopped),
        }
    }

    /// Wait up to `timeout` for the next notice.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<InboundNotice>, NetError> {
        let rx = &mut self.rx;
        match self
            .rt
            .block_on(async { tokio::time::timeout(timeout, rx.recv()).await })
        {
            Ok(Some(notice)) => Ok(Some(notice)),
            Ok(None) => Err(NetError::ListenerStopped),
            Err(_) => Ok(None),
        }
    }

    /// Everything queued right now.
    pub fn drain(&mut self) -> Vec<InboundNotice> {
        let mut notices = Vec::new();
        while let Ok(notice) = self.rx.try_recv() {
            notices.push(notice);
        }
        notices
    }
}
