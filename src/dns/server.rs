use crate::config::SharedConfig;
use crate::dns::handlers::Handler;
use crate::error::Error;
use crate::store::DynRecordStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::task::JoinSet;
use trust_dns_proto::op::Message;

/// Enough for any query we care about; larger datagrams are truncated by the
/// kernel and will fail to decode.
const MAX_DATAGRAM: usize = 4096;

/// Bind the UDP socket and build a [`Server`] ready to dispatch datagrams.
///
/// # Errors
///
/// Returns [`Error::IO`] if the socket can't be bound.
pub async fn new(
    config: SharedConfig,
    store: DynRecordStore,
    shutdown: watch::Receiver<bool>,
) -> Result<Server, Error> {
    let socket = UdpSocket::bind(config.dns_bind_addr).await?;
    Ok(Server {
        socket,
        handler: Arc::new(Handler::new(config, store)),
        shutdown,
    })
}

/// Owns the UDP socket. Each inbound datagram is decoded and answered on its
/// own task; the only shared state is the record store handle inside the
/// [`Handler`].
pub struct Server {
    socket: UdpSocket,
    handler: Arc<Handler>,
    shutdown: watch::Receiver<bool>,
}

impl Server {
    /// The address the UDP socket is bound to.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IO`] if the socket has no local address.
    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        Ok(self.socket.local_addr()?)
    }

    /// Serve datagrams until the shutdown signal fires.
    ///
    /// Shutdown is cooperative: the loop stops accepting new datagrams, then
    /// drains the per-datagram tasks so a reply already being synthesized or
    /// sent still completes before the socket and store go away.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IO`] if receiving on the socket fails.
    pub async fn block_until_done(mut self) -> Result<(), Error> {
        let socket = Arc::new(self.socket);
        let mut buf = vec![0u8; MAX_DATAGRAM];
        let mut tasks: JoinSet<()> = JoinSet::new();
        loop {
            tokio::select! {
                _ = self.shutdown.changed() => break,
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
                recv = socket.recv_from(&mut buf) => {
                    let (len, src) = recv?;
                    let packet = buf[..len].to_vec();
                    let handler = Arc::clone(&self.handler);
                    let socket = Arc::clone(&socket);
                    tasks.spawn(async move {
                        let req = match Message::from_vec(&packet) {
                            Ok(req) => req,
                            Err(err) => {
                                tracing::debug!("dropping undecodable datagram from {src}: {err}");
                                return;
                            }
                        };
                        let reply = handler.reply_to(&req).await;
                        match reply.to_vec() {
                            Ok(bytes) => {
                                if let Err(err) = socket.send_to(&bytes, src).await {
                                    tracing::warn!("failed to send reply to {src}: {err}");
                                }
                            }
                            Err(err) => {
                                tracing::error!("failed to encode reply for {src}: {err}");
                            }
                        }
                    });
                }
            }
        }
        while tasks.join_next().await.is_some() {}
        tracing::info!("DNS listener stopped");
        Ok(())
    }
}
