//! Single-operator TCP server.
//!
//! The server owns the listening socket and serves exactly one operator
//! connection at a time. The badge reader and the registry are shared by
//! consecutive sessions, so no locking is needed.
//!
//! # Architecture
//!
//! ```text
//! operator ──TCP──> AccessServer ──> Session ──┬──> CredentialReader (serial)
//!                    (one at a time)           └──> TagRegistry (file)
//! ```
//!
//! # Example Usage
//!
//! ```no_run
//! use badgegate_hardware::{SerialConfig, SerialReader};
//! use badgegate_network::{AccessServer, ServerConfig};
//! use badgegate_storage::FileRegistry;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let server = AccessServer::bind(ServerConfig::default()).await?;
//! let mut reader = SerialReader::open(&SerialConfig::default())?;
//! let registry = FileRegistry::open("tags.db").await?;
//!
//! server.run(&mut reader, &registry, &CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Failure Handling
//!
//! - Accept failures are logged and retried after one accept quantum.
//! - Socket and badge reader failures abort the current session only.
//! - Registry failures stop the server and are returned from [`AccessServer::run`].

use std::net::SocketAddr;
use std::time::Duration;

use badgegate_core::constants::{DEFAULT_ACCEPT_TIMEOUT_MS, DEFAULT_IDLE_TIMEOUT_MS, DEFAULT_PORT};
use badgegate_hardware::CredentialReader;
use badgegate_storage::TagRegistry;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span, warn};

use crate::error::{ServerError, SessionError};
use crate::session::Session;

/// Configuration for the access server
///
/// # Example
///
/// ```
/// use badgegate_network::ServerConfig;
/// use std::time::Duration;
///
/// let config = ServerConfig::new("127.0.0.1:9000".parse().unwrap())
///     .accept_timeout(Duration::from_millis(250));
/// assert_eq!(config.accept_timeout, Duration::from_millis(250));
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to
    pub bind_addr: SocketAddr,

    /// Longest wait for a connection before shutdown is re-checked
    pub accept_timeout: Duration,

    /// Longest socket read before an idle session polls the badge reader
    pub idle_timeout: Duration,
}

impl ServerConfig {
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Self::default()
        }
    }

    pub fn accept_timeout(mut self, timeout: Duration) -> Self {
        self.accept_timeout = timeout;
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            accept_timeout: Duration::from_millis(DEFAULT_ACCEPT_TIMEOUT_MS),
            idle_timeout: Duration::from_millis(DEFAULT_IDLE_TIMEOUT_MS),
        }
    }
}

/// Operator-facing TCP server
pub struct AccessServer {
    listener: TcpListener,
    config: ServerConfig,
}

impl AccessServer {
    /// Bind the server to the configured address
    ///
    /// # Errors
    ///
    /// Returns `ServerError::BindFailed` if the address is in use, not
    /// local, or needs privileges the process lacks.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(config.bind_addr)
            .await
            .map_err(|source| ServerError::BindFailed {
                addr: config.bind_addr,
                source,
            })?;

        info!(addr = %config.bind_addr, "Access server listening");
        Ok(Self { listener, config })
    }

    /// Bind a listening socket without a Tokio runtime.
    ///
    /// The daemon binds before it forks so that a busy or invalid address
    /// is reported to the caller. The socket is left non-blocking for
    /// [`AccessServer::from_std`].
    ///
    /// # Errors
    ///
    /// Returns `ServerError::BindFailed` under the same conditions as
    /// [`AccessServer::bind`].
    pub fn bind_std(addr: SocketAddr) -> Result<std::net::TcpListener, ServerError> {
        let listener = std::net::TcpListener::bind(addr)
            .map_err(|source| ServerError::BindFailed { addr, source })?;
        listener.set_nonblocking(true)?;
        Ok(listener)
    }

    /// Wrap a listener from [`AccessServer::bind_std`].
    ///
    /// Must be called from within a Tokio runtime.
    pub fn from_std(
        listener: std::net::TcpListener,
        mut config: ServerConfig,
    ) -> Result<Self, ServerError> {
        config.bind_addr = listener.local_addr()?;
        let listener = TcpListener::from_std(listener)?;

        info!(addr = %config.bind_addr, "Access server listening");
        Ok(Self { listener, config })
    }

    /// Address actually bound (useful with port 0).
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Serve operators one after another until `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Storage` when a session hits a registry failure.
    pub async fn run<R, G>(
        &self,
        reader: &mut R,
        registry: &G,
        cancel: &CancellationToken,
    ) -> Result<(), ServerError>
    where
        R: CredentialReader,
        G: TagRegistry,
    {
        info!(reader = reader.name(), "Access server running");

        loop {
            let accepted = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                accepted = tokio::time::timeout(self.config.accept_timeout, self.listener.accept()) => accepted,
            };

            let (stream, peer) = match accepted {
                Err(_) => continue,
                Ok(Ok(conn)) => conn,
                Ok(Err(e)) => {
                    warn!(error = %e, "Accept failed");
                    if self.accept_backoff(cancel).await {
                        continue;
                    }
                    break;
                }
            };

            if let Err(e) = stream.set_nodelay(true) {
                warn!(%peer, error = %e, "Failed to set TCP_NODELAY");
            }

            info!(%peer, "Operator connected");
            let mut session = Session::new(stream, &mut *reader, registry, cancel.clone())
                .idle_timeout(self.config.idle_timeout);

            let result = session
                .run()
                .instrument(info_span!("session", %peer))
                .await;

            match result {
                Ok(()) => info!(%peer, "Operator disconnected"),
                Err(SessionError::Storage(e)) => {
                    error!(%peer, error = %e, "Registry failure, stopping server");
                    return Err(ServerError::Storage(e));
                }
                Err(e) => warn!(%peer, error = %e, "Session aborted"),
            }
        }

        info!("Access server stopped");
        Ok(())
    }

    /// Pause one accept quantum after a failed accept (EMFILE and friends
    /// fail again immediately). Returns `false` if `cancel` fired meanwhile.
    async fn accept_backoff(&self, cancel: &CancellationToken) -> bool {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(self.config.accept_timeout) => true,
        }
    }
}
