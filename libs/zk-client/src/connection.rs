//! Session management against a ZooKeeper ensemble.
//!
//! A [`Connection`] owns exactly one TCP socket to one server of the
//! ensemble. Opening tries the servers in random order until one completes
//! the session handshake or the connect budget runs out. Requests are
//! issued one at a time and each is bounded by the request timeout.

use std::fmt;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use rand::seq::SliceRandom;
use tokio::net::TcpStream;
use tokio::time::Instant;
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tracing::{debug, info, trace, warn};

use crate::address::{EnsembleAddress, HostPort};
use crate::error::{ErrorCode, ZkError, ZkResult};
use crate::proto::{
    self, ConnectRequest, ConnectResponse, NOTIFICATION_XID, PING_XID, ReplyHeader, Request,
};

/// Default budget for reaching any server and completing the handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Default budget for a single request/reply exchange.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(2000);

/// Session timeout asked of the server.
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(10);

/// Lower bound for the slice of the connect budget given to one server.
const MIN_ATTEMPT_TIMEOUT: Duration = Duration::from_millis(500);

/// Pause between passes over the whole ensemble.
const RETRY_BASE_DELAY: Duration = Duration::from_millis(100);

/// Upper bound for the pause between passes.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Matches the server's default `jute.maxbuffer` with room for headers.
const MAX_FRAME_LEN: usize = 4 * 1024 * 1024;

/// Timeouts governing one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Total budget for TCP connect plus session handshake, across all servers.
    pub connect_timeout: Duration,
    /// Budget for each request once the session is up.
    pub request_timeout: Duration,
    /// Session timeout requested in the handshake.
    pub session_timeout: Duration,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            session_timeout: DEFAULT_SESSION_TIMEOUT,
        }
    }
}

/// An established session with one ensemble server.
///
/// Dropping a connection closes the socket without telling the server,
/// which then expires the session on its own. Call [`Connection::close`]
/// to end the session eagerly.
pub struct Connection {
    framed: Option<Framed<TcpStream, LengthDelimitedCodec>>,
    server: HostPort,
    session_id: i64,
    negotiated_timeout: Duration,
    request_timeout: Duration,
    next_xid: i32,
}

impl Connection {
    /// Connect to any server of `address` within `options.connect_timeout`.
    ///
    /// A server whose failure is not [`ZkError::is_retryable`] is skipped
    /// for the rest of the call. Fails with [`ZkError::Timeout`] once the
    /// budget is spent or no server is left to try.
    pub async fn open(address: &EnsembleAddress, options: &ConnectOptions) -> ZkResult<Self> {
        let mut hosts = address.hosts().to_vec();
        hosts.shuffle(&mut rand::thread_rng());

        let deadline = Instant::now() + options.connect_timeout;
        let attempt_budget = (options.connect_timeout / hosts.len().max(1) as u32)
            .max(MIN_ATTEMPT_TIMEOUT);
        let mut delay = RETRY_BASE_DELAY;
        let mut attempts = 0u32;
        let mut last_err: Option<ZkError> = None;

        info!(
            ensemble = %address,
            connect_timeout_ms = options.connect_timeout.as_millis() as u64,
            "connecting to ZooKeeper ensemble"
        );

        // servers that answered with something no retry will fix
        let mut given_up = vec![false; hosts.len()];

        'passes: loop {
            for (idx, server) in hosts.iter().enumerate() {
                if given_up[idx] {
                    continue;
                }
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    break 'passes;
                }
                attempts += 1;
                let budget = attempt_budget.min(remaining);
                let attempt = tokio::time::timeout(budget, Self::handshake(server, options)).await;
                match attempt {
                    Ok(Ok(conn)) => {
                        info!(
                            server = %server,
                            session_id = conn.session_id,
                            negotiated_timeout_ms = conn.negotiated_timeout.as_millis() as u64,
                            attempts,
                            "ZooKeeper session established"
                        );
                        return Ok(conn);
                    }
                    Ok(Err(err)) if err.is_retryable() => {
                        debug!(server = %server, error = %err, "ensemble server unavailable");
                        last_err = Some(err);
                    }
                    Ok(Err(err)) => {
                        warn!(server = %server, error = %err, "giving up on ensemble server");
                        given_up[idx] = true;
                        last_err = Some(err);
                    }
                    Err(_) => {
                        debug!(
                            server = %server,
                            budget_ms = budget.as_millis() as u64,
                            "ensemble server did not complete handshake in time"
                        );
                        last_err = Some(ZkError::Timeout(format!(
                            "handshake with {server} exceeded {budget:?}"
                        )));
                    }
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() || given_up.iter().all(|g| *g) {
                break;
            }
            let pause = delay.min(remaining);
            trace!(retry_in_ms = pause.as_millis() as u64, "no ensemble server reachable, retrying");
            tokio::time::sleep(pause).await;
            delay = delay.saturating_mul(2).min(MAX_RETRY_DELAY);
        }

        let last = last_err
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no attempt made".into());
        warn!(
            ensemble = %address,
            attempts,
            last_error = %last,
            "could not reach ZooKeeper ensemble"
        );
        Err(ZkError::Timeout(format!(
            "no server of {address} answered within {:?} after {attempts} attempt(s); last error: {last}",
            options.connect_timeout
        )))
    }

    async fn handshake(server: &HostPort, options: &ConnectOptions) -> ZkResult<Self> {
        let stream = TcpStream::connect((server.host(), server.port())).await?;
        stream.set_nodelay(true)?;
        let codec = LengthDelimitedCodec::builder()
            .length_field_length(4)
            .max_frame_length(MAX_FRAME_LEN)
            .new_codec();
        let mut framed = Framed::new(stream, codec);

        let mut buf = BytesMut::new();
        ConnectRequest::new(options.session_timeout).encode(&mut buf);
        framed.send(buf.freeze()).await?;

        let frame = framed.next().await.ok_or_else(|| {
            ZkError::NotConnected(format!("{server} closed the connection during handshake"))
        })??;
        let response = ConnectResponse::decode(frame.freeze())?;
        if !response.is_established() {
            return Err(ZkError::SessionRejected(server.to_string()));
        }

        Ok(Self {
            framed: Some(framed),
            server: server.clone(),
            session_id: response.session_id,
            negotiated_timeout: Duration::from_millis(response.timeout_ms as u64),
            request_timeout: options.request_timeout,
            next_xid: 1,
        })
    }

    /// Names of the direct children of `path`, in server order.
    pub async fn get_children(&mut self, path: &str) -> ZkResult<Vec<String>> {
        let mut body = self.call(Request::GetChildren { path }).await?;
        proto::decode_children(&mut body)
    }

    /// Payload stored at `path`. A node without data yields an empty buffer.
    pub async fn get_data(&mut self, path: &str) -> ZkResult<Bytes> {
        let mut body = self.call(Request::GetData { path }).await?;
        proto::decode_data(&mut body)
    }

    /// End the session. Safe to call more than once.
    pub async fn close(&mut self) {
        if self.framed.is_none() {
            return;
        }
        match self.call(Request::CloseSession).await {
            Ok(_) => debug!(
                server = %self.server,
                session_id = self.session_id,
                "ZooKeeper session closed"
            ),
            Err(err) => debug!(server = %self.server, error = %err, "close session failed"),
        }
        self.framed = None;
    }

    /// Returns true until the connection is closed or fails.
    pub fn is_connected(&self) -> bool {
        self.framed.is_some()
    }

    /// Server this connection is attached to.
    pub fn server(&self) -> &HostPort {
        &self.server
    }

    /// Session id assigned by the server.
    pub fn session_id(&self) -> i64 {
        self.session_id
    }

    async fn call(&mut self, request: Request<'_>) -> ZkResult<Bytes> {
        let request_timeout = self.request_timeout;
        let outcome = tokio::time::timeout(request_timeout, self.round_trip(request)).await;
        let result = match outcome {
            Ok(result) => result,
            Err(_) => Err(ZkError::Timeout(format!(
                "{:?} on '{}' exceeded {request_timeout:?}",
                request.opcode(),
                request.path()
            ))),
        };
        // after anything but a server-side error the stream position is unknown
        if let Err(err) = &result {
            if !matches!(err, ZkError::Server { .. }) {
                self.framed = None;
            }
        }
        result
    }

    async fn round_trip(&mut self, request: Request<'_>) -> ZkResult<Bytes> {
        let xid = self.next_xid;
        self.next_xid = self.next_xid.wrapping_add(1).max(1);

        let server = &self.server;
        let framed = self
            .framed
            .as_mut()
            .ok_or_else(|| ZkError::NotConnected(format!("session with {server} is closed")))?;

        let mut buf = BytesMut::new();
        request.encode(xid, &mut buf);
        framed.send(buf.freeze()).await?;

        loop {
            let frame = framed.next().await.ok_or_else(|| {
                ZkError::NotConnected(format!("{server} closed the connection"))
            })??;
            let mut frame = frame.freeze();
            let header = ReplyHeader::decode(&mut frame)?;

            if header.xid == NOTIFICATION_XID || header.xid == PING_XID {
                trace!(xid = header.xid, "skipping unsolicited frame");
                continue;
            }
            if header.xid != xid {
                return Err(ZkError::Protocol(format!(
                    "reply xid {} does not match request xid {xid}",
                    header.xid
                )));
            }
            if header.err != 0 {
                return Err(ZkError::Server {
                    code: ErrorCode::from_raw(header.err),
                    path: request.path().to_owned(),
                });
            }
            return Ok(frame);
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("server", &self.server)
            .field("session_id", &format_args!("{:#x}", self.session_id))
            .field("negotiated_timeout", &self.negotiated_timeout)
            .field("connected", &self.framed.is_some())
            .finish_non_exhaustive()
    }
}
