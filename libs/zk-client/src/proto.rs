//! Jute encoding for the handful of records a read-only client exchanges.
//!
//! Every record travels inside a frame prefixed by a 4-byte big-endian
//! length; framing itself is left to `LengthDelimitedCodec`. Integers are
//! big-endian, booleans one byte, and buffers/strings are an `i32` length
//! (`-1` for null) followed by the raw bytes.

use std::time::Duration;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{ZkError, ZkResult};

/// Client protocol version sent in the handshake.
pub const PROTOCOL_VERSION: i32 = 0;

/// xid the server uses for watch notifications.
pub const NOTIFICATION_XID: i32 = -1;
/// xid the server uses for ping replies.
pub const PING_XID: i32 = -2;

const PASSWORD_LEN: usize = 16;
/// Bytes of a `Stat` record trailing a get-data reply.
const STAT_LEN: usize = 68;

/// Request opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum OpCode {
    GetData = 4,
    GetChildren = 8,
    CloseSession = -11,
}

/// Session handshake sent as the first frame on a fresh socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    last_zxid_seen: i64,
    timeout_ms: i32,
    session_id: i64,
    passwd: [u8; PASSWORD_LEN],
    read_only: bool,
}

impl ConnectRequest {
    /// Handshake for a brand new session asking for `session_timeout`.
    pub fn new(session_timeout: Duration) -> Self {
        Self {
            last_zxid_seen: 0,
            timeout_ms: i32::try_from(session_timeout.as_millis()).unwrap_or(i32::MAX),
            session_id: 0,
            passwd: [0; PASSWORD_LEN],
            read_only: false,
        }
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_i32(PROTOCOL_VERSION);
        buf.put_i64(self.last_zxid_seen);
        buf.put_i32(self.timeout_ms);
        buf.put_i64(self.session_id);
        put_buffer(buf, Some(&self.passwd));
        buf.put_u8(u8::from(self.read_only));
    }
}

/// Server answer to [`ConnectRequest`].
///
/// Only what the client acts on is kept; the protocol version, session
/// password and read-only flag are consumed and dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectResponse {
    pub timeout_ms: i32,
    pub session_id: i64,
}

impl ConnectResponse {
    pub fn decode(mut buf: Bytes) -> ZkResult<Self> {
        get_i32(&mut buf, "connect response protocol version")?;
        let timeout_ms = get_i32(&mut buf, "connect response timeout")?;
        let session_id = get_i64(&mut buf, "connect response session id")?;
        get_buffer(&mut buf, "connect response password")?;
        // servers older than 3.4 do not send the read-only flag, and this
        // client never asks for a read-only session
        Ok(Self {
            timeout_ms,
            session_id,
        })
    }

    /// A non-positive negotiated timeout means the server refused the session.
    pub fn is_established(&self) -> bool {
        self.timeout_ms > 0
    }
}

/// Operations this client issues once a session is up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request<'a> {
    GetChildren { path: &'a str },
    GetData { path: &'a str },
    CloseSession,
}

impl Request<'_> {
    pub fn opcode(&self) -> OpCode {
        match self {
            Request::GetChildren { .. } => OpCode::GetChildren,
            Request::GetData { .. } => OpCode::GetData,
            Request::CloseSession => OpCode::CloseSession,
        }
    }

    /// Path targeted by the request, empty for session-level operations.
    pub fn path(&self) -> &str {
        match self {
            Request::GetChildren { path } | Request::GetData { path } => path,
            Request::CloseSession => "",
        }
    }

    pub fn encode(&self, xid: i32, buf: &mut BytesMut) {
        buf.put_i32(xid);
        buf.put_i32(self.opcode() as i32);
        match self {
            Request::GetChildren { path } | Request::GetData { path } => {
                put_buffer(buf, Some(path.as_bytes()));
                // never leave a watch behind
                buf.put_u8(0);
            }
            Request::CloseSession => {}
        }
    }
}

/// Header preceding every reply body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyHeader {
    pub xid: i32,
    pub err: i32,
}

impl ReplyHeader {
    /// Reads xid, zxid and error code; the zxid is not tracked.
    pub fn decode(buf: &mut Bytes) -> ZkResult<Self> {
        let xid = get_i32(buf, "reply xid")?;
        get_i64(buf, "reply zxid")?;
        let err = get_i32(buf, "reply error code")?;
        Ok(Self { xid, err })
    }
}

/// Body of a get-children reply: the child names, unordered.
pub fn decode_children(buf: &mut Bytes) -> ZkResult<Vec<String>> {
    let count = get_i32(buf, "children count")?;
    if count < 0 {
        return Ok(Vec::new());
    }
    // every entry needs at least its length prefix
    if buf.remaining() < count as usize * 4 {
        return Err(ZkError::Protocol(format!(
            "children count {count} exceeds remaining {} bytes",
            buf.remaining()
        )));
    }
    (0..count)
        .map(|_| {
            let raw = get_buffer(buf, "child name")?.unwrap_or_default();
            String::from_utf8(raw.to_vec())
                .map_err(|e| ZkError::Protocol(format!("child name is not utf-8: {e}")))
        })
        .collect()
}

/// Body of a get-data reply. The trailing `Stat` is validated but discarded.
pub fn decode_data(buf: &mut Bytes) -> ZkResult<Bytes> {
    let data = get_buffer(buf, "node data")?.unwrap_or_default();
    if buf.remaining() < STAT_LEN {
        return Err(ZkError::Protocol(format!(
            "truncated stat: {} of {STAT_LEN} bytes",
            buf.remaining()
        )));
    }
    buf.advance(STAT_LEN);
    Ok(data)
}

fn put_buffer(buf: &mut BytesMut, data: Option<&[u8]>) {
    match data {
        Some(data) => {
            buf.put_i32(data.len() as i32);
            buf.put_slice(data);
        }
        None => buf.put_i32(-1),
    }
}

fn get_i32(buf: &mut Bytes, what: &str) -> ZkResult<i32> {
    if buf.remaining() < 4 {
        return Err(truncated(what));
    }
    Ok(buf.get_i32())
}

fn get_i64(buf: &mut Bytes, what: &str) -> ZkResult<i64> {
    if buf.remaining() < 8 {
        return Err(truncated(what));
    }
    Ok(buf.get_i64())
}

fn get_buffer(buf: &mut Bytes, what: &str) -> ZkResult<Option<Bytes>> {
    let len = get_i32(buf, what)?;
    if len < 0 {
        return Ok(None);
    }
    let len = len as usize;
    if buf.remaining() < len {
        return Err(truncated(what));
    }
    Ok(Some(buf.split_to(len)))
}

fn truncated(what: &str) -> ZkError {
    ZkError::Protocol(format!("truncated frame reading {what}"))
}
