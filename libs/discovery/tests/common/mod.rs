//! In-process stand-in for a ZooKeeper server.
//!
//! Speaks just enough of the client protocol for discovery: the session
//! handshake, get-children, get-data and close-session, over a flat
//! `path -> payload` tree.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::{Buf, BufMut, Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

const NO_NODE: i32 = -101;
const STAT_LEN: usize = 68;

/// How the server misbehaves when a request targets a given path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Drop the socket without replying.
    HangUp,
    /// Never reply, keep the socket open.
    Stall,
    /// Reply with this error code.
    Code(i32),
}

#[derive(Debug, Default, Clone)]
pub struct Tree {
    nodes: BTreeMap<String, Vec<u8>>,
    faults: BTreeMap<String, Fault>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(mut self, path: &str, payload: impl AsRef<[u8]>) -> Self {
        self.nodes.insert(path.to_owned(), payload.as_ref().to_vec());
        self
    }

    /// Misbehave on any request for `path`, listing or fetching.
    pub fn fault(mut self, path: &str, fault: Fault) -> Self {
        self.faults.insert(path.to_owned(), fault);
        self
    }

    fn children(&self, path: &str) -> Option<Vec<String>> {
        if !self.nodes.contains_key(path) {
            return None;
        }
        let prefix = format!("{path}/");
        Some(
            self.nodes
                .keys()
                .filter_map(|k| k.strip_prefix(&prefix))
                .filter(|rest| !rest.contains('/'))
                .map(str::to_owned)
                .collect(),
        )
    }
}

/// Per-server session bookkeeping.
#[derive(Debug, Default)]
struct Counters {
    sessions: AtomicUsize,
    closed: AtomicUsize,
    dropped: AtomicUsize,
}

#[derive(Debug)]
pub struct FakeEnsemble {
    addr: SocketAddr,
    counters: Arc<Counters>,
    task: JoinHandle<()>,
}

impl FakeEnsemble {
    pub async fn start(tree: Tree) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let counters = Arc::new(Counters::default());
        let tree = Arc::new(tree);

        let task = {
            let counters = Arc::clone(&counters);
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    let id = counters.sessions.fetch_add(1, Ordering::SeqCst) as i64 + 1;
                    tokio::spawn(serve(stream, id, Arc::clone(&tree), Arc::clone(&counters)));
                }
            })
        };

        Self {
            addr,
            counters,
            task,
        }
    }

    /// `zk://` URI for this server followed by `path` (may be empty).
    pub fn uri(&self, path: &str) -> String {
        format!("zk://{}{path}", self.addr)
    }

    pub fn sessions(&self) -> usize {
        self.counters.sessions.load(Ordering::SeqCst)
    }

    /// Sessions ended with a close-session request.
    pub fn closed_sessions(&self) -> usize {
        self.counters.closed.load(Ordering::SeqCst)
    }

    /// Sessions whose socket reached EOF without a close-session request.
    pub fn dropped_sessions(&self) -> usize {
        self.counters.dropped.load(Ordering::SeqCst)
    }
}

impl Drop for FakeEnsemble {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// A bound port with nothing accepting on it.
pub async fn unreachable_uri() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("zk://{addr}/mesos")
}

async fn serve(stream: TcpStream, session_id: i64, tree: Arc<Tree>, counters: Arc<Counters>) {
    let mut framed = Framed::new(stream, LengthDelimitedCodec::new());
    if framed.next().await.is_none() {
        return;
    }

    let mut resp = BytesMut::new();
    resp.put_i32(0);
    resp.put_i32(10_000);
    resp.put_i64(session_id);
    resp.put_i32(16);
    resp.put_slice(&[0; 16]);
    resp.put_u8(0);
    if framed.send(resp.freeze()).await.is_err() {
        return;
    }

    while let Some(Ok(frame)) = framed.next().await {
        let mut frame = frame.freeze();
        let xid = frame.get_i32();
        let op = frame.get_i32();
        if op == -11 {
            counters.closed.fetch_add(1, Ordering::SeqCst);
            let _ = framed.send(header(xid, 0, &[])).await;
            return;
        }

        let path = read_path(&mut frame);
        let reply = match tree.faults.get(&path) {
            Some(Fault::HangUp) => return,
            Some(Fault::Stall) => continue,
            Some(Fault::Code(code)) => header(xid, *code, &[]),
            None => match op {
                8 => match tree.children(&path) {
                    Some(children) => {
                        let mut body = BytesMut::new();
                        body.put_i32(children.len() as i32);
                        for child in children {
                            body.put_i32(child.len() as i32);
                            body.put_slice(child.as_bytes());
                        }
                        header(xid, 0, &body)
                    }
                    None => header(xid, NO_NODE, &[]),
                },
                4 => match tree.nodes.get(&path) {
                    Some(data) => {
                        let mut body = BytesMut::new();
                        body.put_i32(data.len() as i32);
                        body.put_slice(data);
                        body.put_slice(&[0; STAT_LEN]);
                        header(xid, 0, &body)
                    }
                    None => header(xid, NO_NODE, &[]),
                },
                other => panic!("fake ensemble got unexpected opcode {other}"),
            },
        };
        if framed.send(reply).await.is_err() {
            return;
        }
    }
    counters.dropped.fetch_add(1, Ordering::SeqCst);
}

fn read_path(frame: &mut Bytes) -> String {
    let len = frame.get_i32() as usize;
    String::from_utf8(frame.split_to(len).to_vec()).unwrap()
}

fn header(xid: i32, err: i32, body: &[u8]) -> Bytes {
    let mut buf = BytesMut::new();
    buf.put_i32(xid);
    buf.put_i64(1);
    buf.put_i32(err);
    buf.put_slice(body);
    buf.freeze()
}

pub fn json_info(hostname: &str, ip: &str, port: u16) -> Vec<u8> {
    serde_json::json!({
        "address": { "hostname": hostname, "ip": ip, "port": port },
        "hostname": hostname,
        "id": format!("{hostname}-id"),
        "pid": format!("master@{ip}:{port}"),
        "port": port,
        "version": "0.28.0",
    })
    .to_string()
    .into_bytes()
}
