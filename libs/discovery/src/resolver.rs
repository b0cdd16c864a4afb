//! Leader resolution over the membership path.
//!
//! Lists the registration nodes, fetches and decodes each payload, and
//! orders the members by node sequence number. The lowest sequence is the
//! leader: the ensemble numbers sequential siblings in creation order and
//! the oldest live registration wins.

use async_trait::async_trait;
use tracing::{debug, warn};
use zk_client::{Connection, ErrorCode, ZkError, ZkResult};

use crate::codec::MemberRecordCodec;
use crate::models::MemberRecord;

/// Read access to the membership tree.
///
/// Implemented by [`zk_client::Connection`]; tests plug in in-memory trees.
#[async_trait]
pub trait MembershipSource: Send {
    /// Names of the direct children of `path`.
    async fn children(&mut self, path: &str) -> ZkResult<Vec<String>>;

    /// Payload stored at `path`.
    async fn data(&mut self, path: &str) -> ZkResult<Vec<u8>>;
}

#[async_trait]
impl MembershipSource for Connection {
    async fn children(&mut self, path: &str) -> ZkResult<Vec<String>> {
        self.get_children(path).await
    }

    async fn data(&mut self, path: &str) -> ZkResult<Vec<u8>> {
        Ok(self.get_data(path).await?.to_vec())
    }
}

/// A registration node and its undecoded payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMember {
    pub name: String,
    pub sequence: u64,
    pub payload: Vec<u8>,
}

/// Finds the members registered under one path.
#[derive(Debug, Clone)]
pub struct LeaderResolver {
    base_path: String,
    codec: MemberRecordCodec,
}

impl LeaderResolver {
    pub fn new(base_path: impl Into<String>, codec: MemberRecordCodec) -> Self {
        Self {
            base_path: base_path.into(),
            codec,
        }
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn codec(&self) -> &MemberRecordCodec {
        &self.codec
    }

    /// Registration nodes under the base path with their payloads, ascending
    /// by sequence.
    ///
    /// Children not named like registration nodes are ignored. A missing
    /// base path yields no members. Nodes that disappear or refuse access
    /// between listing and fetching are skipped; any other server error
    /// fails the listing.
    pub async fn list_members<S>(&self, source: &mut S) -> ZkResult<Vec<RawMember>>
    where
        S: MembershipSource + ?Sized,
    {
        let dialect = self.codec.dialect();
        let children = match source.children(&self.base_path).await {
            Ok(children) => children,
            Err(err) if err.is_no_node() => {
                debug!(path = %self.base_path, "membership path does not exist");
                return Ok(Vec::new());
            }
            Err(err) => return Err(err),
        };

        let listed = children.len();
        let mut candidates: Vec<(u64, String)> = children
            .into_iter()
            .filter_map(|name| dialect.sequence_of(&name).map(|seq| (seq, name)))
            .collect();
        candidates.sort_unstable_by_key(|(seq, _)| *seq);
        debug!(
            path = %self.base_path,
            %dialect,
            listed,
            registrations = candidates.len(),
            "listed membership path"
        );

        let mut members = Vec::with_capacity(candidates.len());
        for (sequence, name) in candidates {
            let path = child_path(&self.base_path, &name);
            match source.data(&path).await {
                Ok(payload) => members.push(RawMember {
                    name,
                    sequence,
                    payload,
                }),
                Err(err) if is_gone_or_denied(&err) => {
                    debug!(node = %path, error = %err, "registration unreadable, skipping");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(members)
    }

    /// Every decodable member, ascending by sequence (leader first).
    ///
    /// Members whose payload does not decode are logged and skipped; the
    /// result may be empty.
    pub async fn resolve_all<S>(&self, source: &mut S) -> ZkResult<Vec<MemberRecord>>
    where
        S: MembershipSource + ?Sized,
    {
        let raw = self.list_members(source).await?;
        let mut records = Vec::with_capacity(raw.len());
        for member in raw {
            match self.codec.decode(&member.payload, member.sequence) {
                Ok(record) => records.push(record),
                Err(err) => {
                    warn!(
                        node = %member.name,
                        len = err.len,
                        version = %err.version,
                        reason = %err.reason,
                        "skipping undecodable member"
                    );
                }
            }
        }
        Ok(records)
    }

    /// The first member of [`LeaderResolver::resolve_all`], if any.
    pub async fn resolve_leader<S>(&self, source: &mut S) -> ZkResult<Option<MemberRecord>>
    where
        S: MembershipSource + ?Sized,
    {
        Ok(self.resolve_all(source).await?.into_iter().next())
    }
}

/// The node vanished after listing, or its ACL shuts us out. Anything else
/// says the session itself is unusable.
fn is_gone_or_denied(err: &ZkError) -> bool {
    matches!(
        err,
        ZkError::Server {
            code: ErrorCode::NoNode | ErrorCode::NoAuth,
            ..
        }
    )
}

fn child_path(base: &str, name: &str) -> String {
    if base == "/" {
        format!("/{name}")
    } else {
        format!("{base}/{name}")
    }
}
