//! Records handed back to callers.

use serde::{Deserialize, Serialize};

/// One published master instance.
///
/// Serializes to exactly these six fields, in this order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberRecord {
    /// Network-addressable host name, or the IP when none was advertised.
    pub hostname: String,
    /// Numeric IP address; empty when the payload carried none.
    pub ip: String,
    /// Service port.
    pub port: u16,
    /// Process identity as advertised (e.g. `master@10.0.0.1:5050`).
    pub pid: String,
    /// Sequence number of the registration node, in plain decimal.
    pub id: String,
    /// Schema version the payload was decoded with.
    pub version: String,
}

/// Non-empty list of members ordered by registration sequence, leader first.
///
/// Serializes as a plain JSON array of [`MemberRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MemberSet {
    members: Vec<MemberRecord>,
}

impl MemberSet {
    /// Wrap an ordered member list. Returns `None` for an empty list.
    pub fn new(members: Vec<MemberRecord>) -> Option<Self> {
        if members.is_empty() {
            None
        } else {
            Some(Self { members })
        }
    }

    /// The member with the lowest sequence number.
    pub fn leader(&self) -> &MemberRecord {
        &self.members[0]
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Never true for a set built through [`MemberSet::new`].
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MemberRecord> {
        self.members.iter()
    }

    pub fn as_slice(&self) -> &[MemberRecord] {
        &self.members
    }

    pub fn into_vec(self) -> Vec<MemberRecord> {
        self.members
    }
}

impl IntoIterator for MemberSet {
    type Item = MemberRecord;
    type IntoIter = std::vec::IntoIter<MemberRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.into_iter()
    }
}

impl<'a> IntoIterator for &'a MemberSet {
    type Item = &'a MemberRecord;
    type IntoIter = std::slice::Iter<'a, MemberRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.iter()
    }
}
