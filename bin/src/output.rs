//! Result rendering for stdout.
//!
//! Four-space indentation, one value per line, `,` and `:` separators with
//! no space after the colon.

use std::io;

use serde::Serialize;
use serde_json::ser::{Formatter, PrettyFormatter, Serializer};

const INDENT: &[u8] = b"    ";

/// [`PrettyFormatter`] with a bare `:` between keys and values.
#[derive(Debug)]
pub struct CompactColonFormatter {
    inner: PrettyFormatter<'static>,
}

impl CompactColonFormatter {
    pub fn new() -> Self {
        Self {
            inner: PrettyFormatter::with_indent(INDENT),
        }
    }
}

impl Default for CompactColonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter for CompactColonFormatter {
    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_array(writer)
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.inner.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object(writer)
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.inner.begin_object_key(writer, first)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b":")
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object_value(writer)
    }
}

/// Serialize `value` in the output format, without a trailing newline.
pub fn to_vec<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(256);
    let mut ser = Serializer::with_formatter(&mut buf, CompactColonFormatter::new());
    value.serialize(&mut ser)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use discovery::{MemberRecord, MemberSet};

    use super::*;

    fn record(hostname: &str, id: &str) -> MemberRecord {
        MemberRecord {
            hostname: hostname.into(),
            ip: "10.0.0.1".into(),
            port: 5050,
            pid: "master@10.0.0.1:5050".into(),
            id: id.into(),
            version: "0.24.0".into(),
        }
    }

    #[test]
    fn single_record() {
        let out = String::from_utf8(to_vec(&record("h1", "2")).unwrap()).unwrap();
        assert_eq!(
            out,
            "{\n    \"hostname\":\"h1\",\n    \"ip\":\"10.0.0.1\",\n    \"port\":5050,\n    \
             \"pid\":\"master@10.0.0.1:5050\",\n    \"id\":\"2\",\n    \"version\":\"0.24.0\"\n}"
        );
    }

    #[test]
    fn member_set_is_nested_array() {
        let set = MemberSet::new(vec![record("h1", "2"), record("h2", "5")]).unwrap();
        let out = String::from_utf8(to_vec(&set).unwrap()).unwrap();
        assert!(out.starts_with("[\n    {\n        \"hostname\":\"h1\","));
        assert!(out.contains("\n    },\n    {\n        \"hostname\":\"h2\","));
        assert!(out.ends_with("\"version\":\"0.24.0\"\n    }\n]"));
    }

    #[test]
    fn empty_containers() {
        let empty: Vec<u8> = Vec::new();
        assert_eq!(to_vec(&empty).unwrap(), b"[]");
    }
}
