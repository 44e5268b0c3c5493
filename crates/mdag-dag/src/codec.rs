//! Canonical binary encoding of DAG objects.
//!
//! ```text
//! object  := version:u8 tag:u8 link_count:varint link* [payload]
//! link    := digest:[32] size:varint kind:u8 name_flag:u8 [name_len:varint name]
//! payload := payload_len:varint bytes            (blobs only)
//! ```
//!
//! Integers are unsigned LEB128 varints. The decoder accepts only the
//! minimal encoding of every varint and rejects trailing bytes, so each
//! object has exactly one valid byte representation and digests are stable.

use mdag_types::{Digest, DIGEST_LEN};

use crate::error::CodecError;
use crate::object::{Link, LinkKind, Object};

/// Encoding version written as the first byte of every object.
pub const WIRE_VERSION: u8 = 1;

// digest + size varint + kind + name flag
const MIN_LINK_LEN: usize = DIGEST_LEN + 3;

/// Encode an object canonically.
pub fn serialize(object: &Object) -> Vec<u8> {
    let links = object.links();
    let payload = object.payload();
    let mut buf = Vec::with_capacity(
        3 + links.len() * (MIN_LINK_LEN + 8) + payload.map_or(0, |p| p.len() + 5),
    );

    buf.push(WIRE_VERSION);
    buf.push(object.kind().tag());
    encode_varint(&mut buf, links.len() as u64);
    for link in links {
        buf.extend_from_slice(link.digest.as_bytes());
        encode_varint(&mut buf, link.size);
        buf.push(link.kind.tag());
        match &link.name {
            Some(name) => {
                buf.push(1);
                encode_varint(&mut buf, name.len() as u64);
                buf.extend_from_slice(name.as_bytes());
            }
            None => buf.push(0),
        }
    }
    if let Some(payload) = payload {
        encode_varint(&mut buf, payload.len() as u64);
        buf.extend_from_slice(payload);
    }
    buf
}

/// Decode and validate an object.
pub fn deserialize(data: &[u8]) -> Result<Object, CodecError> {
    let mut cur = Cursor::new(data);

    let version = cur.u8("version")?;
    if version != WIRE_VERSION {
        return Err(CodecError::UnsupportedVersion(version));
    }
    let tag = cur.u8("object tag")?;
    let kind = LinkKind::from_tag(tag).ok_or(CodecError::UnknownTag(tag))?;

    let count = cur.varint("link count")?;
    // Every link occupies at least MIN_LINK_LEN bytes; a larger count cannot
    // be satisfied by the remaining input.
    if count > (cur.remaining() / MIN_LINK_LEN) as u64 {
        return Err(CodecError::Truncated("links"));
    }
    let mut links = Vec::with_capacity(count as usize);
    for _ in 0..count {
        links.push(cur.link()?);
    }

    let object = match kind {
        LinkKind::Blob => {
            if !links.is_empty() {
                return Err(CodecError::Inconsistent(format!(
                    "blob carries {} links",
                    links.len()
                )));
            }
            let len = cur.len("payload length")?;
            let payload = cur.bytes(len, "payload")?.to_vec();
            Object::Blob { payload }
        }
        LinkKind::List => {
            if links.is_empty() {
                return Err(CodecError::Inconsistent("list has no links".into()));
            }
            for (i, link) in links.iter().enumerate() {
                if link.kind == LinkKind::Tree {
                    return Err(CodecError::Inconsistent(format!(
                        "list link {i} points to a tree"
                    )));
                }
                if link.name.is_some() {
                    return Err(CodecError::Inconsistent(format!(
                        "list link {i} carries a name"
                    )));
                }
            }
            Object::List { links }
        }
        LinkKind::Tree => {
            if let Some(i) = links.iter().position(|l| l.name.is_none()) {
                return Err(CodecError::Inconsistent(format!(
                    "tree link {i} has no name"
                )));
            }
            Object::Tree { links }
        }
    };

    if object.declared_size().is_none() {
        return Err(CodecError::SizeOverflow);
    }
    if cur.remaining() > 0 {
        return Err(CodecError::TrailingBytes(cur.remaining()));
    }
    Ok(object)
}

/// Encode a u64 as a variable-length integer.
pub(crate) fn encode_varint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value > 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn u8(&mut self, what: &'static str) -> Result<u8, CodecError> {
        let byte = *self.data.get(self.pos).ok_or(CodecError::Truncated(what))?;
        self.pos += 1;
        Ok(byte)
    }

    fn bytes(&mut self, len: usize, what: &'static str) -> Result<&'a [u8], CodecError> {
        if len > self.remaining() {
            return Err(CodecError::Truncated(what));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    /// Minimal LEB128 only.
    fn varint(&mut self, what: &'static str) -> Result<u64, CodecError> {
        let mut value: u64 = 0;
        let mut shift = 0u32;
        loop {
            let byte = self.u8(what)?;
            let group = u64::from(byte & 0x7F);
            if shift == 63 && group > 1 {
                return Err(CodecError::VarintOverflow);
            }
            value |= group << shift;
            if byte & 0x80 == 0 {
                if byte == 0 && shift > 0 {
                    return Err(CodecError::NonCanonicalVarint);
                }
                return Ok(value);
            }
            shift += 7;
            if shift > 63 {
                return Err(CodecError::VarintOverflow);
            }
        }
    }

    fn len(&mut self, what: &'static str) -> Result<usize, CodecError> {
        let value = self.varint(what)?;
        usize::try_from(value).map_err(|_| CodecError::LengthOverflow(value))
    }

    fn link(&mut self) -> Result<Link, CodecError> {
        let digest_bytes = self.bytes(DIGEST_LEN, "link digest")?;
        let digest =
            Digest::from_slice(digest_bytes).map_err(|_| CodecError::Truncated("link digest"))?;
        let size = self.varint("link size")?;
        let kind_byte = self.u8("link kind")?;
        let kind = LinkKind::from_tag(kind_byte).ok_or(CodecError::UnknownLinkKind(kind_byte))?;
        let name = match self.u8("name flag")? {
            0 => None,
            1 => {
                let len = self.len("name length")?;
                let raw = self.bytes(len, "name")?;
                let name = std::str::from_utf8(raw).map_err(|_| CodecError::InvalidName)?;
                Some(name.to_owned())
            }
            other => return Err(CodecError::InvalidNameFlag(other)),
        };
        Ok(Link {
            digest,
            size,
            kind,
            name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(seed: u8) -> Digest {
        Digest::new([seed; 32])
    }

    fn list() -> Object {
        Object::List {
            links: vec![
                Link::new(d(1), 262_144, LinkKind::Blob),
                Link::new(d(2), 45_056, LinkKind::Blob),
            ],
        }
    }

    fn tree() -> Object {
        Object::Tree {
            links: vec![
                Link::new(d(3), 12, LinkKind::Blob).named("a.txt"),
                Link::new(d(4), 0, LinkKind::Tree).named("b"),
            ],
        }
    }

    // -----------------------------------------------------------------------
    // Layout
    // -----------------------------------------------------------------------

    #[test]
    fn empty_blob_layout() {
        let bytes = serialize(&Object::Blob { payload: vec![] });
        assert_eq!(bytes, vec![WIRE_VERSION, 0x01, 0x00, 0x00]);
    }

    #[test]
    fn blob_layout_carries_payload_inline() {
        let bytes = serialize(&Object::Blob {
            payload: b"hi".to_vec(),
        });
        assert_eq!(bytes, vec![WIRE_VERSION, 0x01, 0x00, 0x02, b'h', b'i']);
    }

    #[test]
    fn named_link_layout() {
        let bytes = serialize(&Object::Tree {
            links: vec![Link::new(d(9), 300, LinkKind::Blob).named("x")],
        });
        let mut expected = vec![WIRE_VERSION, 0x03, 0x01];
        expected.extend_from_slice(&[9u8; 32]);
        expected.extend_from_slice(&[0xAC, 0x02]); // 300
        expected.extend_from_slice(&[0x01, 0x01, 0x01, b'x']);
        assert_eq!(bytes, expected);
    }

    // -----------------------------------------------------------------------
    // Decoding valid objects
    // -----------------------------------------------------------------------

    #[test]
    fn decodes_every_kind() {
        let blob = Object::Blob {
            payload: (0..=255u8).collect(),
        };
        for obj in [blob, list(), tree(), Object::Tree { links: vec![] }] {
            assert_eq!(deserialize(&serialize(&obj)).unwrap(), obj);
        }
    }

    #[test]
    fn encoding_is_canonical() {
        assert_eq!(serialize(&tree()), serialize(&tree().clone()));
        let reordered = Object::Tree {
            links: tree().links().iter().rev().cloned().collect(),
        };
        assert_ne!(serialize(&tree()), serialize(&reordered));
    }

    #[test]
    fn names_are_preserved_verbatim() {
        let obj = Object::Tree {
            links: vec![Link::new(d(1), 1, LinkKind::Blob).named("répertoire / ☃ ")],
        };
        let decoded = deserialize(&serialize(&obj)).unwrap();
        assert_eq!(decoded.links()[0].name.as_deref(), Some("répertoire / ☃ "));
    }

    // -----------------------------------------------------------------------
    // Malformed input
    // -----------------------------------------------------------------------

    #[test]
    fn rejects_empty_and_truncated_input() {
        assert_eq!(deserialize(&[]), Err(CodecError::Truncated("version")));
        let bytes = serialize(&list());
        for cut in 1..bytes.len() {
            assert!(deserialize(&bytes[..cut]).is_err(), "cut at {cut} accepted");
        }
    }

    #[test]
    fn rejects_unknown_version_and_tag() {
        assert_eq!(
            deserialize(&[9, 0x01, 0, 0]),
            Err(CodecError::UnsupportedVersion(9))
        );
        assert_eq!(
            deserialize(&[WIRE_VERSION, 0x07, 0, 0]),
            Err(CodecError::UnknownTag(0x07))
        );
    }

    #[test]
    fn rejects_unknown_link_kind_and_name_flag() {
        let mut bytes = serialize(&list());
        let kind_pos = 3 + 32 + 3; // 262144 encodes in 3 bytes
        bytes[kind_pos] = 0x09;
        assert_eq!(deserialize(&bytes), Err(CodecError::UnknownLinkKind(0x09)));

        let mut bytes = serialize(&list());
        bytes[kind_pos + 1] = 0x05;
        assert_eq!(deserialize(&bytes), Err(CodecError::InvalidNameFlag(0x05)));
    }

    #[test]
    fn rejects_trailing_bytes() {
        let mut bytes = serialize(&tree());
        bytes.push(0);
        assert_eq!(deserialize(&bytes), Err(CodecError::TrailingBytes(1)));
    }

    #[test]
    fn rejects_non_minimal_varint() {
        // payload length 0 written as two bytes
        let bytes = [WIRE_VERSION, 0x01, 0x00, 0x80, 0x00];
        assert_eq!(deserialize(&bytes), Err(CodecError::NonCanonicalVarint));
    }

    #[test]
    fn rejects_varint_overflow() {
        let mut bytes = vec![WIRE_VERSION, 0x01];
        bytes.extend_from_slice(&[0xFF; 10]);
        bytes.push(0x01);
        assert_eq!(deserialize(&bytes), Err(CodecError::VarintOverflow));
    }

    #[test]
    fn rejects_huge_link_count_without_allocating() {
        let mut bytes = vec![WIRE_VERSION, 0x02];
        encode_varint(&mut bytes, u64::MAX);
        assert_eq!(deserialize(&bytes), Err(CodecError::Truncated("links")));
    }

    #[test]
    fn rejects_blob_with_links() {
        let mut bytes = serialize(&list());
        bytes[1] = LinkKind::Blob.tag();
        assert!(matches!(
            deserialize(&bytes),
            Err(CodecError::Inconsistent(_))
        ));
    }

    #[test]
    fn rejects_empty_list() {
        let bytes = [WIRE_VERSION, 0x02, 0x00];
        assert!(matches!(
            deserialize(&bytes),
            Err(CodecError::Inconsistent(_))
        ));
    }

    #[test]
    fn rejects_list_pointing_at_tree_or_named() {
        let bad_kind = Object::List {
            links: vec![Link::new(d(1), 1, LinkKind::Tree)],
        };
        assert!(matches!(
            deserialize(&serialize(&bad_kind)),
            Err(CodecError::Inconsistent(_))
        ));

        let named = Object::List {
            links: vec![Link::new(d(1), 1, LinkKind::Blob).named("x")],
        };
        assert!(matches!(
            deserialize(&serialize(&named)),
            Err(CodecError::Inconsistent(_))
        ));
    }

    #[test]
    fn rejects_unnamed_tree_entry() {
        let obj = Object::Tree {
            links: vec![Link::new(d(1), 1, LinkKind::Blob)],
        };
        assert!(matches!(
            deserialize(&serialize(&obj)),
            Err(CodecError::Inconsistent(_))
        ));
    }

    #[test]
    fn rejects_invalid_utf8_name() {
        let mut bytes = serialize(&Object::Tree {
            links: vec![Link::new(d(1), 1, LinkKind::Blob).named("ab")],
        });
        let last = bytes.len() - 1;
        bytes[last] = 0xFF;
        assert_eq!(deserialize(&bytes), Err(CodecError::InvalidName));
    }

    #[test]
    fn rejects_overflowing_sizes() {
        let obj = Object::List {
            links: vec![
                Link::new(d(1), u64::MAX, LinkKind::Blob),
                Link::new(d(2), 1, LinkKind::Blob),
            ],
        };
        assert_eq!(deserialize(&serialize(&obj)), Err(CodecError::SizeOverflow));
    }

    #[test]
    fn varint_encoding_is_minimal() {
        for (value, len) in [(0u64, 1usize), (127, 1), (128, 2), (16_383, 2), (u64::MAX, 10)] {
            let mut buf = Vec::new();
            encode_varint(&mut buf, value);
            assert_eq!(buf.len(), len, "value {value}");
            assert_eq!(Cursor::new(&buf).varint("test").unwrap(), value);
        }
    }
}
