// On-disk framing for log records.
use bytes::{Buf, BufMut, Bytes, BytesMut};
use sha2::{Digest, Sha256};

use crate::{LogError, Result};

pub const MAGIC: u32 = 0x52454731; // "REG1"
pub const VERSION: u16 = 1;
// Flags describe how to interpret the record body.
pub const FLAG_TOMBSTONE: u16 = 0x0001;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub magic: u32,
    pub version: u16,
    pub flags: u16,
    pub key_len: u32,
    pub value_len: u32,
    /// Covers key and value.
    pub checksum: u32,
    /// Covers the 20 header bytes before it.
    pub header_checksum: u32,
}

impl RecordHeader {
    pub const LEN: usize = 24;
    const CHECKED_LEN: usize = 20;

    pub fn body_len(&self) -> usize {
        self.key_len as usize + self.value_len as usize
    }

    pub fn is_tombstone(&self) -> bool {
        self.flags & FLAG_TOMBSTONE != 0
    }

    fn new(flags: u16, key_len: u32, value_len: u32, checksum: u32) -> Self {
        let mut header = Self {
            magic: MAGIC,
            version: VERSION,
            flags,
            key_len,
            value_len,
            checksum,
            header_checksum: 0,
        };
        header.header_checksum = self::checksum(&[&header.checked_bytes()[..]]);
        header
    }

    // Network byte order, same as the broker wire frames.
    fn checked_bytes(&self) -> [u8; Self::CHECKED_LEN] {
        let mut out = [0u8; Self::CHECKED_LEN];
        let mut buf = &mut out[..];
        buf.put_u32(self.magic);
        buf.put_u16(self.version);
        buf.put_u16(self.flags);
        buf.put_u32(self.key_len);
        buf.put_u32(self.value_len);
        buf.put_u32(self.checksum);
        out
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_slice(&self.checked_bytes());
        buf.put_u32(self.header_checksum);
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::LEN {
            return Err(LogError::Incomplete);
        }
        let checked = &buf[..Self::CHECKED_LEN];
        let mut cursor = buf;
        let magic = cursor.get_u32();
        if magic != MAGIC {
            return Err(LogError::InvalidMagic);
        }
        let version = cursor.get_u16();
        if version != VERSION {
            return Err(LogError::UnsupportedVersion(version));
        }
        let header = Self {
            magic,
            version,
            flags: cursor.get_u16(),
            key_len: cursor.get_u32(),
            value_len: cursor.get_u32(),
            checksum: cursor.get_u32(),
            header_checksum: cursor.get_u32(),
        };
        // Lengths are only trusted once the header itself checks out.
        if checksum(&[checked]) != header.header_checksum {
            return Err(LogError::HeaderChecksumMismatch);
        }
        Ok(header)
    }
}

// First four bytes of SHA-256 over the concatenated parts.
pub(crate) fn checksum(parts: &[&[u8]]) -> u32 {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    let digest = hasher.finalize();
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}

pub(crate) fn encode_record(key: &[u8], value: Option<&[u8]>) -> Result<Bytes> {
    let body = value.unwrap_or_default();
    if key.len() > u32::MAX as usize || body.len() > u32::MAX as usize {
        return Err(LogError::RecordTooLarge);
    }
    let header = RecordHeader::new(
        if value.is_none() { FLAG_TOMBSTONE } else { 0 },
        key.len() as u32,
        body.len() as u32,
        checksum(&[key, body]),
    );
    let mut buf = BytesMut::with_capacity(RecordHeader::LEN + key.len() + body.len());
    header.encode(&mut buf);
    buf.extend_from_slice(key);
    buf.extend_from_slice(body);
    Ok(buf.freeze())
}

/// Split a record body into key and value, verifying the body checksum.
pub(crate) fn decode_body(header: &RecordHeader, body: Bytes) -> Result<(Bytes, Option<Bytes>)> {
    if body.len() < header.body_len() {
        return Err(LogError::Incomplete);
    }
    let key = body.slice(0..header.key_len as usize);
    let value = body.slice(header.key_len as usize..header.body_len());
    if checksum(&[&key[..], &value[..]]) != header.checksum {
        return Err(LogError::ChecksumMismatch);
    }
    if header.is_tombstone() {
        Ok((key, None))
    } else {
        Ok((key, Some(value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tombstone_sets_flag_and_empty_value() {
        let encoded = encode_record(b"key", None).expect("encode");
        let header = RecordHeader::decode(&encoded).expect("header");
        assert!(header.is_tombstone());
        assert_eq!(header.value_len, 0);
        let (key, value) =
            decode_body(&header, encoded.slice(RecordHeader::LEN..)).expect("body");
        assert_eq!(key, Bytes::from_static(b"key"));
        assert!(value.is_none());
    }

    #[test]
    fn empty_value_is_not_a_tombstone() {
        let encoded = encode_record(b"key", Some(b"")).expect("encode");
        let header = RecordHeader::decode(&encoded).expect("header");
        let (_, value) = decode_body(&header, encoded.slice(RecordHeader::LEN..)).expect("body");
        assert_eq!(value, Some(Bytes::new()));
    }

    #[test]
    fn decode_rejects_bad_magic_and_version() {
        let mut encoded = BytesMut::from(&encode_record(b"k", Some(b"v")).expect("encode")[..]);
        encoded[0] = 0;
        assert!(matches!(
            RecordHeader::decode(&encoded),
            Err(LogError::InvalidMagic)
        ));

        let mut encoded = BytesMut::from(&encode_record(b"k", Some(b"v")).expect("encode")[..]);
        encoded[5] = 9;
        assert!(matches!(
            RecordHeader::decode(&encoded),
            Err(LogError::UnsupportedVersion(9))
        ));
    }

    #[test]
    fn flipped_value_byte_fails_checksum() {
        let encoded = encode_record(b"k", Some(b"value")).expect("encode");
        let header = RecordHeader::decode(&encoded).expect("header");
        let mut body = BytesMut::from(&encoded[RecordHeader::LEN..]);
        let last = body.len() - 1;
        body[last] ^= 0xff;
        assert!(matches!(
            decode_body(&header, body.freeze()),
            Err(LogError::ChecksumMismatch)
        ));
    }

    #[test]
    fn flipped_length_byte_fails_header_checksum() {
        let mut encoded = BytesMut::from(&encode_record(b"k", Some(b"value")).expect("encode")[..]);
        // High byte of value_len.
        encoded[12] ^= 0x01;
        assert!(matches!(
            RecordHeader::decode(&encoded),
            Err(LogError::HeaderChecksumMismatch)
        ));
    }

    #[test]
    fn short_header_is_incomplete() {
        assert!(matches!(
            RecordHeader::decode(&[0u8; 4]),
            Err(LogError::Incomplete)
        ));
    }
}
