//! Wire format for the TCP transport
//!
//! A message has two parts, each prefixed by a big-endian `u32` length:
//!
//! ```text
//! [len][send timestamp as ASCII decimal][len][payload bytes]
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::bus::error::{BusError, BusResult};
use crate::bus::types::Packet;

/// Upper bound on a single part; anything larger is treated as a corrupt stream.
pub const MAX_PART_LEN: usize = 64 * 1024 * 1024;

const LEN_PREFIX: usize = 4;

/// Encode a packet as a two-part message
///
/// Payloads over [`MAX_PART_LEN`] are refused; the receiving side would drop
/// the connection on them.
pub fn encode_message(packet: &Packet) -> BusResult<Bytes> {
    check_part_len(packet.payload.len())?;
    let timestamp = packet.send_timestamp_ns.to_string();
    let mut buf =
        BytesMut::with_capacity(2 * LEN_PREFIX + timestamp.len() + packet.payload.len());

    buf.put_u32(timestamp.len() as u32);
    buf.put_slice(timestamp.as_bytes());
    buf.put_u32(packet.payload.len() as u32);
    buf.put_slice(&packet.payload);

    Ok(buf.freeze())
}

/// Parse the ASCII decimal timestamp part
pub fn parse_timestamp(part: &[u8]) -> BusResult<u64> {
    if part.is_empty() || !part.iter().all(u8::is_ascii_digit) {
        return Err(BusError::Protocol(format!(
            "timestamp part is not a decimal string ({} bytes)",
            part.len()
        )));
    }

    // All-digit input is valid UTF-8; only overflow can fail here
    std::str::from_utf8(part)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or_else(|| BusError::Protocol("timestamp does not fit in u64".to_string()))
}

/// Reject a part longer than [`MAX_PART_LEN`]
pub fn check_part_len(len: usize) -> BusResult<usize> {
    if len > MAX_PART_LEN {
        return Err(BusError::Protocol(format!(
            "part length {len} exceeds limit {MAX_PART_LEN}"
        )));
    }
    Ok(len)
}

/// Decode one complete message from the front of `buf`
///
/// Returns `Ok(None)` and leaves `buf` untouched when more bytes are needed.
pub fn decode_message(buf: &mut BytesMut) -> BusResult<Option<Packet>> {
    if buf.len() < LEN_PREFIX {
        return Ok(None);
    }
    let ts_len = check_part_len(u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize)?;

    let payload_prefix_at = LEN_PREFIX + ts_len;
    if buf.len() < payload_prefix_at + LEN_PREFIX {
        return Ok(None);
    }
    let raw_len = &buf[payload_prefix_at..payload_prefix_at + LEN_PREFIX];
    let payload_len =
        check_part_len(u32::from_be_bytes([raw_len[0], raw_len[1], raw_len[2], raw_len[3]]) as usize)?;

    let total = payload_prefix_at + LEN_PREFIX + payload_len;
    if buf.len() < total {
        return Ok(None);
    }

    let send_timestamp_ns = parse_timestamp(&buf[LEN_PREFIX..payload_prefix_at])?;
    buf.advance(payload_prefix_at + LEN_PREFIX);
    let payload = buf.split_to(payload_len).freeze();

    Ok(Some(Packet {
        send_timestamp_ns,
        payload,
    }))
}
