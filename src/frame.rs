//! Length-prefixed wire framing
//!
//! One frame on the wire is a 1-byte tag, a 4-byte little-endian payload
//! length, and exactly that many payload bytes. Encoding a payload of `n`
//! bytes therefore always yields `5 + n` bytes; an empty payload is a legal
//! 5-byte frame.
//!
//! Reads loop until the declared length is satisfied, so partial delivery
//! from the transport never corrupts framing. What the tags mean is the
//! business of [`message`](crate::message); this module only moves bytes.

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::FrameError;

/// Fixed bytes preceding every payload: tag plus length
pub const HEADER_LEN: usize = 5;

/// Maximum accepted inbound payload length
///
/// Chat text and usernames are small; a declared length above this is
/// treated as a protocol fault rather than an allocation request.
pub const MAX_PAYLOAD: usize = 64 * 1024;

/// Scratch size used when discarding an oversized payload
const DRAIN_CHUNK: usize = 8 * 1024;

/// Append one length-prefixed chunk (length, then bytes, no tag) to `dst`.
///
/// The length field is 4 bytes on the wire, so `payload` must fit in `u32`.
pub fn encode_chunk(payload: &[u8], dst: &mut BytesMut) {
    debug_assert!(
        payload.len() <= u32::MAX as usize,
        "payload of {} bytes does not fit the 4-byte length field",
        payload.len()
    );
    dst.reserve(4 + payload.len());
    dst.put_u32_le(payload.len() as u32);
    dst.put_slice(payload);
}

/// Encode a complete frame: tag, 4-byte little-endian length, payload.
pub fn encode_frame(tag: u8, payload: &[u8]) -> BytesMut {
    let mut buf = BytesMut::with_capacity(HEADER_LEN + payload.len());
    buf.put_u8(tag);
    encode_chunk(payload, &mut buf);
    buf
}

/// Write one complete frame to `writer` as a single buffered write.
pub async fn write_frame<W>(writer: &mut W, tag: u8, payload: &[u8]) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    let buf = encode_frame(tag, payload);
    writer.write_all(&buf).await?;
    Ok(())
}

/// Read the 1-byte tag that starts every frame.
///
/// Returns `FrameError::ConnectionClosed` if the peer has hung up.
pub async fn read_tag<R>(reader: &mut R) -> Result<u8, FrameError>
where
    R: AsyncRead + Unpin,
{
    reader.read_u8().await.map_err(map_read_err)
}

/// Read one length-prefixed chunk: a 4-byte length, then exactly that many
/// payload bytes.
///
/// A declared length above `max` is drained from the stream in bounded
/// pieces and reported as `PayloadTooLarge`, leaving the stream positioned
/// at the next frame. EOF anywhere inside the chunk is `ConnectionClosed`.
pub async fn read_chunk<R>(reader: &mut R, max: usize) -> Result<Vec<u8>, FrameError>
where
    R: AsyncRead + Unpin,
{
    let len = reader.read_u32_le().await.map_err(map_read_err)? as usize;

    if len > max {
        drain(reader, len).await?;
        return Err(FrameError::PayloadTooLarge { size: len, max });
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await.map_err(map_read_err)?;
    Ok(payload)
}

/// Discard exactly `len` bytes from the stream.
async fn drain<R>(reader: &mut R, len: usize) -> Result<(), FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut scratch = vec![0u8; DRAIN_CHUNK];
    let mut remaining = len;
    while remaining > 0 {
        let want = remaining.min(DRAIN_CHUNK);
        let read = reader.read(&mut scratch[..want]).await?;
        if read == 0 {
            return Err(FrameError::ConnectionClosed);
        }
        remaining -= read;
    }
    Ok(())
}

/// EOF shows up as `UnexpectedEof` from the exact-read helpers; everything
/// else stays an I/O error.
fn map_read_err(err: std::io::Error) -> FrameError {
    if err.kind() == std::io::ErrorKind::UnexpectedEof {
        FrameError::ConnectionClosed
    } else {
        FrameError::Io(err)
    }
}
