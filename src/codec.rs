use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::ServerError;

/// The two raw ASCII bytes that confirm a BET batch. Not tag-prefixed,
/// unlike every other frame — recognized positionally by the client.
pub const CONFIRMATION: &[u8; 2] = b"OK";

/// The closed sum of frame tags carried after the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameTag {
    Bet,
    End,
    Winners,
    Winner,
}

impl FrameTag {
    fn from_byte(b: u8) -> Result<Self, ServerError> {
        match b {
            0 => Ok(FrameTag::Bet),
            1 => Ok(FrameTag::End),
            2 => Ok(FrameTag::Winners),
            3 => Ok(FrameTag::Winner),
            other => Err(ServerError::Protocol(format!("unknown frame tag: {other}"))),
        }
    }

    fn to_byte(self) -> u8 {
        match self {
            FrameTag::Bet => 0,
            FrameTag::End => 1,
            FrameTag::Winners => 2,
            FrameTag::Winner => 3,
        }
    }
}

/// Reads exactly `n` bytes or fails. Never returns a short buffer: a clean
/// peer close before any byte arrives is `UnexpectedEof`; a close mid-frame
/// surfaces as the same `UnexpectedEof` (unread_exact cannot tell the two
/// apart once more than zero bytes have arrived, so both collapse to one
/// variant per spec).
pub async fn read_exact<R: AsyncRead + Unpin>(
    stream: &mut R,
    n: usize,
) -> Result<Vec<u8>, ServerError> {
    let mut buf = vec![0u8; n];
    stream
        .read_exact(&mut buf)
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => ServerError::UnexpectedEof,
            _ => ServerError::Io(e),
        })?;
    Ok(buf)
}

/// Writes every byte of `buf`, looping over partial writes. The short-write
/// retry is exercised in tests against a mock writer that only accepts a
/// handful of bytes per call.
pub async fn write_all<W: AsyncWrite + Unpin>(
    stream: &mut W,
    buf: &[u8],
) -> Result<(), ServerError> {
    stream.write_all(buf).await.map_err(ServerError::Io)?;
    Ok(())
}

/// Reads bytes one at a time until `delim`, returning everything before it
/// decoded as UTF-8. Used only for the handshake line.
pub async fn read_line_until<R: AsyncRead + Unpin>(
    stream: &mut R,
    delim: u8,
) -> Result<String, ServerError> {
    let mut bytes = Vec::new();
    loop {
        let b = read_exact(stream, 1).await?;
        if b[0] == delim {
            break;
        }
        bytes.push(b[0]);
    }
    String::from_utf8(bytes).map_err(|e| ServerError::Protocol(format!("invalid handshake: {e}")))
}

/// Reads the one-byte frame tag that follows the handshake.
pub async fn read_frame_tag<R: AsyncRead + Unpin>(stream: &mut R) -> Result<FrameTag, ServerError> {
    let b = read_exact(stream, 1).await?;
    FrameTag::from_byte(b[0])
}

pub async fn read_u32_be<R: AsyncRead + Unpin>(stream: &mut R) -> Result<u32, ServerError> {
    let b = read_exact(stream, 4).await?;
    Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

pub async fn write_u32_be<W: AsyncWrite + Unpin>(
    stream: &mut W,
    value: u32,
) -> Result<(), ServerError> {
    write_all(stream, &value.to_be_bytes()).await
}

/// Reads a one-byte-length-prefixed UTF-8 string (a batch record, or a
/// WINNER payload).
pub async fn read_u8_len_bytes<R: AsyncRead + Unpin>(stream: &mut R) -> Result<String, ServerError> {
    let len_byte = read_exact(stream, 1).await?;
    let len = len_byte[0] as usize;
    let bytes = read_exact(stream, len).await?;
    String::from_utf8(bytes).map_err(|e| ServerError::Parse(format!("invalid utf-8: {e}")))
}

/// Writes a one-byte-length-prefixed UTF-8 string. `text` must be at most
/// 255 bytes (the wire format's length field is a single byte); callers are
/// responsible for staying within that bound, as the bet/winner record
/// formats in this protocol always do.
pub async fn write_u8_len_bytes<W: AsyncWrite + Unpin>(
    stream: &mut W,
    text: &str,
) -> Result<(), ServerError> {
    debug_assert!(text.len() <= u8::MAX as usize);
    write_all(stream, &[text.len() as u8]).await?;
    write_all(stream, text.as_bytes()).await
}

/// Writes the unprefixed `OK` confirmation frame.
pub async fn write_confirmation<W: AsyncWrite + Unpin>(stream: &mut W) -> Result<(), ServerError> {
    write_all(stream, CONFIRMATION).await
}

/// Writes a tag-only frame (END or WINNERS have no payload).
pub async fn write_tag_frame<W: AsyncWrite + Unpin>(
    stream: &mut W,
    tag: FrameTag,
) -> Result<(), ServerError> {
    write_all(stream, &[tag.to_byte()]).await
}

/// Writes a WINNER frame: tag byte, then the one-byte-length-prefixed
/// winner record text.
pub async fn write_winner_frame<W: AsyncWrite + Unpin>(
    stream: &mut W,
    record: &str,
) -> Result<(), ServerError> {
    write_tag_frame(stream, FrameTag::Winner).await?;
    write_u8_len_bytes(stream, record).await
}
