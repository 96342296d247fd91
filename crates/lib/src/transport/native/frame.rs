//! Frames of the native wire protocol.
//!
//! ```text
//! request  := u32 frame_len | u8 opcode | str path | u32 argc | str* args
//! response := u32 frame_len | u8 status | str payload
//! str      := u32 byte_len | utf-8 bytes
//! ```
//!
//! `frame_len` counts the bytes after the length field. Write, create and
//! delete_member carry their value as the single argument.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::codec::{Reader, len_u32, put_str, put_u8, put_u32};
use crate::{
    Result,
    transport::{
        Request, TransportError,
        shared::{Reply, encode_remote_error},
    },
};

pub const OP_READ: u8 = 0x01;
pub const OP_WRITE: u8 = 0x02;
pub const OP_CREATE: u8 = 0x03;
pub const OP_DELETE: u8 = 0x04;
pub const OP_DELETE_MEMBER: u8 = 0x05;
pub const OP_INVOKE: u8 = 0x06;

pub const STATUS_OK: u8 = 0x00;
pub const STATUS_ERROR: u8 = 0x01;

/// Prepends the length field to a frame body.
fn seal(body: Vec<u8>) -> Result<Vec<u8>> {
    let mut frame = Vec::with_capacity(body.len() + 4);
    put_u32(&mut frame, len_u32(body.len())?);
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Encodes a complete request frame, length field included.
pub fn encode_request(request: &Request) -> Result<Vec<u8>> {
    let (opcode, args): (u8, Vec<&str>) = match request {
        Request::Read { .. } => (OP_READ, vec![]),
        Request::Write { value, .. } => (OP_WRITE, vec![value.as_str()]),
        Request::Create { value, .. } => (OP_CREATE, vec![value.as_str()]),
        Request::Delete { .. } => (OP_DELETE, vec![]),
        Request::DeleteMember { value, .. } => (OP_DELETE_MEMBER, vec![value.as_str()]),
        Request::Invoke { args, .. } => (OP_INVOKE, args.iter().map(String::as_str).collect()),
    };
    let mut body = Vec::new();
    put_u8(&mut body, opcode);
    put_str(&mut body, request.path())?;
    put_u32(&mut body, len_u32(args.len())?);
    for arg in args {
        put_str(&mut body, arg)?;
    }
    seal(body)
}

/// Decodes a request frame body (without the length field).
pub fn decode_request(body: &[u8]) -> Result<Request> {
    let mut reader = Reader::new(body);
    let opcode = reader.u8()?;
    let path = reader.str()?;
    let argc = reader.u32()? as usize;
    // Every argument needs at least its length field.
    if argc > reader.remaining() / 4 {
        return Err(protocol(format!("argument count {argc} exceeds frame size")));
    }
    let mut args = Vec::with_capacity(argc);
    for _ in 0..argc {
        args.push(reader.str()?);
    }
    reader.finish()?;

    let single = |mut args: Vec<String>| match args.len() {
        1 => Ok(args.remove(0)),
        n => Err(protocol(format!("opcode {opcode:#04x} takes 1 argument, got {n}"))),
    };
    let none = |args: Vec<String>| match args.len() {
        0 => Ok(()),
        n => Err(protocol(format!("opcode {opcode:#04x} takes no arguments, got {n}"))),
    };
    Ok(match opcode {
        OP_READ => {
            none(args)?;
            Request::Read { path }
        }
        OP_WRITE => Request::Write { path, value: single(args)? },
        OP_CREATE => Request::Create { path, value: single(args)? },
        OP_DELETE => {
            none(args)?;
            Request::Delete { path }
        }
        OP_DELETE_MEMBER => Request::DeleteMember { path, value: single(args)? },
        OP_INVOKE => Request::Invoke { path, args },
        other => return Err(protocol(format!("unknown opcode {other:#04x}"))),
    })
}

/// Encodes a complete response frame, length field included.
pub fn encode_response(reply: &Reply) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    match reply {
        Reply::Ok(payload) => {
            put_u8(&mut body, STATUS_OK);
            put_str(&mut body, payload)?;
        }
        Reply::Err(error) => {
            put_u8(&mut body, STATUS_ERROR);
            put_str(&mut body, &encode_remote_error(error))?;
        }
    }
    seal(body)
}

/// Decodes a response frame body (without the length field).
pub fn decode_response(body: &[u8]) -> Result<Reply> {
    let mut reader = Reader::new(body);
    let status = reader.u8()?;
    let payload = reader.str()?;
    reader.finish()?;
    match status {
        STATUS_OK => Ok(Reply::Ok(payload)),
        STATUS_ERROR => {
            let error = serde_json::from_str(&payload)
                .map_err(|source| TransportError::Decode { source })?;
            Ok(Reply::Err(error))
        }
        other => Err(protocol(format!("unknown status {other:#04x}"))),
    }
}

/// Reads one frame body from `reader`.
///
/// Returns `None` if the peer closed the stream cleanly before a new frame.
pub async fn read_frame<R>(reader: &mut R, max_frame_len: u32) -> Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut len = [0u8; 4];
    let mut filled = 0;
    while filled < len.len() {
        let n = reader.read(&mut len[filled..]).await?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(protocol("stream closed inside a length field"));
        }
        filled += n;
    }
    let len = u32::from_le_bytes(len);
    if len > max_frame_len {
        return Err(protocol(format!(
            "frame of {len} bytes exceeds the limit of {max_frame_len}"
        )));
    }
    let mut body = vec![0u8; len as usize];
    reader.read_exact(&mut body).await?;
    Ok(Some(body))
}

/// Writes a complete frame and flushes it.
pub async fn write_frame<W>(writer: &mut W, frame: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(frame).await?;
    writer.flush().await?;
    Ok(())
}

fn protocol(reason: impl Into<String>) -> crate::Error {
    TransportError::Protocol {
        reason: reason.into(),
    }
    .into()
}
