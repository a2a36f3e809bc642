//! Field encodings shared by every link
//!
//! ```text
//! string   [LEN:u16 BE][UTF-8 bytes]
//! size     [i64 BE]        (-1 = not found)
//! count    [i32 BE]
//! bool     [u8]            (nonzero = true)
//! payload  [size bytes]    (length from a preceding size field)
//! ```

use crate::common::{Error, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Staging buffer size for payload copies
pub const CHUNK_SIZE: usize = 1024 * 1024;

/// Size sentinel meaning "requested file or shard not found"
pub const NOT_FOUND: i64 = -1;

pub async fn write_string<W: AsyncWrite + Unpin>(w: &mut W, s: &str) -> Result<()> {
    let len = u16::try_from(s.len()).map_err(|_| Error::StringTooLong(s.len()))?;
    w.write_u16(len).await?;
    w.write_all(s.as_bytes()).await?;
    Ok(())
}

pub async fn read_string<R: AsyncRead + Unpin>(r: &mut R) -> Result<String> {
    let len = r.read_u16().await? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf).await?;
    Ok(String::from_utf8(buf)?)
}

pub async fn write_size<W: AsyncWrite + Unpin>(w: &mut W, size: i64) -> Result<()> {
    w.write_i64(size).await?;
    Ok(())
}

pub async fn read_size<R: AsyncRead + Unpin>(r: &mut R) -> Result<i64> {
    Ok(r.read_i64().await?)
}

pub async fn write_count<W: AsyncWrite + Unpin>(w: &mut W, count: usize) -> Result<()> {
    let count = i32::try_from(count).map_err(|_| Error::InvalidCount(count as i64))?;
    w.write_i32(count).await?;
    Ok(())
}

pub async fn read_count<R: AsyncRead + Unpin>(r: &mut R) -> Result<usize> {
    let count = r.read_i32().await?;
    usize::try_from(count).map_err(|_| Error::InvalidCount(count as i64))
}

pub async fn write_bool<W: AsyncWrite + Unpin>(w: &mut W, value: bool) -> Result<()> {
    w.write_u8(value as u8).await?;
    Ok(())
}

pub async fn read_bool<R: AsyncRead + Unpin>(r: &mut R) -> Result<bool> {
    Ok(r.read_u8().await? != 0)
}

/// Write a list response: count then each name.
pub async fn write_names<W, I, S>(w: &mut W, names: I) -> Result<()>
where
    W: AsyncWrite + Unpin,
    I: IntoIterator<Item = S>,
    I::IntoIter: ExactSizeIterator,
    S: AsRef<str>,
{
    let names = names.into_iter();
    write_count(w, names.len()).await?;
    for name in names {
        write_string(w, name.as_ref()).await?;
    }
    Ok(())
}

pub async fn read_names<R: AsyncRead + Unpin>(r: &mut R) -> Result<Vec<String>> {
    let count = read_count(r).await?;
    // The count is peer-controlled, cap the preallocation
    let mut names = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        names.push(read_string(r).await?);
    }
    Ok(names)
}

/// Copy exactly `len` bytes from `r` to `w` through a bounded buffer.
///
/// Fails with `UnexpectedEof` if `r` ends early.
pub async fn copy_exact<R, W>(r: &mut R, w: &mut W, len: u64) -> Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; CHUNK_SIZE.min(len as usize)];
    let mut remaining = len;
    while remaining > 0 {
        let want = buf.len().min(remaining as usize);
        let read = r.read(&mut buf[..want]).await?;
        if read == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("payload ended {} bytes early", remaining),
            )
            .into());
        }
        w.write_all(&buf[..read]).await?;
        remaining -= read as u64;
    }
    Ok(len)
}

/// Validate a size read off the wire as a payload length.
pub fn payload_len(size: i64) -> Result<u64> {
    u64::try_from(size).map_err(|_| Error::InvalidSize(size))
}
