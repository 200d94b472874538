//! Кодек многочастных сообщений.
//!
//! Формат: `u32 BE` число частей, затем каждая часть как `u32 BE` длина и
//! байты. Сообщение данных состоит из двух частей (фрейм темы и полезная
//! нагрузка), запрос и ответ управляющего канала состоит из заголовка и тела.

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::FrameError;

/// Максимальное число частей в одном сообщении.
pub const MAX_PARTS: u32 = 16;
/// Максимальный размер одной части.
pub const MAX_FRAME_LEN: u32 = 64 * 1024 * 1024;
/// Начальная ёмкость буфера части до прихода её байтов.
const INITIAL_PART_CAPACITY: u32 = 64 * 1024;

/// Кодирует сообщение в один буфер.
pub fn encode_message(parts: &[Bytes]) -> Bytes {
    let body: usize = parts.iter().map(|p| 4 + p.len()).sum();
    let mut buf = BytesMut::with_capacity(4 + body);
    buf.put_u32(parts.len() as u32);
    for part in parts {
        buf.put_u32(part.len() as u32);
        buf.extend_from_slice(part);
    }
    buf.freeze()
}

/// Записывает сообщение целиком и сбрасывает буфер писателя.
pub async fn write_message<W>(
    writer: &mut W,
    parts: &[Bytes],
) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    if parts.len() > MAX_PARTS as usize {
        return Err(FrameError::TooManyParts {
            count: parts.len() as u32,
            max: MAX_PARTS,
        });
    }
    if let Some(part) = parts.iter().find(|p| p.len() > MAX_FRAME_LEN as usize) {
        return Err(FrameError::PartTooLarge {
            len: part.len().min(u32::MAX as usize) as u32,
            max: MAX_FRAME_LEN,
        });
    }

    writer.write_all(&encode_message(parts)).await?;
    writer.flush().await?;
    Ok(())
}

/// Читает следующее сообщение.
///
/// `Ok(None)`: соединение закрыто на границе сообщений.
pub async fn read_message<R>(reader: &mut R) -> Result<Option<Vec<Bytes>>, FrameError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let count = match reader.read_u32().await {
        Ok(n) => n,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if count > MAX_PARTS {
        return Err(FrameError::TooManyParts {
            count,
            max: MAX_PARTS,
        });
    }

    let mut parts = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let len = reader.read_u32().await.map_err(truncated)?;
        if len > MAX_FRAME_LEN {
            return Err(FrameError::PartTooLarge {
                len,
                max: MAX_FRAME_LEN,
            });
        }
        // Буфер растёт по мере прихода данных, а не по заявленной длине.
        let mut buf = Vec::with_capacity(len.min(INITIAL_PART_CAPACITY) as usize);
        let read = (&mut *reader)
            .take(u64::from(len))
            .read_to_end(&mut buf)
            .await
            .map_err(truncated)?;
        if read < len as usize {
            return Err(FrameError::Truncated);
        }
        parts.push(Bytes::from(buf));
    }
    Ok(Some(parts))
}

fn truncated(err: std::io::Error) -> FrameError {
    if err.kind() == std::io::ErrorKind::UnexpectedEof {
        FrameError::Truncated
    } else {
        FrameError::Io(err)
    }
}
