use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

const READ_CHUNK: usize = 8 * 1024;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Encode error: {0}")]
    Encode(String),
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("stream closed in the middle of a value")]
    UnexpectedEof,
}

/// Reads a stream of concatenated JSON values.
///
/// Values may be separated by any whitespace or by nothing at all, and a
/// value may arrive split across any number of reads. Bytes past the end of
/// a value stay buffered for the next call.
pub struct JsonStreamReader<R> {
    reader: R,
    buffer: Vec<u8>,
    closed: bool,
}

impl<R: AsyncRead + Unpin> JsonStreamReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: Vec::new(),
            closed: false,
        }
    }

    /// Next value, or `None` on a clean end of stream.
    ///
    /// A value that is syntactically complete but does not fit `T` is still
    /// consumed, so the stream stays aligned for the following call.
    pub async fn next<T: DeserializeOwned>(&mut self) -> Result<Option<T>, CodecError> {
        match self.next_value().await? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| CodecError::Decode(e.to_string())),
            None => Ok(None),
        }
    }

    async fn next_value(&mut self) -> Result<Option<Value>, CodecError> {
        loop {
            let skip = self
                .buffer
                .iter()
                .position(|b| !b.is_ascii_whitespace())
                .unwrap_or(self.buffer.len());
            self.buffer.drain(..skip);

            if !self.buffer.is_empty() {
                let parsed = {
                    let mut stream =
                        serde_json::Deserializer::from_slice(&self.buffer).into_iter::<Value>();
                    match stream.next() {
                        Some(Ok(value)) => Some(Ok((value, stream.byte_offset()))),
                        Some(Err(e)) if e.is_eof() => None,
                        Some(Err(e)) => Some(Err(e)),
                        None => None,
                    }
                };
                match parsed {
                    Some(Ok((value, consumed))) => {
                        self.buffer.drain(..consumed);
                        return Ok(Some(value));
                    }
                    Some(Err(e)) => {
                        // Resynchronize on the next line.
                        let discard = self
                            .buffer
                            .iter()
                            .position(|b| *b == b'\n')
                            .map_or(self.buffer.len(), |i| i + 1);
                        self.buffer.drain(..discard);
                        return Err(CodecError::Decode(e.to_string()));
                    }
                    None => {}
                }
            }

            if self.closed {
                return if self.buffer.is_empty() {
                    Ok(None)
                } else {
                    Err(CodecError::UnexpectedEof)
                };
            }

            let mut chunk = [0u8; READ_CHUNK];
            let n = self.reader.read(&mut chunk).await?;
            if n == 0 {
                self.closed = true;
            } else {
                self.buffer.extend_from_slice(&chunk[..n]);
            }
        }
    }
}

/// Write one value followed by a newline and flush it.
pub async fn write_value<W, T>(writer: &mut W, value: &T) -> Result<(), CodecError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut bytes = serde_json::to_vec(value).map_err(|e| CodecError::Encode(e.to_string()))?;
    bytes.push(b'\n');
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}
