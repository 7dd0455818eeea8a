//! IVF container reader
//!
//! IVF is the minimal container libvpx tools write: a fixed file header
//! followed by length-prefixed frames. All integers are little endian.
//!
//! File header (32 bytes):
//! ```text
//! +-----------+---------+----------+--------+-------+--------+
//! | "DKIF"(4) | ver(2)  | hdrlen(2)| fourcc | w(2)  | h(2)   |
//! +-----------+---------+----------+--------+-------+--------+
//! | tb_den(4) | tb_num(4)| frames(4)| unused(4)             |
//! +-----------+----------+----------+-----------------------+
//! ```
//!
//! Frame header (12 bytes): `size(4) | timestamp(8)`, then `size` bytes.

use std::time::Duration;

use bytes::{Buf, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use super::source::FrameSource;
use crate::error::SourceError;
use crate::hub::Frame;

/// IVF file signature
pub const SIGNATURE: [u8; 4] = *b"DKIF";
/// Size of the IVF file header
pub const FILE_HEADER_SIZE: usize = 32;
/// Size of each frame header
pub const FRAME_HEADER_SIZE: usize = 12;
/// FourCC of VP9 streams
pub const FOURCC_VP9: [u8; 4] = *b"VP90";

/// Upper bound on a single frame, guards against corrupt size fields
const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Parsed IVF file header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IvfHeader {
    pub version: u16,
    pub fourcc: [u8; 4],
    pub width: u16,
    pub height: u16,
    pub timebase_denominator: u32,
    pub timebase_numerator: u32,
    /// Frame count as written by the encoder; 0 or bogus for live captures
    pub frame_count: u32,
}

impl IvfHeader {
    /// Parse the 32-byte file header
    pub fn parse(mut data: &[u8]) -> Result<Self, SourceError> {
        if data.len() < FILE_HEADER_SIZE {
            return Err(SourceError::Truncated {
                what: "file header",
                expected: FILE_HEADER_SIZE,
                got: data.len(),
            });
        }

        let mut signature = [0u8; 4];
        data.copy_to_slice(&mut signature);
        if signature != SIGNATURE {
            return Err(SourceError::BadSignature(signature));
        }

        let version = data.get_u16_le();
        let header_size = data.get_u16_le();
        if header_size as usize != FILE_HEADER_SIZE {
            return Err(SourceError::UnsupportedHeaderSize(header_size));
        }

        let mut fourcc = [0u8; 4];
        data.copy_to_slice(&mut fourcc);

        Ok(Self {
            version,
            fourcc,
            width: data.get_u16_le(),
            height: data.get_u16_le(),
            timebase_denominator: data.get_u32_le(),
            timebase_numerator: data.get_u32_le(),
            frame_count: data.get_u32_le(),
        })
    }

    /// FourCC as a string
    pub fn fourcc_str(&self) -> String {
        String::from_utf8_lossy(&self.fourcc).into_owned()
    }

    /// Whether the stream is VP9
    pub fn is_vp9(&self) -> bool {
        self.fourcc == FOURCC_VP9
    }

    /// Duration of one timebase tick, the nominal frame duration
    ///
    /// IVF stores the timebase as `denominator / numerator` ticks per second.
    pub fn frame_duration(&self) -> Option<Duration> {
        if self.timebase_denominator == 0 || self.timebase_numerator == 0 {
            return None;
        }
        let nanos =
            self.timebase_numerator as u128 * 1_000_000_000 / self.timebase_denominator as u128;
        Some(Duration::from_nanos(nanos as u64))
    }
}

/// Streaming reader yielding VP9 frames from an IVF container
pub struct IvfReader<R> {
    reader: R,
    header: IvfHeader,
    frames_read: u64,
}

impl<R: AsyncRead + Unpin + Send> IvfReader<R> {
    /// Read and validate the file header
    ///
    /// Fails with [`SourceError::UnsupportedCodec`] unless the stream is VP9.
    pub async fn new(mut reader: R) -> Result<Self, SourceError> {
        let mut buf = [0u8; FILE_HEADER_SIZE];
        let n = read_full(&mut reader, &mut buf).await?;
        let header = IvfHeader::parse(&buf[..n])?;

        if !header.is_vp9() {
            return Err(SourceError::UnsupportedCodec(header.fourcc_str()));
        }

        tracing::info!(
            fourcc = %header.fourcc_str(),
            width = header.width,
            height = header.height,
            timebase = %format_args!("{}/{}", header.timebase_numerator, header.timebase_denominator),
            "IVF stream opened"
        );

        Ok(Self {
            reader,
            header,
            frames_read: 0,
        })
    }

    /// The parsed file header
    pub fn header(&self) -> &IvfHeader {
        &self.header
    }

    /// Frames read so far
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Read the next frame
    ///
    /// Returns `Ok(None)` on end of input at a frame boundary.
    pub async fn read_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        let mut header = [0u8; FRAME_HEADER_SIZE];
        let n = read_full(&mut self.reader, &mut header).await?;
        if n == 0 {
            return Ok(None);
        }
        if n < FRAME_HEADER_SIZE {
            return Err(SourceError::Truncated {
                what: "frame header",
                expected: FRAME_HEADER_SIZE,
                got: n,
            });
        }

        let mut fields = &header[..];
        let size = fields.get_u32_le() as usize;
        let timestamp = fields.get_u64_le();

        if size > MAX_FRAME_SIZE {
            return Err(SourceError::FrameTooLarge {
                size,
                limit: MAX_FRAME_SIZE,
            });
        }

        let mut data = BytesMut::zeroed(size);
        let got = read_full(&mut self.reader, &mut data).await?;
        if got < size {
            return Err(SourceError::Truncated {
                what: "frame payload",
                expected: size,
                got,
            });
        }

        self.frames_read += 1;
        Ok(Some(Frame::new(timestamp, Bytes::from(data))))
    }
}

impl<R: AsyncRead + Unpin + Send> FrameSource for IvfReader<R> {
    async fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        self.read_frame().await
    }
}

/// Fill `buf` unless the input ends first; returns the number of bytes read
async fn read_full<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
