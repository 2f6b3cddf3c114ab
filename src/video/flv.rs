// src/video/flv.rs

//! FLV chunk streams.
//!
//! An FLV file is a nine-byte header followed by chunks, each trailed by the
//! total size of the chunk just read:
//!
//! ```text
//! "FLV" version:u8 flags:u8 header_size:u32   previous_size:u32 (0)
//! type:u8 size:u24 timestamp:u24 timestamp_ext:u8 stream:u24  data  previous_size:u32
//! ```
//!
//! All words are big-endian. Chunks are dispatched on the type byte through a
//! [`TypeRegistry`], so unknown chunk types fail instead of being skipped.

use crate::coder::bit_cursor::{BitCursor, BitReader, BitWriter};
use crate::coder::context::Context;
use crate::coder::record::{Record, RecordId, encode, write_checked};
use crate::coder::registry::TypeRegistry;
use crate::utils::error::{CoderError, Result};
use crate::video::screen_packet::ScreenPacket;
use byteorder::BigEndian;
use log::debug;
use std::sync::Arc;

const SIGNATURE: &[u8; 3] = b"FLV";
const VERSION: u8 = 1;
const FLAG_AUDIO: u8 = 0x04;
const FLAG_VIDEO: u8 = 0x01;
const HEADER_LEN: u32 = 9;
const CHUNK_HEADER_LEN: usize = 11;
const MAX_CHUNK_DATA: usize = 0x00FF_FFFF;

/// Chunk type codes.
pub mod kinds {
    pub const AUDIO: u8 = 8;
    pub const VIDEO: u8 = 9;
    pub const META: u8 = 18;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlvHeader {
    pub has_audio: bool,
    pub has_video: bool,
}

/// The fixed part of a chunk, read before dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlvChunkHeader {
    pub kind: u8,
    pub size: usize,
    pub timestamp: u32,
    /// Byte offset of the chunk in the stream.
    pub start: usize,
}

impl FlvChunkHeader {
    fn read(cursor: &mut BitReader<'_>) -> Result<Self> {
        let start = cursor.position() / 8;
        let kind = cursor.read_u8()?;
        let size = cursor.read_u24::<BigEndian>()? as usize;
        let low = cursor.read_u24::<BigEndian>()?;
        let high = cursor.read_u8()? as u32;
        let _stream = cursor.read_u24::<BigEndian>()?;
        Ok(FlvChunkHeader {
            kind,
            size,
            timestamp: high << 24 | low,
            start,
        })
    }
}

/// Payload and timing of one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlvChunk {
    /// Milliseconds from the start of the stream.
    pub timestamp: u32,
    data: Arc<[u8]>,
}

impl FlvChunk {
    pub fn new(timestamp: u32, data: impl Into<Arc<[u8]>>) -> Result<Self> {
        let data = data.into();
        if data.len() > MAX_CHUNK_DATA {
            return Err(CoderError::invalid(format!(
                "chunk of {} bytes exceeds the 24-bit size field",
                data.len()
            )));
        }
        Ok(FlvChunk { timestamp, data })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlvTag {
    Audio(FlvChunk),
    Video(FlvChunk),
    Meta(FlvChunk),
}

impl FlvTag {
    /// A video chunk carrying an encoded screen packet.
    pub fn screen_video(timestamp: u32, packet: &ScreenPacket) -> Result<Self> {
        let data = encode(packet, &mut Context::new())?;
        Ok(FlvTag::Video(FlvChunk::new(timestamp, data)?))
    }

    pub fn kind(&self) -> u8 {
        match self {
            FlvTag::Audio(_) => kinds::AUDIO,
            FlvTag::Video(_) => kinds::VIDEO,
            FlvTag::Meta(_) => kinds::META,
        }
    }

    pub fn chunk(&self) -> &FlvChunk {
        match self {
            FlvTag::Audio(chunk) | FlvTag::Video(chunk) | FlvTag::Meta(chunk) => chunk,
        }
    }
}

impl Record for FlvTag {
    fn record_id(&self) -> RecordId {
        RecordId::Value("flv chunk")
    }

    fn measure(&self, _ctx: &mut Context) -> Result<usize> {
        Ok((CHUNK_HEADER_LEN + self.chunk().data.len() + 4) * 8)
    }

    fn write(&self, cursor: &mut BitWriter<'_>, _ctx: &mut Context) -> Result<()> {
        let chunk = self.chunk();
        cursor.write_u8(self.kind())?;
        cursor.write_u24::<BigEndian>(chunk.data.len() as u32)?;
        cursor.write_u24::<BigEndian>(chunk.timestamp & 0x00FF_FFFF)?;
        cursor.write_u8((chunk.timestamp >> 24) as u8)?;
        cursor.write_u24::<BigEndian>(0)?;
        cursor.write_bytes(&chunk.data)?;
        cursor.write_u32::<BigEndian>((CHUNK_HEADER_LEN + chunk.data.len()) as u32)
    }
}

fn read_chunk(cursor: &mut BitReader<'_>, header: &FlvChunkHeader) -> Result<FlvChunk> {
    FlvChunk::new(header.timestamp, cursor.read_bytes(header.size)?)
}

fn decode_audio(cursor: &mut BitReader<'_>, _ctx: &mut Context, header: &FlvChunkHeader) -> Result<FlvTag> {
    read_chunk(cursor, header).map(FlvTag::Audio)
}

fn decode_video(cursor: &mut BitReader<'_>, _ctx: &mut Context, header: &FlvChunkHeader) -> Result<FlvTag> {
    read_chunk(cursor, header).map(FlvTag::Video)
}

fn decode_meta(cursor: &mut BitReader<'_>, _ctx: &mut Context, header: &FlvChunkHeader) -> Result<FlvTag> {
    read_chunk(cursor, header).map(FlvTag::Meta)
}

impl TypeRegistry<FlvTag, FlvChunkHeader> {
    /// Audio, video and metadata chunks.
    pub fn flv() -> Self {
        let mut registry = TypeRegistry::new();
        registry.register(kinds::AUDIO as u16, decode_audio);
        registry.register(kinds::VIDEO as u16, decode_video);
        registry.register(kinds::META as u16, decode_meta);
        registry
    }
}

/// Reads one chunk and its trailing size word.
pub fn read_flv_tag(
    cursor: &mut BitReader<'_>,
    ctx: &mut Context,
    registry: &TypeRegistry<FlvTag, FlvChunkHeader>,
) -> Result<FlvTag> {
    let header = FlvChunkHeader::read(cursor)?;
    let tag = registry.decode(header.kind as u16, cursor, ctx, &header)?;
    let declared = cursor.read_u32::<BigEndian>()? as usize;
    let actual = CHUNK_HEADER_LEN + header.size;
    if declared != actual {
        return Err(CoderError::FramingMismatch {
            record: RecordId::Value("flv chunk"),
            declared,
            delta_bits: (actual as i64 - declared as i64) * 8,
        });
    }
    debug!("flv chunk {}: {} bytes at {}", header.kind, header.size, header.start);
    Ok(tag)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlvStream {
    pub header: FlvHeader,
    pub tags: Vec<FlvTag>,
}

impl FlvStream {
    pub fn new(header: FlvHeader) -> Self {
        FlvStream {
            header,
            tags: Vec::new(),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut ctx = Context::new();
        let mut bits = (HEADER_LEN as usize + 4) * 8;
        for tag in &self.tags {
            bits += tag.measure(&mut ctx)?;
        }

        let mut buffer = vec![0u8; bits / 8];
        let mut cursor = BitCursor::new(&mut buffer[..]);
        cursor.write_bytes(SIGNATURE)?;
        cursor.write_u8(VERSION)?;
        let mut flags = 0;
        if self.header.has_audio {
            flags |= FLAG_AUDIO;
        }
        if self.header.has_video {
            flags |= FLAG_VIDEO;
        }
        cursor.write_u8(flags)?;
        cursor.write_u32::<BigEndian>(HEADER_LEN)?;
        cursor.write_u32::<BigEndian>(0)?;
        for tag in &self.tags {
            write_checked(tag, &mut cursor, &mut ctx)?;
        }
        Ok(buffer)
    }

    pub fn decode(data: &[u8]) -> Result<FlvStream> {
        FlvStream::decode_with(data, &TypeRegistry::<FlvTag, FlvChunkHeader>::flv())
    }

    pub fn decode_with(data: &[u8], registry: &TypeRegistry<FlvTag, FlvChunkHeader>) -> Result<FlvStream> {
        let mut cursor = BitCursor::new(data);
        let mut signature = [0u8; 3];
        cursor.read_into(&mut signature)?;
        if &signature != SIGNATURE {
            return Err(CoderError::UnsupportedVariant {
                record: "flv signature",
                value: signature[0] as u32,
            });
        }
        let version = cursor.read_u8()?;
        if version != VERSION {
            return Err(CoderError::UnsupportedVariant {
                record: "flv version",
                value: version as u32,
            });
        }
        let flags = cursor.read_u8()?;
        let header_len = cursor.read_u32::<BigEndian>()? as usize;
        if header_len < HEADER_LEN as usize {
            return Err(CoderError::invalid(format!("flv header of {} bytes", header_len)));
        }
        cursor.set_position(header_len * 8)?;
        cursor.read_u32::<BigEndian>()?;

        let mut ctx = Context::new();
        let mut tags = Vec::new();
        while !cursor.at_end() {
            tags.push(read_flv_tag(&mut cursor, &mut ctx, registry)?);
        }
        Ok(FlvStream {
            header: FlvHeader {
                has_audio: flags & FLAG_AUDIO != 0,
                has_video: flags & FLAG_VIDEO != 0,
            },
            tags,
        })
    }
}
