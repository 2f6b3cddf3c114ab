// src/movie/video/video_frame.rs

use crate::coder::bit_cursor::{BitReader, BitWriter};
use crate::coder::context::Context;
use crate::coder::framing::{DecodeTag, Tag, TagHeader};
use crate::coder::record::encode;
use crate::movie::tags::{check_identifier, codes};
use crate::utils::error::Result;
use crate::video::screen_packet::ScreenPacket;
use byteorder::LittleEndian;
use std::sync::Arc;

/// One encoded frame of an embedded video stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    stream: u16,
    pub frame: u16,
    data: Arc<[u8]>,
}

impl VideoFrame {
    pub fn new(stream: u16, frame: u16, data: impl Into<Arc<[u8]>>) -> Result<Self> {
        Ok(VideoFrame {
            stream: check_identifier(stream)?,
            frame,
            data: data.into(),
        })
    }

    /// Wraps an encoded screen-video packet.
    pub fn from_packet(stream: u16, frame: u16, packet: &ScreenPacket) -> Result<Self> {
        let data = encode(packet, &mut Context::new())?;
        VideoFrame::new(stream, frame, data)
    }

    /// Identifier of the `DefineVideo` this frame belongs to.
    pub fn stream(&self) -> u16 {
        self.stream
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl Tag for VideoFrame {
    fn code(&self) -> u16 {
        codes::VIDEO_FRAME
    }

    fn payload_bits(&self, _ctx: &mut Context) -> Result<usize> {
        Ok((4 + self.data.len()) * 8)
    }

    fn write_payload(&self, cursor: &mut BitWriter<'_>, _ctx: &mut Context) -> Result<()> {
        cursor.write_u16::<LittleEndian>(self.stream)?;
        cursor.write_u16::<LittleEndian>(self.frame)?;
        cursor.write_bytes(&self.data)
    }
}

impl DecodeTag for VideoFrame {
    fn decode_payload(
        cursor: &mut BitReader<'_>,
        _ctx: &mut Context,
        header: &TagHeader,
    ) -> Result<Self> {
        let stream = cursor.read_u16::<LittleEndian>()?;
        let frame = cursor.read_u16::<LittleEndian>()?;
        let remaining = header.payload_end().saturating_sub(cursor.position()) / 8;
        let data = cursor.read_bytes(remaining)?;
        Ok(VideoFrame {
            stream,
            frame,
            data: data.into(),
        })
    }
}
