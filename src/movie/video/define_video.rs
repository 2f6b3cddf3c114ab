// src/movie/video/define_video.rs

use crate::coder::bit_cursor::{BitReader, BitWriter};
use crate::coder::context::Context;
use crate::coder::framing::{DecodeTag, Tag, TagHeader};
use crate::movie::tags::{check_identifier, codes};
use crate::utils::error::{CoderError, Result};
use byteorder::LittleEndian;

/// Deblocking filter applied by the player.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Deblocking {
    /// Use the setting carried in each video packet.
    #[default]
    Packet = 0,
    Off = 1,
    Level1 = 2,
    Level2 = 3,
    Level3 = 4,
    Level4 = 5,
}

impl TryFrom<u8> for Deblocking {
    type Error = CoderError;

    fn try_from(value: u8) -> Result<Self> {
        Ok(match value {
            0 => Deblocking::Packet,
            1 => Deblocking::Off,
            2 => Deblocking::Level1,
            3 => Deblocking::Level2,
            4 => Deblocking::Level3,
            5 => Deblocking::Level4,
            other => {
                return Err(CoderError::UnsupportedVariant {
                    record: "deblocking",
                    value: other as u32,
                });
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum VideoCodec {
    H263 = 2,
    Screen = 3,
    Vp6 = 4,
    Vp6Alpha = 5,
    Screen2 = 6,
}

impl TryFrom<u8> for VideoCodec {
    type Error = CoderError;

    fn try_from(value: u8) -> Result<Self> {
        Ok(match value {
            2 => VideoCodec::H263,
            3 => VideoCodec::Screen,
            4 => VideoCodec::Vp6,
            5 => VideoCodec::Vp6Alpha,
            6 => VideoCodec::Screen2,
            other => {
                return Err(CoderError::UnsupportedVariant {
                    record: "video codec",
                    value: other as u32,
                });
            }
        })
    }
}

/// Declares an embedded video stream fed by `VideoFrame` tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefineVideo {
    identifier: u16,
    pub frame_count: u16,
    pub width: u16,
    pub height: u16,
    pub deblocking: Deblocking,
    pub smoothing: bool,
    pub codec: VideoCodec,
}

impl DefineVideo {
    pub fn new(
        identifier: u16,
        frame_count: u16,
        width: u16,
        height: u16,
        codec: VideoCodec,
    ) -> Result<Self> {
        Ok(DefineVideo {
            identifier: check_identifier(identifier)?,
            frame_count,
            width,
            height,
            deblocking: Deblocking::default(),
            smoothing: false,
            codec,
        })
    }

    pub fn identifier(&self) -> u16 {
        self.identifier
    }
}

impl Tag for DefineVideo {
    fn code(&self) -> u16 {
        codes::DEFINE_VIDEO
    }

    fn payload_bits(&self, _ctx: &mut Context) -> Result<usize> {
        Ok(10 * 8)
    }

    fn write_payload(&self, cursor: &mut BitWriter<'_>, _ctx: &mut Context) -> Result<()> {
        cursor.write_u16::<LittleEndian>(self.identifier)?;
        cursor.write_u16::<LittleEndian>(self.frame_count)?;
        cursor.write_u16::<LittleEndian>(self.width)?;
        cursor.write_u16::<LittleEndian>(self.height)?;
        cursor.write_bits(0, 4)?;
        cursor.write_bits(self.deblocking as i64, 3)?;
        cursor.write_bool(self.smoothing)?;
        cursor.write_u8(self.codec as u8)
    }
}

impl DecodeTag for DefineVideo {
    fn decode_payload(
        cursor: &mut BitReader<'_>,
        _ctx: &mut Context,
        _header: &TagHeader,
    ) -> Result<Self> {
        let identifier = cursor.read_u16::<LittleEndian>()?;
        let frame_count = cursor.read_u16::<LittleEndian>()?;
        let width = cursor.read_u16::<LittleEndian>()?;
        let height = cursor.read_u16::<LittleEndian>()?;
        cursor.skip(4)?;
        let deblocking = Deblocking::try_from(cursor.read_ub(3)? as u8)?;
        let smoothing = cursor.read_bool()?;
        let codec = VideoCodec::try_from(cursor.read_u8()?)?;
        Ok(DefineVideo {
            identifier,
            frame_count,
            width,
            height,
            deblocking,
            smoothing,
            codec,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coder::bit_cursor::BitCursor;
    use crate::coder::framing::{encode_tag, read_tag};

    #[test]
    fn test_layout() {
        let mut video = DefineVideo::new(1, 12, 320, 240, VideoCodec::Screen).unwrap();
        video.deblocking = Deblocking::Off;
        video.smoothing = true;

        let mut ctx = Context::new();
        let bytes = encode_tag(&video, &mut ctx).unwrap();
        assert_eq!(
            bytes,
            vec![0x0A, 0x0F, 1, 0, 12, 0, 0x40, 0x01, 0xF0, 0x00, 0x03, 0x03]
        );

        let mut cursor = BitCursor::new(&bytes[..]);
        assert_eq!(read_tag::<DefineVideo>(&mut cursor, &mut ctx).unwrap(), video);
    }

    #[test]
    fn test_unknown_codec() {
        let bytes = [0x0A, 0x0F, 1, 0, 1, 0, 16, 0, 16, 0, 0, 9];
        let mut ctx = Context::new();
        let mut cursor = BitCursor::new(&bytes[..]);
        assert!(matches!(
            read_tag::<DefineVideo>(&mut cursor, &mut ctx),
            Err(CoderError::UnsupportedVariant { record: "video codec", value: 9 })
        ));
    }
}
