// src/movie/tags.rs

//! The closed set of tags this codec understands, and the registry that
//! dispatches on their type codes.

use crate::coder::bit_cursor::{BitReader, BitWriter};
use crate::coder::context::Context;
use crate::coder::framing::{DecodeTag, Tag, TagHeader, decode_framed};
use crate::coder::registry::TypeRegistry;
use crate::movie::do_abc::DoAbc;
use crate::movie::file_attributes::FileAttributes;
use crate::movie::frame::{SetBackgroundColor, ShowFrame};
use crate::movie::opaque::OpaqueTag;
use crate::movie::place::PlaceObject2;
use crate::movie::text::define_text::DefineText;
use crate::movie::video::define_video::DefineVideo;
use crate::movie::video::video_frame::VideoFrame;
use crate::utils::error::{CoderError, Result};
use log::debug;

/// Tag type codes.
pub mod codes {
    pub const END: u16 = 0;
    pub const SHOW_FRAME: u16 = 1;
    pub const SET_BACKGROUND_COLOR: u16 = 9;
    pub const DEFINE_TEXT: u16 = 11;
    pub const PLACE_OBJECT_2: u16 = 26;
    pub const DEFINE_TEXT_2: u16 = 33;
    pub const DEFINE_VIDEO: u16 = 60;
    pub const VIDEO_FRAME: u16 = 61;
    pub const FILE_ATTRIBUTES: u16 = 69;
    pub const DO_ABC: u16 = 82;
}

/// Character identifiers run from 1 to 65535.
pub(crate) fn check_identifier(identifier: u16) -> Result<u16> {
    if identifier == 0 {
        return Err(CoderError::invalid("identifier must be in 1..=65535"));
    }
    Ok(identifier)
}

/// Strings are written null-terminated and so cannot contain a NUL.
pub(crate) fn check_string(value: &str, what: &str) -> Result<()> {
    if value.contains('\0') {
        return Err(CoderError::invalid(format!("{} contains a NUL character", what)));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub enum MovieTag {
    ShowFrame(ShowFrame),
    SetBackgroundColor(SetBackgroundColor),
    DefineText(DefineText),
    PlaceObject2(PlaceObject2),
    DefineVideo(DefineVideo),
    VideoFrame(VideoFrame),
    FileAttributes(FileAttributes),
    DoAbc(DoAbc),
    Opaque(OpaqueTag),
}

macro_rules! delegate {
    ($value:expr, $tag:ident => $body:expr) => {
        match $value {
            MovieTag::ShowFrame($tag) => $body,
            MovieTag::SetBackgroundColor($tag) => $body,
            MovieTag::DefineText($tag) => $body,
            MovieTag::PlaceObject2($tag) => $body,
            MovieTag::DefineVideo($tag) => $body,
            MovieTag::VideoFrame($tag) => $body,
            MovieTag::FileAttributes($tag) => $body,
            MovieTag::DoAbc($tag) => $body,
            MovieTag::Opaque($tag) => $body,
        }
    };
}

impl Tag for MovieTag {
    fn code(&self) -> u16 {
        delegate!(self, tag => tag.code())
    }

    fn payload_bits(&self, ctx: &mut Context) -> Result<usize> {
        delegate!(self, tag => tag.payload_bits(ctx))
    }

    fn write_payload(&self, cursor: &mut BitWriter<'_>, ctx: &mut Context) -> Result<()> {
        delegate!(self, tag => tag.write_payload(cursor, ctx))
    }

    fn always_extended(&self) -> bool {
        delegate!(self, tag => tag.always_extended())
    }
}

macro_rules! impl_from {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for MovieTag {
                fn from(tag: $variant) -> Self {
                    MovieTag::$variant(tag)
                }
            }
        )*
    };
}

impl_from!(
    ShowFrame,
    SetBackgroundColor,
    DefineText,
    PlaceObject2,
    DefineVideo,
    VideoFrame,
    FileAttributes,
    DoAbc
);

impl From<OpaqueTag> for MovieTag {
    fn from(tag: OpaqueTag) -> Self {
        MovieTag::Opaque(tag)
    }
}

fn decode_as<T>(cursor: &mut BitReader<'_>, ctx: &mut Context, header: &TagHeader) -> Result<MovieTag>
where
    T: DecodeTag + Into<MovieTag>,
{
    T::decode_payload(cursor, ctx, header).map(Into::into)
}

impl TypeRegistry<MovieTag> {
    /// A registry holding every tag type in [`MovieTag`] except `Opaque`.
    pub fn standard() -> Self {
        let mut registry = TypeRegistry::new();
        registry.register(codes::SHOW_FRAME, decode_as::<ShowFrame>);
        registry.register(codes::SET_BACKGROUND_COLOR, decode_as::<SetBackgroundColor>);
        registry.register(codes::DEFINE_TEXT, decode_as::<DefineText>);
        registry.register(codes::DEFINE_TEXT_2, decode_as::<DefineText>);
        registry.register(codes::PLACE_OBJECT_2, decode_as::<PlaceObject2>);
        registry.register(codes::DEFINE_VIDEO, decode_as::<DefineVideo>);
        registry.register(codes::VIDEO_FRAME, decode_as::<VideoFrame>);
        registry.register(codes::FILE_ATTRIBUTES, decode_as::<FileAttributes>);
        registry.register(codes::DO_ABC, decode_as::<DoAbc>);
        registry
    }

    /// Keeps tags with `code` as raw bytes instead of rejecting them.
    pub fn register_opaque(&mut self, code: u16) {
        self.register(code, decode_as::<OpaqueTag>);
    }
}

/// Reads the next tag, or `None` at the end-of-tags marker.
///
/// An unregistered code fails with `UnsupportedTag` after only its header has
/// been read.
pub fn read_movie_tag(
    cursor: &mut BitReader<'_>,
    ctx: &mut Context,
    registry: &TypeRegistry<MovieTag>,
) -> Result<Option<MovieTag>> {
    let header = TagHeader::read(cursor)?;
    if header.code == codes::END {
        return Ok(None);
    }
    let decoder = registry.decoder(header.code)?;
    debug!("tag {}: {} bytes at bit {}", header.code, header.length, header.start);
    decode_framed(cursor, ctx, &header, decoder).map(Some)
}
