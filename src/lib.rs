//! # SWF Codec Library
//!
//! Reads and writes movie files built from typed, length-framed tags whose
//! fields are packed at bit granularity, plus the screen-video block codec
//! carried inside them.
//!
//! This library is organized into several modules:
//! - `utils`: Error handling
//! - `coder`: Bit cursor, coding context, field widths, tag framing and type dispatch
//! - `datatype`: Value records shared by many tags (bounds, transforms, colours)
//! - `movie`: The movie container and the tags it understands
//! - `video`: Screen-video block delta coding and FLV chunk streams

// Re-export commonly used types at the crate root
pub use utils::error::{CoderError, Result};

pub mod utils {
    pub mod error;
}

pub mod coder {
    pub mod bit_cursor;
    pub mod context;
    pub mod fields;
    pub mod framing;
    pub mod record;
    pub mod registry;
}

pub mod datatype {
    pub mod bounds;
    pub mod color;
    pub mod color_transform;
    pub mod coord_transform;
}

pub mod movie {
    pub mod container;
    pub mod do_abc;
    pub mod file_attributes;
    pub mod frame;
    pub mod opaque;
    pub mod place;
    pub mod tags;

    pub mod text {
        pub mod define_text;
        pub mod text_span;
    }

    pub mod video {
        pub mod define_video;
        pub mod video_frame;
    }

    pub use container::{Movie, MovieHeader, MovieOptions};
    pub use tags::MovieTag;
}

pub mod video {
    pub mod compressor;
    pub mod delta;
    pub mod flv;
    pub mod grid;
    pub mod screen_packet;

    pub use compressor::{BlockCompressor, ZlibBlockCompressor};
    pub use delta::{BlockDeltaEncoder, ScreenFrameDecoder, encode_delta};
    pub use grid::{BlockGrid, ImageBlock, tile_raster};
    pub use screen_packet::{BlockData, ScreenPacket};
}

// Public API exports
pub use coder::bit_cursor::{BitCursor, BitReader, BitWriter};
pub use coder::context::{CoderOptions, Context};
pub use coder::framing::{DecodeTag, Tag, TagHeader};
pub use coder::record::{Decode, Record, RecordId};
pub use coder::registry::TypeRegistry;
pub use movie::{Movie, MovieOptions, MovieTag};

/// Movie format version written when none is given.
pub const DEFAULT_VERSION: u8 = 10;
