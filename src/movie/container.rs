// src/movie/container.rs

//! The movie file: an eight-byte preamble, the frame header, and the tag list.
//!
//! The preamble is a three-byte signature (`FWS` plain, `CWS` when the rest of
//! the file is zlib-compressed), the format version and the uncompressed file
//! length. Encoding measures every tag first so the output buffer is allocated
//! once at its exact size.

use crate::coder::bit_cursor::{BitCursor, BitWriter};
use crate::coder::context::{CoderOptions, Context};
use crate::coder::fields::{FIXED_8_8, bytes_for_bits};
use crate::coder::framing::{Tag, measure_tag, write_tag};
use crate::coder::record::{Decode, Record, RecordId, write_checked};
use crate::coder::registry::TypeRegistry;
use crate::datatype::bounds::Bounds;
use crate::movie::frame::ShowFrame;
use crate::movie::tags::{MovieTag, codes, read_movie_tag};
use crate::utils::error::{CoderError, Result};
use byteorder::LittleEndian;
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use log::{debug, info, warn};
use std::borrow::Cow;
use std::io::{Read, Write};

const PLAIN_SIGNATURE: &[u8; 3] = b"FWS";
const COMPRESSED_SIGNATURE: &[u8; 3] = b"CWS";
const PREAMBLE_LEN: usize = 8;

/// Settings for a new movie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovieOptions {
    /// Write the body zlib-compressed (`CWS`).
    pub compressed: bool,
    pub version: u8,
}

impl Default for MovieOptions {
    fn default() -> Self {
        MovieOptions {
            compressed: false,
            version: CoderOptions::default().version,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MovieHeader {
    pub version: u8,
    pub compressed: bool,
    /// Stage size in twips.
    pub frame_size: Bounds,
    /// Frames per second, stored as 8.8 fixed point.
    pub frame_rate: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Movie {
    pub header: MovieHeader,
    pub tags: Vec<MovieTag>,
}

impl Movie {
    pub fn new(options: MovieOptions) -> Self {
        Movie {
            header: MovieHeader {
                version: options.version,
                compressed: options.compressed,
                frame_size: Bounds::default(),
                frame_rate: 12.0,
            },
            tags: Vec::new(),
        }
    }

    pub fn add(&mut self, tag: impl Into<MovieTag>) {
        self.tags.push(tag.into());
    }

    /// Appends a `ShowFrame`, closing the current frame.
    pub fn show_frame(&mut self) {
        self.add(ShowFrame);
    }

    /// Number of `ShowFrame` tags, which is the frame count written to the header.
    pub fn frame_count(&self) -> usize {
        self.tags
            .iter()
            .filter(|tag| matches!(tag, MovieTag::ShowFrame(_)))
            .count()
    }

    fn encoded_frame_rate(&self) -> Result<u16> {
        let fixed = (self.header.frame_rate as f64 * (1u32 << FIXED_8_8) as f64).round();
        if !(0.0..=u16::MAX as f64).contains(&fixed) {
            return Err(CoderError::invalid(format!(
                "frame rate {} is outside 0..256",
                self.header.frame_rate
            )));
        }
        Ok(fixed as u16)
    }

    /// Encodes the movie into a complete file image.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut ctx = Context::with_options(CoderOptions {
            version: self.header.version,
            ..Default::default()
        });

        let frame_rate = self.encoded_frame_rate()?;
        let frame_count = u16::try_from(self.frame_count())
            .map_err(|_| CoderError::invalid("more than 65535 frames"))?;

        let mut body_bits = self.header.frame_size.measure(&mut ctx)? + 32;
        for tag in &self.tags {
            body_bits += measure_tag(tag, &mut ctx)?;
        }
        body_bits += measure_tag(&EndOfTags, &mut ctx)?;

        let total_len = PREAMBLE_LEN + bytes_for_bits(body_bits);
        let file_length = u32::try_from(total_len)
            .map_err(|_| CoderError::invalid(format!("movie of {} bytes is too large", total_len)))?;

        let mut buffer = vec![0u8; total_len];
        let mut cursor = BitCursor::new(&mut buffer[..]);
        cursor.write_bytes(if self.header.compressed {
            COMPRESSED_SIGNATURE
        } else {
            PLAIN_SIGNATURE
        })?;
        cursor.write_u8(self.header.version)?;
        cursor.write_u32::<LittleEndian>(file_length)?;

        write_checked(&self.header.frame_size, &mut cursor, &mut ctx)?;
        cursor.write_u16::<LittleEndian>(frame_rate)?;
        cursor.write_u16::<LittleEndian>(frame_count)?;
        for tag in &self.tags {
            write_tag(tag, &mut cursor, &mut ctx)?;
        }
        write_tag(&EndOfTags, &mut cursor, &mut ctx)?;

        if !cursor.at_end() {
            return Err(CoderError::FramingMismatch {
                record: RecordId::Value("movie"),
                declared: total_len,
                delta_bits: cursor.position() as i64 - cursor.len_bits() as i64,
            });
        }

        info!(
            "encoded movie: {} tags, {} frames, {} bytes",
            self.tags.len(),
            frame_count,
            total_len
        );

        if !self.header.compressed {
            return Ok(buffer);
        }
        let mut encoder = ZlibEncoder::new(buffer[..PREAMBLE_LEN].to_vec(), Compression::default());
        encoder.write_all(&buffer[PREAMBLE_LEN..])?;
        Ok(encoder.finish()?)
    }

    /// Decodes a movie using the standard tag registry.
    pub fn decode(data: &[u8]) -> Result<Movie> {
        Movie::decode_with(data, &TypeRegistry::<MovieTag>::standard(), CoderOptions::default())
    }

    /// Decodes a movie, dispatching tags through `registry`.
    ///
    /// The version in `options` is replaced by the one in the file.
    pub fn decode_with(
        data: &[u8],
        registry: &TypeRegistry<MovieTag>,
        options: CoderOptions,
    ) -> Result<Movie> {
        if data.len() < PREAMBLE_LEN {
            return Err(CoderError::OutOfBounds {
                position: 0,
                requested: (PREAMBLE_LEN * 8) as i64,
                limit: data.len() * 8,
            });
        }
        let compressed = match &data[..3] {
            s if s == PLAIN_SIGNATURE => false,
            s if s == COMPRESSED_SIGNATURE => true,
            _ => {
                return Err(CoderError::UnsupportedVariant {
                    record: "movie signature",
                    value: data[0] as u32,
                });
            }
        };

        let mut preamble = BitCursor::new(&data[3..PREAMBLE_LEN]);
        let version = preamble.read_u8()?;
        let file_length = preamble.read_u32::<LittleEndian>()? as usize;

        let body: Cow<'_, [u8]> = if compressed {
            // One byte past the declared length is enough to detect an overrun.
            let limit = file_length.saturating_sub(PREAMBLE_LEN) as u64 + 1;
            let mut inflated = Vec::new();
            ZlibDecoder::new(&data[PREAMBLE_LEN..])
                .take(limit)
                .read_to_end(&mut inflated)?;
            Cow::Owned(inflated)
        } else {
            Cow::Borrowed(&data[PREAMBLE_LEN..])
        };

        let actual_length = PREAMBLE_LEN + body.len();
        if actual_length != file_length {
            return Err(CoderError::FramingMismatch {
                record: RecordId::Value("movie"),
                declared: file_length,
                delta_bits: (actual_length as i64 - file_length as i64) * 8,
            });
        }

        let mut ctx = Context::with_options(CoderOptions { version, ..options });
        let mut cursor = BitCursor::new(&body[..]);
        let frame_size = Bounds::decode(&mut cursor, &mut ctx)?;
        let frame_rate = cursor.read_u16::<LittleEndian>()? as f32 / (1u32 << FIXED_8_8) as f32;
        let declared_frames = cursor.read_u16::<LittleEndian>()?;

        let mut tags = Vec::new();
        while let Some(tag) = read_movie_tag(&mut cursor, &mut ctx, registry)? {
            tags.push(tag);
        }
        if !cursor.at_end() {
            debug!("{} bytes after the end tag ignored", cursor.remaining_bits() / 8);
        }

        let movie = Movie {
            header: MovieHeader {
                version,
                compressed,
                frame_size,
                frame_rate,
            },
            tags,
        };
        if movie.frame_count() != declared_frames as usize {
            warn!(
                "header declares {} frames but the movie shows {}",
                declared_frames,
                movie.frame_count()
            );
        }
        info!(
            "decoded movie: version {}, {} tags, {} frames",
            version,
            movie.tags.len(),
            movie.frame_count()
        );
        Ok(movie)
    }
}

/// The zero-length marker closing the tag list.
struct EndOfTags;

impl Tag for EndOfTags {
    fn code(&self) -> u16 {
        codes::END
    }

    fn payload_bits(&self, _ctx: &mut Context) -> Result<usize> {
        Ok(0)
    }

    fn write_payload(&self, _cursor: &mut BitWriter<'_>, _ctx: &mut Context) -> Result<()> {
        Ok(())
    }
}
