use crate::coder::record::RecordId;
use std::io;
use thiserror::Error;

/// Main error type for the movie codec.
///
/// Every variant is fatal to the decode or encode call that raised it.
#[derive(Error, Debug)]
pub enum CoderError {
    /// A read, write or reposition would cross the buffer boundary.
    #[error("out of bounds: {requested} bits at bit offset {position} exceeds limit of {limit} bits")]
    OutOfBounds {
        position: usize,
        requested: i64,
        limit: usize,
    },
    /// Bits consumed or written disagree with the declared length.
    #[error("framing mismatch in {record}: declared {declared} bytes, cursor off by {delta_bits} bits")]
    FramingMismatch {
        record: RecordId,
        declared: usize,
        delta_bits: i64,
    },
    /// No decoder is registered for the type code.
    #[error("unsupported tag type code {code}")]
    UnsupportedTag { code: u16 },
    /// A discriminator inside a known record has a value the codec does not handle.
    #[error("unsupported {record} variant {value:#x}")]
    UnsupportedVariant { record: &'static str, value: u32 },
    /// A value outside its documented domain.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// Records nested deeper than the configured limit.
    #[error("record nesting exceeds limit of {limit}")]
    NestingTooDeep { limit: usize },
    /// The zlib layer failed.
    #[error("compression error: {0}")]
    Compression(#[from] io::Error),
}

impl CoderError {
    /// Shorthand for building an `InvalidArgument` from anything printable.
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        CoderError::InvalidArgument(msg.into())
    }
}

/// A specialized `Result` type for codec operations.
pub type Result<T> = std::result::Result<T, CoderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            CoderError::OutOfBounds {
                position: 16,
                requested: 8,
                limit: 20
            }
            .to_string(),
            "out of bounds: 8 bits at bit offset 16 exceeds limit of 20 bits"
        );

        assert_eq!(
            CoderError::FramingMismatch {
                record: RecordId::Tag(69),
                declared: 4,
                delta_bits: -8
            }
            .to_string(),
            "framing mismatch in tag 69: declared 4 bytes, cursor off by -8 bits"
        );

        assert_eq!(
            CoderError::UnsupportedTag { code: 1000 }.to_string(),
            "unsupported tag type code 1000"
        );

        assert_eq!(
            CoderError::UnsupportedVariant {
                record: "text record",
                value: 0x40
            }
            .to_string(),
            "unsupported text record variant 0x40"
        );

        assert_eq!(
            CoderError::invalid("test").to_string(),
            "Invalid argument: test"
        );

        assert_eq!(
            CoderError::NestingTooDeep { limit: 2 }.to_string(),
            "record nesting exceeds limit of 2"
        );
    }

    #[test]
    fn test_io_source() {
        let err: CoderError = io::Error::new(io::ErrorKind::InvalidData, "bad zlib").into();
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(err.to_string(), "compression error: bad zlib");
    }
}
