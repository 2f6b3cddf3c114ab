// src/coder/registry.rs

//! Type-code dispatch.
//!
//! A [`TypeRegistry`] maps the numeric code found in a record header to the
//! function that decodes the matching variant of a closed enum. Lookups for
//! unregistered codes fail with `UnsupportedTag` before any payload byte is
//! consumed.

use crate::coder::bit_cursor::BitReader;
use crate::coder::context::Context;
use crate::coder::framing::TagHeader;
use crate::utils::error::{CoderError, Result};
use std::collections::HashMap;
use std::fmt;

/// Decoder for one variant, given the header that framed it.
pub type DecodeFn<T, H> = fn(&mut BitReader<'_>, &mut Context, &H) -> Result<T>;

/// Code → decoder table for the variants of `T`.
pub struct TypeRegistry<T, H = TagHeader> {
    decoders: HashMap<u16, DecodeFn<T, H>>,
}

impl<T, H> TypeRegistry<T, H> {
    pub fn new() -> Self {
        TypeRegistry {
            decoders: HashMap::new(),
        }
    }

    /// Registers `decoder` for `code`, returning any decoder it replaces.
    pub fn register(&mut self, code: u16, decoder: DecodeFn<T, H>) -> Option<DecodeFn<T, H>> {
        self.decoders.insert(code, decoder)
    }

    /// Removes the decoder for `code`.
    pub fn unregister(&mut self, code: u16) -> bool {
        self.decoders.remove(&code).is_some()
    }

    #[inline]
    pub fn contains(&self, code: u16) -> bool {
        self.decoders.contains_key(&code)
    }

    /// Registered codes in ascending order.
    pub fn codes(&self) -> Vec<u16> {
        let mut codes: Vec<u16> = self.decoders.keys().copied().collect();
        codes.sort_unstable();
        codes
    }

    /// The decoder for `code`, or `UnsupportedTag`.
    pub fn decoder(&self, code: u16) -> Result<DecodeFn<T, H>> {
        self.decoders
            .get(&code)
            .copied()
            .ok_or(CoderError::UnsupportedTag { code })
    }

    /// Decodes the payload that follows `header` as the variant for `code`.
    pub fn decode(
        &self,
        code: u16,
        cursor: &mut BitReader<'_>,
        ctx: &mut Context,
        header: &H,
    ) -> Result<T> {
        let decoder = self.decoder(code)?;
        decoder(cursor, ctx, header)
    }
}

impl<T, H> Default for TypeRegistry<T, H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, H> fmt::Debug for TypeRegistry<T, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("codes", &self.codes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coder::bit_cursor::BitCursor;

    #[derive(Debug, PartialEq)]
    enum Shape {
        Dot(u8),
        Line(u8, u8),
    }

    fn dot(cursor: &mut BitReader<'_>, _ctx: &mut Context, _h: &()) -> Result<Shape> {
        Ok(Shape::Dot(cursor.read_u8()?))
    }

    fn line(cursor: &mut BitReader<'_>, _ctx: &mut Context, _h: &()) -> Result<Shape> {
        Ok(Shape::Line(cursor.read_u8()?, cursor.read_u8()?))
    }

    fn registry() -> TypeRegistry<Shape, ()> {
        let mut registry = TypeRegistry::new();
        registry.register(1, dot);
        registry.register(2, line);
        registry
    }

    #[test]
    fn test_dispatch_by_code() {
        let registry = registry();
        let data = [7, 8, 9];
        let mut cursor = BitCursor::new(&data[..]);
        let mut ctx = Context::new();
        assert_eq!(registry.decode(2, &mut cursor, &mut ctx, &()).unwrap(), Shape::Line(7, 8));
        assert_eq!(registry.decode(1, &mut cursor, &mut ctx, &()).unwrap(), Shape::Dot(9));
        assert_eq!(registry.codes(), vec![1, 2]);
    }

    #[test]
    fn test_unknown_code_reads_nothing() {
        let registry = registry();
        let data = [7];
        let mut cursor = BitCursor::new(&data[..]);
        let mut ctx = Context::new();
        assert!(matches!(
            registry.decode(3, &mut cursor, &mut ctx, &()),
            Err(CoderError::UnsupportedTag { code: 3 })
        ));
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_unregister() {
        let mut registry = registry();
        assert!(registry.unregister(1));
        assert!(!registry.contains(1));
        assert!(!registry.unregister(1));
    }
}
