// src/coder/context.rs

//! Ambient parameters threaded through every decode and encode call.
//!
//! A record that changes a parameter for its children does so through a
//! [`ContextScope`]. The scope snapshots the parameters when it is opened and
//! puts them back when it is dropped, so a child's choices never leak to the
//! siblings that follow it, whichever way the child exits.

use crate::utils::error::{CoderError, Result};
use std::ops::{Deref, DerefMut};

/// Session-wide settings for a [`Context`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoderOptions {
    /// Deepest record nesting accepted before `NestingTooDeep` is raised.
    pub max_depth: usize,
    /// Container format version of the movie being processed.
    pub version: u8,
}

impl Default for CoderOptions {
    fn default() -> Self {
        Self {
            max_depth: 32,
            version: crate::DEFAULT_VERSION,
        }
    }
}

/// The parameters a scope saves and restores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Ambient {
    glyph_width: u32,
    advance_width: u32,
    transparent: bool,
}

/// Scoped bag of ambient parameters for one decode or encode session.
#[derive(Debug, Clone, Default)]
pub struct Context {
    ambient: Ambient,
    depth: usize,
    options: CoderOptions,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: CoderOptions) -> Self {
        Context {
            options,
            ..Default::default()
        }
    }

    #[inline]
    pub fn options(&self) -> &CoderOptions {
        &self.options
    }

    #[inline]
    pub fn version(&self) -> u8 {
        self.options.version
    }

    /// Bit width of glyph indices in the text records being processed.
    #[inline]
    pub fn glyph_width(&self) -> u32 {
        self.ambient.glyph_width
    }

    /// Bit width of glyph advances in the text records being processed.
    #[inline]
    pub fn advance_width(&self) -> u32 {
        self.ambient.advance_width
    }

    #[inline]
    pub fn set_glyph_width(&mut self, bits: u32) {
        self.ambient.glyph_width = bits;
    }

    #[inline]
    pub fn set_advance_width(&mut self, bits: u32) {
        self.ambient.advance_width = bits;
    }

    #[inline]
    pub fn clear_text_widths(&mut self) {
        self.ambient.glyph_width = 0;
        self.ambient.advance_width = 0;
    }

    /// Whether colours in the surrounding record carry an alpha channel.
    #[inline]
    pub fn is_transparent(&self) -> bool {
        self.ambient.transparent
    }

    #[inline]
    pub fn set_transparent(&mut self, transparent: bool) {
        self.ambient.transparent = transparent;
    }

    /// Number of scopes currently open.
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Opens a nested scope.
    ///
    /// Fails with `NestingTooDeep` once `max_depth` scopes are already open.
    pub fn enter(&mut self) -> Result<ContextScope<'_>> {
        if self.depth >= self.options.max_depth {
            return Err(CoderError::NestingTooDeep {
                limit: self.options.max_depth,
            });
        }
        self.depth += 1;
        let saved = self.ambient;
        Ok(ContextScope { ctx: self, saved })
    }
}

/// A nested view of a [`Context`].
///
/// Dereferences to the context itself. Dropping the scope (or calling
/// [`ContextScope::leave`]) restores the parameters that were in effect when
/// it was opened and decrements the depth.
pub struct ContextScope<'a> {
    ctx: &'a mut Context,
    saved: Ambient,
}

impl ContextScope<'_> {
    /// Closes the scope explicitly.
    pub fn leave(self) {}
}

impl Deref for ContextScope<'_> {
    type Target = Context;
    fn deref(&self) -> &Self::Target {
        self.ctx
    }
}

impl DerefMut for ContextScope<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.ctx
    }
}

impl Drop for ContextScope<'_> {
    fn drop(&mut self) {
        self.ctx.ambient = self.saved;
        self.ctx.depth -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_restores_parameters() {
        let mut ctx = Context::new();
        ctx.set_glyph_width(3);
        {
            let mut scope = ctx.enter().unwrap();
            scope.set_glyph_width(9);
            scope.set_advance_width(7);
            scope.set_transparent(true);
            assert_eq!(scope.depth(), 1);
            assert_eq!(scope.glyph_width(), 9);
        }
        assert_eq!(ctx.glyph_width(), 3);
        assert_eq!(ctx.advance_width(), 0);
        assert!(!ctx.is_transparent());
        assert_eq!(ctx.depth(), 0);
    }

    #[test]
    fn test_scope_restores_on_error_path() {
        fn failing(ctx: &mut Context) -> Result<()> {
            let mut scope = ctx.enter()?;
            scope.set_transparent(true);
            Err(CoderError::invalid("child failed"))
        }

        let mut ctx = Context::new();
        assert!(failing(&mut ctx).is_err());
        assert!(!ctx.is_transparent());
        assert_eq!(ctx.depth(), 0);
    }

    #[test]
    fn test_nested_scopes() {
        let mut ctx = Context::new();
        let mut outer = ctx.enter().unwrap();
        outer.set_advance_width(4);
        {
            let mut inner = outer.enter().unwrap();
            inner.set_advance_width(12);
            assert_eq!(inner.depth(), 2);
        }
        assert_eq!(outer.advance_width(), 4);
        outer.clear_text_widths();
        assert_eq!(outer.advance_width(), 0);
        outer.leave();
        assert_eq!(ctx.depth(), 0);
    }

    #[test]
    fn test_depth_limit() {
        let mut ctx = Context::with_options(CoderOptions {
            max_depth: 1,
            ..Default::default()
        });
        let mut scope = ctx.enter().unwrap();
        assert!(matches!(
            scope.enter(),
            Err(CoderError::NestingTooDeep { limit: 1 })
        ));
        assert_eq!(scope.depth(), 1);
    }
}
