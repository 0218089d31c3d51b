//! # Particle Palette
//!
//! Colours are cosmetic. The store keeps a `u32` index per particle and the
//! renderer resolves it through [`Palette`].

use bytemuck::{Pod, Zeroable};

/// An 8-bit-per-channel RGBA colour, laid out for direct upload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(C)]
pub struct Rgba {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Rgba {
    /// Creates an opaque colour.
    #[inline]
    #[must_use]
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
}

/// The fixed palette spawned particles pick from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Palette {
    colors: &'static [Rgba],
}

const DEFAULT_COLORS: [Rgba; 8] = [
    Rgba::opaque(230, 41, 55),   // red
    Rgba::opaque(255, 161, 0),   // orange
    Rgba::opaque(255, 203, 0),   // gold
    Rgba::opaque(0, 228, 48),    // green
    Rgba::opaque(102, 191, 255), // sky blue
    Rgba::opaque(0, 121, 241),   // blue
    Rgba::opaque(200, 122, 255), // purple
    Rgba::opaque(190, 33, 55),   // maroon
];

impl Palette {
    /// The built-in eight colour palette.
    pub const DEFAULT: Self = Self {
        colors: &DEFAULT_COLORS,
    };

    /// Number of colours; spawned indices are drawn from `0..len()`.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.colors.len()
    }

    /// Returns true if the palette has no colours.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Resolves a colour index, or `None` if it is out of range.
    #[inline]
    #[must_use]
    pub fn get(&self, index: u32) -> Option<Rgba> {
        self.colors.get(index as usize).copied()
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_lookup() {
        let palette = Palette::default();
        assert_eq!(palette.len(), 8);
        assert_eq!(palette.get(0), Some(Rgba::opaque(230, 41, 55)));
        assert_eq!(palette.get(8), None);
    }

    #[test]
    fn test_rgba_is_four_bytes() {
        assert_eq!(std::mem::size_of::<Rgba>(), 4);
        let bytes: [u8; 4] = bytemuck::cast(Rgba::opaque(1, 2, 3));
        assert_eq!(bytes, [1, 2, 3, 255]);
    }
}
