//! Decoded bitmap surfaces.

/// Bytes per RGBA8 pixel.
const BYTES_PER_PIXEL: usize = 4;

/// Largest width or height accepted for a surface built from metadata.
pub const MAX_SURFACE_DIMENSION: u32 = 8192;

/// A decoded RGBA8 image ready for upload to a renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedBitmap {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl DecodedBitmap {
    /// Wrap raw RGBA8 pixels.
    ///
    /// Returns `None` when the buffer length does not match the size.
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(BYTES_PER_PIXEL)?;
        (pixels.len() == expected).then_some(Self {
            width,
            height,
            pixels,
        })
    }

    /// A transparent surface of the given size.
    ///
    /// Sizes coming from documents or other untrusted input go through
    /// [`Self::try_blank`] instead.
    pub fn blank(width: u32, height: u32) -> Self {
        let len = (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(BYTES_PER_PIXEL);
        Self {
            width,
            height,
            pixels: vec![0; len],
        }
    }

    /// A transparent surface, or `None` when either side exceeds
    /// [`MAX_SURFACE_DIMENSION`] or the byte size overflows.
    pub fn try_blank(width: u32, height: u32) -> Option<Self> {
        if width > MAX_SURFACE_DIMENSION || height > MAX_SURFACE_DIMENSION {
            return None;
        }
        let len = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(BYTES_PER_PIXEL)?;
        Some(Self {
            width,
            height,
            pixels: vec![0; len],
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Approximate memory held by this bitmap.
    pub fn byte_size(&self) -> usize {
        self.pixels.len()
    }

    /// Whether the surface has a drawable area.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rgba_checks_length() {
        assert!(DecodedBitmap::from_rgba(2, 2, vec![0; 16]).is_some());
        assert!(DecodedBitmap::from_rgba(2, 2, vec![0; 15]).is_none());
    }

    #[test]
    fn test_blank_byte_size() {
        let bitmap = DecodedBitmap::blank(10, 5);
        assert_eq!(bitmap.byte_size(), 200);
        assert!(!bitmap.is_empty());
        assert!(DecodedBitmap::blank(0, 5).is_empty());
    }

    #[test]
    fn test_try_blank_rejects_oversized_surfaces() {
        assert_eq!(DecodedBitmap::try_blank(160, 90).unwrap().byte_size(), 160 * 90 * 4);
        assert!(DecodedBitmap::try_blank(MAX_SURFACE_DIMENSION, MAX_SURFACE_DIMENSION).is_some());
        assert!(DecodedBitmap::try_blank(MAX_SURFACE_DIMENSION + 1, 1).is_none());
        assert!(DecodedBitmap::try_blank(u32::MAX, u32::MAX).is_none());
    }
}
