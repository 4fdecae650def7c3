//! Source framebuffer
//!
//! Provides an owned RGBA pixel buffer that tracks which region changed
//! since the last flush.

use alloc::vec;
use alloc::vec::Vec;

use crate::codec::CodecError;
use crate::rect::Rect;

/// One source pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(0xff, 0xff, 0xff);

    /// Opaque color
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xff }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// BT.601 luma approximation, `(3R + 6G + B) / 10`
    pub fn luma(&self) -> u8 {
        ((3 * self.r as u16 + 6 * self.g as u16 + self.b as u16) / 10) as u8
    }
}

/// Owned RGBA framebuffer
#[derive(Clone, PartialEq, Eq)]
pub struct Image {
    width: u32,
    height: u32,
    pixels: Vec<Color>,
    /// Region modified since the last `take_damage`
    damage: Option<Rect>,
}

impl core::fmt::Debug for Image {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Image")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("damage", &self.damage)
            .finish_non_exhaustive()
    }
}

impl Image {
    /// Create a black image; the whole frame starts damaged
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, Color::BLACK)
    }

    pub fn filled(width: u32, height: u32, color: Color) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; width as usize * height as usize],
            damage: Some(Rect::new(0, 0, width, height)),
        }
    }

    /// Build from packed RGB888 bytes, row major
    pub fn from_rgb(width: u32, height: u32, bytes: &[u8]) -> Result<Self, CodecError> {
        Self::from_packed(width, height, bytes, 3)
    }

    /// Build from packed RGBA8888 bytes, row major
    pub fn from_rgba(width: u32, height: u32, bytes: &[u8]) -> Result<Self, CodecError> {
        Self::from_packed(width, height, bytes, 4)
    }

    fn from_packed(width: u32, height: u32, bytes: &[u8], cpp: usize) -> Result<Self, CodecError> {
        let expected = width as usize * height as usize * cpp;
        if bytes.len() != expected {
            return Err(CodecError::SizeMismatch {
                expected,
                actual: bytes.len(),
            });
        }
        let pixels = bytes
            .chunks_exact(cpp)
            .map(|p| match *p {
                [r, g, b] => Color::rgb(r, g, b),
                [r, g, b, a] => Color::rgba(r, g, b, a),
                _ => Color::BLACK,
            })
            .collect();
        Ok(Self {
            width,
            height,
            pixels,
            damage: Some(Rect::new(0, 0, width, height)),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Rectangle covering the whole image
    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(self.index(x, y)).copied()
    }

    /// Set one pixel; out of range coordinates are ignored
    pub fn set_pixel(&mut self, x: u32, y: u32, color: Color) {
        if x < self.width && y < self.height {
            let index = self.index(x, y);
            self.pixels[index] = color;
            self.mark_damaged(Rect::new(x, y, 1, 1));
        }
    }

    /// Fill a rectangle, clipped to the image
    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        let right = rect.right().min(self.width);
        let bottom = rect.bottom().min(self.height);
        if rect.x >= right || rect.y >= bottom {
            return;
        }
        for y in rect.y..bottom {
            let start = self.index(rect.x, y);
            let end = self.index(right, y);
            self.pixels[start..end].fill(color);
        }
        self.mark_damaged(Rect::new(rect.x, rect.y, right - rect.x, bottom - rect.y));
    }

    /// Pixels of `width` starting at (x, y); caller guarantees bounds
    pub(crate) fn span(&self, x: u32, y: u32, width: u32) -> &[Color] {
        let start = self.index(x, y);
        &self.pixels[start..start + width as usize]
    }

    /// Grow the damaged region
    pub fn mark_damaged(&mut self, rect: Rect) {
        self.damage = Some(match self.damage {
            Some(damage) => damage.union(&rect),
            None => rect,
        });
    }

    /// Region modified since the last call, if any
    pub fn take_damage(&mut self) -> Option<Rect> {
        self.damage.take()
    }

    pub fn is_damaged(&self) -> bool {
        self.damage.is_some()
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_image_fully_damaged() {
        let mut image = Image::new(16, 8);
        assert_eq!(image.take_damage(), Some(Rect::new(0, 0, 16, 8)));
        assert_eq!(image.take_damage(), None);
        assert!(!image.is_damaged());
    }

    #[test]
    fn test_fill_rect_clips_and_tracks_damage() {
        let mut image = Image::new(10, 10);
        image.take_damage();

        image.fill_rect(Rect::new(8, 8, 5, 5), Color::WHITE);
        assert_eq!(image.pixel(9, 9), Some(Color::WHITE));
        assert_eq!(image.pixel(7, 9), Some(Color::BLACK));
        assert_eq!(image.take_damage(), Some(Rect::new(8, 8, 2, 2)));

        image.fill_rect(Rect::new(20, 20, 5, 5), Color::WHITE);
        assert_eq!(image.take_damage(), None);

        image.fill_rect(Rect::new(9, 0, u32::MAX, 1), Color::WHITE);
        assert_eq!(image.take_damage(), Some(Rect::new(9, 0, 1, 1)));
    }

    #[test]
    fn test_set_pixel_damage_union() {
        let mut image = Image::new(10, 10);
        image.take_damage();
        image.set_pixel(1, 1, Color::WHITE);
        image.set_pixel(5, 3, Color::WHITE);
        image.set_pixel(50, 3, Color::WHITE);
        assert_eq!(image.take_damage(), Some(Rect::new(1, 1, 5, 3)));
    }

    #[test]
    fn test_from_rgb() {
        let image = Image::from_rgb(2, 1, &[1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(image.pixel(1, 0), Some(Color::rgb(4, 5, 6)));
        assert_eq!(image.pixel(2, 0), None);

        assert_eq!(
            Image::from_rgb(2, 2, &[0; 6]).unwrap_err(),
            CodecError::SizeMismatch {
                expected: 12,
                actual: 6
            }
        );
    }

    #[test]
    fn test_from_rgba_keeps_alpha() {
        let image = Image::from_rgba(1, 1, &[1, 2, 3, 4]).unwrap();
        assert_eq!(image.pixel(0, 0), Some(Color::rgba(1, 2, 3, 4)));
    }

    #[test]
    fn test_luma() {
        assert_eq!(Color::WHITE.luma(), 255);
        assert_eq!(Color::BLACK.luma(), 0);
        assert_eq!(Color::rgb(10, 0, 0).luma(), 3);
        assert_eq!(Color::rgb(0, 0, 11).luma(), 1);
    }
}
