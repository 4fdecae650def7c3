//! Rectangle geometry
//!
//! Provides byte alignment for sub-byte pixel formats and splitting of a
//! region into horizontal bands that fit the device transfer buffer.

use gud_protocol::PixelFormat;

/// Axis-aligned rectangle in framebuffer pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge, saturating at `u32::MAX`
    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge, saturating at `u32::MAX`
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// `other` lies entirely inside `self`
    pub fn contains(&self, other: &Rect) -> bool {
        let edge = |start: u32, len: u32| start as u64 + len as u64;
        other.x >= self.x
            && other.y >= self.y
            && edge(other.x, other.width) <= edge(self.x, self.width)
            && edge(other.y, other.height) <= edge(self.y, self.height)
    }

    /// Smallest rectangle covering both
    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect::new(
            x,
            y,
            self.right().max(other.right()) - x,
            self.bottom().max(other.bottom()) - y,
        )
    }

    /// Widen to whole bytes of `format`: `x` moves down to the alignment
    /// boundary and the right edge moves up to the next one, but never past
    /// `limit` (the framebuffer width).
    ///
    /// Empty rectangles are returned unchanged.
    pub fn align_to(&self, format: PixelFormat, limit: u32) -> Rect {
        if self.is_empty() {
            return *self;
        }
        let align = format.pixel_alignment();
        let x = self.x - self.x % align;
        let right = self
            .right()
            .div_ceil(align)
            .saturating_mul(align)
            .min(limit.max(self.right()));
        Rect::new(x, self.y, right - x, self.height)
    }

    /// Split into bands of at most `max_lines` rows, top to bottom.
    ///
    /// Yields nothing when `max_lines` is zero.
    pub fn bands(&self, max_lines: u32) -> Bands {
        Bands {
            rect: *self,
            max_lines,
            offset: 0,
        }
    }
}

impl core::fmt::Display for Rect {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// Iterator over horizontal bands of a rectangle
#[derive(Debug, Clone)]
pub struct Bands {
    rect: Rect,
    max_lines: u32,
    offset: u32,
}

impl Iterator for Bands {
    type Item = Rect;

    fn next(&mut self) -> Option<Rect> {
        if self.max_lines == 0 || self.offset >= self.rect.height {
            return None;
        }
        let lines = self.max_lines.min(self.rect.height - self.offset);
        let band = Rect::new(
            self.rect.x,
            self.rect.y + self.offset,
            self.rect.width,
            lines,
        );
        self.offset += lines;
        Some(band)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.max_lines == 0 {
            return (0, Some(0));
        }
        let left = (self.rect.height - self.offset).div_ceil(self.max_lines) as usize;
        (left, Some(left))
    }
}

impl ExactSizeIterator for Bands {}
