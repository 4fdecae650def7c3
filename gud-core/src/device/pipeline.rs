//! Pipeline state requested by the application

use gud_protocol::{DisplayMode, PixelFormat};

/// Mode, format and connector to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayState {
    pub mode: DisplayMode,
    pub format: PixelFormat,
    pub connector: usize,
}

impl DisplayState {
    pub fn new(mode: DisplayMode, format: PixelFormat, connector: usize) -> Self {
        Self {
            mode,
            format,
            connector,
        }
    }

    /// Framebuffer width in pixels
    pub fn width(&self) -> u32 {
        self.mode.hdisplay as u32
    }

    /// Framebuffer height in pixels
    pub fn height(&self) -> u32 {
        self.mode.vdisplay as u32
    }

    pub fn vrefresh(&self) -> u32 {
        self.mode.vrefresh()
    }
}

impl std::fmt::Display for DisplayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} on connector {}", self.mode, self.format, self.connector)
    }
}
