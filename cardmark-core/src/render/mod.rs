//! Card rendering and metadata access.
//!
//! The renderer is the codec collaborator of the embedding protocol: it turns
//! a source image into the derivative card, compositing overlays and writing
//! descriptive metadata, and reads that metadata back from finished cards.
//!
//! # Components
//!
//! - **JpegCardRenderer**: cover-fit resize, alpha-blended overlays, JPEG
//!   encode, EXIF IFD0 block spliced in as an APP1 segment.
//! - **glyphs**: a small bitmap font for the visible badge label.

mod exif_block;
mod glyphs;
mod jpeg;

pub use jpeg::JpegCardRenderer;

use crate::error::{CardError, Result};

/// Output geometry and encoder settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderConfig {
    /// Card width in pixels (default: 400)
    pub width: u32,
    /// Card height in pixels (default: 400)
    pub height: u32,
    /// JPEG quality 1-100 (default: 90)
    pub jpeg_quality: u8,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 400,
            height: 400,
            jpeg_quality: 90,
        }
    }
}

/// Axis-aligned pixel rectangle on the card canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    pub fn intersects(&self, other: &Region) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.width > 0 && self.height > 0 && self.right() <= width && self.bottom() <= height
    }
}

/// What an overlay draws into its region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayLayer {
    /// Bytes laid out as a bit matrix, one pixel per bit, row-major.
    /// Set bits darken the pixel, clear bits lighten it, both at `alpha`.
    /// Bytes beyond the region's capacity are clipped.
    DataStrip { data: Vec<u8>, alpha: u8 },
    /// Filled banner with a centred text label.
    Badge {
        label: String,
        fill: [u8; 3],
        text: [u8; 3],
        alpha: u8,
    },
}

/// One overlay placed on the card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlaySpec {
    pub region: Region,
    pub layer: OverlayLayer,
}

impl OverlaySpec {
    pub fn new(region: Region, layer: OverlayLayer) -> Self {
        Self { region, layer }
    }
}

/// Descriptive metadata fields written to and read from card files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataFields {
    pub image_description: Option<String>,
    pub software: Option<String>,
    pub artist: Option<String>,
}

impl MetadataFields {
    pub fn is_empty(&self) -> bool {
        self.image_description.is_none() && self.software.is_none() && self.artist.is_none()
    }
}

/// Codec seam for card rendering.
pub trait CardRenderer: Send + Sync {
    /// Render `source` into a card with `overlays` composited and `metadata` attached.
    fn render_with_overlays(
        &self,
        source: &[u8],
        overlays: &[OverlaySpec],
        metadata: &MetadataFields,
    ) -> Result<Vec<u8>>;

    /// Read descriptive metadata, `None` if the file carries none or is unreadable.
    fn read_metadata(&self, bytes: &[u8]) -> Option<MetadataFields>;

    /// Canvas size of rendered cards.
    fn canvas(&self) -> (u32, u32);
}

/// Reject overlays that leave the canvas or overlap each other.
pub fn validate_layout(overlays: &[OverlaySpec], width: u32, height: u32) -> Result<()> {
    for (i, overlay) in overlays.iter().enumerate() {
        if !overlay.region.fits_within(width, height) {
            return Err(CardError::InvalidInput(format!(
                "overlay {i} region {:?} does not fit a {width}x{height} canvas",
                overlay.region
            )));
        }
        if let Some((j, _)) = overlays[..i]
            .iter()
            .enumerate()
            .find(|(_, other)| other.region.intersects(&overlay.region))
        {
            return Err(CardError::InvalidInput(format!(
                "overlay {i} collides with overlay {j}"
            )));
        }
    }
    Ok(())
}
