//! JPEG card renderer.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, Rgba, RgbaImage};
use tracing::{debug, instrument};

use super::exif_block::{encode_tiff, read_fields, splice_app1};
use super::glyphs::{self, GLYPH_HEIGHT, GLYPH_SPACING, GLYPH_WIDTH};
use super::{
    validate_layout, CardRenderer, MetadataFields, OverlayLayer, OverlaySpec, Region,
    RenderConfig,
};
use crate::error::{CardError, Result};

/// Renders cards as cover-fit JPEGs with an EXIF description block.
#[derive(Debug, Clone, Default)]
pub struct JpegCardRenderer {
    config: RenderConfig,
}

impl JpegCardRenderer {
    pub fn new(config: RenderConfig) -> Result<Self> {
        if config.width == 0 || config.height == 0 {
            return Err(CardError::InvalidInput(
                "card dimensions must be non-zero".into(),
            ));
        }
        if !(1..=100).contains(&config.jpeg_quality) {
            return Err(CardError::InvalidInput(format!(
                "JPEG quality {} outside 1-100",
                config.jpeg_quality
            )));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    fn encode(&self, canvas: RgbaImage) -> Result<Vec<u8>> {
        let rgb = DynamicImage::ImageRgba8(canvas).to_rgb8();
        let mut out = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut out, self.config.jpeg_quality);
        DynamicImage::ImageRgb8(rgb)
            .write_with_encoder(encoder)
            .map_err(|e| CardError::RenderFailure(format!("JPEG encoding failed: {e}")))?;
        Ok(out)
    }
}

impl CardRenderer for JpegCardRenderer {
    #[instrument(skip_all, fields(source_bytes = source.len(), overlays = overlays.len()))]
    fn render_with_overlays(
        &self,
        source: &[u8],
        overlays: &[OverlaySpec],
        metadata: &MetadataFields,
    ) -> Result<Vec<u8>> {
        let (width, height) = self.canvas();
        validate_layout(overlays, width, height)?;

        let decoded = image::load_from_memory(source)
            .map_err(|e| CardError::RenderFailure(format!("Cannot decode source image: {e}")))?;

        let mut canvas = decoded
            .resize_to_fill(width, height, FilterType::Lanczos3)
            .to_rgba8();

        for overlay in overlays {
            match &overlay.layer {
                OverlayLayer::DataStrip { data, alpha } => {
                    draw_data_strip(&mut canvas, overlay.region, data, *alpha)
                }
                OverlayLayer::Badge {
                    label,
                    fill,
                    text,
                    alpha,
                } => draw_badge(&mut canvas, overlay.region, label, *fill, *text, *alpha),
            }
        }

        let jpeg = self.encode(canvas)?;
        if metadata.is_empty() {
            return Ok(jpeg);
        }

        let tiff = encode_tiff(metadata)?;
        let card = splice_app1(&jpeg, &tiff)?;
        debug!(
            card_bytes = card.len(),
            exif_bytes = tiff.len(),
            "Rendered card"
        );
        Ok(card)
    }

    fn read_metadata(&self, bytes: &[u8]) -> Option<MetadataFields> {
        read_fields(bytes)
    }

    fn canvas(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }
}

fn blend(pixel: &mut Rgba<u8>, color: [u8; 3], alpha: u8) {
    let a = alpha as u32;
    for (channel, target) in pixel.0.iter_mut().take(3).zip(color) {
        *channel = ((target as u32 * a + *channel as u32 * (255 - a) + 127) / 255) as u8;
    }
}

/// Lay out as many whole bytes of `data` as the region holds; the rest is clipped.
fn draw_data_strip(canvas: &mut RgbaImage, region: Region, data: &[u8], alpha: u8) {
    let capacity = region.width as usize * region.height as usize;
    let kept = &data[..data.len().min(capacity / 8)];
    let bits = kept.len() * 8;

    for dy in 0..region.height {
        for dx in 0..region.width {
            let index = (dy * region.width + dx) as usize;
            let set = index < bits && kept[index / 8] & (0x80 >> (index % 8)) != 0;
            let color = if set { [0, 0, 0] } else { [255, 255, 255] };
            blend(
                canvas.get_pixel_mut(region.x + dx, region.y + dy),
                color,
                alpha,
            );
        }
    }
}

fn draw_badge(
    canvas: &mut RgbaImage,
    region: Region,
    label: &str,
    fill: [u8; 3],
    text: [u8; 3],
    alpha: u8,
) {
    for dy in 0..region.height {
        for dx in 0..region.width {
            blend(canvas.get_pixel_mut(region.x + dx, region.y + dy), fill, alpha / 3);
        }
    }

    let unit_width = glyphs::text_width(label, 1);
    if unit_width == 0 {
        return;
    }
    let scale = ((region.width.saturating_sub(4)) / unit_width)
        .min(region.height.saturating_sub(4) / GLYPH_HEIGHT)
        .max(1);

    let text_w = glyphs::text_width(label, scale);
    let text_h = GLYPH_HEIGHT * scale;
    let origin_x = region.x + region.width.saturating_sub(text_w) / 2;
    let origin_y = region.y + region.height.saturating_sub(text_h) / 2;

    for (i, c) in label.chars().enumerate() {
        let rows = glyphs::glyph(c);
        let glyph_x = origin_x + i as u32 * (GLYPH_WIDTH + GLYPH_SPACING) * scale;
        for row in 0..GLYPH_HEIGHT {
            for col in 0..GLYPH_WIDTH {
                if !glyphs::pixel(&rows, col, row) {
                    continue;
                }
                for sy in 0..scale {
                    for sx in 0..scale {
                        let x = glyph_x + col * scale + sx;
                        let y = origin_y + row * scale + sy;
                        if x < region.right() && y < region.bottom() {
                            blend(canvas.get_pixel_mut(x, y), text, alpha);
                        }
                    }
                }
            }
        }
    }
}
