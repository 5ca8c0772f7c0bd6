//! Embedding verification payloads into cards and reading them back.
//!
//! A payload is written through two independent channels:
//!
//! - the EXIF `ImageDescription` field, as `VERIFY_DATA:` + payload JSON;
//! - a near-transparent bit strip in the bottom-right corner of the pixels.
//!
//! Extraction reads the metadata channel only. Metadata survives re-encoding
//! byte for byte, while the pixel strip would need compression-tolerant image
//! analysis; the strip exists for human audit and as a second copy when a
//! pipeline strips metadata.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::error::Result;
use crate::payload::{MarkedPayload, VerificationPayload};
use crate::render::{CardRenderer, MetadataFields, OverlayLayer, OverlaySpec, Region};

/// `Software` tag written to every card.
pub const SOFTWARE_TAG: &str = "cardmark";
/// `Artist` tag written to every card.
pub const ARTIST_TAG: &str = "cardmark issuer";
/// Reason attached to unparseable payloads.
pub const MALFORMED_REASON: &str = "payload present but not parseable";

const DATA_STRIP_SIDE: u32 = 50;
const DATA_STRIP_ALPHA: u8 = 3;
const BADGE_HEIGHT: u32 = 50;
const BADGE_TOP: u32 = 10;
const BADGE_ALPHA: u8 = 179;
const BADGE_FILL: [u8; 3] = [255, 192, 203];
const BADGE_TEXT: [u8; 3] = [255, 255, 255];

/// Placement of the two card overlays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardLayout {
    /// Near-invisible payload copy
    pub data_strip: Region,
    /// Visible membership badge
    pub badge: Region,
    pub badge_label: String,
}

impl CardLayout {
    /// Default placement: badge top-centre, data strip in the bottom-right corner.
    pub fn for_canvas(width: u32, height: u32) -> Self {
        let strip = DATA_STRIP_SIDE.min(width).min(height);
        let badge_width = width / 2;
        Self {
            data_strip: Region::new(width - strip, height - strip, strip, strip),
            badge: Region::new((width - badge_width) / 2, BADGE_TOP, badge_width, BADGE_HEIGHT),
            badge_label: "MEMBER CARD".to_string(),
        }
    }

    fn overlays(&self, payload_json: &str) -> Vec<OverlaySpec> {
        vec![
            OverlaySpec::new(
                self.badge,
                OverlayLayer::Badge {
                    label: self.badge_label.clone(),
                    fill: BADGE_FILL,
                    text: BADGE_TEXT,
                    alpha: BADGE_ALPHA,
                },
            ),
            OverlaySpec::new(
                self.data_strip,
                OverlayLayer::DataStrip {
                    data: payload_json.as_bytes().to_vec(),
                    alpha: DATA_STRIP_ALPHA,
                },
            ),
        ]
    }
}

/// A rendered card carrying an embedded payload.
#[derive(Debug, Clone)]
pub struct DerivativeArtifact {
    /// Encoded card image (JPEG)
    pub bytes: Vec<u8>,
    /// Payload embedded in the card
    pub payload: VerificationPayload,
    /// Exact string written to the description field
    pub description: String,
}

/// Outcome of reading a card's metadata channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationResult {
    Valid(VerificationPayload),
    Malformed(String),
    Absent,
}

impl VerificationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }
}

/// Writes payloads into cards and extracts them again.
#[derive(Clone)]
pub struct CredentialEmbedder {
    renderer: Arc<dyn CardRenderer>,
    layout: CardLayout,
}

impl CredentialEmbedder {
    pub fn new(renderer: Arc<dyn CardRenderer>) -> Self {
        let (width, height) = renderer.canvas();
        Self {
            renderer,
            layout: CardLayout::for_canvas(width, height),
        }
    }

    pub fn with_layout(renderer: Arc<dyn CardRenderer>, layout: CardLayout) -> Self {
        Self { renderer, layout }
    }

    pub fn layout(&self) -> &CardLayout {
        &self.layout
    }

    /// Render `source` into a card carrying `payload` in both channels.
    #[instrument(skip_all, fields(user_id = %payload.user_id))]
    pub fn embed(&self, source: &[u8], payload: &VerificationPayload) -> Result<DerivativeArtifact> {
        let json = payload.to_json()?;
        let description = payload.to_metadata_string()?;

        let metadata = MetadataFields {
            image_description: Some(description.clone()),
            software: Some(SOFTWARE_TAG.to_string()),
            artist: Some(ARTIST_TAG.to_string()),
        };

        let bytes = self.renderer.render_with_overlays(
            source,
            &self.layout.overlays(&json),
            &metadata,
        )?;

        debug!(card_bytes = bytes.len(), "Embedded payload");
        Ok(DerivativeArtifact {
            bytes,
            payload: payload.clone(),
            description,
        })
    }

    /// Classify the payload carried by `artifact`. Never fails.
    pub fn extract(&self, artifact: &[u8]) -> VerificationResult {
        extract_payload(self.renderer.as_ref(), artifact)
    }
}

/// Read the description field of `artifact` and classify its payload.
pub fn extract_payload(renderer: &dyn CardRenderer, artifact: &[u8]) -> VerificationResult {
    let Some(description) = renderer
        .read_metadata(artifact)
        .and_then(|fields| fields.image_description)
    else {
        debug!("No description field in artifact");
        return VerificationResult::Absent;
    };

    match VerificationPayload::from_metadata_str(&description) {
        MarkedPayload::Found(payload) => VerificationResult::Valid(payload),
        MarkedPayload::Unparseable(detail) => {
            debug!(detail = %detail, "Payload marker present but unparseable");
            VerificationResult::Malformed(MALFORMED_REASON.to_string())
        }
        MarkedPayload::Missing => VerificationResult::Absent,
    }
}
