//! EXIF IFD0 encoding, JPEG APP1 splicing, and metadata readback.

use std::io::Cursor;

use exif::experimental::Writer;
use exif::{Field, In, Reader, Tag, Value};
use tracing::debug;

use super::MetadataFields;
use crate::error::{CardError, Result};

const SOI: [u8; 2] = [0xFF, 0xD8];
const APP0: [u8; 2] = [0xFF, 0xE0];
const APP1: [u8; 2] = [0xFF, 0xE1];
const EXIF_HEADER: &[u8] = b"Exif\0\0";

/// Encode the populated fields as a little-endian TIFF block with one IFD.
pub(crate) fn encode_tiff(metadata: &MetadataFields) -> Result<Vec<u8>> {
    let fields: Vec<Field> = [
        (Tag::ImageDescription, &metadata.image_description),
        (Tag::Software, &metadata.software),
        (Tag::Artist, &metadata.artist),
    ]
    .into_iter()
    .filter_map(|(tag, value)| {
        value.as_ref().map(|text| Field {
            tag,
            ifd_num: In::PRIMARY,
            value: Value::Ascii(vec![text.as_bytes().to_vec()]),
        })
    })
    .collect();

    let mut writer = Writer::new();
    for field in &fields {
        writer.push_field(field);
    }

    let mut buf = Cursor::new(Vec::new());
    writer
        .write(&mut buf, true)
        .map_err(|e| CardError::RenderFailure(format!("EXIF encoding failed: {e}")))?;
    Ok(buf.into_inner())
}

/// Insert `tiff` as an EXIF APP1 segment after SOI (and after JFIF APP0 if present).
pub(crate) fn splice_app1(jpeg: &[u8], tiff: &[u8]) -> Result<Vec<u8>> {
    if jpeg.len() < 4 || jpeg[..2] != SOI {
        return Err(CardError::RenderFailure(
            "encoder output is not a JPEG stream".into(),
        ));
    }

    // The length field counts itself.
    let segment_len = 2 + EXIF_HEADER.len() + tiff.len();
    let segment_len = u16::try_from(segment_len).map_err(|_| {
        CardError::RenderFailure(format!(
            "metadata block of {segment_len} bytes exceeds the APP1 segment limit"
        ))
    })?;

    let mut insert_at = SOI.len();
    if jpeg[2..4] == APP0 && jpeg.len() >= 6 {
        let app0_len = u16::from_be_bytes([jpeg[4], jpeg[5]]) as usize;
        if 4 + app0_len <= jpeg.len() {
            insert_at = 4 + app0_len;
        }
    }

    let mut out = Vec::with_capacity(jpeg.len() + segment_len as usize + 2);
    out.extend_from_slice(&jpeg[..insert_at]);
    out.extend_from_slice(&APP1);
    out.extend_from_slice(&segment_len.to_be_bytes());
    out.extend_from_slice(EXIF_HEADER);
    out.extend_from_slice(tiff);
    out.extend_from_slice(&jpeg[insert_at..]);
    Ok(out)
}

/// Read IFD0 descriptive fields from any container `kamadak-exif` understands.
pub(crate) fn read_fields(bytes: &[u8]) -> Option<MetadataFields> {
    let exif = match Reader::new().read_from_container(&mut Cursor::new(bytes)) {
        Ok(exif) => exif,
        Err(e) => {
            debug!(error = %e, "No readable EXIF block");
            return None;
        }
    };

    let ascii = |tag: Tag| -> Option<String> {
        let field = exif.get_field(tag, In::PRIMARY)?;
        match &field.value {
            Value::Ascii(parts) => {
                let joined: Vec<u8> = parts.iter().flatten().copied().collect();
                let text = String::from_utf8_lossy(&joined);
                Some(text.trim_end_matches('\0').to_string())
            }
            _ => None,
        }
    };

    let fields = MetadataFields {
        image_description: ascii(Tag::ImageDescription),
        software: ascii(Tag::Software),
        artist: ascii(Tag::Artist),
    };

    if fields.is_empty() {
        None
    } else {
        Some(fields)
    }
}
