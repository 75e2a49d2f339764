use std::io::Cursor;

use exif::{Exif, Field, In, Reader, Tag, Value};
use shared_types::GeoPoint;

/// Why a photo yielded no location. Never surfaced to callers.
#[derive(Debug, thiserror::Error)]
enum Unavailable {
    #[error("no readable metadata: {0}")]
    NoMetadata(#[from] exif::Error),
    #[error("metadata has no GPS coordinates")]
    NoGps,
    #[error("malformed {0} field")]
    Malformed(Tag),
}

/// Recover the capture location from a photo's EXIF GPS block.
///
/// Missing, partial or malformed metadata all yield `None`.
pub fn extract_location(image: &[u8]) -> Option<GeoPoint> {
    match read_location(image) {
        Ok(point) => {
            tracing::debug!(latitude = point.latitude, longitude = point.longitude, "photo carries GPS location");
            Some(point)
        }
        Err(reason) => {
            tracing::debug!(%reason, "no location in photo metadata");
            None
        }
    }
}

fn read_location(image: &[u8]) -> Result<GeoPoint, Unavailable> {
    let exif = Reader::new().read_from_container(&mut Cursor::new(image))?;

    let (Some(lat), Some(lon)) = (
        exif.get_field(Tag::GPSLatitude, In::PRIMARY),
        exif.get_field(Tag::GPSLongitude, In::PRIMARY),
    ) else {
        return Err(Unavailable::NoGps);
    };

    let latitude = to_degrees(lat)? * hemisphere_sign(reference(&exif, Tag::GPSLatitudeRef)?, "N");
    let longitude =
        to_degrees(lon)? * hemisphere_sign(reference(&exif, Tag::GPSLongitudeRef)?, "E");

    Ok(GeoPoint {
        latitude,
        longitude,
    })
}

/// `d + m/60 + s/3600` from a three-rational DMS field.
fn to_degrees(field: &Field) -> Result<f64, Unavailable> {
    let Value::Rational(ref parts) = field.value else {
        return Err(Unavailable::Malformed(field.tag));
    };
    let [d, m, s] = parts.as_slice() else {
        return Err(Unavailable::Malformed(field.tag));
    };
    let degrees = dms_to_decimal(d.to_f64(), m.to_f64(), s.to_f64());
    if degrees.is_finite() {
        Ok(degrees)
    } else {
        Err(Unavailable::Malformed(field.tag))
    }
}

pub(crate) fn dms_to_decimal(degrees: f64, minutes: f64, seconds: f64) -> f64 {
    degrees + minutes / 60.0 + seconds / 3600.0
}

/// Hemisphere reference letter, if the field is present.
fn reference(exif: &Exif, tag: Tag) -> Result<Option<String>, Unavailable> {
    let Some(field) = exif.get_field(tag, In::PRIMARY) else {
        return Ok(None);
    };
    match &field.value {
        Value::Ascii(strings) => Ok(Some(
            strings
                .first()
                .map(|s| String::from_utf8_lossy(s).trim().to_string())
                .unwrap_or_default(),
        )),
        _ => Err(Unavailable::Malformed(tag)),
    }
}

/// A missing reference counts as the positive hemisphere; any other
/// reference than `positive` flips the sign.
pub(crate) fn hemisphere_sign(reference: Option<String>, positive: &str) -> f64 {
    match reference {
        Some(r) if r != positive => -1.0,
        _ => 1.0,
    }
}
