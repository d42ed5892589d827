use std::cmp::Ordering;

use crate::binary::Point;
use crate::constants::*;
use crate::error::ParseErrorKind;
use crate::external_sort::constants::ESTIMATED_RECORD_OVERHEAD_BYTES;

/// One parsed `x y z i` text line, kept at full text precision until it is
/// narrowed to the binary schema.
#[derive(Debug, Clone)]
pub struct SortRecord {
    pub line: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub intensity: i64,
}

impl SortRecord {
    pub fn from_text_line(line: &str) -> Result<Self, ParseErrorKind> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != TEXT_RECORD_FIELDS {
            return Err(ParseErrorKind::FieldCount { found: fields.len() });
        }

        let x = parse_coordinate(fields[0], FIELD_NAMES[0])?;
        let y = parse_coordinate(fields[1], FIELD_NAMES[1])?;
        let z = parse_coordinate(fields[2], FIELD_NAMES[2])?;
        let intensity = fields[3]
            .parse::<i64>()
            .map_err(|_| ParseErrorKind::InvalidNumber {
                field: FIELD_NAMES[3],
                value: fields[3].to_string(),
            })?;

        Ok(Self {
            line: fields.join(" "),
            x,
            y,
            z,
            intensity,
        })
    }

    /// Composite `(x, y, z)` comparator over the stored `f32` values, so the
    /// order matches what the binary writer and readers see. Coordinates
    /// that differ only past `f32` precision compare equal and keep input order.
    pub fn key_cmp(&self, other: &Self) -> Ordering {
        cmp_f32(self.x as f32, other.x as f32)
            .then_with(|| cmp_f32(self.y as f32, other.y as f32))
            .then_with(|| cmp_f32(self.z as f32, other.z as f32))
    }

    /// Narrows the record to the 14-byte schema.
    pub fn to_point(&self) -> Result<Point, String> {
        let x = narrow_coordinate(self.x, FIELD_NAMES[0])?;
        let y = narrow_coordinate(self.y, FIELD_NAMES[1])?;
        let z = narrow_coordinate(self.z, FIELD_NAMES[2])?;
        let intensity = i16::try_from(self.intensity).map_err(|_| {
            format!(
                "intensity {} outside [{}, {}] in line '{}'",
                self.intensity,
                i16::MIN,
                i16::MAX,
                self.line
            )
        })?;
        Ok(Point::new(x, y, z, intensity))
    }

    pub fn to_text_line(&self) -> &str {
        &self.line
    }

    pub fn estimated_size(&self) -> usize {
        self.line.len() + ESTIMATED_RECORD_OVERHEAD_BYTES
    }
}

fn parse_coordinate(field: &str, name: &'static str) -> Result<f64, ParseErrorKind> {
    let value = field.parse::<f64>().map_err(|_| ParseErrorKind::InvalidNumber {
        field: name,
        value: field.to_string(),
    })?;
    if !value.is_finite() {
        return Err(ParseErrorKind::NonFinite { field: name });
    }
    Ok(value)
}

fn narrow_coordinate(value: f64, name: &str) -> Result<f32, String> {
    let narrowed = value as f32;
    if narrowed.is_finite() {
        Ok(narrowed)
    } else {
        Err(format!("{name} = {value} does not fit in a 32-bit float"))
    }
}

fn cmp_f32(a: f32, b: f32) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}
