//! Wire codec for a batch of [`Fix`]es: a 16-byte header carrying a
//! full-precision reference sample, followed by `count - 1` 9-byte delta
//! samples.
//!
//! ```text
//! header (16 B): ref_ts:u32 BE | ref_lat_q:i32 BE | ref_lon_q:i32 BE
//!                | ref_alt:i16 BE | ref_spd_q:u8 | count:u8
//! sample (9 B):  dt:u16 BE | dlat_q:i16 BE | dlon_q:i16 BE | alt:i16 BE
//!                | spd_q:u8
//! ```
//!
//! Quantization rounds to nearest, ties away from zero (`f64::round`'s own
//! behaviour), and saturates rather than rejects when a value doesn't fit
//! its field: a GPS glitch or a speed above the field's ceiling should
//! still produce a sendable batch, clipped to the representable range.

use crate::fix::{Fix, MAX_BATCH_SAMPLES};

pub const HEADER_LEN: usize = 16;
pub const SAMPLE_LEN: usize = 9;

const LATLON_SCALE: f64 = 1.0e7;
const DELTA_LATLON_SCALE: f64 = 1.0e4;
const SPEED_SCALE: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("plaintext too short: need at least {need} bytes, got {got}")]
    TooShort { need: usize, got: usize },
    #[error("invalid sample count: {0}")]
    BadCount(u8),
    #[error("{0} trailing byte(s) after the declared batch length")]
    TrailingBytes(usize),
}

/// Rounds `value * scale` to the nearest integer (ties away from zero) and
/// clamps it to `min..=max`. Logs `ENCODE_OVERFLOW` via `tracing::warn!`
/// when clamping actually changes the value, per spec.md §7: saturation is
/// the encoder's only "error" and it must stay observable rather than
/// silently discarding precision.
fn round_saturate(field: &'static str, value: f64, scale: f64, min: i64, max: i64) -> i64 {
    let scaled = (value * scale).round();
    if scaled.is_nan() {
        return 0;
    }
    if scaled <= min as f64 {
        if scaled < min as f64 {
            tracing::warn!(field, value, min, "sample field saturated to its minimum on encode");
        }
        min
    } else if scaled >= max as f64 {
        if scaled > max as f64 {
            tracing::warn!(field, value, max, "sample field saturated to its maximum on encode");
        }
        max
    } else {
        scaled as i64
    }
}

/// Encodes 1..=40 fixes, the first of which becomes the full-precision
/// reference. Returns [`CodecError::BadCount`] for an empty or oversized
/// slice; this is the one encode-side error, every numeric field saturates
/// instead of failing.
pub fn encode(fixes: &[Fix]) -> Result<Vec<u8>, CodecError> {
    if fixes.is_empty() || fixes.len() > MAX_BATCH_SAMPLES {
        return Err(CodecError::BadCount(fixes.len().min(u8::MAX as usize) as u8));
    }

    let reference = &fixes[0];
    let mut out = Vec::with_capacity(HEADER_LEN + SAMPLE_LEN * (fixes.len() - 1));

    out.extend_from_slice(&reference.timestamp.to_be_bytes());
    let ref_lat_q = round_saturate("ref_lat_q", reference.latitude, LATLON_SCALE, i32::MIN as i64, i32::MAX as i64) as i32;
    let ref_lon_q = round_saturate("ref_lon_q", reference.longitude, LATLON_SCALE, i32::MIN as i64, i32::MAX as i64) as i32;
    out.extend_from_slice(&ref_lat_q.to_be_bytes());
    out.extend_from_slice(&ref_lon_q.to_be_bytes());
    let ref_alt = round_saturate("ref_alt", reference.altitude_m, 1.0, i16::MIN as i64, i16::MAX as i64) as i16;
    out.extend_from_slice(&ref_alt.to_be_bytes());
    let ref_spd_q = round_saturate("ref_spd_q", reference.speed_kmh, SPEED_SCALE, 0, u8::MAX as i64) as u8;
    out.push(ref_spd_q);
    out.push(fixes.len() as u8);

    for sample in &fixes[1..] {
        let dt = round_saturate(
            "dt",
            (sample.timestamp as i64 - reference.timestamp as i64) as f64,
            1.0,
            0,
            u16::MAX as i64,
        ) as u16;
        out.extend_from_slice(&dt.to_be_bytes());

        let dlat_q = round_saturate("dlat_q", sample.latitude - reference.latitude, DELTA_LATLON_SCALE, i16::MIN as i64, i16::MAX as i64) as i16;
        let dlon_q = round_saturate("dlon_q", sample.longitude - reference.longitude, DELTA_LATLON_SCALE, i16::MIN as i64, i16::MAX as i64) as i16;
        out.extend_from_slice(&dlat_q.to_be_bytes());
        out.extend_from_slice(&dlon_q.to_be_bytes());

        let alt = round_saturate("alt", sample.altitude_m, 1.0, i16::MIN as i64, i16::MAX as i64) as i16;
        out.extend_from_slice(&alt.to_be_bytes());

        let spd_q = round_saturate("spd_q", sample.speed_kmh, SPEED_SCALE, 0, u8::MAX as i64) as u8;
        out.push(spd_q);
    }

    Ok(out)
}

/// Decodes a header-plus-samples buffer back into absolute fixes, in order.
pub fn decode(bytes: &[u8]) -> Result<Vec<Fix>, CodecError> {
    if bytes.len() < HEADER_LEN {
        return Err(CodecError::TooShort { need: HEADER_LEN, got: bytes.len() });
    }

    let ref_ts = u32::from_be_bytes(bytes[0..4].try_into().unwrap());
    let ref_lat_q = i32::from_be_bytes(bytes[4..8].try_into().unwrap());
    let ref_lon_q = i32::from_be_bytes(bytes[8..12].try_into().unwrap());
    let ref_alt = i16::from_be_bytes(bytes[12..14].try_into().unwrap());
    let ref_spd_q = bytes[14];
    let count = bytes[15];

    if count == 0 || count as usize > MAX_BATCH_SAMPLES {
        return Err(CodecError::BadCount(count));
    }

    let ref_lat = ref_lat_q as f64 / LATLON_SCALE;
    let ref_lon = ref_lon_q as f64 / LATLON_SCALE;

    let need = HEADER_LEN + SAMPLE_LEN * (count as usize - 1);
    if bytes.len() < need {
        return Err(CodecError::TooShort { need, got: bytes.len() });
    }
    if bytes.len() > need {
        return Err(CodecError::TrailingBytes(bytes.len() - need));
    }

    let mut fixes = Vec::with_capacity(count as usize);
    fixes.push(Fix {
        timestamp: ref_ts,
        latitude: ref_lat,
        longitude: ref_lon,
        altitude_m: ref_alt as f64,
        speed_kmh: ref_spd_q as f64 / SPEED_SCALE,
    });

    let mut offset = HEADER_LEN;
    for _ in 1..count {
        let dt = u16::from_be_bytes(bytes[offset..offset + 2].try_into().unwrap());
        let dlat_q = i16::from_be_bytes(bytes[offset + 2..offset + 4].try_into().unwrap());
        let dlon_q = i16::from_be_bytes(bytes[offset + 4..offset + 6].try_into().unwrap());
        let alt = i16::from_be_bytes(bytes[offset + 6..offset + 8].try_into().unwrap());
        let spd_q = bytes[offset + 8];

        fixes.push(Fix {
            timestamp: ref_ts.wrapping_add(dt as u32),
            latitude: ref_lat + dlat_q as f64 / DELTA_LATLON_SCALE,
            longitude: ref_lon + dlon_q as f64 / DELTA_LATLON_SCALE,
            altitude_m: alt as f64,
            speed_kmh: spd_q as f64 / SPEED_SCALE,
        });

        offset += SAMPLE_LEN;
    }

    Ok(fixes)
}
