//! The domain type every other module in the workspace passes around: one
//! GPS position sample.

/// Largest batch the wire header's `count` byte and the client pipeline's
/// buffer can hold.
pub const MAX_BATCH_SAMPLES: usize = 40;

/// A single GPS position sample.
///
/// `timestamp` is Unix seconds, matching the header's `ref_ts` field width
/// (`u32`) directly rather than going through a richer date type; the wire
/// format only ever carries second-precision Unix time, so there is nothing
/// for a richer type to add here. Missing altitude/speed are carried as 0.0.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Fix {
    pub timestamp: u32,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_m: f64,
    pub speed_kmh: f64,
}

impl Fix {
    pub fn new(timestamp: u32, latitude: f64, longitude: f64, altitude_m: f64, speed_kmh: f64) -> Self {
        Self { timestamp, latitude, longitude, altitude_m, speed_kmh }
    }

    /// Great-circle-free planar distance used by the duplicate filter. The
    /// filter only needs to compare against a per-axis degree threshold, so
    /// this stays a cheap per-axis delta rather than a haversine distance.
    pub fn axis_delta(&self, other: &Fix) -> (f64, f64) {
        ((self.latitude - other.latitude).abs(), (self.longitude - other.longitude).abs())
    }
}
