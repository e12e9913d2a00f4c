//! Abstracts over "where Fixes come from" so the pipeline can be driven by
//! a real serial GPS receiver or, in tests, by a canned sequence, rather
//! than depending on either concretely.

use chrono::{NaiveDate, NaiveTime, Utc};
use nmea::Nmea;
use outpost_core::Fix;
use tokio_serial::SerialPortBuilderExt;
use tokio_util::codec::{FramedRead, LinesCodec};
use futures::StreamExt;

#[derive(thiserror::Error, Debug)]
pub enum FixSourceError {
    #[error("serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),
    #[error("line read error: {0}")]
    LineRead(#[from] tokio_util::codec::LinesCodecError),
    #[error("source exhausted")]
    Exhausted,
}

/// Yields a lazy, possibly-infinite sequence of parsed [`Fix`]es. A single
/// NMEA sentence rarely carries a complete fix on its own (a GGA sentence
/// has no date, an RMC sentence repeats the position): implementations
/// accumulate sentences until a fix is complete, and otherwise return
/// `Ok(None)` for "nothing yet, try again".
pub trait FixSource {
    async fn next_fix(&mut self) -> Result<Option<Fix>, FixSourceError>;
}

/// Reads NMEA 0183 sentences from a serial port and parses them with the
/// `nmea` crate's stateful accumulator.
pub struct SerialNmeaSource {
    lines: FramedRead<tokio_serial::SerialStream, LinesCodec>,
    parser: Nmea,
}

impl SerialNmeaSource {
    pub fn open(device: &str, baud: u32) -> Result<Self, FixSourceError> {
        let port = tokio_serial::new(device, baud).open_native_async()?;
        Ok(Self { lines: FramedRead::new(port, LinesCodec::new()), parser: Nmea::default() })
    }
}

impl FixSource for SerialNmeaSource {
    async fn next_fix(&mut self) -> Result<Option<Fix>, FixSourceError> {
        let Some(line) = self.lines.next().await else {
            return Err(FixSourceError::Exhausted);
        };
        let line = line?;

        if self.parser.parse(&line).is_err() {
            return Ok(None);
        }

        let (Some(lat), Some(lon)) = (self.parser.latitude, self.parser.longitude) else {
            return Ok(None);
        };
        let Some(date) = self.parser.fix_date else {
            return Ok(None);
        };
        let Some(time) = self.parser.fix_time else {
            return Ok(None);
        };

        let timestamp = fix_timestamp(date, time);
        let altitude_m = self.parser.altitude.unwrap_or(0.0) as f64;
        let speed_kmh = self.parser.speed_over_ground.map(|knots| knots as f64 * 1.852).unwrap_or(0.0);

        Ok(Some(Fix::new(timestamp, lat, lon, altitude_m, speed_kmh)))
    }
}

fn fix_timestamp(date: NaiveDate, time: NaiveTime) -> u32 {
    date.and_time(time).and_utc().timestamp().try_into().unwrap_or(0)
}

/// A canned, in-memory [`FixSource`] for tests: yields each queued `Fix` in
/// order, then reports the source exhausted.
#[derive(Default)]
pub struct VecFixSource {
    remaining: std::collections::VecDeque<Fix>,
}

impl VecFixSource {
    pub fn new(fixes: impl IntoIterator<Item = Fix>) -> Self {
        Self { remaining: fixes.into_iter().collect() }
    }
}

impl FixSource for VecFixSource {
    async fn next_fix(&mut self) -> Result<Option<Fix>, FixSourceError> {
        match self.remaining.pop_front() {
            Some(fix) => Ok(Some(fix)),
            None => Err(FixSourceError::Exhausted),
        }
    }
}
