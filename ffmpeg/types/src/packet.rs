/*!
    Compressed packets and timestamp types.
*/

use std::time::Duration;

/**
    A rational number, used for time bases and frame rates.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rational {
    pub num: i32,
    pub den: i32,
}

impl Rational {
    pub const fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }

    /**
        Returns the value as a float, or 0.0 for a zero denominator.
    */
    pub fn to_f64(self) -> f64 {
        if self.den == 0 {
            0.0
        } else {
            self.num as f64 / self.den as f64
        }
    }

    /**
        Returns true if either component is zero or negative.
    */
    pub const fn is_unset(self) -> bool {
        self.num <= 0 || self.den <= 0
    }
}

impl Default for Rational {
    /// Microsecond time base.
    fn default() -> Self {
        Self::new(1, 1_000_000)
    }
}

impl std::fmt::Display for Rational {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/**
    A timestamp in stream time base units.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pts(pub i64);

impl Pts {
    /**
        Converts the timestamp to a wall-clock offset using `time_base`.

        Negative timestamps and unset time bases yield `None`.
    */
    pub fn to_duration(self, time_base: Rational) -> Option<Duration> {
        if self.0 < 0 || time_base.is_unset() {
            return None;
        }
        let seconds = self.0 as f64 * time_base.to_f64();
        Some(Duration::from_secs_f64(seconds))
    }
}

/**
    One compressed unit read from a transport session.

    Packets are tagged with the logical index of the elementary stream they
    belong to; the orchestrator filters on that index before handing packets
    to the decoder.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    /// Compressed payload.
    pub data: Vec<u8>,
    /// Logical index of the elementary stream.
    pub stream_index: usize,
    /// Presentation timestamp.
    pub pts: Option<Pts>,
    /// Decode timestamp.
    pub dts: Option<Pts>,
    /// Duration in time base units (0 when unknown).
    pub duration: i64,
    /// Time base of `pts`, `dts` and `duration`.
    pub time_base: Rational,
    /// True for synchronization points.
    pub is_key: bool,
}

impl Packet {
    pub fn new(data: Vec<u8>, stream_index: usize, time_base: Rational) -> Self {
        Self {
            data,
            stream_index,
            pts: None,
            dts: None,
            duration: 0,
            time_base,
            is_key: false,
        }
    }

    pub fn with_timestamps(mut self, pts: Option<i64>, dts: Option<i64>) -> Self {
        self.pts = pts.map(Pts);
        self.dts = dts.map(Pts);
        self
    }

    pub fn with_duration(mut self, duration: i64) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_key(mut self, is_key: bool) -> Self {
        self.is_key = is_key;
        self
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pts_to_duration() {
        let tb = Rational::new(1, 90_000);
        assert_eq!(Pts(90_000).to_duration(tb), Some(Duration::from_secs(1)));
        assert_eq!(Pts(-1).to_duration(tb), None);
        assert_eq!(Pts(10).to_duration(Rational::new(0, 1)), None);
    }

    #[test]
    fn packet_builder() {
        let packet = Packet::new(vec![1, 2, 3], 1, Rational::new(1, 90_000))
            .with_timestamps(Some(3000), Some(0))
            .with_key(true);

        assert_eq!(packet.len(), 3);
        assert_eq!(packet.pts, Some(Pts(3000)));
        assert_eq!(packet.dts, Some(Pts(0)));
        assert!(packet.is_key);
    }
}
