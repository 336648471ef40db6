/*!
    Timestamp type for media timing.
*/

use std::time::Duration;

use crate::Rational;

/**
    Presentation (or decoding) timestamp in time_base units.

    This is a raw tick count; interpreting it requires the time base it was
    produced against. Buffers crossing the host/graph boundary always carry
    their time base alongside.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pts(pub i64);

impl Pts {
    /**
        Convert this timestamp to a Duration using the given time base.

        Negative values are clamped to zero.
    */
    #[inline]
    pub fn to_duration(self, time_base: Rational) -> Duration {
        if self.0 <= 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.0 as f64 * time_base.to_f64())
    }

    /**
        Create a timestamp from a Duration using the given time base.
    */
    #[inline]
    pub fn from_duration(duration: Duration, time_base: Rational) -> Self {
        Self((duration.as_secs_f64() / time_base.to_f64()).round() as i64)
    }

    /**
        Re-express this timestamp in another time base, rounding to the
        nearest tick.
    */
    #[inline]
    pub fn rescale(self, from: Rational, to: Rational) -> Self {
        let ticks = self.0 as i128 * from.num as i128 * to.den as i128;
        let div = from.den as i128 * to.num as i128;
        Self(((ticks + div / 2) / div) as i64)
    }
}

impl From<i64> for Pts {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Pts> for i64 {
    fn from(pts: Pts) -> Self {
        pts.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS: Rational = Rational::NANOSECONDS;

    #[test]
    fn to_duration_nanoseconds() {
        assert_eq!(Pts(1_000_000_000).to_duration(NS), Duration::from_secs(1));
        assert_eq!(Pts(500_000_000).to_duration(NS), Duration::from_millis(500));
    }

    #[test]
    fn negative_clamps_to_zero() {
        assert_eq!(Pts(-100).to_duration(NS), Duration::ZERO);
    }

    #[test]
    fn from_duration_round_trip() {
        let original = Duration::from_millis(1500);
        let pts = Pts::from_duration(original, NS);
        assert_eq!(pts.to_duration(NS), original);
    }

    #[test]
    fn rescale_frame_counter_to_nanoseconds() {
        // Frame 3 at 30 fps is exactly 100ms.
        let pts = Pts(3).rescale(Rational::new(1, 30), NS);
        assert_eq!(pts, Pts(100_000_000));
    }

    #[test]
    fn rescale_sample_counter_to_nanoseconds() {
        // 48000 samples at 48kHz is exactly one second.
        let pts = Pts(48_000).rescale(Rational::new(1, 48_000), NS);
        assert_eq!(pts, Pts(1_000_000_000));
    }

    #[test]
    fn rescale_identity() {
        let pts = Pts(1234);
        assert_eq!(pts.rescale(NS, NS), pts);
    }

    #[test]
    fn ordering() {
        assert!(Pts(100) < Pts(200));
        assert_eq!(Pts(100), Pts(100));
    }
}
