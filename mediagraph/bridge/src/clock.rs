/*!
    Synthesized timestamps for hosts that do not trust graph clocks.

    When the configuration does not request graph timestamps, outbound
    buffers get counter-based timestamps instead: frame index for video,
    cumulative sample count for audio, each against the matching time base.
    The counters persist for the lifetime of one graph instance and reset
    only on rebuild, so a single stream run never mixes timestamp sources.
*/

use mediagraph_types::{Pts, Rational};

/**
    Frame-counter clock for video.

    Produces timestamps `0, 1, 2, ...` against the inverted frame rate as
    time base, so frame `k` sits at exactly `k` frame durations.
*/
pub struct FrameCounter {
    count: i64,
    rate: Rational,
}

impl FrameCounter {
    /**
        Create a counter for the given frame rate.
    */
    pub fn new(rate: Rational) -> Self {
        Self { count: 0, rate }
    }

    /**
        The time base the produced timestamps are expressed in.
    */
    pub fn time_base(&self) -> Rational {
        self.rate.invert()
    }

    /**
        Take the timestamp for the next frame and advance.
    */
    pub fn next(&mut self) -> Pts {
        let pts = Pts(self.count);
        self.count += 1;
        pts
    }

    /**
        Reset the counter. Called on rebuild only.
    */
    pub fn reset(&mut self) {
        self.count = 0;
    }
}

/**
    Sample-counter clock for audio.

    Produces the cumulative sample position against a `1/sample_rate` time
    base, so a buffer's timestamp is exactly `samples_before / sample_rate`
    seconds.
*/
pub struct SampleCounter {
    samples: i64,
    sample_rate: u32,
}

impl SampleCounter {
    /**
        Create a counter for the given sample rate.
    */
    pub fn new(sample_rate: u32) -> Self {
        Self { samples: 0, sample_rate }
    }

    /**
        The time base the produced timestamps are expressed in.
    */
    pub fn time_base(&self) -> Rational {
        Rational::new(1, self.sample_rate as i32)
    }

    /**
        Take the timestamp for the next buffer of `frames` sample frames
        and advance.
    */
    pub fn next(&mut self, frames: usize) -> Pts {
        let pts = Pts(self.samples);
        self.samples += frames as i64;
        pts
    }

    /**
        Reset the counter. Called on rebuild only.
    */
    pub fn reset(&mut self) {
        self.samples = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_counter_produces_exact_multiples() {
        let mut counter = FrameCounter::new(Rational::new(30, 1));
        assert_eq!(counter.time_base(), Rational::new(1, 30));

        // Ten frames at 30 fps: exactly 0, T, 2T ... 9T with T = 1/30s in
        // the declared time base.
        for expected in 0..10 {
            assert_eq!(counter.next(), Pts(expected));
        }
    }

    #[test]
    fn frame_counter_fractional_rate() {
        let counter = FrameCounter::new(Rational::new(30000, 1001));
        assert_eq!(counter.time_base(), Rational::new(1001, 30000));
    }

    #[test]
    fn frame_counter_reset() {
        let mut counter = FrameCounter::new(Rational::new(30, 1));
        counter.next();
        counter.next();
        counter.reset();
        assert_eq!(counter.next(), Pts(0));
    }

    #[test]
    fn sample_counter_accumulates() {
        let mut counter = SampleCounter::new(48_000);
        assert_eq!(counter.time_base(), Rational::new(1, 48_000));

        assert_eq!(counter.next(1024), Pts(0));
        assert_eq!(counter.next(1024), Pts(1024));
        assert_eq!(counter.next(512), Pts(2048));
        // One second of audio lands exactly at the sample rate.
        assert_eq!(counter.next(48_000 - 2560), Pts(2560));
    }

    #[test]
    fn sample_counter_reset() {
        let mut counter = SampleCounter::new(48_000);
        counter.next(4800);
        counter.reset();
        assert_eq!(counter.next(1), Pts(0));
    }
}
