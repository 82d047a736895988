//! Bass/treble boost stage: a low-shelf and a high-shelf biquad in series,
//! applied per channel over the interleaved sample stream.

use rodio::source::SeekError;
use rodio::{ChannelCount, SampleRate, Source};
use std::time::Duration;

const BASS_FREQ_HZ: f32 = 250.0;
const BASS_GAIN_DB: f32 = 4.0;
const TREBLE_FREQ_HZ: f32 = 4_000.0;
const TREBLE_GAIN_DB: f32 = 3.0;

#[derive(Debug, Clone, Copy)]
struct Coefficients {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
}

impl Coefficients {
    // RBJ audio-EQ cookbook shelves, slope 1.
    fn low_shelf(freq_hz: f32, gain_db: f32, sample_rate_hz: f32) -> Self {
        let a = 10.0_f32.powf(gain_db / 40.0);
        let w0 = std::f32::consts::TAU * freq_hz / sample_rate_hz;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / 2.0 * std::f32::consts::SQRT_2;
        let shelf = 2.0 * a.sqrt() * alpha;

        let a0 = (a + 1.0) + (a - 1.0) * cos_w0 + shelf;
        Self {
            b0: a * ((a + 1.0) - (a - 1.0) * cos_w0 + shelf) / a0,
            b1: 2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w0) / a0,
            b2: a * ((a + 1.0) - (a - 1.0) * cos_w0 - shelf) / a0,
            a1: -2.0 * ((a - 1.0) + (a + 1.0) * cos_w0) / a0,
            a2: ((a + 1.0) + (a - 1.0) * cos_w0 - shelf) / a0,
        }
    }

    fn high_shelf(freq_hz: f32, gain_db: f32, sample_rate_hz: f32) -> Self {
        let a = 10.0_f32.powf(gain_db / 40.0);
        let w0 = std::f32::consts::TAU * freq_hz / sample_rate_hz;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / 2.0 * std::f32::consts::SQRT_2;
        let shelf = 2.0 * a.sqrt() * alpha;

        let a0 = (a + 1.0) - (a - 1.0) * cos_w0 + shelf;
        Self {
            b0: a * ((a + 1.0) + (a - 1.0) * cos_w0 + shelf) / a0,
            b1: -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w0) / a0,
            b2: a * ((a + 1.0) + (a - 1.0) * cos_w0 - shelf) / a0,
            a1: 2.0 * ((a - 1.0) - (a + 1.0) * cos_w0) / a0,
            a2: ((a + 1.0) - (a - 1.0) * cos_w0 - shelf) / a0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Biquad {
    coefficients: Coefficients,
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl Biquad {
    fn new(coefficients: Coefficients) -> Self {
        Self {
            coefficients,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    fn process(&mut self, input: f32) -> f32 {
        let c = self.coefficients;
        let output =
            c.b0 * input + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;
        output
    }

    fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

pub struct BassTrebleBoost<S> {
    inner: S,
    channels: usize,
    cursor: usize,
    bass: Vec<Biquad>,
    treble: Vec<Biquad>,
}

impl<S> BassTrebleBoost<S>
where
    S: Source<Item = f32>,
{
    /// Coefficients follow the source's initial span; local files keep one
    /// sample rate and channel layout throughout.
    pub fn new(inner: S) -> Self {
        let channels = usize::from(inner.channels()).max(1);
        let rate = inner.sample_rate() as f32;
        let bass = Biquad::new(Coefficients::low_shelf(BASS_FREQ_HZ, BASS_GAIN_DB, rate));
        let treble = Biquad::new(Coefficients::high_shelf(
            TREBLE_FREQ_HZ,
            TREBLE_GAIN_DB,
            rate,
        ));

        Self {
            inner,
            channels,
            cursor: 0,
            bass: vec![bass; channels],
            treble: vec![treble; channels],
        }
    }
}

impl<S> Iterator for BassTrebleBoost<S>
where
    S: Source<Item = f32>,
{
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        let sample = self.inner.next()?;
        let channel = self.cursor;
        self.cursor = (self.cursor + 1) % self.channels;
        Some(self.treble[channel].process(self.bass[channel].process(sample)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<S> Source for BassTrebleBoost<S>
where
    S: Source<Item = f32>,
{
    fn current_span_len(&self) -> Option<usize> {
        self.inner.current_span_len()
    }

    fn channels(&self) -> ChannelCount {
        self.inner.channels()
    }

    fn sample_rate(&self) -> SampleRate {
        self.inner.sample_rate()
    }

    fn total_duration(&self) -> Option<Duration> {
        self.inner.total_duration()
    }

    fn try_seek(&mut self, position: Duration) -> Result<(), SeekError> {
        self.inner.try_seek(position)?;
        self.cursor = 0;
        for stage in self.bass.iter_mut().chain(self.treble.iter_mut()) {
            stage.reset();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rodio::buffer::SamplesBuffer;

    #[test]
    fn low_shelf_boosts_dc_by_its_gain() {
        let mut stage = Biquad::new(Coefficients::low_shelf(250.0, 4.0, 48_000.0));
        let mut output = 0.0;
        for _ in 0..48_000 {
            output = stage.process(1.0);
        }
        // Steady-state amplitude gain at DC is 10^(gain_db / 20).
        let expected = 10.0_f32.powf(4.0 / 20.0);
        assert!(
            (output - expected).abs() < 0.05,
            "dc gain {output} vs {expected}"
        );
    }

    #[test]
    fn high_shelf_leaves_dc_untouched() {
        let mut stage = Biquad::new(Coefficients::high_shelf(4_000.0, 3.0, 48_000.0));
        let mut output = 0.0;
        for _ in 0..48_000 {
            output = stage.process(1.0);
        }
        assert!((output - 1.0).abs() < 0.05, "dc gain {output}");
    }

    #[test]
    fn filtered_source_keeps_the_stream_shape() {
        let samples = vec![0.25_f32; 4_410 * 2];
        let source = SamplesBuffer::new(2, 44_100, samples);
        let filtered = BassTrebleBoost::new(source);

        assert_eq!(filtered.channels(), 2);
        assert_eq!(filtered.sample_rate(), 44_100);

        let output: Vec<f32> = filtered.collect();
        assert_eq!(output.len(), 4_410 * 2);
        assert!(output.iter().all(|sample| sample.is_finite()));
    }
}
