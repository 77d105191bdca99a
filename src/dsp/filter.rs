use std::{f64::consts::PI, str::FromStr};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::Error;

/*
Third-Order Butterworth Filter
==============================

| type      | passes       | rejects      | rolloff        |
| --------- | ------------ | ------------ | -------------- |
| low-pass  | below cutoff | above cutoff | 18 dB / octave |
| high-pass | above cutoff | below cutoff | 18 dB / octave |

The analog prototype is the normalised third-order Butterworth polynomial

    H(s) = 1 / ((s + 1)(s² + s + 1))

split into a first-order section and a second-order section with Q = 1.
Each section is mapped to the z-plane with the bilinear transform using a
pre-warped cutoff K = tan(π·fc/fs), and the two sections are multiplied
into one set of four b / four a coefficients.

The recursion runs in transposed direct form II. Its three state values
(`z`) are the only memory of the filter and are carried from one block to
the next; resetting them between blocks restarts the filter from rest and
produces a discontinuity at every block boundary.
*/

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    LowPass,
    HighPass,
}

impl FromStr for FilterType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" | "lowpass" | "low-pass" => Ok(Self::LowPass),
            "high" | "highpass" | "high-pass" => Ok(Self::HighPass),
            _ => Err(Error::UnknownFilterType(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ButterworthFilter {
    b: [f64; 4],
    a: [f64; 4],
    z: [f64; 3],

    cutoff_hz: f32,
    sample_rate: f32,
    filter_type: FilterType,
}

impl ButterworthFilter {
    /// Cutoff must lie strictly between 0 and Nyquist.
    pub fn new(filter_type: FilterType, cutoff_hz: f32, sample_rate: f32) -> Self {
        let mut filter = Self {
            b: [0.0; 4],
            a: [1.0, 0.0, 0.0, 0.0],
            z: [0.0; 3],
            cutoff_hz,
            sample_rate,
            filter_type,
        };
        filter.design();
        filter
    }

    pub fn lowpass(cutoff_hz: f32, sample_rate: f32) -> Self {
        Self::new(FilterType::LowPass, cutoff_hz, sample_rate)
    }

    pub fn highpass(cutoff_hz: f32, sample_rate: f32) -> Self {
        Self::new(FilterType::HighPass, cutoff_hz, sample_rate)
    }

    fn design(&mut self) {
        let k = (PI * f64::from(self.cutoff_hz) / f64::from(self.sample_rate)).tan();
        let k2 = k * k;

        // First-order section
        let a1 = [1.0, (k - 1.0) / (k + 1.0)];
        let b1 = match self.filter_type {
            FilterType::LowPass => [k / (k + 1.0), k / (k + 1.0)],
            FilterType::HighPass => [1.0 / (k + 1.0), -1.0 / (k + 1.0)],
        };

        // Second-order section, Q = 1
        let norm = 1.0 / (1.0 + k + k2);
        let a2 = [1.0, 2.0 * (k2 - 1.0) * norm, (1.0 - k + k2) * norm];
        let b2 = match self.filter_type {
            FilterType::LowPass => [k2 * norm, 2.0 * k2 * norm, k2 * norm],
            FilterType::HighPass => [norm, -2.0 * norm, norm],
        };

        self.b = convolve(b1, b2);
        self.a = convolve(a1, a2);
    }

    #[inline]
    pub fn process(&mut self, sample: f32) -> f32 {
        let x = f64::from(sample);
        let [b0, b1, b2, b3] = self.b;
        let [_, a1, a2, a3] = self.a;

        let y = b0 * x + self.z[0];
        self.z[0] = b1 * x - a1 * y + self.z[1];
        self.z[1] = b2 * x - a2 * y + self.z[2];
        self.z[2] = b3 * x - a3 * y;
        y as f32
    }

    /// Filter `buffer` in place, continuing from the state left by the
    /// previous call.
    pub fn render(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    pub fn reset(&mut self) {
        self.z = [0.0; 3];
    }

    /// Redesign the coefficients; the running state is kept.
    pub fn set_cutoff(&mut self, cutoff_hz: f32) {
        self.cutoff_hz = cutoff_hz;
        self.design();
    }

    pub fn cutoff_hz(&self) -> f32 {
        self.cutoff_hz
    }

    pub fn filter_type(&self) -> FilterType {
        self.filter_type
    }

    /// Linear gain of the filter at `frequency` Hz.
    pub fn magnitude_response(&self, frequency: f32) -> f32 {
        let w = 2.0 * PI * f64::from(frequency) / f64::from(self.sample_rate);
        let eval = |coeffs: &[f64; 4]| {
            let (mut re, mut im) = (0.0, 0.0);
            for (n, c) in coeffs.iter().enumerate() {
                let angle = -(n as f64) * w;
                re += c * angle.cos();
                im += c * angle.sin();
            }
            (re * re + im * im).sqrt()
        };
        (eval(&self.b) / eval(&self.a)) as f32
    }
}

fn convolve(first: [f64; 2], second: [f64; 3]) -> [f64; 4] {
    [
        first[0] * second[0],
        first[0] * second[1] + first[1] * second[0],
        first[0] * second[2] + first[1] * second[1],
        first[1] * second[2],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::oscillator::OscillatorBlock;

    const SAMPLE_RATE: f32 = 48_000.0;

    fn peak_after_transient(buffer: &[f32]) -> f32 {
        let skip = buffer.len() / 2;
        buffer[skip..].iter().fold(0.0f32, |acc, &x| acc.max(x.abs()))
    }

    fn sine(frequency: f32, len: usize) -> Vec<f32> {
        let mut osc = OscillatorBlock::sine();
        let mut buffer = vec![0.0f32; len];
        osc.render(&mut buffer, frequency, SAMPLE_RATE);
        buffer
    }

    #[test]
    fn lowpass_passes_dc() {
        let mut filter = ButterworthFilter::lowpass(500.0, SAMPLE_RATE);
        let mut buffer = vec![1.0; 2048];
        filter.render(&mut buffer);

        assert!((buffer[2047] - 1.0).abs() < 1e-3, "got {}", buffer[2047]);
    }

    #[test]
    fn highpass_blocks_dc() {
        let mut filter = ButterworthFilter::highpass(500.0, SAMPLE_RATE);
        let mut buffer = vec![1.0; 2048];
        filter.render(&mut buffer);

        assert!(buffer[2047].abs() < 1e-3, "got {}", buffer[2047]);
    }

    #[test]
    fn lowpass_attenuates_high_frequencies() {
        let mut filter = ButterworthFilter::lowpass(500.0, SAMPLE_RATE);
        let mut buffer = sine(5_000.0, 2048);
        filter.render(&mut buffer);

        // A decade above cutoff, third order: about -60 dB
        let peak = peak_after_transient(&buffer);
        assert!(peak < 0.01, "expected strong attenuation, got peak {peak}");
    }

    #[test]
    fn highpass_passes_high_frequencies() {
        let mut filter = ButterworthFilter::highpass(200.0, SAMPLE_RATE);
        let mut buffer = sine(4_000.0, 2048);
        filter.render(&mut buffer);

        let peak = peak_after_transient(&buffer);
        assert!(peak > 0.95, "expected passband gain near unity, got {peak}");
    }

    #[test]
    fn cutoff_is_half_power_point() {
        for filter in [
            ButterworthFilter::lowpass(1_000.0, SAMPLE_RATE),
            ButterworthFilter::highpass(1_000.0, SAMPLE_RATE),
        ] {
            let gain = filter.magnitude_response(1_000.0);
            assert!(
                (gain - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-3,
                "{:?} gain at cutoff was {gain}",
                filter.filter_type()
            );
        }
    }

    #[test]
    fn state_carries_across_blocks() {
        let input = sine(400.0, 1024);

        let mut whole = ButterworthFilter::lowpass(800.0, SAMPLE_RATE);
        let mut one_pass = input.clone();
        whole.render(&mut one_pass);

        let mut chunked = ButterworthFilter::lowpass(800.0, SAMPLE_RATE);
        let mut in_blocks = input.clone();
        for block in in_blocks.chunks_mut(64) {
            chunked.render(block);
        }

        let mut restarted = input.clone();
        for block in restarted.chunks_mut(64) {
            let mut fresh = ButterworthFilter::lowpass(800.0, SAMPLE_RATE);
            fresh.render(block);
        }

        assert_eq!(one_pass, in_blocks);
        let difference = one_pass
            .iter()
            .zip(&restarted)
            .fold(0.0f32, |acc, (a, b)| acc.max((a - b).abs()));
        assert!(difference > 1e-3, "restarting each block should differ, max diff {difference}");
    }

    #[test]
    fn set_cutoff_keeps_state() {
        let mut filter = ButterworthFilter::lowpass(1_000.0, SAMPLE_RATE);
        let mut buffer = vec![1.0; 64];
        filter.render(&mut buffer);
        let before = filter.z;

        filter.set_cutoff(2_000.0);
        assert_eq!(filter.z, before);
        assert!((filter.cutoff_hz() - 2_000.0).abs() < f32::EPSILON);
    }

    #[test]
    fn parses_filter_types() {
        assert_eq!("low".parse::<FilterType>().unwrap(), FilterType::LowPass);
        assert_eq!("highpass".parse::<FilterType>().unwrap(), FilterType::HighPass);
        assert!("band".parse::<FilterType>().is_err());
    }
}
