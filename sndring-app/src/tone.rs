//! Square-wave tone standing in for an emulator's sound chip.

use sndring_core::Sample;

#[derive(Debug, Clone)]
pub struct SquareTone {
    /// Samples per half period, fixed-point 16.16.
    half_period: u64,
    phase: u64,
    amplitude: Sample,
}

impl SquareTone {
    pub fn new(sample_rate: u32, tone_hz: f32, volume: f32) -> Self {
        let half = f64::from(sample_rate) / (2.0 * f64::from(tone_hz.max(1.0)));
        Self {
            half_period: ((half * 65_536.0) as u64).max(65_536),
            phase: 0,
            amplitude: (f32::from(Sample::MAX) * volume.clamp(0.0, 1.0)) as Sample,
        }
    }

    /// Render `count` mono samples into `out` (cleared first).
    pub fn render(&mut self, out: &mut Vec<Sample>, count: usize) {
        out.clear();
        out.extend((0..count).map(|_| {
            let high = (self.phase / self.half_period) % 2 == 0;
            self.phase += 65_536;
            if high {
                self.amplitude
            } else {
                -self.amplitude
            }
        }));
    }
}
