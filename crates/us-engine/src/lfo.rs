//! Low-frequency modulation oscillator.
//!
//! A reflecting triangle core with a gated fade-in accumulator that scales
//! its output.

use us_ir::mul_high_s16_u16;

/// LFO output shape.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LfoWaveform {
    #[default]
    Triangle,
    Square,
}

/// Controller-derived LFO settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LfoParams {
    /// Triangle step per update.
    pub step: i16,
    pub waveform: LfoWaveform,
    /// Added to the fade accumulator per gated update.
    pub fade_step: u16,
}

impl Default for LfoParams {
    fn default() -> Self {
        Self { step: 0, waveform: LfoWaveform::Triangle, fade_step: u16::MAX }
    }
}

/// Runtime state of one LFO.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Lfo {
    /// Triangle core.
    pub value: i16,
    /// Direction of the triangle core.
    pub rising: bool,
    /// Fade-in amplitude.
    pub fade: u16,
    pub output: i16,
}

impl Lfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-centre the core. The core resumes falling from zero.
    pub fn sync(&mut self) {
        self.value = 0;
        self.output = 0;
        self.rising = false;
    }

    /// Restart the fade-in.
    pub fn reset_fade(&mut self) {
        self.fade = 0;
    }

    /// Advance the core and fade by one update.
    pub fn advance(&mut self, params: &LfoParams, gate: bool) -> i16 {
        self.step_triangle(params.step);

        if gate {
            self.fade = self.fade.saturating_add(params.fade_step);
        }

        self.output = match params.waveform {
            LfoWaveform::Triangle => mul_high_s16_u16(self.value, self.fade),
            LfoWaveform::Square => {
                let half = (self.fade >> 1) as i16;
                if self.value > 0 {
                    half
                } else {
                    -half
                }
            }
        };
        self.output
    }

    /// Move the core by `step`, folding any overshoot back from the extreme.
    fn step_triangle(&mut self, step: i16) {
        let step = step as i32;
        let max = i16::MAX as i32;
        let min = i16::MIN as i32;
        let value = self.value as i32;

        if self.rising {
            let next = value + step;
            if next > max {
                self.value = (max - (next - max)) as i16;
                self.rising = false;
            } else {
                self.value = next as i16;
            }
        } else {
            let next = value - step;
            if next < min {
                self.value = (min + (min - next)) as i16;
                self.rising = true;
            } else {
                self.value = next as i16;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle(step: i16) -> LfoParams {
        LfoParams { step, waveform: LfoWaveform::Triangle, fade_step: u16::MAX }
    }

    #[test]
    fn folds_back_at_positive_extreme() {
        let mut lfo = Lfo { value: i16::MAX - 7, rising: true, ..Lfo::new() };
        lfo.advance(&triangle(20), true);
        // overshoot of 13 reflected below the maximum
        assert_eq!(lfo.value, i16::MAX - 13);
        assert!(!lfo.rising);
    }

    #[test]
    fn folds_back_at_negative_extreme() {
        let mut lfo = Lfo { value: i16::MIN + 5, rising: false, ..Lfo::new() };
        lfo.advance(&triangle(20), true);
        assert_eq!(lfo.value, i16::MIN + 15);
        assert!(lfo.rising);
    }

    #[test]
    fn never_wraps_over_many_cycles() {
        let p = triangle(800);
        let mut lfo = Lfo::new();
        let mut prev = lfo.value as i32;
        for _ in 0..10_000 {
            lfo.advance(&p, true);
            let delta = (lfo.value as i32 - prev).abs();
            assert!(delta <= 800, "jump of {}", delta);
            prev = lfo.value as i32;
        }
    }

    #[test]
    fn fade_accumulates_only_while_gated() {
        let p = LfoParams { fade_step: 30_000, ..triangle(10) };
        let mut lfo = Lfo::new();
        lfo.advance(&p, false);
        assert_eq!(lfo.fade, 0);
        assert_eq!(lfo.output, 0);
        lfo.advance(&p, true);
        assert_eq!(lfo.fade, 30_000);
        lfo.advance(&p, true);
        lfo.advance(&p, true);
        assert_eq!(lfo.fade, u16::MAX);
        lfo.reset_fade();
        assert_eq!(lfo.fade, 0);
    }

    #[test]
    fn square_outputs_half_fade_by_sign() {
        let p = LfoParams { waveform: LfoWaveform::Square, ..triangle(100) };
        let mut lfo = Lfo { value: 1000, rising: true, ..Lfo::new() };
        assert_eq!(lfo.advance(&p, true), (u16::MAX >> 1) as i16);
        let mut lfo = Lfo { value: -1000, rising: false, ..Lfo::new() };
        assert_eq!(lfo.advance(&p, true), -((u16::MAX >> 1) as i16));
    }

    #[test]
    fn triangle_output_scaled_by_fade() {
        let p = LfoParams { fade_step: 0x8000, ..triangle(0) };
        let mut lfo = Lfo { value: 0x4000, ..Lfo::new() };
        assert_eq!(lfo.advance(&p, true), 0x2000);
    }

    #[test]
    fn sync_recentres_core() {
        let mut lfo = Lfo { value: 1234, rising: true, output: 99, fade: 500 };
        lfo.sync();
        assert_eq!((lfo.value, lfo.output, lfo.rising), (0, 0, false));
        assert_eq!(lfo.fade, 500);
    }
}
