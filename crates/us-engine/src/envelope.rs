//! Attack/sustain/release envelope generator.

/// Envelope phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EnvelopeStage {
    #[default]
    Idle,
    Attack,
    Sustain,
    Release,
}

/// Controller-derived envelope settings, shared by a voice's layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnvelopeParams {
    /// Added to the ramp every update during attack.
    pub attack: u16,
    /// Subtracted from the ramp every update during release.
    pub release: u16,
    /// Output ceiling (0-255) applied to the raw ramp.
    pub sustain: u8,
    /// Hold at the top of the ramp while the gate is on.
    pub sustain_enabled: bool,
}

impl Default for EnvelopeParams {
    fn default() -> Self {
        Self { attack: u16::MAX, release: u16::MAX, sustain: 254, sustain_enabled: true }
    }
}

/// Runtime state of one envelope.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Envelope {
    pub stage: EnvelopeStage,
    /// Raw 16-bit ramp.
    pub value: u16,
    /// Ramp scaled by the sustain ceiling.
    pub output: u16,
}

impl Envelope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return to idle with a zero ramp.
    pub fn reset(&mut self) {
        self.stage = EnvelopeStage::Idle;
        self.value = 0;
    }

    /// Make at most one stage transition and advance the ramp.
    pub fn advance(&mut self, params: &EnvelopeParams, gate: bool) -> u16 {
        match self.stage {
            EnvelopeStage::Idle => {
                if gate {
                    self.stage = EnvelopeStage::Attack;
                }
            }
            EnvelopeStage::Attack => {
                if !gate {
                    self.stage = EnvelopeStage::Release;
                } else {
                    match self.value.checked_add(params.attack) {
                        Some(v) if v < u16::MAX => self.value = v,
                        _ => {
                            self.value = u16::MAX;
                            self.stage = EnvelopeStage::Sustain;
                        }
                    }
                }
            }
            EnvelopeStage::Sustain => {
                if !gate || !params.sustain_enabled {
                    self.stage = EnvelopeStage::Release;
                }
            }
            EnvelopeStage::Release => {
                if gate {
                    // fast retrigger
                    self.value = 0;
                    self.stage = EnvelopeStage::Attack;
                } else if self.value <= params.release {
                    self.value = 0;
                    self.stage = EnvelopeStage::Idle;
                } else {
                    self.value -= params.release;
                }
            }
        }

        self.output = us_ir::mul_high_u16_u8(self.value, params.sustain);
        self.output
    }
}
