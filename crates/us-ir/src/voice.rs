//! Per-voice note state owned by the MIDI interpreter.

/// Maximum number of simultaneous voices.
pub const MAX_VOICES: usize = 4;

/// Number of parameter layers addressed by paired controllers.
pub const LAYERS: usize = 2;

/// Gate signal with a one-shot trigger bit.
///
/// The trigger bit is set together with the gate on every note-on and is
/// cleared once per scheduler cycle, so downstream stages see a fresh
/// attack exactly once.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Gate(u8);

impl Gate {
    const ON: u8 = 1 << 0;
    const TRIGGER: u8 = 1 << 1;

    /// Gate released.
    pub const OFF: Gate = Gate(0);
    /// Gate held, no pending trigger.
    pub const HELD: Gate = Gate(Self::ON);
    /// Gate held with a pending trigger.
    pub const TRIGGERED: Gate = Gate(Self::ON | Self::TRIGGER);

    /// Whether the note is held.
    pub fn is_on(self) -> bool {
        self.0 & Self::ON != 0
    }

    /// Whether this gate carries a trigger that has not been consumed yet.
    pub fn just_triggered(self) -> bool {
        self.0 & Self::TRIGGER != 0
    }

    /// Drop the trigger bit, leaving the held state untouched.
    pub fn clear_trigger(&mut self) {
        self.0 &= !Self::TRIGGER;
    }
}

/// A single voice slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Voice {
    /// MIDI note number (0-127).
    pub note: u8,
    /// Note-on velocity (0-127).
    pub velocity: u8,
    pub gate: Gate,
    /// NoteOn messages seen since this voice was assigned, saturating at 255.
    pub age: u8,
}

impl Voice {
    /// Whether the voice currently holds a note.
    pub fn is_active(&self) -> bool {
        self.gate.is_on()
    }
}
