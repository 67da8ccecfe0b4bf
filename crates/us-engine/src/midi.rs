//! MIDI byte-stream interpreter and voice allocator.
//!
//! Bytes are fed one at a time. Status bytes (high bit set) select the
//! running message and channel; data bytes are buffered until the message
//! is complete and then dispatched if the running channel is the one we
//! listen on. Completed messages are returned as [`MidiEvent`]s so the
//! caller can react without callbacks.

use us_ir::{cc, ControlTable, Gate, Voice, MAX_VOICES};

/// Byte that requests a full engine reset wherever it appears.
pub const RESET_BYTE: u8 = 0xff;

/// Pitch bend at rest.
pub const PITCH_BEND_CENTER: u16 = 8192;

/// Which gated voice to take when every voice is busy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StealPolicy {
    #[default]
    Oldest,
    Newest,
}

impl StealPolicy {
    /// Whether a voice of age `candidate` beats the current best.
    fn prefers(self, candidate: u8, best: u8) -> bool {
        match self {
            StealPolicy::Oldest => candidate > best,
            StealPolicy::Newest => candidate < best,
        }
    }
}

/// Message class of the running status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Status {
    NoteOff,
    NoteOn,
    ControlChange,
    ProgramChange,
    PitchBend,
    Unknown,
}

impl Status {
    fn from_byte(byte: u8) -> Self {
        match (byte >> 4) & 0x07 {
            0x0 => Status::NoteOff,
            0x1 => Status::NoteOn,
            0x3 => Status::ControlChange,
            0x4 => Status::ProgramChange,
            0x6 => Status::PitchBend,
            _ => Status::Unknown,
        }
    }

    fn data_len(self) -> u8 {
        match self {
            Status::NoteOff | Status::NoteOn | Status::ControlChange | Status::PitchBend => 2,
            Status::ProgramChange => 1,
            Status::Unknown => 0,
        }
    }
}

/// A completed message (or reset request) reported by [`MidiInterpreter::process_byte`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MidiEvent {
    /// `voices` is a bitmask of the voices that took the note; zero when
    /// another cluster member owns it.
    NoteOn { note: u8, velocity: u8, voices: u8 },
    NoteOff { note: u8 },
    /// The control table already holds the new value.
    ControlChange { index: u8, value: u8 },
    /// The caller loads the program.
    ProgramChange(u8),
    PitchBend(u16),
    Reset,
}

/// Parser state plus the per-channel data it maintains.
#[derive(Clone, Debug)]
pub struct MidiInterpreter {
    pub voices: [Voice; MAX_VOICES],
    pub controls: ControlTable,
    /// Currently loaded program.
    pub program: u8,
    /// 14-bit pitch bend, centre [`PITCH_BEND_CENTER`].
    pub pitch_bend: u16,

    voice_count: usize,
    listen_channel: u8,
    policy: StealPolicy,
    reset_requested: bool,
    cluster_counter: u8,

    status: Status,
    channel: u8,
    data: [u8; 2],
    count: u8,
}

impl MidiInterpreter {
    /// New interpreter listening on `listen_channel` (0-15) with
    /// `voice_count` voices (clamped to `1..=MAX_VOICES`). It starts in
    /// poly mode with every other controller at zero.
    pub fn new(listen_channel: u8, voice_count: usize, policy: StealPolicy) -> Self {
        let mut controls = ControlTable::new();
        controls.set(cc::POLY, 127);
        Self {
            voices: [Voice::default(); MAX_VOICES],
            controls,
            program: 0,
            pitch_bend: PITCH_BEND_CENTER,
            voice_count: voice_count.clamp(1, MAX_VOICES),
            listen_channel: listen_channel & 0x0f,
            policy,
            reset_requested: false,
            cluster_counter: 0,
            status: Status::Unknown,
            channel: 0,
            data: [0; 2],
            count: 0,
        }
    }

    pub fn voice_count(&self) -> usize {
        self.voice_count
    }

    pub fn listen_channel(&self) -> u8 {
        self.listen_channel
    }

    /// Whether a reset byte has been seen.
    pub fn reset_requested(&self) -> bool {
        self.reset_requested
    }

    /// Poly mode: one voice per note, all on layer A.
    pub fn is_poly(&self) -> bool {
        self.controls.get(cc::POLY) >= 64
    }

    /// Feed one byte from the stream.
    pub fn process_byte(&mut self, byte: u8) -> Option<MidiEvent> {
        if byte & 0x80 != 0 {
            self.status = Status::from_byte(byte);
            self.channel = byte & 0x0f;
            self.count = 0;
            if byte == RESET_BYTE {
                self.reset_requested = true;
                return Some(MidiEvent::Reset);
            }
            return None;
        }

        if self.channel != self.listen_channel {
            return None;
        }

        if let Some(slot) = self.data.get_mut(self.count as usize) {
            *slot = byte;
        }
        self.count += 1;
        if self.count < self.status.data_len() {
            return None;
        }
        // running status: the next data bytes repeat the message
        self.count = 0;
        self.dispatch()
    }

    /// Drop every voice's trigger bit. Called once per scheduler cycle.
    pub fn clear_triggers(&mut self) {
        for voice in &mut self.voices {
            voice.gate.clear_trigger();
        }
    }

    fn dispatch(&mut self) -> Option<MidiEvent> {
        let [d0, d1] = self.data;
        match self.status {
            Status::NoteOn => Some(self.note_on(d0, d1)),
            Status::NoteOff => {
                self.note_off(d0);
                Some(MidiEvent::NoteOff { note: d0 })
            }
            Status::ControlChange => {
                self.controls.set(d0, d1);
                Some(MidiEvent::ControlChange { index: d0 & 0x7f, value: d1 & 0x7f })
            }
            Status::ProgramChange => Some(MidiEvent::ProgramChange(d0)),
            Status::PitchBend => {
                self.pitch_bend = d0 as u16 | ((d1 as u16) << 7);
                Some(MidiEvent::PitchBend(self.pitch_bend))
            }
            Status::Unknown => None,
        }
    }

    /// Every NoteOn ages each voice by one, including notes left to
    /// another cluster board; the voices it lands on restart at zero.
    fn note_on(&mut self, note: u8, velocity: u8) -> MidiEvent {
        let voices = if self.owns_next_note() { self.allocate(note, velocity) } else { 0 };
        for (i, voice) in self.voices[..self.voice_count].iter_mut().enumerate() {
            voice.age = if voices & (1 << i) != 0 { 0 } else { voice.age.saturating_add(1) };
        }
        MidiEvent::NoteOn { note, velocity, voices }
    }

    /// Cluster arbitration: with `size > 1` boards sharing a channel, this
    /// board takes every `size`-th note starting at its id.
    fn owns_next_note(&mut self) -> bool {
        let size = self.controls.get(cc::CLUSTER_SIZE);
        if size <= 1 {
            return true;
        }
        let ours = self.cluster_counter % size == self.controls.get(cc::CLUSTER_ID);
        self.cluster_counter = (self.cluster_counter + 1) % size;
        ours
    }

    fn allocate(&mut self, note: u8, velocity: u8) -> u8 {
        let poly = self.is_poly();
        let policy = self.policy;
        let active = &mut self.voices[..self.voice_count];

        let slots: u8 = if poly {
            1 << select_voice(active, policy)
        } else {
            // unison: every voice takes the note
            (1u8 << active.len()) - 1
        };

        for (i, voice) in active.iter_mut().enumerate() {
            if slots & (1 << i) != 0 {
                *voice = Voice { note: note & 0x7f, velocity: velocity & 0x7f, gate: Gate::TRIGGERED, age: 0 };
            }
        }
        slots
    }

    fn note_off(&mut self, note: u8) {
        for voice in &mut self.voices[..self.voice_count] {
            if voice.note == note {
                voice.gate = Gate::OFF;
            }
        }
    }
}

/// Pick a voice for a new note: the best released voice if there is one,
/// otherwise the best held voice. Ties go to the lowest index.
fn select_voice(voices: &[Voice], policy: StealPolicy) -> usize {
    let mut free: Option<(usize, u8)> = None;
    let mut held: Option<(usize, u8)> = None;
    for (i, voice) in voices.iter().enumerate() {
        let best = if voice.is_active() { &mut held } else { &mut free };
        match *best {
            Some((_, age)) if !policy.prefers(voice.age, age) => {}
            _ => *best = Some((i, voice.age)),
        }
    }
    free.or(held).map_or(0, |(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(midi: &mut MidiInterpreter, bytes: &[u8]) -> Option<MidiEvent> {
        let mut last = None;
        for &b in bytes {
            if let Some(e) = midi.process_byte(b) {
                last = Some(e);
            }
        }
        last
    }

    fn gated(midi: &MidiInterpreter) -> usize {
        midi.voices.iter().filter(|v| v.is_active()).count()
    }

    #[test]
    fn note_on_on_listen_channel() {
        let mut midi = MidiInterpreter::new(1, 4, StealPolicy::Oldest);
        let event = feed(&mut midi, &[0x91, 60, 100]);
        assert_eq!(event, Some(MidiEvent::NoteOn { note: 60, velocity: 100, voices: 0b0001 }));
        assert_eq!(gated(&midi), 1);
        let v = midi.voices[0];
        assert_eq!((v.note, v.velocity), (60, 100));
        assert!(v.gate.just_triggered());
    }

    #[test]
    fn other_channels_are_ignored() {
        let mut midi = MidiInterpreter::new(1, 4, StealPolicy::Oldest);
        assert_eq!(feed(&mut midi, &[0x92, 60, 100]), None);
        assert_eq!(gated(&midi), 0);
    }

    #[test]
    fn steals_oldest_held_voice() {
        let mut midi = MidiInterpreter::new(0, 2, StealPolicy::Oldest);
        midi.voices[0] = Voice { note: 10, velocity: 1, gate: Gate::HELD, age: 5 };
        midi.voices[1] = Voice { note: 11, velocity: 1, gate: Gate::HELD, age: 3 };
        let event = feed(&mut midi, &[0x90, 70, 90]);
        assert_eq!(event, Some(MidiEvent::NoteOn { note: 70, velocity: 90, voices: 0b01 }));
        assert_eq!(midi.voices[0].note, 70);
        assert_eq!(midi.voices[0].age, 0);
        assert_eq!(midi.voices[1].age, 4);
    }

    #[test]
    fn newest_policy_steals_youngest() {
        let mut midi = MidiInterpreter::new(0, 2, StealPolicy::Newest);
        midi.voices[0] = Voice { note: 10, velocity: 1, gate: Gate::HELD, age: 5 };
        midi.voices[1] = Voice { note: 11, velocity: 1, gate: Gate::HELD, age: 3 };
        feed(&mut midi, &[0x90, 70, 90]);
        assert_eq!(midi.voices[1].note, 70);
        assert_eq!(midi.voices[0].age, 6);
    }

    #[test]
    fn released_voice_preferred_over_held() {
        let mut midi = MidiInterpreter::new(0, 3, StealPolicy::Oldest);
        midi.voices[0] = Voice { note: 1, velocity: 1, gate: Gate::HELD, age: 200 };
        midi.voices[1] = Voice { note: 2, velocity: 1, gate: Gate::OFF, age: 1 };
        midi.voices[2] = Voice { note: 3, velocity: 1, gate: Gate::OFF, age: 7 };
        feed(&mut midi, &[0x90, 50, 60]);
        assert_eq!(midi.voices[2].note, 50);
        assert_eq!(midi.voices[0].note, 1);
    }

    #[test]
    fn age_saturates_and_ties_go_to_lowest_index() {
        let mut midi = MidiInterpreter::new(0, 2, StealPolicy::Oldest);
        midi.voices[0] = Voice { note: 1, velocity: 1, gate: Gate::HELD, age: 255 };
        midi.voices[1] = Voice { note: 2, velocity: 1, gate: Gate::HELD, age: 255 };
        feed(&mut midi, &[0x90, 9, 9]);
        assert_eq!(midi.voices[0].note, 9);
        assert_eq!(midi.voices[1].age, 255);
    }

    #[test]
    fn note_off_releases_every_matching_voice() {
        let mut midi = MidiInterpreter::new(0, 4, StealPolicy::Oldest);
        feed(&mut midi, &[0x90, 60, 100, 60, 100, 62, 100]);
        assert_eq!(gated(&midi), 3);
        assert_eq!(feed(&mut midi, &[0x80, 60, 0]), Some(MidiEvent::NoteOff { note: 60 }));
        assert_eq!(gated(&midi), 1);
        assert_eq!(midi.voices[2].note, 62);
    }

    #[test]
    fn velocity_zero_is_still_note_on() {
        let mut midi = MidiInterpreter::new(0, 4, StealPolicy::Oldest);
        feed(&mut midi, &[0x90, 60, 0]);
        assert_eq!(gated(&midi), 1);
    }

    #[test]
    fn control_change_writes_masked_table() {
        let mut midi = MidiInterpreter::new(0, 4, StealPolicy::Oldest);
        let event = feed(&mut midi, &[0xb0, cc::CUTOFF, 99]);
        assert_eq!(event, Some(MidiEvent::ControlChange { index: cc::CUTOFF, value: 99 }));
        assert_eq!(midi.controls.get(cc::CUTOFF), 99);
    }

    #[test]
    fn program_change_and_pitch_bend() {
        let mut midi = MidiInterpreter::new(0, 4, StealPolicy::Oldest);
        assert_eq!(feed(&mut midi, &[0xc0, 5]), Some(MidiEvent::ProgramChange(5)));
        assert_eq!(midi.pitch_bend, PITCH_BEND_CENTER);
        assert_eq!(feed(&mut midi, &[0xe0, 0x01, 0x41]), Some(MidiEvent::PitchBend(0x41 << 7 | 1)));
        assert_eq!(midi.pitch_bend, 8321);
    }

    #[test]
    fn unknown_status_swallows_data() {
        let mut midi = MidiInterpreter::new(0, 4, StealPolicy::Oldest);
        // polyphonic aftertouch is not recognised
        assert_eq!(feed(&mut midi, &[0xa0, 60, 100, 1, 2, 3]), None);
        assert_eq!(gated(&midi), 0);
        assert_eq!(midi.controls.get(60), 0);
    }

    #[test]
    fn status_byte_resyncs_partial_message() {
        let mut midi = MidiInterpreter::new(0, 4, StealPolicy::Oldest);
        // NoteOn interrupted after its first data byte
        feed(&mut midi, &[0x90, 60]);
        assert_eq!(feed(&mut midi, &[0xb0, 7, 33]), Some(MidiEvent::ControlChange { index: 7, value: 33 }));
        assert_eq!(gated(&midi), 0);
    }

    #[test]
    fn reset_byte_mid_message() {
        let mut midi = MidiInterpreter::new(0, 4, StealPolicy::Oldest);
        assert!(!midi.reset_requested());
        assert_eq!(feed(&mut midi, &[0x90, 60, 0xff]), Some(MidiEvent::Reset));
        assert!(midi.reset_requested());
        assert_eq!(feed(&mut midi, &[100]), None);
        assert_eq!(gated(&midi), 0);
    }

    #[test]
    fn triggers_clear_independently_of_gate() {
        let mut midi = MidiInterpreter::new(0, 4, StealPolicy::Oldest);
        feed(&mut midi, &[0x90, 60, 100]);
        midi.clear_triggers();
        assert!(midi.voices[0].is_active());
        assert!(!midi.voices[0].gate.just_triggered());
    }

    #[test]
    fn unison_gates_every_voice() {
        let mut midi = MidiInterpreter::new(0, 3, StealPolicy::Oldest);
        feed(&mut midi, &[0xb0, cc::POLY, 0]);
        let event = feed(&mut midi, &[0x90, 48, 127]);
        assert_eq!(event, Some(MidiEvent::NoteOn { note: 48, velocity: 127, voices: 0b111 }));
        assert_eq!(gated(&midi), 3);
        assert!(!midi.voices[3].is_active());
    }

    #[test]
    fn cluster_member_takes_its_share() {
        let mut midi = MidiInterpreter::new(0, 4, StealPolicy::Oldest);
        feed(&mut midi, &[0xb0, cc::CLUSTER_SIZE, 2, cc::CLUSTER_ID, 1]);
        let mut taken = [0u8; 4];
        for (i, note) in [60u8, 61, 62, 63].iter().enumerate() {
            if let Some(MidiEvent::NoteOn { voices, .. }) = feed(&mut midi, &[0x90, *note, 100]) {
                taken[i] = voices;
            }
        }
        assert_eq!(taken[0], 0);
        assert_ne!(taken[1], 0);
        assert_eq!(taken[2], 0);
        assert_ne!(taken[3], 0);
        assert_eq!(gated(&midi), 2);
    }

    #[test]
    fn skipped_cluster_note_still_ages_voices() {
        let mut midi = MidiInterpreter::new(0, 2, StealPolicy::Oldest);
        feed(&mut midi, &[0xb0, cc::CLUSTER_SIZE, 2, cc::CLUSTER_ID, 1]);
        midi.voices[0] = Voice { note: 10, velocity: 1, gate: Gate::HELD, age: 5 };
        midi.voices[1] = Voice { note: 11, velocity: 1, gate: Gate::HELD, age: 3 };
        let event = feed(&mut midi, &[0x90, 70, 90]);
        assert_eq!(event, Some(MidiEvent::NoteOn { note: 70, velocity: 90, voices: 0 }));
        assert_eq!(midi.voices[0].age, 6);
        assert_eq!(midi.voices[1].age, 4);
        assert_eq!(midi.voices[0].note, 10);
    }

    #[test]
    fn unison_note_restarts_every_age() {
        let mut midi = MidiInterpreter::new(0, 2, StealPolicy::Oldest);
        feed(&mut midi, &[0xb0, cc::POLY, 0]);
        midi.voices[0] = Voice { note: 10, velocity: 1, gate: Gate::HELD, age: 5 };
        midi.voices[1] = Voice { note: 11, velocity: 1, gate: Gate::OFF, age: 3 };
        feed(&mut midi, &[0x90, 70, 90]);
        assert!(midi.voices[..2].iter().all(|v| v.age == 0 && v.note == 70));
    }
}
