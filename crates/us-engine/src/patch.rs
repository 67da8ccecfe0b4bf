//! Program loading from a patch record table.

use us_ir::{cc, ControlTable, PatchRecord, RecordKind, DEFAULTS_PROGRAM};

/// Factory patch table: the defaults group and three programs.
pub static DEFAULT_PATCHES: &[PatchRecord] = &[
    // Applied before every program
    PatchRecord::defaults(),
    PatchRecord::both(cc::OSC_WAVETABLE, 0),
    PatchRecord::both(cc::OSC_BASE_WAVE, 64),
    PatchRecord::both(cc::OSC_DETUNE, 64),
    PatchRecord::both(cc::OSC_VOLUME, 127),
    PatchRecord::both(cc::OSC_PITCH, 64),
    PatchRecord::both(cc::AMP_ATTACK, 0),
    PatchRecord::both(cc::AMP_SUSTAIN, 127),
    PatchRecord::both(cc::AMP_RELEASE, 0),
    PatchRecord::both(cc::AMP_ASR, 1),
    PatchRecord::both(cc::EG_ATTACK, 0),
    PatchRecord::both(cc::EG_SUSTAIN, 127),
    PatchRecord::both(cc::EG_RELEASE, 0),
    PatchRecord::both(cc::EG_ASR, 1),
    PatchRecord::both(cc::EG_MOD_INT, 64),
    PatchRecord::both(cc::EG_PITCH_INT, 64),
    PatchRecord::both(cc::LFO_RATE, 64),
    PatchRecord::both(cc::LFO_WAVE, 0),
    PatchRecord::both(cc::LFO_FADE, 0),
    PatchRecord::both(cc::LFO_MOD_INT, 64),
    PatchRecord::both(cc::LFO_PITCH_INT, 64),
    PatchRecord::set(cc::CUTOFF, 127),
    PatchRecord::set(cc::POLY, 127),
    // Program 0: marimba
    PatchRecord::begin(0),
    PatchRecord::both(cc::OSC_WAVETABLE, 2),
    PatchRecord::both(cc::OSC_BASE_WAVE, 0),
    PatchRecord::both(cc::AMP_RELEASE, 91),
    PatchRecord::both(cc::EG_SUSTAIN, 90),
    PatchRecord::both(cc::EG_RELEASE, 76),
    PatchRecord::both(cc::EG_ASR, 0),
    PatchRecord::both(cc::EG_MOD_INT, 127),
    // Program 1: morpher
    PatchRecord::begin(1),
    PatchRecord::both(cc::OSC_WAVETABLE, 3),
    PatchRecord::both(cc::OSC_BASE_WAVE, 102),
    PatchRecord::both(cc::AMP_ATTACK, 15),
    PatchRecord::both(cc::AMP_RELEASE, 108),
    PatchRecord::both(cc::EG_RELEASE, 114),
    PatchRecord::both(cc::EG_ASR, 0),
    PatchRecord::both(cc::EG_MOD_INT, 0),
    PatchRecord::set(cc::CUTOFF, 104),
    // Program 2: detuned unison pad with vibrato
    PatchRecord::begin(2),
    PatchRecord::both(cc::OSC_WAVETABLE, 1),
    PatchRecord::set(cc::pair(cc::OSC_DETUNE, 1), 72),
    PatchRecord::both(cc::AMP_ATTACK, 70),
    PatchRecord::both(cc::AMP_RELEASE, 100),
    PatchRecord::both(cc::LFO_RATE, 30),
    PatchRecord::both(cc::LFO_FADE, 80),
    PatchRecord::both(cc::LFO_PITCH_INT, 70),
    PatchRecord::both(cc::LFO_MOD_INT, 90),
    PatchRecord::set(cc::CUTOFF, 90),
    PatchRecord::set(cc::POLY, 0),
    PatchRecord::end(),
];

/// Read-only view of a patch record table.
#[derive(Clone, Copy, Debug)]
pub struct PatchTable<'a> {
    records: &'a [PatchRecord],
}

impl<'a> PatchTable<'a> {
    pub const fn new(records: &'a [PatchRecord]) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &'a [PatchRecord] {
        self.records
    }

    /// Apply the defaults group, then program `id`.
    ///
    /// Returns whether `id` was found. When it is not, the controls hold
    /// the defaults only.
    pub fn load_program(&self, controls: &mut ControlTable, id: u8) -> bool {
        if id != DEFAULTS_PROGRAM {
            self.load_program(controls, DEFAULTS_PROGRAM);
        }

        let mut found = false;
        for record in self.records {
            match record.kind() {
                RecordKind::End => break,
                RecordKind::Begin(_) if found => break,
                RecordKind::Begin(group) => found = group == id,
                RecordKind::Set { index, paired } if found => apply_set(controls, index, paired, record.value),
                RecordKind::Set { .. } => {}
            }
        }
        found
    }

    /// Whether the table has a group for `id`.
    pub fn contains(&self, id: u8) -> bool {
        self.records.iter().any(|r| r.kind() == RecordKind::Begin(id))
    }

    /// Program ids in table order, excluding the defaults group.
    pub fn programs(&self) -> impl Iterator<Item = u8> + 'a {
        self.records
            .iter()
            .take_while(|r| r.kind() != RecordKind::End)
            .filter_map(|r| match r.kind() {
                RecordKind::Begin(id) if id != DEFAULTS_PROGRAM => Some(id),
                _ => None,
            })
    }
}

/// Write one record's value, and its partner when paired. Controller 127
/// has no partner.
fn apply_set(controls: &mut ControlTable, index: u8, paired: bool, value: u8) {
    controls.set(index, value);
    if paired && index < 0x7f {
        controls.set(index + 1, value);
    }
}

impl Default for PatchTable<'static> {
    fn default() -> Self {
        Self::new(DEFAULT_PATCHES)
    }
}
