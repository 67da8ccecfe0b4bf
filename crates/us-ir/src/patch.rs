//! Patch table records.

/// Program id of the group applied before every program load.
pub const DEFAULTS_PROGRAM: u8 = 0xff;

/// One `(controller, value)` record of a patch table.
///
/// Two reserved controller values act as markers: [`PatchRecord::BEGIN`]
/// opens the group whose id is in `value`, [`PatchRecord::END`] terminates
/// the table. Bit 7 of an ordinary record's controller also writes the
/// controller one index higher.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PatchRecord {
    pub param: u8,
    pub value: u8,
}

impl PatchRecord {
    pub const BEGIN: u8 = 0xff;
    pub const END: u8 = 0xfe;
    pub const PAIRED: u8 = 0x80;

    /// Start of program `id`.
    pub const fn begin(id: u8) -> Self {
        Self { param: Self::BEGIN, value: id }
    }

    /// Start of the defaults group.
    pub const fn defaults() -> Self {
        Self::begin(DEFAULTS_PROGRAM)
    }

    /// End of the table.
    pub const fn end() -> Self {
        Self { param: Self::END, value: 0 }
    }

    /// Set a single controller.
    pub const fn set(param: u8, value: u8) -> Self {
        Self { param: param & 0x7f, value }
    }

    /// Set a controller and the one after it (both layers of a pair).
    pub const fn both(param: u8, value: u8) -> Self {
        Self { param: (param & 0x7f) | Self::PAIRED, value }
    }

    /// Marker kind of this record.
    pub fn kind(&self) -> RecordKind {
        match self.param {
            Self::BEGIN => RecordKind::Begin(self.value),
            Self::END => RecordKind::End,
            p => RecordKind::Set { index: p & 0x7f, paired: p & Self::PAIRED != 0 },
        }
    }
}

/// Decoded meaning of a [`PatchRecord`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordKind {
    Begin(u8),
    End,
    Set { index: u8, paired: bool },
}
