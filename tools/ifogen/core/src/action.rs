use serde::{Deserialize, Serialize};

use crate::grid::ScreenCell;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Nibble {
    High,
    Low,
}

impl Nibble {
    #[inline(always)]
    pub fn of(self, byte: u8) -> u8 {
        match self {
            Nibble::High => byte >> 4,
            Nibble::Low => byte & 0x0F,
        }
    }
}

/// Where a painted value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataSource {
    Literal,
    FetchedByte,
    CursorAddress,
}

/// A display write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Paint {
    /// Whole caption character.
    Literal { byte: u8 },
    /// Hex nibble of the byte requested at `read_slot`.
    Fetched { nibble: Nibble, read_slot: usize },
    /// Hex nibble of the display address `offset`, resolved by the hardware
    /// against its base address.
    CursorAddress { nibble: Nibble, offset: u32 },
}

impl Paint {
    pub fn source(&self) -> DataSource {
        match self {
            Paint::Literal { .. } => DataSource::Literal,
            Paint::Fetched { .. } => DataSource::FetchedByte,
            Paint::CursorAddress { .. } => DataSource::CursorAddress,
        }
    }

    pub fn nibble(&self) -> Option<Nibble> {
        match *self {
            Paint::Literal { .. } => None,
            Paint::Fetched { nibble, .. } | Paint::CursorAddress { nibble, .. } => Some(nibble),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Idle,
    MemRead,
    PaintByte,
    /// Low nibble paint that also requests the next byte.
    PaintAndRead,
}

/// What one slot does. Slot and cell coincide: `slot == cell.address()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Action {
    pub slot: usize,
    pub cell: ScreenCell,
    pub bank: usize,
    pub paint: Option<Paint>,
    /// Prefetch offset requested on this slot.
    pub read: Option<u32>,
}

impl Action {
    pub fn idle(cell: ScreenCell, bank: usize) -> Self {
        Self {
            slot: cell.address(),
            cell,
            bank,
            paint: None,
            read: None,
        }
    }

    pub fn kind(&self) -> ActionKind {
        match (self.paint.is_some(), self.read.is_some()) {
            (false, false) => ActionKind::Idle,
            (false, true) => ActionKind::MemRead,
            (true, false) => ActionKind::PaintByte,
            (true, true) => ActionKind::PaintAndRead,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.kind() == ActionKind::Idle
    }

    /// Cell written by this slot, if it writes one.
    pub fn target_cell(&self) -> Option<ScreenCell> {
        self.paint.map(|_| self.cell)
    }

    pub fn nibble(&self) -> Option<Nibble> {
        self.paint.and_then(|p| p.nibble())
    }

    pub fn data_source(&self) -> Option<DataSource> {
        self.paint.map(|p| p.source())
    }
}
