use core::fmt;

use serde::{Deserialize, Serialize};

/// Character columns per display row.
pub const GRID_COLUMNS: u16 = 60;

/// One character position on the 60-column text grid.
///
/// Field order matters: the derived `Ord` is row-major, which is also slot order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScreenCell {
    pub row: u16,
    pub col: u16,
}

impl ScreenCell {
    pub fn new(row: u16, col: u16) -> Option<Self> {
        if col < GRID_COLUMNS {
            Some(Self { row, col })
        } else {
            None
        }
    }

    /// Linear video address, `row * 60 + col`. Doubles as the slot index.
    #[inline(always)]
    pub fn address(&self) -> usize {
        self.row as usize * GRID_COLUMNS as usize + self.col as usize
    }

    #[inline(always)]
    pub fn from_slot(slot: usize) -> Self {
        Self {
            row: (slot / GRID_COLUMNS as usize) as u16,
            col: (slot % GRID_COLUMNS as usize) as u16,
        }
    }
}

impl fmt::Display for ScreenCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_columns_past_the_grid() {
        assert!(ScreenCell::new(0, 59).is_some());
        assert!(ScreenCell::new(0, 60).is_none());
    }

    #[test]
    fn slot_and_address_agree() {
        let cell = ScreenCell::new(9, 4).unwrap();
        assert_eq!(cell.address(), 544);
        assert_eq!(ScreenCell::from_slot(544), cell);
    }

    #[test]
    fn ordering_is_row_major() {
        let a = ScreenCell { row: 1, col: 59 };
        let b = ScreenCell { row: 2, col: 0 };
        assert!(a < b);
        assert!(a.address() < b.address());
    }
}
