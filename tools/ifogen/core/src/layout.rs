//! Layout planner: expands fixed captions into literal cell writes.

use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::CompileError;
use crate::grid::{GRID_COLUMNS, ScreenCell};

/// Fixed text anchored at a screen cell, written left to right.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caption {
    pub text: String,
    #[serde(flatten)]
    pub anchor: ScreenCell,
}

impl Caption {
    pub fn new(text: impl Into<String>, anchor: ScreenCell) -> Self {
        Self { text: text.into(), anchor }
    }
}

/// One character of a caption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiteralCell {
    pub cell: ScreenCell,
    pub byte: u8,
}

/// Every literal cell of a layout, in caption order.
#[derive(Debug, Clone, Default)]
pub struct LayoutPlan {
    cells: Vec<LiteralCell>,
    occupied: BTreeMap<ScreenCell, u8>,
}

impl LayoutPlan {
    /// Expands `captions`. Fails before producing anything if a caption leaves
    /// the grid, is not ASCII, or overlaps an earlier caption.
    pub fn new(captions: &[Caption]) -> Result<Self, CompileError> {
        let mut plan = Self::default();

        for caption in captions {
            let Caption { text, anchor } = caption;

            if let Some(ch) = text.chars().find(|c| !c.is_ascii()) {
                return Err(CompileError::NonAsciiCaption { text: text.clone(), ch });
            }

            let end = anchor.col as usize + text.len();
            if anchor.col >= GRID_COLUMNS || end > GRID_COLUMNS as usize {
                return Err(CompileError::CaptionOverflow {
                    text: text.clone(),
                    row: anchor.row,
                    col: anchor.col,
                });
            }

            for (i, byte) in text.bytes().enumerate() {
                let cell = ScreenCell { row: anchor.row, col: anchor.col + i as u16 };
                if plan.occupied.insert(cell, byte).is_some() {
                    return Err(CompileError::CaptionOverlap { row: cell.row, col: cell.col });
                }
                plan.cells.push(LiteralCell { cell, byte });
            }

            debug!("caption {:?} at {} ({} cells)", text, anchor, text.len());
        }

        Ok(plan)
    }

    pub fn cells(&self) -> &[LiteralCell] {
        &self.cells
    }

    pub fn is_occupied(&self, cell: ScreenCell) -> bool {
        self.occupied.contains_key(&cell)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caption(text: &str, row: u16, col: u16) -> Caption {
        Caption::new(text, ScreenCell { row, col })
    }

    #[test]
    fn expands_left_to_right_from_anchor() {
        let plan = LayoutPlan::new(&[caption("PC:", 3, 10)]).unwrap();
        let cells = plan.cells();
        assert_eq!(cells.len(), 3);
        assert_eq!(cells[0], LiteralCell { cell: ScreenCell { row: 3, col: 10 }, byte: b'P' });
        assert_eq!(cells[1].cell.col, 11);
        assert_eq!(cells[2], LiteralCell { cell: ScreenCell { row: 3, col: 12 }, byte: b':' });
    }

    #[test]
    fn keeps_caption_order() {
        let plan = LayoutPlan::new(&[caption("B", 5, 0), caption("A", 1, 0)]).unwrap();
        let bytes: Vec<u8> = plan.cells().iter().map(|c| c.byte).collect();
        assert_eq!(bytes, b"BA");
    }

    #[test]
    fn caption_may_end_on_last_column() {
        let plan = LayoutPlan::new(&[caption("XY", 0, 58)]).unwrap();
        assert!(plan.is_occupied(ScreenCell { row: 0, col: 59 }));
    }

    #[test]
    fn caption_past_last_column_fails() {
        let err = LayoutPlan::new(&[caption("XYZ", 0, 58)]).unwrap_err();
        assert!(matches!(err, CompileError::CaptionOverflow { row: 0, col: 58, .. }));
    }

    #[test]
    fn anchor_off_grid_fails() {
        let err = LayoutPlan::new(&[caption("", 0, 61)]).unwrap_err();
        assert!(matches!(err, CompileError::CaptionOverflow { .. }));
    }

    #[test]
    fn overlapping_captions_fail() {
        let err = LayoutPlan::new(&[caption("ABCD", 2, 0), caption("Z", 2, 3)]).unwrap_err();
        assert!(matches!(err, CompileError::CaptionOverlap { row: 2, col: 3 }));
    }

    #[test]
    fn non_ascii_fails() {
        let err = LayoutPlan::new(&[caption("µP", 0, 0)]).unwrap_err();
        assert!(matches!(err, CompileError::NonAsciiCaption { ch: 'µ', .. }));
    }
}
