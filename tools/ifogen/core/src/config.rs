//! Compiler configuration.
//!
//! Every display variant (flat single table, captioned, multi-bank) is a
//! [`CompilerConfig`]. The default reproduces the stock info screen: a 16 byte
//! hex dump on screen rows 9 through 16, appended after ten hand-written table
//! entries.

use serde::{Deserialize, Serialize};

use crate::compiler::Compiler;
use crate::error::CompileError;
use crate::grid::{GRID_COLUMNS, ScreenCell};
use crate::layout::Caption;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerConfig {
    /// Screen row of the first scheduled row.
    pub first_row: u16,
    pub row_count: u16,
    /// Seal a bank after this many rows. `None` keeps everything in one table.
    pub rows_per_bank: Option<u16>,
    /// Prefetch offset of the first displayed byte.
    pub start_address: u32,
    /// Index of the first generated entry in bank 0.
    pub first_index: usize,
    /// Paint each row's starting address in the label columns.
    pub address_labels: bool,
    pub pattern: RowPattern,
    pub encoding: Encoding,
    pub captions: Vec<Caption>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            first_row: 9,
            row_count: 8,
            rows_per_bank: None,
            start_address: 0,
            first_index: 10,
            address_labels: false,
            pattern: RowPattern::default(),
            encoding: Encoding::default(),
            captions: Vec::new(),
        }
    }
}

impl CompilerConfig {
    pub fn builder() -> CompilerBuilder {
        CompilerBuilder::default()
    }

    pub fn bank_count(&self) -> usize {
        match self.rows_per_bank {
            Some(per_bank) if per_bank > 0 => self.row_count.div_ceil(per_bank) as usize,
            _ => 1,
        }
    }

    /// Bank that owns a screen row. Rows outside the scheduled block go to the
    /// nearest bank.
    pub fn bank_of_row(&self, row: u16) -> usize {
        let Some(per_bank) = self.rows_per_bank.filter(|n| *n > 0) else {
            return 0;
        };
        let relative = row.saturating_sub(self.first_row) / per_bank;
        (relative as usize).min(self.bank_count() - 1)
    }

    /// Screen rows covered by the schedule.
    pub fn scheduled_rows(&self) -> core::ops::Range<u16> {
        self.first_row..self.first_row.saturating_add(self.row_count)
    }

    /// Prefetch offset of the last byte the schedule displays.
    pub fn last_offset(&self) -> u64 {
        let bytes = self.pattern.bytes_per_row() as u64 * self.row_count as u64;
        (self.start_address as u64 + bytes).saturating_sub(1)
    }

    /// Checks everything that does not depend on captions. Captions are checked
    /// by the layout planner.
    pub fn validate(&self) -> Result<(), CompileError> {
        if self.row_count == 0 {
            return Err(CompileError::NoRows);
        }
        if self.rows_per_bank == Some(0) {
            return Err(CompileError::EmptyBank);
        }
        if self.first_row.checked_add(self.row_count).is_none() {
            return Err(CompileError::RowRangeOverflow {
                first_row: self.first_row,
                row_count: self.row_count,
            });
        }

        self.pattern.validate(self.address_labels)?;
        self.encoding.validate()?;

        let end_row = self.first_row as usize + self.row_count as usize;
        let last_cell = end_row * GRID_COLUMNS as usize - 1;
        self.encoding.check_address(last_cell)?;

        // the terminator never reads past the last displayed byte, but that byte
        // still has to be addressable
        let last = self.last_offset();
        if last > u32::MAX as u64 {
            return Err(CompileError::OffsetOverflow { offset: u32::MAX, bits: 32 });
        }
        self.encoding.check_offset(last as u32)?;

        Ok(())
    }
}

/// Per-row slot layout of the hex dump.
///
/// Byte `k` has its high nibble painted at `byte_columns[k]` and its low
/// nibble one column later. Byte 0 is read at `read_column`; byte `k > 0` is
/// read on the low-nibble slot of byte `k - 1`. The last byte's low-nibble
/// slot is the row terminator and issues no read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RowPattern {
    pub read_column: u16,
    pub byte_columns: Vec<u16>,
    /// High and low nibble columns for the row address label.
    pub label_columns: [u16; 2],
}

impl Default for RowPattern {
    fn default() -> Self {
        Self {
            read_column: 2,
            byte_columns: vec![
                4, 6, 8, 10, //
                13, 15, 17, 19, //
                23, 25, 27, 29, //
                32, 34, 36, 38,
            ],
            label_columns: [0, 1],
        }
    }
}

impl RowPattern {
    pub fn bytes_per_row(&self) -> usize {
        self.byte_columns.len()
    }

    /// Column that issues the read for byte `k`.
    pub fn read_column_of(&self, k: usize) -> u16 {
        if k == 0 {
            self.read_column
        } else {
            self.byte_columns[k - 1] + 1
        }
    }

    pub fn validate(&self, with_labels: bool) -> Result<(), CompileError> {
        let invalid = |reason: String| Err(CompileError::InvalidPattern(reason));

        let (Some(&first), Some(&last)) = (self.byte_columns.first(), self.byte_columns.last())
        else {
            return invalid("no byte columns".into());
        };
        if self.read_column >= first {
            return invalid(format!(
                "read column {} must come before the first byte column {}",
                self.read_column, first
            ));
        }
        if last + 1 >= GRID_COLUMNS {
            return invalid(format!("low nibble of column {} falls off the row", last));
        }
        for pair in self.byte_columns.windows(2) {
            // one slot between the fused read and the next high nibble
            if pair[1] < pair[0] + 2 {
                return invalid(format!(
                    "byte columns {} and {} overlap; the next high nibble needs a slot after the read",
                    pair[0], pair[1]
                ));
            }
        }

        if with_labels {
            let [high, low] = self.label_columns;
            if high == low {
                return invalid(format!("label columns are both {}", high));
            }
            for col in self.label_columns {
                if col >= GRID_COLUMNS {
                    return invalid(format!("label column {} is off the grid", col));
                }
                if col == self.read_column || self.paints_column(col) {
                    return invalid(format!("label column {} is already scheduled", col));
                }
            }
        }

        Ok(())
    }

    fn paints_column(&self, col: u16) -> bool {
        self.byte_columns.iter().any(|&c| c == col || c + 1 == col)
    }
}

/// Shape of the serialized table row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Encoding {
    pub table_name: String,
    /// Width of the video address field.
    pub address_bits: u8,
    /// Width of the prefetch-difference / display-offset field.
    pub diff_bits: u8,
    /// Entries available in one physical bank.
    pub rom_depth: Option<usize>,
}

impl Default for Encoding {
    fn default() -> Self {
        Self {
            table_name: "show_info_rom".to_string(),
            address_bits: 10,
            diff_bits: 8,
            rom_depth: None,
        }
    }
}

impl Encoding {
    fn validate(&self) -> Result<(), CompileError> {
        for bits in [self.address_bits, self.diff_bits] {
            if bits == 0 || bits > 32 {
                return Err(CompileError::InvalidWidth { bits });
            }
        }
        Ok(())
    }

    pub fn check_address(&self, address: usize) -> Result<(), CompileError> {
        if fits(address as u64, self.address_bits) {
            Ok(())
        } else {
            Err(CompileError::AddressOverflow { address, bits: self.address_bits })
        }
    }

    pub fn check_offset(&self, offset: u32) -> Result<(), CompileError> {
        if fits(offset as u64, self.diff_bits) {
            Ok(())
        } else {
            Err(CompileError::OffsetOverflow { offset, bits: self.diff_bits })
        }
    }

    /// Hex digits needed to print the secondary field.
    pub fn diff_digits(&self) -> usize {
        (self.diff_bits as usize).div_ceil(4)
    }
}

fn fits(value: u64, bits: u8) -> bool {
    bits >= 64 || value < (1u64 << bits)
}

/// Chained setters over [`CompilerConfig`].
#[derive(Debug, Clone, Default)]
pub struct CompilerBuilder {
    config: CompilerConfig,
}

impl CompilerBuilder {
    pub fn rows(mut self, row_count: u16) -> Self {
        self.config.row_count = row_count;
        self
    }

    pub fn first_row(mut self, row: u16) -> Self {
        self.config.first_row = row;
        self
    }

    pub fn rows_per_bank(mut self, rows: u16) -> Self {
        self.config.rows_per_bank = Some(rows);
        self
    }

    pub fn start_address(mut self, address: u32) -> Self {
        self.config.start_address = address;
        self
    }

    pub fn first_index(mut self, index: usize) -> Self {
        self.config.first_index = index;
        self
    }

    pub fn address_labels(mut self, enabled: bool) -> Self {
        self.config.address_labels = enabled;
        self
    }

    pub fn pattern(mut self, pattern: RowPattern) -> Self {
        self.config.pattern = pattern;
        self
    }

    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.config.encoding = encoding;
        self
    }

    pub fn caption(mut self, text: impl Into<String>, row: u16, col: u16) -> Self {
        self.config.captions.push(Caption::new(text, ScreenCell { row, col }));
        self
    }

    pub fn captions(mut self, captions: impl IntoIterator<Item = Caption>) -> Self {
        self.config.captions.extend(captions);
        self
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn build(self) -> Result<Compiler, CompileError> {
        Compiler::new(self.config)
    }
}

impl From<CompilerConfig> for CompilerBuilder {
    fn from(config: CompilerConfig) -> Self {
        Self { config }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pattern_has_sixteen_bytes() {
        let pattern = RowPattern::default();
        assert_eq!(pattern.bytes_per_row(), 16);
        assert_eq!(pattern.read_column_of(0), 2);
        assert_eq!(pattern.read_column_of(1), 5);
        assert_eq!(pattern.read_column_of(15), 37);
        pattern.validate(true).unwrap();
    }

    #[test]
    fn default_config_matches_stock_screen() {
        let config = CompilerConfig::default();
        config.validate().unwrap();
        assert_eq!(config.scheduled_rows(), 9..17);
        assert_eq!(config.last_offset(), 127);
        assert_eq!(config.bank_count(), 1);
    }

    #[test]
    fn zero_rows_is_rejected() {
        let config = CompilerConfig { row_count: 0, ..Default::default() };
        assert!(matches!(config.validate(), Err(CompileError::NoRows)));
    }

    #[test]
    fn zero_bank_size_is_rejected() {
        let config = CompilerConfig { rows_per_bank: Some(0), ..Default::default() };
        assert!(matches!(config.validate(), Err(CompileError::EmptyBank)));
    }

    #[test]
    fn row_range_past_u16_is_rejected() {
        let config = CompilerConfig {
            first_row: 65530,
            row_count: 10,
            encoding: Encoding { address_bits: 32, ..Default::default() },
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CompileError::RowRangeOverflow { first_row: 65530, row_count: 10 })
        ));

        let config = CompilerConfig { row_count: 5, ..config };
        assert!(config.validate().is_ok());
        assert_eq!(config.scheduled_rows().len(), 5);
    }

    #[test]
    fn empty_pattern_is_rejected() {
        let config = CompilerConfig {
            pattern: RowPattern { byte_columns: Vec::new(), ..Default::default() },
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(CompileError::InvalidPattern(_))));
    }

    #[test]
    fn bank_count_rounds_up() {
        let config = CompilerConfig {
            first_row: 0,
            row_count: 25,
            rows_per_bank: Some(10),
            ..Default::default()
        };
        assert_eq!(config.bank_count(), 3);
        assert_eq!(config.bank_of_row(0), 0);
        assert_eq!(config.bank_of_row(9), 0);
        assert_eq!(config.bank_of_row(10), 1);
        assert_eq!(config.bank_of_row(24), 2);
        assert_eq!(config.bank_of_row(40), 2);
    }

    #[test]
    fn prefetch_past_diff_field_is_rejected() {
        // 17 rows * 16 bytes reaches offset 0x10f
        let config = CompilerConfig { first_row: 0, row_count: 17, ..Default::default() };
        assert!(matches!(
            config.validate(),
            Err(CompileError::OffsetOverflow { offset: 0x10f, bits: 8 })
        ));
    }

    #[test]
    fn cells_past_address_field_are_rejected() {
        let config = CompilerConfig {
            first_row: 16,
            row_count: 2,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CompileError::AddressOverflow { address: 1079, bits: 10 })
        ));
    }

    #[test]
    fn crowded_byte_columns_are_rejected() {
        let pattern = RowPattern {
            byte_columns: vec![4, 5, 8],
            ..Default::default()
        };
        assert!(matches!(pattern.validate(false), Err(CompileError::InvalidPattern(_))));
    }

    #[test]
    fn read_after_first_byte_is_rejected() {
        let pattern = RowPattern {
            read_column: 4,
            ..Default::default()
        };
        assert!(matches!(pattern.validate(false), Err(CompileError::InvalidPattern(_))));
    }

    #[test]
    fn labels_cannot_land_on_scheduled_columns() {
        let pattern = RowPattern {
            label_columns: [1, 2],
            ..Default::default()
        };
        assert!(pattern.validate(false).is_ok());
        assert!(matches!(pattern.validate(true), Err(CompileError::InvalidPattern(_))));
    }

    #[test]
    fn config_reads_from_json() {
        let config: CompilerConfig = serde_json::from_str(
            r#"{ "row_count": 2, "rows_per_bank": 1, "captions": [{ "text": "PC", "row": 8, "col": 0 }] }"#,
        )
        .unwrap();
        assert_eq!(config.row_count, 2);
        assert_eq!(config.first_row, 9);
        assert_eq!(config.captions[0].anchor, ScreenCell { row: 8, col: 0 });
    }
}
