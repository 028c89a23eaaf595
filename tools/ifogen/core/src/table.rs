//! Table serializer.
//!
//! Merges caption literals into the scheduled slots, encodes each non-idle
//! action as one table row and renders the rows per bank.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};

use crate::action::{Action, Nibble, Paint};
use crate::config::{CompilerConfig, Encoding};
use crate::error::CompileError;
use crate::layout::LayoutPlan;

/// Folds the literal cells into the scheduler's slots. A caption character
/// replaces whatever the slot would have painted; a read on the same slot is
/// kept. Idle slots are dropped. The result is in slot order.
pub fn merge(scheduled: Vec<Action>, layout: &LayoutPlan, config: &CompilerConfig) -> Vec<Action> {
    let mut slots: BTreeMap<usize, Action> = scheduled
        .into_iter()
        .filter(|a| !a.is_idle())
        .map(|a| (a.slot, a))
        .collect();

    for literal in layout.cells() {
        let bank = config.bank_of_row(literal.cell.row);
        let action = slots
            .entry(literal.cell.address())
            .or_insert_with(|| Action::idle(literal.cell, bank));
        action.paint = Some(Paint::Literal { byte: literal.byte });
    }

    slots.into_values().collect()
}

/// Hardware meaning of the value field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ValueType {
    FetchedHigh = 0,
    FetchedLow = 1,
    Literal = 2,
    AddressHigh = 3,
    AddressLow = 4,
}

impl ValueType {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// One entry of the lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRow {
    pub index: usize,
    /// Video address, 0 on read-only slots.
    pub address: usize,
    pub value_type: ValueType,
    pub value: u8,
    /// Prefetch offset on reads, display offset on address paints.
    pub secondary: u32,
    pub display_write: bool,
    pub memory_read: bool,
}

impl TableRow {
    pub fn encode(index: usize, action: &Action) -> Self {
        let (value_type, value, display_offset) = match action.paint {
            None => (ValueType::FetchedHigh, 0, None),
            Some(Paint::Fetched { nibble: Nibble::High, .. }) => (ValueType::FetchedHigh, 0, None),
            Some(Paint::Fetched { nibble: Nibble::Low, .. }) => (ValueType::FetchedLow, 0, None),
            Some(Paint::Literal { byte }) => (ValueType::Literal, byte, None),
            Some(Paint::CursorAddress { nibble, offset }) => {
                let value_type = match nibble {
                    Nibble::High => ValueType::AddressHigh,
                    Nibble::Low => ValueType::AddressLow,
                };
                (value_type, 0, Some(offset))
            }
        };
        debug_assert!(
            action.read.is_none() || display_offset.is_none(),
            "slot {} needs the secondary field twice",
            action.slot
        );

        Self {
            index,
            address: if action.paint.is_some() { action.cell.address() } else { 0 },
            value_type,
            value,
            secondary: action.read.or(display_offset).unwrap_or(0),
            display_write: action.paint.is_some(),
            memory_read: action.read.is_some(),
        }
    }
}

/// The rows of one physical bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankTable {
    pub bank: usize,
    pub rows: Vec<TableRow>,
}

impl BankTable {
    /// Splits a merged, slot-ordered sequence into `bank_count` tables. Bank 0
    /// is numbered from `first_index`, later banks from 0.
    pub fn split(actions: &[Action], bank_count: usize, first_index: usize) -> Vec<BankTable> {
        let mut banks: Vec<BankTable> = (0..bank_count)
            .map(|bank| BankTable { bank, rows: Vec::new() })
            .collect();

        for action in actions {
            let table = &mut banks[action.bank];
            let base = if table.bank == 0 { first_index } else { 0 };
            let index = base + table.rows.len();
            table.rows.push(TableRow::encode(index, action));
        }

        banks
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableFormat {
    /// `name[i] = '{ ... };` assignment lines
    #[default]
    SystemVerilog,
    Json,
}

impl TableFormat {
    pub fn render<W: Write>(
        self,
        table: &BankTable,
        encoding: &Encoding,
        out: &mut W,
    ) -> Result<(), CompileError> {
        match self {
            TableFormat::SystemVerilog => render_sv(table, encoding, out),
            TableFormat::Json => {
                serde_json::to_writer_pretty(&mut *out, &JsonBank { name: &encoding.table_name, table })?;
                writeln!(out)?;
                Ok(())
            }
        }
    }
}

#[derive(Serialize)]
struct JsonBank<'a> {
    name: &'a str,
    #[serde(flatten)]
    table: &'a BankTable,
}

fn render_sv<W: Write>(table: &BankTable, encoding: &Encoding, out: &mut W) -> Result<(), CompileError> {
    let name = &encoding.table_name;
    let abits = encoding.address_bits;
    let dbits = encoding.diff_bits;
    let digits = encoding.diff_digits();

    for row in &table.rows {
        writeln!(
            out,
            "{}[{}] = '{{ v_ada: {}'d{}, v_din_t: {}, v_din: {}, adb_diff: {}'h{:0digits$X}, vram_write: {}, mem_read: {}}};",
            name,
            row.index,
            abits,
            row.address,
            row.value_type.code(),
            row.value,
            dbits,
            row.secondary,
            row.display_write as u8,
            row.memory_read as u8,
        )?;
    }
    Ok(())
}

/// Output of a full compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledTables {
    pub banks: Vec<BankTable>,
    pub encoding: Encoding,
    /// Prefetch cursor after the last scheduled row.
    pub final_address: u64,
}

impl CompiledTables {
    pub fn entry_count(&self) -> usize {
        self.banks.iter().map(|b| b.rows.len()).sum()
    }

    pub fn render<W: Write>(&self, bank: usize, format: TableFormat, out: &mut W) -> Result<(), CompileError> {
        let table = self
            .banks
            .get(bank)
            .ok_or(CompileError::NoSuchBank { bank, banks: self.banks.len() })?;
        format.render(table, &self.encoding, out)
    }

    /// Renders bank `bank` to a string.
    pub fn to_text(&self, bank: usize, format: TableFormat) -> Result<String, CompileError> {
        let mut buf = Vec::new();
        self.render(bank, format, &mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Writes every bank, one file each. A single bank goes to `path` itself;
    /// otherwise bank N goes to `<stem>_bankN.<ext>` beside it.
    pub fn write_files(&self, path: &Path, format: TableFormat) -> Result<Vec<PathBuf>, CompileError> {
        let mut written = Vec::with_capacity(self.banks.len());

        for table in &self.banks {
            let target = bank_path(path, table.bank, self.banks.len());
            let mut out = BufWriter::new(File::create(&target)?);
            format.render(table, &self.encoding, &mut out)?;
            out.flush()?;

            info!("bank {}: {} entries -> {}", table.bank, table.rows.len(), target.display());
            written.push(target);
        }

        Ok(written)
    }
}

pub fn bank_path(path: &Path, bank: usize, bank_count: usize) -> PathBuf {
    if bank_count <= 1 {
        return path.to_path_buf();
    }

    let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}_bank{}.{}", stem, bank, ext.to_string_lossy()),
        None => format!("{}_bank{}", stem, bank),
    };
    path.with_file_name(name)
}
