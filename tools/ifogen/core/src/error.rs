use thiserror::Error;

use crate::grid::GRID_COLUMNS;

#[derive(Error, Debug)]
pub enum CompileError {
    #[error("row count must be at least 1")]
    NoRows,

    #[error("rows per bank must be at least 1")]
    EmptyBank,

    #[error("{row_count} rows from row {first_row} run past the last screen row")]
    RowRangeOverflow { first_row: u16, row_count: u16 },

    #[error("caption {text:?} at row {row}, column {col} runs past column {}", GRID_COLUMNS - 1)]
    CaptionOverflow { text: String, row: u16, col: u16 },

    #[error("caption {text:?} contains non-ASCII character {ch:?}")]
    NonAsciiCaption { text: String, ch: char },

    #[error("captions overlap at row {row}, column {col}")]
    CaptionOverlap { row: u16, col: u16 },

    #[error("invalid row pattern: {0}")]
    InvalidPattern(String),

    #[error("field width of {bits} bits is out of range")]
    InvalidWidth { bits: u8 },

    #[error("cell address {address} does not fit in {bits} bits")]
    AddressOverflow { address: usize, bits: u8 },

    #[error("offset {offset:#x} does not fit in the {bits}-bit secondary field")]
    OffsetOverflow { offset: u32, bits: u8 },

    #[error("bank {bank} holds {entries} entries but the table depth is {depth}")]
    TableOverflow { bank: usize, entries: usize, depth: usize },

    #[error("no bank {bank}; the table has {banks}")]
    NoSuchBank { bank: usize, banks: usize },

    #[error("pipeline violation at slot {slot}: {reason}")]
    Pipeline { slot: usize, reason: String },

    #[error("failed to write table: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode table: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum HexError {
    #[error("line {line}: record does not start with ':'")]
    MissingStartCode { line: usize },

    #[error("line {line}: record is too short")]
    Truncated { line: usize },

    #[error("line {line}: invalid hex digits: {source}")]
    Digits {
        line: usize,
        #[source]
        source: hex::FromHexError,
    },

    #[error("line {line}: declared {declared} data bytes but found {found}")]
    LengthMismatch { line: usize, declared: u8, found: usize },

    #[error("line {line}: checksum {found:#04x} does not match computed {expected:#04x}")]
    Checksum { line: usize, expected: u8, found: u8 },

    #[error("line {line}: unknown record type {kind:#04x}")]
    UnknownRecordType { line: usize, kind: u8 },

    #[error("boot image holds {len} bytes, capacity is {capacity}")]
    ImageTooLarge { len: usize, capacity: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
