//! Table generators for the CPU info display.
//!
//! The info screen is painted by a small state machine that walks a lookup
//! table, one entry per clock: request a memory byte, paint a hex nibble of the
//! byte it got back, or paint a caption character. This crate compiles that
//! table from a [`CompilerConfig`]:
//! - [`layout`] expands captions into literal cell writes
//! - [`schedule`] lays out the read/paint pipeline slot by slot
//! - [`table`] merges both and serializes one entry per action, per bank
//!
//! It also carries the two small converters the same build needs: [`ihex`]
//! (boot program ROM) and [`font`] (character ROM).

pub mod action;
pub mod compiler;
pub mod config;
pub mod error;
pub mod font;
pub mod grid;
pub mod ihex;
pub mod layout;
pub mod schedule;
pub mod table;

pub use action::{Action, ActionKind, DataSource, Nibble, Paint};
pub use compiler::Compiler;
pub use config::{CompilerBuilder, CompilerConfig, Encoding, RowPattern};
pub use error::{CompileError, HexError};
pub use grid::{GRID_COLUMNS, ScreenCell};
pub use layout::{Caption, LayoutPlan};
pub use table::{BankTable, CompiledTables, TableFormat, TableRow, ValueType};
