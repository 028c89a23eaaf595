//! Pipeline scheduler.
//!
//! Walks the scheduled rows slot by slot and decides, from the slot's column,
//! whether it requests a byte, paints a nibble of the byte in flight, or idles.
//! The memory port is single-buffered: a byte is requested, its high nibble is
//! painted, and the low-nibble slot both finishes it and requests the next
//! byte. The last byte of a row issues no read, so every row (and therefore
//! every bank) ends with the pipeline drained.

use log::{debug, trace};

use crate::action::{Action, Nibble, Paint};
use crate::config::CompilerConfig;
use crate::error::CompileError;
use crate::grid::{GRID_COLUMNS, ScreenCell};
use crate::layout::LayoutPlan;

/// Minimum slots between a read and the high-nibble paint of its byte.
pub const HIGH_NIBBLE_LATENCY: usize = 1;
/// Minimum slots between a read and the low-nibble paint that retires it.
pub const LOW_NIBBLE_LATENCY: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotRole {
    Idle,
    /// First read of the row.
    Read { byte: usize },
    High { byte: usize },
    /// Low nibble of `byte`, fused with the read for `next`. `next` is `None`
    /// on the row terminator.
    Low { byte: usize, next: Option<usize> },
    Label(Nibble),
}

fn row_plan(config: &CompilerConfig) -> Vec<SlotRole> {
    let pattern = &config.pattern;
    let mut plan = vec![SlotRole::Idle; GRID_COLUMNS as usize];
    let last = pattern.bytes_per_row() - 1;

    plan[pattern.read_column as usize] = SlotRole::Read { byte: 0 };
    for (byte, &col) in pattern.byte_columns.iter().enumerate() {
        let next = (byte < last).then_some(byte + 1);
        plan[col as usize] = SlotRole::High { byte };
        plan[col as usize + 1] = SlotRole::Low { byte, next };
    }

    if config.address_labels {
        let [high, low] = pattern.label_columns;
        plan[high as usize] = SlotRole::Label(Nibble::High);
        plan[low as usize] = SlotRole::Label(Nibble::Low);
    }

    plan
}

/// Scheduler-private progress through the address space and banks.
#[derive(Debug)]
struct ScheduleCursor {
    current_address: u64,
    current_bank: usize,
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    slot: usize,
    offset: u32,
}

/// Tracks the one byte the memory port may have outstanding.
#[derive(Debug, Default)]
struct Pipeline {
    in_flight: Option<InFlight>,
}

fn violation(slot: usize, reason: String) -> CompileError {
    CompileError::Pipeline { slot, reason }
}

impl Pipeline {
    fn issue(&mut self, slot: usize, offset: u32) -> Result<(), CompileError> {
        if let Some(pending) = self.in_flight {
            return Err(violation(
                slot,
                format!(
                    "read of {:#x} issued while the byte read at slot {} is unconsumed",
                    offset, pending.slot
                ),
            ));
        }
        trace!("slot {}: read {:#x}", slot, offset);
        self.in_flight = Some(InFlight { slot, offset });
        Ok(())
    }

    fn fetched(&self, slot: usize, offset: u32, latency: usize) -> Result<InFlight, CompileError> {
        let fetch = self.in_flight.ok_or_else(|| {
            violation(slot, format!("paint of {:#x} with no byte in flight", offset))
        })?;
        if fetch.offset != offset {
            return Err(violation(
                slot,
                format!("paint of {:#x} but {:#x} is in flight", offset, fetch.offset),
            ));
        }
        if slot < fetch.slot + latency {
            return Err(violation(
                slot,
                format!("byte read at slot {} is not available yet", fetch.slot),
            ));
        }
        Ok(fetch)
    }

    /// High nibble: looks at the byte in flight without retiring it.
    fn high(&self, slot: usize, offset: u32) -> Result<usize, CompileError> {
        self.fetched(slot, offset, HIGH_NIBBLE_LATENCY).map(|f| f.slot)
    }

    /// Low nibble: retires the byte in flight.
    fn low(&mut self, slot: usize, offset: u32) -> Result<usize, CompileError> {
        let fetch = self.fetched(slot, offset, LOW_NIBBLE_LATENCY)?;
        self.in_flight = None;
        Ok(fetch.slot)
    }

    fn drain(&self, slot: usize) -> Result<(), CompileError> {
        match self.in_flight {
            None => Ok(()),
            Some(pending) => Err(violation(
                slot,
                format!("byte read at slot {} is still in flight", pending.slot),
            )),
        }
    }
}

/// One action per scheduled slot, plus where each bank begins.
#[derive(Debug, Clone)]
pub struct ScheduleOutput {
    pub actions: Vec<Action>,
    /// First slot of every bank, ascending.
    pub bank_starts: Vec<usize>,
    /// Cursor value after the last row.
    pub final_address: u64,
}

pub(crate) struct PipelineScheduler<'a> {
    config: &'a CompilerConfig,
    layout: &'a LayoutPlan,
    plan: Vec<SlotRole>,
}

impl<'a> PipelineScheduler<'a> {
    /// `config` must already be validated; the layout decides which bytes are
    /// hidden behind captions.
    pub(crate) fn new(config: &'a CompilerConfig, layout: &'a LayoutPlan) -> Self {
        Self { config, layout, plan: row_plan(config) }
    }

    pub(crate) fn run(&self) -> Result<ScheduleOutput, CompileError> {
        let rows = self.config.scheduled_rows();
        let first_slot = rows.start as usize * GRID_COLUMNS as usize;
        let end_slot = rows.end as usize * GRID_COLUMNS as usize;

        let mut cursor = ScheduleCursor {
            current_address: self.config.start_address as u64,
            current_bank: 0,
        };
        let mut pipeline = Pipeline::default();
        let mut actions = Vec::with_capacity(end_slot - first_slot);
        let mut bank_starts = vec![first_slot];

        for (i, row) in rows.enumerate() {
            let row_slot = row as usize * GRID_COLUMNS as usize;

            if i > 0 && self.config.rows_per_bank.is_some_and(|n| i % n as usize == 0) {
                // banks are separate ROMs; nothing may be in flight across the seam
                pipeline.drain(row_slot)?;
                debug!("sealed bank {} before slot {}", cursor.current_bank, row_slot);
                cursor.current_bank += 1;
                bank_starts.push(row_slot);
            }

            self.schedule_row(row, &mut cursor, &mut pipeline, &mut actions)?;
        }

        pipeline.drain(end_slot)?;

        Ok(ScheduleOutput {
            actions,
            bank_starts,
            final_address: cursor.current_address,
        })
    }

    fn schedule_row(
        &self,
        row: u16,
        cursor: &mut ScheduleCursor,
        pipeline: &mut Pipeline,
        actions: &mut Vec<Action>,
    ) -> Result<(), CompileError> {
        let row_address = cursor.current_address;
        let occupied = |col: u16| self.layout.is_occupied(ScreenCell { row, col });

        // a byte with either nibble under a caption is neither read nor painted
        let masked: Vec<bool> = self
            .config
            .pattern
            .byte_columns
            .iter()
            .map(|&col| occupied(col) || occupied(col + 1))
            .collect();
        let byte_offset = |byte: usize| (row_address + byte as u64) as u32;

        for (col, role) in self.plan.iter().enumerate() {
            let cell = ScreenCell { row, col: col as u16 };
            let slot = cell.address();
            let mut action = Action::idle(cell, cursor.current_bank);

            match *role {
                SlotRole::Idle => {}
                SlotRole::Label(nibble) => {
                    if !occupied(cell.col) {
                        action.paint = Some(Paint::CursorAddress { nibble, offset: row_address as u32 });
                    }
                }
                SlotRole::Read { byte } => {
                    if !masked[byte] {
                        let offset = cursor.current_address as u32;
                        pipeline.issue(slot, offset)?;
                        action.read = Some(offset);
                    }
                }
                SlotRole::High { byte } => {
                    if !masked[byte] {
                        let read_slot = pipeline.high(slot, byte_offset(byte))?;
                        action.paint = Some(Paint::Fetched { nibble: Nibble::High, read_slot });
                    }
                }
                SlotRole::Low { byte, next } => {
                    if !masked[byte] {
                        let read_slot = pipeline.low(slot, byte_offset(byte))?;
                        action.paint = Some(Paint::Fetched { nibble: Nibble::Low, read_slot });
                    }

                    cursor.current_address += 1;

                    if next.is_some_and(|n| !masked[n]) {
                        let offset = cursor.current_address as u32;
                        pipeline.issue(slot, offset)?;
                        action.read = Some(offset);
                    }
                }
            }

            actions.push(action);
        }

        debug!(
            "row {} (bank {}) displays {:#x}..{:#x}",
            row, cursor.current_bank, row_address, cursor.current_address
        );
        Ok(())
    }
}
