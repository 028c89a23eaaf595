use log::info;

use crate::action::Action;
use crate::config::{CompilerBuilder, CompilerConfig};
use crate::error::CompileError;
use crate::layout::LayoutPlan;
use crate::schedule::{PipelineScheduler, ScheduleOutput};
use crate::table::{self, BankTable, CompiledTables};

/// A validated configuration, ready to compile.
///
/// All configuration errors surface from [`Compiler::new`], so a compiler that
/// exists only fails on invariant violations (and I/O, when writing).
#[derive(Debug, Clone)]
pub struct Compiler {
    config: CompilerConfig,
    layout: LayoutPlan,
}

impl Compiler {
    pub fn builder() -> CompilerBuilder {
        CompilerBuilder::default()
    }

    pub fn new(config: CompilerConfig) -> Result<Self, CompileError> {
        config.validate()?;
        let layout = LayoutPlan::new(&config.captions)?;
        for literal in layout.cells() {
            config.encoding.check_address(literal.cell.address())?;
        }
        Ok(Self { config, layout })
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn layout(&self) -> &LayoutPlan {
        &self.layout
    }

    /// Runs the pipeline scheduler alone: one action per scheduled slot.
    pub fn schedule(&self) -> Result<ScheduleOutput, CompileError> {
        PipelineScheduler::new(&self.config, &self.layout).run()
    }

    /// The merged, slot-ordered action sequence, idle slots removed.
    pub fn actions(&self) -> Result<Vec<Action>, CompileError> {
        let scheduled = self.schedule()?;
        Ok(table::merge(scheduled.actions, &self.layout, &self.config))
    }

    pub fn compile(&self) -> Result<CompiledTables, CompileError> {
        let scheduled = self.schedule()?;
        let final_address = scheduled.final_address;
        let actions = table::merge(scheduled.actions, &self.layout, &self.config);

        let banks = BankTable::split(&actions, self.config.bank_count(), self.config.first_index);
        if let Some(depth) = self.config.encoding.rom_depth {
            for table in &banks {
                // bank 0 also holds the reserved leading entries
                let entries = table.rows.last().map_or(0, |r| r.index + 1);
                if entries > depth {
                    return Err(CompileError::TableOverflow { bank: table.bank, entries, depth });
                }
            }
        }

        let tables = CompiledTables {
            banks,
            encoding: self.config.encoding.clone(),
            final_address,
        };
        info!(
            "compiled {} rows into {} entries across {} bank(s)",
            self.config.row_count,
            tables.entry_count(),
            tables.banks.len()
        );
        Ok(tables)
    }
}
