mod layout_file;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use ifogen_core::font::{DEFAULT_GLYPHS, Font};
use ifogen_core::ihex::BootImage;
use ifogen_core::{Compiler, CompilerBuilder, CompilerConfig, TableFormat};
use tracing::{Level, info};
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "ifogen")]
#[command(version, about = "CPU info display table generator", long_about = None)]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile the info screen schedule into show_info_rom tables
    Schedule {
        /// Layout file (TOML); the stock screen is used when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output path; multi-bank layouts get a _bankN suffix per bank
        #[arg(short, long, default_value = "cpu_ifo_auto_generated.sv")]
        output: PathBuf,

        #[arg(long, value_enum, default_value_t = Format::Sv)]
        format: Format,

        /// Number of display rows to schedule
        #[arg(long)]
        rows: Option<u16>,

        /// Screen row of the first scheduled row
        #[arg(long)]
        first_row: Option<u16>,

        /// Start a new bank every N rows
        #[arg(long)]
        rows_per_bank: Option<u16>,

        /// Prefetch offset of the first displayed byte, in hex
        #[arg(long, value_parser = parse_hex)]
        start_address: Option<u32>,
    },

    /// Convert an Intel HEX boot program to the boot_program ROM
    Boot {
        /// Path to the .hex file
        hexfile: PathBuf,

        /// Output .sv file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Dump an 8x16 bitmap font as character ROM memory
    Font {
        /// Path to the raw font file
        path: PathBuf,

        /// Output path (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of glyphs to keep
        #[arg(long, default_value_t = DEFAULT_GLYPHS)]
        glyphs: usize,

        /// Print every glyph as ASCII art to stderr
        #[arg(long)]
        preview: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// SystemVerilog assignments
    Sv,
    Json,
}

impl From<Format> for TableFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Sv => TableFormat::SystemVerilog,
            Format::Json => TableFormat::Json,
        }
    }
}

fn parse_hex(s: &str) -> Result<u32, String> {
    let digits = s.trim_start_matches("0x").trim_start_matches("0X");
    u32::from_str_radix(digits, 16).map_err(|e| format!("invalid hex address {:?}: {}", s, e))
}

fn setup_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .compact()
        .finish()
        .init();
}

struct Overrides {
    rows: Option<u16>,
    first_row: Option<u16>,
    rows_per_bank: Option<u16>,
    start_address: Option<u32>,
}

fn build_compiler(config: Option<&Path>, overrides: Overrides) -> Result<Compiler> {
    let config = match config {
        Some(path) => layout_file::load(path)?,
        None => CompilerConfig::default(),
    };

    let mut builder = CompilerBuilder::from(config);
    if let Some(rows) = overrides.rows {
        builder = builder.rows(rows);
    }
    if let Some(row) = overrides.first_row {
        builder = builder.first_row(row);
    }
    if let Some(rows) = overrides.rows_per_bank {
        builder = builder.rows_per_bank(rows);
    }
    if let Some(address) = overrides.start_address {
        builder = builder.start_address(address);
    }

    Ok(builder.build()?)
}

fn do_schedule(config: Option<&Path>, output: &Path, format: Format, overrides: Overrides) -> Result<()> {
    let compiler = build_compiler(config, overrides)?;
    let tables = compiler.compile()?;

    let written = tables
        .write_files(output, format.into())
        .with_context(|| format!("Failed to write {}", output.display()))?;

    for (path, bank) in written.iter().zip(&tables.banks) {
        println!("Created: {} ({} entries)", path.display(), bank.rows.len());
    }
    Ok(())
}

fn do_boot(hexfile: &Path, output: &Path) -> Result<()> {
    let text = std::fs::read_to_string(hexfile)
        .with_context(|| format!("Failed to read {}", hexfile.display()))?;
    let image = BootImage::from_hex(&text)
        .with_context(|| format!("Failed to convert {}", hexfile.display()))?;
    info!("boot program: {} bytes", image.len());

    let mut out = BufWriter::new(
        File::create(output).with_context(|| format!("Failed to create {}", output.display()))?,
    );
    image.write_sv(&mut out)?;
    out.flush()?;

    println!("Created: {} ({} bytes)", output.display(), image.len());
    Ok(())
}

fn do_font(path: &Path, output: Option<&Path>, glyphs: usize, preview: bool) -> Result<()> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let font = Font::from_bytes(&bytes, glyphs);
    info!("font {}: {} glyphs", path.display(), font.len());

    if preview {
        for code in 0..font.len() {
            if let Some(art) = font.preview(code) {
                eprintln!("code: {} char: {:?}\n{}", code, code as u8 as char, art);
            }
        }
    }

    match output {
        Some(output) => {
            let mut out = BufWriter::new(
                File::create(output).with_context(|| format!("Failed to create {}", output.display()))?,
            );
            font.write_mem(&mut out)?;
            out.flush()?;
            println!("Created: {} ({} glyphs)", output.display(), font.len());
        }
        None => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            font.write_mem(&mut out)?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Schedule { config, output, format, rows, first_row, rows_per_bank, start_address } => {
            let overrides = Overrides { rows, first_row, rows_per_bank, start_address };
            do_schedule(config.as_deref(), &output, format, overrides)
        }
        Commands::Boot { hexfile, output } => do_boot(&hexfile, &output),
        Commands::Font { path, output, glyphs, preview } => do_font(&path, output.as_deref(), glyphs, preview),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_overrides() -> Overrides {
        Overrides { rows: None, first_row: None, rows_per_bank: None, start_address: None }
    }

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_schedule_flags() {
        let cli = Cli::parse_from([
            "ifogen", "-vv", "schedule", "--rows", "4", "--start-address", "0x40", "--format", "json",
        ]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Schedule { rows, start_address, format, .. } => {
                assert_eq!(rows, Some(4));
                assert_eq!(start_address, Some(0x40));
                assert_eq!(format, Format::Json);
            }
            _ => panic!("expected schedule"),
        }
    }

    #[test]
    fn hex_addresses_accept_prefix() {
        assert_eq!(parse_hex("ff"), Ok(0xFF));
        assert_eq!(parse_hex("0x1F"), Ok(0x1F));
        assert!(parse_hex("zz").is_err());
    }

    #[test]
    fn overrides_replace_layout_values() {
        let overrides = Overrides {
            rows: Some(2),
            first_row: Some(0),
            rows_per_bank: Some(1),
            start_address: Some(0x20),
        };
        let compiler = build_compiler(None, overrides).unwrap();
        let config = compiler.config();
        assert_eq!(config.row_count, 2);
        assert_eq!(config.first_row, 0);
        assert_eq!(config.rows_per_bank, Some(1));
        assert_eq!(config.start_address, 0x20);
        assert_eq!(config.first_index, 10);
    }

    #[test]
    fn schedule_writes_stock_table() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("cpu_ifo_auto_generated.sv");
        do_schedule(None, &output, Format::Sv, no_overrides()).unwrap();

        let text = std::fs::read_to_string(&output).unwrap();
        assert_eq!(text.lines().count(), 264);
        assert!(text.starts_with("show_info_rom[10] = '{"));
    }

    #[test]
    fn schedule_rejects_bad_layout_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.sv");
        let overrides = Overrides { rows: Some(0), ..no_overrides() };
        assert!(do_schedule(None, &output, Format::Sv, overrides).is_err());
        assert!(!output.exists());
    }

    #[test]
    fn boot_converts_hex_file() {
        let dir = tempfile::tempdir().unwrap();
        let hexfile = dir.path().join("boot.hex");
        let output = dir.path().join("boot_program.sv");
        std::fs::write(&hexfile, ":0300000002003CBF\n:00000001FF\n").unwrap();

        do_boot(&hexfile, &output).unwrap();
        let text = std::fs::read_to_string(&output).unwrap();
        assert!(text.contains("        2: 8'h3C,\n"));
        assert!(text.ends_with("boot_program_length = 3;\n"));
    }

    #[test]
    fn font_writes_memory_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Sweet16.f16");
        let output = dir.path().join("font.mem");
        std::fs::write(&path, vec![0x18u8; 48]).unwrap();

        do_font(&path, Some(&output), 2, false).unwrap();
        let text = std::fs::read_to_string(&output).unwrap();
        assert_eq!(text.lines().count(), 34);
        assert!(text.starts_with("# code: 0\n18\n"));
    }
}
