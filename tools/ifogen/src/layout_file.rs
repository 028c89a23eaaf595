//! Layout files
//!
//! A layout file is a TOML rendering of `CompilerConfig`. Anything left out
//! keeps the stock info screen value.

use std::path::Path;

use anyhow::{Context, Result};
use ifogen_core::CompilerConfig;
use tracing::debug;

pub fn load(path: &Path) -> Result<CompilerConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read layout file {}", path.display()))?;
    let config = parse(&text).with_context(|| format!("Invalid layout file {}", path.display()))?;
    debug!(
        "layout {}: {} rows from row {}, {} captions",
        path.display(),
        config.row_count,
        config.first_row,
        config.captions.len()
    );
    Ok(config)
}

pub fn parse(text: &str) -> Result<CompilerConfig> {
    Ok(toml::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifogen_core::ScreenCell;
    use std::io::Write;

    #[test]
    fn empty_file_is_stock_screen() {
        assert_eq!(parse("").unwrap(), CompilerConfig::default());
    }

    #[test]
    fn reads_captions_and_encoding() {
        let config = parse(
            r#"
            row_count = 4
            rows_per_bank = 2
            address_labels = true

            [encoding]
            diff_bits = 12

            [[captions]]
            text = "MEM"
            row = 8
            col = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.row_count, 4);
        assert_eq!(config.rows_per_bank, Some(2));
        assert!(config.address_labels);
        assert_eq!(config.encoding.diff_bits, 12);
        assert_eq!(config.encoding.table_name, "show_info_rom");
        assert_eq!(config.captions[0].text, "MEM");
        assert_eq!(config.captions[0].anchor, ScreenCell { row: 8, col: 0 });
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(parse("rowcount = 4").is_err());
    }

    #[test]
    fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "first_row = 2\nrow_count = 1").unwrap();
        let config = load(file.path()).unwrap();
        assert_eq!(config.first_row, 2);
        assert_eq!(config.row_count, 1);
    }

    #[test]
    fn shipped_layout_compiles() {
        let config = parse(include_str!("../layouts/cpu_ifo.toml")).unwrap();
        ifogen_core::Compiler::new(config).unwrap().compile().unwrap();
    }
}
