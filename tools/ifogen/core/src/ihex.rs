//! Intel HEX to boot program ROM.
//!
//! Data records are packed back to back in file order; the record address is
//! not used for placement. The boot ROM is 256 bytes and unused entries read
//! as `NOP` (0xEA). The program length is an 8-bit RTL parameter, so a program
//! may use at most 255 of them.

use std::io::Write;

use log::debug;

use crate::error::HexError;

pub const BOOT_CAPACITY: usize = 256;
pub const BOOT_FILL: u8 = 0xEA;
/// Longest program `boot_program_length` can describe.
pub const BOOT_MAX_LEN: usize = u8::MAX as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Data,
    EndOfFile,
    ExtendedSegmentAddress,
    StartSegmentAddress,
    ExtendedLinearAddress,
    StartLinearAddress,
}

impl RecordKind {
    fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0x00 => RecordKind::Data,
            0x01 => RecordKind::EndOfFile,
            0x02 => RecordKind::ExtendedSegmentAddress,
            0x03 => RecordKind::StartSegmentAddress,
            0x04 => RecordKind::ExtendedLinearAddress,
            0x05 => RecordKind::StartLinearAddress,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexRecord {
    pub address: u16,
    pub kind: RecordKind,
    pub data: Vec<u8>,
    pub checksum: u8,
}

impl HexRecord {
    /// Parses one `:LLAAAATT<data>CC` line. `line` is the 1-based line number
    /// used in errors.
    pub fn parse(text: &str, line: usize) -> Result<Self, HexError> {
        let body = text
            .trim()
            .strip_prefix(':')
            .ok_or(HexError::MissingStartCode { line })?;

        let bytes = hex::decode(body).map_err(|source| HexError::Digits { line, source })?;
        // length, address (2), type, checksum
        if bytes.len() < 5 {
            return Err(HexError::Truncated { line });
        }

        let declared = bytes[0];
        let data = &bytes[4..bytes.len() - 1];
        if data.len() != declared as usize {
            return Err(HexError::LengthMismatch { line, declared, found: data.len() });
        }

        let checksum = bytes[bytes.len() - 1];
        let sum = bytes[..bytes.len() - 1]
            .iter()
            .fold(0u8, |acc, b| acc.wrapping_add(*b));
        let expected = sum.wrapping_neg();
        if expected != checksum {
            return Err(HexError::Checksum { line, expected, found: checksum });
        }

        let kind = RecordKind::from_code(bytes[3])
            .ok_or(HexError::UnknownRecordType { line, kind: bytes[3] })?;

        Ok(Self {
            address: u16::from_be_bytes([bytes[1], bytes[2]]),
            kind,
            data: data.to_vec(),
            checksum,
        })
    }
}

/// Parses every record up to and including the end-of-file record. Blank
/// lines are skipped.
pub fn parse_records(text: &str) -> Result<Vec<HexRecord>, HexError> {
    let mut records = Vec::new();

    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record = HexRecord::parse(line, i + 1)?;
        debug!("record {:?} @{:04X} ({} bytes)", record.kind, record.address, record.data.len());

        let done = record.kind == RecordKind::EndOfFile;
        records.push(record);
        if done {
            break;
        }
    }

    Ok(records)
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BootImage {
    bytes: Vec<u8>,
}

impl BootImage {
    pub fn from_records(records: &[HexRecord]) -> Result<Self, HexError> {
        let bytes: Vec<u8> = records
            .iter()
            .filter(|r| r.kind == RecordKind::Data)
            .flat_map(|r| r.data.iter().copied())
            .collect();

        if bytes.len() > BOOT_MAX_LEN {
            return Err(HexError::ImageTooLarge { len: bytes.len(), capacity: BOOT_MAX_LEN });
        }
        Ok(Self { bytes })
    }

    pub fn from_hex(text: &str) -> Result<Self, HexError> {
        Self::from_records(&parse_records(text)?)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Writes the `boot_program` array and its length parameter.
    pub fn write_sv<W: Write>(&self, out: &mut W) -> Result<(), HexError> {
        writeln!(out, "logic [7:0] boot_program[{}];", BOOT_CAPACITY)?;
        writeln!(out)?;
        writeln!(out, "assign boot_program = '{{")?;
        for (idx, byte) in self.bytes.iter().enumerate() {
            writeln!(out, "        {}: 8'h{:02X},", idx, byte)?;
        }
        writeln!(out, "        default: 8'h{:02X}", BOOT_FILL)?;
        writeln!(out, "    }};")?;
        writeln!(out, "parameter logic[7:0] boot_program_length = {};", self.bytes.len())?;
        Ok(())
    }
}
