//! 8x16 bitmap font to character ROM memory file.

use std::io::Write;

use log::debug;

pub const GLYPH_HEIGHT: usize = 16;
/// The character ROM holds the 7-bit ASCII range.
pub const DEFAULT_GLYPHS: usize = 128;

pub type Glyph = [u8; GLYPH_HEIGHT];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Font {
    glyphs: Vec<Glyph>,
}

impl Font {
    /// Takes up to `max_glyphs` glyphs from a raw `.f16`-style dump. A
    /// trailing partial glyph is padded with blank rows.
    pub fn from_bytes(bytes: &[u8], max_glyphs: usize) -> Self {
        let glyphs: Vec<Glyph> = bytes
            .chunks(GLYPH_HEIGHT)
            .take(max_glyphs)
            .map(|chunk| {
                let mut glyph = [0u8; GLYPH_HEIGHT];
                glyph[..chunk.len()].copy_from_slice(chunk);
                glyph
            })
            .collect();

        for code in 0..glyphs.len() {
            debug!("glyph {} at {:#06x}", code, code * GLYPH_HEIGHT);
        }

        Self { glyphs }
    }

    pub fn glyphs(&self) -> &[Glyph] {
        &self.glyphs
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// `# code: N` followed by one hex byte per glyph row.
    pub fn write_mem<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        for (code, glyph) in self.glyphs.iter().enumerate() {
            writeln!(out, "# code: {}", code)?;
            for row in glyph {
                writeln!(out, "{:02x}", row)?;
            }
        }
        Ok(())
    }

    /// Renders one glyph as `*` art, MSB on the left.
    pub fn preview(&self, code: usize) -> Option<String> {
        let glyph = self.glyphs.get(code)?;
        let mut art = String::with_capacity(GLYPH_HEIGHT * 9);
        for row in glyph {
            for bit in (0..8).rev() {
                art.push(if (row >> bit) & 1 == 1 { '*' } else { ' ' });
            }
            art.push('\n');
        }
        Some(art)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn font_bytes(glyphs: usize) -> Vec<u8> {
        (0..glyphs * GLYPH_HEIGHT).map(|i| i as u8).collect()
    }

    #[test]
    fn limits_glyph_count() {
        let font = Font::from_bytes(&font_bytes(200), DEFAULT_GLYPHS);
        assert_eq!(font.len(), 128);
    }

    #[test]
    fn pads_partial_glyph() {
        let font = Font::from_bytes(&[0xFF; 20], DEFAULT_GLYPHS);
        assert_eq!(font.len(), 2);
        assert_eq!(font.glyphs()[1][..4], [0xFF; 4]);
        assert_eq!(font.glyphs()[1][4..], [0u8; 12]);
    }

    #[test]
    fn writes_memory_file() {
        let font = Font::from_bytes(&font_bytes(2), DEFAULT_GLYPHS);
        let mut out = Vec::new();
        font.write_mem(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 2 * (GLYPH_HEIGHT + 1));
        assert_eq!(lines[0], "# code: 0");
        assert_eq!(lines[1], "00");
        assert_eq!(lines[16], "0f");
        assert_eq!(lines[17], "# code: 1");
        assert_eq!(lines[18], "10");
    }

    #[test]
    fn previews_bits_msb_first() {
        let mut bytes = vec![0u8; GLYPH_HEIGHT];
        bytes[0] = 0b1000_0001;
        let font = Font::from_bytes(&bytes, 1);
        let art = font.preview(0).unwrap();
        assert_eq!(art.lines().next(), Some("*      *"));
        assert!(font.preview(1).is_none());
    }
}
