//! Minimal JPEG 2000 codestream header reader.
//!
//! Scans a codestream's main header for the `SIZ` and `COD` markers and
//! stops — no quantization, code-block, precinct, MCT or packet data is
//! parsed, because none of it is needed to answer an `info.json` request.

use crate::error::IiifError;

const MARKER_SOC: u16 = 0xFF4F;
const MARKER_SIZ: u16 = 0xFF51;
const MARKER_COD: u16 = 0xFF52;
const MARKER_SOT: u16 = 0xFF90;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Jp2Header {
    pub width: u32,
    pub height: u32,
    /// Component (channel) count, read from `SIZ`'s `Csiz` field. Used to
    /// decide which qualities the source colorspace supports.
    pub components: u16,
    pub tile_width: u32,
    pub tile_height: u32,
    pub decomposition_levels: u8,
}

impl Jp2Header {
    /// Resolution levels run from `0` (full size) to `decomposition_levels`;
    /// each level's scale factor relative to the reference grid is `2^level`.
    pub fn scale_factors(&self) -> Vec<u32> {
        (0..=self.decomposition_levels as u32).map(|level| 1u32 << level).collect()
    }

    pub fn parse(data: &[u8]) -> Result<Self, IiifError> {
        let mut cursor = Cursor::new(data);

        let mut width = None;
        let mut height = None;
        let mut components = None;
        let mut tile_width = None;
        let mut tile_height = None;
        let mut decomposition_levels = None;

        loop {
            let marker = match cursor.read_u16() {
                Ok(m) => m,
                Err(_) => break,
            };

            match marker {
                MARKER_SOC => continue,
                MARKER_SIZ => {
                    let lsiz = cursor.read_u16()? as usize;
                    let segment_start = cursor.pos;
                    let _rsiz = cursor.read_u16()?;
                    width = Some(cursor.read_u32()?);
                    height = Some(cursor.read_u32()?);
                    let _xosiz = cursor.read_u32()?;
                    let _yosiz = cursor.read_u32()?;
                    let _xtsiz = cursor.read_u32()?;
                    let _ytsiz = cursor.read_u32()?;
                    let _xtosiz = cursor.read_u32()?;
                    let _ytosiz = cursor.read_u32()?;
                    components = Some(cursor.read_u16()?);
                    let consumed = cursor.pos - segment_start;
                    cursor.skip(lsiz.saturating_sub(consumed + 2))?;
                }
                MARKER_COD => {
                    let lcod = cursor.read_u16()? as usize;
                    let segment_start = cursor.pos;
                    let _scod = cursor.read_u8()?;
                    let _progression_order = cursor.read_u8()?;
                    let _num_layers = cursor.read_u16()?;
                    let _mct = cursor.read_u8()?;
                    let levels = cursor.read_u8()?;
                    let code_block_width_exp = cursor.read_u8()?.saturating_add(2);
                    let code_block_height_exp = cursor.read_u8()?.saturating_add(2);
                    decomposition_levels = Some(levels);
                    tile_width = Some(1u32 << code_block_width_exp.min(31));
                    tile_height = Some(1u32 << code_block_height_exp.min(31));
                    let consumed = cursor.pos - segment_start;
                    cursor.skip(lcod.saturating_sub(consumed + 2))?;
                    break;
                }
                MARKER_SOT => break,
                _ => {
                    let length = cursor.read_u16()? as usize;
                    cursor.skip(length.saturating_sub(2))?;
                }
            }
        }

        Ok(Jp2Header {
            width: width.ok_or_else(truncated)?,
            height: height.ok_or_else(truncated)?,
            components: components.ok_or_else(truncated)?,
            tile_width: tile_width.ok_or_else(missing_cod)?,
            tile_height: tile_height.ok_or_else(missing_cod)?,
            decomposition_levels: decomposition_levels.ok_or_else(missing_cod)?,
        })
    }
}

fn truncated() -> IiifError {
    IiifError::ImageInfo("JPEG 2000 codestream is truncated or missing a SIZ marker".to_string())
}

fn missing_cod() -> IiifError {
    IiifError::ImageInfo("JPEG 2000 codestream is missing a COD marker".to_string())
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Cursor { data, pos: 0 }
    }

    fn read_u8(&mut self) -> Result<u8, IiifError> {
        let byte = *self.data.get(self.pos).ok_or_else(truncated)?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_u16(&mut self) -> Result<u16, IiifError> {
        let hi = self.read_u8()?;
        let lo = self.read_u8()?;
        Ok(u16::from_be_bytes([hi, lo]))
    }

    fn read_u32(&mut self) -> Result<u32, IiifError> {
        let a = self.read_u8()?;
        let b = self.read_u8()?;
        let c = self.read_u8()?;
        let d = self.read_u8()?;
        Ok(u32::from_be_bytes([a, b, c, d]))
    }

    fn skip(&mut self, n: usize) -> Result<(), IiifError> {
        if self.pos + n > self.data.len() {
            return Err(truncated());
        }
        self.pos += n;
        Ok(())
    }
}
