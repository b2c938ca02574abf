use crate::error::{Chip8Error, Result};
use log::debug;
use std::io;

// NB. addresses are u16 as per the chip-8; lengths are usize to stop endless casting

/// Represents the addressable memory of the machine. Every access is bounds
/// checked so a stray I or PC turns into an error rather than a panic.
pub trait MemoryMap {
    /// how many bytes are addressable
    fn size(&self) -> usize;

    /// get a r/w slice of the underlying memory
    fn get_rw_slice(&mut self, addr: u16, len: usize) -> Result<&mut [u8]>;

    /// get a r/o slice of the underlying memory
    fn get_ro_slice(&self, addr: u16, len: usize) -> Result<&[u8]>;

    /// write unknown len of data into memory at a particular address; nothing
    /// is written unless all of it fits
    fn write_any(&mut self, reader: &mut impl io::Read, addr: u16) -> Result<usize> {
        let mut buf = Vec::new();
        let len = reader.read_to_end(&mut buf)?;
        self.write(&buf, addr)?;
        Ok(len)
    }

    /// write a chunk of bytes into "RAM"
    fn write(&mut self, data: &[u8], addr: u16) -> Result<()> {
        self.get_rw_slice(addr, data.len())?.copy_from_slice(data);
        Ok(())
    }

    fn get_byte(&self, addr: u16) -> Result<u8> {
        Ok(self.get_ro_slice(addr, 1)?[0])
    }

    /// get a big-endian two-byte word (instructions)
    fn get_word(&self, addr: u16) -> Result<u16> {
        let word = self.get_ro_slice(addr, 2)?;
        Ok(u16::from_be_bytes([word[0], word[1]]))
    }
}

/// how much RAM we have
pub const CHIP8_RAM_SIZE_BYTES: usize = 4096;

/// where the program is loaded
pub const CHIP8_PROGRAM_ADDR: u16 = 0x0200;

/// where the hex digit glyphs live, and how tall each one is
pub const CHIP8_FONT_ADDR: u16 = 0x000;
pub const CHIP8_GLYPH_BYTES: u16 = 5;

/// Defines the memory map used here (4K):
///   0x0000-0x004f  hex digit glyphs
///   0x0050-0x01ff  unused (interpreter area on real hardware)
///   0x0200-0x0fff  program
///
/// the call stack, registers and display live outside of addressable memory
pub struct Chip8Memory {
    bytes: Box<[u8]>,
}

impl MemoryMap for Chip8Memory {
    fn size(&self) -> usize {
        self.bytes.len()
    }

    fn get_rw_slice(&mut self, addr: u16, len: usize) -> Result<&mut [u8]> {
        let a = self.check_range(addr, len)?;
        Ok(&mut self.bytes[a..(a + len)])
    }

    fn get_ro_slice(&self, addr: u16, len: usize) -> Result<&[u8]> {
        let a = self.check_range(addr, len)?;
        Ok(&self.bytes[a..(a + len)])
    }
}

impl Chip8Memory {
    /// zeroed memory with the glyph table baked in
    pub fn new() -> Self {
        let mut bytes = vec![0u8; CHIP8_RAM_SIZE_BYTES].into_boxed_slice();
        let font = CHIP8_FONT_ADDR as usize;
        bytes[font..font + CHIP8_FONT.len()].copy_from_slice(&CHIP8_FONT);
        Chip8Memory { bytes }
    }

    /// load a CHIP-8 program at 0x200. The whole image is checked against the
    /// space left before anything is copied, so a failed load leaves memory
    /// untouched.
    pub fn load_program(&mut self, reader: &mut impl io::Read) -> Result<usize> {
        let mut image = Vec::new();
        reader.read_to_end(&mut image)?;
        self.load_bytes(&image)?;
        Ok(image.len())
    }

    pub fn load_bytes(&mut self, image: &[u8]) -> Result<()> {
        let capacity = self.size() - CHIP8_PROGRAM_ADDR as usize;
        if image.len() > capacity {
            return Err(Chip8Error::ProgramTooLarge {
                len: image.len(),
                capacity,
            });
        }
        self.write(image, CHIP8_PROGRAM_ADDR)?;
        debug!(
            "loaded {} byte program at 0x{:03x}",
            image.len(),
            CHIP8_PROGRAM_ADDR
        );
        Ok(())
    }

    fn check_range(&self, addr: u16, len: usize) -> Result<usize> {
        let a = addr as usize;
        if a + len > self.bytes.len() {
            return Err(Chip8Error::AddressOutOfRange { addr: a, len });
        }
        Ok(a)
    }
}

impl Default for Chip8Memory {
    fn default() -> Self {
        Self::new()
    }
}

pub const CHIP8_FONT: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_zeroed() {
        let m = Chip8Memory::new();
        // NB. memory is only zeroed from 0x50 because the glyphs sit below it
        assert!(m.bytes[0x50..].iter().all(|&b| b == 0));
        assert_eq!(m.size(), 4096);
    }

    #[test]
    fn test_font_at_zero() -> Result<()> {
        let m = Chip8Memory::new();
        assert_eq!(m.get_ro_slice(0, 80)?, &CHIP8_FONT[..]);
        // glyph for 'A'
        assert_eq!(m.get_ro_slice(50, 5)?, &[0xF0, 0x90, 0xF0, 0x90, 0x90]);
        Ok(())
    }

    #[test]
    fn test_write_any_data_ok() -> Result<()> {
        let mut dst = Chip8Memory::new();
        let mut src: &[u8] = &[0, 1, 2, 3, 4, 5, 6, 7];
        assert_eq!(dst.write_any(&mut src, 0x300)?, 8);
        assert_eq!(dst.bytes[0x2f8..0x308], [0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 2, 3, 4, 5, 6, 7]);
        Ok(())
    }

    #[test]
    fn test_read_word() -> Result<()> {
        let mut m = Chip8Memory::new();
        m.write(&[0, 1, 2, 3, 4, 5, 6, 7], 0x200)?;
        assert_eq!(m.get_word(0x204)?, 0x0405);
        assert_eq!(m.get_byte(0x207)?, 7);
        Ok(())
    }

    #[test]
    fn test_read_past_end_is_error() {
        let m = Chip8Memory::new();
        assert!(m.get_word(0xfff).is_err());
        assert!(m.get_byte(0xfff).is_ok());
        assert!(matches!(
            m.get_ro_slice(0x1000, 1),
            Err(Chip8Error::AddressOutOfRange { addr: 0x1000, len: 1 })
        ));
    }

    #[test]
    fn test_write_too_much_is_error() {
        let mut dst = Chip8Memory::new();
        let mut src: &[u8] = &[0xaa; 8];
        assert!(dst.write_any(&mut src, 4089).is_err());
        // nothing partially written
        assert!(dst.bytes[4089..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_program_load_ok() -> Result<()> {
        let mut dst = Chip8Memory::new();
        let mut prog: &[u8] = &[0x00, 0xe0]; // clear screen
        assert_eq!(dst.load_program(&mut prog)?, 2);
        assert_eq!(dst.get_ro_slice(0x200, 2)?, &[0x00, 0xe0]);
        Ok(())
    }

    #[test]
    fn test_program_load_fills_memory_exactly() -> Result<()> {
        let mut dst = Chip8Memory::new();
        dst.load_bytes(&[0x12; 0xe00])?;
        assert_eq!(dst.get_byte(0xfff)?, 0x12);
        Ok(())
    }

    #[test]
    fn test_program_load_too_large_writes_nothing() {
        let mut dst = Chip8Memory::new();
        let res = dst.load_bytes(&[0xff; 0xe01]);
        assert!(matches!(
            res,
            Err(Chip8Error::ProgramTooLarge { len: 0xe01, capacity: 0xe00 })
        ));
        assert!(dst.bytes[0x200..].iter().all(|&b| b == 0));
    }
}
