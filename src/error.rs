use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Chip8Error>;

/// Everything that can go wrong while loading or running a CHIP-8 program.
/// None of these are fatal; the interpreter is left as it was before the
/// failing call.
#[derive(Debug, Error)]
pub enum Chip8Error {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("program of {len} bytes does not fit in {capacity} bytes of program memory")]
    ProgramTooLarge { len: usize, capacity: usize },
    #[error("access of {len} byte(s) at 0x{addr:04x} is outside memory")]
    AddressOutOfRange { addr: usize, len: usize },
    #[error("call stack overflow at pc 0x{pc:04x}")]
    StackOverflow { pc: u16 },
    #[error("return with empty call stack at pc 0x{pc:04x}")]
    StackUnderflow { pc: u16 },
    #[error("no such key: 0x{0:02x}")]
    InvalidKey(u8),
}
