use crate::error::{Chip8Error, Result};

pub const NUM_REGISTERS: usize = 16;
pub const STACK_DEPTH: usize = 16;

/// index of VF, which doubles as carry / borrow / shifted-out bit / collision
pub const FLAG: usize = 0xf;

/// V0-VF. Indices come from 4-bit instruction fields so they are always in
/// range; anything else is a bug in the decoder and panics.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Registers {
    v: [u8; NUM_REGISTERS],
}

impl Registers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, x: usize) -> u8 {
        self.v[x]
    }

    pub fn set(&mut self, x: usize, value: u8) {
        self.v[x] = value;
    }

    pub fn flag(&self) -> u8 {
        self.v[FLAG]
    }

    pub fn set_flag(&mut self, set: bool) {
        self.v[FLAG] = set as u8;
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.v
    }

    /// V0..=VX
    pub fn up_to(&self, x: usize) -> &[u8] {
        &self.v[..=x]
    }

    pub fn up_to_mut(&mut self, x: usize) -> &mut [u8] {
        &mut self.v[..=x]
    }
}

/// Return addresses for subroutine calls. The pointer starts at 0 meaning
/// empty; a push pre-increments, so slot 0 is never written and at most 15
/// calls can be nested.
#[derive(Debug, Default, Clone)]
pub struct Stack {
    slots: [u16; STACK_DEPTH],
    sp: usize,
}

impl Stack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sp(&self) -> usize {
        self.sp
    }

    pub fn is_empty(&self) -> bool {
        self.sp == 0
    }

    /// `pc` is only used to describe the fault
    pub fn push(&mut self, addr: u16, pc: u16) -> Result<()> {
        if self.sp + 1 >= STACK_DEPTH {
            return Err(Chip8Error::StackOverflow { pc });
        }
        self.sp += 1;
        self.slots[self.sp] = addr;
        Ok(())
    }

    pub fn pop(&mut self, pc: u16) -> Result<u16> {
        if self.is_empty() {
            return Err(Chip8Error::StackUnderflow { pc });
        }
        let addr = self.slots[self.sp];
        self.sp -= 1;
        Ok(addr)
    }
}

/// delay and sound timers; both count down once per executed cycle
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Timers {
    pub delay: u8,
    pub sound: u8,
}

impl Timers {
    pub fn tick(&mut self) {
        self.delay = self.delay.saturating_sub(1);
        self.sound = self.sound.saturating_sub(1);
    }
}
