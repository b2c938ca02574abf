//! # interpreter
//!
//! Machine state visible to a CHIP-8 program:
//!  V0-VF  8bit general registers; VF is clobbered by carry/borrow/shift/draw
//!  I      index register, 12 bits wide in practice but kept in a u16
//!  PC     program counter, starts at 0x200
//!  SP     call stack pointer, 0 when empty
//!  DT/ST  delay and sound timers; count down once per step, stop at 0
//!
//! Nothing here keeps time. Whoever owns the interpreter calls `step()` as
//! often as they like and each call runs exactly one instruction, then ticks
//! the timers. Anything a real machine would do undefined things with (a
//! stack overflow, I or PC pointing outside memory, a key number > 15) comes
//! back as an error before any state is touched.
use crate::config::Config;
use crate::display::FrameBuffer;
use crate::error::Result;
use crate::input::Keypad;
use crate::instruction::Instruction;
use crate::memory::{Chip8Memory, MemoryMap, CHIP8_FONT_ADDR, CHIP8_GLYPH_BYTES, CHIP8_PROGRAM_ADDR};
use crate::registers::{Registers, Stack, Timers};
use log::{debug, trace, warn};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::io;

/// what happens to PC once an instruction has run
enum ProgramCounter {
    Next,
    Skip,
    Stay,
    Goto(u16),
}

impl ProgramCounter {
    fn skip_if(condition: bool) -> Self {
        if condition {
            ProgramCounter::Skip
        } else {
            ProgramCounter::Next
        }
    }
}

/// Snapshot of the machine taken just before an instruction runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceRecord {
    pub pc: u16,
    pub opcode: u16,
    pub sp: usize,
    pub i: u16,
    pub v: [u8; 16],
}

impl fmt::Display for TraceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04X} {:04X} {:02X} {:04X} [{}]",
            self.pc,
            self.opcode,
            self.sp,
            self.i,
            Instruction::decode(self.opcode)
        )?;
        for (n, v) in self.v.iter().enumerate() {
            write!(f, " V{:X}:{:02X}", n, v)?;
        }
        Ok(())
    }
}

pub struct Chip8Interpreter {
    memory: Chip8Memory,
    registers: Registers,
    stack: Stack,
    timers: Timers,
    program_counter: u16,
    i: u16,
    framebuffer: FrameBuffer,
    keypad: Keypad,
    rng: SmallRng,
    trace: bool,
}

impl Chip8Interpreter {
    pub fn new(config: &Config) -> Self {
        let rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        Chip8Interpreter {
            memory: Chip8Memory::new(),
            registers: Registers::new(),
            stack: Stack::new(),
            timers: Timers::default(),
            program_counter: CHIP8_PROGRAM_ADDR,
            i: 0,
            framebuffer: FrameBuffer::new(),
            keypad: Keypad::new(),
            rng,
            trace: config.trace,
        }
    }

    /// load a chip8 program; on failure nothing is loaded
    pub fn load_program(&mut self, reader: &mut impl io::Read) -> Result<usize> {
        self.memory.load_program(reader)
    }

    pub fn load_bytes(&mut self, image: &[u8]) -> Result<()> {
        self.memory.load_bytes(image)
    }

    /// fetch, decode and execute one instruction, then tick the timers
    pub fn step(&mut self) -> Result<()> {
        let word = self.memory.get_word(self.program_counter)?;
        if self.trace {
            trace!("{}", self.trace_record_for(word));
        }
        let instruction = Instruction::decode(word);
        match self.execute(instruction) {
            Ok(next) => {
                self.program_counter = match next {
                    ProgramCounter::Next => self.program_counter + 2,
                    ProgramCounter::Skip => self.program_counter + 4,
                    ProgramCounter::Stay => self.program_counter,
                    ProgramCounter::Goto(addr) => addr,
                };
                self.timers.tick();
                Ok(())
            }
            Err(e) => {
                debug!("{} at 0x{:04x} faulted: {}", instruction, self.program_counter, e);
                Err(e)
            }
        }
    }

    fn execute(&mut self, instruction: Instruction) -> Result<ProgramCounter> {
        use Instruction::*;
        use ProgramCounter::*;

        let pc = self.program_counter;
        let next = match instruction {
            ClearScreen => {
                self.framebuffer.clear();
                Next
            }
            Return => Goto(self.stack.pop(pc)?),
            UnknownSystem(word) => {
                warn!("unknown opcode [0x0000]: 0x{:04X}", word);
                Stay
            }
            Jump(addr) => Goto(addr),
            Call(addr) => {
                // saves the address after the call, not the call itself, so
                // 00EE resumes rather than calling again
                self.stack.push(pc + 2, pc)?;
                Goto(addr)
            }
            SkipEqImm { x, nn } => ProgramCounter::skip_if(self.registers.get(x) == nn),
            SkipNeImm { x, nn } => ProgramCounter::skip_if(self.registers.get(x) != nn),
            SkipEqReg { x, y } => {
                ProgramCounter::skip_if(self.registers.get(x) == self.registers.get(y))
            }
            LoadImm { x, nn } => {
                self.registers.set(x, nn);
                Next
            }
            AddImm { x, nn } => {
                self.registers.set(x, self.registers.get(x).wrapping_add(nn));
                Next
            }
            Move { x, y } => {
                self.registers.set(x, self.registers.get(y));
                Next
            }
            Or { x, y } => {
                self.registers.set(x, self.registers.get(x) | self.registers.get(y));
                Next
            }
            And { x, y } => {
                self.registers.set(x, self.registers.get(x) & self.registers.get(y));
                Next
            }
            Xor { x, y } => {
                self.registers.set(x, self.registers.get(x) ^ self.registers.get(y));
                Next
            }
            AddReg { x, y } => {
                let (sum, carry) = self.registers.get(x).overflowing_add(self.registers.get(y));
                self.registers.set(x, sum);
                self.registers.set_flag(carry);
                Next
            }
            // the flag is written first and the result is computed from the
            // registers afterwards, so VF as an operand reads the new flag
            Sub { x, y } => {
                self.registers.set_flag(self.registers.get(x) > self.registers.get(y));
                self.registers.set(x, self.registers.get(x).wrapping_sub(self.registers.get(y)));
                Next
            }
            ShiftRight { x } => {
                self.registers.set_flag(self.registers.get(x) & 0x01 != 0);
                self.registers.set(x, self.registers.get(x) >> 1);
                Next
            }
            SubReversed { x, y } => {
                self.registers.set_flag(self.registers.get(y) > self.registers.get(x));
                self.registers.set(x, self.registers.get(y).wrapping_sub(self.registers.get(x)));
                Next
            }
            ShiftLeft { x } => {
                self.registers.set_flag(self.registers.get(x) & 0x80 != 0);
                self.registers.set(x, self.registers.get(x) << 1);
                Next
            }
            SkipNeReg { x, y } => {
                ProgramCounter::skip_if(self.registers.get(x) != self.registers.get(y))
            }
            LoadIndex(addr) => {
                self.i = addr;
                Next
            }
            JumpOffset(addr) => Goto(addr + self.registers.get(0) as u16),
            Random { x, nn } => {
                let r: u8 = self.rng.gen();
                self.registers.set(x, r & nn);
                Next
            }
            Draw { x, y, n } => {
                let (vx, vy) = (self.registers.get(x), self.registers.get(y));
                let sprite = self.memory.get_ro_slice(self.i, n as usize)?;
                let collision = self.framebuffer.draw_sprite(vx, vy, sprite);
                self.registers.set_flag(collision);
                Next
            }
            SkipKeyPressed { x } => {
                ProgramCounter::skip_if(self.keypad.is_pressed(self.registers.get(x))?)
            }
            SkipKeyReleased { x } => {
                ProgramCounter::skip_if(!self.keypad.is_pressed(self.registers.get(x))?)
            }
            LoadDelay { x } => {
                self.registers.set(x, self.timers.delay);
                Next
            }
            WaitKey { x } => match self.keypad.last_pressed() {
                Some(key) => {
                    self.registers.set(x, key);
                    Next
                }
                None => Stay,
            },
            SetDelay { x } => {
                self.timers.delay = self.registers.get(x);
                Next
            }
            SetSound { x } => {
                self.timers.sound = self.registers.get(x);
                Next
            }
            AddIndex { x } => {
                // VF untouched
                self.i = self.i.wrapping_add(self.registers.get(x) as u16);
                Next
            }
            LoadGlyph { x } => {
                self.i = CHIP8_FONT_ADDR + CHIP8_GLYPH_BYTES * self.registers.get(x) as u16;
                Next
            }
            StoreBcd { x } => {
                let vx = self.registers.get(x);
                self.memory.write(&[vx / 100, (vx / 10) % 10, vx % 10], self.i)?;
                Next
            }
            StoreRegisters { x } => {
                self.memory.write(self.registers.up_to(x), self.i)?;
                Next
            }
            LoadRegisters { x } => {
                let src = self.memory.get_ro_slice(self.i, x + 1)?;
                self.registers.up_to_mut(x).copy_from_slice(src);
                Next
            }
            Unknown(word) => {
                warn!("unknown opcode [0x{:X}000]: 0x{:04X}", word >> 12, word);
                Next
            }
        };
        Ok(next)
    }

    pub fn trace_record(&self) -> Result<TraceRecord> {
        let word = self.memory.get_word(self.program_counter)?;
        Ok(self.trace_record_for(word))
    }

    fn trace_record_for(&self, opcode: u16) -> TraceRecord {
        let mut v = [0u8; 16];
        v.copy_from_slice(self.registers.as_slice());
        TraceRecord {
            pc: self.program_counter,
            opcode,
            sp: self.stack.sp(),
            i: self.i,
            v,
        }
    }

    pub fn program_counter(&self) -> u16 {
        self.program_counter
    }

    pub fn index(&self) -> u16 {
        self.i
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn stack_pointer(&self) -> usize {
        self.stack.sp()
    }

    pub fn timers(&self) -> Timers {
        self.timers
    }

    /// true while the sound timer is running
    pub fn sound_active(&self) -> bool {
        self.timers.sound > 0
    }

    pub fn memory(&self) -> &Chip8Memory {
        &self.memory
    }

    pub fn framebuffer(&self) -> &FrameBuffer {
        &self.framebuffer
    }

    /// has the screen changed since the last call?
    pub fn take_redraw(&mut self) -> bool {
        self.framebuffer.take_redraw()
    }

    /// for input devices; the interpreter itself never writes the keypad
    pub fn keypad_mut(&mut self) -> &mut Keypad {
        &mut self.keypad
    }

    pub fn set_key(&mut self, key: u8, pressed: bool) -> Result<()> {
        self.keypad.set_key(key, pressed)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn seeded_with(image: &[u8]) -> Chip8Interpreter {
        let mut i = Chip8Interpreter::new(&Config {
            seed: Some(1),
            ..Config::default()
        });
        i.load_bytes(image).unwrap();
        i
    }

    proptest! {
        #[test]
        fn load_imm_sets_register(x in 0u16..16, nn in any::<u8>()) {
            let word = 0x6000 | (x << 8) | nn as u16;
            let mut i = seeded_with(&word.to_be_bytes());
            i.step().unwrap();
            prop_assert_eq!(i.registers().get(x as usize), nn);
        }

        #[test]
        fn bcd_digits_recombine(value in any::<u8>()) {
            let mut i = seeded_with(&[0x60, value, 0xa3, 0x00, 0xf0, 0x33]);
            for _ in 0..3 {
                i.step().unwrap();
            }
            let digits = i.memory().get_ro_slice(0x300, 3).unwrap();
            prop_assert!(digits.iter().all(|&d| d < 10));
            prop_assert_eq!(digits[0] as u16 * 100 + digits[1] as u16 * 10 + digits[2] as u16, value as u16);
        }

        #[test]
        fn glyph_address_is_five_times_digit(d in 0u8..16) {
            let mut i = seeded_with(&[0x60, d, 0xf0, 0x29]);
            i.step().unwrap();
            i.step().unwrap();
            prop_assert_eq!(i.index(), 5 * d as u16);
        }

        #[test]
        fn store_then_load_registers_round_trips(values in prop::array::uniform16(any::<u8>()), x in 0usize..16) {
            let mut image = Vec::new();
            for (r, v) in values.iter().enumerate() {
                image.extend_from_slice(&[0x60 | r as u8, *v]);
            }
            let x = x as u8;
            // store V0..=VX, scribble over them, load them back
            image.extend_from_slice(&[0xa6, 0x00, 0xf0 | x, 0x55]);
            for r in 0..=x {
                image.extend_from_slice(&[0x60 | r, 0x00]);
            }
            image.extend_from_slice(&[0xf0 | x, 0x65]);
            let mut i = seeded_with(&image);
            for _ in 0..(16 + 2 + x as usize + 1 + 1) {
                i.step().unwrap();
            }
            prop_assert_eq!(i.registers().as_slice(), &values[..]);
        }

        #[test]
        fn random_programs_never_panic(image in prop::collection::vec(any::<u8>(), 2..512)) {
            let mut i = seeded_with(&image);
            for _ in 0..1000 {
                if i.step().is_err() {
                    break;
                }
            }
        }
    }
}
