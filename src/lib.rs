//!
//! ## Design
//!
//! * the interpreter is a pure state machine; one `step()` = one instruction
//!   plus one timer tick, nothing is paced against the wallclock in here
//! * abstract display so can plug alternatives; starting with TUI in-console
//! * abstract input the same way; the interpreter only ever reads the keypad
//! * no audio; the sound timer is exposed for anyone who wants to beep
//! * anything the original hardware left undefined (stack over/underflow,
//!   reads and writes off the end of memory, key numbers > 15) is an error
//!   returned from `step()`, raised before any state changes
//!
//! Model
//!
//! ```text
//! Environment
//!  |-- display, input, config
//!  |-- interpreter(config)
//!  |    |-- memory (glyphs at 0x000, program at 0x200)
//!  |    |-- registers, stack, timers
//!  |    |-- frame buffer, keypad
//!  |    `-- instruction set (decode -> execute)
//!  `-- main loop
//!       |-- input.update_keypad(interpreter.keypad)
//!       |-- interpreter.step()
//!       |-- if interpreter.take_redraw() { display.draw(frame buffer) }
//!       `-- sleep(cycle_delay)
//! ```
pub mod config;
pub mod display;
pub mod environment;
pub mod error;
pub mod input;
pub mod instruction;
pub mod interpreter;
pub mod memory;
pub mod registers;

pub use config::Config;
pub use error::{Chip8Error, Result};
pub use interpreter::{Chip8Interpreter, TraceRecord};
