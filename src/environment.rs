use crate::config::Config;
use crate::display::Display;
use crate::error::Result;
use crate::input::Input;
use crate::interpreter::Chip8Interpreter;
use log::info;

/// why the main loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stopped {
    Quit,
    CycleLimit,
}

/// Wires the interpreter up to a screen and a keyboard and keeps it
/// stepping. Per cycle: refresh the keypad, run one instruction, redraw if
/// the frame buffer changed, then sleep off the rest of the cycle.
pub struct Environment<'a> {
    interpreter: Chip8Interpreter,
    display: &'a mut dyn Display,
    input: &'a mut dyn Input,
    config: Config,
    cycles: u64,
}

impl<'a> Environment<'a> {
    pub fn new(
        interpreter: Chip8Interpreter,
        display: &'a mut dyn Display,
        input: &'a mut dyn Input,
        config: Config,
    ) -> Self {
        Environment {
            interpreter,
            display,
            input,
            config,
            cycles: 0,
        }
    }

    /// one full cycle; false once the user wants out
    pub fn cycle(&mut self) -> Result<bool> {
        self.input.update_keypad(self.interpreter.keypad_mut())?;
        if self.input.quit_requested() {
            return Ok(false);
        }
        self.interpreter.step()?;
        self.cycles += 1;
        if self.interpreter.take_redraw() {
            self.display.draw(self.interpreter.framebuffer().pixels())?;
        }
        Ok(true)
    }

    /// run until the user quits, the cycle limit is hit or the program faults
    pub fn main_loop(&mut self) -> Result<Stopped> {
        loop {
            if let Some(max) = self.config.max_cycles {
                if self.cycles >= max {
                    info!("stopping after {} cycles", self.cycles);
                    self.input.flush_keys()?;
                    return Ok(Stopped::CycleLimit);
                }
            }
            if !self.cycle()? {
                info!("quit after {} cycles", self.cycles);
                self.input.flush_keys()?;
                return Ok(Stopped::Quit);
            }
            if !self.config.cycle_delay.is_zero() {
                spin_sleep::sleep(self.config.cycle_delay);
            }
        }
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn interpreter(&self) -> &Chip8Interpreter {
        &self.interpreter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::DummyDisplay;
    use crate::error::Chip8Error;
    use crate::input::DummyInput;
    use std::time::Duration;

    fn config(max_cycles: u64) -> Config {
        Config {
            seed: Some(0),
            cycle_delay: Duration::ZERO,
            max_cycles: Some(max_cycles),
            ..Config::default()
        }
    }

    fn interpreter_with(image: &[u8]) -> Result<Chip8Interpreter> {
        let mut i = Chip8Interpreter::new(&config(0));
        i.load_bytes(image)?;
        Ok(i)
    }

    #[test]
    fn test_runs_to_cycle_limit() -> Result<()> {
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new(&[]);
        // spin forever
        let i = interpreter_with(&[0x12, 0x00])?;
        let mut env = Environment::new(i, &mut display, &mut input, config(25));
        assert_eq!(env.main_loop()?, Stopped::CycleLimit);
        assert_eq!(env.cycles(), 25);
        Ok(())
    }

    #[test]
    fn test_stopping_flushes_held_keys() -> Result<()> {
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new(&[0x3, 0x9]);
        let i = interpreter_with(&[0x12, 0x00])?;
        let mut env = Environment::new(i, &mut display, &mut input, config(5));
        assert_eq!(env.main_loop()?, Stopped::CycleLimit);
        drop(env);
        assert!(input.peek_keys()?.is_empty());
        Ok(())
    }

    #[test]
    fn test_redraws_only_after_draw() -> Result<()> {
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new(&[]);
        // I = glyph 0; draw it at (0, 0); spin
        let i = interpreter_with(&[0xa0, 0x00, 0xd0, 0x05, 0x12, 0x04])?;
        let mut env = Environment::new(i, &mut display, &mut input, config(10));
        env.main_loop()?;
        drop(env);
        assert_eq!(display.frames_drawn, 1);
        assert_eq!(display.last_frame[0], 1);
        Ok(())
    }

    #[test]
    fn test_input_reaches_keypad() -> Result<()> {
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new(&[]);
        // wait for a key into V5, then spin
        let i = interpreter_with(&[0xf5, 0x0a, 0x12, 0x02])?;
        let mut env = Environment::new(i, &mut display, &mut input, config(10));
        env.cycle()?;
        env.cycle()?;
        assert_eq!(env.interpreter().program_counter(), 0x200);
        drop(env);

        input.press(0x7);
        let i = interpreter_with(&[0xf5, 0x0a, 0x12, 0x02])?;
        let mut env = Environment::new(i, &mut display, &mut input, config(10));
        env.cycle()?;
        assert_eq!(env.interpreter().program_counter(), 0x202);
        assert_eq!(env.interpreter().registers().get(5), 0x7);
        Ok(())
    }

    #[test]
    fn test_fault_stops_loop() -> Result<()> {
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new(&[]);
        let i = interpreter_with(&[0x00, 0xee])?;
        let mut env = Environment::new(i, &mut display, &mut input, config(10));
        assert!(matches!(env.main_loop(), Err(Chip8Error::StackUnderflow { .. })));
        assert_eq!(env.cycles(), 0);
        Ok(())
    }
}
