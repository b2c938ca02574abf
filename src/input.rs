use crate::error::{Chip8Error, Result};
use crossterm::event::{poll, read, Event, KeyCode};
use crossterm::terminal;
use log::warn;
use std::collections::HashMap;
use std::io;
use std::time::{Duration, Instant};

pub const NUM_KEYS: usize = 16;

/// The hex keypad as the interpreter sees it: 16 pressed/released slots.
/// Input devices write it, the interpreter only reads it.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Keypad {
    keys: [bool; NUM_KEYS],
}

impl Keypad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pressed(&self, key: u8) -> Result<bool> {
        self.keys
            .get(key as usize)
            .copied()
            .ok_or(Chip8Error::InvalidKey(key))
    }

    pub fn set_key(&mut self, key: u8, pressed: bool) -> Result<()> {
        let slot = self
            .keys
            .get_mut(key as usize)
            .ok_or(Chip8Error::InvalidKey(key))?;
        *slot = pressed;
        Ok(())
    }

    /// highest numbered key held down, if any
    pub fn last_pressed(&self) -> Option<u8> {
        self.keys.iter().rposition(|&k| k).map(|k| k as u8)
    }

    pub fn release_all(&mut self) {
        self.keys = [false; NUM_KEYS];
    }
}

/// map of async bytes read from the keyboard to what the chip8 might expect,
/// using left-hand side of qwerty keyboard
const CHIP8_CONVENTIONAL_KEYMAP: [(char, u8); 16] = [
    ('x', 0x00), // x
    ('1', 0x01), // 1
    ('2', 0x02), // 2
    ('3', 0x03), // 3
    ('q', 0x04), // q
    ('w', 0x05), // w
    ('e', 0x06), // e
    ('a', 0x07), // a
    ('s', 0x08), // s
    ('d', 0x09), // d
    ('z', 0x0a), // z
    ('c', 0x0b), // c
    ('4', 0x0c), // 4
    ('r', 0x0d), // r
    ('f', 0x0e), // f
    ('v', 0x0f), // v
];

/// terminals only report presses (and auto-repeat), never releases, so a key
/// counts as held for this long after it was last seen
const KEY_HOLD: Duration = Duration::from_millis(150);

/// reads keypresses
pub trait Input {
    /// get a list of all the mapped keys that are currently considered held,
    /// without flushing them from the buffer
    fn peek_keys(&mut self) -> Result<Vec<u8>>;

    /// flush all the keypresses from the buffer
    fn flush_keys(&mut self) -> Result<()>;

    /// whether the user has asked to leave
    fn quit_requested(&self) -> bool {
        false
    }

    /// copy the held keys onto the keypad
    fn update_keypad(&mut self, keypad: &mut Keypad) -> Result<()> {
        let keys = self.peek_keys()?;
        keypad.release_all();
        for k in keys {
            keypad.set_key(k, true)?;
        }
        Ok(())
    }
}

/// simple implementation of Input, using the terminal in raw mode
pub struct StdinInput {
    held: HashMap<u8, Instant>,
    keymap: HashMap<char, u8>,
    quit: bool,
}

impl StdinInput {
    pub fn new() -> Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(StdinInput {
            held: HashMap::new(),
            keymap: HashMap::from(CHIP8_CONVENTIONAL_KEYMAP),
            quit: false,
        })
    }

    fn read_stdin(&mut self) -> std::result::Result<(), io::Error> {
        let now = Instant::now();
        while poll(Duration::from_millis(0))? {
            match read()? {
                Event::Key(evt) => match evt.code {
                    KeyCode::Char(key) => match self.keymap.get(&key.to_ascii_lowercase()) {
                        Some(mapped_key) => {
                            self.held.insert(*mapped_key, now);
                        }
                        None => {
                            warn!("can't map {:?} to a COSMAC key", key);
                        }
                    },
                    KeyCode::Esc => self.quit = true,
                    _ => {
                        warn!("unknown key event received");
                    }
                },
                _ => {}
            }
        }
        self.held.retain(|_, seen| now.duration_since(*seen) < KEY_HOLD);
        Ok(())
    }
}

impl Drop for StdinInput {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            warn!("couldn't restore terminal: {}", e);
        }
    }
}

impl Input for StdinInput {
    fn peek_keys(&mut self) -> Result<Vec<u8>> {
        self.read_stdin()?;
        Ok(self.held.keys().copied().collect())
    }

    fn flush_keys(&mut self) -> Result<()> {
        self.read_stdin()?;
        self.held.clear();
        Ok(())
    }

    fn quit_requested(&self) -> bool {
        self.quit
    }
}

/// dummy Input implementation for testing
pub struct DummyInput {
    bytes: Vec<u8>,
}

impl DummyInput {
    pub fn new(keys: &[u8]) -> Self {
        DummyInput {
            bytes: Vec::from(keys),
        }
    }

    pub fn press(&mut self, key: u8) {
        self.bytes.push(key);
    }
}

impl Input for DummyInput {
    fn peek_keys(&mut self) -> Result<Vec<u8>> {
        Ok(self.bytes.clone())
    }

    fn flush_keys(&mut self) -> Result<()> {
        self.bytes.clear();
        Ok(())
    }
}
