use clap::Parser;
use std::error::Error;
use std::fs::File;
use std::path::PathBuf;
use std::time::Duration;

use chip8vm::display::MonoTermDisplay;
use chip8vm::environment::Environment;
use chip8vm::input::StdinInput;
use chip8vm::{Chip8Interpreter, Config};

#[derive(Parser)]
#[command(name = "chip8vm", about = "Run a CHIP-8 program in the terminal")]
struct Cli {
    /// Program image to load at 0x200.
    rom: PathBuf,

    /// Milliseconds to sleep after each instruction (timers tick once per instruction).
    #[arg(long, default_value_t = 2)]
    delay: u64,

    /// Log pc, opcode, sp, I and V0-VF before every instruction (needs RUST_LOG=trace).
    #[arg(long)]
    trace: bool,

    /// Seed for the random number instruction.
    #[arg(long)]
    seed: Option<u64>,

    /// Stop after this many instructions.
    #[arg(long)]
    cycles: Option<u64>,

    /// Print the frame buffer as 0s and 1s on exit.
    #[arg(long)]
    dump: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let config = Config {
        seed: cli.seed,
        trace: cli.trace,
        cycle_delay: Duration::from_millis(cli.delay),
        max_cycles: cli.cycles,
    };

    // load a program
    let mut interpreter = Chip8Interpreter::new(&config);
    let mut f = File::open(&cli.rom)?;
    interpreter.load_program(&mut f)?;

    // initialise
    let mut display = MonoTermDisplay::new()?;
    let mut input = StdinInput::new()?;
    let mut env = Environment::new(interpreter, &mut display, &mut input, config);
    let outcome = env.main_loop();
    let dump = env.interpreter().framebuffer().to_string();
    drop(env);
    // put the terminal back before saying anything
    drop(input);

    // shove some junk on stdout to stop the cli messing up the last frame
    for _ in 0..3 {
        println!();
    }
    if cli.dump {
        print!("{}", dump);
    }
    outcome?;
    Ok(())
}
