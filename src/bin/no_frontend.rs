use std::error::Error;
use std::fs::File;
use std::path::PathBuf;
use std::time::Duration;

use structopt::StructOpt;

use chip8_vm::emulator::emulator::Emulator;
use chip8_vm::emulator::ports::{HostRandom, Keypad, RandomSource, SeededRandom};

/// The program options.
#[derive(StructOpt)]
struct Opt {
    /// The ROM to execute
    #[structopt(parse(from_os_str))]
    rom: PathBuf,

    /// Instructions per second
    #[structopt(long, default_value = "700")]
    hz: u32,

    /// Stop after this many instructions; without it the run only ends on a
    /// fault (or, with no input wired up, spins forever on a key wait)
    #[structopt(long)]
    steps: Option<u64>,

    /// Seed the random source for a reproducible run
    #[structopt(long)]
    seed: Option<u64>,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let opt = Opt::from_args();
    log::info!("executing {:?}", &opt.rom);

    let rng: Box<dyn RandomSource> = match opt.seed {
        Some(seed) => Box::new(SeededRandom::new(seed)),
        None => Box::new(HostRandom),
    };
    let mut vm = Emulator::with_ports(Keypad::new(), rng);
    vm.load_reader(&mut File::open(&opt.rom)?)?;

    let hz = opt.hz.max(1);
    let step_period = Duration::from_secs_f64(1.0 / f64::from(hz));
    // One timer tick every hz/60 instructions approximates the 60 Hz clock.
    let steps_per_tick = u64::from((hz / 60).max(1));

    let mut executed = 0;
    while opt.steps.map_or(true, |limit| executed < limit) {
        vm.step()?;
        executed += 1;
        if executed % steps_per_tick == 0 {
            vm.tick_timers();
        }
        std::thread::sleep(step_period);
    }

    Ok(())
}
