use std::error::Error;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use log::LevelFilter;
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use structopt::StructOpt;

use chip8_vm::emulator::emulator::Emulator;
use chip8_vm::emulator::ports::{HostRandom, Keypad, RandomSource, SeededRandom};
use chip8_vm::emulator::quirks::Quirks;

mod crossterm_io;
mod keymap;

use crossterm_io::{CrosstermScreen, KeyDecay};

/// How long a reported key press counts as held.
const KEY_DECAY: Duration = Duration::from_millis(250);

/// The program options.
#[derive(StructOpt)]
struct Opt {
    /// The ROM to execute
    #[structopt(parse(from_os_str))]
    rom: PathBuf,

    /// Instructions per second
    #[structopt(long, default_value = "700")]
    hz: u32,

    /// Seed the random source for a reproducible run
    #[structopt(long)]
    seed: Option<u64>,

    /// Append logs to this file (the terminal itself is occupied by the display)
    #[structopt(long, parse(from_os_str))]
    log_file: Option<PathBuf>,

    /// 8xy6/8xyE shift Vy into Vx (COSMAC VIP behavior)
    #[structopt(long)]
    shift_reads_vy: bool,

    /// Fx55/Fx65 leave I pointing past the copied registers (COSMAC VIP)
    #[structopt(long)]
    increment_index: bool,

    /// Bnnn jumps to Vx + nn instead of V0 + nnn (SCHIP)
    #[structopt(long)]
    jump_adds_vx: bool,

    /// Dxyn wraps sprites at the display edges instead of clipping
    #[structopt(long)]
    wrap_sprites: bool,

    /// Fx1E leaves VF alone when I runs past 0xFFF
    #[structopt(long)]
    no_index_overflow_flag: bool,
}

impl Opt {
    fn quirks(&self) -> Quirks {
        Quirks {
            shift_reads_vy: self.shift_reads_vy,
            increment_index: self.increment_index,
            jump_adds_vx: self.jump_adds_vx,
            wrap_sprites: self.wrap_sprites,
            index_overflow_flag: !self.no_index_overflow_flag,
        }
    }
}

fn init_logging(path: &Path) -> Result<(), Box<dyn Error>> {
    let logfile = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{d} {l} {t} - {m}{n}")))
        .build(path)?;
    let config = Config::builder()
        .appender(Appender::builder().build("logfile", Box::new(logfile)))
        .build(Root::builder().appender("logfile").build(LevelFilter::Trace))?;
    log4rs::init_config(config)?;
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let opt = Opt::from_args();
    if let Some(path) = &opt.log_file {
        init_logging(path)?;
    }
    log::info!("executing {:?}", &opt.rom);

    let rng: Box<dyn RandomSource> = match opt.seed {
        Some(seed) => Box::new(SeededRandom::new(seed)),
        None => Box::new(HostRandom),
    };
    let mut vm = Emulator::with_ports(Keypad::new(), rng);
    *vm.quirks_mut() = opt.quirks();
    vm.load_reader(&mut File::open(&opt.rom)?)?;

    let mut screen = CrosstermScreen::new()?;
    let mut keys = KeyDecay::new(KEY_DECAY);

    let step_period = Duration::from_secs_f64(1.0 / f64::from(opt.hz.max(1)));
    let timer_period = Duration::from_micros(1_000_000 / 60);
    let mut next_tick = Instant::now() + timer_period;

    loop {
        // Drain pending terminal events before the next instruction.
        while event::poll(Duration::from_secs(0))? {
            if let Event::Key(key) = event::read()? {
                if key.code == KeyCode::Esc {
                    return Ok(());
                }
                if let Some(k) = keymap::keymap(key.code) {
                    if key.kind == KeyEventKind::Release {
                        keys.release(k);
                    } else {
                        keys.press(k);
                    }
                }
            }
        }
        keys.sync(vm.keys_mut());

        vm.step().map_err(|fault| {
            log::error!("machine fault: {}", fault);
            fault
        })?;

        if let Some(frame) = vm.take_frame() {
            screen.present(frame)?;
        }
        screen.set_beeping(vm.sound_active())?;

        if Instant::now() >= next_tick {
            vm.tick_timers();
            next_tick += timer_period;
        }
        std::thread::sleep(step_period);
    }
}
