use std::io::{self, stdout, Stdout, Write};
use std::time::{Duration, Instant};

use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute};

use chip8_vm::emulator::ports::Keypad;
use chip8_vm::emulator::state::{FrameBuffer, DISPLAY_HEIGHT, DISPLAY_WIDTH};

/// Tracks when each keypad key was last reported by the terminal.
///
/// Terminals deliver presses and auto-repeats but rarely a usable key-up,
/// so a key counts as held while its last report is fresher than the decay
/// window.
pub struct KeyDecay {
    window: Duration,
    pressed_at: [Option<Instant>; 16],
}

impl KeyDecay {
    pub fn new(window: Duration) -> KeyDecay {
        KeyDecay {
            window,
            pressed_at: [None; 16],
        }
    }

    pub fn press(&mut self, key: u8) {
        self.pressed_at[(key & 0x0F) as usize] = Some(Instant::now());
    }

    pub fn release(&mut self, key: u8) {
        self.pressed_at[(key & 0x0F) as usize] = None;
    }

    /// Write the current liveness of every key into the keypad.
    pub fn sync(&mut self, keypad: &mut Keypad) {
        for key in 0..16 {
            let held = match self.pressed_at[key] {
                Some(at) => at.elapsed() < self.window,
                None => false,
            };
            if !held {
                self.pressed_at[key] = None;
            }
            keypad.set(key as u8, held);
        }
    }
}

/// Renders the framebuffer into an alternate-screen terminal, one "██" cell
/// per pixel, inside a box-drawing border. Restores the terminal on drop.
pub struct CrosstermScreen {
    out: Stdout,
    cells: FrameBuffer,
    beeping: bool,
}

impl CrosstermScreen {
    pub fn new() -> io::Result<CrosstermScreen> {
        let mut out = stdout();
        execute!(out, EnterAlternateScreen, cursor::Hide)?;
        terminal::enable_raw_mode()?;
        let mut screen = CrosstermScreen {
            out,
            cells: [[0; DISPLAY_WIDTH]; DISPLAY_HEIGHT],
            beeping: false,
        };
        screen.draw_border()?;
        Ok(screen)
    }

    fn draw_border(&mut self) -> io::Result<()> {
        execute!(self.out, Clear(ClearType::All))?;
        // Each pixel is two columns wide, plus one border cell on each side.
        let right = 2 * DISPLAY_WIDTH + 2;
        let bottom = DISPLAY_HEIGHT + 2;
        for y in 1..=bottom {
            for x in 1..=right {
                if y != 1 && y != bottom && x != 1 && x != right {
                    continue;
                }
                let c = if y == 1 && x == 1 {
                    '┏'
                } else if y == 1 && x == right {
                    '┓'
                } else if y == bottom && x == 1 {
                    '┗'
                } else if y == bottom && x == right {
                    '┛'
                } else if y == 1 || y == bottom {
                    '━'
                } else {
                    '┃'
                };
                execute!(self.out, cursor::MoveTo(x as u16, y as u16))?;
                write!(self.out, "{}", c)?;
            }
        }
        self.out.flush()
    }

    /// Present a fresh frame, repainting only the cells that changed.
    pub fn present(&mut self, frame: &FrameBuffer) -> io::Result<()> {
        for y in 0..DISPLAY_HEIGHT {
            for x in 0..DISPLAY_WIDTH {
                if self.cells[y][x] != frame[y][x] {
                    self.cells[y][x] = frame[y][x];
                    execute!(self.out, cursor::MoveTo(2 * x as u16 + 2, y as u16 + 2))?;
                    write!(self.out, "{}", if frame[y][x] == 1 { "██" } else { "  " })?;
                }
            }
        }
        self.out.flush()
    }

    /// Show or clear the beep indicator under the display box.
    pub fn set_beeping(&mut self, beeping: bool) -> io::Result<()> {
        if beeping == self.beeping {
            return Ok(());
        }
        self.beeping = beeping;
        execute!(self.out, cursor::MoveTo(2, DISPLAY_HEIGHT as u16 + 3))?;
        write!(self.out, "{}", if beeping { "♪ beep" } else { "      " })?;
        self.out.flush()
    }
}

impl Drop for CrosstermScreen {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
        let _ = execute!(self.out, cursor::Show, LeaveAlternateScreen);
    }
}
