//! The fetch/decode/execute engine, driven by a host through `step` and
//! `tick_timers`.

use std::io;

use crate::emulator::error::{Fault, LoadError};
use crate::emulator::instruction::{Addr, Const, Instruction, Reg};
use crate::emulator::ports::{HostRandom, KeySource, Keypad, RandomSource};
use crate::emulator::quirks::Quirks;
use crate::emulator::state::{
    FrameBuffer, Machine, DISPLAY_HEIGHT, DISPLAY_WIDTH, FONT_BASE, GLYPH_BYTES, MAX_ROM_SIZE,
    MEMORY_SIZE, PROGRAM_BASE, STACK_DEPTH,
};

/// What a successful step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// One instruction was fetched and executed.
    Executed,
    /// The machine is blocked on Fx0A with no key down. The program counter
    /// was not advanced; the next step retries the wait.
    WaitingForKey,
}

/// A CHIP-8 machine wired to its key and randomness ports.
///
/// The host drives `step` at its chosen instruction rate and `tick_timers`
/// at 60 Hz. Neither call blocks; the wait-for-key instruction surfaces as
/// [`Step::WaitingForKey`] instead.
pub struct Emulator<K: KeySource, R: RandomSource> {
    state: Machine,
    quirks: Quirks,
    keys: K,
    rng: R,
    fault: Option<Fault>,
}

impl Emulator<Keypad, HostRandom> {
    /// Create an emulator with a stock keypad and host-entropy randomness.
    pub fn new() -> Self {
        Emulator::with_ports(Keypad::new(), HostRandom)
    }
}

impl Default for Emulator<Keypad, HostRandom> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: KeySource, R: RandomSource> Emulator<K, R> {
    /// Create an emulator with the given key and randomness ports.
    pub fn with_ports(keys: K, rng: R) -> Emulator<K, R> {
        Emulator {
            state: Machine::new(),
            quirks: Quirks::default(),
            keys,
            rng,
            fault: None,
        }
    }

    /// Reset the machine, then copy a ROM into memory at the program base.
    pub fn load(&mut self, rom: &[u8]) -> Result<(), LoadError> {
        if rom.len() > MAX_ROM_SIZE {
            return Err(LoadError::RomTooLarge { size: rom.len(), max: MAX_ROM_SIZE });
        }
        self.reset();
        let base = PROGRAM_BASE as usize;
        self.state.memory[base..base + rom.len()].copy_from_slice(rom);
        log::debug!("loaded {} byte ROM at {:#05X}", rom.len(), PROGRAM_BASE);
        Ok(())
    }

    /// Load a ROM from a reader, typically an opened file.
    pub fn load_reader(&mut self, reader: &mut dyn io::Read) -> Result<(), LoadError> {
        let mut rom = Vec::new();
        reader.read_to_end(&mut rom)?;
        self.load(&rom)
    }

    /// Restore the power-on state and clear any latched fault.
    pub fn reset(&mut self) {
        self.state.reset();
        self.fault = None;
    }

    /// Fetch, decode, and execute one instruction.
    ///
    /// A returned fault latches: every later step reports it again until the
    /// machine is reset or a new ROM is loaded.
    pub fn step(&mut self) -> Result<Step, Fault> {
        if let Some(fault) = self.fault {
            return Err(fault);
        }
        let result = self.fetch().and_then(|op| {
            let instruction = Instruction::decode(op);
            log::trace!("{:#06X} @ {:#05X}: {:?}", op, self.state.pc, instruction);
            self.execute(instruction)
        });
        if let Err(fault) = result {
            self.fault = Some(fault);
        }
        result
    }

    fn fetch(&self) -> Result<u16, Fault> {
        let pc = self.state.pc;
        if pc as usize + 1 >= MEMORY_SIZE {
            return Err(Fault::BadPc { pc });
        }
        Ok(u16::from_be_bytes([
            self.state.memory[pc as usize],
            self.state.memory[pc as usize + 1],
        ]))
    }

    /// Execute a single, already decoded instruction.
    ///
    /// The program counter advances by 2 before the opcode body runs, so
    /// jumps overwrite it, skips add another 2, and a call pushes the
    /// address of the instruction after itself. This is also the manual
    /// surface: it does not consult or latch the fault state.
    pub fn execute(&mut self, instruction: Instruction) -> Result<Step, Fault> {
        self.state.pc += 2;

        match instruction {
            Instruction::ClearScreen => {
                self.state.framebuffer = [[0; DISPLAY_WIDTH]; DISPLAY_HEIGHT];
                self.state.draw_flag = true;
            }

            Instruction::Return => {
                if self.state.sp == 0 {
                    return Err(Fault::StackUnderflow);
                }
                self.state.sp -= 1;
                // The stored address already points past the call.
                self.state.pc = self.state.stack[self.state.sp as usize];
            }

            // Legacy machine-code call; modern ROMs never rely on it.
            Instruction::Sys(Addr(_)) => {}

            Instruction::Jump(Addr(addr)) => {
                self.state.pc = addr;
            }

            Instruction::Call(Addr(addr)) => {
                if self.state.sp as usize == STACK_DEPTH {
                    return Err(Fault::StackOverflow);
                }
                self.state.stack[self.state.sp as usize] = self.state.pc;
                self.state.sp += 1;
                self.state.pc = addr;
            }

            Instruction::SkipEqConst(Reg(x), Const(kk)) => {
                if self.state.v[x as usize] == kk {
                    self.state.pc += 2;
                }
            }

            Instruction::SkipNeConst(Reg(x), Const(kk)) => {
                if self.state.v[x as usize] != kk {
                    self.state.pc += 2;
                }
            }

            Instruction::SkipEqReg(Reg(x), Reg(y)) => {
                if self.state.v[x as usize] == self.state.v[y as usize] {
                    self.state.pc += 2;
                }
            }

            Instruction::LoadConst(Reg(x), Const(kk)) => {
                self.state.v[x as usize] = kk;
            }

            // The immediate add never reports a carry.
            Instruction::AddConst(Reg(x), Const(kk)) => {
                self.state.v[x as usize] = self.state.v[x as usize].wrapping_add(kk);
            }

            Instruction::Move(Reg(x), Reg(y)) => {
                self.state.v[x as usize] = self.state.v[y as usize];
            }

            Instruction::Or(Reg(x), Reg(y)) => {
                self.state.v[x as usize] |= self.state.v[y as usize];
            }

            Instruction::And(Reg(x), Reg(y)) => {
                self.state.v[x as usize] &= self.state.v[y as usize];
            }

            Instruction::Xor(Reg(x), Reg(y)) => {
                self.state.v[x as usize] ^= self.state.v[y as usize];
            }

            // For every flagged operation the result is committed first and
            // the flag second, so when x is 0xF only the flag survives.
            Instruction::AddReg(Reg(x), Reg(y)) => {
                let (sum, carry) = self.state.v[x as usize].overflowing_add(self.state.v[y as usize]);
                self.state.v[x as usize] = sum;
                self.state.v[0xF] = carry as u8;
            }

            Instruction::SubReg(Reg(x), Reg(y)) => {
                let (diff, borrow) = self.state.v[x as usize].overflowing_sub(self.state.v[y as usize]);
                self.state.v[x as usize] = diff;
                self.state.v[0xF] = !borrow as u8;
            }

            Instruction::SubFrom(Reg(x), Reg(y)) => {
                let (diff, borrow) = self.state.v[y as usize].overflowing_sub(self.state.v[x as usize]);
                self.state.v[x as usize] = diff;
                self.state.v[0xF] = !borrow as u8;
            }

            Instruction::ShiftRight(Reg(x), Reg(y)) => {
                let source = if self.quirks.shift_reads_vy {
                    self.state.v[y as usize]
                } else {
                    self.state.v[x as usize]
                };
                self.state.v[x as usize] = source >> 1;
                self.state.v[0xF] = source & 1;
            }

            Instruction::ShiftLeft(Reg(x), Reg(y)) => {
                let source = if self.quirks.shift_reads_vy {
                    self.state.v[y as usize]
                } else {
                    self.state.v[x as usize]
                };
                self.state.v[x as usize] = source << 1;
                self.state.v[0xF] = source >> 7;
            }

            Instruction::SkipNeReg(Reg(x), Reg(y)) => {
                if self.state.v[x as usize] != self.state.v[y as usize] {
                    self.state.pc += 2;
                }
            }

            Instruction::LoadIndex(Addr(addr)) => {
                self.state.i = addr;
            }

            Instruction::JumpOffset(Addr(addr)) => {
                let offset = if self.quirks.jump_adds_vx {
                    self.state.v[((addr >> 8) & 0x0F) as usize]
                } else {
                    self.state.v[0]
                };
                self.state.pc = addr + u16::from(offset);
            }

            Instruction::Random(Reg(x), Const(kk)) => {
                self.state.v[x as usize] = self.rng.next_u8() & kk;
            }

            Instruction::Draw(Reg(x), Reg(y), Const(n)) => {
                self.draw_sprite(x, y, n);
            }

            Instruction::SkipKeyDown(Reg(x)) => {
                if self.keys.key_down(self.state.v[x as usize] & 0x0F) {
                    self.state.pc += 2;
                }
            }

            Instruction::SkipKeyUp(Reg(x)) => {
                if !self.keys.key_down(self.state.v[x as usize] & 0x0F) {
                    self.state.pc += 2;
                }
            }

            Instruction::ReadDelay(Reg(x)) => {
                self.state.v[x as usize] = self.state.delay_timer;
            }

            Instruction::WaitKey(Reg(x)) => match self.keys.first_pressed() {
                Some(key) => self.state.v[x as usize] = key,
                None => {
                    // Retry this instruction on the next step; the timers
                    // keep running in the meantime.
                    self.state.pc -= 2;
                    return Ok(Step::WaitingForKey);
                }
            },

            Instruction::SetDelay(Reg(x)) => {
                self.state.delay_timer = self.state.v[x as usize];
            }

            Instruction::SetSound(Reg(x)) => {
                self.state.sound_timer = self.state.v[x as usize];
            }

            Instruction::AddIndex(Reg(x)) => {
                let sum = self.state.i + u16::from(self.state.v[x as usize]);
                self.state.i = sum & 0x0FFF;
                if self.quirks.index_overflow_flag {
                    self.state.v[0xF] = (sum > 0x0FFF) as u8;
                }
            }

            // Each font glyph is five bytes; the low nibble selects it.
            Instruction::LoadGlyph(Reg(x)) => {
                let digit = u16::from(self.state.v[x as usize] & 0x0F);
                self.state.i = FONT_BASE as u16 + digit * GLYPH_BYTES as u16;
            }

            Instruction::StoreBcd(Reg(x)) => {
                let value = self.state.v[x as usize];
                let i = self.state.i as usize;
                self.state.memory[i % MEMORY_SIZE] = value / 100;
                self.state.memory[(i + 1) % MEMORY_SIZE] = value / 10 % 10;
                self.state.memory[(i + 2) % MEMORY_SIZE] = value % 10;
            }

            Instruction::StoreRegisters(Reg(x)) => {
                for r in 0..=x as usize {
                    self.state.memory[(self.state.i as usize + r) % MEMORY_SIZE] = self.state.v[r];
                }
                if self.quirks.increment_index {
                    self.state.i = (self.state.i + u16::from(x) + 1) & 0x0FFF;
                }
            }

            Instruction::LoadRegisters(Reg(x)) => {
                for r in 0..=x as usize {
                    self.state.v[r] = self.state.memory[(self.state.i as usize + r) % MEMORY_SIZE];
                }
                if self.quirks.increment_index {
                    self.state.i = (self.state.i + u16::from(x) + 1) & 0x0FFF;
                }
            }

            Instruction::Illegal(opcode) => {
                return Err(Fault::IllegalOpcode { opcode });
            }
        };

        Ok(Step::Executed)
    }

    /// Execute a batch of instructions, stopping at the first fault.
    pub fn execute_many(&mut self, instructions: &[Instruction]) -> Result<(), Fault> {
        for instruction in instructions {
            self.execute(*instruction)?;
        }
        Ok(())
    }

    /// XOR a sprite of `n` rows into the framebuffer, reading rows from
    /// memory at I. Start coordinates wrap; per-pixel coordinates clip
    /// unless the wrap quirk is on. VF reports whether any lit pixel was
    /// erased.
    fn draw_sprite(&mut self, x: u8, y: u8, n: u8) {
        let x0 = self.state.v[x as usize] as usize % DISPLAY_WIDTH;
        let y0 = self.state.v[y as usize] as usize % DISPLAY_HEIGHT;
        self.state.v[0xF] = 0;
        for row in 0..n as usize {
            let bits = self.state.memory[(self.state.i as usize + row) % MEMORY_SIZE];
            for col in 0..8 {
                if bits >> (7 - col) & 1 == 0 {
                    continue;
                }
                let (cx, cy) = if self.quirks.wrap_sprites {
                    ((x0 + col) % DISPLAY_WIDTH, (y0 + row) % DISPLAY_HEIGHT)
                } else {
                    let (cx, cy) = (x0 + col, y0 + row);
                    if cx >= DISPLAY_WIDTH || cy >= DISPLAY_HEIGHT {
                        continue;
                    }
                    (cx, cy)
                };
                if self.state.framebuffer[cy][cx] == 1 {
                    self.state.v[0xF] = 1;
                }
                self.state.framebuffer[cy][cx] ^= 1;
            }
        }
        self.state.draw_flag = true;
    }

    /// Advance the two 60 Hz countdown timers by one tick. Independent of
    /// `step`; the host schedules this off the wall clock. Never fails.
    pub fn tick_timers(&mut self) {
        self.state.delay_timer = self.state.delay_timer.saturating_sub(1);
        self.state.sound_timer = self.state.sound_timer.saturating_sub(1);
    }

    /// The framebuffer, whether or not it changed since the last present.
    pub fn framebuffer(&self) -> &FrameBuffer {
        &self.state.framebuffer
    }

    /// Whether the display changed since the host last took a frame.
    pub fn draw_flag(&self) -> bool {
        self.state.draw_flag
    }

    /// The framebuffer if it changed since the last call, clearing the
    /// dirty latch. The display sink's edge-triggered surface.
    pub fn take_frame(&mut self) -> Option<&FrameBuffer> {
        if self.state.draw_flag {
            self.state.draw_flag = false;
            Some(&self.state.framebuffer)
        } else {
            None
        }
    }

    /// Whether the beeper should sound right now.
    pub fn sound_active(&self) -> bool {
        self.state.sound_timer > 0
    }

    /// The latched fault, if the machine has halted.
    pub fn fault(&self) -> Option<Fault> {
        self.fault
    }

    pub fn quirks(&self) -> Quirks {
        self.quirks
    }

    pub fn quirks_mut(&mut self) -> &mut Quirks {
        &mut self.quirks
    }

    pub fn keys(&self) -> &K {
        &self.keys
    }

    /// The key port, for frontends to submit press/release updates.
    pub fn keys_mut(&mut self) -> &mut K {
        &mut self.keys
    }
}
