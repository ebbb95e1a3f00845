//! Ports connecting the virtual machine to its frontends.
//!
//! The executor never performs I/O itself: key state and randomness reach it
//! through these traits, so a headless machine with injected stubs behaves
//! identically to one wired to a real frontend. The display and the beeper
//! need no traits here; hosts poll `take_frame` and `sound_active` on the
//! emulator instead.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Where the executor reads the 16-key hex keypad from.
pub trait KeySource {
    /// Whether `key` (0x0..=0xF) is currently held down.
    fn key_down(&self, key: u8) -> bool;

    /// The lowest-numbered key currently held down.
    fn first_pressed(&self) -> Option<u8>;
}

/// Stock key state for frontends to drive.
///
/// All keys start released, so a fresh `Keypad` doubles as the stub for
/// hosts without input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Keypad {
    keys: [bool; 16],
}

impl Keypad {
    pub fn new() -> Keypad {
        Keypad::default()
    }

    pub fn press(&mut self, key: u8) {
        self.keys[(key & 0x0F) as usize] = true;
    }

    pub fn release(&mut self, key: u8) {
        self.keys[(key & 0x0F) as usize] = false;
    }

    pub fn set(&mut self, key: u8, down: bool) {
        self.keys[(key & 0x0F) as usize] = down;
    }
}

impl KeySource for Keypad {
    fn key_down(&self, key: u8) -> bool {
        self.keys[(key & 0x0F) as usize]
    }

    fn first_pressed(&self) -> Option<u8> {
        self.keys.iter().position(|down| *down).map(|key| key as u8)
    }
}

/// Where Cxkk draws its random bytes from. Injectable so tests and
/// reproducible runs can pin the sequence.
pub trait RandomSource {
    fn next_u8(&mut self) -> u8;
}

impl<T: RandomSource + ?Sized> RandomSource for Box<T> {
    fn next_u8(&mut self) -> u8 {
        (**self).next_u8()
    }
}

/// Host-entropy randomness.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostRandom;

impl RandomSource for HostRandom {
    fn next_u8(&mut self) -> u8 {
        rand::random::<u8>()
    }
}

/// Deterministic randomness seeded once, for tests and `--seed` runs.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> SeededRandom {
        SeededRandom { rng: StdRng::seed_from_u64(seed) }
    }
}

impl RandomSource for SeededRandom {
    fn next_u8(&mut self) -> u8 {
        self.rng.gen()
    }
}
