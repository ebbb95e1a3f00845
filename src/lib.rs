/*!

A CHIP-8 virtual machine as specified at https://en.wikipedia.org/wiki/CHIP-8.

# Frontends

If you want to try the machine on some programs, there is a ready-to-use
terminal frontend you can run with
`cargo run --release --bin crossterm_frontend -- <rom>`.
The hex keypad sits on the left four columns of a QWERTY layout
(`1234`/`qwer`/`asdf`/`zxcv`); Esc quits. There is also a `no_frontend`
binary for smoke-running ROMs headless.

# Library

The main way of running a program is to load a ROM as bytes, then drive the
machine: `step` at your chosen instruction rate and `tick_timers` at 60 Hz.

```rust
use chip8_vm::emulator::emulator::{Emulator, Step};

let mut vm = Emulator::new();

// Load a program at address 0x200.
let clear_display = [0x00, 0xE0];
vm.load(&clear_display).unwrap();
assert_eq!(vm.step().unwrap(), Step::Executed);
```

Whenever `take_frame` returns a framebuffer the display is stale and should
be presented; the beeper should sound while `sound_active()` reports true.
A step can fault (bad fetch, stack misuse, illegal opcode), after which the
machine halts until `reset` or a fresh `load`.

Alternatively, you can experiment by executing instructions manually.

```rust
use chip8_vm::emulator::emulator::Emulator;
use chip8_vm::emulator::instruction::{Addr, Const, Instruction, Reg};

let mut vm = Emulator::new();

// Execute instructions one at a time
vm.execute(Instruction::ClearScreen).unwrap();

// Or many sequentially
vm.execute_many(&[
    Instruction::Jump(Addr(0x250)),
    Instruction::LoadConst(Reg(0xA), Const(35)),
    Instruction::Move(Reg(0xB), Reg(0xA)),
]).unwrap();
```

## Custom ports

Key input and randomness reach the machine through the `KeySource` and
`RandomSource` ports, so a headless machine with injected stubs behaves
identically to one wired to a real frontend. The stock `Keypad` works for
most hosts; seed the RNG for reproducible runs.

```rust
use chip8_vm::emulator::emulator::Emulator;
use chip8_vm::emulator::ports::{Keypad, SeededRandom};

let mut vm = Emulator::with_ports(Keypad::new(), SeededRandom::new(42));
vm.keys_mut().press(0x5);
```
*/

pub mod emulator;
pub mod util;
