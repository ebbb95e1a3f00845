//! Behavioral variations between historical CHIP-8 interpreters.
//!
//! ROMs disagree about these, so each one is a toggle. The defaults follow
//! CHIP-48 shifts and register save/load, the classic Bnnn jump, clipping
//! sprites, and the Amiga Fx1E overflow flag.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quirks {
    /// 8xy6/8xyE shift Vy into Vx (COSMAC VIP) instead of operating on Vx.
    pub shift_reads_vy: bool,
    /// Fx55/Fx65 leave I at I + x + 1 (COSMAC VIP) instead of unchanged.
    pub increment_index: bool,
    /// Bnnn jumps to Vx + nn (SCHIP Bxnn) instead of V0 + nnn.
    pub jump_adds_vx: bool,
    /// Dxyn wraps per-pixel coordinates at the display edges instead of
    /// clipping. Start coordinates wrap regardless.
    pub wrap_sprites: bool,
    /// Fx1E sets VF when I + Vx runs past 0xFFF (Amiga).
    pub index_overflow_flag: bool,
}

impl Default for Quirks {
    fn default() -> Quirks {
        Quirks {
            shift_reads_vy: false,
            increment_index: false,
            jump_adds_vx: false,
            wrap_sprites: false,
            index_overflow_flag: true,
        }
    }
}
