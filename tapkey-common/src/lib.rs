#![no_std]
pub mod globals;
pub mod keycodes;

/// Version of the binary keymap layout. Bumped whenever [keycodes] or the record layout changes.
pub const PROTOCOL_VERSION: u16 = 2;

/// Layers a keymap may define, base layer included.
pub const MAX_LAYERS: usize = 32;

/// Words in one tap-dance record: the timeout followed by one action per classified outcome.
pub const GESTURE_RECORD_LEN: usize = 7;

/// Words in one tap-hold record: the timeout, the tap action then the hold action.
pub const TAP_HOLD_RECORD_LEN: usize = 3;

/// Order of the outcome actions within a tap-dance record.
pub mod gesture_slots {
    pub const SINGLE_TAP: usize = 0;
    pub const SINGLE_HOLD: usize = 1;
    pub const DOUBLE_TAP: usize = 2;
    pub const DOUBLE_HOLD: usize = 3;
    pub const TRIPLE_TAP: usize = 4;
    pub const TRIPLE_HOLD: usize = 5;
    pub const COUNT: usize = 6;

    /// Marks a tap-dance or tap-hold timeout that should fall back to the `tapping_term` global.
    pub const DEFAULT_TIMEOUT: u16 = u16::MAX;
}

/// Split a code point in to the two words stored in a keymap.
pub fn u32_to_u16(n: u32) -> [u16; 2] {
    [n as u16, (n >> 16) as u16]
}

pub fn u32_from_u16(low: u16, high: u16) -> u32 {
    low as u32 | ((high as u32) << 16)
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod test;
