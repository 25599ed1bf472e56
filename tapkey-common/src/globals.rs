pub const TAPPING_TERM: u16 = 0;
pub const TAP_TOGGLE_COUNT: u16 = 1;
pub const TAP_TOGGLE_TERM: u16 = 2;

pub const TAPPING_TERM_DEFAULT: u16 = 200;
pub const TAP_TOGGLE_COUNT_DEFAULT: u16 = 5;
pub const TAP_TOGGLE_TERM_DEFAULT: u16 = 200;

pub const COUNT: usize = 3;

pub const DEFAULTS: [u16; COUNT] = [
    TAPPING_TERM_DEFAULT,
    TAP_TOGGLE_COUNT_DEFAULT,
    TAP_TOGGLE_TERM_DEFAULT,
];

/// Inclusive limits a global may be set to.
pub const fn limits(index: u16) -> Option<(u16, u16)> {
    match index {
        TAPPING_TERM => Some((10, 5000)),
        TAP_TOGGLE_COUNT => Some((1, 50)),
        TAP_TOGGLE_TERM => Some((10, 5000)),
        _ => None,
    }
}
