pub mod key_range {
    pub const MAX_LAYER_N: u16 = 0xff;

    pub const TRANSPARENT: u16 = 0;
    pub const NOOP: u16 = 1;

    pub const BASIC_MIN: u16 = 0x4;
    pub const BASIC_A: u16 = 0x4;
    pub const BASIC_1: u16 = 0x1e;
    pub const BASIC_0: u16 = 0x27;
    pub const BASIC_MAX: u16 = 0xfe;
    pub const MODIFIER_MIN: u16 = 0xe0;
    pub const MODIFIER_MAX: u16 = 0xe7;
    pub const LEFT_SHIFT: u16 = 0xe1;
    pub const RIGHT_SHIFT: u16 = 0xe5;
    pub const CONSUMER_MIN: u16 = 0x100;
    pub const CONSUMER_MAX: u16 = 0x3a0;

    /// A basic key sent with left shift held, e.g. `(` as shifted `9`.
    pub const SHIFTED: u16 = 0x400;
    pub const SHIFTED_MIN: u16 = SHIFTED + BASIC_MIN;
    pub const SHIFTED_MAX: u16 = SHIFTED + BASIC_MAX;

    pub const LAYER: u16 = 0x600;
    pub const TOGGLE: u16 = 0x700;
    pub const ONESHOT: u16 = 0x900;
    pub const TAP_TOGGLE: u16 = 0xa00;
    pub const LAYERS_LAST: u16 = TAP_TOGGLE + MAX_LAYER_N;

    pub const TAP_HOLD: u16 = 0x800;

    pub const DUAL_SYMBOL: u16 = 0xb00;
    pub const UNICODE: u16 = 0xc00;
    pub const GESTURE: u16 = 0xd00;

    pub const LAYER_MIN: u16 = LAYER;
    pub const LAYER_MAX: u16 = LAYER_MIN + MAX_LAYER_N;
    pub const TOGGLE_MIN: u16 = TOGGLE;
    pub const TOGGLE_MAX: u16 = TOGGLE_MIN + MAX_LAYER_N;
    pub const ONESHOT_MIN: u16 = ONESHOT;
    pub const ONESHOT_MAX: u16 = ONESHOT_MIN + MAX_LAYER_N;
    pub const TAP_TOGGLE_MIN: u16 = TAP_TOGGLE;
    pub const TAP_TOGGLE_MAX: u16 = TAP_TOGGLE_MIN + MAX_LAYER_N;
    pub const DUAL_SYMBOL_MIN: u16 = DUAL_SYMBOL;
    pub const DUAL_SYMBOL_MAX: u16 = DUAL_SYMBOL_MIN + MAX_LAYER_N;
    pub const UNICODE_MIN: u16 = UNICODE;
    pub const UNICODE_MAX: u16 = UNICODE_MIN + MAX_LAYER_N;
    pub const GESTURE_MIN: u16 = GESTURE;
    pub const GESTURE_MAX: u16 = GESTURE_MIN + MAX_LAYER_N;
    pub const TAP_HOLD_MIN: u16 = TAP_HOLD;
    pub const TAP_HOLD_MAX: u16 = TAP_HOLD_MIN + MAX_LAYER_N;

    pub fn base_code(code: u16) -> u16 {
        code & 0xff00
    }

    pub fn is_modifier(code: u16) -> bool {
        (MODIFIER_MIN..=MODIFIER_MAX).contains(&code)
    }
}

/// Bit masks of the eight HID modifiers, in usage order starting at `LeftControl`.
pub mod modifier_bits {
    pub const LEFT_CTRL: u8 = 1;
    pub const LEFT_SHIFT: u8 = 1 << 1;
    pub const LEFT_ALT: u8 = 1 << 2;
    pub const LEFT_GUI: u8 = 1 << 3;
    pub const RIGHT_CTRL: u8 = 1 << 4;
    pub const RIGHT_SHIFT: u8 = 1 << 5;
    pub const RIGHT_ALT: u8 = 1 << 6;
    pub const RIGHT_GUI: u8 = 1 << 7;

    pub const SHIFT: u8 = LEFT_SHIFT | RIGHT_SHIFT;
}
