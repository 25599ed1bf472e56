use tapkey_common::keycodes::key_range;

pub type LayerId = u8;

/// How a layer control key holds its layer on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ActivationMode {
    /// Active while the control key is held.
    Momentary,
    /// Flipped on each press; persists until pressed again.
    Toggled,
    /// Active until the next qualifying keypress.
    OneShot,
    /// Momentary while held; repeated taps flip the toggle.
    TapToggle,
}

/// What a (layer, key position) pair is bound to. Decoded from the `u16` keymap codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyBinding {
    /// Fall through to the next lower active layer.
    #[default]
    Transparent,
    Noop,
    /// HID keyboard usage, modifiers included.
    SimpleKey(u8),
    /// Non-modifier HID usage sent with left shift held.
    ShiftedKey(u8),
    /// HID consumer usage.
    Consumer(u16),
    LayerControl(LayerId, ActivationMode),
    GestureRef(u8),
    /// Index in to the dual symbol table.
    DualSymbol(u8),
    /// Index in to the unicode table.
    Unicode(u8),
    /// Index in to the tap-hold table.
    TapHold(u8),
}
impl KeyBinding {
    pub fn decode(code: u16) -> Option<Self> {
        use key_range::*;

        let index = (code & 0xff) as u8;
        Some(match code {
            TRANSPARENT => Self::Transparent,
            NOOP => Self::Noop,
            BASIC_MIN..=BASIC_MAX => Self::SimpleKey(code as u8),
            SHIFTED_MIN..=SHIFTED_MAX if !is_modifier(code - SHIFTED) => {
                Self::ShiftedKey((code - SHIFTED) as u8)
            }
            CONSUMER_MIN..=CONSUMER_MAX => Self::Consumer(code - CONSUMER_MIN),
            LAYER_MIN..=LAYER_MAX => Self::LayerControl(index, ActivationMode::Momentary),
            TOGGLE_MIN..=TOGGLE_MAX => Self::LayerControl(index, ActivationMode::Toggled),
            ONESHOT_MIN..=ONESHOT_MAX => Self::LayerControl(index, ActivationMode::OneShot),
            TAP_TOGGLE_MIN..=TAP_TOGGLE_MAX => {
                Self::LayerControl(index, ActivationMode::TapToggle)
            }
            DUAL_SYMBOL_MIN..=DUAL_SYMBOL_MAX => Self::DualSymbol(index),
            UNICODE_MIN..=UNICODE_MAX => Self::Unicode(index),
            GESTURE_MIN..=GESTURE_MAX => Self::GestureRef(index),
            TAP_HOLD_MIN..=TAP_HOLD_MAX => Self::TapHold(index),
            _ => return None,
        })
    }

    pub fn is_transparent(&self) -> bool {
        matches!(self, Self::Transparent)
    }

    pub fn is_modifier(&self) -> bool {
        matches!(self, Self::SimpleKey(kc) if key_range::is_modifier(*kc as u16))
    }

    /// True for bindings whose press should use up a pending one-shot layer.
    pub fn consumes_oneshot(&self) -> bool {
        match self {
            Self::SimpleKey(_) => !self.is_modifier(),
            Self::Noop
            | Self::ShiftedKey(_)
            | Self::Consumer(_)
            | Self::DualSymbol(_)
            | Self::Unicode(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
#[path = "binding_test.rs"]
mod test;
