use tapkey_common::keycodes::{key_range, modifier_bits};

/// Live modifier state. Each modifier keeps a count of the keys holding it so that two keys
/// sharing a modifier release it only when both are up.
#[derive(Debug, Default, Clone)]
pub struct ModifierState {
    counts: [u8; 8],
}
impl ModifierState {
    /// Record a modifier key change. Returns false if `code` is not a modifier.
    pub fn key_switch(&mut self, code: u8, is_down: bool) -> bool {
        let code = code as u16;
        if !key_range::is_modifier(code) {
            return false;
        }
        let count = &mut self.counts[(code - key_range::MODIFIER_MIN) as usize];
        *count = if is_down {
            count.saturating_add(1)
        } else {
            count.saturating_sub(1)
        };
        true
    }

    /// Hold or let go of a modifier for a shifted key. Returns true when the modifier went on
    /// or off and so needs reporting.
    pub fn hold(&mut self, code: u8, is_down: bool) -> bool {
        let was_on = self.bits();
        self.key_switch(code, is_down) && was_on != self.bits()
    }

    pub fn bits(&self) -> u8 {
        self.counts
            .iter()
            .enumerate()
            .fold(0u8, |bits, (i, c)| if *c > 0 { bits | 1 << i } else { bits })
    }

    pub fn is_shifted(&self) -> bool {
        self.bits() & modifier_bits::SHIFT != 0
    }

    pub fn clear(&mut self) {
        self.counts = [0; 8];
    }
}

#[cfg(test)]
#[path = "modifiers_test.rs"]
mod test;
