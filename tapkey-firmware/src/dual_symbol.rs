use crate::modifiers::ModifierState;

/// A key position bound to two code points, chosen by the shift state at the moment of the
/// press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DualSymbol {
    pub unshifted: u32,
    pub shifted: u32,
}
impl DualSymbol {
    pub const fn new(unshifted: u32, shifted: u32) -> Self {
        Self { unshifted, shifted }
    }

    /// Must be called for every press; never cache the result since shift may change between
    /// presses.
    pub fn resolve(&self, modifiers: &ModifierState) -> u32 {
        if modifiers.is_shifted() {
            self.shifted
        } else {
            self.unshifted
        }
    }
}
