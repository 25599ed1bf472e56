use heapless::Vec;

use crate::binding::{KeyBinding, LayerId};

pub const BASE_LAYER: LayerId = 0;
pub const MAX_LAYERS: usize = tapkey_common::MAX_LAYERS;

#[derive(Debug, Clone, Copy, Default)]
struct Activation {
    momentary: u8,
    toggled: bool,
    oneshot: bool,
}
impl Activation {
    fn is_active(&self) -> bool {
        self.momentary != 0 || self.toggled || self.oneshot
    }
}

/// Anything that can look up a single layer's binding for a key position.
pub trait LayerLookup {
    /// The binding at `row`, `col` of `layer`; [KeyBinding::Transparent] if unbound.
    fn binding(&self, layer: LayerId, row: usize, col: usize) -> KeyBinding;
}

/// The set of active layers. The base layer is always active and sits below every other layer.
/// Other layers are ordered by when they became active; the latest takes precedence.
///
/// Momentary, toggled and one-shot activations are independent flags; a layer is active while
/// any of them holds it on and keeps its place in the order until all are released.
#[derive(Default)]
pub struct LayerStack {
    flags: [Activation; MAX_LAYERS],
    order: Vec<LayerId, MAX_LAYERS>,
}
impl LayerStack {
    pub fn activate_momentary(&mut self, layer: LayerId) {
        self.update(layer, |a| a.momentary = a.momentary.saturating_add(1));
    }

    pub fn deactivate_momentary(&mut self, layer: LayerId) {
        self.update(layer, |a| a.momentary = a.momentary.saturating_sub(1));
    }

    pub fn toggle(&mut self, layer: LayerId) {
        self.update(layer, |a| a.toggled = !a.toggled);
    }

    pub fn set_oneshot(&mut self, layer: LayerId) {
        self.update(layer, |a| a.oneshot = true);
    }

    /// Clear every pending one-shot activation. Returns true if any was pending.
    pub fn consume_oneshot(&mut self) -> bool {
        let mut consumed = false;
        for layer in 1..MAX_LAYERS as LayerId {
            if self.flags[layer as usize].oneshot {
                consumed = true;
                self.update(layer, |a| a.oneshot = false);
            }
        }
        consumed
    }

    pub fn oneshot_pending(&self) -> bool {
        self.flags.iter().any(|a| a.oneshot)
    }

    pub fn is_active(&self, layer: LayerId) -> bool {
        layer == BASE_LAYER
            || self
                .flags
                .get(layer as usize)
                .is_some_and(Activation::is_active)
    }

    /// Bit mask of the active layers, base layer included.
    pub fn active_mask(&self) -> u32 {
        self.order.iter().fold(1u32, |m, l| m | 1 << l)
    }

    /// Active layers from highest to lowest precedence, ending with the base layer.
    pub fn iter(&self) -> impl Iterator<Item = LayerId> + '_ {
        self.order
            .iter()
            .rev()
            .copied()
            .chain(core::iter::once(BASE_LAYER))
    }

    /// The first non-transparent binding for the position walking down from the top layer.
    pub fn resolve(&self, lookup: &impl LayerLookup, row: usize, col: usize) -> KeyBinding {
        self.iter()
            .map(|layer| lookup.binding(layer, row, col))
            .find(|b| !b.is_transparent())
            .unwrap_or(KeyBinding::Noop)
    }

    pub fn clear(&mut self) {
        self.flags = [Activation::default(); MAX_LAYERS];
        self.order.clear();
    }

    fn update(&mut self, layer: LayerId, change: impl FnOnce(&mut Activation)) {
        if layer == BASE_LAYER {
            crate::debug!("base layer is always active");
            return;
        }
        let Some(flags) = self.flags.get_mut(layer as usize) else {
            crate::warn!("layer out of range {}", layer);
            return;
        };
        let was_active = flags.is_active();
        change(flags);
        let is_active = flags.is_active();

        if was_active && !is_active {
            self.order.retain(|l| *l != layer);
        } else if !was_active && is_active {
            // cannot overflow; one entry per layer
            let _ = self.order.push(layer);
        }
    }
}

#[cfg(test)]
#[path = "layers_test.rs"]
mod test;
