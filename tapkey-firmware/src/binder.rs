use heapless::Vec;
use tapkey_common::gesture_slots;

use crate::{
    binding::KeyBinding,
    gesture::{Finalized, GestureOutcome},
    key_scanner::PhysicalKey,
};

/// The forward effect chosen for a finalized gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Applied {
    /// Press and release the binding straight away.
    Tap(KeyBinding),
    /// Press the binding now; [GestureBinder::release] hands it back when the key comes up.
    Hold(KeyBinding),
}

/// A held binding waiting for its key's release.
#[derive(Debug, Clone, Copy)]
struct PendingAction {
    key: PhysicalKey,
    binding: KeyBinding,
}

/// Maps gesture outcomes to bindings and remembers the hold outcomes that need reverting.
///
/// Press and release of a gesture key reach the mapper as unrelated events, so the binding in
/// effect is kept here keyed by the key position rather than in a single shared slot.
pub struct GestureBinder<const N: usize> {
    pending: Vec<PendingAction, N>,
}
impl<const N: usize> Default for GestureBinder<N> {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
        }
    }
}
impl<const N: usize> GestureBinder<N> {
    /// Choose the effect for `fin` from the record's outcome `actions`. Unbound outcomes and
    /// [GestureOutcome::Unknown] have no effect.
    pub fn apply(
        &mut self,
        fin: &Finalized,
        actions: &[u16; gesture_slots::COUNT],
    ) -> Option<Applied> {
        let Some(slot) = fin.outcome.slot() else {
            crate::warn!(
                "gesture {} overflowed its tap count; ignored",
                fin.gesture
            );
            return None;
        };
        let binding = KeyBinding::decode(actions[slot]).unwrap_or(KeyBinding::Noop);
        if matches!(binding, KeyBinding::Transparent | KeyBinding::Noop) {
            return None;
        }

        if fin.outcome.is_hold() && fin.pressed {
            if self.pending.iter().any(|p| p.key == fin.key) {
                crate::warn!("gesture key {} {} already held", fin.key.row, fin.key.col);
                return None;
            }
            if self
                .pending
                .push(PendingAction {
                    key: fin.key,
                    binding,
                })
                .is_err()
            {
                crate::warn!("too many held gestures; ignored");
                return None;
            }
            Some(Applied::Hold(binding))
        } else {
            Some(Applied::Tap(binding))
        }
    }

    /// Take the binding a hold outcome left pressed on `key`.
    pub fn release(&mut self, key: PhysicalKey) -> Option<KeyBinding> {
        let i = self.pending.iter().position(|p| p.key == key)?;
        Some(self.pending.swap_remove(i).binding)
    }

    pub fn is_pending(&self, key: PhysicalKey) -> bool {
        self.pending.iter().any(|p| p.key == key)
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
#[path = "binder_test.rs"]
mod test;
