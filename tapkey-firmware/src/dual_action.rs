//! Tap-hold keys.
//!
//! A tap-hold key waits from its press. Releasing it before the timeout is a tap. The timeout
//! passing, or another key going down first, makes it a hold, so a Space Cadet shift is already
//! held when the key it shifts is pressed.

use DualActionTimer::*;

use crate::key_scanner::PhysicalKey;

/// How a waiting tap-hold key resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Resolved {
    /// Press and release `tap` now; the key is already up.
    Tap { key: PhysicalKey, tap: u16 },
    /// Press `hold` now; the key's release lets it go.
    Hold { key: PhysicalKey, hold: u16 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DualActionTimer {
    #[default]
    NoDual,
    Wait {
        key: PhysicalKey,
        deadline: u64,
        tap: u16,
        hold: u16,
    },
}
impl DualActionTimer {
    /// Start waiting on `key`. A key already waiting resolves as a hold first.
    pub fn start(
        &mut self,
        key: PhysicalKey,
        tap: u16,
        hold: u16,
        timeout: u16,
        now: u64,
    ) -> Option<Resolved> {
        let prev = self.resolve_hold();
        *self = Wait {
            key,
            deadline: now + timeout as u64,
            tap,
            hold,
        };
        prev
    }

    pub fn is_waiting(&self, key: PhysicalKey) -> bool {
        matches!(self, Wait { key: k, .. } if *k == key)
    }

    /// Feed a scan event. The waiting key's release is a tap; a press of any other key is a
    /// hold. Releases of other keys leave it waiting.
    pub fn key_switch(&mut self, key: PhysicalKey, is_down: bool) -> Option<Resolved> {
        let Wait { key: waiting, tap, .. } = *self else {
            return None;
        };
        if key == waiting {
            if is_down {
                return None;
            }
            *self = NoDual;
            Some(Resolved::Tap { key, tap })
        } else if is_down {
            self.resolve_hold()
        } else {
            None
        }
    }

    pub fn expire(&mut self, now: u64) -> Option<Resolved> {
        if self.wait_until() <= now {
            self.resolve_hold()
        } else {
            None
        }
    }

    pub fn wait_until(&self) -> u64 {
        match self {
            Wait { deadline, .. } => *deadline,
            NoDual => u64::MAX,
        }
    }

    pub fn clear(&mut self) {
        *self = NoDual;
    }

    fn resolve_hold(&mut self) -> Option<Resolved> {
        let Wait { key, hold, .. } = *self else {
            return None;
        };
        *self = NoDual;
        Some(Resolved::Hold { key, hold })
    }
}

#[cfg(test)]
#[path = "dual_action_test.rs"]
mod test;
