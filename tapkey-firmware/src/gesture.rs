//! Tap-dance classification.
//!
//! Each gesture-bound key opens a window on its first press. Every press increments the tap
//! count and every press or release of the same key pushes the deadline out by the timeout, so
//! a key that is still held when the deadline passes classifies as a hold. The window closes on
//! the deadline or, for the third release, immediately since no higher count is classified.
//! Presses of other keys only mark open windows as interrupted; they never close them.

use heapless::Vec;

use crate::key_scanner::PhysicalKey;

/// The highest tap count with a classified outcome.
pub const MAX_TAPS: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GestureOutcome {
    SingleTap,
    SingleHold,
    DoubleTap,
    DoubleHold,
    TripleTap,
    TripleHold,
    /// Tap count beyond [MAX_TAPS]. Should be unreachable with correct event delivery.
    Unknown,
}
impl GestureOutcome {
    pub fn classify(state: &GestureState) -> Self {
        match state.tap_count {
            1 if state.pressed => Self::SingleHold,
            1 => Self::SingleTap,
            2 if state.pressed => Self::DoubleHold,
            2 => Self::DoubleTap,
            3 if state.interrupted || !state.pressed => Self::TripleTap,
            3 => Self::TripleHold,
            _ => Self::Unknown,
        }
    }

    /// Hold outcomes leave an effect in place that the key's release must revert.
    pub fn is_hold(&self) -> bool {
        matches!(self, Self::SingleHold | Self::DoubleHold | Self::TripleHold)
    }

    /// Position of the outcome's action in a tap-dance record.
    pub fn slot(&self) -> Option<usize> {
        use tapkey_common::gesture_slots::*;

        Some(match self {
            Self::SingleTap => SINGLE_TAP,
            Self::SingleHold => SINGLE_HOLD,
            Self::DoubleTap => DOUBLE_TAP,
            Self::DoubleHold => DOUBLE_HOLD,
            Self::TripleTap => TRIPLE_TAP,
            Self::TripleHold => TRIPLE_HOLD,
            Self::Unknown => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GestureState {
    pub tap_count: u8,
    pub pressed: bool,
    pub interrupted: bool,
}

/// A classified gesture ready for the binder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Finalized {
    pub key: PhysicalKey,
    pub gesture: u8,
    pub outcome: GestureOutcome,
    /// The key was still down when the window closed.
    pub pressed: bool,
}

#[derive(Debug, Clone, Copy)]
struct OpenGesture {
    key: PhysicalKey,
    gesture: u8,
    state: GestureState,
    timeout: u16,
    deadline: u64,
}
impl OpenGesture {
    fn finalize(&self) -> Finalized {
        Finalized {
            key: self.key,
            gesture: self.gesture,
            outcome: GestureOutcome::classify(&self.state),
            pressed: self.state.pressed,
        }
    }
}

/// Open tap-dance windows, at most one per key and `N` in total.
pub struct GestureClassifier<const N: usize> {
    open: Vec<OpenGesture, N>,
}
impl<const N: usize> Default for GestureClassifier<N> {
    fn default() -> Self {
        Self { open: Vec::new() }
    }
}
impl<const N: usize> GestureClassifier<N> {
    pub fn is_open(&self, key: PhysicalKey) -> bool {
        self.open.iter().any(|g| g.key == key)
    }

    pub fn state(&self, key: PhysicalKey) -> Option<GestureState> {
        self.open.iter().find(|g| g.key == key).map(|g| g.state)
    }

    /// Open a window for the first press of `key`. Returns false if no slot is free or `key`
    /// already has a window.
    pub fn start(&mut self, key: PhysicalKey, gesture: u8, timeout: u16, now: u64) -> bool {
        if self.is_open(key) {
            return false;
        }
        self.open
            .push(OpenGesture {
                key,
                gesture,
                state: GestureState {
                    tap_count: 1,
                    pressed: true,
                    interrupted: false,
                },
                timeout,
                deadline: now + timeout as u64,
            })
            .is_ok()
    }

    /// Feed a press or release of a key with an open window.
    pub fn on_event(&mut self, key: PhysicalKey, is_down: bool, now: u64) -> Option<Finalized> {
        let i = self.open.iter().position(|g| g.key == key)?;
        let g = &mut self.open[i];
        if is_down {
            if g.state.pressed {
                return None;
            }
            g.state.tap_count = g.state.tap_count.saturating_add(1);
            g.state.pressed = true;
        } else {
            if !g.state.pressed {
                return None;
            }
            g.state.pressed = false;
            if g.state.tap_count >= MAX_TAPS {
                return Some(self.open.swap_remove(i).finalize());
            }
        }
        g.deadline = now + g.timeout as u64;
        None
    }

    /// Mark every window except `key`'s as interrupted.
    pub fn interrupt(&mut self, key: PhysicalKey) {
        for g in self.open.iter_mut().filter(|g| g.key != key) {
            g.state.interrupted = true;
        }
    }

    /// Close and return the earliest window whose deadline is at or before `now`.
    pub fn expire(&mut self, now: u64) -> Option<Finalized> {
        let (i, _) = self
            .open
            .iter()
            .enumerate()
            .filter(|(_, g)| g.deadline <= now)
            .min_by_key(|(_, g)| g.deadline)?;
        Some(self.open.swap_remove(i).finalize())
    }

    pub fn wait_until(&self) -> u64 {
        self.open.iter().map(|g| g.deadline).min().unwrap_or(u64::MAX)
    }

    pub fn clear(&mut self) {
        self.open.clear();
    }
}

#[cfg(test)]
#[path = "gesture_test.rs"]
mod test;
