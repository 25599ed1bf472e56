use crate::key_scanner::PhysicalKey;

/// Counts consecutive taps of one tap-toggle key. Pressing any other key, holding the key longer
/// than the term, or pausing longer than the term between taps starts the count again.
#[derive(Debug, Default)]
pub struct TapToggle {
    key: Option<PhysicalKey>,
    count: u16,
    last: u64,
}
impl TapToggle {
    pub fn press(&mut self, key: PhysicalKey, now: u64, term: u16) {
        if self.key != Some(key) || now > self.last + term as u64 {
            self.key = Some(key);
            self.count = 0;
        }
        self.last = now;
    }

    /// Record the release of `key`. Returns true when the tap completes a run of `count` taps.
    pub fn release(&mut self, key: PhysicalKey, now: u64, term: u16, count: u16) -> bool {
        if self.key != Some(key) {
            return false;
        }
        if now > self.last + term as u64 {
            self.key = None;
            return false;
        }
        self.last = now;
        self.count += 1;
        if self.count >= count {
            self.key = None;
            return true;
        }
        false
    }

    /// Another key was pressed.
    pub fn interrupt(&mut self, key: PhysicalKey) {
        if self.key != Some(key) {
            self.key = None;
        }
    }

    pub fn clear(&mut self) {
        self.key = None;
    }
}
