use embassy_sync::{blocking_mutex::raw::RawMutex, channel::Channel};

/// One position in the scan matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PhysicalKey {
    pub row: u8,
    pub col: u8,
}
impl PhysicalKey {
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    pub fn row(&self) -> usize {
        self.row as usize
    }

    pub fn column(&self) -> usize {
        self.col as usize
    }
}

/// A switch change reported by the matrix scanner. The top bit of `row` holds the switch state.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScanKey {
    row: u8,
    col: u8,
}
impl ScanKey {
    pub fn new(row: u8, col: u8, is_down: bool) -> Self {
        Self {
            row: row | if is_down { 0x80 } else { 0 },
            col,
        }
    }

    pub fn row(&self) -> usize {
        (self.row & 0x7f) as usize
    }

    pub fn column(&self) -> usize {
        self.col as usize
    }

    pub fn is_down(&self) -> bool {
        self.row & 0x80 == 0x80
    }

    pub fn position(&self) -> PhysicalKey {
        PhysicalKey::new(self.row & 0x7f, self.col)
    }

    pub fn same_key(&self, other: ScanKey) -> bool {
        self.col == other.col && self.row & 0x7f == other.row & 0x7f
    }
}

pub struct KeyScannerChannel<M: RawMutex, const N: usize>(Channel<M, ScanKey, N>);
impl<M: RawMutex, const N: usize> Default for KeyScannerChannel<M, N> {
    fn default() -> Self {
        Self(Channel::new())
    }
}
impl<M: RawMutex, const N: usize> KeyScannerChannel<M, N> {
    pub async fn receive(&self) -> ScanKey {
        self.0.receive().await
    }

    /// Called by the matrix scanner. Events are dropped when the mapper falls `N` events behind.
    pub fn try_send(&self, msg: ScanKey) {
        if self.0.try_send(msg).is_err() {
            crate::warn!("scan channel full; dropped key {} {}", msg.row(), msg.column());
        }
    }
}

#[cfg(test)]
#[path = "key_scanner_test.rs"]
mod test;
