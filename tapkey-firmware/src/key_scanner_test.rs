use embassy_futures::block_on;
use embassy_sync::blocking_mutex::raw::NoopRawMutex;

use super::*;

#[test]
fn scan_key_state() {
    let down = ScanKey::new(3, 12, true);
    let up = ScanKey::new(3, 12, false);

    assert!(down.is_down());
    assert!(!up.is_down());
    assert_eq!(down.row(), 3);
    assert_eq!(up.row(), 3);
    assert_eq!(down.column(), 12);
    assert!(down.same_key(up));
    assert!(!down.same_key(ScanKey::new(2, 12, true)));
    assert_eq!(down.position(), up.position());
    assert_eq!(down.position(), PhysicalKey::new(3, 12));
}

#[test]
fn channel_keeps_order() {
    let channel = KeyScannerChannel::<NoopRawMutex, 2>::default();

    channel.try_send(ScanKey::new(0, 1, true));
    channel.try_send(ScanKey::new(0, 1, false));
    channel.try_send(ScanKey::new(0, 2, true));

    block_on(async {
        assert_eq!(channel.receive().await, ScanKey::new(0, 1, true));
        assert_eq!(channel.receive().await, ScanKey::new(0, 1, false));
    });
}
