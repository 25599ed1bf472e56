use super::*;

use ActivationMode::*;
use KeyBinding::*;

#[test]
fn decode_ranges() {
    assert_eq!(KeyBinding::decode(0), Some(Transparent));
    assert_eq!(KeyBinding::decode(1), Some(Noop));
    assert_eq!(KeyBinding::decode(0x04), Some(SimpleKey(0x04)));
    assert_eq!(KeyBinding::decode(0xe1), Some(SimpleKey(0xe1)));
    assert_eq!(KeyBinding::decode(0x100 + 0xe9), Some(Consumer(0xe9)));
    assert_eq!(KeyBinding::decode(0x602), Some(LayerControl(2, Momentary)));
    assert_eq!(KeyBinding::decode(0x705), Some(LayerControl(5, Toggled)));
    assert_eq!(KeyBinding::decode(0x903), Some(LayerControl(3, OneShot)));
    assert_eq!(KeyBinding::decode(0xa01), Some(LayerControl(1, TapToggle)));
    assert_eq!(KeyBinding::decode(0xb07), Some(DualSymbol(7)));
    assert_eq!(KeyBinding::decode(0xc00), Some(Unicode(0)));
    assert_eq!(KeyBinding::decode(0xd01), Some(GestureRef(1)));
    assert_eq!(KeyBinding::decode(0x426), Some(ShiftedKey(0x26)));
    assert_eq!(KeyBinding::decode(0x802), Some(TapHold(2)));
}

#[test]
fn decode_rejects_unassigned_codes() {
    assert_eq!(KeyBinding::decode(2), None);
    assert_eq!(KeyBinding::decode(0x400), None);
    assert_eq!(KeyBinding::decode(0x4e1), None);
    assert_eq!(KeyBinding::decode(0x500), None);
    assert_eq!(KeyBinding::decode(0xe00), None);
}

#[test]
fn oneshot_consumers() {
    assert!(SimpleKey(0x04).consumes_oneshot());
    assert!(!SimpleKey(0xe1).consumes_oneshot());
    assert!(SimpleKey(0xe1).is_modifier());
    assert!(DualSymbol(0).consumes_oneshot());
    assert!(Unicode(0).consumes_oneshot());
    assert!(Consumer(0xe2).consumes_oneshot());
    assert!(!LayerControl(1, OneShot).consumes_oneshot());
    assert!(!GestureRef(0).consumes_oneshot());
    assert!(ShiftedKey(0x26).consumes_oneshot());
    assert!(!TapHold(0).consumes_oneshot());
    assert!(Noop.consumes_oneshot());
    assert!(!Transparent.consumes_oneshot());
}
