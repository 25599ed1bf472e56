use super::*;

const LEFT_SHIFT: u8 = key_range::LEFT_SHIFT as u8;
const RIGHT_SHIFT: u8 = key_range::RIGHT_SHIFT as u8;
const LEFT_CTRL: u8 = key_range::MODIFIER_MIN as u8;

#[test]
fn shift_from_either_side() {
    let mut mods = ModifierState::default();
    assert!(!mods.is_shifted());

    assert!(mods.key_switch(RIGHT_SHIFT, true));
    assert!(mods.is_shifted());
    assert_eq!(mods.bits(), modifier_bits::RIGHT_SHIFT);

    assert!(mods.key_switch(LEFT_SHIFT, true));
    assert!(mods.key_switch(RIGHT_SHIFT, false));
    assert!(mods.is_shifted());

    assert!(mods.key_switch(LEFT_SHIFT, false));
    assert!(!mods.is_shifted());
    assert_eq!(mods.bits(), 0);
}

#[test]
fn counts_overlapping_holds() {
    let mut mods = ModifierState::default();

    mods.key_switch(LEFT_CTRL, true);
    mods.key_switch(LEFT_CTRL, true);
    mods.key_switch(LEFT_CTRL, false);
    assert_eq!(mods.bits(), modifier_bits::LEFT_CTRL);

    mods.key_switch(LEFT_CTRL, false);
    mods.key_switch(LEFT_CTRL, false);
    assert_eq!(mods.bits(), 0);

    mods.key_switch(LEFT_CTRL, true);
    assert_eq!(mods.bits(), modifier_bits::LEFT_CTRL);
    mods.clear();
    assert_eq!(mods.bits(), 0);
}

#[test]
fn ignores_other_keys() {
    let mut mods = ModifierState::default();
    assert!(!mods.key_switch(0x04, true));
    assert_eq!(mods.bits(), 0);
}

#[test]
fn shifted_key_hold() {
    let mut mods = ModifierState::default();

    assert!(mods.hold(LEFT_SHIFT, true));
    assert!(mods.is_shifted());
    assert!(mods.hold(LEFT_SHIFT, false));
    assert!(!mods.is_shifted());

    mods.key_switch(LEFT_SHIFT, true);
    assert!(!mods.hold(LEFT_SHIFT, true));
    assert!(!mods.hold(LEFT_SHIFT, false));
    assert!(mods.is_shifted());

    assert!(!mods.hold(0x04, true));
}
