use std::path::Path;

use tapkey_common::keycodes::key_range::{
    DUAL_SYMBOL, GESTURE, LAYER, NOOP, ONESHOT, SHIFTED, TAP_HOLD, TAP_TOGGLE, TOGGLE,
    TRANSPARENT, UNICODE,
};

use crate::test::kc;

use super::*;

pub fn pretty_compile(src: &str) -> Result<KeyboardConfig> {
    crate::pretty_compile(Path::new("test"), src)
}

pub fn test_compile(source: &str) -> Result<KeyboardConfig> {
    compile(source)
}

fn key_position(config: &KeyboardConfig, sym: &str, index: usize) -> u16 {
    config.get_aliases(sym).unwrap()[index]
}

macro_rules! assert_error {
    ($src:expr, $message:expr) => {{
        let err = test_compile($src).err().expect("should fail");
        assert_eq!(err.message, $message);
        err
    }};
    ($src:expr, $message:expr, $span:expr) => {{
        let err = assert_error!($src, $message);
        assert_eq!(err.span, Some($span));
    }};
}

#[test]
fn keycode_names() {
    let src = r#"
[matrix:1x4]
0x00 = \= b \# d

[main]

equal =  1
\b = \\
\# = play_pause   # comment
d = vold
"#;

    let config = pretty_compile(src).expect("should allow escaping");
    assert_eq!(config.code_at("main", 0x0), kc("1"));
    assert_eq!(config.code_at("main", 0x1), kc("\\"));
    assert_eq!(config.code_at("main", 0x2), 0x1cd);
    assert_eq!(config.code_at("main", 0x3), 0x1ea);
}

#[test]
fn matrix() {
    let src = r#"
[matrix:3x4]
0x00 = a b c d
0x10 = e f g
0x201 = x y z
"#;

    let config = pretty_compile(src).unwrap();

    assert_eq!(key_position(&config, "a", 0), 0x0000);
    assert_eq!(key_position(&config, "d", 0), 0x0003);
    assert_eq!(key_position(&config, "g", 0), 0x0102);
    assert_eq!(key_position(&config, "z", 0), 0x0203);
    assert_eq!(config.code_at("main", 0x0102), kc("g"));
    assert_eq!((config.row_count, config.col_count), (3, 4));

    let bin: Vec<u16> = config.serialize().into_iter().map(u16::from_le).collect();
    let main = &bin[10..22];
    assert_eq!(main[3], kc("d"));
    assert_eq!(main[7], NOOP);
    assert_eq!(main[8], NOOP);
    assert_eq!(main[9], kc("x"));
}

#[test]
fn matrix_bounds() {
    assert_error!("[matrix:1x2]\n0x00 = a b c\n", TOO_MANY_COLS, 24..25);
    assert_error!("[matrix:1x2]\n0x10 = a\n", TOO_MANY_ROWS, 13..17);
    assert_error!("[matrix:1x2]\n0x00 = a\n0x00 = b\n", "Key position already named");
    assert_error!("[matrix:1x2]\nfoo = a\n", "Invalid key position");
    assert_error!(
        "[matrix:1]\n",
        "expected [matrix:rxc] where r and c are row column size"
    );
    assert_error!("[main]\n", "Missing [matrix:rxc] section");
}

#[test]
fn positions_need_main_binding() {
    assert_error!(
        "[matrix:1x2]\n0x00 = a fn\n",
        "No main layer binding for 'fn'",
        22..24
    );

    let config = pretty_compile(
        r#"
[matrix:1x2]
0x00 = a fn

[main]
fn = layer(fn)

[fn]
a = home
"#,
    )
    .unwrap();
    assert_eq!(config.code_at("main", 1), LAYER + 1);
    assert_eq!(config.code_at("fn", 0), kc("home"));

    assert_error!(
        "[matrix:1x1]\n0x00 = a\n[main]\na = transparent\n",
        "main layer keys may not be transparent"
    );
}

#[test]
fn layer_actions() {
    let src = r#"
[matrix:1x5]
0x00 = a b c d e

[main]

a = layer(nav)
b = toggle(sym)
c = oneshot(sym)
d = taptoggle(nav)
e = toggle(main)

[sym]

a = trns

[nav]

0x01 = 1 2 3
"#;

    let config = pretty_compile(src).expect("should allow layer actions");

    assert_eq!(config.layer_index("sym"), Some(1));
    assert_eq!(config.layer_index("nav"), Some(2));
    assert_eq!(config.code_at("main", 0), LAYER + 2);
    assert_eq!(config.code_at("main", 1), TOGGLE + 1);
    assert_eq!(config.code_at("main", 2), ONESHOT + 1);
    assert_eq!(config.code_at("main", 3), TAP_TOGGLE + 2);
    assert_eq!(config.code_at("main", 4), TOGGLE);
    assert_eq!(config.code_at("sym", 0), TRANSPARENT);
    assert_eq!(config.code_at("nav", 1), kc("1"));
    assert_eq!(config.code_at("nav", 3), kc("3"));
    assert_eq!(config.code_at("nav", 0), TRANSPARENT);

    assert_error!(
        "[matrix:1x1]\n0x00 = a\n[main]\na = layer(nope)\n",
        "Unknown layer name nope",
        39..43
    );
    assert_error!(
        "[matrix:1x1]\n0x00 = a\n[main]\na = layer(x, y)\n",
        "Expected 1 argument"
    );
    assert_error!(
        "[matrix:1x1]\n0x00 = a\n[main]\na = macro(x)\n",
        UNKNOWN_ACTION,
        33..38
    );
}

#[test]
fn multi_position_alias() {
    let src = r#"
[matrix:1x3]
0x00 = x y x

[l1]
x = 1
"#;

    let config = pretty_compile(src).unwrap();
    assert_eq!(config.code_at("l1", 0), kc("1"));
    assert_eq!(config.code_at("l1", 2), kc("1"));
    assert_eq!(config.code_at("l1", 1), TRANSPARENT);

    assert_error!(
        "[matrix:1x3]\n0x00 = x y x\n[l1]\nx = 1 2\n",
        TOO_MANY_MULTI_ALIAS_RHS
    );
    assert_error!(
        "[matrix:1x3]\n0x00 = x y x\n[l1]\nq = 1\n",
        "Unknown key position 'q'"
    );
}

#[test]
fn tapdance() {
    let src = r#"
[matrix:1x2]
0x00 = a b

[tapdance.sym]
tap = oneshot(sym)
hold = layer(sym)
double_tap = toggle(sym)
triple_hold = unicode(U+2260)

[tapdance.quick]
timeout = 120ms
tap = a
double_hold = lshift

[main]
a = tapdance(sym)
b = tapdance(quick)

[sym]
"#;

    let config = pretty_compile(src).expect("should allow tapdance");
    assert_eq!(config.tapdance_count(), 2);
    assert_eq!(config.code_at("main", 0), GESTURE);
    assert_eq!(config.code_at("main", 1), GESTURE + 1);

    let sym = config.tapdance("sym").unwrap();
    assert_eq!(sym.timeout, gesture_slots::DEFAULT_TIMEOUT);
    assert_eq!(
        sym.actions,
        [ONESHOT + 1, LAYER + 1, TOGGLE + 1, NOOP, NOOP, UNICODE]
    );

    let quick = config.tapdance("quick").unwrap();
    assert_eq!(quick.timeout, 120);
    assert_eq!(
        quick.serialize(),
        [120, kc("a"), NOOP, NOOP, kc("lshift"), NOOP, NOOP]
    );
    assert_eq!(config.unicode_table(), [0x2260]);
}

#[test]
fn tapdance_errors() {
    let matrix = "[matrix:1x1]\n0x00 = a\n";

    assert_error!(
        &format!("{matrix}[tapdance.x]\ntap = tapdance(x)\n"),
        "tapdance may not be used within a tapdance"
    );
    assert_error!(
        &format!("{matrix}[tapdance.x]\nquad_tap = a\n"),
        "Unknown tapdance field 'quad_tap'"
    );
    assert_error!(
        &format!("{matrix}[tapdance.x]\ntimeout = 2ms\n"),
        "Invalid duration; only 10 to 5000 milliseconds are valid"
    );
    assert_error!(
        &format!("{matrix}[tapdance.x]\n[tapdance.x]\n"),
        "Duplicate tapdance 'x'"
    );
    assert_error!(
        &format!("{matrix}[main]\na = tapdance(nope)\n"),
        "Unknown tapdance 'nope'"
    );
    assert_error!(&format!("{matrix}[tapdance]\n"), "Unknown section '[tapdance]'");
}

#[test]
fn unicode_and_dual() {
    let src = r#"
[matrix:1x4]
0x00 = a b c d

[unicode]
lomeg = U+03C9
uomeg = Ω
neq = U+2260

[main]
a = unicode(neq)
b = dual(lomeg, uomeg)
c = dual(ω,Ω)
d = unicode(U+2260)
"#;

    let config = pretty_compile(src).expect("should allow unicode");

    assert_eq!(config.code_at("main", 0), UNICODE);
    assert_eq!(config.code_at("main", 1), DUAL_SYMBOL);
    assert_eq!(config.code_at("main", 2), DUAL_SYMBOL);
    assert_eq!(config.code_at("main", 3), UNICODE);
    assert_eq!(config.unicode_table(), [0x2260]);
    assert_eq!(config.dual_table(), [(0x3c9, 0x3a9)]);

    let matrix = "[matrix:1x1]\n0x00 = a\n";
    assert_error!(
        &format!("{matrix}[main]\na = unicode(nope)\n"),
        "Unknown unicode name 'nope'"
    );
    assert_error!(
        &format!("{matrix}[main]\na = unicode(U+D800)\n"),
        "Invalid unicode"
    );
    assert_error!(
        &format!("{matrix}[main]\na = dual(U+41)\n"),
        "Expected 2 arguments"
    );
    assert_error!(
        &format!("{matrix}[unicode]\nx = U+41\nx = U+42\n"),
        "Duplicate unicode name 'x'"
    );
    assert_error!(
        &format!("{matrix}[unicode]\nx = ab\n"),
        "Invalid unicode"
    );
}

#[test]
fn tap_hold_and_shifted() {
    let src = r#"
[matrix:1x4]
0x00 = lshift rshift c d

[tapdance.td]
tap = shifted(\[)
hold = lshift

[main]
lshift = taphold(shifted(9), lshift)
rshift = taphold(shifted(0), rshift, 150ms)
c = taphold(dual(ω, Ω), layer(l1))
d = tapdance(td)

[l1]
c = shifted(9)
d = taphold(shifted(9), lshift)
"#;

    let config = pretty_compile(src).expect("should allow taphold");

    assert_eq!(config.code_at("main", 0), TAP_HOLD);
    assert_eq!(config.code_at("main", 1), TAP_HOLD + 1);
    assert_eq!(config.code_at("main", 2), TAP_HOLD + 2);
    assert_eq!(config.code_at("l1", 2), SHIFTED + kc("9"));
    assert_eq!(config.code_at("l1", 3), TAP_HOLD);
    assert_eq!(
        config.tap_hold_table(),
        [
            TapHold {
                timeout: gesture_slots::DEFAULT_TIMEOUT,
                tap: SHIFTED + kc("9"),
                hold: kc("lshift"),
            },
            TapHold {
                timeout: 150,
                tap: SHIFTED + kc("0"),
                hold: kc("rshift"),
            },
            TapHold {
                timeout: gesture_slots::DEFAULT_TIMEOUT,
                tap: DUAL_SYMBOL,
                hold: LAYER + 1,
            },
        ]
    );
    assert_eq!(
        config.tapdance("td").unwrap().actions[..2],
        [SHIFTED + kc("["), kc("lshift")]
    );

    let bin: Vec<u16> = config.serialize().into_iter().map(u16::from_le).collect();
    assert_eq!(bin[6], 3);
    assert_eq!(
        bin[bin.len() - 6..],
        [
            150,
            SHIFTED + kc("0"),
            kc("rshift"),
            gesture_slots::DEFAULT_TIMEOUT,
            DUAL_SYMBOL,
            LAYER + 1
        ]
    );
}

#[test]
fn tap_hold_errors() {
    let matrix = "[matrix:1x1]\n0x00 = a\n";

    assert_error!(
        &format!("{matrix}[main]\na = taphold(a)\n"),
        "Expected 2 or 3 arguments"
    );
    assert_error!(
        &format!("{matrix}[main]\na = taphold(a, taphold(a, b))\n"),
        "taphold may not be used within a taphold"
    );
    assert_error!(
        &format!("{matrix}[tapdance.x]\ntap = taphold(a, b)\n"),
        "taphold may not be used within a tapdance"
    );
    assert_error!(
        &format!("{matrix}[tapdance.x]\n[main]\na = taphold(a, tapdance(x))\n"),
        "tapdance may not be used within a taphold"
    );
    assert_error!(
        &format!("{matrix}[main]\na = taphold(trns, b)\n"),
        "taphold actions may not be transparent",
        41..45
    );
    assert_error!(
        &format!("{matrix}[main]\na = taphold(a, b, 1ms)\n"),
        "Invalid duration; only 10 to 5000 milliseconds are valid"
    );
    assert_error!(
        &format!("{matrix}[main]\na = shifted(lshift)\n"),
        "Expected a basic key",
        41..47
    );
    assert_error!(
        &format!("{matrix}[main]\na = shifted(vold)\n"),
        "Expected a basic key"
    );
}

#[test]
fn globals() {
    let src = r#"
[global]
tapping_term = 180ms
tap_toggle_count = 3

[matrix:1x1]
0x00 = a
"#;

    let config = pretty_compile(src).unwrap();
    assert_eq!(config.global("tapping_term").unwrap().value, 180);
    assert_eq!(config.global("tap_toggle_term"), None);
    assert_eq!(config.serialize_globals(), [0, 180, 1, 3]);

    assert_error!(
        "[global]\ntapping_trm = 200\n[matrix:1x1]\n0x00 = a\n",
        "Invalid global 'tapping_trm'",
        9..20
    );
    assert_error!(
        "[global]\ntapping_term = 200 300\n[matrix:1x1]\n0x00 = a\n",
        TOO_MANY_RHS
    );
    assert_error!(
        "[global.x]\n[matrix:1x1]\n0x00 = a\n",
        "suffix not allowed here"
    );
}

#[test]
fn syntax_errors() {
    let matrix = "[matrix:1x1]\n0x00 = a\n";

    assert_error!(&format!("{matrix}[main]\na 1\n"), MISSING_EQ);
    assert_error!(&format!("{matrix}[main]\na =\n"), MISSING_RHS);
    assert_error!("a = b\n[matrix:1x1]\n", "expected '['", 0..1);
    assert_error!(&format!("{matrix}[main\n"), "missing ']'");
    assert_error!(&format!("{matrix}[ma in]\n"), "Invalid section name");
    assert_error!(&format!("{matrix}[main] a = 1\n"), "Unexpected text after section");
    assert_error!(&format!("{matrix}[main]\na = layer(main\n"), "Missing )");
    assert_error!(&format!("{matrix}[foo:bar]\n"), "Unknown section '[foo:bar]'");
    assert_error!(
        "[matrix:1x1]\n0x00 = a\n[l1]\n[l1]\n",
        "Duplicate layer section 'l1'",
        27..31
    );
}

#[test]
fn sparse_and_dense_layers() {
    let src = r#"
[matrix:1x3]
0x00 = a b c

[sparse]
b = 1

[dense]
a = 1
c = 3
"#;

    let config = pretty_compile(src).unwrap();
    let bin: Vec<u16> = config.serialize().into_iter().map(u16::from_le).collect();

    let offsets = &bin[8..12];
    assert_eq!(offsets, [0, 3, 5, 8]);
    let layers = &bin[12..];
    assert_eq!(&layers[3..5], [0x0001, kc("1")]);
    assert_eq!(&layers[5..8], [kc("1"), TRANSPARENT, kc("3")]);
}

#[test]
fn compiling_to_binary() {
    let src = r#"
[matrix:1x3]
0x00 = a b c

[global]
tapping_term = 180

[unicode]
neq = U+2260

[tapdance.td]
tap = a
hold = layer(l1)

[main]
c = tapdance(td)

[l1]
a = unicode(neq)
b = dual(ω, Ω)
"#;

    let config = pretty_compile(src).unwrap();
    let bin: Vec<u16> = config.serialize().into_iter().map(u16::from_le).collect();

    assert_eq!(
        bin,
        vec![
            PROTOCOL_VERSION,
            0x0103,
            2,
            1,
            1,
            1,
            0,
            2,
            0,
            180,
            // layer offsets
            0,
            3,
            6,
            // main
            kc("a"),
            kc("b"),
            GESTURE,
            // l1
            UNICODE,
            DUAL_SYMBOL,
            TRANSPARENT,
            // tapdance td
            gesture_slots::DEFAULT_TIMEOUT,
            kc("a"),
            LAYER + 1,
            NOOP,
            NOOP,
            NOOP,
            NOOP,
            // unicode
            0x2260,
            0,
            // dual
            0x03c9,
            0,
            0x03a9,
            0,
        ]
    );
}

#[test]
fn reference_keymap() {
    let src = include_str!("../keymaps/v60_type_r.conf");
    let config = pretty_compile(src).expect("reference keymap should compile");

    assert_eq!(config.layer_count(), 6);
    assert_eq!(config.layer_index("l5"), Some(5));

    assert_eq!(config.code_at("main", 0x000d), kc("bksp"));
    assert_eq!(config.code_at("main", 0x0200), TAP_TOGGLE + 1);
    assert_eq!(config.code_at("main", 0x0404), TOGGLE + 5);
    assert_eq!(config.code_at("main", 0x0405), GESTURE);
    assert_eq!(config.code_at("main", 0x0406), ONESHOT + 3);
    assert_eq!(config.code_at("main", 0x0407), TAP_TOGGLE + 4);

    let sl = config.tapdance("sl").unwrap();
    assert_eq!(sl.actions[..3], [ONESHOT + 2, LAYER + 2, TOGGLE + 2]);

    assert_eq!(config.code_at("main", 0x0300), TAP_HOLD);
    assert_eq!(config.code_at("main", 0x030b), TAP_HOLD + 1);
    assert_eq!(
        config.tap_hold_table()[1],
        TapHold {
            timeout: gesture_slots::DEFAULT_TIMEOUT,
            tap: SHIFTED + kc("0"),
            hold: kc("rshift"),
        }
    );

    assert_eq!(config.code_at("fn", 0x0300), SHIFTED + kc("["));
    assert_eq!(config.code_at("fn", 0x030b), SHIFTED + kc("]"));
    assert_eq!(config.code_at("fn", 0x0301), NOOP);
    assert_eq!(config.code_at("sym", 0x000b), DUAL_SYMBOL);
    assert_eq!(config.code_at("sym", 0x030a), UNICODE);
    assert_eq!(config.code_at("l5", 0x030b), kc("up"));
    assert_eq!(config.unicode_table(), [0x203d]);
    assert_eq!(config.dual_table()[2], (0x3c9, 0x3a9));
    assert_eq!(config.dual_table().len(), 27);
}
