use std::collections::HashMap;

use lazy_static::lazy_static;
use tapkey_common::keycodes::key_range;

const DASH_USCORE: [char; 2] = ['_', '-'];

#[derive(Debug)]
pub struct KeycodeDesc {
    pub name: &'static str,
    pub aliases: Vec<&'static str>,
    pub code: u16,
}

fn normalize(name: &str) -> String {
    if name.chars().nth(1).is_some() {
        name.replace(DASH_USCORE, "").to_lowercase()
    } else {
        name.to_lowercase()
    }
}

struct Table {
    names: HashMap<String, u16>,
    descs: Vec<KeycodeDesc>,
}
impl Table {
    fn insert(&mut self, names: &'static str, code: u16) {
        let mut iter = names.split('/');
        let Some(name) = iter.next() else {
            return;
        };
        let mut desc = KeycodeDesc {
            name,
            aliases: Vec::new(),
            code,
        };
        self.add_name(name, code);
        for alias in iter {
            self.add_name(alias, code);
            desc.aliases.push(alias);
        }
        self.descs.push(desc);
    }

    fn add_name(&mut self, name: &str, code: u16) {
        let k = normalize(name);
        if self.names.insert(k, code).is_some() {
            panic!("key already added {name}");
        }
    }
}

lazy_static! {
    static ref ACTION_NAMES: HashMap<&'static str, u16> = {
        let mut m = HashMap::new();
        m.insert("layer", key_range::LAYER);
        m.insert("toggle", key_range::TOGGLE);
        m.insert("oneshot", key_range::ONESHOT);
        m.insert("taptoggle", key_range::TAP_TOGGLE);
        m.insert("tapdance", key_range::GESTURE);
        m.insert("unicode", key_range::UNICODE);
        m.insert("dual", key_range::DUAL_SYMBOL);
        m.insert("taphold", key_range::TAP_HOLD);
        m.insert("shifted", key_range::SHIFTED);
        m
    };
    static ref KEYCODES: Table = {
        let mut t = Table {
            names: HashMap::new(),
            descs: Vec::new(),
        };
        t.insert("Transparent/trns", key_range::TRANSPARENT);
        t.insert("Noop/none", key_range::NOOP);
        for (i, name) in r#"
A B C D E F G H I J K L M N O P Q R S T U V W X Y Z
1 2 3 4 5 6 7 8 9 0
Return/Enter/ent
Escape/esc
backspace/bksp
Tab
Spacebar/space/spc
Dash/-/minus
Equals/=/equal
LeftBrace/[/leftsquarebracket
RightBrace/]/rightsquarebracket
Backslash/\
NonUsHash
Semicolon/;
LeftApos/'/apostrophe
GraveAccent/`/grave
Comma/,
Period/./dot
Forwardslash/slash
CapsLock/caps
F1 F2 F3 F4 F5 F6 F7 F8 F9 F10 F11 F12
Printscreen/print
ScrollLock
Pause
Insert/ins
Home Pageup/pgup Delete/del End Pagedown/pgdn
Right Left Down Up
KpNumLock
KpForwardslash KpStar KpDash KpPlus KpEnter
Kp1 Kp2 Kp3 Kp4 Kp5 Kp6 Kp7 Kp8 Kp9 Kp0
KpPeriod
NonUsBackslash
Application/app
Power
KpEquals
F13 F14 F15 F16 F17 F18 F19 F20 F21 F22 F23 F24
Execute
Help
Menu/mnu
Select
Stop
Again Undo
Cut Copy Paste
Find
Mute
VolumeUp VolumeDown
"#
        .split_whitespace()
        .enumerate()
        {
            t.insert(name, (i + 4) as u16);
        }
        t.names.insert("/".into(), 0x38);

        for (i, name) in r#"
Leftcontrol/lctrl/lc/lctl
Leftshift/lshift/ls
Leftalt/lalt/la
LeftGui/leftmeta/lgui/lg
Rightcontrol/rctrl/rc/rctl
Rightshift/rshift/rs
Rightalt/altgr/ralt/ra
RightGui/rightmeta/rgui/rg
"#
        .split_whitespace()
        .enumerate()
        {
            t.insert(name, key_range::MODIFIER_MIN + i as u16);
        }

        let mut c = |a: &'static str, b: u16| t.insert(a, b + key_range::CONSUMER_MIN);

        // 15.5 Display Controls
        c("brightness_up"   ,0x06F);
        c("brightness_down" ,0x070);
        // 15.7 Transport Controls
        c("next_track"   ,0x0B5);
        c("prev_track"   ,0x0B6);
        c("media_stop"   ,0x0B7);
        c("eject"        ,0x0B8);
        c("play_pause"   ,0x0CD);
        // 15.9.1 Audio Controls - Volume
        c("audio_mute/mute_audio"     ,0x0E2);
        c("audio_vol_up/volu"   ,0x0E9);
        c("audio_vol_down/vold" ,0x0EA);
        // 15.15 Application Launch Buttons
        c("al_email"           ,0x18A);
        c("al_calculator/calc" ,0x192);
        c("al_local_browser"   ,0x194);
        // 15.16 Generic GUI Application Controls
        c("ac_search"  ,0x221);
        c("ac_home"    ,0x223);
        c("ac_back"    ,0x224);
        c("ac_forward" ,0x225);
        c("ac_refresh" ,0x227);

        t
    };
}

pub fn key_code(name: &str) -> Option<u16> {
    let name = match name.strip_prefix('\\') {
        Some(rest) if !rest.is_empty() => rest,
        _ => name,
    };
    KEYCODES.names.get(normalize(name).as_str()).copied()
}

pub fn action_code(name: &str) -> Option<u16> {
    ACTION_NAMES.get(name).copied()
}

pub fn keycodes_iter() -> impl Iterator<Item = &'static KeycodeDesc> {
    KEYCODES.descs.iter()
}

#[cfg(test)]
#[path = "keycodes_test.rs"]
mod test;
