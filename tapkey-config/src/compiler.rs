use std::{
    collections::{HashMap, HashSet},
    ops::Range,
};

use tapkey_common::{
    gesture_slots, keycodes::key_range, u32_to_u16, GESTURE_RECORD_LEN, MAX_LAYERS,
    PROTOCOL_VERSION, TAP_HOLD_RECORD_LEN,
};

use crate::{
    globals::spec::GlobalProp,
    keycodes::{self, key_code},
    ConfigError,
};

type Result<T> = core::result::Result<T, ConfigError>;
type NameRange = Range<usize>;

const TOO_MANY_RHS: &str = "Only one value may be assigned";
const TOO_MANY_MULTI_ALIAS_RHS: &str =
    "Only one value may be assigned to an multi-positioned alias";
const TOO_MANY_ROWS: &str = "Too many rows";
const TOO_MANY_COLS: &str = "Too many keys in row";
const UNKNOWN_ACTION: &str = "Unknown action/keycode";
const MISSING_EQ: &str = "Missing =";
const MISSING_RHS: &str = "Missing RHS";

const MAIN: &str = "main";
const MAX_TABLE_LEN: usize = 256;
const MAX_ROWS: u8 = 0x7f;

/// The value tokens of one non-blank line.
struct Line {
    tokens: Vec<NameRange>,
}

struct Section {
    header: NameRange,
    name: NameRange,
    suffix: Option<NameRange>,
    lines: Vec<Line>,
}

fn invalid_section_char(c: char) -> bool {
    !matches!(c, '-' | '_' | '\\' | '.' | ':') && !c.is_alphanumeric()
}

/// Split a line in to whitespace separated tokens. Parentheses group, `\` escapes the next
/// character and an unescaped `#` outside parentheses starts a comment.
fn tokenize(offset: usize, line: &str) -> Vec<NameRange> {
    let mut tokens = Vec::new();
    let mut token_start = None;
    let mut depth = 0;
    let mut escaped = false;
    let mut end = line.len();

    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => {
                escaped = true;
                token_start.get_or_insert(i);
            }
            '#' if depth == 0 => {
                end = i;
                break;
            }
            '(' => {
                depth += 1;
                token_start.get_or_insert(i);
            }
            ')' => {
                if depth > 0 {
                    depth -= 1;
                }
                token_start.get_or_insert(i);
            }
            c if c.is_whitespace() && depth == 0 => {
                if let Some(s) = token_start.take() {
                    tokens.push(offset + s..offset + i);
                }
            }
            _ => {
                token_start.get_or_insert(i);
            }
        }
    }
    if let Some(s) = token_start {
        tokens.push(offset + s..offset + end);
    }
    tokens
}

fn split_sections(source: &str) -> Result<Vec<Section>> {
    let mut sections: Vec<Section> = Vec::new();
    let mut offset = 0;

    for line in source.split_inclusive('\n') {
        let start = offset;
        offset += line.len();
        let text = line.trim_end_matches(['\n', '\r']);
        let trimmed = text.trim_start();
        let lead = start + text.len() - trimmed.len();

        if trimmed.starts_with('[') {
            let Some(close) = trimmed.find(']') else {
                return Err(error_span("missing ']'", lead..start + text.len()));
            };
            let rest = trimmed[close + 1..].trim_start();
            if !(rest.is_empty() || rest.starts_with('#')) {
                return Err(error_span(
                    "Unexpected text after section",
                    lead + close + 1..start + text.len(),
                ));
            }
            let inner = lead + 1..lead + close;
            let header = &source[inner.clone()];
            if header.is_empty() || header.chars().any(invalid_section_char) {
                return Err(error_span("Invalid section name", lead..lead + close + 1));
            }
            let (name, suffix) = match header.find([':', '.']) {
                Some(i) => (
                    inner.start..inner.start + i,
                    Some(inner.start + i + 1..inner.end),
                ),
                None => (inner.clone(), None),
            };
            sections.push(Section {
                header: lead..lead + close + 1,
                name,
                suffix,
                lines: Vec::new(),
            });
        } else {
            let tokens = tokenize(start, text);
            if tokens.is_empty() {
                continue;
            }
            match sections.last_mut() {
                Some(section) => section.lines.push(Line { tokens }),
                None => return Err(error_span("expected '['", tokens[0].clone())),
            }
        }
    }
    Ok(sections)
}

/// Where an action is written. Timed keys may only be bound directly in a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActionContext {
    Layer,
    TapDance,
    TapHold,
}
impl ActionContext {
    fn name(self) -> &'static str {
        match self {
            Self::Layer => "layer",
            Self::TapDance => "tapdance",
            Self::TapHold => "taphold",
        }
    }
}

struct Parser<'source> {
    config: KeyboardConfig<'source>,
}

#[derive(Debug)]
pub struct ConfigLayer {
    codes: HashMap<u16, u16>,
    index: u16,
}

/// Outcome actions of one tap-dance, in record order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TapDance {
    pub timeout: u16,
    pub actions: [u16; gesture_slots::COUNT],
}
impl Default for TapDance {
    fn default() -> Self {
        Self {
            timeout: gesture_slots::DEFAULT_TIMEOUT,
            actions: [key_range::NOOP; gesture_slots::COUNT],
        }
    }
}
impl TapDance {
    fn serialize(&self) -> [u16; GESTURE_RECORD_LEN] {
        let mut bin = [self.timeout; GESTURE_RECORD_LEN];
        bin[1..].copy_from_slice(&self.actions);
        bin
    }
}

/// A key that taps one action and holds another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TapHold {
    pub timeout: u16,
    pub tap: u16,
    pub hold: u16,
}
impl TapHold {
    fn serialize(&self) -> [u16; TAP_HOLD_RECORD_LEN] {
        [self.timeout, self.tap, self.hold]
    }
}

pub struct KeyboardConfig<'source> {
    pub source: &'source str,
    pub global_map: HashMap<&'source str, GlobalProp>,
    pub matrix_map: HashMap<String, Vec<u16>>,
    named_positions: Vec<(u16, NameRange)>,
    layers: HashMap<String, ConfigLayer>,
    tapdance_names: HashMap<&'source str, u16>,
    tapdances: Vec<TapDance>,
    unicode_names: HashMap<&'source str, u32>,
    unicode: Vec<u32>,
    duals: Vec<(u32, u32)>,
    tap_holds: Vec<TapHold>,
    next_layer: u16,
    pub row_count: u8,
    pub col_count: u8,
}

impl<'source> Parser<'source> {
    fn new(source: &'source str) -> Self {
        Self {
            config: KeyboardConfig::new(source),
        }
    }

    fn parse_sections(&mut self, sections: &[Section]) -> Result<()> {
        let mut seen = HashSet::new();
        for section in sections {
            self.config.ensure_section(section, &mut seen)?;
        }
        if self.config.row_count == 0 {
            return Err(error_span("Missing [matrix:rxc] section", 0..0));
        }

        let source = self.config.source;
        let mut ordered = sections.iter().collect::<Vec<_>>();
        ordered.sort_by_key(|s| match &source[s.name.clone()] {
            "matrix" => 0,
            "global" => 1,
            "unicode" => 2,
            "tapdance" => 3,
            _ => 4,
        });

        for section in ordered {
            match &source[section.name.clone()] {
                "matrix" => self.parse_matrix(section)?,
                "global" => self.parse_global(section)?,
                "unicode" => self.parse_unicode(section)?,
                "tapdance" => self.parse_tapdance(section)?,
                name => self.parse_layer(name, section)?,
            }
        }

        self.config.check_main_layer()
    }

    fn parse_matrix(&mut self, section: &Section) -> Result<()> {
        for line in &section.lines {
            let (left, values) = self.assignment(line)?;
            let mut pos = self
                .config
                .key_position(self.name(&left))
                .ok_or_else(|| error_span("Invalid key position", left.clone()))?;
            if (pos >> 8) as u8 >= self.config.row_count {
                return Err(error_span(TOO_MANY_ROWS, left));
            }

            for value in values {
                if (pos & 0xff) as u8 >= self.config.col_count {
                    return Err(error_span(TOO_MANY_COLS, value.clone()));
                }
                let name = self.name(value);
                self.config.assign_position_name(pos, name, value.clone())?;
                if let Some(code) = key_code(name) {
                    self.config.assign_one_layer_code(MAIN, pos, code);
                }
                pos += 1;
            }
        }
        Ok(())
    }

    fn parse_global(&mut self, section: &Section) -> Result<()> {
        for line in &section.lines {
            let (left, value) = self.single_assignment(line)?;
            let name = self.name(&left);
            let mut g = GlobalProp::new_default(name).map_err(|e| error_span(e, left))?;
            g.parse_value(self.name(&value))
                .map_err(|e| error_span(e, value))?;
            self.config.global_map.insert(name, g);
        }
        Ok(())
    }

    fn parse_unicode(&mut self, section: &Section) -> Result<()> {
        for line in &section.lines {
            let (left, value) = self.single_assignment(line)?;
            let name = self.name(&left);
            if self.config.unicode_names.contains_key(name) {
                return Err(error_span(
                    format!("Duplicate unicode name '{}'", name),
                    left,
                ));
            }
            let cp = self.code_point(&value)?;
            self.config.unicode_names.insert(name, cp);
        }
        Ok(())
    }

    fn parse_tapdance(&mut self, section: &Section) -> Result<()> {
        let Some(suffix) = &section.suffix else {
            return Err(error_span("expected [tapdance.name]", section.header.clone()));
        };
        let name = self.name(suffix);
        let Some(index) = self.config.tapdance_names.get(name).copied() else {
            return Err(error_span("expected [tapdance.name]", section.header.clone()));
        };

        let mut td = TapDance::default();
        for line in &section.lines {
            let (left, value) = self.single_assignment(line)?;
            use gesture_slots::*;
            let slot = match self.name(&left) {
                "timeout" => {
                    td.timeout = self.timeout(&value)?;
                    continue;
                }
                "tap" => SINGLE_TAP,
                "hold" => SINGLE_HOLD,
                "double_tap" => DOUBLE_TAP,
                "double_hold" => DOUBLE_HOLD,
                "triple_tap" => TRIPLE_TAP,
                "triple_hold" => TRIPLE_HOLD,
                field => {
                    return Err(error_span(
                        format!("Unknown tapdance field '{}'", field),
                        left,
                    ))
                }
            };
            td.actions[slot] = self.read_action(&value, ActionContext::TapDance)?;
        }
        self.config.tapdances[index as usize] = td;
        Ok(())
    }

    fn parse_layer(&mut self, name: &str, section: &Section) -> Result<()> {
        for line in &section.lines {
            let (left_range, values) = self.assignment(line)?;
            let left = self.name(&left_range);

            let alias_value = self.config.get_aliases(left);

            let keypos = if let Some(list) = alias_value {
                if list.len() == 1 {
                    list.first().copied()
                } else {
                    None
                }
            } else {
                self.config.key_position(left)
            };

            if let Some(mut keypos) = keypos {
                if (keypos >> 8) as u8 >= self.config.row_count {
                    return Err(error_span(TOO_MANY_ROWS, left_range));
                }
                for value in values {
                    if (keypos & 0xff) as u8 >= self.config.col_count {
                        return Err(error_span(TOO_MANY_COLS, value.clone()));
                    }

                    let code = self.read_action(value, ActionContext::Layer)?;
                    self.assign_layer_code(name, keypos, code, value)?;
                    keypos += 1;
                }
            } else if let Some(positions) = alias_value {
                let positions = positions.clone();
                if values.len() > 1 {
                    return Err(error_span(TOO_MANY_MULTI_ALIAS_RHS, values[1].clone()));
                }
                let code = self.read_action(&values[0], ActionContext::Layer)?;
                for pos in positions {
                    self.assign_layer_code(name, pos, code, &values[0])?;
                }
            } else {
                return Err(error_span(
                    format!("Unknown key position '{}'", left),
                    left_range,
                ));
            }
        }
        Ok(())
    }

    fn assign_layer_code(
        &mut self,
        name: &str,
        pos: u16,
        code: u16,
        value: &NameRange,
    ) -> Result<()> {
        if name == MAIN && code == key_range::TRANSPARENT {
            return Err(error_span(
                "main layer keys may not be transparent",
                value.clone(),
            ));
        }
        self.config.assign_one_layer_code(name, pos, code);
        Ok(())
    }

    fn read_action(&mut self, range: &NameRange, context: ActionContext) -> Result<u16> {
        let text = self.name(range);
        let Some(open) = text.find('(') else {
            return key_code(text).ok_or_else(|| error_span(UNKNOWN_ACTION, range.clone()));
        };
        if !text.ends_with(')') {
            return Err(error_span("Missing )", range.clone()));
        }
        let start = range.end - text.len();
        let base_code = keycodes::action_code(&text[..open])
            .ok_or_else(|| error_span(UNKNOWN_ACTION, start..start + open))?;
        let args = self.args(start + open + 1..range.end - 1);

        match base_code {
            key_range::LAYER | key_range::TOGGLE | key_range::ONESHOT | key_range::TAP_TOGGLE => {
                self.expect_args(&args, 1, range)?;
                Ok(base_code + self.layer_index(&args[0])?)
            }
            key_range::GESTURE => {
                self.expect_args(&args, 1, range)?;
                if context != ActionContext::Layer {
                    return Err(error_span(
                        format!("tapdance may not be used within a {}", context.name()),
                        range.clone(),
                    ));
                }
                let name = self.name(&args[0]);
                match self.config.tapdance_names.get(name) {
                    Some(index) => Ok(base_code + index),
                    None => Err(error_span(
                        format!("Unknown tapdance '{}'", name),
                        args[0].clone(),
                    )),
                }
            }
            key_range::UNICODE => {
                self.expect_args(&args, 1, range)?;
                let cp = self.symbol(&args[0])?;
                let index = add_entry(&mut self.config.unicode, cp)
                    .ok_or_else(|| error_span("Too many unicode symbols", range.clone()))?;
                Ok(base_code + index)
            }
            key_range::DUAL_SYMBOL => {
                self.expect_args(&args, 2, range)?;
                let pair = (self.symbol(&args[0])?, self.symbol(&args[1])?);
                let index = add_entry(&mut self.config.duals, pair)
                    .ok_or_else(|| error_span("Too many dual symbols", range.clone()))?;
                Ok(base_code + index)
            }
            key_range::SHIFTED => {
                self.expect_args(&args, 1, range)?;
                match key_code(self.name(&args[0])) {
                    Some(code @ key_range::BASIC_MIN..=key_range::BASIC_MAX)
                        if !key_range::is_modifier(code) =>
                    {
                        Ok(base_code + code)
                    }
                    _ => Err(error_span("Expected a basic key", args[0].clone())),
                }
            }
            key_range::TAP_HOLD => {
                if context != ActionContext::Layer {
                    return Err(error_span(
                        format!("taphold may not be used within a {}", context.name()),
                        range.clone(),
                    ));
                }
                if !(2..=3).contains(&args.len()) {
                    return Err(error_span("Expected 2 or 3 arguments", range.clone()));
                }
                let mut entry = TapHold {
                    timeout: gesture_slots::DEFAULT_TIMEOUT,
                    tap: self.read_action(&args[0], ActionContext::TapHold)?,
                    hold: self.read_action(&args[1], ActionContext::TapHold)?,
                };
                for (code, arg) in [(entry.tap, &args[0]), (entry.hold, &args[1])] {
                    if code == key_range::TRANSPARENT {
                        return Err(error_span(
                            "taphold actions may not be transparent",
                            arg.clone(),
                        ));
                    }
                }
                if let Some(timeout) = args.get(2) {
                    entry.timeout = self.timeout(timeout)?;
                }
                let index = add_entry(&mut self.config.tap_holds, entry)
                    .ok_or_else(|| error_span("Too many tapholds", range.clone()))?;
                Ok(base_code + index)
            }
            _ => Err(error_span(UNKNOWN_ACTION, range.clone())),
        }
    }

    /// Comma separated arguments with surrounding whitespace trimmed. Commas within nested
    /// parentheses or escaped with `\` do not separate.
    fn args(&self, inner: NameRange) -> Vec<NameRange> {
        let text = &self.config.source[inner.clone()];
        let mut args = Vec::new();
        let mut push = |s: usize, e: usize| {
            let part = &text[s..e];
            let lead = part.len() - part.trim_start().len();
            let start = inner.start + s + lead;
            args.push(start..start + part.trim().len());
        };

        let mut depth = 0;
        let mut escaped = false;
        let mut start = 0;
        for (i, c) in text.char_indices() {
            if escaped {
                escaped = false;
                continue;
            }
            match c {
                '\\' => escaped = true,
                '(' => depth += 1,
                ')' if depth > 0 => depth -= 1,
                ',' if depth == 0 => {
                    push(start, i);
                    start = i + 1;
                }
                _ => {}
            }
        }
        push(start, text.len());
        args
    }

    /// A `tapping_term` style duration.
    fn timeout(&self, value: &NameRange) -> Result<u16> {
        let mut g = GlobalProp::new_default("tapping_term")
            .map_err(|e| error_span(e, value.clone()))?;
        g.parse_value(self.name(value))
            .map_err(|e| error_span(e, value.clone()))?;
        Ok(g.value)
    }

    fn expect_args(&self, args: &[NameRange], n: usize, range: &NameRange) -> Result<()> {
        if args.len() == n {
            Ok(())
        } else {
            Err(error_span(
                format!("Expected {} argument{}", n, if n == 1 { "" } else { "s" }),
                range.clone(),
            ))
        }
    }

    fn layer_index(&self, name_range: &NameRange) -> Result<u16> {
        let name = self.name(name_range);
        match self.config.layer_index(name) {
            Some(index) => Ok(index),
            None => Err(error_span(
                format!("Unknown layer name {}", name),
                name_range.clone(),
            )),
        }
    }

    /// A `[unicode]` name, a `U+XXXX` literal or a single character.
    fn symbol(&self, range: &NameRange) -> Result<u32> {
        let name = self.name(range);
        if let Some(cp) = self.config.unicode_names.get(name) {
            return Ok(*cp);
        }
        if name.starts_with("U+") || name.chars().nth(1).is_none() {
            return self.code_point(range);
        }
        Err(error_span(
            format!("Unknown unicode name '{}'", name),
            range.clone(),
        ))
    }

    fn code_point(&self, range: &NameRange) -> Result<u32> {
        let text = self.name(range);
        let cp = match text.strip_prefix("U+") {
            Some(hex) => u32::from_str_radix(hex, 16).ok().and_then(char::from_u32),
            None => {
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(c),
                    _ => None,
                }
            }
        };
        cp.map(|c| c as u32)
            .ok_or_else(|| error_span("Invalid unicode", range.clone()))
    }

    fn assignment<'l>(&self, line: &'l Line) -> Result<(NameRange, &'l [NameRange])> {
        let tokens = &line.tokens;
        if tokens.len() < 2 || &self.config.source[tokens[1].clone()] != "=" {
            return Err(error_span(MISSING_EQ, tokens[0].clone()));
        }
        if tokens.len() < 3 {
            return Err(error_span(MISSING_RHS, tokens[0].start..tokens[1].end));
        }
        Ok((tokens[0].clone(), &tokens[2..]))
    }

    fn single_assignment(&self, line: &Line) -> Result<(NameRange, NameRange)> {
        let (left, values) = self.assignment(line)?;
        if values.len() > 1 {
            return Err(error_span(TOO_MANY_RHS, values[1].clone()));
        }
        Ok((left, values[0].clone()))
    }

    fn name(&self, name_range: &NameRange) -> &'source str {
        self.config.name(name_range)
    }

    fn build_config(self) -> KeyboardConfig<'source> {
        self.config
    }
}

/// Index of `entry` in a symbol table, adding it if new.
fn add_entry<T: PartialEq>(table: &mut Vec<T>, entry: T) -> Option<u16> {
    if let Some(i) = table.iter().position(|e| *e == entry) {
        return Some(i as u16);
    }
    if table.len() == MAX_TABLE_LEN {
        return None;
    }
    table.push(entry);
    Some(table.len() as u16 - 1)
}

impl<'source> KeyboardConfig<'source> {
    fn new(source: &'source str) -> Self {
        let mut layers: HashMap<String, ConfigLayer> = Default::default();
        layers.insert(MAIN.into(), ConfigLayer::new(0));

        Self {
            source,
            global_map: Default::default(),
            matrix_map: Default::default(),
            named_positions: Default::default(),
            layers,
            tapdance_names: Default::default(),
            tapdances: Default::default(),
            unicode_names: Default::default(),
            unicode: Default::default(),
            duals: Default::default(),
            tap_holds: Default::default(),
            next_layer: 1,
            row_count: 0,
            col_count: 0,
        }
    }

    /// The binary keymap loaded by the firmware.
    pub fn serialize(&self) -> Vec<u16> {
        let layer_count = self.layers.len();
        let globals = self.serialize_globals();

        let mut out = vec![
            PROTOCOL_VERSION,
            (self.col_count as u16) | ((self.row_count as u16) << 8),
            layer_count as u16,
            self.tapdances.len() as u16,
            self.unicode.len() as u16,
            self.duals.len() as u16,
            self.tap_holds.len() as u16,
            globals.len() as u16,
        ];
        out.extend(globals);

        let offsets = out.len();
        out.resize(offsets + layer_count + 1, 0);
        let layer_base = out.len();

        let mut layers = self.layers.values().collect::<Vec<_>>();
        layers.sort_by(|a, b| Ord::cmp(&a.index, &b.index));
        for (i, l) in layers.into_iter().enumerate() {
            out.append(&mut l.serialize(self.row_count as usize, self.col_count as usize));
            out[offsets + i + 1] = (out.len() - layer_base) as u16;
        }

        for td in &self.tapdances {
            out.extend(td.serialize());
        }
        for cp in &self.unicode {
            out.extend(u32_to_u16(*cp));
        }
        for (unshifted, shifted) in &self.duals {
            out.extend(u32_to_u16(*unshifted));
            out.extend(u32_to_u16(*shifted));
        }
        for th in &self.tap_holds {
            out.extend(th.serialize());
        }

        out.into_iter().map(u16::to_le).collect()
    }

    pub fn serialize_globals(&self) -> Vec<u16> {
        let mut out = self.global_map.values().collect::<Vec<_>>();
        out.sort_by(|a, b| Ord::cmp(&a.index, &b.index));
        out.into_iter().flat_map(|v| v.serialize()).collect()
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn layer_index(&self, name: &str) -> Option<u16> {
        self.layers.get(name).map(|l| l.index)
    }

    pub fn tapdance_count(&self) -> usize {
        self.tapdances.len()
    }

    pub fn tapdance(&self, name: &str) -> Option<&TapDance> {
        let index = *self.tapdance_names.get(name)?;
        self.tapdances.get(index as usize)
    }

    pub fn unicode_table(&self) -> &[u32] {
        &self.unicode
    }

    pub fn dual_table(&self) -> &[(u32, u32)] {
        &self.duals
    }

    pub fn tap_hold_table(&self) -> &[TapHold] {
        &self.tap_holds
    }

    pub fn global(&self, name: &str) -> Option<GlobalProp> {
        self.global_map.get(name).copied()
    }

    fn name(&self, name_range: &NameRange) -> &'source str {
        let start = if name_range.len() > 1 && self.source[name_range.start..].starts_with('\\') {
            name_range.start + 1
        } else {
            name_range.start
        };
        &self.source[start..name_range.end]
    }

    pub fn key_position(&self, name: &str) -> Option<u16> {
        if let Some(name) = name.strip_prefix("0x") {
            if let Ok(pos) = u16::from_str_radix(name, 16) {
                return Some(match name.len() {
                    2 => (pos & 0xf0) << 4 | (pos & 0xf),
                    3..=4 => pos,
                    _ => return None,
                });
            }
        }
        None
    }

    fn assign_position_name(&mut self, pos: u16, name: &str, span: NameRange) -> Result<()> {
        if self.named_positions.iter().any(|(p, _)| *p == pos) {
            return Err(error_span("Key position already named", span));
        }
        self.named_positions.push((pos, span));

        let name = match key_code(name) {
            Some(code) => format!("{code:04X}"),
            None => name.into(),
        };
        self.matrix_map.entry(name).or_default().push(pos);
        Ok(())
    }

    pub fn get_aliases(&self, name: &str) -> Option<&Vec<u16>> {
        if let Some(code) = key_code(name) {
            self.matrix_map.get(format!("{code:04X}").as_str())
        } else {
            self.matrix_map.get(name)
        }
    }

    /// The code bound at `rowcol` of the named layer; transparent if unbound.
    pub fn code_at(&self, name: &str, rowcol: u16) -> u16 {
        if let Some(layer) = self.layers.get(name) {
            return layer.code_at(rowcol);
        }
        key_range::TRANSPARENT
    }

    fn assign_one_layer_code(&mut self, name: &str, pos: u16, code: u16) {
        if let Some(layer) = self.layers.get_mut(name) {
            layer.set_code(pos, code);
        }
    }

    fn new_layer(&mut self, name: &str) {
        self.layers
            .insert(name.into(), ConfigLayer::new(self.next_layer));

        self.next_layer += 1;
    }

    fn ensure_section(
        &mut self,
        section: &Section,
        seen: &mut HashSet<&'source str>,
    ) -> Result<()> {
        let source = self.source;
        let name = &source[section.name.clone()];
        let suffix = section.suffix.clone().map(|s| &source[s]);

        match (name, suffix) {
            ("matrix", Some(suffix)) => {
                if self.row_count != 0 {
                    return Err(error_span(
                        "Duplicate matrix section",
                        section.header.clone(),
                    ));
                }
                if let Some((row_count, col_count)) = suffix.split_once('x') {
                    if let (Ok(row_count), Ok(col_count)) =
                        (row_count.parse::<u8>(), col_count.parse::<u8>())
                    {
                        if (1..=MAX_ROWS).contains(&row_count) && col_count != 0 {
                            self.row_count = row_count;
                            self.col_count = col_count;
                            return Ok(());
                        }
                    }
                }

                Err(error_span(
                    "expected [matrix:rxc] where r and c are row column size",
                    section.header.clone(),
                ))
            }
            ("global" | "unicode", None) => Ok(()),
            ("global" | "unicode", Some(_)) => Err(error_span(
                "suffix not allowed here",
                section.header.clone(),
            )),
            ("tapdance", Some(suffix)) => {
                if self.tapdance_names.contains_key(suffix) {
                    return Err(error_span(
                        format!("Duplicate tapdance '{}'", suffix),
                        section.header.clone(),
                    ));
                }
                if self.tapdances.len() == MAX_TABLE_LEN {
                    return Err(error_span("Too many tapdances", section.header.clone()));
                }
                self.tapdance_names
                    .insert(suffix, self.tapdances.len() as u16);
                self.tapdances.push(TapDance::default());
                Ok(())
            }
            (_, Some(_)) | ("matrix" | "tapdance", None) => Err(error_span(
                format!("Unknown section '{}'", &source[section.header.clone()]),
                section.header.clone(),
            )),
            (name, None) => {
                if !seen.insert(name) {
                    return Err(error_span(
                        format!("Duplicate layer section '{}'", name),
                        section.header.clone(),
                    ));
                }
                if !self.layers.contains_key(name) {
                    if self.layers.len() == MAX_LAYERS {
                        return Err(error_span("Too many layers", section.header.clone()));
                    }
                    self.new_layer(name);
                }
                Ok(())
            }
        }
    }

    /// Every named matrix position needs a main layer binding.
    fn check_main_layer(&self) -> Result<()> {
        let Some(main) = self.layers.get(MAIN) else {
            return Ok(());
        };
        for (pos, span) in &self.named_positions {
            if !main.codes.contains_key(pos) {
                return Err(error_span(
                    format!("No main layer binding for '{}'", self.name(span)),
                    span.clone(),
                ));
            }
        }
        Ok(())
    }
}

impl ConfigLayer {
    fn new(index: u16) -> Self {
        Self {
            codes: Default::default(),
            index,
        }
    }

    /// The base layer is always dense with unbound keys as noop. Other layers are sparse
    /// (position, code) pairs when that is smaller.
    fn serialize(&self, row_count: usize, col_count: usize) -> Vec<u16> {
        let size = row_count * col_count;
        if self.index == 0 || self.codes.len() * 2 >= size {
            let fill = if self.index == 0 {
                key_range::NOOP
            } else {
                key_range::TRANSPARENT
            };
            let mut bin = vec![fill; size];
            for (k, v) in self.codes.iter() {
                bin[(k >> 8) as usize * col_count + (k & 0xff) as usize] = *v;
            }
            bin
        } else {
            let mut codes = self.codes.iter().collect::<Vec<_>>();
            codes.sort_by_key(|k| k.0);
            codes.into_iter().flat_map(|(k, v)| [*k, *v]).collect()
        }
    }

    pub fn code_at(&self, pos: u16) -> u16 {
        *self.codes.get(&pos).unwrap_or(&key_range::TRANSPARENT)
    }

    fn set_code(&mut self, pos: u16, code: u16) {
        self.codes.insert(pos, code);
    }
}

fn error_span(message: impl Into<String>, range: NameRange) -> ConfigError {
    ConfigError::new(message.into(), range)
}

pub fn compile(source: &str) -> Result<KeyboardConfig> {
    let sections = split_sections(source)?;
    let mut parser = Parser::new(source);

    parser.parse_sections(&sections)?;
    Ok(parser.build_config())
}

#[cfg(test)]
#[path = "compiler_test.rs"]
mod test;
