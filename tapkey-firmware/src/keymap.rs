use tapkey_common::{
    globals, gesture_slots, u32_from_u16, GESTURE_RECORD_LEN, PROTOCOL_VERSION, TAP_HOLD_RECORD_LEN,
};

use crate::{
    binding::{KeyBinding, LayerId},
    dual_symbol::DualSymbol,
    layers::{LayerLookup, MAX_LAYERS},
};

const UNICODE_LEN: usize = 2;
const DUAL_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoadError {
    OutOfSpace,
    VersionMismatch,
    RowColMismatch,
    Corrupt,
    /// The base layer leaves a key position transparent.
    MissingBaseBinding {
        row: u8,
        col: u8,
    },
    UnboundLayerReference(u8),
    UnboundGesture(u8),
    UnboundSymbol(u8),
    UnboundTapHold(u8),
}

/// A tap-dance record with its timeout resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GestureRecord {
    pub timeout: u16,
    pub actions: [u16; gesture_slots::COUNT],
}

/// A tap-hold record with its timeout resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TapHoldRecord {
    pub timeout: u16,
    pub tap: u16,
    pub hold: u16,
}

#[derive(Debug)]
pub struct Layer<'l, const ROWS: usize, const COLS: usize>(&'l [u16]);

impl<const ROWS: usize, const COLS: usize> Layer<'_, ROWS, COLS> {
    pub fn get(&self, row: usize, column: usize) -> u16 {
        if self.is_dense() {
            *self.0.get(row * COLS + column).unwrap_or(&0u16)
        } else {
            search_code(self.0, row, column)
        }
    }

    fn is_dense(&self) -> bool {
        self.0.len() == ROWS * COLS
    }

    fn codes(&self) -> impl Iterator<Item = u16> + '_ {
        let dense = self.is_dense();
        self.0
            .iter()
            .enumerate()
            .filter(move |(i, _)| dense || i & 1 == 1)
            .map(|(_, c)| *c)
    }
}

/// The immutable binding tables loaded from a compiled keymap.
///
/// `data` holds the layer offsets, the layers, then the tap-dance, unicode, dual symbol and
/// tap-hold tables, each immediately after the previous.
pub struct Keymap<const ROWS: usize, const COLS: usize, const LAYOUT_MAX: usize> {
    data: [u16; LAYOUT_MAX],
    layer_count: usize,
    gesture_count: usize,
    unicode_count: usize,
    dual_count: usize,
    tap_hold_count: usize,
    gesture_base: usize,
    unicode_base: usize,
    dual_base: usize,
    tap_hold_base: usize,
    globals: [u16; globals::COUNT],
}

impl<const ROWS: usize, const COLS: usize, const LAYOUT_MAX: usize> Default
    for Keymap<ROWS, COLS, LAYOUT_MAX>
{
    fn default() -> Self {
        Self {
            data: [0; LAYOUT_MAX],
            layer_count: 0,
            gesture_count: 0,
            unicode_count: 0,
            dual_count: 0,
            tap_hold_count: 0,
            gesture_base: 0,
            unicode_base: 0,
            dual_base: 0,
            tap_hold_base: 0,
            globals: globals::DEFAULTS,
        }
    }
}

impl<const ROWS: usize, const COLS: usize, const LAYOUT_MAX: usize> Keymap<ROWS, COLS, LAYOUT_MAX> {
    /// Load a compiled keymap. The format is as follows:
    ///
    /// protocol version
    /// row_count (high byte), column_count (low byte) should match `ROWS` and `COLS`
    /// layer, tap-dance, unicode, dual symbol and tap-hold counts
    /// globals word count followed by (index, value) pairs
    /// layer_count + 1 layer offsets relative to the first layer, layers, then the tables.
    /// Layers are dense if every entry has a value; size == ROWS * COLS
    /// Layers are sparse if size < ROWS * COLS in which case it is a list of ordered tuples where
    /// the first word is the row (high byte) and column (low byte) and the next word is the value
    ///
    /// On error the keymap is left empty.
    pub fn load(&mut self, iter: impl IntoIterator<Item = u16>) -> Result<(), LoadError> {
        let result = self.read(iter.into_iter().map(u16::from_le));
        if result.is_err() {
            *self = Self::default();
        }
        result
    }

    fn read(&mut self, mut iter: impl Iterator<Item = u16>) -> Result<(), LoadError> {
        *self = Self::default();

        if iter.next().ok_or(LoadError::Corrupt)? != PROTOCOL_VERSION {
            return Err(LoadError::VersionMismatch);
        }
        {
            let n = iter.next().ok_or(LoadError::Corrupt)?;

            if (n >> 8) as usize != ROWS || (n & 0xff) as usize != COLS {
                return Err(LoadError::RowColMismatch);
            }
        }

        let layer_count = iter.next().ok_or(LoadError::Corrupt)? as usize;
        let gesture_count = iter.next().ok_or(LoadError::Corrupt)? as usize;
        let unicode_count = iter.next().ok_or(LoadError::Corrupt)? as usize;
        let dual_count = iter.next().ok_or(LoadError::Corrupt)? as usize;
        let tap_hold_count = iter.next().ok_or(LoadError::Corrupt)? as usize;

        if layer_count == 0 || layer_count > MAX_LAYERS {
            crate::warn!("corrupt layout: layer_count {} out of range", layer_count);
            return Err(LoadError::Corrupt);
        }
        if [gesture_count, unicode_count, dual_count, tap_hold_count]
            .iter()
            .any(|n| *n > 256)
        {
            crate::warn!("corrupt layout: table count out of range");
            return Err(LoadError::Corrupt);
        }

        let mut globals_count = iter.next().ok_or(LoadError::Corrupt)?;
        while globals_count != 0 {
            if globals_count < 2 {
                crate::warn!("corrupt layout: globals_count is wrong");
                return Err(LoadError::Corrupt);
            }
            globals_count -= 2;
            let i = iter.next().ok_or(LoadError::Corrupt)?;
            let v = iter.next().ok_or(LoadError::Corrupt)?;
            let (min, max) = globals::limits(i).ok_or(LoadError::Corrupt)?;
            if !(min..=max).contains(&v) {
                crate::warn!("corrupt layout: global {} value {} out of range", i, v);
                return Err(LoadError::Corrupt);
            }
            self.globals[i as usize] = v;
        }

        let mut len = 0;
        for (t, f) in self.data.iter_mut().zip(iter.by_ref()) {
            *t = f;
            len += 1;
        }
        if iter.next().is_some() {
            crate::warn!("layout too big: LAYOUT_MAX is {}", LAYOUT_MAX);
            return Err(LoadError::OutOfSpace);
        }

        let layers_base = layer_count + 1;
        if len < layers_base {
            return Err(LoadError::Corrupt);
        }
        let mut prev = 0;
        for (i, &offset) in self.data[..layers_base].iter().enumerate() {
            let offset = offset as usize;
            if (i == 0 && offset != 0) || offset < prev {
                crate::warn!("corrupt layout: layer {} offset is invalid", i);
                return Err(LoadError::Corrupt);
            }
            prev = offset;
        }

        self.layer_count = layer_count;
        self.gesture_count = gesture_count;
        self.unicode_count = unicode_count;
        self.dual_count = dual_count;
        self.tap_hold_count = tap_hold_count;
        self.gesture_base = layers_base + prev;
        self.unicode_base = self.gesture_base + gesture_count * GESTURE_RECORD_LEN;
        self.dual_base = self.unicode_base + unicode_count * UNICODE_LEN;
        self.tap_hold_base = self.dual_base + dual_count * DUAL_LEN;

        if self.tap_hold_base + tap_hold_count * TAP_HOLD_RECORD_LEN != len {
            crate::warn!("corrupt layout: length {} does not match tables", len);
            return Err(LoadError::Corrupt);
        }

        self.validate()
    }

    fn validate(&self) -> Result<(), LoadError> {
        for n in 0..self.layer_count {
            let layer = self.get_layer(n as LayerId).ok_or(LoadError::Corrupt)?;
            if !layer.is_dense() {
                check_sparse::<ROWS, COLS>(layer.0)?;
            }
            for code in layer.codes() {
                self.check_code(code)?;
            }
        }

        let Some(base) = self.get_layer(0) else {
            return Err(LoadError::Corrupt);
        };
        for row in 0..ROWS {
            for col in 0..COLS {
                if KeyBinding::decode(base.get(row, col)) == Some(KeyBinding::Transparent) {
                    return Err(LoadError::MissingBaseBinding {
                        row: row as u8,
                        col: col as u8,
                    });
                }
            }
        }

        for n in 0..self.gesture_count {
            let s = self.gesture_base + n * GESTURE_RECORD_LEN;
            for &code in &self.data[s + 1..s + GESTURE_RECORD_LEN] {
                if let KeyBinding::GestureRef(_) | KeyBinding::TapHold(_) =
                    self.check_code(code)?
                {
                    crate::warn!("corrupt layout: tap-dance {} nests a timed key", n);
                    return Err(LoadError::Corrupt);
                }
            }
        }

        for n in 0..self.tap_hold_count {
            let s = self.tap_hold_base + n * TAP_HOLD_RECORD_LEN;
            for &code in &self.data[s + 1..s + TAP_HOLD_RECORD_LEN] {
                if let KeyBinding::Transparent
                | KeyBinding::GestureRef(_)
                | KeyBinding::TapHold(_) = self.check_code(code)?
                {
                    crate::warn!("corrupt layout: tap-hold {} has code {}", n, code);
                    return Err(LoadError::Corrupt);
                }
            }
        }

        for n in 0..self.unicode_count {
            char::from_u32(self.unicode(n as u8)).ok_or(LoadError::Corrupt)?;
        }
        for n in 0..self.dual_count {
            let dual = self.dual(n as u8);
            char::from_u32(dual.unshifted).ok_or(LoadError::Corrupt)?;
            char::from_u32(dual.shifted).ok_or(LoadError::Corrupt)?;
        }

        Ok(())
    }

    fn check_code(&self, code: u16) -> Result<KeyBinding, LoadError> {
        let Some(binding) = KeyBinding::decode(code) else {
            crate::warn!("corrupt layout: invalid code {}", code);
            return Err(LoadError::Corrupt);
        };
        match binding {
            KeyBinding::LayerControl(n, _) if n as usize >= self.layer_count => {
                Err(LoadError::UnboundLayerReference(n))
            }
            KeyBinding::GestureRef(n) if n as usize >= self.gesture_count => {
                Err(LoadError::UnboundGesture(n))
            }
            KeyBinding::Unicode(n) if n as usize >= self.unicode_count => {
                Err(LoadError::UnboundSymbol(n))
            }
            KeyBinding::DualSymbol(n) if n as usize >= self.dual_count => {
                Err(LoadError::UnboundSymbol(n))
            }
            KeyBinding::TapHold(n) if n as usize >= self.tap_hold_count => {
                Err(LoadError::UnboundTapHold(n))
            }
            _ => Ok(binding),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.layer_count != 0
    }

    pub fn layer_count(&self) -> usize {
        self.layer_count
    }

    pub fn get_layer(&self, n: LayerId) -> Option<Layer<'_, ROWS, COLS>> {
        let idx = n as usize;
        if idx >= self.layer_count {
            return None;
        }
        let base = self.layer_count + 1;
        let s = base + self.data[idx] as usize;
        let e = base + self.data[idx + 1] as usize;
        self.data.get(s..e).map(Layer)
    }

    pub fn gesture(&self, n: u8) -> Option<GestureRecord> {
        if n as usize >= self.gesture_count {
            return None;
        }
        let s = self.gesture_base + n as usize * GESTURE_RECORD_LEN;
        let record = &self.data[s..s + GESTURE_RECORD_LEN];
        let timeout = match record[0] {
            gesture_slots::DEFAULT_TIMEOUT => self.global(globals::TAPPING_TERM),
            t => t,
        };
        let mut actions = [0; gesture_slots::COUNT];
        actions.copy_from_slice(&record[1..]);
        Some(GestureRecord { timeout, actions })
    }

    pub fn tap_hold(&self, n: u8) -> Option<TapHoldRecord> {
        if n as usize >= self.tap_hold_count {
            return None;
        }
        let s = self.tap_hold_base + n as usize * TAP_HOLD_RECORD_LEN;
        let record = &self.data[s..s + TAP_HOLD_RECORD_LEN];
        let timeout = match record[0] {
            gesture_slots::DEFAULT_TIMEOUT => self.global(globals::TAPPING_TERM),
            t => t,
        };
        Some(TapHoldRecord {
            timeout,
            tap: record[1],
            hold: record[2],
        })
    }

    /// Code point of unicode entry `n`; 0 when out of range.
    pub fn unicode(&self, n: u8) -> u32 {
        if n as usize >= self.unicode_count {
            return 0;
        }
        let s = self.unicode_base + n as usize * UNICODE_LEN;
        u32_from_u16(self.data[s], self.data[s + 1])
    }

    pub fn dual(&self, n: u8) -> DualSymbol {
        if n as usize >= self.dual_count {
            return DualSymbol::new(0, 0);
        }
        let s = self.dual_base + n as usize * DUAL_LEN;
        let d = &self.data[s..s + DUAL_LEN];
        DualSymbol::new(u32_from_u16(d[0], d[1]), u32_from_u16(d[2], d[3]))
    }

    pub fn global(&self, index: u16) -> u16 {
        self.globals[index as usize]
    }
}

impl<const ROWS: usize, const COLS: usize, const LAYOUT_MAX: usize> LayerLookup
    for Keymap<ROWS, COLS, LAYOUT_MAX>
{
    fn binding(&self, layer: LayerId, row: usize, col: usize) -> KeyBinding {
        self.get_layer(layer)
            .and_then(|l| KeyBinding::decode(l.get(row, col)))
            .unwrap_or_default()
    }
}

fn check_sparse<const ROWS: usize, const COLS: usize>(codes: &[u16]) -> Result<(), LoadError> {
    if codes.len() & 1 == 1 {
        crate::warn!("corrupt layout: sparse layer has length {}", codes.len());
        return Err(LoadError::Corrupt);
    }
    let mut prev = None;
    for pos in codes.iter().step_by(2).copied() {
        if (pos >> 8) as usize >= ROWS || (pos & 0xff) as usize >= COLS || prev >= Some(pos) {
            crate::warn!("corrupt layout: sparse position {} is invalid", pos);
            return Err(LoadError::Corrupt);
        }
        prev = Some(pos);
    }
    Ok(())
}

fn search_code(mut codes: &[u16], row: usize, column: usize) -> u16 {
    let cmp = (row as u16) << 8 | (column as u16);

    let mut s = codes.len();

    loop {
        s = (s >> 1) & !1;
        // len < 2 would work but s avoids the bounds checker
        if codes.len() <= s {
            if codes.len() == 2 && cmp == codes[0] {
                return codes[1];
            }
            return 0;
        }
        let v = codes[s];

        #[allow(clippy::comparison_chain)]
        if cmp < v {
            codes = &codes[..s];
        } else if cmp > v {
            if codes.len() > s + 2 {
                codes = &codes[s + 2..]
            } else {
                return 0;
            }
        } else {
            return if codes.len() > s + 1 { codes[s + 1] } else { 0 };
        }
    }
}

#[cfg(test)]
#[path = "keymap_test.rs"]
mod test;
