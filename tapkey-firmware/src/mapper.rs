use embassy_futures::select::{select3, Either3};
use embassy_sync::{
    blocking_mutex::raw::{NoopRawMutex, RawMutex},
    channel::Channel,
    signal::Signal,
};
use embassy_time::{Instant, Timer};
use tapkey_common::{globals, keycodes::key_range};

use crate::{
    binder::{Applied, GestureBinder},
    binding::{ActivationMode, KeyBinding, LayerId},
    dual_action::{DualActionTimer, Resolved},
    gesture::{Finalized, GestureClassifier},
    key_scanner::{KeyScannerChannel, PhysicalKey, ScanKey},
    keymap::{Keymap, LoadError},
    layers::LayerStack,
    modifiers::ModifierState,
    tap_toggle::TapToggle,
};

/// Tap-dance keys that may be mid-gesture at once.
pub const MAX_OPEN_GESTURES: usize = 4;

const LEFT_SHIFT: u8 = key_range::LEFT_SHIFT as u8;

#[derive(Copy, Clone, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimedScanKey(pub ScanKey, pub u64);
impl TimedScanKey {
    pub fn same_key(&self, scan_key: &TimedScanKey) -> bool {
        self.0.same_key(scan_key.0)
    }
}

#[derive(Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyEvent {
    Basic(u8, bool),
    /// Consumer usage pressed; 0 on release.
    Consumer(u16),
    /// Code point for the text injector.
    Unicode(u32),
    /// Release everything.
    Clear,
}
impl KeyEvent {
    fn consumer(code: u16, is_down: bool) -> Self {
        Self::Consumer(if is_down { code } else { 0 })
    }
}

#[derive(Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlMessage {
    ClearAll,
    Exit,
}
#[derive(Default)]
pub struct ControlSignal(Signal<NoopRawMutex, ControlMessage>);
impl ControlSignal {
    pub fn clear_all(&self) {
        self.0.signal(ControlMessage::ClearAll);
    }

    pub fn exit(&self) {
        self.0.signal(ControlMessage::Exit);
    }
}

pub struct MapperChannel<M: RawMutex, const N: usize>(Channel<M, KeyEvent, N>, ControlSignal);
impl<M: RawMutex, const N: usize> Default for MapperChannel<M, N> {
    fn default() -> Self {
        Self(Channel::new(), ControlSignal::default())
    }
}
impl<M: RawMutex, const N: usize> MapperChannel<M, N> {
    pub async fn receive(&self) -> KeyEvent {
        self.0.receive().await
    }

    pub fn try_receive(&self) -> Option<KeyEvent> {
        self.0.try_receive().ok()
    }

    pub fn control(&self) -> &ControlSignal {
        &self.1
    }

    async fn wait_control(&self) -> ControlMessage {
        self.1 .0.wait().await
    }

    fn report(&self, message: KeyEvent) {
        if self.0.try_send(message).is_err() {
            self.clear_reports();
            let _ = self.0.try_send(KeyEvent::Clear);
        }
    }

    fn clear_reports(&self) {
        self.0.clear();
    }
}

const MIN_REPORT_BUFFER_SIZE: usize = 2;

const fn assert_sizes<const REPORT_BUFFER_SIZE: usize>() -> bool {
    assert!(REPORT_BUFFER_SIZE >= MIN_REPORT_BUFFER_SIZE);
    true
}

/// Turns scan events in to key events.
///
/// Every event is processed to completion before the next is read. Due tap-dance windows and
/// tap-hold timeouts are closed before each event so that an expiry and an event never
/// interleave.
pub struct Mapper<
    'c,
    const ROW_COUNT: usize,
    const COL_COUNT: usize,
    const LAYOUT_MAX: usize,
    M: RawMutex,
    const REPORT_BUFFER_SIZE: usize,
> {
    keymap: Keymap<ROW_COUNT, COL_COUNT, LAYOUT_MAX>,
    layers: LayerStack,
    modifiers: ModifierState,
    gestures: GestureClassifier<MAX_OPEN_GESTURES>,
    binder: GestureBinder<MAX_OPEN_GESTURES>,
    dual_action: DualActionTimer,
    tap_toggle: TapToggle,
    active_actions: [[KeyBinding; COL_COUNT]; ROW_COUNT],
    report_channel: &'c MapperChannel<M, REPORT_BUFFER_SIZE>,
    now: u64,
}
impl<
        'c,
        const ROW_COUNT: usize,
        const COL_COUNT: usize,
        const LAYOUT_MAX: usize,
        M: RawMutex,
        const REPORT_BUFFER_SIZE: usize,
    > Mapper<'c, ROW_COUNT, COL_COUNT, LAYOUT_MAX, M, REPORT_BUFFER_SIZE>
{
    const OKAY: bool = assert_sizes::<REPORT_BUFFER_SIZE>();
    pub fn new(report_channel: &'c MapperChannel<M, REPORT_BUFFER_SIZE>) -> Self {
        assert!(Self::OKAY);
        Self {
            keymap: Keymap::default(),
            layers: LayerStack::default(),
            modifiers: ModifierState::default(),
            gestures: GestureClassifier::default(),
            binder: GestureBinder::default(),
            dual_action: DualActionTimer::default(),
            tap_toggle: TapToggle::default(),
            active_actions: [[KeyBinding::Transparent; COL_COUNT]; ROW_COUNT],
            report_channel,
            now: 0,
        }
    }

    /// Replace the keymap. Until a load succeeds every scan event is ignored.
    pub fn load_layout(
        &mut self,
        layout_mapping: impl IntoIterator<Item = u16>,
    ) -> Result<(), LoadError> {
        self.reset();
        if let Err(err) = self.keymap.load(layout_mapping) {
            crate::warn!("keymap rejected; halted");
            return Err(err);
        }
        crate::info!("keymap loaded with {} layers", self.keymap.layer_count());
        Ok(())
    }

    pub fn is_layer_active(&self, layer: LayerId) -> bool {
        self.layers.is_active(layer)
    }

    pub fn oneshot_pending(&self) -> bool {
        self.layers.oneshot_pending()
    }

    /// Bit mask of the active layers for indicator lights.
    pub fn active_layers(&self) -> u32 {
        self.layers.active_mask()
    }

    fn reset(&mut self) {
        for r in self.active_actions.iter_mut() {
            for c in r.iter_mut() {
                *c = KeyBinding::Transparent;
            }
        }
        self.layers.clear();
        self.modifiers.clear();
        self.gestures.clear();
        self.binder.clear();
        self.dual_action.clear();
        self.tap_toggle.clear();
    }

    fn clear_all(&mut self) {
        self.reset();
        self.report_channel.clear_reports();
        self.report(KeyEvent::Clear);
    }

    pub async fn run<const SCANNER_BUFFER_SIZE: usize>(
        &mut self,
        key_scan_channel: &'c KeyScannerChannel<M, SCANNER_BUFFER_SIZE>,
    ) -> ControlMessage {
        loop {
            let event = select3(
                key_scan_channel.receive(),
                self.report_channel.wait_control(),
                timer_at(self.wait_until()),
            )
            .await;

            self.now = Instant::now().as_millis();

            match event {
                Either3::First(scan_key) => self.key_switch(TimedScanKey(scan_key, self.now)),
                Either3::Second(ControlMessage::ClearAll) => self.clear_all(),
                Either3::Second(ControlMessage::Exit) => return ControlMessage::Exit,
                Either3::Third(_) => self.check_time(self.now),
            }
        }
    }

    pub fn key_switch(&mut self, k: TimedScanKey) {
        if !self.keymap.is_loaded() {
            crate::debug!("no keymap; ignored key");
            return;
        }
        self.check_time(k.1);

        let key = k.0.position();
        let is_down = k.0.is_down();
        let (row, col) = (key.row(), key.column());
        if row >= ROW_COUNT || col >= COL_COUNT {
            crate::warn!("key out of range {} {}", row, col);
            return;
        }

        if let Some(resolved) = self.dual_action.key_switch(key, is_down) {
            let tapped = matches!(resolved, Resolved::Tap { .. });
            self.resolve_dual_action(resolved);
            if tapped {
                return;
            }
        }

        if is_down {
            self.gestures.interrupt(key);
            self.tap_toggle.interrupt(key);
        }

        if self.gestures.is_open(key) {
            if let Some(fin) = self.gestures.on_event(key, is_down, self.now) {
                self.finalize(fin);
            }
            return;
        }

        if is_down {
            let binding = self.layers.resolve(&self.keymap, row, col);
            self.active_actions[row][col] = binding;
            self.run_binding(key, binding, true);
        } else {
            let binding = core::mem::take(&mut self.active_actions[row][col]);
            if let Some(held) = self.binder.release(key) {
                self.run_binding(key, held, false);
            }
            self.run_binding(key, binding, false);
        }
    }

    /// Close every tap-dance window and tap-hold wait due by `now`.
    pub fn check_time(&mut self, now: u64) {
        self.now = self.now.max(now);
        while let Some(fin) = self.gestures.expire(self.now) {
            self.finalize(fin);
        }
        if let Some(resolved) = self.dual_action.expire(self.now) {
            self.resolve_dual_action(resolved);
        }
    }

    /// When [Self::check_time] next has work; `u64::MAX` if never.
    pub fn wait_until(&self) -> u64 {
        self.gestures.wait_until().min(self.dual_action.wait_until())
    }

    fn finalize(&mut self, fin: Finalized) {
        let Some(record) = self.keymap.gesture(fin.gesture) else {
            crate::warn!("tap-dance {} missing", fin.gesture);
            return;
        };
        match self.binder.apply(&fin, &record.actions) {
            Some(Applied::Tap(binding)) => {
                self.run_binding(fin.key, binding, true);
                self.run_binding(fin.key, binding, false);
            }
            Some(Applied::Hold(binding)) => self.run_binding(fin.key, binding, true),
            None => {}
        }
    }

    /// A tap runs both edges of the tap action. A hold leaves its action in `active_actions` for
    /// the key's release.
    fn resolve_dual_action(&mut self, resolved: Resolved) {
        match resolved {
            Resolved::Tap { key, tap } => {
                self.active_actions[key.row()][key.column()] = KeyBinding::Transparent;
                let binding = KeyBinding::decode(tap).unwrap_or(KeyBinding::Noop);
                self.run_binding(key, binding, true);
                self.run_binding(key, binding, false);
            }
            Resolved::Hold { key, hold } => {
                let binding = KeyBinding::decode(hold).unwrap_or(KeyBinding::Noop);
                self.active_actions[key.row()][key.column()] = binding;
                self.run_binding(key, binding, true);
            }
        }
    }

    fn run_binding(&mut self, key: PhysicalKey, binding: KeyBinding, is_down: bool) {
        match binding {
            KeyBinding::Transparent | KeyBinding::Noop => {}
            KeyBinding::SimpleKey(kc) => {
                self.modifiers.key_switch(kc, is_down);
                self.report(KeyEvent::Basic(kc, is_down));
            }
            KeyBinding::ShiftedKey(kc) => {
                if is_down {
                    if self.modifiers.hold(LEFT_SHIFT, true) {
                        self.report(KeyEvent::Basic(LEFT_SHIFT, true));
                    }
                    self.report(KeyEvent::Basic(kc, true));
                } else {
                    self.report(KeyEvent::Basic(kc, false));
                    if self.modifiers.hold(LEFT_SHIFT, false) {
                        self.report(KeyEvent::Basic(LEFT_SHIFT, false));
                    }
                }
            }
            KeyBinding::Consumer(code) => self.report(KeyEvent::consumer(code, is_down)),
            KeyBinding::LayerControl(layer, mode) => self.layer_control(key, layer, mode, is_down),
            KeyBinding::GestureRef(n) => {
                if is_down {
                    self.start_gesture(key, n);
                }
            }
            KeyBinding::TapHold(n) => {
                if is_down {
                    self.start_dual_action(key, n);
                }
            }
            KeyBinding::DualSymbol(n) => {
                if is_down {
                    let cp = self.keymap.dual(n).resolve(&self.modifiers);
                    self.report(KeyEvent::Unicode(cp));
                }
            }
            KeyBinding::Unicode(n) => {
                if is_down {
                    self.report(KeyEvent::Unicode(self.keymap.unicode(n)));
                }
            }
        }

        if is_down && binding.consumes_oneshot() && self.layers.consume_oneshot() {
            crate::debug!("one-shot consumed");
        }
    }

    fn start_gesture(&mut self, key: PhysicalKey, n: u8) {
        let Some(record) = self.keymap.gesture(n) else {
            crate::warn!("tap-dance {} missing", n);
            return;
        };
        if !self.gestures.start(key, n, record.timeout, self.now) {
            crate::warn!("no free tap-dance slot for {} {}", key.row, key.col);
        }
    }

    fn start_dual_action(&mut self, key: PhysicalKey, n: u8) {
        let Some(record) = self.keymap.tap_hold(n) else {
            crate::warn!("tap-hold {} missing", n);
            return;
        };
        if let Some(prev) = self
            .dual_action
            .start(key, record.tap, record.hold, record.timeout, self.now)
        {
            self.resolve_dual_action(prev);
        }
    }

    fn layer_control(
        &mut self,
        key: PhysicalKey,
        layer: LayerId,
        mode: ActivationMode,
        is_down: bool,
    ) {
        match mode {
            ActivationMode::Momentary => {
                if is_down {
                    self.layers.activate_momentary(layer);
                } else {
                    self.layers.deactivate_momentary(layer);
                }
            }
            ActivationMode::Toggled => {
                if is_down {
                    self.layers.toggle(layer);
                }
            }
            ActivationMode::OneShot => {
                if is_down {
                    self.layers.set_oneshot(layer);
                }
            }
            ActivationMode::TapToggle => {
                let term = self.keymap.global(globals::TAP_TOGGLE_TERM);
                if is_down {
                    self.layers.activate_momentary(layer);
                    self.tap_toggle.press(key, self.now, term);
                } else {
                    self.layers.deactivate_momentary(layer);
                    let count = self.keymap.global(globals::TAP_TOGGLE_COUNT);
                    if self.tap_toggle.release(key, self.now, term, count) {
                        self.layers.toggle(layer);
                    }
                }
            }
        }
    }

    fn report(&mut self, message: KeyEvent) {
        self.report_channel.report(message);
    }
}

async fn timer_at(wait_until: u64) {
    if wait_until == u64::MAX {
        core::future::pending::<()>().await;
    } else {
        Timer::at(Instant::from_millis(wait_until)).await;
    }
}

#[cfg(test)]
#[path = "mapper_test.rs"]
mod test;
