use std::collections::HashMap;

use lazy_static::lazy_static;
use tapkey_common::globals;

pub mod spec {
    use tapkey_common::globals;

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum GlobalType {
        /// Milliseconds; an `ms` suffix is optional.
        Timeout,
        Count,
    }
    use GlobalType::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct GlobalProp {
        pub index: u16,
        pub spec: GlobalType,
        pub value: u16,
    }

    impl GlobalProp {
        pub fn new_default(name: &str) -> Result<GlobalProp, String> {
            super::DEFAULTS
                .get(name)
                .ok_or_else(|| format!("Invalid global '{}'", name))
                .copied()
        }

        pub fn default_name(&self) -> Option<&'static str> {
            super::INDEX_TO_NAME.get(self.index as usize).copied()
        }

        pub fn limits(&self) -> (u16, u16) {
            globals::limits(self.index).unwrap_or((0, u16::MAX))
        }

        pub fn serialize(self) -> [u16; 2] {
            [self.index, self.value]
        }

        pub(crate) fn parse_value(&mut self, text: &str) -> Result<(), String> {
            let (min, max) = self.limits();
            let n = match self.spec {
                Timeout => text.strip_suffix("ms").unwrap_or(text).parse::<u16>(),
                Count => text.parse::<u16>(),
            };
            match n {
                Ok(n) if (min..=max).contains(&n) => {
                    self.value = n;
                    Ok(())
                }
                _ => Err(match self.spec {
                    Timeout => format!(
                        "Invalid duration; only {} to {} milliseconds are valid",
                        min, max
                    ),
                    Count => format!("Invalid count; only {} to {} are valid", min, max),
                }),
            }
        }
    }

    pub(super) const GLOBALS: [GlobalProp; globals::COUNT] = [
        GlobalProp {
            index: globals::TAPPING_TERM,
            spec: Timeout,
            value: globals::TAPPING_TERM_DEFAULT,
        },
        GlobalProp {
            index: globals::TAP_TOGGLE_COUNT,
            spec: Count,
            value: globals::TAP_TOGGLE_COUNT_DEFAULT,
        },
        GlobalProp {
            index: globals::TAP_TOGGLE_TERM,
            spec: Timeout,
            value: globals::TAP_TOGGLE_TERM_DEFAULT,
        },
    ];
}

pub const INDEX_TO_NAME: [&str; globals::COUNT] =
    ["tapping_term", "tap_toggle_count", "tap_toggle_term"];

lazy_static! {
    pub static ref DEFAULTS: HashMap<&'static str, spec::GlobalProp> = {
        let mut m = HashMap::new();
        for (k, v) in INDEX_TO_NAME.iter().zip(spec::GLOBALS.iter()) {
            m.insert(*k, *v);
        }
        m
    };
}

#[cfg(test)]
#[path = "globals_test.rs"]
mod test;
