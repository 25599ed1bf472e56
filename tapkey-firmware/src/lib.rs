#![no_std]
pub mod binder;
pub mod binding;
pub mod dual_action;
pub mod dual_symbol;
pub mod gesture;
pub mod key_scanner;
pub mod keymap;
pub mod layers;
pub mod mapper;
pub mod modifiers;
pub mod tap_toggle;

#[macro_use]
mod macros;

#[cfg(test)]
#[path = "lib_test.rs"]
mod test;
