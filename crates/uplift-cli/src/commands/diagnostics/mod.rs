//! Diagnostic commands

mod checks;
mod doctor;
mod types;

pub use doctor::doctor;
