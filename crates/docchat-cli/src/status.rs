// Terminal rendering of pipeline and turn phases

use docchat_core::status::{Phase, StatusSink};

/// Prints phase transitions to the terminal
pub struct CliStatusSink;

impl StatusSink for CliStatusSink {
    fn update(&self, phase: Phase, label: &str) {
        match phase {
            Phase::Error => eprintln!("  !! {label}"),
            Phase::Complete => println!("  ok {label}"),
            _ => println!("  .. {label}"),
        }
    }
}
