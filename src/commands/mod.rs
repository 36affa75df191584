// ABOUTME: Command implementations exposed by the CLI
// ABOUTME: Exports the probe command and its options

pub mod probe;

pub use probe::{probe, ProbeOptions, ProbeStage};
