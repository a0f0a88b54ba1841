//! Diagnostics sink passed into the resolver and pruner.
//!
//! Nothing in the pipeline prints directly. Callers hand in a sink: the CLI
//! uses [`ConsoleDiagnostics`], tests use [`RecordingDiagnostics`] and assert
//! on what was reported.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// A pipeline phase is starting.
    Step,
    /// Something the user should look at. Never fatal.
    Warn,
    /// Low-level detail (missing firmware, collisions, fast path taken).
    Note,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub level: Level,
    pub message: String,
}

pub trait Diagnostics {
    fn emit(&mut self, level: Level, message: String);

    fn step(&mut self, message: &str) {
        self.emit(Level::Step, message.to_string());
    }

    fn warn(&mut self, message: &str) {
        self.emit(Level::Warn, message.to_string());
    }

    fn note(&mut self, message: &str) {
        self.emit(Level::Note, message.to_string());
    }
}

/// Prints to the terminal in the same shape as the rest of the build output.
#[derive(Debug, Default)]
pub struct ConsoleDiagnostics {
    verbose: bool,
}

impl ConsoleDiagnostics {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl Diagnostics for ConsoleDiagnostics {
    fn emit(&mut self, level: Level, message: String) {
        match level {
            Level::Step => println!("{}...", message),
            Level::Warn => eprintln!("  Warning: {}", message),
            Level::Note if self.verbose => println!("  {}", message),
            Level::Note => {}
        }
    }
}

/// Keeps every entry in memory.
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    pub entries: Vec<Diagnostic>,
}

impl RecordingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warnings(&self) -> Vec<&str> {
        self.messages(Level::Warn)
    }

    pub fn notes(&self) -> Vec<&str> {
        self.messages(Level::Note)
    }

    fn messages(&self, level: Level) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|d| d.level == level)
            .map(|d| d.message.as_str())
            .collect()
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn emit(&mut self, level: Level, message: String) {
        self.entries.push(Diagnostic { level, message });
    }
}
