/// Sinks de rendu live pour glyphcast.

pub mod term;

pub use term::TerminalSink;
