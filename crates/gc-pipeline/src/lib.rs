/// Pipeline frame → glyphes de glyphcast.
///
/// Quatre étages purs reliés par des valeurs intermédiaires immuables
/// (enhance → resize → map → render), pilotés par le scheduler qui
/// possède le contrat de pacing lecture/export.

pub mod enhance;
pub mod map;
pub mod render;
pub mod resize;
pub mod scheduler;

pub use scheduler::{RunReport, Scheduler, SchedulerState};
