//! Sinks d'export côté application : dump texte, replay terminal, et
//! fanout vers plusieurs sinks sur le même buffer de frames.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};

use gc_core::clock::{Clock, PlaybackClock, SystemClock};
use gc_core::frame::RenderedFrame;
use gc_core::traits::{ExportSettings, ExportSink, RenderSink};
use gc_render::TerminalSink;

/// Écrit les frames en texte brut : en-tête descriptif puis chaque frame
/// séparée par une règle de '='.
pub struct TextDump {
    output: PathBuf,
    source_label: String,
    width: u32,
    quality: String,
    color: bool,
}

impl TextDump {
    #[must_use]
    pub fn new(
        output: PathBuf,
        source_label: String,
        width: u32,
        quality: String,
        color: bool,
    ) -> Self {
        Self {
            output,
            source_label,
            width,
            quality,
            color,
        }
    }
}

impl ExportSink for TextDump {
    fn consume(&mut self, frames: &[RenderedFrame], _settings: &ExportSettings) -> Result<()> {
        let file = std::fs::File::create(&self.output)
            .with_context(|| format!("Création du dump texte {}", self.output.display()))?;
        let mut out = std::io::BufWriter::new(file);

        writeln!(out, "Video: {}", self.source_label)?;
        writeln!(out, "Dimensions: {} chars wide", self.width)?;
        writeln!(out, "Quality: {}", self.quality)?;
        writeln!(out, "Color: {}", if self.color { "Yes" } else { "No" })?;
        writeln!(out, "{}\n", "=".repeat(50))?;

        let rule = "=".repeat(self.width as usize);
        for (i, frame) in frames.iter().enumerate() {
            writeln!(out, "Frame {}:", i + 1)?;
            out.write_all(frame.to_plain_text().as_bytes())?;
            writeln!(out, "{rule}\n")?;
        }
        out.flush()?;
        log::info!(
            "{} frames écrites dans {}",
            frames.len(),
            self.output.display()
        );
        Ok(())
    }
}

/// Rejoue le buffer de frames dans le terminal avec pacing wall-clock.
///
/// Même contrat que la lecture live : les frames en retard partent
/// immédiatement, l'annulation interrompt entre deux frames.
pub struct TerminalReplay {
    cancel: Arc<AtomicBool>,
}

impl TerminalReplay {
    #[must_use]
    pub fn new(cancel: Arc<AtomicBool>) -> Self {
        Self { cancel }
    }
}

impl ExportSink for TerminalReplay {
    fn consume(&mut self, frames: &[RenderedFrame], settings: &ExportSettings) -> Result<()> {
        let clock = SystemClock::new();
        let mut playback = PlaybackClock::new(settings.fps);
        playback.prime(clock.now());

        let mut sink = TerminalSink::new(std::io::stdout()).context("Ouverture du terminal")?;
        for (i, frame) in frames.iter().enumerate() {
            if self.cancel.load(Ordering::Relaxed) {
                log::info!("Replay interrompu à la frame {i}");
                break;
            }
            // Frames en retard : présentation immédiate, sans re-freinage.
            wait_until(&clock, &self.cancel, playback.target_for(i as u64));
            sink.present(frame)?;
        }
        sink.finish()?;
        Ok(())
    }
}

/// Attend l'instant cible par tranches de 15 ms, interruptible par le
/// flag d'annulation. Un résidu flottant sous la nanoseconde compte
/// comme atteint — un sleep de durée nulle ne ferait pas avancer une
/// horloge virtuelle.
fn wait_until<C: Clock>(clock: &C, cancel: &AtomicBool, target: f64) {
    while !cancel.load(Ordering::Relaxed) {
        let remaining = target - clock.now();
        if remaining < 1e-9 {
            return;
        }
        clock.sleep(Duration::from_secs_f64(remaining.min(0.015)));
    }
}

/// Distribue le même buffer à plusieurs sinks d'export. Tous les sinks
/// sont tentés même si l'un échoue ; la première erreur est remontée.
pub struct FanoutExport {
    sinks: Vec<Box<dyn ExportSink>>,
}

impl FanoutExport {
    #[must_use]
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn push(&mut self, sink: Box<dyn ExportSink>) {
        self.sinks.push(sink);
    }
}

impl Default for FanoutExport {
    fn default() -> Self {
        Self::new()
    }
}

impl ExportSink for FanoutExport {
    fn consume(&mut self, frames: &[RenderedFrame], settings: &ExportSettings) -> Result<()> {
        let mut first_error = None;
        for sink in &mut self.sinks {
            if let Err(e) = sink.consume(frames, settings) {
                log::error!("Sink d'export en échec : {e:#}");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gc_core::frame::Cell;

    fn frame_of(glyph: char, cols: usize, index: u64) -> RenderedFrame {
        let cell = Cell {
            glyph,
            ..Cell::default()
        };
        RenderedFrame {
            rows: vec![vec![cell; cols]; 2],
            index,
            pts: 0.0,
        }
    }

    fn settings() -> ExportSettings {
        ExportSettings {
            fps: 30.0,
            background: (0, 0, 0),
            audio: None,
        }
    }

    #[test]
    fn replay_wait_terminates_on_fractional_target() {
        let clock = gc_core::clock::VirtualClock::new();
        let cancel = AtomicBool::new(false);
        wait_until(&clock, &cancel, 0.1);
        assert!((clock.now() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn replay_wait_honors_cancellation() {
        let clock = gc_core::clock::VirtualClock::new();
        let cancel = AtomicBool::new(true);
        wait_until(&clock, &cancel, 10.0);
        assert!(clock.now() < 10.0, "annulation ignorée pendant l'attente");
    }

    #[test]
    fn text_dump_header_and_rules() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dump.txt");
        let mut dump = TextDump::new(
            path.clone(),
            "clip.mp4".to_string(),
            4,
            "low".to_string(),
            false,
        );
        dump.consume(&[frame_of('@', 4, 0), frame_of('.', 4, 1)], &settings())
            .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("Video: clip.mp4\n"));
        assert!(text.contains("Quality: low"));
        assert!(text.contains("Frame 1:\n@@@@\n@@@@\n====\n"));
        assert!(text.contains("Frame 2:\n....\n....\n====\n"));
    }

    #[test]
    fn fanout_tries_every_sink_and_reports_first_error() {
        struct Failing;
        impl ExportSink for Failing {
            fn consume(&mut self, _: &[RenderedFrame], _: &ExportSettings) -> Result<()> {
                anyhow::bail!("boom")
            }
        }
        struct Counting(Arc<AtomicBool>);
        impl ExportSink for Counting {
            fn consume(&mut self, _: &[RenderedFrame], _: &ExportSettings) -> Result<()> {
                self.0.store(true, Ordering::Relaxed);
                Ok(())
            }
        }

        let reached = Arc::new(AtomicBool::new(false));
        let mut fanout = FanoutExport::new();
        fanout.push(Box::new(Failing));
        fanout.push(Box::new(Counting(Arc::clone(&reached))));

        let err = fanout
            .consume(&[frame_of('x', 2, 0)], &settings())
            .unwrap_err();
        assert!(err.to_string().contains("boom"));
        assert!(reached.load(Ordering::Relaxed), "le second sink doit tourner");
    }
}
