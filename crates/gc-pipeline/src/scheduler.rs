//! Scheduler de lecture/export : la machine à états qui possède le
//! contrat de pacing.
//!
//! `Idle → Priming → Streaming → {Draining, Aborted} → Idle`
//!
//! En mode live le pacing cale chaque frame sur l'horloge injectée ; les
//! frames en retard ne sont jamais jetées ni re-freinées — l'ordre de
//! lecture prime sur la fidélité temps-réel stricte. En mode export le
//! scheduler tourne à plein débit et tague chaque frame de son
//! presentation timestamp.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use gc_core::clock::{Clock, PlaybackClock};
use gc_core::config::{RunConfig, SegmentWindow, SkipCounter};
use gc_core::error::{ConfigError, RunError};
use gc_core::frame::RenderedFrame;
use gc_core::quality::{GlyphLut, QualityProfile};
use gc_core::traits::{ExportSettings, ExportSink, FrameSource, RenderSink, SourcePull};

use crate::enhance::enhance;
use crate::map::map_cells;
use crate::render::compose;
use crate::resize::Resizer;

/// Échecs de décodage consécutifs tolérés avant promotion en abort.
const MAX_CONSECUTIVE_DECODE_FAILURES: u32 = 3;

/// Granularité max d'un sleep de pacing — borne la latence de réaction
/// à une annulation pendant l'attente.
const PACE_SLICE: Duration = Duration::from_millis(15);

/// États du scheduler. Les transitions sont pilotées exclusivement par
/// `run_live` / `run_export`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerState {
    /// Aucun run actif.
    Idle,
    /// Paramètres dérivés calculés, horloge remise à zéro.
    Priming,
    /// Boucle de frames active.
    Streaming,
    /// Flush des frames bufferisées / marqueur de complétion.
    Draining,
    /// Échec sink ou source corrompue ; sortie partielle préservée.
    Aborted,
}

/// Bilan d'un run, pour le logging et les tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct RunReport {
    /// Frames reçues de la source (éligibles ou non).
    pub frames_in: u64,
    /// Frames passées par le pipeline et remises au sink/buffer.
    pub frames_rendered: u64,
    /// Frames éligibles écartées par le skip.
    pub frames_skipped: u64,
    /// Frames illisibles ignorées (non consécutives au point d'abort).
    pub decode_failures: u64,
    /// True si le run s'est terminé par annulation.
    pub cancelled: bool,
}

/// Le scheduler. Générique sur l'horloge pour que le pacing et
/// l'annulation se testent sans délais réels.
pub struct Scheduler<C: Clock> {
    config: RunConfig,
    profile: QualityProfile,
    lut: GlyphLut,
    window: SegmentWindow,
    skip: SkipCounter,
    resizer: Resizer,
    clock: C,
    cancel: Arc<AtomicBool>,
    state: SchedulerState,
}

impl<C: Clock> Scheduler<C> {
    /// Construit un scheduler. La configuration est validée ici — un run
    /// invalide ne démarre jamais (aucune frame traitée).
    ///
    /// # Errors
    /// `ConfigError` pour toute valeur hors contrat (largeur 0, qualité
    /// inconnue, durée négative, skip 0).
    pub fn new(config: RunConfig, clock: C, cancel: Arc<AtomicBool>) -> Result<Self, ConfigError> {
        config.validate()?;
        let profile = config.profile()?;
        let lut = GlyphLut::new(&profile);
        let skip = SkipCounter::new(config.skip)?;
        Ok(Self {
            window: config.segment,
            config,
            profile,
            lut,
            skip,
            resizer: Resizer::new(),
            clock,
            cancel,
            state: SchedulerState::Idle,
        })
    }

    /// État courant (exposé pour les tests de la machine à états).
    #[must_use]
    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Run en mode live : chaque frame est calée sur l'horloge puis
    /// remise au sink. Les frames lentes à produire partent immédiatement.
    ///
    /// # Errors
    /// `RunError` en cas d'échec sink, de source corrompue, ou d'échec
    /// fatal de la source.
    pub fn run_live<S: FrameSource + ?Sized, K: RenderSink + ?Sized>(
        &mut self,
        source: &mut S,
        sink: &mut K,
    ) -> Result<RunReport, RunError> {
        self.state = SchedulerState::Priming;
        let fps = effective_fps(source.fps(), self.skip.every());
        let mut playback = PlaybackClock::new(fps);
        playback.prime(self.clock.now());
        log::info!(
            "Lecture live : {:.2} fps effectifs (source {:.2}, skip {})",
            fps,
            source.fps(),
            self.skip.every()
        );

        let mut report = RunReport::default();
        self.state = SchedulerState::Streaming;
        let mut consecutive_failures = 0u32;
        let mut eligible_ordinal = 0u64;

        let stream_result: Result<(), RunError> = loop {
            // Annulation vérifiée une fois par tour : la frame en vol
            // est toujours complétée avant d'être honorée.
            if self.cancel.load(Ordering::Relaxed) {
                report.cancelled = true;
                break Ok(());
            }

            let pulled = match self.pull_admitted(
                source,
                &mut report,
                &mut consecutive_failures,
                &mut eligible_ordinal,
            ) {
                Ok(p) => p,
                Err(e) => break Err(e),
            };
            let Some(frame) = pulled else {
                match self.state {
                    SchedulerState::Streaming => continue,
                    _ => break Ok(()),
                }
            };

            let index = playback.frame_index;
            let pts = index as f64 * playback.interval();
            let rendered = match self.process(frame, index, pts) {
                Ok(r) => r,
                Err(e) => break Err(e),
            };

            // Pacing : uniquement les frames prêtes en avance.
            self.pace_until(playback.target_for(index));

            if let Err(e) = sink.present(&rendered) {
                log::error!("Sink live en échec à la frame {index}: {e}");
                break Err(RunError::Sink {
                    frame: index,
                    source: e,
                });
            }
            playback.frame_index += 1;
            report.frames_rendered += 1;
        };

        // Draining sur fin de flux (marqueur de complétion) ; un abort
        // garde sa sortie partielle déjà présentée. Dans les deux cas la
        // machine revient à Idle avant de rendre la main.
        if stream_result.is_ok() {
            self.state = SchedulerState::Draining;
            if let Err(e) = sink.finish() {
                log::warn!("Marqueur de complétion refusé par le sink : {e}");
            }
        } else {
            self.state = SchedulerState::Aborted;
        }
        self.state = SchedulerState::Idle;
        stream_result?;
        log::info!(
            "Run live terminé : {} reçues, {} rendues, {} sautées",
            report.frames_in,
            report.frames_rendered,
            report.frames_skipped
        );
        Ok(report)
    }

    /// Run en mode export : plein débit, frames bufferisées avec leur
    /// presentation timestamp puis remises en bloc au sink d'export.
    ///
    /// Sur abort, le buffer partiel est finalisé en best-effort — un
    /// fichier tronqué mais valide plutôt qu'une sortie corrompue.
    ///
    /// # Errors
    /// `RunError` en cas de source corrompue ou d'échec de l'encodage.
    pub fn run_export<S: FrameSource + ?Sized, K: ExportSink + ?Sized>(
        &mut self,
        source: &mut S,
        sink: &mut K,
        settings: &ExportSettings,
    ) -> Result<RunReport, RunError> {
        self.state = SchedulerState::Priming;
        let fps = effective_fps(source.fps(), self.skip.every());
        let frame_duration = 1.0 / fps;
        log::info!("Export : {fps:.2} fps de sortie");

        let mut report = RunReport::default();
        let mut buffer: Vec<RenderedFrame> = Vec::new();
        self.state = SchedulerState::Streaming;
        let mut consecutive_failures = 0u32;
        let mut eligible_ordinal = 0u64;
        let mut out_index = 0u64;

        let stream_result: Result<(), RunError> = loop {
            if self.cancel.load(Ordering::Relaxed) {
                report.cancelled = true;
                break Ok(());
            }

            let pulled = match self.pull_admitted(
                source,
                &mut report,
                &mut consecutive_failures,
                &mut eligible_ordinal,
            ) {
                Ok(p) => p,
                Err(e) => break Err(e),
            };
            let Some(frame) = pulled else {
                match self.state {
                    SchedulerState::Streaming => continue,
                    _ => break Ok(()),
                }
            };

            let pts = out_index as f64 * frame_duration;
            let rendered = match self.process(frame, out_index, pts) {
                Ok(r) => r,
                Err(e) => break Err(e),
            };
            // Append atomique : la frame entière ou rien, jamais déchirée.
            buffer.push(rendered);
            out_index += 1;
            report.frames_rendered += 1;
        };

        // Draining — y compris sur abort : le buffer partiel produit une
        // sortie tronquée mais valide.
        self.state = if stream_result.is_ok() {
            SchedulerState::Draining
        } else {
            SchedulerState::Aborted
        };
        let settings = ExportSettings {
            fps,
            ..settings.clone()
        };
        let drain_result = if buffer.is_empty() {
            log::warn!("Export : aucune frame à encoder.");
            Ok(())
        } else {
            sink.consume(&buffer, &settings)
        };

        self.state = SchedulerState::Idle;
        stream_result?;
        drain_result.map_err(|e| RunError::Export(e.to_string()))?;
        log::info!(
            "Export terminé : {} reçues, {} encodées, {} sautées",
            report.frames_in,
            report.frames_rendered,
            report.frames_skipped
        );
        Ok(report)
    }

    /// Tire la prochaine frame admise dans le pipeline.
    ///
    /// `Ok(None)` avec `state == Streaming` : frame écartée (fenêtre ou
    /// skip), continuer. `Ok(None)` avec `state == Draining` : fin de
    /// flux ou fenêtre dépassée.
    fn pull_admitted<S: FrameSource + ?Sized>(
        &mut self,
        source: &mut S,
        report: &mut RunReport,
        consecutive_failures: &mut u32,
        eligible_ordinal: &mut u64,
    ) -> Result<Option<gc_core::frame::SourceFrame>, RunError> {
        match source.next_frame() {
            Err(e) => {
                self.state = SchedulerState::Aborted;
                Err(RunError::Source {
                    frame: report.frames_in,
                    message: e.to_string(),
                })
            }
            Ok(SourcePull::End) => {
                self.state = SchedulerState::Draining;
                Ok(None)
            }
            Ok(SourcePull::Corrupt) => {
                *consecutive_failures += 1;
                report.decode_failures += 1;
                log::warn!(
                    "Frame {} illisible ({} échec(s) consécutif(s))",
                    report.frames_in,
                    consecutive_failures
                );
                if *consecutive_failures >= MAX_CONSECUTIVE_DECODE_FAILURES {
                    self.state = SchedulerState::Aborted;
                    return Err(RunError::CorruptSource {
                        frame: report.frames_in,
                        failures: *consecutive_failures,
                    });
                }
                report.frames_in += 1;
                Ok(None)
            }
            Ok(SourcePull::Frame(frame)) => {
                *consecutive_failures = 0;
                report.frames_in += 1;
                if self.window.is_past_end(frame.timestamp) {
                    // Plus rien d'éligible ne viendra.
                    self.state = SchedulerState::Draining;
                    return Ok(None);
                }
                if !self.window.contains(frame.timestamp) {
                    return Ok(None);
                }
                let ordinal = *eligible_ordinal;
                *eligible_ordinal += 1;
                if !self.skip.admits(ordinal) {
                    report.frames_skipped += 1;
                    return Ok(None);
                }
                Ok(Some(frame))
            }
        }
    }

    /// Les quatre étages : enhance → resize → map → render.
    fn process(
        &mut self,
        frame: gc_core::frame::SourceFrame,
        out_index: u64,
        pts: f64,
    ) -> Result<RenderedFrame, RunError> {
        let enhanced = enhance(&frame.grid, &self.config.enhance);
        let resized = self
            .resizer
            .resize(&enhanced, self.config.width, &self.profile)
            .map_err(|e| {
                self.state = SchedulerState::Aborted;
                RunError::Pipeline {
                    frame: frame.index,
                    message: e.to_string(),
                }
            })?;
        let cells = map_cells(&resized, &self.lut, self.config.color);
        Ok(compose(cells, out_index, pts))
    }

    /// Attend l'instant cible par tranches interruptibles. Retourne
    /// immédiatement si la cible est déjà passée (frame en retard).
    fn pace_until(&self, target: f64) {
        loop {
            if self.cancel.load(Ordering::Relaxed) {
                return;
            }
            let now = self.clock.now();
            // Résidu flottant sous la nanoseconde : cible atteinte. Un
            // sleep de durée nulle n'avancerait jamais une horloge
            // virtuelle et la boucle ne terminerait pas.
            if target - now < 1e-9 {
                return;
            }
            let remaining = Duration::from_secs_f64(target - now);
            self.clock.sleep(remaining.min(PACE_SLICE));
        }
    }
}

/// FPS de sortie : fps source divisé par le pas de skip.
fn effective_fps(source_fps: f64, skip: u32) -> f64 {
    let fps = if source_fps > 0.0 { source_fps } else { 1.0 };
    fps / f64::from(skip.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gc_core::clock::VirtualClock;
    use gc_core::error::SinkError;
    use gc_core::frame::{PixelGrid, SourceFrame};

    /// Source scriptée : rejoue une liste de pulls.
    struct ScriptedSource {
        pulls: Vec<ScriptedPull>,
        pos: usize,
        fps: f64,
    }

    enum ScriptedPull {
        Gray(u8),
        Corrupt,
    }

    impl ScriptedSource {
        fn gray_frames(count: u64, fps: f64) -> Self {
            Self {
                pulls: (0..count).map(|_| ScriptedPull::Gray(128)).collect(),
                pos: 0,
                fps,
            }
        }

        fn from_pulls(pulls: Vec<ScriptedPull>, fps: f64) -> Self {
            Self { pulls, pos: 0, fps }
        }
    }

    impl FrameSource for ScriptedSource {
        fn next_frame(&mut self) -> anyhow::Result<SourcePull> {
            let Some(pull) = self.pulls.get(self.pos) else {
                return Ok(SourcePull::End);
            };
            let index = self.pos as u64;
            self.pos += 1;
            match pull {
                ScriptedPull::Corrupt => Ok(SourcePull::Corrupt),
                ScriptedPull::Gray(v) => {
                    let mut grid = PixelGrid::new(10, 10);
                    grid.data.fill(*v);
                    Ok(SourcePull::Frame(SourceFrame {
                        grid,
                        index,
                        timestamp: index as f64 / self.fps,
                    }))
                }
            }
        }

        fn fps(&self) -> f64 {
            self.fps
        }

        fn native_size(&self) -> (u32, u32) {
            (10, 10)
        }
    }

    /// Sink live qui enregistre (index, instant de présentation).
    struct CollectSink {
        presented: Vec<(u64, f64)>,
        last: Option<RenderedFrame>,
        clock: Arc<VirtualClock>,
        finished: bool,
        /// Latence simulée du sink (avance l'horloge virtuelle).
        latency: f64,
        /// Annule le run après N frames présentées.
        cancel_after: Option<(usize, Arc<AtomicBool>)>,
        /// Échoue à la frame d'index donné.
        fail_at: Option<u64>,
    }

    impl CollectSink {
        fn new(clock: Arc<VirtualClock>) -> Self {
            Self {
                presented: Vec::new(),
                last: None,
                clock,
                finished: false,
                latency: 0.0,
                cancel_after: None,
                fail_at: None,
            }
        }
    }

    impl RenderSink for CollectSink {
        fn present(&mut self, frame: &RenderedFrame) -> Result<(), SinkError> {
            if self.fail_at == Some(frame.index) {
                return Err(SinkError::from(std::io::Error::other("pipe closed")));
            }
            assert_eq!(frame.width(), 5, "frame partielle observée au sink");
            self.presented.push((frame.index, self.clock.now()));
            self.last = Some(frame.clone());
            if self.latency > 0.0 {
                self.clock.advance(self.latency);
            }
            if let Some((n, cancel)) = &self.cancel_after
                && self.presented.len() >= *n
            {
                cancel.store(true, Ordering::Relaxed);
            }
            Ok(())
        }

        fn finish(&mut self) -> Result<(), SinkError> {
            self.finished = true;
            Ok(())
        }
    }

    /// Sink d'export qui capture le buffer finalisé.
    struct CollectExport {
        frames: Vec<(u64, f64)>,
        fps: f64,
        calls: u32,
    }

    impl CollectExport {
        fn new() -> Self {
            Self {
                frames: Vec::new(),
                fps: 0.0,
                calls: 0,
            }
        }
    }

    impl ExportSink for CollectExport {
        fn consume(
            &mut self,
            frames: &[RenderedFrame],
            settings: &ExportSettings,
        ) -> anyhow::Result<()> {
            self.calls += 1;
            self.fps = settings.fps;
            self.frames
                .extend(frames.iter().map(|f| (f.index, f.pts)));
            Ok(())
        }
    }

    fn config(width: u32) -> RunConfig {
        RunConfig {
            width,
            quality: "low".to_string(),
            enhance: gc_core::config::EnhanceSettings::neutral(),
            ..RunConfig::default()
        }
    }

    fn scheduler(config: RunConfig) -> (Scheduler<Arc<VirtualClock>>, Arc<VirtualClock>) {
        let clock = Arc::new(VirtualClock::new());
        let cancel = Arc::new(AtomicBool::new(false));
        let s = Scheduler::new(config, Arc::clone(&clock), cancel).unwrap();
        (s, clock)
    }

    #[test]
    fn zero_width_rejected_before_any_frame() {
        let clock = Arc::new(VirtualClock::new());
        let cancel = Arc::new(AtomicBool::new(false));
        let err = Scheduler::new(config(0), clock, cancel).err();
        assert!(matches!(err, Some(ConfigError::InvalidWidth(0))));
    }

    #[test]
    fn live_emits_in_source_order_despite_latency() {
        let (mut s, clock) = scheduler(config(5));
        let mut source = ScriptedSource::gray_frames(8, 10.0);
        let mut sink = CollectSink::new(Arc::clone(&clock));
        // Latence sink > intervalle : frames toujours en retard.
        sink.latency = 0.25;
        let report = s.run_live(&mut source, &mut sink).unwrap();
        assert_eq!(report.frames_rendered, 8);
        let indexes: Vec<u64> = sink.presented.iter().map(|(i, _)| *i).collect();
        assert_eq!(indexes, vec![0, 1, 2, 3, 4, 5, 6, 7]);
        assert!(sink.finished);
        assert_eq!(s.state(), SchedulerState::Idle);
    }

    #[test]
    fn pacing_terminates_on_fractional_targets() {
        // 0.1 n'est pas représentable exactement en f64 : l'accumulation
        // de tranches laisse un résidu sous la nanoseconde qui tronquait
        // le sleep à zéro — l'horloge virtuelle n'avançait plus.
        let (s, clock) = scheduler(config(5));
        s.pace_until(0.1);
        assert!((clock.now() - 0.1).abs() < 1e-6);

        // Cible déjà passée : retour immédiat, le temps ne bouge pas.
        let before = clock.now();
        s.pace_until(0.05);
        assert!((clock.now() - before).abs() < 1e-12);
    }

    #[test]
    fn live_paces_frames_that_are_ready_early() {
        let (mut s, clock) = scheduler(config(5));
        let mut source = ScriptedSource::gray_frames(4, 10.0);
        let mut sink = CollectSink::new(Arc::clone(&clock));
        s.run_live(&mut source, &mut sink).unwrap();
        for (index, at) in &sink.presented {
            let target = *index as f64 * 0.1;
            assert!(
                *at >= target - 1e-9,
                "frame {index} présentée à {at} avant sa cible {target}"
            );
        }
    }

    #[test]
    fn late_frames_are_not_throttled_further() {
        let (mut s, clock) = scheduler(config(5));
        let mut source = ScriptedSource::gray_frames(3, 10.0);
        let mut sink = CollectSink::new(Arc::clone(&clock));
        sink.latency = 0.5; // 5× l'intervalle
        s.run_live(&mut source, &mut sink).unwrap();
        // Chaque frame en retard part dès qu'elle est prête : l'instant de
        // présentation colle à la latence cumulée, sans attente ajoutée.
        for (i, (_, at)) in sink.presented.iter().enumerate() {
            let produced_at = i as f64 * 0.5;
            assert!((at - produced_at).abs() < 1e-9, "frame {i} re-freinée");
        }
    }

    #[test]
    fn skip_processes_every_nth_eligible_frame() {
        let mut cfg = config(5);
        cfg.skip = 3;
        let (mut s, clock) = scheduler(cfg);
        let mut source = ScriptedSource::gray_frames(10, 10.0);
        let mut sink = CollectSink::new(Arc::clone(&clock));
        let report = s.run_live(&mut source, &mut sink).unwrap();
        // Ordinaux éligibles 0,3,6,9 → 4 frames rendues.
        assert_eq!(report.frames_rendered, 4);
        assert_eq!(report.frames_skipped, 6);
    }

    #[test]
    fn segment_window_gates_admission() {
        let mut cfg = config(5);
        cfg.segment = SegmentWindow {
            start: 0.2,
            duration: Some(0.3),
        };
        let (mut s, clock) = scheduler(cfg);
        // 10 fps → timestamps 0.0, 0.1, …, 0.9 ; fenêtre [0.2, 0.5).
        let mut source = ScriptedSource::gray_frames(10, 10.0);
        let mut sink = CollectSink::new(Arc::clone(&clock));
        let report = s.run_live(&mut source, &mut sink).unwrap();
        assert_eq!(report.frames_rendered, 3); // 0.2, 0.3, 0.4
        // Le flux s'arrête dès le dépassement de fenêtre.
        assert_eq!(report.frames_in, 6);
    }

    #[test]
    fn cancellation_completes_in_flight_frame() {
        let clock = Arc::new(VirtualClock::new());
        let cancel = Arc::new(AtomicBool::new(false));
        let mut s = Scheduler::new(config(5), Arc::clone(&clock), Arc::clone(&cancel)).unwrap();
        let mut source = ScriptedSource::gray_frames(10, 10.0);
        let mut sink = CollectSink::new(Arc::clone(&clock));
        sink.cancel_after = Some((3, Arc::clone(&cancel)));
        let report = s.run_live(&mut source, &mut sink).unwrap();
        assert!(report.cancelled);
        // La 3e frame (qui a posé le flag) a été présentée entière ;
        // aucune frame supplémentaire après.
        assert_eq!(sink.presented.len(), 3);
        assert!(sink.finished);
    }

    #[test]
    fn sink_failure_aborts_with_frame_index() {
        let (mut s, clock) = scheduler(config(5));
        let mut source = ScriptedSource::gray_frames(10, 10.0);
        let mut sink = CollectSink::new(Arc::clone(&clock));
        sink.fail_at = Some(2);
        let err = s.run_live(&mut source, &mut sink).unwrap_err();
        assert!(matches!(err, RunError::Sink { frame: 2, .. }));
        assert_eq!(sink.presented.len(), 2);
        // Aborted → Idle : la machine est réutilisable après l'échec.
        assert_eq!(s.state(), SchedulerState::Idle);
    }

    #[test]
    fn isolated_decode_failures_are_skipped() {
        let (mut s, clock) = scheduler(config(5));
        let pulls = vec![
            ScriptedPull::Gray(128),
            ScriptedPull::Corrupt,
            ScriptedPull::Gray(128),
            ScriptedPull::Corrupt,
            ScriptedPull::Corrupt,
            ScriptedPull::Gray(128),
        ];
        let mut source = ScriptedSource::from_pulls(pulls, 10.0);
        let mut sink = CollectSink::new(Arc::clone(&clock));
        let report = s.run_live(&mut source, &mut sink).unwrap();
        assert_eq!(report.frames_rendered, 3);
        assert_eq!(report.decode_failures, 3);
    }

    #[test]
    fn three_consecutive_decode_failures_abort() {
        let (mut s, clock) = scheduler(config(5));
        let pulls = vec![
            ScriptedPull::Gray(128),
            ScriptedPull::Corrupt,
            ScriptedPull::Corrupt,
            ScriptedPull::Corrupt,
            ScriptedPull::Gray(128),
        ];
        let mut source = ScriptedSource::from_pulls(pulls, 10.0);
        let mut sink = CollectSink::new(Arc::clone(&clock));
        let err = s.run_live(&mut source, &mut sink).unwrap_err();
        assert!(matches!(err, RunError::CorruptSource { failures: 3, .. }));
        assert_eq!(s.state(), SchedulerState::Idle);
    }

    #[test]
    fn export_tags_monotonic_timestamps() {
        let mut cfg = config(5);
        cfg.skip = 2;
        let (mut s, _clock) = scheduler(cfg);
        let mut source = ScriptedSource::gray_frames(8, 20.0);
        let mut sink = CollectExport::new();
        let settings = ExportSettings {
            fps: 0.0, // recalculé par le scheduler
            background: (0, 0, 0),
            audio: None,
        };
        let report = s.run_export(&mut source, &mut sink, &settings).unwrap();
        assert_eq!(report.frames_rendered, 4);
        assert_eq!(sink.calls, 1);
        assert!((sink.fps - 10.0).abs() < 1e-9); // 20 / skip 2
        for (i, (index, pts)) in sink.frames.iter().enumerate() {
            assert_eq!(*index, i as u64);
            assert!((pts - i as f64 * 0.1).abs() < 1e-9);
        }
    }

    #[test]
    fn export_drains_partial_buffer_on_cancel() {
        let clock = Arc::new(VirtualClock::new());
        let cancel = Arc::new(AtomicBool::new(false));
        let mut cfg = config(5);
        cfg.enhance = gc_core::config::EnhanceSettings::neutral();
        let mut s = Scheduler::new(cfg, Arc::clone(&clock), Arc::clone(&cancel)).unwrap();

        /// Source qui annule le run après 3 frames remises.
        struct CancellingSource {
            inner: ScriptedSource,
            cancel: Arc<AtomicBool>,
        }
        impl FrameSource for CancellingSource {
            fn next_frame(&mut self) -> anyhow::Result<SourcePull> {
                if self.inner.pos == 3 {
                    self.cancel.store(true, Ordering::Relaxed);
                }
                self.inner.next_frame()
            }
            fn fps(&self) -> f64 {
                self.inner.fps()
            }
            fn native_size(&self) -> (u32, u32) {
                self.inner.native_size()
            }
        }

        let mut source = CancellingSource {
            inner: ScriptedSource::gray_frames(100, 10.0),
            cancel: Arc::clone(&cancel),
        };
        let mut sink = CollectExport::new();
        let settings = ExportSettings {
            fps: 0.0,
            background: (0, 0, 0),
            audio: None,
        };
        let report = s.run_export(&mut source, &mut sink, &settings).unwrap();
        assert!(report.cancelled);
        // Buffer partiel quand même remis au sink : sortie tronquée mais valide.
        assert_eq!(sink.calls, 1);
        assert_eq!(sink.frames.len(), 3);
    }

    #[test]
    fn mid_gray_renders_equals_glyph_end_to_end() {
        let (mut s, clock) = scheduler(config(5));
        let mut source = ScriptedSource::gray_frames(1, 10.0);
        let mut sink = CollectSink::new(Arc::clone(&clock));
        s.run_live(&mut source, &mut sink).unwrap();
        assert_eq!(sink.presented.len(), 1);
        let frame = sink.last.unwrap();
        for row in &frame.rows {
            for cell in row {
                assert_eq!(cell.glyph, '=');
            }
        }
    }
}
