use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use clap::Parser;

use gc_core::clock::SystemClock;
use gc_core::traits::{AudioTrack, ExportSettings, FrameSource};
use gc_pipeline::Scheduler;
use gc_render::TerminalSink;
use gc_source::VideoFileSource;

pub mod cli;
pub mod sinks;

fn main() -> Result<()> {
    // 1. Parser CLI
    let cli = cli::Cli::parse();

    // 2. Initialiser le logging
    env_logger::Builder::new()
        .filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Warn))
        .init();

    if !cli.video.exists() {
        anyhow::bail!("Fichier vidéo introuvable : {}", cli.video.display());
    }

    // 3. Charger la config et appliquer les overrides CLI
    let config = cli.resolve_config()?;

    // 4. Annulation Ctrl+C : le flag est relu par le scheduler une fois
    // par frame, la frame en vol est toujours complétée.
    let cancel = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&cancel);
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::Relaxed);
    })
    .context("Installation du handler Ctrl+C")?;

    // 5. Ouvrir la source (ffmpeg subprocess, seek sur la fenêtre)
    let mut source = VideoFileSource::open(&cli.video, config.segment)
        .with_context(|| format!("Ouverture de {}", cli.video.display()))?;

    // 6. Scheduler — la validation de config se joue ici, avant toute frame
    let mut scheduler = Scheduler::new(config.clone(), SystemClock::new(), Arc::clone(&cancel))?;

    // 7. Dispatch du mode. Lecture seule → streaming direct ; dès qu'une
    // sortie fichier est demandée, on bufferise et on fanout (le replay
    // terminal rejoue le buffer, comme l'outil historique).
    let wants_play = !cli.no_play;
    let wants_export = cli.output.is_some() || cli.save_video.is_some();

    if !wants_export {
        if !wants_play {
            log::warn!("Ni lecture ni export demandés, rien à faire.");
            return Ok(());
        }
        let mut sink = TerminalSink::new(std::io::stdout()).context("Ouverture du terminal")?;
        let report = scheduler.run_live(&mut source, &mut sink)?;
        drop(sink);
        print_report(&report);
        return Ok(());
    }

    let mut fanout = sinks::FanoutExport::new();
    if let Some(output) = cli.output.clone() {
        fanout.push(Box::new(sinks::TextDump::new(
            output,
            cli.video.display().to_string(),
            config.width,
            config.quality.clone(),
            config.color,
        )));
    }
    if let Some(save_video) = cli.save_video.clone() {
        fanout.push(Box::new(gc_export::VideoExporter::new(save_video)));
    }
    if wants_play {
        fanout.push(Box::new(sinks::TerminalReplay::new(Arc::clone(&cancel))));
    }

    // L'audio n'a de sens que pour la sortie MP4.
    let audio = (config.include_audio && cli.save_video.is_some()).then(|| AudioTrack {
        source: cli.video.clone(),
        window: config.segment,
    });
    let settings = ExportSettings {
        fps: source.fps() / f64::from(config.skip),
        background: config.background_rgb()?,
        audio,
    };

    let report = scheduler.run_export(&mut source, &mut fanout, &settings)?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &gc_pipeline::RunReport) {
    log::info!(
        "Bilan : {} frames reçues, {} rendues, {} sautées, {} échecs de décodage{}",
        report.frames_in,
        report.frames_rendered,
        report.frames_skipped,
        report.decode_failures,
        if report.cancelled { " (annulé)" } else { "" }
    );
}
