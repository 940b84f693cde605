//! Export MP4 : rasterisation des frames de cellules en pixels, encodage
//! x264 via ffmpeg, puis muxage de la piste audio d'origine.

pub mod muxer;
pub mod rasterizer;

use std::path::PathBuf;

use anyhow::{Context, Result};

use gc_core::frame::RenderedFrame;
use gc_core::traits::{ExportSettings, ExportSink};

use crate::muxer::Mp4Encoder;
use crate::rasterizer::Rasterizer;

/// Taille de police par défaut pour la rasterisation, en pixels.
/// ~16 px donne des glyphes lisibles sans exploser la résolution de
/// sortie (80 colonnes ≈ 1280 px de large avec DejaVu Sans Mono).
pub const DEFAULT_FONT_PX: f32 = 16.0;

/// Sink d'export : reçoit la séquence finalisée de frames et produit un
/// MP4, avec la piste audio de la source muxée par-dessus si demandée.
pub struct VideoExporter {
    output: PathBuf,
    font_px: f32,
}

impl VideoExporter {
    #[must_use]
    pub fn new(output: PathBuf) -> Self {
        Self {
            output,
            font_px: DEFAULT_FONT_PX,
        }
    }

    #[must_use]
    pub fn with_font_px(mut self, font_px: f32) -> Self {
        self.font_px = font_px;
        self
    }

    fn encode_video(
        &self,
        frames: &[RenderedFrame],
        settings: &ExportSettings,
        video_out: &std::path::Path,
    ) -> Result<()> {
        let rasterizer = Rasterizer::new(self.font_px)?;
        let (cols, rows) = (frames[0].width(), frames[0].height());
        let (img_w, img_h) = rasterizer.image_dimensions(cols, rows);

        log::info!(
            "Export : {} frames de {cols}x{rows} cellules -> {img_w}x{img_h} px @ {:.3} fps",
            frames.len(),
            settings.fps
        );

        let mut encoder = Mp4Encoder::new(video_out, img_w, img_h, settings.fps)?;
        for frame in frames {
            let pixels = rasterizer.rasterize(frame, settings.background, img_w, img_h);
            encoder
                .write_frame(&pixels)
                .with_context(|| format!("Écriture de la frame {} vers ffmpeg", frame.index))?;
        }
        encoder.finish()
    }
}

impl ExportSink for VideoExporter {
    fn consume(&mut self, frames: &[RenderedFrame], settings: &ExportSettings) -> Result<()> {
        if frames.is_empty() {
            log::warn!("Export sans frame : aucun fichier produit");
            return Ok(());
        }

        // Encodage vidéo d'abord, vers un workdir si un mux audio suit,
        // sinon directement à destination.
        let Some(audio) = settings.audio.as_ref() else {
            return self.encode_video(frames, settings, &self.output);
        };

        let workdir = tempfile::tempdir().context("Création du répertoire de travail export")?;
        let silent_video = workdir.path().join("video_silent.mp4");
        self.encode_video(frames, settings, &silent_video)?;

        let wav = workdir.path().join("audio.wav");
        match muxer::extract_audio(&audio.source, audio.window, &wav) {
            Ok(()) => {
                muxer::mux_audio_video(&silent_video, &wav, &self.output)?;
            }
            Err(e) => {
                // Source sans piste audio (ou ffmpeg en échec) : on livre
                // la vidéo muette plutôt que d'échouer l'export entier.
                log::warn!("Piste audio indisponible ({e}), export vidéo seule");
                std::fs::rename(&silent_video, &self.output)
                    .or_else(|_| {
                        std::fs::copy(&silent_video, &self.output).map(|_| ())
                    })
                    .context("Déplacement de la vidéo exportée")?;
            }
        }

        Ok(())
    }
}
