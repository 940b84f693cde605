use std::io::Write;
use std::path::Path;
use std::process::{Child, Command, Stdio};

use anyhow::{Context, Result};

use gc_core::config::SegmentWindow;

/// Encode des frames rgb24 brutes dans un fichier MP4 avec ffmpeg.
pub struct Mp4Encoder {
    ffmpeg_child: Child,
}

impl Mp4Encoder {
    /// Crée un encodeur vidéo. x264 RGB sans subsampling chroma — les
    /// glyphes fins survivent mal au 4:2:0.
    ///
    /// # Errors
    /// ffmpeg introuvable ou impossible à démarrer.
    pub fn new(output_path: &Path, width: u32, height: u32, fps: f64) -> Result<Self> {
        let path_str = output_path.to_str().context("Chemin de sortie invalide")?;

        let child = Command::new("ffmpeg")
            .args([
                "-y",
                "-f",
                "rawvideo",
                "-vcodec",
                "rawvideo",
                "-s",
                &format!("{width}x{height}"),
                "-pix_fmt",
                "rgb24",
                "-r",
                &format!("{fps:.3}"),
                "-i",
                "-",
                "-c:v",
                "libx264rgb",
                "-crf",
                "18",
                "-preset",
                "medium",
                "-pix_fmt",
                "rgb24",
                "-color_range",
                "pc",
                "-hide_banner",
                "-loglevel",
                "error",
                path_str,
            ])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .context("Échec de l'initialisation de l'encodeur ffmpeg. (Est-il dans le PATH ?)")?;

        Ok(Self {
            ffmpeg_child: child,
        })
    }

    /// Pousse une frame rgb24 au flux.
    ///
    /// # Errors
    /// Erreur I/O si l'écriture dans le pipe échoue.
    pub fn write_frame(&mut self, rgb: &[u8]) -> Result<()> {
        if let Some(stdin) = self.ffmpeg_child.stdin.as_mut() {
            stdin.write_all(rgb)?;
        }
        Ok(())
    }

    /// Ferme le flux et finalise l'encodage.
    ///
    /// # Errors
    /// ffmpeg signale une erreur de terminaison.
    pub fn finish(mut self) -> Result<()> {
        drop(self.ffmpeg_child.stdin.take());

        let output = self.ffmpeg_child.wait_with_output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("ffmpeg encoder error: {stderr}");
        }
        Ok(())
    }
}

/// Extrait la piste audio du média source vers un wav temporaire, sur la
/// même fenêtre de segment que la vidéo (alignement des timestamps).
///
/// # Errors
/// ffmpeg en échec ou source sans piste audio.
pub fn extract_audio(source: &Path, window: SegmentWindow, out_wav: &Path) -> Result<()> {
    let src_str = source.to_str().context("Chemin source invalide")?;
    let out_str = out_wav.to_str().context("Chemin wav invalide")?;

    let mut cmd = Command::new("ffmpeg");
    cmd.args(["-y", "-ss", &format!("{:.3}", window.start), "-i", src_str]);
    if let Some(d) = window.duration {
        cmd.args(["-t", &format!("{d:.3}")]);
    }
    cmd.args([
        "-vn",
        "-acodec",
        "pcm_s16le",
        "-hide_banner",
        "-loglevel",
        "error",
        out_str,
    ]);

    let output = cmd.stdout(Stdio::null()).stderr(Stdio::piped()).output()?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("Extraction audio en échec : {stderr}");
    }
    Ok(())
}

/// Fusionne un MP4 sans piste audio avec un fichier audio.
///
/// # Errors
/// Retourne une erreur si le muxage ffmpeg échoue.
pub fn mux_audio_video(video_path: &Path, audio_path: &Path, final_path: &Path) -> Result<()> {
    let video_str = video_path.to_str().context("video path invalid")?;
    let audio_str = audio_path.to_str().context("audio path invalid")?;
    let final_str = final_path.to_str().context("final path invalid")?;

    let output = Command::new("ffmpeg")
        .args([
            "-y",
            "-i",
            video_str,
            "-i",
            audio_str,
            "-c:v",
            "copy",
            "-c:a",
            "aac",
            "-b:a",
            "320k",
            "-shortest",
            "-hide_banner",
            "-loglevel",
            "error",
            final_str,
        ])
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("Mux audio/video error: {stderr}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoder_new_does_not_panic() {
        // Mp4Encoder::new peut réussir ou échouer selon la présence de
        // ffmpeg — l'important est l'absence de panic.
        let dir = std::env::temp_dir();
        let out = dir.join("gc_encoder_smoke.mp4");
        let result = Mp4Encoder::new(&out, 64, 64, 30.0);
        if let Ok(encoder) = result {
            let _ = encoder.finish();
            let _ = std::fs::remove_file(&out);
        }
    }
}
