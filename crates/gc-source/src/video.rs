//! Source vidéo via ffmpeg en subprocess (std::process::Command).
//! Prérequis : `ffmpeg` et `ffprobe` accessibles dans le PATH.
//!
//! Architecture :
//!   - `probe_video`       : interroge ffprobe pour width/height/fps
//!   - `spawn_ffmpeg_pipe` : lance ffmpeg → flux raw rgb24 sur stdout
//!   - `VideoFileSource`   : thread de décodage + canal borné vers le
//!     scheduler (le décodage ne prend jamais plus de 2 frames d'avance
//!     sur le rendu)

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;

use anyhow::{Context, Result};
use flume::{Receiver, Sender};

use gc_core::config::SegmentWindow;
use gc_core::frame::{PixelGrid, SourceFrame};
use gc_core::traits::{FrameSource, SourcePull};

/// Capacité du canal frames : borne la mémoire, le décodage ne dépasse
/// jamais le rendu de plus de 2 frames.
const CHANNEL_DEPTH: usize = 2;

/// Largeur max demandée à ffmpeg. Le pipeline re-descend de toute façon
/// à la grille caractères ; inutile de payer la bande passante du natif.
const MAX_PIPE_WIDTH: u32 = 640;

/// Métadonnées extraites via ffprobe.
#[derive(Clone, Copy, Debug)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    /// Images par seconde (ex : 23.976, 24.0, 30.0, 60.0).
    pub fps: f64,
}

/// Interroge `ffprobe` pour obtenir les métadonnées du flux vidéo principal.
///
/// # Errors
/// Retourne une erreur si `ffprobe` est introuvable ou si le fichier
/// ne contient aucun flux vidéo décodable.
pub fn probe_video(path: &Path) -> Result<VideoInfo> {
    let path_str = path.to_str().context("Chemin vidéo invalide (non-UTF8)")?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,r_frame_rate",
            "-of",
            "default=noprint_wrappers=1",
            "-i",
            path_str,
        ])
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .context(
            "Impossible de lancer ffprobe. Vérifiez que ffprobe est installé et dans le PATH.",
        )?;

    let text = String::from_utf8_lossy(&output.stdout);

    let mut width: u32 = 0;
    let mut height: u32 = 0;
    let mut fps: f64 = 30.0;

    for line in text.lines() {
        if let Some(val) = line.strip_prefix("width=") {
            width = val.trim().parse().unwrap_or(0);
        } else if let Some(val) = line.strip_prefix("height=") {
            height = val.trim().parse().unwrap_or(0);
        } else if let Some(val) = line.strip_prefix("r_frame_rate=") {
            // Format : "24/1" ou "30000/1001"
            let val = val.trim();
            let mut parts = val.splitn(2, '/');
            let num: f64 = parts.next().and_then(|s| s.parse().ok()).unwrap_or(30.0);
            let den: f64 = parts.next().and_then(|s| s.parse().ok()).unwrap_or(1.0);
            if den > 0.0 {
                fps = num / den;
            }
        }
    }

    if width == 0 || height == 0 {
        anyhow::bail!("ffprobe n'a trouvé aucun flux vidéo dans {}", path.display());
    }

    log::info!(
        "probe_video: {width}x{height} @ {fps:.3}fps — {}",
        path.display()
    );

    Ok(VideoInfo { width, height, fps })
}

/// Dimensions du pipe : natif plafonné à `MAX_PIPE_WIDTH`, aspect préservé.
fn pipe_dimensions(info: &VideoInfo) -> (u32, u32) {
    if info.width <= MAX_PIPE_WIDTH {
        return (info.width, info.height);
    }
    let h = (f64::from(info.height) * f64::from(MAX_PIPE_WIDTH) / f64::from(info.width)).round()
        as u32;
    (MAX_PIPE_WIDTH, h.max(1))
}

/// Lance un processus `ffmpeg` qui écrit des frames rgb24 brutes sur stdout.
///
/// Chaque frame = `w × h × 3` bytes (RGB row-major, sans padding).
/// `-ss` avant `-i` = seek rapide keyframe-based ; `-t` borne la durée
/// lue côté décodeur. `-an` supprime l'audio (muxé séparément à l'export).
fn spawn_ffmpeg_pipe(path: &Path, w: u32, h: u32, window: SegmentWindow) -> Result<Child> {
    let path_str = path.to_str().context("Chemin vidéo invalide (non-UTF8)")?;

    let scale_filter = format!("scale={w}:{h}:flags=bilinear");
    let pos_str = format!("{:.3}", window.start);

    let mut cmd = Command::new("ffmpeg");
    cmd.args(["-ss", &pos_str, "-i", path_str]);
    if let Some(d) = window.duration {
        cmd.args(["-t", &format!("{d:.3}")]);
    }
    cmd.args([
        "-vf",
        &scale_filter,
        "-f",
        "rawvideo",
        "-pix_fmt",
        "rgb24",
        "-an",
        "-hide_banner",
        "-loglevel",
        "error",
        "pipe:1",
    ])
    .stdout(Stdio::piped())
    .stdin(Stdio::null())
    .stderr(Stdio::null());

    let child = cmd
        .spawn()
        .context("Impossible de lancer ffmpeg. Est-il dans le PATH ?")?;
    log::debug!("ffmpeg spawné: {w}x{h} depuis {:.1}s", window.start);
    Ok(child)
}

/// Lit exactement `buf.len()` bytes depuis `reader`.
///
/// Retourne `Ok(true)` si lu en entier, `Ok(false)` sur EOF propre avant
/// le premier byte, `Err` sur EOF au milieu d'une frame ou erreur I/O.
fn read_exact_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<bool> {
    let mut total = 0usize;
    while total < buf.len() {
        match reader.read(&mut buf[total..]) {
            Ok(0) => {
                if total == 0 {
                    return Ok(false); // EOF propre, entre deux frames
                }
                anyhow::bail!("EOF au milieu d'une frame ({total}/{} bytes)", buf.len());
            }
            Ok(n) => total += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(true)
}

/// Événement du thread de décodage vers le scheduler.
enum DecodeEvent {
    Frame(PixelGrid),
    /// Frame illisible (pipe déchiré au milieu d'une frame).
    Corrupt,
    End,
}

/// Source de frames depuis un fichier vidéo, décodé par ffmpeg dans un
/// thread dédié. Implémente `FrameSource` pour le scheduler.
///
/// # Example
/// ```no_run
/// use std::path::Path;
/// use gc_core::config::SegmentWindow;
/// use gc_source::video::VideoFileSource;
/// let source = VideoFileSource::open(Path::new("video.mp4"), SegmentWindow::default()).unwrap();
/// ```
pub struct VideoFileSource {
    event_rx: Receiver<DecodeEvent>,
    fps: f64,
    native: (u32, u32),
    window_start: f64,
    next_index: u64,
    ended: bool,
    handle: Option<thread::JoinHandle<()>>,
}

impl VideoFileSource {
    /// Ouvre le fichier, sonde ses métadonnées et démarre le thread de
    /// décodage. Le seek (`window.start`) est fait côté ffmpeg ; les
    /// timestamps remis au scheduler restent exprimés en temps source.
    ///
    /// # Errors
    /// ffprobe/ffmpeg introuvables ou fichier sans flux vidéo.
    pub fn open(path: &Path, window: SegmentWindow) -> Result<Self> {
        let info = probe_video(path)?;
        let (w, h) = pipe_dimensions(&info);
        let child = spawn_ffmpeg_pipe(path, w, h, window)?;

        let (event_tx, event_rx) = flume::bounded(CHANNEL_DEPTH);
        let handle = thread::Builder::new()
            .name("gc-decode".to_string())
            .spawn(move || decode_loop(child, w, h, &event_tx))
            .context("Impossible de spawner le thread de décodage")?;

        Ok(Self {
            event_rx,
            fps: info.fps,
            native: (w, h),
            window_start: window.start,
            next_index: 0,
            ended: false,
            handle: Some(handle),
        })
    }
}

impl FrameSource for VideoFileSource {
    fn next_frame(&mut self) -> Result<SourcePull> {
        if self.ended {
            return Ok(SourcePull::End);
        }
        match self.event_rx.recv() {
            Ok(DecodeEvent::Frame(grid)) => {
                let index = self.next_index;
                self.next_index += 1;
                Ok(SourcePull::Frame(SourceFrame {
                    grid,
                    index,
                    timestamp: self.window_start + index as f64 / self.fps.max(1e-6),
                }))
            }
            Ok(DecodeEvent::Corrupt) => {
                self.next_index += 1;
                Ok(SourcePull::Corrupt)
            }
            Ok(DecodeEvent::End) | Err(flume::RecvError::Disconnected) => {
                self.ended = true;
                Ok(SourcePull::End)
            }
        }
    }

    fn fps(&self) -> f64 {
        self.fps
    }

    fn native_size(&self) -> (u32, u32) {
        self.native
    }
}

impl Drop for VideoFileSource {
    fn drop(&mut self) {
        // Fermer le canal débloque le thread, qui tue ffmpeg et sort.
        self.ended = true;
        drop(std::mem::replace(&mut self.event_rx, flume::bounded(0).1));
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Boucle du thread de décodage : lit frame par frame le stdout de
/// ffmpeg et pousse sur le canal borné (bloque si le rendu est en retard).
fn decode_loop(mut child: Child, w: u32, h: u32, event_tx: &Sender<DecodeEvent>) {
    let frame_bytes = (w * h * 3) as usize;
    let Some(mut stdout) = child.stdout.take() else {
        let _ = event_tx.send(DecodeEvent::End);
        return;
    };

    loop {
        let mut buf = vec![0u8; frame_bytes];
        match read_exact_or_eof(&mut stdout, &mut buf) {
            Ok(true) => {
                let Some(grid) = PixelGrid::from_rgb(buf, w, h) else {
                    let _ = event_tx.send(DecodeEvent::Corrupt);
                    continue;
                };
                if event_tx.send(DecodeEvent::Frame(grid)).is_err() {
                    // Scheduler parti : arrêt propre.
                    let _ = child.kill();
                    break;
                }
            }
            Ok(false) => {
                log::info!("Thread décodage : EOF, fin du flux.");
                let _ = event_tx.send(DecodeEvent::End);
                break;
            }
            Err(e) => {
                log::warn!("Thread décodage : frame tronquée ({e}), signalée corrompue.");
                if event_tx.send(DecodeEvent::Corrupt).is_err() {
                    let _ = child.kill();
                    break;
                }
                let _ = event_tx.send(DecodeEvent::End);
                break;
            }
        }
    }

    let _ = child.wait();
    log::debug!("Thread décodage terminé proprement.");
}
