use std::path::PathBuf;

use clap::Parser;

use gc_core::config::{RunConfig, load_config};

/// Bornes de largeur raisonnables pour un terminal ; hors bornes on
/// clampe avec un warning plutôt que d'échouer.
const WIDTH_MIN: u32 = 10;
const WIDTH_MAX: u32 = 300;

/// glyphcast — Convertisseur vidéo vers art ASCII/blocs, lecture
/// terminal et export MP4.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Fichier vidéo source.
    pub video: PathBuf,

    /// Largeur de sortie en caractères.
    #[arg(short, long)]
    pub width: Option<u32>,

    /// Activer la couleur ANSI 256.
    #[arg(long, default_value_t = false)]
    pub color: bool,

    /// Profil de qualité : low, medium, high, ultra.
    #[arg(short, long)]
    pub quality: Option<String>,

    /// Sauvegarder les frames en texte brut dans ce fichier.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Exporter l'animation en MP4 vers ce fichier.
    #[arg(long)]
    pub save_video: Option<PathBuf>,

    /// Ne pas jouer l'animation dans le terminal.
    #[arg(long, default_value_t = false)]
    pub no_play: bool,

    /// Début du segment en secondes.
    #[arg(long)]
    pub start: Option<f64>,

    /// Durée du segment en secondes. Absent = jusqu'à la fin.
    #[arg(long)]
    pub duration: Option<f64>,

    /// Traiter une frame éligible sur N.
    #[arg(long)]
    pub skip: Option<u32>,

    /// Couleur de fond d'export : black, white, dark-gray, light-gray.
    #[arg(long)]
    pub bg_color: Option<String>,

    /// Ne pas préserver la piste audio à l'export.
    #[arg(long, default_value_t = false)]
    pub no_audio: bool,

    /// Fichier de configuration TOML optionnel.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Niveau de log : error, warn, info, debug, trace.
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

impl Cli {
    /// Configuration résolue : fichier TOML (si fourni) puis overrides
    /// CLI, champ par champ. La validation stricte reste au scheduler.
    ///
    /// # Errors
    /// Échec de lecture/parsing du fichier de configuration.
    pub fn resolve_config(&self) -> anyhow::Result<RunConfig> {
        let mut config = match self.config.as_deref() {
            Some(path) => load_config(path)?,
            None => RunConfig::default(),
        };

        if let Some(w) = self.width {
            config.width = clamp_width(w);
        }
        if self.color {
            config.color = true;
        }
        if let Some(ref q) = self.quality {
            config.quality.clone_from(q);
        }
        if let Some(s) = self.start {
            config.segment.start = s;
        }
        if let Some(d) = self.duration {
            config.segment.duration = Some(d);
        }
        if let Some(n) = self.skip {
            config.skip = n;
        }
        if let Some(ref bg) = self.bg_color {
            config.background.clone_from(bg);
        }
        if self.no_audio {
            config.include_audio = false;
        }

        Ok(config)
    }
}

/// Clampe la largeur dans [10, 300] avec un warning. Zéro reste zéro :
/// c'est une erreur de configuration, pas une valeur à réparer.
#[must_use]
pub fn clamp_width(width: u32) -> u32 {
    if width == 0 {
        return 0;
    }
    let clamped = width.clamp(WIDTH_MIN, WIDTH_MAX);
    if clamped != width {
        log::warn!("Largeur {width} hors bornes [{WIDTH_MIN}, {WIDTH_MAX}], clampée à {clamped}");
    }
    clamped
}
