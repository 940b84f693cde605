use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::quality::QualityProfile;

/// Fenêtre de segment : borne quelles frames source sont éligibles.
///
/// Une frame est éligible si `start ≤ ts` et, si une durée est donnée,
/// `ts < start + duration`. Les frames hors fenêtre sont écartées avant
/// l'enhancer.
///
/// # Example
/// ```
/// use gc_core::config::SegmentWindow;
/// let w = SegmentWindow { start: 1.0, duration: Some(2.0) };
/// assert!(!w.contains(0.5));
/// assert!(w.contains(1.0));
/// assert!(!w.contains(3.0));
/// ```
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct SegmentWindow {
    /// Début en secondes.
    pub start: f64,
    /// Durée en secondes. `None` = jusqu'à la fin du flux.
    pub duration: Option<f64>,
}

impl Default for SegmentWindow {
    fn default() -> Self {
        Self {
            start: 0.0,
            duration: None,
        }
    }
}

impl SegmentWindow {
    /// True si le timestamp est dans la fenêtre.
    #[inline]
    #[must_use]
    pub fn contains(&self, ts: f64) -> bool {
        ts >= self.start && self.duration.is_none_or(|d| ts < self.start + d)
    }

    /// True si le timestamp est au-delà de la fin de la fenêtre —
    /// le flux peut s'arrêter là, plus rien d'éligible ne viendra.
    #[inline]
    #[must_use]
    pub fn is_past_end(&self, ts: f64) -> bool {
        self.duration.is_some_and(|d| ts >= self.start + d)
    }
}

/// Filtre d'admission : seule une frame éligible sur N entre dans le
/// pipeline. Convention 0-based : les ordinaux 0, N, 2N, … passent.
///
/// # Example
/// ```
/// use gc_core::config::SkipCounter;
/// let skip = SkipCounter::new(3).unwrap();
/// assert!(skip.admits(0));
/// assert!(!skip.admits(1));
/// assert!(skip.admits(3));
/// ```
#[derive(Clone, Copy, Debug)]
pub struct SkipCounter(u32);

impl SkipCounter {
    /// Crée un compteur. N = 1 traite toutes les frames.
    ///
    /// # Errors
    /// `ConfigError::InvalidSkip` si N = 0.
    pub fn new(n: u32) -> Result<Self, ConfigError> {
        if n == 0 {
            return Err(ConfigError::InvalidSkip);
        }
        Ok(Self(n))
    }

    /// True si la frame d'ordinal `ordinal` (parmi les éligibles) passe.
    #[inline]
    #[must_use]
    pub fn admits(&self, ordinal: u64) -> bool {
        ordinal % u64::from(self.0) == 0
    }

    /// Valeur N brute.
    #[inline]
    #[must_use]
    pub fn every(&self) -> u32 {
        self.0
    }
}

/// Réglages de l'enhancer. Les défauts reproduisent le pré-traitement
/// historique : contraste 1.2, brightness +10, pas de denoise.
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct EnhanceSettings {
    /// Facteur de contraste autour du point milieu 128. 1.0 = neutre.
    pub contrast: f32,
    /// Offset de brightness en valeurs de canal. 0.0 = neutre.
    pub brightness: f32,
    /// Force du lissage 3×3 [0.0, 1.0]. 0.0 = désactivé.
    pub denoise: f32,
}

impl Default for EnhanceSettings {
    fn default() -> Self {
        Self {
            contrast: 1.2,
            brightness: 10.0,
            denoise: 0.0,
        }
    }
}

impl EnhanceSettings {
    /// Réglages strictement neutres (passthrough), pour les tests.
    #[must_use]
    pub fn neutral() -> Self {
        Self {
            contrast: 1.0,
            brightness: 0.0,
            denoise: 0.0,
        }
    }
}

/// Noms de couleurs de fond reconnus pour l'export.
pub const BACKGROUND_NAMES: &[(&str, (u8, u8, u8))] = &[
    ("black", (0, 0, 0)),
    ("white", (255, 255, 255)),
    ("dark-gray", (64, 64, 64)),
    ("light-gray", (192, 192, 192)),
];

/// Résout un nom de couleur de fond vers son triplet RGB.
///
/// # Errors
/// `ConfigError::UnknownBackground` pour un nom hors table.
///
/// # Example
/// ```
/// use gc_core::config::background_by_name;
/// assert_eq!(background_by_name("black").unwrap(), (0, 0, 0));
/// assert!(background_by_name("magenta").is_err());
/// ```
pub fn background_by_name(name: &str) -> Result<(u8, u8, u8), ConfigError> {
    BACKGROUND_NAMES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, rgb)| *rgb)
        .ok_or_else(|| ConfigError::UnknownBackground {
            name: name.to_string(),
        })
}

/// Configuration complète d'un run de conversion.
///
/// Sérialisable en TOML ; chaque champ a un défaut sain. `validate()`
/// doit passer avant que le scheduler n'entre en Priming.
///
/// # Example
/// ```
/// use gc_core::config::RunConfig;
/// let config = RunConfig::default();
/// assert_eq!(config.width, 80);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RunConfig {
    /// Largeur de sortie en caractères.
    pub width: u32,
    /// Nom du profil de qualité ("low", "medium", "high", "ultra").
    pub quality: String,
    /// Couleur ANSI 256 activée.
    pub color: bool,
    /// Fenêtre de segment du flux source.
    pub segment: SegmentWindow,
    /// Une frame éligible sur N est traitée.
    pub skip: u32,
    /// Couleur de fond d'export (nom de la table).
    pub background: String,
    /// Préserver la piste audio à l'export.
    pub include_audio: bool,
    /// Pré-traitement image.
    pub enhance: EnhanceSettings,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            width: 80,
            quality: "medium".to_string(),
            color: false,
            segment: SegmentWindow::default(),
            skip: 1,
            background: "black".to_string(),
            include_audio: true,
            enhance: EnhanceSettings::default(),
        }
    }
}

impl RunConfig {
    /// Vérifie la cohérence de la configuration. Appelé avant Priming ;
    /// un échec ici signifie qu'aucune frame ne sera traitée.
    ///
    /// # Errors
    /// La première `ConfigError` rencontrée.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 {
            return Err(ConfigError::InvalidWidth(self.width));
        }
        if QualityProfile::by_name(&self.quality).is_none() {
            return Err(ConfigError::UnknownQuality {
                name: self.quality.clone(),
            });
        }
        if self.segment.start < 0.0 {
            return Err(ConfigError::InvalidStart(self.segment.start));
        }
        if let Some(d) = self.segment.duration
            && d <= 0.0
        {
            return Err(ConfigError::InvalidDuration(d));
        }
        SkipCounter::new(self.skip)?;
        background_by_name(&self.background)?;
        Ok(())
    }

    /// Profil de qualité résolu. Ne pas appeler avant `validate()`.
    ///
    /// # Errors
    /// `ConfigError::UnknownQuality` si le nom est hors table.
    pub fn profile(&self) -> Result<QualityProfile, ConfigError> {
        QualityProfile::by_name(&self.quality).ok_or_else(|| ConfigError::UnknownQuality {
            name: self.quality.clone(),
        })
    }

    /// Triplet RGB de la couleur de fond.
    ///
    /// # Errors
    /// `ConfigError::UnknownBackground` si le nom est hors table.
    pub fn background_rgb(&self) -> Result<(u8, u8, u8), ConfigError> {
        background_by_name(&self.background)
    }
}

/// Structure TOML intermédiaire — tous les champs optionnels pour ne
/// surcharger que ce qui est présent dans le fichier.
#[derive(Deserialize)]
struct ConfigFile {
    render: Option<RenderSection>,
    enhance: Option<EnhanceSection>,
}

#[derive(Deserialize)]
struct RenderSection {
    width: Option<u32>,
    quality: Option<String>,
    color: Option<bool>,
    skip: Option<u32>,
    background: Option<String>,
    include_audio: Option<bool>,
}

#[derive(Deserialize)]
struct EnhanceSection {
    contrast: Option<f32>,
    brightness: Option<f32>,
    denoise: Option<f32>,
}

/// Charge un fichier TOML et fusionne champ par champ avec les défauts.
///
/// # Errors
/// Échec de lecture ou de parsing TOML. La validation est laissée à
/// l'appelant (les overrides CLI s'appliquent après).
///
/// # Example
/// ```no_run
/// use gc_core::config::load_config;
/// use std::path::Path;
/// let config = load_config(Path::new("glyphcast.toml")).unwrap();
/// ```
pub fn load_config(path: &Path) -> Result<RunConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire {}", path.display()))?;

    let file: ConfigFile = toml::from_str(&content)
        .with_context(|| format!("Erreur de parsing TOML dans {}", path.display()))?;
    log::debug!("Configuration chargée depuis {}", path.display());

    let mut config = RunConfig::default();

    if let Some(r) = file.render {
        if let Some(v) = r.width {
            config.width = v;
        }
        if let Some(v) = r.quality {
            config.quality = v;
        }
        if let Some(v) = r.color {
            config.color = v;
        }
        if let Some(v) = r.skip {
            config.skip = v;
        }
        if let Some(v) = r.background {
            config.background = v;
        }
        if let Some(v) = r.include_audio {
            config.include_audio = v;
        }
    }

    if let Some(e) = file.enhance {
        if let Some(v) = e.contrast {
            config.enhance.contrast = v.clamp(0.1, 3.0);
        }
        if let Some(v) = e.brightness {
            config.enhance.brightness = v.clamp(-255.0, 255.0);
        }
        if let Some(v) = e.denoise {
            config.enhance.denoise = v.clamp(0.0, 1.0);
        }
    }

    Ok(config)
}
