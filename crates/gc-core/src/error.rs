use thiserror::Error;

/// Erreurs de configuration — détectées avant Priming, le run ne démarre pas.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Largeur nulle ou invalide.
    #[error("Largeur invalide : {0} (doit être ≥ 1)")]
    InvalidWidth(u32),

    /// Nom de qualité hors table.
    #[error("Qualité inconnue : '{name}' (attendu : low, medium, high, ultra)")]
    UnknownQuality {
        /// The unrecognized name.
        name: String,
    },

    /// Durée de segment négative.
    #[error("Durée invalide : {0} (doit être > 0)")]
    InvalidDuration(f64),

    /// Début de segment négatif.
    #[error("Début de segment invalide : {0} (doit être ≥ 0)")]
    InvalidStart(f64),

    /// Skip nul — au moins une frame sur N doit passer.
    #[error("Skip invalide : 0 (doit être ≥ 1)")]
    InvalidSkip,

    /// Nom de couleur de fond hors table.
    #[error("Couleur de fond inconnue : '{name}'")]
    UnknownBackground {
        /// The unrecognized name.
        name: String,
    },
}

/// Échec d'écriture côté sink — fatal pour le run courant.
#[derive(Error, Debug)]
#[error("Échec du sink : {0}")]
pub struct SinkError(#[from] std::io::Error);

/// Erreurs fatales d'un run en cours. `SourceExhausted` n'existe pas ici :
/// la fin de flux est un signal normal (`SourcePull::End`), pas une erreur.
#[derive(Error, Debug)]
pub enum RunError {
    /// Le sink a refusé une frame ; l'index aide au debug.
    #[error("Sink en échec à la frame {frame}: {source}")]
    Sink {
        /// Index of the frame being delivered.
        frame: u64,
        /// Underlying sink failure.
        #[source]
        source: SinkError,
    },

    /// Trois échecs de décodage consécutifs — source considérée corrompue.
    #[error("Source corrompue : {failures} frames illisibles consécutives (dernière : {frame})")]
    CorruptSource {
        /// Index of the last unreadable frame.
        frame: u64,
        /// Consecutive failure count at abort time.
        failures: u32,
    },

    /// Erreur remontée par la source elle-même (pipe ffmpeg cassé, etc.).
    #[error("Source en échec à la frame {frame}: {message}")]
    Source {
        /// Index of the frame being pulled.
        frame: u64,
        /// Error description from the source.
        message: String,
    },

    /// Étape interne du pipeline en échec (resize).
    #[error("Pipeline en échec à la frame {frame}: {message}")]
    Pipeline {
        /// Index of the frame being processed.
        frame: u64,
        /// Error description from the failing stage.
        message: String,
    },

    /// Finalisation de l'export en échec (muxing).
    #[error("Export en échec : {0}")]
    Export(String),
}
