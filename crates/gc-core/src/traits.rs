use std::path::PathBuf;

use crate::config::SegmentWindow;
use crate::error::SinkError;
use crate::frame::{RenderedFrame, SourceFrame};

/// Résultat d'une lecture de frame côté source.
pub enum SourcePull {
    /// Une frame décodée, index et timestamp strictement croissants.
    Frame(SourceFrame),
    /// Une frame illisible — le scheduler la loggue et passe à la suivante.
    /// Trois `Corrupt` consécutifs promeuvent en abort.
    Corrupt,
    /// Fin de flux, sans ambiguïté avec une lecture vide transitoire.
    End,
}

/// Fournit des frames pixel au pipeline.
///
/// Contrat : frames en ordre source strictement croissant, fin de flux
/// signalée par `SourcePull::End` (jamais par une erreur).
///
/// # Example
/// ```
/// use gc_core::traits::{FrameSource, SourcePull};
///
/// struct EmptySource;
/// impl FrameSource for EmptySource {
///     fn next_frame(&mut self) -> anyhow::Result<SourcePull> { Ok(SourcePull::End) }
///     fn fps(&self) -> f64 { 30.0 }
///     fn native_size(&self) -> (u32, u32) { (0, 0) }
/// }
/// ```
pub trait FrameSource {
    /// Retourne la prochaine frame, `Corrupt`, ou `End`.
    ///
    /// # Errors
    /// Erreur fatale de la source (pipe cassé). Une frame simplement
    /// illisible est `Ok(SourcePull::Corrupt)`, pas une erreur.
    fn next_frame(&mut self) -> anyhow::Result<SourcePull>;

    /// Frame rate du flux source.
    fn fps(&self) -> f64;

    /// Dimensions natives de la source (avant resize).
    fn native_size(&self) -> (u32, u32);
}

/// Sink de lecture live : reçoit les frames une par une, de façon
/// synchrone. Un échec d'écriture est fatal pour le run (Aborted).
pub trait RenderSink {
    /// Présente une frame. Doit être rapide devant l'intervalle cible.
    ///
    /// # Errors
    /// `SinkError` si la sortie est fermée ou en échec d'écriture.
    fn present(&mut self, frame: &RenderedFrame) -> Result<(), SinkError>;

    /// Marqueur de complétion émis pendant Draining.
    ///
    /// # Errors
    /// `SinkError` si la sortie est fermée.
    fn finish(&mut self) -> Result<(), SinkError>;
}

/// Piste audio à passer au muxer externe. Le cœur n'interprète jamais
/// l'audio ; il transmet la source et la fenêtre de segment.
#[derive(Clone, Debug)]
pub struct AudioTrack {
    /// Fichier média contenant la piste audio d'origine.
    pub source: PathBuf,
    /// Fenêtre à extraire, alignée sur celle de la vidéo.
    pub window: SegmentWindow,
}

/// Paramètres remis au sink d'export avec la séquence de frames.
#[derive(Clone, Debug)]
pub struct ExportSettings {
    /// Frame rate de sortie (fps source / skip).
    pub fps: f64,
    /// Couleur de remplissage des marges non peintes.
    pub background: (u8, u8, u8),
    /// Piste audio à muxer, ou `None` pour une sortie muette.
    pub audio: Option<AudioTrack>,
}

/// Sink d'export : consomme la séquence finalisée et ordonnée de frames
/// (chacune portant son presentation timestamp) et réalise l'encodage.
pub trait ExportSink {
    /// Encode la séquence. Appelé une fois, pendant Draining — y compris
    /// sur Abort, avec le buffer partiel (sortie tronquée mais valide).
    ///
    /// # Errors
    /// Échec de l'encodage ou du muxing.
    fn consume(&mut self, frames: &[RenderedFrame], settings: &ExportSettings)
    -> anyhow::Result<()>;
}
