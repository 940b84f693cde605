/// Sources de frames pour glyphcast.
///
/// Une seule source en production : un fichier vidéo décodé par ffmpeg
/// en subprocess, frames rgb24 brutes lues sur un pipe.

pub mod video;

pub use video::{VideoFileSource, VideoInfo, probe_video};
