/// Rampe ASCII 9 caractères — compact, bon contraste.
pub const RAMP_LOW: &str = "@#*+=-:. ";

/// Rampe ASCII 10 caractères — équilibre par défaut.
pub const RAMP_MEDIUM: &str = "@%#*+=-:. ";

/// Blocs Unicode huitièmes — pseudo-pixels, haute résolution.
pub const RAMP_HIGH: &str = "█▉▊▋▌▍▎▏ ";

/// Blocs pleins/ombrés — effet matière dense.
pub const RAMP_ULTRA: &str = "██▓▒░▒▓██";

/// Facteur d'aspect des cellules pour les rampes ASCII.
/// Les glyphes terminal sont ~2× plus hauts que larges.
pub const ASPECT_ASCII: f32 = 0.55;

/// Facteur d'aspect pour les rampes en blocs Unicode (quasi carrés).
pub const ASPECT_BLOCK: f32 = 0.45;

/// Profil de qualité : rampe de glyphes ordonnée + géométrie des cellules.
///
/// La rampe est indexée par luminance croissante : ramp[0] pour le noir,
/// ramp[len-1] pour le blanc.
///
/// # Example
/// ```
/// use gc_core::quality::QualityProfile;
/// let profile = QualityProfile::by_name("low").unwrap();
/// assert_eq!(profile.ramp.len(), 9);
/// assert!(!profile.block);
/// ```
#[derive(Clone, Debug)]
pub struct QualityProfile {
    /// Nom du profil ("low", "medium", "high", "ultra").
    pub name: &'static str,
    /// Glyphes ordonnés par luminance croissante. Jamais vide.
    pub ramp: Vec<char>,
    /// True si la rampe est en blocs Unicode (cellules quasi carrées).
    pub block: bool,
}

impl QualityProfile {
    /// Résout un nom de qualité vers son profil.
    ///
    /// Retourne `None` pour un nom inconnu — l'appelant en fait une
    /// `ConfigError::UnknownQuality`.
    ///
    /// # Example
    /// ```
    /// use gc_core::quality::QualityProfile;
    /// assert!(QualityProfile::by_name("ultra").is_some());
    /// assert!(QualityProfile::by_name("extreme").is_none());
    /// ```
    #[must_use]
    pub fn by_name(name: &str) -> Option<Self> {
        let (name, ramp, block) = match name {
            "low" => ("low", RAMP_LOW, false),
            "medium" => ("medium", RAMP_MEDIUM, false),
            "high" => ("high", RAMP_HIGH, true),
            "ultra" => ("ultra", RAMP_ULTRA, true),
            _ => return None,
        };
        let profile = Self {
            name,
            ramp: ramp.chars().collect(),
            block,
        };
        debug_assert!(!profile.ramp.is_empty());
        Some(profile)
    }

    /// Noms de profils reconnus, pour les messages d'erreur CLI.
    #[must_use]
    pub fn known_names() -> &'static [&'static str] {
        &["low", "medium", "high", "ultra"]
    }

    /// Facteur de compensation d'aspect pour le resize.
    ///
    /// # Example
    /// ```
    /// use gc_core::quality::{QualityProfile, ASPECT_BLOCK};
    /// let high = QualityProfile::by_name("high").unwrap();
    /// assert!((high.glyph_aspect_factor() - ASPECT_BLOCK).abs() < f32::EPSILON);
    /// ```
    #[inline]
    #[must_use]
    pub fn glyph_aspect_factor(&self) -> f32 {
        if self.block { ASPECT_BLOCK } else { ASPECT_ASCII }
    }
}

/// Lookup table luminance [0..255] → glyphe.
///
/// Pré-calculée une fois par run, coût O(1) par pixel ensuite.
/// Sémantique : index = floor(L × (len−1) / 255), L=255 mappe le dernier
/// glyphe sans débordement.
///
/// # Example
/// ```
/// use gc_core::quality::{GlyphLut, QualityProfile};
/// let lut = GlyphLut::new(&QualityProfile::by_name("low").unwrap());
/// assert_eq!(lut.map(0), '@');
/// assert_eq!(lut.map(255), ' ');
/// ```
pub struct GlyphLut {
    lut: [char; 256],
}

impl GlyphLut {
    /// Build a LUT from a quality profile's ramp.
    #[must_use]
    pub fn new(profile: &QualityProfile) -> Self {
        let chars = &profile.ramp;
        let len = chars.len().max(1);
        let mut lut = [' '; 256];
        for (i, slot) in lut.iter_mut().enumerate() {
            *slot = chars[i * (len - 1) / 255];
        }
        Self { lut }
    }

    /// Map a luminance value [0..255] to a glyph.
    ///
    /// # Example
    /// ```
    /// use gc_core::quality::{GlyphLut, QualityProfile};
    /// let lut = GlyphLut::new(&QualityProfile::by_name("low").unwrap());
    /// // floor(128/255 × 8) = 4 → '='
    /// assert_eq!(lut.map(128), '=');
    /// ```
    #[inline(always)]
    #[must_use]
    pub fn map(&self, luminance: u8) -> char {
        self.lut[luminance as usize]
    }
}
