use anyhow::{Context, Result};
use fast_image_resize::images::Image;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer as FirResizer};
use gc_core::frame::PixelGrid;
use gc_core::quality::QualityProfile;

/// Hauteur de sortie pour une largeur cible donnée, compensée par le
/// facteur d'aspect des glyphes du profil. Clampée à ≥ 1.
///
/// `H = round(src_h / src_w × W × aspect)` — les cellules terminal étant
/// plus hautes que larges, sans compensation l'image sortirait étirée
/// verticalement.
///
/// # Example
/// ```
/// use gc_core::quality::QualityProfile;
/// use gc_pipeline::resize::output_height;
/// let low = QualityProfile::by_name("low").unwrap();
/// // 1920×1080 → 80 colonnes : 1080/1920 × 80 × 0.55 = 24.75 → 25
/// assert_eq!(output_height(1920, 1080, 80, &low), 25);
/// ```
#[must_use]
pub fn output_height(src_w: u32, src_h: u32, width: u32, profile: &QualityProfile) -> u32 {
    if src_w == 0 {
        return 1;
    }
    let h = (f64::from(src_h) / f64::from(src_w)
        * f64::from(width)
        * f64::from(profile.glyph_aspect_factor()))
    .round() as u32;
    h.max(1)
}

/// Resizer réutilisable wrappant fast_image_resize.
///
/// Filtre Box (moyenne de zone) : un downsample filtré, pas du
/// nearest-neighbor, pour ne pas aliaser les détails fins.
///
/// # Example
/// ```
/// use gc_pipeline::resize::Resizer;
/// let r = Resizer::new();
/// ```
pub struct Resizer {
    inner: FirResizer,
    options: ResizeOptions,
    /// Scratch buffer source (l'API fast_image_resize exige un &mut).
    src_buf: Vec<u8>,
}

impl Resizer {
    /// Create a new resizer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: FirResizer::new(),
            options: ResizeOptions::new()
                .resize_alg(ResizeAlg::Convolution(FilterType::Box)),
            src_buf: Vec::new(),
        }
    }

    /// Downsample `src` vers la grille caractères : `width` colonnes,
    /// hauteur dérivée du profil de qualité.
    ///
    /// # Errors
    /// Échec interne de fast_image_resize (dimensions incohérentes).
    ///
    /// # Example
    /// ```
    /// use gc_core::frame::PixelGrid;
    /// use gc_core::quality::QualityProfile;
    /// use gc_pipeline::resize::Resizer;
    /// let mut r = Resizer::new();
    /// let src = PixelGrid::new(100, 100);
    /// let profile = QualityProfile::by_name("low").unwrap();
    /// let out = r.resize(&src, 20, &profile).unwrap();
    /// assert_eq!(out.width, 20);
    /// assert_eq!(out.height, 11); // round(100/100 × 20 × 0.55)
    /// ```
    pub fn resize(
        &mut self,
        src: &PixelGrid,
        width: u32,
        profile: &QualityProfile,
    ) -> Result<PixelGrid> {
        let height = output_height(src.width, src.height, width, profile);
        let mut dst = PixelGrid::new(width, height);

        if src.width == width && src.height == height {
            dst.data.copy_from_slice(&src.data);
            return Ok(dst);
        }

        self.src_buf.clear();
        self.src_buf.extend_from_slice(&src.data);

        let src_image =
            Image::from_slice_u8(src.width, src.height, &mut self.src_buf, PixelType::U8x3)
                .context("Invalid source dimensions")?;

        let mut dst_image =
            Image::from_slice_u8(dst.width, dst.height, &mut dst.data, PixelType::U8x3)
                .context("Invalid destination dimensions")?;

        self.inner
            .resize(&src_image, &mut dst_image, Some(&self.options))
            .context("Resize failed")?;

        Ok(dst)
    }
}

impl Default for Resizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn height_is_deterministic() {
        let low = QualityProfile::by_name("low").unwrap();
        let a = output_height(640, 480, 80, &low);
        let b = output_height(640, 480, 80, &low);
        assert_eq!(a, b);
        assert_eq!(a, 33); // 480/640 × 80 × 0.55 = 33.0
    }

    #[test]
    fn block_ramps_use_tighter_aspect() {
        let low = QualityProfile::by_name("low").unwrap();
        let high = QualityProfile::by_name("high").unwrap();
        let ascii_h = output_height(1920, 1080, 100, &low);
        let block_h = output_height(1920, 1080, 100, &high);
        assert!(block_h < ascii_h);
    }

    #[test]
    fn height_clamped_to_one() {
        let low = QualityProfile::by_name("low").unwrap();
        // Source pathologiquement large et plate.
        assert_eq!(output_height(10_000, 1, 1, &low), 1);
        assert_eq!(output_height(0, 480, 80, &low), 1);
    }

    #[test]
    fn resize_averages_area_not_point_samples() {
        // Damier 2×1 noir/blanc réduit en 1×1 : la moyenne de zone donne
        // un gris, le point sampling donnerait l'un des extrêmes.
        let mut src = PixelGrid::new(2, 2);
        src.set_pixel(0, 0, (255, 255, 255));
        src.set_pixel(1, 1, (255, 255, 255));
        let mut r = Resizer::new();
        let low = QualityProfile::by_name("low").unwrap();
        let out = r.resize(&src, 1, &low);
        let out = out.unwrap();
        assert_eq!(out.width, 1);
        let (v, _, _) = out.pixel(0, 0);
        assert!(v > 30 && v < 225, "moyenne de zone attendue, eu {v}");
    }

    #[test]
    fn solid_color_survives_downsample() {
        let mut src = PixelGrid::new(10, 10);
        for y in 0..10 {
            for x in 0..10 {
                src.set_pixel(x, y, (128, 128, 128));
            }
        }
        let mut r = Resizer::new();
        let low = QualityProfile::by_name("low").unwrap();
        let out = r.resize(&src, 5, &low).unwrap();
        assert_eq!(out.width, 5);
        assert_eq!(out.height, 3); // round(10/10 × 5 × 0.55)
        for y in 0..out.height {
            for x in 0..out.width {
                assert_eq!(out.pixel(x, y), (128, 128, 128));
            }
        }
    }
}
