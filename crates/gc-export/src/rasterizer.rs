use std::collections::HashMap;
use std::path::Path;

use ab_glyph::{Font, FontVec, PxScale, point};
use rayon::prelude::*;

use gc_core::frame::{CellColor, RenderedFrame};
use gc_core::palette;

/// Polices monospace candidates, par OS. Même stratégie de découverte
/// que l'outil historique : premier chemin existant gagne.
const FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/TTF/DejaVuSansMono.ttf",
    "/usr/share/fonts/dejavu/DejaVuSansMono.ttf",
    "/System/Library/Fonts/Monaco.ttf",
    "C:/Windows/Fonts/consola.ttf",
    "C:/Windows/Fonts/cour.ttf",
    "C:/Windows/Fonts/lucon.ttf",
];

/// Charge la première police monospace disponible sur le système.
///
/// # Errors
/// Aucune police candidate trouvée ou fichier illisible.
pub fn load_system_font() -> anyhow::Result<FontVec> {
    for candidate in FONT_PATHS {
        let path = Path::new(candidate);
        if path.exists() {
            let data = std::fs::read(path)?;
            log::debug!("Police export : {candidate}");
            return FontVec::try_from_vec(data)
                .map_err(|e| anyhow::anyhow!("Police invalide {candidate}: {e}"));
        }
    }
    anyhow::bail!(
        "Aucune police monospace trouvée (cherché : {})",
        FONT_PATHS.join(", ")
    )
}

/// Convertit des frames de cellules en pixels RGB haute résolution.
/// Atlas de glyphes pré-calculé : aucune rasterisation dans le hot-loop.
pub struct Rasterizer {
    char_width: u32,
    char_height: u32,
    /// Buffer alpha 1D par caractère (char_width × char_height).
    glyph_cache: HashMap<char, Vec<u8>>,
    /// Glyphe vide pré-alloué pour les caractères hors atlas.
    empty_glyph: Vec<u8>,
}

impl Rasterizer {
    /// Initialise le rasterizer en pré-calculant les caractères des
    /// rampes de qualité (ASCII imprimable + blocs Unicode).
    ///
    /// # Errors
    /// Police système introuvable ou invalide.
    pub fn new(scale_px: f32) -> anyhow::Result<Self> {
        let font = load_system_font()?;
        let scale = PxScale::from(scale_px);

        let v_advance = font.ascent_unscaled() - font.descent_unscaled() + font.line_gap_unscaled();
        let height = (v_advance * scale.y / font.height_unscaled()).ceil() as u32;

        let m_glyph = font.glyph_id('M');
        let h_advance = font.h_advance_unscaled(m_glyph);
        let width = (h_advance * scale.x / font.height_unscaled()).ceil() as u32;

        let char_width = width.max(1);
        let char_height = height.max(1);

        let mut rasterizer = Self {
            char_width,
            char_height,
            glyph_cache: HashMap::new(),
            empty_glyph: vec![0u8; (char_width * char_height) as usize],
        };

        rasterizer.cache_charset(&font, scale, 32..=126);
        // Blocs Unicode (rampes high/ultra : █▉▊▋▌▍▎▏ ░▒▓)
        rasterizer.cache_charset(&font, scale, 0x2580..=0x259F);

        Ok(rasterizer)
    }

    fn cache_charset(&mut self, font: &FontVec, scale: PxScale, range: std::ops::RangeInclusive<u32>) {
        for codepoint in range {
            if let Some(ch) = std::char::from_u32(codepoint) {
                // Skip les caractères absents de la police (glyph 0 = .notdef)
                // pour ne pas dessiner de boîtes "?" dans la vidéo exportée.
                let gid = font.glyph_id(ch);
                if gid.0 == 0 && ch != '\0' {
                    continue;
                }

                let mut buffer = vec![0u8; (self.char_width * self.char_height) as usize];

                let ascent_px = font.ascent_unscaled() * scale.y / font.height_unscaled();
                let glyph = gid.with_scale_and_position(scale, point(0.0, ascent_px));

                if let Some(outline) = font.outline_glyph(glyph) {
                    let bounds = outline.px_bounds();
                    #[allow(clippy::cast_possible_wrap)]
                    outline.draw(|x, y, v| {
                        let px = (x as i32 + bounds.min.x as i32).max(0) as u32;
                        let py = (y as i32 + bounds.min.y as i32).max(0) as u32;
                        if px < self.char_width && py < self.char_height {
                            let idx = (py * self.char_width + px) as usize;
                            buffer[idx] = (v * 255.0) as u8;
                        }
                    });
                }

                self.glyph_cache.insert(ch, buffer);
            }
        }
    }

    /// Largeur d'une cellule en pixels.
    #[must_use]
    pub fn char_width(&self) -> u32 {
        self.char_width
    }

    /// Hauteur d'une cellule en pixels.
    #[must_use]
    pub fn char_height(&self) -> u32 {
        self.char_height
    }

    /// Dimensions en pixels de l'image produite pour une grille donnée,
    /// arrondies au pair supérieur (contrainte encodeur H.264).
    #[must_use]
    pub fn image_dimensions(&self, cols: usize, rows: usize) -> (u32, u32) {
        let w = self.char_width * cols as u32;
        let h = self.char_height * rows as u32;
        (w + (w & 1), h + (h & 1))
    }

    /// Rasterise une frame : chaque cellule devient un bloc de pixels,
    /// glyphe composité sur la couleur de fond par son canal alpha.
    /// Lignes de cellules traitées en parallèle (bandes disjointes).
    #[must_use]
    pub fn rasterize(
        &self,
        frame: &RenderedFrame,
        background: (u8, u8, u8),
        img_w: u32,
        img_h: u32,
    ) -> Vec<u8> {
        let mut pixels = vec![0u8; (img_w * img_h * 3) as usize];
        // Remplir le fond (y compris les marges de padding pair).
        for px in pixels.chunks_exact_mut(3) {
            px[0] = background.0;
            px[1] = background.1;
            px[2] = background.2;
        }

        let band_stride = (self.char_height * img_w * 3) as usize;
        pixels
            .par_chunks_mut(band_stride)
            .zip(frame.rows.par_iter())
            .for_each(|(band, row)| {
                for (col, cell) in row.iter().enumerate() {
                    let alpha = self.glyph_cache.get(&cell.glyph).unwrap_or(&self.empty_glyph);
                    let fg = match cell.color {
                        CellColor::Ansi(idx) => palette::ansi_to_rgb(idx),
                        CellColor::Default => (255, 255, 255),
                    };
                    let x0 = col as u32 * self.char_width;
                    for gy in 0..self.char_height {
                        for gx in 0..self.char_width {
                            let px = x0 + gx;
                            if px >= img_w {
                                continue;
                            }
                            let a = u32::from(alpha[(gy * self.char_width + gx) as usize]);
                            if a == 0 {
                                continue;
                            }
                            let idx = ((gy * img_w + px) * 3) as usize;
                            band[idx] = blend(background.0, fg.0, a);
                            band[idx + 1] = blend(background.1, fg.1, a);
                            band[idx + 2] = blend(background.2, fg.2, a);
                        }
                    }
                }
            });

        pixels
    }
}

/// Composite alpha 8-bit : `bg + (fg − bg) × a / 255`.
#[inline(always)]
fn blend(bg: u8, fg: u8, a: u32) -> u8 {
    let bg = u32::from(bg);
    let fg = u32::from(fg);
    ((bg * (255 - a) + fg * a) / 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blend_endpoints() {
        assert_eq!(blend(0, 255, 0), 0);
        assert_eq!(blend(0, 255, 255), 255);
        assert_eq!(blend(10, 10, 128), 10);
    }

    #[test]
    fn image_dimensions_are_even() {
        // Indépendant de la présence d'une police : la parité se teste
        // sur la formule seule.
        let r = Rasterizer {
            char_width: 7,
            char_height: 13,
            glyph_cache: HashMap::new(),
            empty_glyph: vec![0u8; 7 * 13],
        };
        let (w, h) = r.image_dimensions(3, 3);
        assert_eq!(w % 2, 0);
        assert_eq!(h % 2, 0);
        assert!(w >= 21 && h >= 39);
    }
}
