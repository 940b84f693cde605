/// Grille de pixels RGB. Row-major, 3 bytes par pixel, immuable une fois
/// remise au pipeline.
///
/// # Example
/// ```
/// use gc_core::frame::PixelGrid;
/// let grid = PixelGrid::new(10, 10);
/// assert_eq!(grid.data.len(), 300);
/// ```
#[derive(Clone)]
pub struct PixelGrid {
    /// Pixels RGB, row-major, 3 bytes par pixel.
    pub data: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl PixelGrid {
    /// Crée une grille noire aux dimensions données.
    ///
    /// # Example
    /// ```
    /// use gc_core::frame::PixelGrid;
    /// let grid = PixelGrid::new(100, 50);
    /// assert_eq!(grid.width, 100);
    /// assert_eq!(grid.height, 50);
    /// ```
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        // Taille calculée en usize : le produit de deux u32 peut
        // déborder le u32 pour des dimensions pathologiques.
        Self {
            data: vec![0u8; width as usize * height as usize * 3],
            width,
            height,
        }
    }

    /// Construit une grille depuis un buffer rgb24 existant.
    ///
    /// Retourne `None` si la taille du buffer ne correspond pas.
    #[must_use]
    pub fn from_rgb(data: Vec<u8>, width: u32, height: u32) -> Option<Self> {
        if data.len() != width as usize * height as usize * 3 {
            return None;
        }
        Some(Self {
            data,
            width,
            height,
        })
    }

    /// Accès au pixel (x, y) → (r, g, b).
    ///
    /// # Example
    /// ```
    /// use gc_core::frame::PixelGrid;
    /// let grid = PixelGrid::new(10, 10);
    /// assert_eq!(grid.pixel(0, 0), (0, 0, 0));
    /// ```
    #[inline(always)]
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> (u8, u8, u8) {
        debug_assert!(x < self.width && y < self.height, "pixel out of bounds");
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        if idx + 2 >= self.data.len() {
            return (0, 0, 0);
        }
        (self.data[idx], self.data[idx + 1], self.data[idx + 2])
    }

    /// Écrit le pixel (x, y). Utilisé par l'enhancer et les tests.
    #[inline(always)]
    pub fn set_pixel(&mut self, x: u32, y: u32, rgb: (u8, u8, u8)) {
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        if idx + 2 < self.data.len() {
            self.data[idx] = rgb.0;
            self.data[idx + 1] = rgb.1;
            self.data[idx + 2] = rgb.2;
        }
    }

    /// Luminance perceptuelle ITU-R BT.601 (0.299 R + 0.587 G + 0.114 B).
    ///
    /// # Example
    /// ```
    /// use gc_core::frame::PixelGrid;
    /// let mut grid = PixelGrid::new(1, 1);
    /// grid.set_pixel(0, 0, (255, 255, 255));
    /// assert_eq!(grid.luminance(0, 0), 255);
    /// ```
    #[inline(always)]
    #[must_use]
    pub fn luminance(&self, x: u32, y: u32) -> u8 {
        let (r, g, b) = self.pixel(x, y);
        ((u32::from(r) * 299 + u32::from(g) * 587 + u32::from(b) * 114) / 1000) as u8
    }
}

/// Couleur d'une cellule rendue.
///
/// `Default` n'émet aucune séquence d'échappement ; `Ansi` porte un index
/// dans la palette 256 couleurs (16..=255).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CellColor {
    /// Couleur par défaut du terminal (mode monochrome).
    #[default]
    Default,
    /// Index dans la palette ANSI 256 couleurs.
    Ansi(u8),
}

/// Single cell in the rendered grid: one glyph plus its color.
///
/// # Example
/// ```
/// use gc_core::frame::{Cell, CellColor};
/// let cell = Cell::default();
/// assert_eq!(cell.glyph, ' ');
/// assert_eq!(cell.color, CellColor::Default);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
    /// Caractère à afficher.
    pub glyph: char,
    /// Couleur foreground.
    pub color: CellColor,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            glyph: ' ',
            color: CellColor::Default,
        }
    }
}

/// Frame rendue : lignes ordonnées de cellules, taguée avec son index
/// source et son presentation timestamp. Immuable une fois produite.
#[derive(Clone)]
pub struct RenderedFrame {
    /// Rows of cells, top to bottom.
    pub rows: Vec<Vec<Cell>>,
    /// Index de la frame dans le flux de sortie (0-based).
    pub index: u64,
    /// Presentation timestamp en secondes.
    pub pts: f64,
}

impl RenderedFrame {
    /// Largeur en cellules (0 si vide).
    #[must_use]
    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// Hauteur en cellules.
    #[must_use]
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Rendition texte brut : glyphes + '\n' par ligne, sans couleur.
    ///
    /// # Example
    /// ```
    /// use gc_core::frame::{Cell, CellColor, RenderedFrame};
    /// let row = vec![Cell { glyph: '@', color: CellColor::Default }; 3];
    /// let frame = RenderedFrame { rows: vec![row], index: 0, pts: 0.0 };
    /// assert_eq!(frame.to_plain_text(), "@@@\n");
    /// ```
    #[must_use]
    pub fn to_plain_text(&self) -> String {
        let mut out = String::with_capacity(self.rows.len() * (self.width() + 1));
        for row in &self.rows {
            for cell in row {
                out.push(cell.glyph);
            }
            out.push('\n');
        }
        out
    }
}

/// Frame brute remise par la source, taguée pour l'admission et le pacing.
pub struct SourceFrame {
    /// Pixels décodés.
    pub grid: PixelGrid,
    /// Index de la frame dans le flux source (0-based, strictement croissant).
    pub index: u64,
    /// Timestamp source en secondes.
    pub timestamp: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_grid_roundtrip() {
        let mut grid = PixelGrid::new(4, 3);
        grid.set_pixel(2, 1, (10, 20, 30));
        assert_eq!(grid.pixel(2, 1), (10, 20, 30));
        assert_eq!(grid.pixel(0, 0), (0, 0, 0));
    }

    #[test]
    fn from_rgb_rejects_wrong_size() {
        assert!(PixelGrid::from_rgb(vec![0u8; 11], 2, 2).is_none());
        assert!(PixelGrid::from_rgb(vec![0u8; 12], 2, 2).is_some());
    }

    #[test]
    fn from_rgb_rejects_overflowing_dimensions() {
        // 65536 × 65536 pixels = 2^32 : en arithmétique u32 le produit
        // boucle à 0 et un buffer vide passerait la vérification.
        assert!(PixelGrid::from_rgb(Vec::new(), 65_536, 65_536).is_none());
    }

    #[test]
    fn luminance_weights() {
        let mut grid = PixelGrid::new(3, 1);
        grid.set_pixel(0, 0, (255, 0, 0));
        grid.set_pixel(1, 0, (0, 255, 0));
        grid.set_pixel(2, 0, (0, 0, 255));
        assert_eq!(grid.luminance(0, 0), 76); // 0.299
        assert_eq!(grid.luminance(1, 0), 149); // 0.587
        assert_eq!(grid.luminance(2, 0), 29); // 0.114
    }

    #[test]
    fn plain_text_rows_terminated() {
        let row = vec![Cell::default(); 2];
        let frame = RenderedFrame {
            rows: vec![row.clone(), row],
            index: 0,
            pts: 0.0,
        };
        assert_eq!(frame.to_plain_text(), "  \n  \n");
    }
}
