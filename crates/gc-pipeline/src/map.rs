use gc_core::frame::{Cell, CellColor, PixelGrid};
use gc_core::palette;
use gc_core::quality::GlyphLut;

/// Mappe une grille de pixels redimensionnée vers une grille de cellules.
///
/// Par pixel : luminance → glyphe via la LUT ; en mode couleur, le RGB
/// est quantifié vers la palette ANSI 256. Total sur tout triplet RGB
/// valide — aucun chemin d'erreur.
///
/// # Example
/// ```
/// use gc_core::frame::PixelGrid;
/// use gc_core::quality::{GlyphLut, QualityProfile};
/// use gc_pipeline::map::map_cells;
///
/// let grid = PixelGrid::new(4, 2);
/// let lut = GlyphLut::new(&QualityProfile::by_name("low").unwrap());
/// let cells = map_cells(&grid, &lut, false);
/// assert_eq!(cells.len(), 2);
/// assert_eq!(cells[0].len(), 4);
/// assert_eq!(cells[0][0].glyph, '@'); // noir → ramp[0]
/// ```
#[must_use]
pub fn map_cells(grid: &PixelGrid, lut: &GlyphLut, color: bool) -> Vec<Vec<Cell>> {
    let mut rows = Vec::with_capacity(grid.height as usize);
    for y in 0..grid.height {
        let mut row = Vec::with_capacity(grid.width as usize);
        for x in 0..grid.width {
            let glyph = lut.map(grid.luminance(x, y));
            let cell_color = if color {
                let (r, g, b) = grid.pixel(x, y);
                CellColor::Ansi(palette::quantize(r, g, b))
            } else {
                CellColor::Default
            };
            row.push(Cell {
                glyph,
                color: cell_color,
            });
        }
        rows.push(row);
    }
    rows
}
