use gc_core::frame::{Cell, RenderedFrame};

/// Assemble une grille de cellules en `RenderedFrame` taguée.
///
/// Transformation de données pure, aucune I/O. Les lignes sont
/// auto-suffisantes : le sink peut les émettre indépendamment.
///
/// # Example
/// ```
/// use gc_core::frame::Cell;
/// use gc_pipeline::render::compose;
/// let frame = compose(vec![vec![Cell::default(); 3]], 7, 0.28);
/// assert_eq!(frame.index, 7);
/// assert_eq!(frame.width(), 3);
/// ```
#[must_use]
pub fn compose(rows: Vec<Vec<Cell>>, index: u64, pts: f64) -> RenderedFrame {
    RenderedFrame { rows, index, pts }
}
