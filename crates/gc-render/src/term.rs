//! Sink de lecture live : blit des frames rendues dans le terminal via
//! crossterm, couleurs ANSI 256, écran alternatif.

use std::io::Write;

use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::terminal::{Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, queue};

use gc_core::error::SinkError;
use gc_core::frame::{CellColor, RenderedFrame};
use gc_core::traits::RenderSink;

/// Sink terminal. Entre sur l'écran alternatif à la construction, le
/// quitte au drop — le shell de l'utilisateur reste intact même si le
/// run abort.
pub struct TerminalSink<W: Write> {
    out: W,
    /// Dernière couleur émise, pour éviter les séquences redondantes.
    last_color: Option<CellColor>,
}

impl<W: Write> TerminalSink<W> {
    /// Prépare le terminal : écran alternatif, curseur caché.
    ///
    /// # Errors
    /// Échec d'écriture sur la sortie.
    pub fn new(mut out: W) -> Result<Self, SinkError> {
        queue!(out, EnterAlternateScreen, cursor::Hide)?;
        out.flush()?;
        log::debug!("Terminal prêt : écran alternatif, curseur caché");
        Ok(Self {
            out,
            last_color: None,
        })
    }

    /// Émet la couleur d'une cellule si elle diffère de la précédente.
    fn set_color(&mut self, color: CellColor) -> Result<(), SinkError> {
        if self.last_color == Some(color) {
            return Ok(());
        }
        match color {
            CellColor::Default => queue!(self.out, ResetColor)?,
            CellColor::Ansi(idx) => {
                queue!(self.out, SetForegroundColor(Color::AnsiValue(idx)))?;
            }
        }
        self.last_color = Some(color);
        Ok(())
    }
}

impl<W: Write> RenderSink for TerminalSink<W> {
    fn present(&mut self, frame: &RenderedFrame) -> Result<(), SinkError> {
        queue!(self.out, cursor::MoveTo(0, 0))?;
        for (y, row) in frame.rows.iter().enumerate() {
            queue!(self.out, cursor::MoveTo(0, y as u16))?;
            for cell in row {
                self.set_color(cell.color)?;
                queue!(self.out, Print(cell.glyph))?;
            }
        }
        queue!(self.out, ResetColor)?;
        self.last_color = Some(CellColor::Default);
        self.out.flush()?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        queue!(self.out, ResetColor, Clear(ClearType::All))?;
        self.out.flush()?;
        Ok(())
    }
}

impl<W: Write> Drop for TerminalSink<W> {
    fn drop(&mut self) {
        let _ = queue!(self.out, ResetColor, cursor::Show, LeaveAlternateScreen);
        let _ = self.out.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gc_core::frame::Cell;

    fn frame(rows: Vec<Vec<Cell>>) -> RenderedFrame {
        RenderedFrame {
            rows,
            index: 0,
            pts: 0.0,
        }
    }

    #[test]
    fn present_writes_glyphs_to_output() {
        let mut buf = Vec::new();
        {
            let mut sink = TerminalSink::new(&mut buf).unwrap();
            let row = vec![
                Cell {
                    glyph: '@',
                    color: CellColor::Default,
                },
                Cell {
                    glyph: '.',
                    color: CellColor::Default,
                },
            ];
            sink.present(&frame(vec![row])).unwrap();
            sink.finish().unwrap();
        }
        let text = String::from_utf8_lossy(&buf);
        assert!(text.contains('@'));
        assert!(text.contains('.'));
    }

    #[test]
    fn ansi_colors_are_emitted_once_per_run() {
        let mut buf = Vec::new();
        {
            let mut sink = TerminalSink::new(&mut buf).unwrap();
            let row = vec![
                Cell {
                    glyph: 'a',
                    color: CellColor::Ansi(196),
                },
                Cell {
                    glyph: 'b',
                    color: CellColor::Ansi(196),
                },
            ];
            sink.present(&frame(vec![row])).unwrap();
        }
        let text = String::from_utf8_lossy(&buf);
        // Une seule séquence 38;5;196 pour les deux cellules contiguës.
        assert_eq!(text.matches("38;5;196").count(), 1);
    }
}
