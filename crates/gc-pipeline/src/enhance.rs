use gc_core::config::EnhanceSettings;
use gc_core::frame::PixelGrid;

/// Normalise contraste/brightness et réduit le bruit avant le resize.
///
/// Par canal : `(v − 128) × contrast + 128 + brightness`, clamp [0, 255].
/// Si `denoise > 0`, un passage de lissage moyenne chaque pixel avec ses
/// voisins immédiats, pondéré par la force. Sans effet de bord, mêmes
/// dimensions en sortie, aucun chemin d'erreur.
///
/// # Example
/// ```
/// use gc_core::config::EnhanceSettings;
/// use gc_core::frame::PixelGrid;
/// use gc_pipeline::enhance::enhance;
///
/// let grid = PixelGrid::new(4, 4);
/// let out = enhance(&grid, &EnhanceSettings::neutral());
/// assert_eq!(out.data, grid.data);
/// ```
#[must_use]
pub fn enhance(grid: &PixelGrid, settings: &EnhanceSettings) -> PixelGrid {
    let mut out = PixelGrid::new(grid.width, grid.height);
    for (dst, &src) in out.data.iter_mut().zip(&grid.data) {
        *dst = adjust_channel(src, settings.contrast, settings.brightness);
    }
    if settings.denoise > 0.0 {
        out = smooth(&out, settings.denoise.clamp(0.0, 1.0));
    }
    out
}

/// Contraste autour du point milieu 128, puis offset, puis clamp.
#[inline(always)]
fn adjust_channel(v: u8, contrast: f32, brightness: f32) -> u8 {
    let adjusted = (f32::from(v) - 128.0) * contrast + 128.0 + brightness;
    adjusted.clamp(0.0, 255.0) as u8
}

/// Lissage 3×3 : chaque pixel est mélangé avec la moyenne de son
/// voisinage (bords tronqués) selon `strength` ∈ (0, 1].
fn smooth(grid: &PixelGrid, strength: f32) -> PixelGrid {
    let mut out = PixelGrid::new(grid.width, grid.height);
    for y in 0..grid.height {
        for x in 0..grid.width {
            let mut sum = [0u32; 3];
            let mut count = 0u32;
            for dy in -1i64..=1 {
                for dx in -1i64..=1 {
                    let nx = i64::from(x) + dx;
                    let ny = i64::from(y) + dy;
                    if nx < 0 || ny < 0 || nx >= i64::from(grid.width) || ny >= i64::from(grid.height)
                    {
                        continue;
                    }
                    let (r, g, b) = grid.pixel(nx as u32, ny as u32);
                    sum[0] += u32::from(r);
                    sum[1] += u32::from(g);
                    sum[2] += u32::from(b);
                    count += 1;
                }
            }
            let (r, g, b) = grid.pixel(x, y);
            let blend = |orig: u8, avg: u32| -> u8 {
                let avg = avg as f32 / count as f32;
                (f32::from(orig) * (1.0 - strength) + avg * strength).round() as u8
            };
            out.set_pixel(x, y, (blend(r, sum[0]), blend(g, sum[1]), blend(b, sum[2])));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_settings_are_a_noop() {
        let mut grid = PixelGrid::new(3, 3);
        grid.set_pixel(1, 1, (12, 200, 99));
        let out = enhance(&grid, &EnhanceSettings::neutral());
        assert_eq!(out.data, grid.data);
    }

    #[test]
    fn contrast_pivots_around_midpoint() {
        let mut grid = PixelGrid::new(2, 1);
        grid.set_pixel(0, 0, (128, 128, 128));
        grid.set_pixel(1, 0, (64, 192, 128));
        let settings = EnhanceSettings {
            contrast: 2.0,
            brightness: 0.0,
            denoise: 0.0,
        };
        let out = enhance(&grid, &settings);
        assert_eq!(out.pixel(0, 0), (128, 128, 128)); // le milieu ne bouge pas
        assert_eq!(out.pixel(1, 0), (0, 255, 128)); // écarts doublés + clamp
    }

    #[test]
    fn brightness_offsets_and_clamps() {
        let mut grid = PixelGrid::new(1, 1);
        grid.set_pixel(0, 0, (250, 10, 100));
        let settings = EnhanceSettings {
            contrast: 1.0,
            brightness: 20.0,
            denoise: 0.0,
        };
        let out = enhance(&grid, &settings);
        assert_eq!(out.pixel(0, 0), (255, 30, 120));
    }

    #[test]
    fn full_denoise_on_uniform_grid_is_stable() {
        let mut grid = PixelGrid::new(4, 4);
        for y in 0..4 {
            for x in 0..4 {
                grid.set_pixel(x, y, (77, 77, 77));
            }
        }
        let settings = EnhanceSettings {
            contrast: 1.0,
            brightness: 0.0,
            denoise: 1.0,
        };
        let out = enhance(&grid, &settings);
        assert_eq!(out.data, grid.data);
    }

    #[test]
    fn denoise_pulls_outlier_toward_neighbors() {
        let mut grid = PixelGrid::new(3, 3);
        grid.set_pixel(1, 1, (255, 255, 255));
        let settings = EnhanceSettings {
            contrast: 1.0,
            brightness: 0.0,
            denoise: 1.0,
        };
        let out = enhance(&grid, &settings);
        let (r, _, _) = out.pixel(1, 1);
        assert!(r < 255);
    }
}
