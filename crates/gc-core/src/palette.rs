//! Quantization RGB → palette ANSI 256 couleurs.
//!
//! Deux branches : les couleurs quasi-grises vont sur la rampe de gris
//! 24 niveaux (232..=255), le reste sur le cube 6×6×6 (16..=231). La
//! branche gris évite la teinte parasite des gris quantifiés par cube.

/// Écart max entre canaux pour qu'une couleur soit traitée comme grise.
const GRAY_TOLERANCE: u8 = 10;

/// Valeurs réelles des 6 niveaux du cube xterm.
const CUBE_LEVELS: [u8; 6] = [0, 95, 135, 175, 215, 255];

/// Quantifie un triplet RGB vers un index de palette ANSI 256.
///
/// Gris (écart inter-canaux ≤ tolérance) : rampe 232..=255, avec les
/// extrêmes accrochés à 16 (noir) et 231 (blanc). Sinon : cube 6×6×6
/// avec les seuils xterm standard.
///
/// # Example
/// ```
/// use gc_core::palette::quantize;
/// assert_eq!(quantize(0, 0, 0), 16);
/// assert_eq!(quantize(255, 255, 255), 231);
/// assert_eq!(quantize(255, 0, 0), 196);
/// ```
#[inline]
#[must_use]
pub fn quantize(r: u8, g: u8, b: u8) -> u8 {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    if max - min <= GRAY_TOLERANCE {
        let v = luminance(r, g, b);
        return quantize_gray(v);
    }
    16 + 36 * cube_level(r) + 6 * cube_level(g) + cube_level(b)
}

/// Rampe de gris : 24 niveaux, extrêmes accrochés au noir/blanc du cube.
#[inline]
fn quantize_gray(v: u8) -> u8 {
    if v < 8 {
        16 // noir du cube
    } else if v > 248 {
        231 // blanc du cube
    } else {
        232 + ((u16::from(v) * 23) / 255) as u8
    }
}

/// Niveau 0..=5 d'un canal sur le cube xterm (0, 95, 135, 175, 215, 255).
#[inline]
fn cube_level(c: u8) -> u8 {
    if c < 48 {
        0
    } else if c < 115 {
        1
    } else {
        (c - 35) / 40
    }
}

#[inline]
fn luminance(r: u8, g: u8, b: u8) -> u8 {
    ((u32::from(r) * 299 + u32::from(g) * 587 + u32::from(b) * 114) / 1000) as u8
}

/// Index de palette → RGB. Utilisé par le rasterizer d'export pour
/// redonner ses couleurs à une grille de cellules.
///
/// # Example
/// ```
/// use gc_core::palette::ansi_to_rgb;
/// assert_eq!(ansi_to_rgb(16), (0, 0, 0));
/// assert_eq!(ansi_to_rgb(231), (255, 255, 255));
/// ```
#[must_use]
pub fn ansi_to_rgb(index: u8) -> (u8, u8, u8) {
    match index {
        16..=231 => {
            let c = index - 16;
            let r = CUBE_LEVELS[(c / 36) as usize];
            let g = CUBE_LEVELS[((c % 36) / 6) as usize];
            let b = CUBE_LEVELS[(c % 6) as usize];
            (r, g, b)
        }
        232..=255 => {
            let v = 8 + (index - 232) * 10;
            (v, v, v)
        }
        // 0..=15 : couleurs de base, jamais produites par quantize().
        _ => BASIC_COLORS[index as usize],
    }
}

/// Les 16 couleurs de base, pour un lookup total sur tout u8.
const BASIC_COLORS: [(u8, u8, u8); 16] = [
    (0, 0, 0),
    (128, 0, 0),
    (0, 128, 0),
    (128, 128, 0),
    (0, 0, 128),
    (128, 0, 128),
    (0, 128, 128),
    (192, 192, 192),
    (128, 128, 128),
    (255, 0, 0),
    (0, 255, 0),
    (255, 255, 0),
    (0, 0, 255),
    (255, 0, 255),
    (0, 255, 255),
    (255, 255, 255),
];
