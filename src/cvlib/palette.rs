use std::collections::HashMap;

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

pub const PALETTE_SIZE: usize = 80;
// fixed seed, the same category must get the same color in every run
const SHUFFLE_SEED: u64 = 42;

fn hsv_to_rgb(h: f64, s: f64, v: f64) -> [u8; 3] {
    let i = (h * 6.0).floor();
    let f = h * 6.0 - i;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    let (r, g, b) = match (i as i64).rem_euclid(6) {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    [(r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8]
}

/// 80 colors evenly spaced in hue at full saturation and value, shuffled with a
/// fixed seed so overlay colors are stable across sessions.
pub fn make_palette() -> Vec<[u8; 3]> {
    let mut colors = (0..PALETTE_SIZE)
        .map(|i| hsv_to_rgb(i as f64 / PALETTE_SIZE as f64, 1.0, 1.0))
        .collect::<Vec<_>>();
    let mut rng = StdRng::seed_from_u64(SHUFFLE_SEED);
    colors.shuffle(&mut rng);
    colors
}

/// Maps each category id to a palette color by its position in the given
/// sequence. More ids than palette entries wrap around via modulo indexing.
pub fn assign_colors(cat_ids: &[u32]) -> HashMap<u32, [u8; 3]> {
    let palette = make_palette();
    cat_ids
        .iter()
        .enumerate()
        .map(|(i, cat_id)| (*cat_id, palette[i % PALETTE_SIZE]))
        .collect()
}

#[test]
fn test_palette_deterministic() {
    assert_eq!(make_palette(), make_palette());
    let ids = (0..17).collect::<Vec<u32>>();
    assert_eq!(assign_colors(&ids), assign_colors(&ids));
}

#[test]
fn test_palette_full_value() {
    let palette = make_palette();
    assert_eq!(palette.len(), PALETTE_SIZE);
    // full saturation/value means every color has a channel at 255
    for color in palette {
        assert!(color.iter().any(|c| *c == 255), "{color:?}");
    }
}

#[test]
fn test_assign_wraps() {
    let ids = (0..85).collect::<Vec<u32>>();
    let colors = assign_colors(&ids);
    assert_eq!(colors.len(), 85);
    // positions 0 and 80 share a palette slot
    assert_eq!(colors[&ids[0]], colors[&ids[80]]);
    assert_ne!(colors[&ids[0]], colors[&ids[1]]);
}
