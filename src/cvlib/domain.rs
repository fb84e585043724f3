use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ShapeI {
    pub w: u32,
    pub h: u32,
}
impl ShapeI {
    pub fn new(w: u32, h: u32) -> Self {
        Self { w, h }
    }
}

/// Box as stored in annotation files, `(x, y)` is the top left corner and
/// coordinates are pixel units kept as floats like in the file.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Default)]
pub struct BbF {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}
impl BbF {
    /// `[x, y, w, h]`
    pub fn from_arr(a: &[f64; 4]) -> Self {
        BbF {
            x: a[0],
            y: a[1],
            w: a[2],
            h: a[3],
        }
    }
    pub fn x_max(&self) -> f64 {
        self.x + self.w
    }
    pub fn y_max(&self) -> f64 {
        self.y + self.h
    }
    pub fn has_area(&self) -> bool {
        self.w >= 1.0 && self.h >= 1.0
    }
}

/// Converts a flat `[x0, y0, x1, y1, ...]` polygon ring into coordinate pairs.
/// A trailing unpaired coordinate is dropped.
pub fn ring_points(flat: &[f64]) -> impl Iterator<Item = (f64, f64)> + '_ {
    flat.chunks_exact(2).map(|xy| (xy[0], xy[1]))
}

#[test]
fn test_bb() {
    let bb = BbF::from_arr(&[10.0, 20.0, 5.0, 4.0]);
    assert_eq!(bb.x_max(), 15.0);
    assert_eq!(bb.y_max(), 24.0);
    assert!(bb.has_area());
    assert!(!BbF::from_arr(&[0.0, 0.0, 0.5, 10.0]).has_area());
}

#[test]
fn test_ring_points() {
    let pts = ring_points(&[1.0, 2.0, 3.0, 4.0, 5.0]).collect::<Vec<_>>();
    assert_eq!(pts, vec![(1.0, 2.0), (3.0, 4.0)]);
    assert_eq!(ring_points(&[]).count(), 0);
}
