use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

// f32 throughout: every buffer exchanged with the host is a Float32Array,
// so computing in f64 would only add conversion noise at the boundary.
pub const EPSILON: f32 = f32::EPSILON;

/// Resolution of [`PointKey`] quantization.
const KEY_QUANTUM: f32 = 1.0e-4;

/// Comparison and distance helpers shared by the 2D and 3D glam vectors.
pub trait VecExt: Copy {
    /// Positions closer than [`EPSILON`] are the same position.
    fn approx_eq(self, other: Self) -> bool;
    fn manhattan_distance(self, other: Self) -> f32;
    /// Angle between the two vectors in radians. Degenerate (zero length)
    /// inputs yield [`EPSILON`].
    fn direction_to(self, other: Self) -> f32;
    /// Unit vector, or `self` unchanged when the magnitude is not positive.
    fn normalized(self) -> Self;
}

impl VecExt for Vec3 {
    fn approx_eq(self, other: Self) -> bool {
        self.distance(other) < EPSILON
    }

    fn manhattan_distance(self, other: Self) -> f32 {
        let d = (self - other).abs();
        d.x + d.y + d.z
    }

    fn direction_to(self, other: Self) -> f32 {
        angle_between(self.dot(other), self.length() * other.length())
    }

    fn normalized(self) -> Self {
        let len = self.length();
        if len > 0.0 {
            self / len
        } else {
            self
        }
    }
}

impl VecExt for Vec2 {
    fn approx_eq(self, other: Self) -> bool {
        self.distance(other) < EPSILON
    }

    fn manhattan_distance(self, other: Self) -> f32 {
        let d = (self - other).abs();
        d.x + d.y
    }

    fn direction_to(self, other: Self) -> f32 {
        angle_between(self.dot(other), self.length() * other.length())
    }

    fn normalized(self) -> Self {
        let len = self.length();
        if len > 0.0 {
            self / len
        } else {
            self
        }
    }
}

fn angle_between(dot: f32, norms: f32) -> f32 {
    if norms <= 0.0 {
        return EPSILON;
    }
    (dot / norms).clamp(-1.0, 1.0).acos()
}

/// Projects onto the ground plane. The navigation geometry lives in XZ.
#[inline]
pub fn xz(v: Vec3) -> Vec2 {
    Vec2::new(v.x, v.z)
}

/// 2D cross product in the XZ plane. Positive for a counter-clockwise turn.
#[inline]
pub fn cross_xz(a: Vec3, b: Vec3) -> f32 {
    a.x * b.z - a.z * b.x
}

/// Hashable stand-in for a position, used for closed sets and adjacency
/// lookups.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointKey(i64, i64, i64);

impl From<Vec3> for PointKey {
    fn from(v: Vec3) -> Self {
        let q = |c: f32| (c / KEY_QUANTUM).round() as i64;
        PointKey(q(v.x), q(v.y), q(v.z))
    }
}

/// Fixed-size row-major 2D array, indexed as `(x, y)`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Matrix<T> {
    width: usize,
    height: usize,
    data: Vec<T>,
}

impl<T> Matrix<T> {
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn contains(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height
    }

    pub fn get(&self, x: usize, y: usize) -> Option<&T> {
        if self.contains(x, y) {
            self.data.get(y * self.width + x)
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, x: usize, y: usize) -> Option<&mut T> {
        if self.contains(x, y) {
            self.data.get_mut(y * self.width + x)
        } else {
            None
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.data.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.data.iter_mut()
    }
}

impl<T: Clone + Default> Matrix<T> {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![T::default(); width * height],
        }
    }
}

impl<T> Index<(usize, usize)> for Matrix<T> {
    type Output = T;

    fn index(&self, (x, y): (usize, usize)) -> &T {
        assert!(self.contains(x, y), "matrix index ({x}, {y}) out of bounds");
        &self.data[y * self.width + x]
    }
}

impl<T> IndexMut<(usize, usize)> for Matrix<T> {
    fn index_mut(&mut self, (x, y): (usize, usize)) -> &mut T {
        assert!(self.contains(x, y), "matrix index ({x}, {y}) out of bounds");
        &mut self.data[y * self.width + x]
    }
}
