use serde::{Deserialize, Serialize};

/// A position in field coordinates (pixels, y grows downwards).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

pub fn distance(a: Point, b: Point) -> f32 {
    (b.x - a.x).hypot(b.y - a.y)
}

/// Places `n` targets on a ring of `pos_radius` around `home`.
///
/// Index 0 sits to the right of home and indices advance counter-clockwise on
/// screen, which is why the sine term is negated.
pub fn generate_target_positions(n: usize, home: Point, pos_radius: f32) -> Vec<Point> {
    if n == 0 {
        return Vec::new();
    }
    let step = 360.0 / n as f64;
    (0..n)
        .map(|i| {
            let angle = (i as f64 * step).to_radians();
            Point {
                x: home.x + (pos_radius as f64 * angle.cos()) as f32,
                y: home.y - (pos_radius as f64 * angle.sin()) as f32,
            }
        })
        .collect()
}

/// Home position plus the ring of targets, built once per session.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetLayout {
    home: Point,
    home_radius: f32,
    target_radius: f32,
    targets: Vec<Point>,
}

impl TargetLayout {
    pub fn new(
        home: Point,
        home_radius: f32,
        target_radius: f32,
        ring_radius: f32,
        n_targets: usize,
    ) -> Self {
        Self {
            home,
            home_radius,
            target_radius,
            targets: generate_target_positions(n_targets, home, ring_radius),
        }
    }

    pub fn home(&self) -> Point {
        self.home
    }

    pub fn home_radius(&self) -> f32 {
        self.home_radius
    }

    pub fn target_radius(&self) -> f32 {
        self.target_radius
    }

    pub fn targets(&self) -> &[Point] {
        &self.targets
    }

    pub fn target(&self, index: usize) -> Option<Point> {
        self.targets.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Strictly inside the home circle; the wait-for-home entry condition.
    pub fn is_inside_home(&self, p: Point) -> bool {
        distance(p, self.home) < self.home_radius
    }

    /// Strictly outside the home circle. A pointer exactly on the rim is
    /// neither inside nor outside.
    pub fn is_outside_home(&self, p: Point) -> bool {
        distance(p, self.home) > self.home_radius
    }

    pub fn hits_target(&self, index: usize, p: Point) -> bool {
        self.target(index)
            .is_some_and(|t| distance(p, t) < self.target_radius)
    }
}
