/// An axis-aligned cube. Never stored in the tree: each node's cube follows
/// from its position below the root.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Cube {
    pub minimum: [f32; 3],
    pub size: f32,
}

impl Cube {
    pub fn new(minimum: [f32; 3], size: f32) -> Self {
        Self { minimum, size }
    }

    /// Child `octant` has half the size; bit 0 of `octant` selects the +x
    /// half, bit 1 +y and bit 2 +z.
    pub fn child(&self, octant: usize) -> Self {
        let half = self.size * 0.5;
        let mut minimum = self.minimum;
        for (axis, coordinate) in minimum.iter_mut().enumerate() {
            if octant & (1 << axis) != 0 {
                *coordinate += half;
            }
        }
        Self {
            minimum,
            size: half,
        }
    }

    pub fn maximum(&self) -> [f32; 3] {
        self.minimum.map(|coordinate| coordinate + self.size)
    }

    pub fn center(&self) -> [f32; 3] {
        self.minimum.map(|coordinate| coordinate + self.size * 0.5)
    }

    /// Index of the child octant holding `point`
    pub fn octant_of(&self, point: [f32; 3]) -> usize {
        let center = self.center();
        (0..3)
            .filter(|axis| point[*axis] >= center[*axis])
            .fold(0, |octant, axis| octant | (1 << axis))
    }

    pub fn contains_point(&self, point: [f32; 3]) -> bool {
        let maximum = self.maximum();
        (0..3).all(|axis| point[axis] >= self.minimum[axis] && point[axis] < maximum[axis])
    }
}

/// An axis-aligned box given by its minimum and maximum corners.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Region {
    pub minimum: [f32; 3],
    pub maximum: [f32; 3],
}

impl Region {
    pub fn new(minimum: [f32; 3], maximum: [f32; 3]) -> Self {
        Self { minimum, maximum }
    }

    pub fn is_valid(&self) -> bool {
        (0..3).all(|axis| {
            self.minimum[axis].is_finite()
                && self.maximum[axis].is_finite()
                && self.minimum[axis] <= self.maximum[axis]
        })
    }

    pub fn contains_cube(&self, cube: &Cube) -> bool {
        let cube_maximum = cube.maximum();
        (0..3).all(|axis| {
            self.minimum[axis] <= cube.minimum[axis] && cube_maximum[axis] <= self.maximum[axis]
        })
    }

    pub fn intersects(&self, cube: &Cube) -> bool {
        let cube_maximum = cube.maximum();
        (0..3).all(|axis| {
            cube.minimum[axis] < self.maximum[axis] && self.minimum[axis] < cube_maximum[axis]
        })
    }

    pub fn contains_point(&self, point: [f32; 3]) -> bool {
        (0..3).all(|axis| point[axis] >= self.minimum[axis] && point[axis] < self.maximum[axis])
    }
}
