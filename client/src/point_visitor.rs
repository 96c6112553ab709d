use metavoxel_shared::{AttributeValue, MetavoxelInfo, MetavoxelVisitor, VisitAction};

/// One renderable sample of the tree
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Point {
    pub center: [f32; 3],
    pub size: f32,
    pub value: AttributeValue,
}

/// Flattens a tree into points, one per non-empty leaf region. Regions no
/// bigger than `minimum_size` are not descended into; they become a single
/// point carrying the region's own value.
pub struct PointVisitor {
    minimum_size: f32,
    points: Vec<Point>,
}

impl PointVisitor {
    pub fn new(minimum_size: f32) -> Self {
        Self {
            minimum_size,
            points: Vec::new(),
        }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn take_points(&mut self) -> Vec<Point> {
        std::mem::take(&mut self.points)
    }

    fn push(&mut self, info: &MetavoxelInfo) {
        if info.value.is_empty() {
            return;
        }
        self.points.push(Point {
            center: info.cube.center(),
            size: info.cube.size,
            value: info.value,
        });
    }
}

impl MetavoxelVisitor for PointVisitor {
    fn visit(&mut self, info: &MetavoxelInfo) -> VisitAction {
        if info.is_leaf {
            self.push(info);
            return VisitAction::Descend;
        }
        if info.cube.size <= self.minimum_size {
            self.push(info);
            return VisitAction::Prune;
        }
        VisitAction::Descend
    }
}
