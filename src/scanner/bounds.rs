// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! World-space bounding boxes of loaded scene objects

use serde::{Deserialize, Serialize};

use crate::model::Vec3;

/// Starting extent; any real scene shrinks past it on the first corner
const SEED_EXTENT: f64 = 10000.0;

/// One object of a loaded scene, as reported by a [`super::SceneLoader`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    /// Eight corners of the object's local bounding box
    pub bound_box: [Vec3; 8],
    /// Row-major 4x4 world transform
    pub matrix_world: [[f64; 4]; 4],
}

impl SceneObject {
    /// Object with an identity transform
    pub fn local(bound_box: [Vec3; 8]) -> Self {
        Self {
            bound_box,
            matrix_world: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Corners transformed into world space
    pub fn world_corners(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.bound_box.iter().map(|c| transform_point(&self.matrix_world, c))
    }
}

fn transform_point(m: &[[f64; 4]; 4], p: &Vec3) -> Vec3 {
    let mut out = [0.0; 3];
    for (i, row) in m.iter().take(3).enumerate() {
        out[i] = row[0] * p[0] + row[1] * p[1] + row[2] * p[2] + row[3];
    }
    out
}

/// Per-axis min/max over every world-space corner of every object.
///
/// An empty scene returns the seed extents unchanged.
pub fn scene_bounds(objects: &[SceneObject]) -> (Vec3, Vec3) {
    let mut min = [SEED_EXTENT; 3];
    let mut max = [-SEED_EXTENT; 3];

    for corner in objects.iter().flat_map(|o| o.world_corners()) {
        for axis in 0..3 {
            min[axis] = min[axis].min(corner[axis]);
            max[axis] = max[axis].max(corner[axis]);
        }
    }

    (min, max)
}

/// Corners of the box spanning `min`..`max`
pub fn box_corners(min: Vec3, max: Vec3) -> [Vec3; 8] {
    [
        [min[0], min[1], min[2]],
        [min[0], min[1], max[2]],
        [min[0], max[1], max[2]],
        [min[0], max[1], min[2]],
        [max[0], min[1], min[2]],
        [max[0], min[1], max[2]],
        [max[0], max[1], max[2]],
        [max[0], max[1], min[2]],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_cube_identity() {
        let cube = SceneObject::local(box_corners([-1.0, -1.0, -1.0], [1.0, 1.0, 1.0]));
        let (min, max) = scene_bounds(&[cube]);
        assert_eq!(min, [-1.0, -1.0, -1.0]);
        assert_eq!(max, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_translation_and_scale() {
        let mut obj = SceneObject::local(box_corners([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]));
        obj.matrix_world = [
            [2.0, 0.0, 0.0, 5.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 3.0, -1.0],
            [0.0, 0.0, 0.0, 1.0],
        ];
        let (min, max) = scene_bounds(&[obj]);
        assert_eq!(min, [5.0, 0.0, -1.0]);
        assert_eq!(max, [7.0, 1.0, 2.0]);
    }

    #[test]
    fn test_union_of_objects() {
        let a = SceneObject::local(box_corners([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]));
        let b = SceneObject::local(box_corners([-2.0, 0.5, 0.0], [0.5, 4.0, 0.25]));
        let (min, max) = scene_bounds(&[a, b]);
        assert_eq!(min, [-2.0, 0.0, 0.0]);
        assert_eq!(max, [1.0, 4.0, 1.0]);
    }

    #[test]
    fn test_empty_scene_keeps_seed() {
        let (min, max) = scene_bounds(&[]);
        assert_eq!(min, [10000.0; 3]);
        assert_eq!(max, [-10000.0; 3]);
    }
}
