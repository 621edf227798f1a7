//! The frustum visibility test: six planes extracted from a view-projection
//! matrix, each shifted outward by a chunk's bounding-sphere radius so a
//! whole chunk can be culled against a single point (its origin-relative
//! anchor) rather than testing all eight corners.

use glam::{Mat4, Vec3};

#[derive(Debug, Clone, Copy)]
struct Plane {
    normal: Vec3,
    distance: f32,
}

impl Plane {
    fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }
}

/// Six planes extracted from a view-projection matrix (row4 ± rowK),
/// normalized so `signed_distance` is in world units.
#[derive(Debug, Clone)]
pub struct Frustum {
    planes: [Plane; 6],
}

impl Frustum {
    pub fn from_view_projection(view_proj: Mat4) -> Self {
        let rows = [view_proj.row(0), view_proj.row(1), view_proj.row(2), view_proj.row(3)];
        let raw = [
            rows[3] + rows[0], // left
            rows[3] - rows[0], // right
            rows[3] + rows[1], // bottom
            rows[3] - rows[1], // top
            rows[3] + rows[2], // near
            rows[3] - rows[2], // far
        ];

        let planes = raw.map(|row| {
            let normal = Vec3::new(row.x, row.y, row.z);
            let length = normal.length();
            Plane { normal: normal / length, distance: row.w / length }
        });

        Self { planes }
    }

    /// The radius (world units) of a chunk's bounding sphere: half its
    /// cubic diagonal, `sqrt(3) * edge * block_len / 2`.
    pub fn chunk_bounding_radius(edge: i32, block_len: f32) -> f32 {
        3f32.sqrt() * edge as f32 * block_len / 2.0
    }

    /// True iff the sphere centered at `center` with radius `radius`
    /// intersects or lies inside every plane: `dot(c, n) + d >= -radius` for
    /// all six planes. `center` is the chunk's origin-relative anchor, i.e.
    /// its bounding sphere's world-space center relative to the
    /// render-origin chunk.
    pub fn chunk_visible(&self, center: Vec3, radius: f32) -> bool {
        self.planes.iter().all(|p| p.signed_distance(center) >= -radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn perspective(aspect: f32) -> Mat4 {
        Mat4::perspective_rh(std::f32::consts::FRAC_PI_2, aspect, 0.1, 1000.0)
    }

    #[test]
    fn chunk_directly_ahead_is_visible() {
        let frustum = Frustum::from_view_projection(perspective(16.0 / 9.0));
        let radius = Frustum::chunk_bounding_radius(32, 0.5);
        assert!(frustum.chunk_visible(Vec3::new(0.0, 0.0, -20.0), radius));
    }

    #[test]
    fn chunk_far_behind_camera_is_culled() {
        let frustum = Frustum::from_view_projection(perspective(16.0 / 9.0));
        let radius = Frustum::chunk_bounding_radius(32, 0.5);
        assert!(!frustum.chunk_visible(Vec3::new(0.0, 0.0, 500.0), radius));
    }

    #[test]
    fn chunk_far_off_to_the_side_is_culled() {
        let frustum = Frustum::from_view_projection(perspective(16.0 / 9.0));
        let radius = Frustum::chunk_bounding_radius(32, 0.5);
        assert!(!frustum.chunk_visible(Vec3::new(5000.0, 0.0, -20.0), radius));
    }

    #[test]
    fn chunk_straddling_a_plane_within_its_radius_is_kept() {
        let frustum = Frustum::from_view_projection(perspective(16.0 / 9.0));
        let radius = Frustum::chunk_bounding_radius(32, 0.5);
        // Near plane sits at z = -0.1; a chunk centered just behind the
        // camera but whose bounding sphere still crosses into view must not
        // be culled outright.
        assert!(frustum.chunk_visible(Vec3::new(0.0, 0.0, 0.0), radius));
    }
}
