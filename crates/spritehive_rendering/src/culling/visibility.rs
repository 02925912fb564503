//! Point-in-frustum test for sprite culling.
//!
//! Sprites are small compared to the view, so a sprite is culled by its
//! anchor point alone: project it with the camera's view-projection matrix
//! and check that it lands inside the unit square in front of the camera.

use glam::{Mat4, Vec3, Vec4Swizzles};

/// Returns true if `point` projects inside the screen and in front of the
/// camera.
///
/// Pure and allocation-free, safe to call from any worker.
#[inline]
#[must_use]
pub fn is_visible(view_projection: &Mat4, point: Vec3) -> bool {
    let clip = *view_projection * point.extend(1.0);
    if clip.w <= 0.0 {
        return false;
    }
    let ndc = clip.xyz() / clip.w;
    (-1.0..=1.0).contains(&ndc.x) && (-1.0..=1.0).contains(&ndc.y) && ndc.z > 0.0
}

/// Camera matrix a frame was culled against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    /// Column-major view-projection matrix.
    pub view_projection: Mat4,
}

impl Frustum {
    /// Wraps a view-projection matrix.
    #[must_use]
    pub const fn new(view_projection: Mat4) -> Self {
        Self { view_projection }
    }

    /// Builds the frustum of a look-at perspective camera.
    #[must_use]
    pub fn perspective(eye: Vec3, target: Vec3, fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        let view = Mat4::look_at_rh(eye, target, Vec3::Y);
        let projection = Mat4::perspective_rh(fov_y, aspect, near, far);
        Self::new(projection * view)
    }

    /// Tests one point.
    #[inline]
    #[must_use]
    pub fn contains(&self, point: Vec3) -> bool {
        is_visible(&self.view_projection, point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_matrix() {
        let m = Mat4::IDENTITY;
        assert!(is_visible(&m, Vec3::new(0.0, 0.0, 0.5)));
        assert!(is_visible(&m, Vec3::new(1.0, -1.0, 0.5)));
        assert!(!is_visible(&m, Vec3::new(1.5, 0.0, 0.5)));
        assert!(!is_visible(&m, Vec3::new(0.0, 0.0, 0.0)));
        assert!(!is_visible(&m, Vec3::new(0.0, 0.0, -0.5)));
    }

    #[test]
    fn test_behind_camera_rejected() {
        let frustum = Frustum::perspective(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, 1.0, 1.0, 0.1, 100.0);
        assert!(frustum.contains(Vec3::ZERO));
        assert!(!frustum.contains(Vec3::new(0.0, 0.0, 20.0)));
        assert!(!frustum.contains(Vec3::new(100.0, 0.0, 0.0)));
    }

    #[test]
    fn test_negative_w_rejected() {
        let mut m = Mat4::IDENTITY;
        m.w_axis.w = -1.0;
        assert!(!is_visible(&m, Vec3::new(0.0, 0.0, 0.5)));
    }
}
