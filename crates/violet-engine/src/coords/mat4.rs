use super::Vec2;

/// Column-major 4×4 matrix, laid out the way WGSL `mat4x4<f32>` expects.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Mat4 {
    pub cols: [[f32; 4]; 4],
}

impl Mat4 {
    pub const IDENTITY: Mat4 = Mat4 {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Orthographic projection mapping `[left, right] × [top, bottom]` to clip space.
    ///
    /// Passing `top < bottom` gives the engine's +Y-down view convention.
    /// Depth maps `[near, far]` to `[0, 1]`.
    pub fn ortho(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
        let rl = right - left;
        let tb = top - bottom;
        let fnr = far - near;
        Mat4 {
            cols: [
                [2.0 / rl, 0.0, 0.0, 0.0],
                [0.0, 2.0 / tb, 0.0, 0.0],
                [0.0, 0.0, -1.0 / fnr, 0.0],
                [-(right + left) / rl, -(top + bottom) / tb, -near / fnr, 1.0],
            ],
        }
    }

    /// Projection for a view of `width × height` logical pixels, origin top-left.
    pub fn view_projection(width: f32, height: f32) -> Mat4 {
        Mat4::ortho(0.0, width.max(1.0), height.max(1.0), 0.0, -1.0, 1.0)
    }

    /// 2D model transform: translate to `pos`, rotate by `angle_deg`, then scale.
    pub fn transform_2d(pos: Vec2, scale: Vec2, angle_deg: f32) -> Mat4 {
        let (s, c) = angle_deg.to_radians().sin_cos();
        Mat4 {
            cols: [
                [c * scale.x, s * scale.x, 0.0, 0.0],
                [-s * scale.y, c * scale.y, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [pos.x, pos.y, 0.0, 1.0],
            ],
        }
    }

    /// Transforms a point on the z = 0 plane.
    #[inline]
    pub fn transform_point(&self, p: Vec2) -> Vec2 {
        let c = &self.cols;
        Vec2::new(
            c[0][0] * p.x + c[1][0] * p.y + c[3][0],
            c[0][1] * p.x + c[1][1] * p.y + c[3][1],
        )
    }
}

impl Default for Mat4 {
    fn default() -> Self {
        Mat4::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec2, b: Vec2) -> bool {
        (a.x - b.x).abs() < 1e-4 && (a.y - b.y).abs() < 1e-4
    }

    #[test]
    fn translate_only() {
        let m = Mat4::transform_2d(Vec2::new(10.0, 20.0), Vec2::one(), 0.0);
        assert!(close(m.transform_point(Vec2::new(1.0, 2.0)), Vec2::new(11.0, 22.0)));
    }

    #[test]
    fn rotation_is_applied_before_translation() {
        let m = Mat4::transform_2d(Vec2::new(5.0, 5.0), Vec2::one(), 90.0);
        // (1, 0) rotated 90° is (0, 1).
        assert!(close(m.transform_point(Vec2::new(1.0, 0.0)), Vec2::new(5.0, 6.0)));
    }

    #[test]
    fn scale_is_applied_first() {
        let m = Mat4::transform_2d(Vec2::zero(), Vec2::new(2.0, 3.0), 90.0);
        // (1, 1) scaled to (2, 3), then rotated to (-3, 2).
        assert!(close(m.transform_point(Vec2::new(1.0, 1.0)), Vec2::new(-3.0, 2.0)));
    }

    #[test]
    fn view_projection_maps_corners() {
        let m = Mat4::view_projection(400.0, 200.0);
        assert!(close(m.transform_point(Vec2::new(0.0, 0.0)), Vec2::new(-1.0, 1.0)));
        assert!(close(m.transform_point(Vec2::new(400.0, 200.0)), Vec2::new(1.0, -1.0)));
    }
}
