#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

// Depth range of the view volume. Particles leave the z = 0 plane only by the
// lens radius, so this is generous.
const DEPTH: f32 = 100.0;

// Keeps [-extent, extent]^2 visible, letterboxing the rest of the target.
pub fn view_projection(extent: f32, aspect: f32) -> cgmath::Matrix4<f32> {
    let extent = extent.abs().max(f32::EPSILON);
    let projection = if aspect > 1.0 {
        // Target is wider than the view, extend left and right.
        let half_width = extent * aspect;
        cgmath::ortho(-half_width, half_width, -extent, extent, -DEPTH, DEPTH)
    } else {
        // Target is taller than the view, extend top and bottom.
        let half_height = extent / aspect.max(f32::EPSILON);
        cgmath::ortho(-extent, extent, -half_height, half_height, -DEPTH, DEPTH)
    };
    OPENGL_TO_WGPU_MATRIX * projection
}

// Inverse of `view_projection` on the z = 0 plane.
pub fn screen_to_world(extent: f32, size: (u32, u32), pixel: (f64, f64)) -> [f32; 2] {
    let (width, height) = (size.0.max(1) as f32, size.1.max(1) as f32);
    let aspect = width / height;
    let ndc_x = 2.0 * pixel.0 as f32 / width - 1.0;
    let ndc_y = 1.0 - 2.0 * pixel.1 as f32 / height;
    let extent = extent.abs().max(f32::EPSILON);
    if aspect > 1.0 {
        [ndc_x * extent * aspect, ndc_y * extent]
    } else {
        [ndc_x * extent, ndc_y * extent / aspect]
    }
}

pub fn to_raw(matrix: &cgmath::Matrix4<f32>) -> [[f32; 4]; 4] {
    (*matrix).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Vector4, Zero};

    fn project(m: &cgmath::Matrix4<f32>, x: f32, y: f32, z: f32) -> Vector4<f32> {
        *m * Vector4::new(x, y, z, 1.0)
    }

    #[test]
    fn wide_targets_keep_the_full_height() {
        let m = view_projection(1.0, 2.0);
        let corner = project(&m, 1.0, 1.0, 0.0);
        assert!((corner.x - 0.5).abs() < 1e-6);
        assert!((corner.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn tall_targets_keep_the_full_width() {
        let m = view_projection(2.0, 0.5);
        let corner = project(&m, 2.0, 2.0, 0.0);
        assert!((corner.x - 1.0).abs() < 1e-6);
        assert!((corner.y - 0.5).abs() < 1e-6);
    }

    #[test]
    fn screen_positions_round_trip() {
        let size = (1280, 720);
        let aspect = 1280.0 / 720.0;
        let m = view_projection(1.5, aspect);
        for pixel in &[(0.0, 0.0), (640.0, 360.0), (100.0, 700.0)] {
            let [x, y] = screen_to_world(1.5, size, *pixel);
            let clip = project(&m, x, y, 0.0);
            let back_x = (clip.x + 1.0) / 2.0 * 1280.0;
            let back_y = (1.0 - clip.y) / 2.0 * 720.0;
            assert!((back_x - pixel.0 as f32).abs() < 1e-2, "{} vs {:?}", back_x, pixel);
            assert!((back_y - pixel.1 as f32).abs() < 1e-2, "{} vs {:?}", back_y, pixel);
        }
        assert_eq!(screen_to_world(1.0, (100, 100), (50.0, 50.0)), [0.0, 0.0]);
    }

    #[test]
    fn depth_lands_in_the_wgpu_range() {
        let m = view_projection(1.0, 1.0);
        for z in &[-DEPTH + 1.0, 0.0, DEPTH - 1.0] {
            let p = project(&m, 0.0, 0.0, *z);
            assert!(p.z > 0.0 && p.z < 1.0, "{:?}", p);
        }
        assert!(project(&m, 0.0, 0.0, 0.0).truncate().truncate().is_zero());
    }
}
