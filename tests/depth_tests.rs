use glam::Vec4;
use stereogram_engine::depth::linearize_depth;
use stereogram_engine::{Camera, DepthMap};

const PLANES: [(f32, f32); 4] = [(0.1, 4.0), (0.1, 100.0), (1.0, 2.0), (0.5, 50.0)];

#[test]
fn near_plane_is_one_far_plane_is_zero() {
    for (near, far) in PLANES {
        assert!((linearize_depth(0.0, near, far) - 1.0).abs() < 1e-5);
        assert!(linearize_depth(1.0, near, far).abs() < 1e-4);
    }
}

#[test]
fn output_in_unit_range_and_decreasing() {
    for (near, far) in PLANES {
        let mut previous = f32::INFINITY;
        for i in 0..=1000 {
            let raw = i as f32 / 1000.0;
            let d = linearize_depth(raw, near, far);
            assert!((0.0..=1.0).contains(&d), "raw {raw} gave {d}");
            assert!(d <= previous, "not decreasing at raw {raw}");
            previous = d;
        }
    }
}

#[test]
fn undoes_the_camera_projection() {
    // a surface at view distance z must come out linear between the planes
    let camera = Camera::perspective(75.0, 1.5, 0.1, 4.0);
    let projection = camera.projection();
    for z in [0.1f32, 0.5, 1.0, 2.0, 3.0, 3.9] {
        let clip = projection * Vec4::new(0.0, 0.0, -z, 1.0);
        let raw = clip.z / clip.w;
        let expected = 1.0 - (z - camera.near) / (camera.far - camera.near);
        let got = linearize_depth(raw, camera.near, camera.far);
        assert!(
            (got - expected).abs() < 1e-3,
            "z={z}: expected {expected}, got {got}"
        );
    }
}

#[test]
fn hardware_buffer_is_linearized_per_pixel() {
    let raw = [0.0, 1.0, 0.0, 1.0, 0.0, 1.0];
    let map = DepthMap::from_hardware(3, 2, &raw, 0.1, 4.0).unwrap();
    assert_eq!((map.width(), map.height()), (3, 2));
    assert!((map.get(0, 0) - 1.0).abs() < 1e-5);
    assert!(map.get(1, 0).abs() < 1e-4);
}

#[test]
fn hardware_buffer_size_must_match() {
    assert!(DepthMap::from_hardware(4, 4, &[0.5; 10], 0.1, 4.0).is_none());
}

#[test]
fn depth_lookup_clamps_to_edges() {
    let map = DepthMap::from_fn(4, 2, |x, _| x as f32 / 4.0);
    assert_eq!(map.depth_at(-10.0, 0.5), 0.0);
    assert_eq!(map.depth_at(2.7, 0.5), 0.5);
    assert_eq!(map.depth_at(99.0, 99.0), 0.75);
}

#[test]
fn gray_image_maps_unit_range_to_bytes() {
    let map = DepthMap::from_fn(2, 1, |x, _| x as f32);
    let gray = map.to_gray_image();
    assert_eq!(gray.get_pixel(0, 0).0[0], 0);
    assert_eq!(gray.get_pixel(1, 0).0[0], 255);
}
