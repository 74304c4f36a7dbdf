use super::*;

#[test]
fn over_with_transparent_src_keeps_dst() {
    let dst = [10, 20, 30, 40];
    assert_eq!(premul_over_px(dst, [255, 255, 255, 0]), dst);
}

#[test]
fn over_with_opaque_src_replaces_dst() {
    assert_eq!(premul_over_px([0, 0, 0, 255], [255, 0, 0, 255]), [255, 0, 0, 255]);
}

#[test]
fn crossfade_endpoints_are_exact() {
    let a = [10, 20, 30, 40];
    let b = [200, 210, 220, 230];
    assert_eq!(crossfade_px(a, b, 0.0), a);
    assert_eq!(crossfade_px(a, b, 1.0), b);
}

#[test]
fn over_opacity_zero_is_noop() {
    let mut dst = vec![1u8, 2, 3, 4];
    premul_over_in_place_opacity(&mut dst, &[200, 200, 200, 200], 0.0).unwrap();
    assert_eq!(dst, vec![1, 2, 3, 4]);
}

#[test]
fn over_rejects_mismatched_buffers() {
    let mut dst = vec![0u8; 8];
    assert!(premul_over_in_place_opacity(&mut dst, &[0u8; 4], 1.0).is_err());
}

#[test]
fn unit_scale_is_a_plain_over() {
    let (w, h) = (3u32, 2u32);
    let src: Vec<u8> = (0..w * h)
        .flat_map(|i| [i as u8 * 10, 0, 0, 255])
        .collect();
    let mut dst = vec![0u8; src.len()];
    scaled_over_in_place(&mut dst, &src, w, h, 1.0, 1.0, 1.0).unwrap();
    assert_eq!(dst, src);
}

#[test]
fn zero_scale_draws_nothing() {
    let src = vec![255u8; 16];
    let mut dst = vec![0u8; 16];
    scaled_over_in_place(&mut dst, &src, 2, 2, 0.0, 1.0, 1.0).unwrap();
    assert!(dst.iter().all(|&v| v == 0));
}

#[test]
fn half_scale_shrinks_about_the_center() {
    let (w, h) = (4u32, 4u32);
    let src = [0u8, 255, 0, 255].repeat((w * h) as usize);
    let mut dst = vec![0u8; src.len()];
    scaled_over_in_place(&mut dst, &src, w, h, 0.5, 0.5, 1.0).unwrap();
    let covered = dst.chunks_exact(4).filter(|px| px[3] == 255).count();
    assert_eq!(covered, 4);
    assert_eq!(sample_px(&dst, w, h, 0, 0), [0, 0, 0, 0]);
    assert_eq!(sample_px(&dst, w, h, 1, 1), [0, 255, 0, 255]);
}

#[test]
fn coverage_scales_pixels() {
    let mut buf = vec![200u8, 100, 50, 255, 200, 100, 50, 255];
    apply_coverage_in_place(&mut buf, &[0, 255]);
    assert_eq!(&buf[0..4], &[0, 0, 0, 0]);
    assert_eq!(&buf[4..8], &[200, 100, 50, 255]);
}

#[test]
fn tint_keeps_alpha_as_coverage() {
    let mut buf = vec![255u8, 255, 255, 255, 9, 9, 9, 0];
    tint_alpha_in_place(&mut buf, [0, 0, 128, 128]);
    assert_eq!(&buf[0..4], &[0, 0, 128, 128]);
    assert_eq!(&buf[4..8], &[0, 0, 0, 0]);
}

#[test]
fn translate_moves_and_clears() {
    let (w, h) = (3u32, 1u32);
    let src = vec![1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3];
    let out = translate(&src, w, h, 1, 0);
    assert_eq!(out, vec![0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2]);
}

#[test]
fn blur_radius_zero_is_identity() {
    let src = vec![1u8, 2, 3, 4, 5, 6, 7, 8];
    assert_eq!(blur_rgba8_premul(&src, 1, 2, 0).unwrap(), src);
}

#[test]
fn blur_preserves_constant_images() {
    let (w, h) = (4u32, 3u32);
    let src = [10u8, 20, 30, 40].repeat((w * h) as usize);
    assert_eq!(blur_rgba8_premul(&src, w, h, 3).unwrap(), src);
}

#[test]
fn blur_spreads_a_single_pixel() {
    let (w, h) = (5u32, 5u32);
    let mut src = vec![0u8; (w * h * 4) as usize];
    let center = ((2 * w + 2) * 4) as usize;
    src[center..center + 4].copy_from_slice(&[255, 255, 255, 255]);
    let out = blur_rgba8_premul(&src, w, h, 2).unwrap();
    assert!(out.chunks_exact(4).filter(|px| px[3] != 0).count() > 1);
}

#[test]
fn rect_coverage_marks_inside_pixels() {
    let path = kurbo::Shape::to_path(&kurbo::Rect::new(0.0, 0.0, 2.0, 4.0), 0.1);
    let cov = path_coverage(4, 4, &path).unwrap();
    assert_eq!(cov[0], 255);
    assert_eq!(cov[3], 0);
}
