use super::*;

const ALL: [TransitionKind; 6] = [
    TransitionKind::Fade,
    TransitionKind::Slide,
    TransitionKind::Wipe,
    TransitionKind::Zoom,
    TransitionKind::Flip,
    TransitionKind::CrossZoom,
];

fn layers(w: u32, h: u32) -> (Vec<u8>, Vec<u8>, Vec<u8>) {
    let bg = [0u8, 0, 0, 255].repeat((w * h) as usize);
    // A: opaque gradient with a transparent corner, B: half-transparent blue.
    let mut a = Vec::with_capacity((w * h * 4) as usize);
    for i in 0..w * h {
        if i == 0 {
            a.extend_from_slice(&[0, 0, 0, 0]);
        } else {
            a.extend_from_slice(&[(i * 7 % 256) as u8, 40, 10, 255]);
        }
    }
    let b = [0u8, 0, 100, 128].repeat((w * h) as usize);
    (bg, a, b)
}

fn still(bg: &[u8], layer: &[u8]) -> Vec<u8> {
    let mut out = bg.to_vec();
    premul_over_in_place_opacity(&mut out, layer, 1.0).unwrap();
    out
}

#[test]
fn endpoints_match_the_still_frames_for_every_kind() {
    let (w, h) = (8u32, 6u32);
    let (bg, a, b) = layers(w, h);
    let still_a = still(&bg, &a);
    let still_b = still(&bg, &b);
    for kind in ALL {
        let mut start = bg.clone();
        composite_transition(kind, &mut start, &a, &b, w, h, 0.0).unwrap();
        assert_eq!(start, still_a, "{kind:?} at p=0");

        let mut end = bg.clone();
        composite_transition(kind, &mut end, &a, &b, w, h, 1.0).unwrap();
        assert_eq!(end, still_b, "{kind:?} at p=1");
    }
}

#[test]
fn midpoints_differ_from_both_ends() {
    let (w, h) = (8u32, 6u32);
    let (bg, a, b) = layers(w, h);
    let still_a = still(&bg, &a);
    let still_b = still(&bg, &b);
    for kind in ALL {
        let mut mid = bg.clone();
        composite_transition(kind, &mut mid, &a, &b, w, h, 0.3).unwrap();
        assert_ne!(mid, still_a, "{kind:?}");
        assert_ne!(mid, still_b, "{kind:?}");
    }
}

#[test]
fn wipe_reveals_from_the_left() {
    let (w, h) = (4u32, 1u32);
    let bg = vec![0u8; 16];
    let a = [255u8, 0, 0, 255].repeat(4);
    let b = [0u8, 0, 255, 255].repeat(4);
    let mut dst = bg.clone();
    composite_transition(TransitionKind::Wipe, &mut dst, &a, &b, w, h, 0.5).unwrap();
    assert_eq!(&dst[0..8], &b[0..8]);
    assert_eq!(&dst[8..16], &a[8..16]);
}

#[test]
fn slide_moves_a_left_and_b_in_from_the_right() {
    let (w, h) = (4u32, 1u32);
    let a: Vec<u8> = (0..4u8).flat_map(|i| [i + 1, 0, 0, 255]).collect();
    let b: Vec<u8> = (0..4u8).flat_map(|i| [0, i + 1, 0, 255]).collect();
    let mut dst = vec![0u8; 16];
    composite_transition(TransitionKind::Slide, &mut dst, &a, &b, w, h, 0.25).unwrap();
    assert_eq!(&dst[0..4], &[2, 0, 0, 255]);
    assert_eq!(&dst[12..16], &[0, 1, 0, 255]);
}

#[test]
fn flip_shows_only_a_in_the_first_half() {
    let (w, h) = (8u32, 2u32);
    let a = [255u8, 0, 0, 255].repeat(16);
    let b = [0u8, 0, 255, 255].repeat(16);
    let mut dst = vec![0u8; 64];
    composite_transition(TransitionKind::Flip, &mut dst, &a, &b, w, h, 0.25).unwrap();
    assert!(dst.chunks_exact(4).all(|px| px[2] == 0));
    assert!(dst.chunks_exact(4).any(|px| px[3] == 0));
}

#[test]
fn unknown_names_fall_back_to_fade() {
    assert_eq!(TransitionKind::parse("cross-zoom"), TransitionKind::CrossZoom);
    assert_eq!(TransitionKind::parse("Wipe"), TransitionKind::Wipe);
    assert_eq!(TransitionKind::parse("spiral"), TransitionKind::Fade);
    assert_eq!(TransitionKind::parse(""), TransitionKind::Fade);
}

#[test]
fn mismatched_buffers_are_rejected() {
    let mut dst = vec![0u8; 16];
    assert!(
        composite_transition(TransitionKind::Fade, &mut dst, &[0u8; 16], &[0u8; 8], 2, 2, 0.5)
            .is_err()
    );
}
