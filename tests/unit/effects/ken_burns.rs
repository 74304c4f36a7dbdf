use super::*;

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn hash_picks_motion_and_intensity() {
    // "a" = 97: 97 % 6 = 1 (zoom-out), 97 % 5 = 2.
    let kb = KenBurns::for_slide("a");
    assert_eq!(kb.motion, KenBurnsMotion::ZoomOut);
    assert!(approx(kb.intensity, 0.14));

    // "ab" = 195: 195 % 6 = 3 (pan-right), 195 % 5 = 0.
    let kb = KenBurns::for_slide("ab");
    assert_eq!(kb.motion, KenBurnsMotion::PanRight);
    assert!(approx(kb.intensity, 0.10));

    // "" hashes to 0.
    assert_eq!(KenBurns::for_slide("").motion, KenBurnsMotion::ZoomIn);
}

#[test]
fn same_id_always_gives_same_motion() {
    let a = KenBurns::for_slide("slide-42");
    let b = KenBurns::for_slide("slide-42");
    assert_eq!(a, b);
    let dest = Rect::new(0.0, 0.0, 100.0, 50.0);
    assert_eq!(a.draw_rect(dest, 0.37), b.draw_rect(dest, 0.37));
}

#[test]
fn zoom_in_grows_from_the_destination() {
    let kb = KenBurns {
        motion: KenBurnsMotion::ZoomIn,
        intensity: 0.2,
    };
    let dest = Rect::new(10.0, 20.0, 110.0, 70.0);
    assert_eq!(kb.draw_rect(dest, 0.0), dest);
    let end = kb.draw_rect(dest, 1.0);
    assert!(approx(end.width(), 120.0));
    assert!(approx(end.height(), 60.0));
    assert!(approx(end.center().x, dest.center().x));
}

#[test]
fn zoom_out_ends_at_the_destination() {
    let kb = KenBurns {
        motion: KenBurnsMotion::ZoomOut,
        intensity: 0.1,
    };
    let dest = Rect::new(0.0, 0.0, 200.0, 100.0);
    assert!(approx(kb.draw_rect(dest, 0.0).width(), 220.0));
    assert_eq!(kb.draw_rect(dest, 1.0), dest);
}

#[test]
fn pans_stay_scaled_and_cover_the_destination() {
    let dest = Rect::new(0.0, 0.0, 200.0, 100.0);
    for motion in [
        KenBurnsMotion::PanLeft,
        KenBurnsMotion::PanRight,
        KenBurnsMotion::PanUp,
        KenBurnsMotion::PanDown,
    ] {
        let kb = KenBurns {
            motion,
            intensity: 0.10,
        };
        for p in [0.0, 0.5, 1.0] {
            let r = kb.draw_rect(dest, p);
            assert!(approx(r.width(), 220.0));
            assert!(r.x0 <= dest.x0 + 1e-9 && r.x1 >= dest.x1 - 1e-9, "{motion:?} {p}");
            assert!(r.y0 <= dest.y0 + 1e-9 && r.y1 >= dest.y1 - 1e-9, "{motion:?} {p}");
        }
    }
}

#[test]
fn pan_right_moves_from_minus_to_plus_five_percent() {
    let kb = KenBurns {
        motion: KenBurnsMotion::PanRight,
        intensity: 0.12,
    };
    let dest = Rect::new(0.0, 0.0, 200.0, 100.0);
    assert!(approx(kb.draw_rect(dest, 0.0).center().x, 90.0));
    assert!(approx(kb.draw_rect(dest, 0.5).center().x, 100.0));
    assert!(approx(kb.draw_rect(dest, 1.0).center().x, 110.0));
}
