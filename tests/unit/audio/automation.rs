use super::*;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-5
}

#[test]
fn interpolates_between_points_and_holds_outside() {
    let mut c = GainAutomation::constant(0.0);
    c.push(2.0, 1.0);
    assert!(approx(c.value_at(-1.0), 0.0));
    assert!(approx(c.value_at(1.0), 0.5));
    assert!(approx(c.value_at(2.0), 1.0));
    assert!(approx(c.value_at(50.0), 1.0));
}

#[test]
fn coincident_points_step() {
    let mut c = GainAutomation::constant(1.0);
    c.push(0.0, 0.2);
    c.push(1.0, 0.2);
    assert!(approx(c.value_at(0.0), 0.2));
    assert!(approx(c.value_at(0.5), 0.2));
}

#[test]
fn out_of_order_push_is_clamped_forward() {
    let mut c = GainAutomation::constant(1.0);
    c.push(3.0, 0.0);
    c.push(1.0, 0.5);
    assert_eq!(c.points()[2].0, 3.0);
}

#[test]
fn fade_uses_two_seconds_or_half_the_timeline() {
    let c = fade_automation(10.0, 0.8, true, true);
    assert!(approx(c.value_at(0.0), 0.0));
    assert!(approx(c.value_at(1.0), 0.4));
    assert!(approx(c.value_at(5.0), 0.8));
    assert!(approx(c.value_at(9.0), 0.4));
    assert!(approx(c.value_at(10.0), 0.0));

    let short = fade_automation(2.0, 1.0, true, true);
    assert!(approx(short.value_at(0.5), 0.5));
    assert!(approx(short.value_at(1.0), 1.0));
    assert!(approx(short.value_at(1.5), 0.5));
}

#[test]
fn fade_flags_are_independent() {
    let only_out = fade_automation(10.0, 0.5, false, true);
    assert!(approx(only_out.value_at(0.0), 0.5));
    assert!(approx(only_out.value_at(9.0), 0.25));

    let none = fade_automation(10.0, 0.5, false, false);
    assert!(approx(none.value_at(9.99), 0.5));
}

#[test]
fn ducking_ramps_attack_hold_release() {
    let c = ducking_automation(&[TimeSpan::new(2.0, 4.0)], 0.2, 0.25, 0.6);
    assert!(approx(c.value_at(1.0), 1.0));
    assert!(approx(c.value_at(1.75), 1.0));
    assert!(approx(c.value_at(1.875), 0.6));
    assert!(approx(c.value_at(2.0), 0.2));
    assert!(approx(c.value_at(3.0), 0.2));
    assert!(approx(c.value_at(4.3), 0.6));
    assert!(approx(c.value_at(4.6), 1.0));
    assert!(approx(c.value_at(8.0), 1.0));
}

#[test]
fn ducking_at_timeline_start_ramps_from_zero() {
    let c = ducking_automation(&[TimeSpan::new(0.1, 1.0)], 0.0, 0.25, 0.6);
    assert!(approx(c.value_at(0.0), 1.0));
    assert!(approx(c.value_at(0.1), 0.0));
}
