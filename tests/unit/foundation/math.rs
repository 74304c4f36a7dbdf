use super::*;

#[test]
fn mul_div255_variants_align() {
    for x in [0u16, 1, 127, 255] {
        for y in [0u16, 1, 127, 255] {
            assert_eq!(u16::from(mul_div255_u8(x, y)), mul_div255_u16(x, y));
        }
    }
    assert_eq!(mul_div255_u16(255, 255), 255);
}

#[test]
fn unit_weight_clamps() {
    assert_eq!(unit_to_u8_weight(-1.0), 0);
    assert_eq!(unit_to_u8_weight(0.5), 128);
    assert_eq!(unit_to_u8_weight(7.0), 255);
}

#[test]
fn sanitize_coerces_non_finite_and_negative() {
    assert_eq!(sanitize_non_negative(f64::NAN), 0.0);
    assert_eq!(sanitize_non_negative(f64::INFINITY), 0.0);
    assert_eq!(sanitize_non_negative(-0.5), 0.0);
    assert_eq!(sanitize_non_negative(0.25), 0.25);
    assert_eq!(lerp(2.0, 4.0, 0.5), 3.0);
}
