use super::*;
use serde_json::json;

fn text_overlay(start: f64, duration: Option<f64>, end: Option<f64>) -> OverlayDef {
    OverlayDef {
        id: "t".to_owned(),
        kind: OverlayKind::Text(TextOverlay {
            text: "hello".to_owned(),
            font_size: 24.0,
            font_family: None,
            align: TextAlign::Left,
            wrap: true,
        }),
        x: 0.1,
        y: 0.1,
        width: 0.5,
        height: 0.2,
        space: OverlaySpace::Slide,
        start_time: start,
        duration,
        end_time: end,
        animation_in: OverlayAnimation::None,
        animation_out: OverlayAnimation::None,
        style: OverlayStyle::default(),
        hidden: false,
    }
}

#[test]
fn visibility_window_is_inclusive() {
    let o = text_overlay(2.0, Some(1.0), None);
    assert!(!o.is_visible_at(1.999, 5.0));
    assert!(o.is_visible_at(2.0, 5.0));
    assert!(o.is_visible_at(2.5, 5.0));
    assert!(o.is_visible_at(3.0, 5.0));
    assert!(!o.is_visible_at(3.001, 5.0));
}

#[test]
fn end_is_clamped_to_slide_duration() {
    let o = text_overlay(1.0, None, Some(9.0));
    assert_eq!(o.visible_window(4.0), (1.0, 4.0));
    let rest = text_overlay(1.5, None, None);
    assert_eq!(rest.visible_window(4.0), (1.5, 4.0));
    let late = text_overlay(5.0, Some(1.0), None);
    assert!(!late.is_visible_at(4.0, 4.0));
}

#[test]
fn hidden_overlays_are_never_visible() {
    let mut o = text_overlay(0.0, None, None);
    o.hidden = true;
    assert!(!o.is_visible_at(0.5, 4.0));
}

#[test]
fn slide_manifest_deserializes_with_defaults() {
    let slide: SlideDef = serde_json::from_value(json!({
        "id": "s1",
        "visual": { "kind": "color", "color": "#102030" },
        "duration": 3.0,
        "effect": "ken-burns",
        "overlays": [
            {
                "id": "caption",
                "type": "text",
                "text": "Hi",
                "fontSize": 32,
                "align": "center",
                "x": 0.1, "y": 0.8, "width": 0.8,
                "animationIn": "typewriter",
                "style": { "color": [1, 1, 0], "shadow": { "color": "#00000080", "blur": 4 } }
            },
            { "id": "arrow", "type": "arrow", "headSize": 12,
              "x": 0, "y": 0, "width": 0.5, "height": 0.5 },
            { "id": "pic", "type": "image", "asset": "logo",
              "x": 0, "y": 0, "width": 0.2, "height": 0.2, "space": "canvas" }
        ],
        "layerOrder": ["arrow", "__slide__", "caption"]
    }))
    .unwrap();

    assert_eq!(slide.transition, "fade");
    assert_eq!(slide.effect, EffectType::KenBurns);
    assert_eq!(slide.overlays.len(), 3);
    let OverlayKind::Text(text) = &slide.overlays[0].kind else {
        panic!("expected text overlay");
    };
    assert_eq!(text.align, TextAlign::Center);
    assert_eq!(text.font_size, 32.0);
    assert_eq!(slide.overlays[0].animation_in, OverlayAnimation::Typewriter);
    assert_eq!(slide.overlays[0].style.stroke_width, 3.0);
    assert!(slide.overlays[0].style.shadow.is_some());
    assert_eq!(
        slide.overlays[1].kind,
        OverlayKind::Arrow {
            head_size: Some(12.0)
        }
    );
    assert_eq!(slide.overlays[2].space, OverlaySpace::Canvas);
}
