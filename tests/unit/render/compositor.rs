use super::*;
use crate::composition::layers::normalize_layer_order;
use crate::composition::model::{
    OverlayAnimation, OverlayDef, OverlayKind, OverlaySpace, OverlayStyle, VisualDef,
};
use crate::composition::settings::{BackgroundDef, ResolutionTier};
use crate::encode::sink::InMemorySink;

const RED: ColorDef = ColorDef::rgba(1.0, 0.0, 0.0, 1.0);
const BLUE: ColorDef = ColorDef::rgba(0.0, 0.0, 1.0, 1.0);

fn slide_def(id: &str, duration: f64, color: ColorDef) -> SlideDef {
    SlideDef {
        id: id.to_owned(),
        visual: VisualDef::Color { color },
        duration,
        transition: "fade".to_owned(),
        transition_duration: None,
        effect: EffectType::None,
        crop: None,
        layout: None,
        overlays: Vec::new(),
        layer_order: Vec::new(),
        narration: None,
    }
}

fn prepared(def: SlideDef, color: ColorDef) -> PreparedSlide {
    let layers = normalize_layer_order(&def.layer_order, &def.overlays);
    PreparedSlide {
        def,
        visual: SlideVisual::Solid(color),
        layers,
    }
}

fn settings() -> VideoSettings {
    VideoSettings {
        resolution: ResolutionTier::P720,
        ..VideoSettings::default()
    }
}

fn compositor(settings: VideoSettings, slides: Vec<PreparedSlide>) -> Compositor {
    let background = match settings.background {
        BackgroundDef::White => BackgroundFill::Solid(ColorDef::WHITE),
        _ => BackgroundFill::Solid(ColorDef::BLACK),
    };
    Compositor::new(CompositorParts {
        settings,
        slides,
        background,
        fonts: FontRegistry::new(),
        images: OverlayImages::default(),
    })
    .unwrap()
}

fn two_slides() -> Compositor {
    compositor(
        settings(),
        vec![
            prepared(slide_def("a", 3.0, RED), RED),
            prepared(slide_def("b", 3.0, BLUE), BLUE),
        ],
    )
}

#[test]
fn slide_rect_fits_the_aspect_inside_the_scaled_box() {
    let canvas = Canvas {
        width: 1280,
        height: 720,
    };
    assert_eq!(
        slide_rect(canvas, 100.0, 1.0, None),
        Rect::new(280.0, 0.0, 1000.0, 720.0)
    );
    assert_eq!(
        slide_rect(canvas, 50.0, 1.0, None),
        Rect::new(460.0, 180.0, 820.0, 540.0)
    );
    assert_eq!(
        slide_rect(canvas, 100.0, 16.0 / 9.0, None),
        Rect::new(0.0, 0.0, 1280.0, 720.0)
    );
    let layout = SlideLayout {
        x: 0.25,
        y: 0.5,
        width: 0.5,
    };
    assert_eq!(
        slide_rect(canvas, 100.0, 2.0, Some(layout)),
        Rect::new(320.0, 360.0, 960.0, 680.0)
    );
}

#[test]
fn timeline_lookup_and_transition_window() {
    let comp = two_slides();
    assert_eq!(comp.frame_count(), 180);

    let pos = comp.locate(1.0);
    assert_eq!((pos.slide_index, pos.transition), (0, None));

    let pos = comp.locate(2.5);
    assert_eq!(pos.slide_index, 0);
    assert_eq!(pos.transition, Some(0.0));

    let pos = comp.locate(2.75);
    assert!((pos.transition.unwrap() - 0.5).abs() < 1e-9);

    let pos = comp.locate(3.0);
    assert_eq!((pos.slide_index, pos.transition), (1, None));

    // The last slide never transitions.
    assert_eq!(comp.locate(5.9).transition, None);
}

#[test]
fn frames_show_the_current_slide_and_blend_in_transitions() {
    let mut comp = two_slides();
    let center = (640, 360);

    let f = comp.render_frame(FrameIndex(30)).unwrap();
    assert_eq!(f.pixel(center.0, center.1), [255, 0, 0, 255]);

    let mid = comp.render_still(2.75).unwrap();
    let px = mid.pixel(center.0, center.1);
    assert!(px[0] > 60 && px[0] < 200 && px[2] > 60 && px[2] < 200, "{px:?}");

    let f = comp.render_frame(FrameIndex(120)).unwrap();
    assert_eq!(f.pixel(center.0, center.1), [0, 0, 255, 255]);
}

#[test]
fn transition_start_matches_the_plain_still() {
    let mut comp = two_slides();
    let start = comp.render_frame(FrameIndex(75)).unwrap();
    let still = comp.render_slide(0, 2.5).unwrap();
    assert_eq!(start, still);
}

#[test]
fn scaled_slides_show_the_background_around_them() {
    let s = VideoSettings {
        slide_scale: 50.0,
        background: BackgroundDef::White,
        ..settings()
    };
    let mut comp = compositor(s, vec![prepared(slide_def("a", 1.0, RED), RED)]);
    let f = comp.render_frame(FrameIndex(0)).unwrap();
    assert_eq!(f.pixel(5, 5), [255, 255, 255, 255]);
    assert_eq!(f.pixel(640, 360), [255, 0, 0, 255]);
}

#[test]
fn rounded_slides_clip_their_corners() {
    let s = VideoSettings {
        slide_radius: 40.0,
        ..settings()
    };
    let mut comp = compositor(s, vec![prepared(slide_def("a", 1.0, RED), RED)]);
    let f = comp.render_frame(FrameIndex(0)).unwrap();
    assert_eq!(f.pixel(0, 0), [0, 0, 0, 255]);
    assert_eq!(f.pixel(640, 360), [255, 0, 0, 255]);
}

#[test]
fn ken_burns_stays_inside_the_slide_rect() {
    let s = VideoSettings {
        slide_scale: 50.0,
        ..settings()
    };
    let mut def = slide_def("zoomy", 2.0, RED);
    def.effect = EffectType::KenBurns;
    let mut comp = compositor(s, vec![prepared(def, RED)]);
    let rect = comp.slide_rect(0).unwrap();
    let f = comp.render_still(1.9).unwrap();
    let outside = (rect.x0 - 3.0) as u32;
    assert_eq!(f.pixel(outside, 360), [0, 0, 0, 255]);
}

#[test]
fn failing_overlays_are_skipped() {
    let mut def = slide_def("a", 1.0, RED);
    def.overlays.push(OverlayDef {
        id: "broken".to_owned(),
        kind: OverlayKind::Image {
            asset: "nope".to_owned(),
        },
        x: 0.0,
        y: 0.0,
        width: 1.0,
        height: 1.0,
        space: OverlaySpace::Slide,
        start_time: 0.0,
        duration: None,
        end_time: None,
        animation_in: OverlayAnimation::None,
        animation_out: OverlayAnimation::None,
        style: OverlayStyle::default(),
        hidden: false,
    });
    let mut comp = compositor(settings(), vec![prepared(def, RED)]);
    let f = comp.render_frame(FrameIndex(0)).unwrap();
    assert_eq!(f.pixel(640, 360), [255, 0, 0, 255]);
}

#[test]
fn sink_receives_every_frame_with_slide_indices() {
    let mut comp = compositor(
        settings(),
        vec![
            prepared(slide_def("a", 0.2, RED), RED),
            prepared(slide_def("b", 0.2, BLUE), BLUE),
        ],
    );
    let mut sink = InMemorySink::new();
    let mut seen = Vec::new();
    comp.render_to_sink(&mut sink, &mut |idx, slide| {
        seen.push((idx.0, slide));
        Ok(())
    })
    .unwrap();

    assert_eq!(sink.frames().len(), 12);
    assert!(sink.is_ended());
    assert_eq!(sink.config().unwrap().frame_count, 12);
    assert_eq!(seen.first(), Some(&(0, 0)));
    assert_eq!(seen.last(), Some(&(11, 1)));
    assert_eq!(seen.iter().filter(|(_, s)| *s == 0).count(), 6);
}

#[test]
fn callback_errors_abort_the_render() {
    let mut comp = two_slides();
    let mut sink = InMemorySink::new();
    let err = comp
        .render_to_sink(&mut sink, &mut |idx, _| {
            if idx.0 == 2 {
                Err(SlidecastError::render("stop"))
            } else {
                Ok(())
            }
        })
        .unwrap_err();
    assert!(matches!(err, SlidecastError::Render(_)));
    assert_eq!(sink.frames().len(), 3);
    assert!(!sink.is_ended());
}

#[test]
fn zero_duration_slides_are_rejected() {
    let err = Compositor::new(CompositorParts {
        settings: settings(),
        slides: vec![prepared(slide_def("a", 0.0, RED), RED)],
        background: BackgroundFill::Solid(ColorDef::BLACK),
        fonts: FontRegistry::new(),
        images: OverlayImages::default(),
    })
    .unwrap_err();
    assert!(matches!(err, SlidecastError::Validation(_)));
}
