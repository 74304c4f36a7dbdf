use super::*;
use crate::composition::layers::Layer;
use crate::composition::settings::ResolutionTier;

fn png(w: u32, h: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba([10, 20, 30, 255]));
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

fn slide(v: serde_json::Value) -> SlideDef {
    serde_json::from_value(v).unwrap()
}

fn settings() -> VideoSettings {
    VideoSettings {
        resolution: ResolutionTier::P720,
        ..VideoSettings::default()
    }
}

#[test]
fn visuals_decode_and_layers_normalize() {
    let job = RenderJob::new(
        settings(),
        vec![
            slide(serde_json::json!({
                "id": "one",
                "visual": { "kind": "image", "asset": "photo" },
                "duration": 2.0,
                "overlays": [
                    { "id": "logo", "type": "image", "asset": "logo", "x": 0.1, "y": 0.1,
                      "width": 0.2, "height": 0.2 },
                    { "id": "box", "type": "rect", "x": 0.5, "y": 0.5, "width": 0.1, "height": 0.1 }
                ],
                "layerOrder": ["box", "__slide__", "ghost"]
            })),
            slide(serde_json::json!({
                "id": "two",
                "visual": { "kind": "color", "color": "#336699" },
                "duration": 1.0
            })),
        ],
    )
    .with_asset("photo", png(8, 4))
    .with_asset("logo", png(2, 2));

    let prepared = job.prepare().unwrap();
    let slides = &prepared.parts.slides;
    assert!(matches!(&slides[0].visual, SlideVisual::Bitmap(img) if img.width == 8));
    assert!(matches!(slides[1].visual, SlideVisual::Solid(_)));
    assert_eq!(
        slides[0].layers,
        vec![Layer::Overlay(1), Layer::Slide, Layer::Overlay(0)]
    );
    assert!(prepared.audio.is_none());
    assert!(!prepared.parts.images.is_decoded("logo"));
}

#[test]
fn missing_or_broken_visuals_are_fatal() {
    let missing = RenderJob::new(
        settings(),
        vec![slide(serde_json::json!({
            "id": "a",
            "visual": { "kind": "image", "asset": "nope" },
            "duration": 1.0
        }))],
    );
    assert!(matches!(missing.prepare(), Err(SlidecastError::Asset(_))));

    let broken = RenderJob::new(
        settings(),
        vec![slide(serde_json::json!({
            "id": "a",
            "visual": { "kind": "image", "asset": "junk" },
            "duration": 1.0
        }))],
    )
    .with_asset("junk", vec![1, 2, 3]);
    assert!(matches!(broken.prepare(), Err(SlidecastError::Asset(_))));
}

#[test]
fn background_image_is_decoded() {
    let mut s = settings();
    s.background = BackgroundDef::Image {
        asset: "bg".to_owned(),
    };
    let job = RenderJob::new(
        s,
        vec![slide(serde_json::json!({
            "id": "a",
            "visual": { "kind": "color", "color": "#000000" },
            "duration": 1.0
        }))],
    )
    .with_asset("bg", png(4, 4));
    let prepared = job.prepare().unwrap();
    assert!(matches!(prepared.parts.background, BackgroundFill::Image(_)));
}

#[test]
fn empty_jobs_and_bad_fonts_are_rejected() {
    assert!(matches!(
        RenderJob::new(settings(), Vec::new()).prepare(),
        Err(SlidecastError::Validation(_))
    ));

    let mut job = RenderJob::new(
        settings(),
        vec![slide(serde_json::json!({
            "id": "a",
            "visual": { "kind": "color", "color": "#000000" },
            "duration": 1.0
        }))],
    );
    job.fonts.push(vec![0, 1, 2, 3]);
    assert!(job.prepare().is_err());
}

#[test]
fn text_overlays_need_a_registered_font() {
    let captioned = |hidden: bool| {
        RenderJob::new(
            settings(),
            vec![slide(serde_json::json!({
                "id": "intro",
                "visual": { "kind": "color", "color": "#000000" },
                "duration": 1.0,
                "overlays": [
                    { "id": "title", "type": "text", "text": "Hello", "hidden": hidden,
                      "x": 0.1, "y": 0.1, "width": 0.8 }
                ]
            }))],
        )
    };

    match captioned(false).prepare() {
        Err(SlidecastError::Asset(msg)) => {
            assert!(msg.contains("title") && msg.contains("intro"), "{msg}");
        }
        other => panic!("expected an asset error, got {:?}", other.map(|_| ())),
    }
    assert!(captioned(true).prepare().is_ok());
}

#[test]
fn premixed_audio_must_match_the_mix_format() {
    let base = RenderJob::new(
        settings(),
        vec![slide(serde_json::json!({
            "id": "a",
            "visual": { "kind": "color", "color": "#000000" },
            "duration": 1.0
        }))],
    );

    let mut wrong = base.clone();
    wrong.audio = JobAudio::Mixed(AudioPcm::silence(48_000, 2, 100));
    assert!(matches!(wrong.prepare(), Err(SlidecastError::Validation(_))));

    let mut right = base;
    right.audio = JobAudio::Mixed(AudioPcm::silence(MIX_SAMPLE_RATE, MIX_CHANNELS, 100));
    assert_eq!(right.prepare().unwrap().audio.map(|a| a.frames()), Some(100));
}

#[test]
fn slide_narration_needs_its_asset() {
    let job = RenderJob::new(
        settings(),
        vec![slide(serde_json::json!({
            "id": "a",
            "visual": { "kind": "color", "color": "#000000" },
            "duration": 1.0,
            "narration": { "asset": "voice" }
        }))],
    );
    assert!(matches!(job.prepare(), Err(SlidecastError::Asset(_))));
}

#[test]
fn plan_with_pcm_music_is_mixed() {
    let mut job = RenderJob::new(
        settings(),
        vec![slide(serde_json::json!({
            "id": "a",
            "visual": { "kind": "color", "color": "#000000" },
            "duration": 1.0
        }))],
    );
    let music = AudioPcm::from_planar_stereo(MIX_SAMPLE_RATE, &[0.5; 100], &[0.5; 100]);
    job.audio = JobAudio::Plan(AudioMixPlan {
        music: Some(crate::audio::mix::MusicTrack {
            source: AudioSource::Pcm(Arc::new(music)),
            loop_range: None,
            volume: 1.0,
        }),
        ..AudioMixPlan::default()
    });
    let audio = job.prepare().unwrap().audio.unwrap();
    // One second of slides plus the mix tail.
    assert_eq!(audio.frames(), 2 * MIX_SAMPLE_RATE as usize);
    assert!(audio.interleaved_f32.iter().any(|s| *s != 0.0));
}

#[test]
fn compositor_for_stills_skips_audio() {
    let job = RenderJob::new(
        settings(),
        vec![slide(serde_json::json!({
            "id": "a",
            "visual": { "kind": "color", "color": "#000000" },
            "duration": 2.0,
            "narration": { "asset": "voice" }
        }))],
    );
    let compositor = job.into_compositor().unwrap();
    assert_eq!(compositor.slide_count(), 1);
    assert_eq!(compositor.frame_count(), 60);
}
