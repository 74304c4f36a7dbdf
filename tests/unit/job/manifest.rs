use super::*;
use crate::composition::settings::{AspectRatio, OutputFormat};

fn temp_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "slidecast_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

const MANIFEST: &str = r##"{
    "settings": { "aspectRatio": "1:1", "resolution": "720p", "format": "mov" },
    "assets": { "photo": "img/photo.bin", "bed": "music.mp3" },
    "audio": { "music": { "asset": "bed", "loop": { "start": 1.0, "end": 3.0 } }, "fadeIn": true },
    "slides": [
        { "id": "s1", "visual": { "kind": "image", "asset": "photo" }, "duration": 2.5 },
        { "id": "s2", "visual": { "kind": "color", "color": "#ffffff" }, "duration": 1.0,
          "transition": "wipe" }
    ]
}"##;

#[test]
fn manifest_parses_with_defaults() {
    let spec = JobSpec::from_json_str(MANIFEST).unwrap();
    assert_eq!(spec.settings.aspect_ratio, AspectRatio::Square);
    assert_eq!(spec.settings.format, OutputFormat::Mov);
    assert_eq!(spec.slides.len(), 2);
    assert_eq!(spec.slides[0].transition, "fade");
    assert!(spec.fonts.is_empty());

    let audio = spec.audio.unwrap();
    let music = audio.music.unwrap();
    assert_eq!(music.volume, 1.0);
    assert_eq!(music.loop_range, Some(LoopRange { start: 1.0, end: 3.0 }));
    assert!(audio.fade_in && !audio.fade_out);
    assert!(audio.ducking.enabled);
}

#[test]
fn assets_resolve_relative_to_the_manifest() {
    let dir = temp_dir("manifest_assets");
    std::fs::create_dir_all(dir.join("img")).unwrap();
    std::fs::write(dir.join("img/photo.bin"), [1u8, 2, 3]).unwrap();
    std::fs::write(dir.join("music.mp3"), [9u8]).unwrap();
    let path = dir.join("job.json");
    std::fs::write(&path, MANIFEST).unwrap();

    let job = JobSpec::load_job(&path).unwrap();
    assert_eq!(job.assets["photo"].as_slice(), &[1, 2, 3]);
    assert_eq!(job.slides.len(), 2);
    let JobAudio::Plan(plan) = &job.audio else {
        panic!("expected a mix plan");
    };
    let music = plan.music.as_ref().unwrap();
    assert!(matches!(&music.source, AudioSource::File(p) if p == &dir.join("music.mp3")));
    assert!(plan.fade_in);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn missing_files_and_ids_are_asset_errors() {
    let dir = temp_dir("manifest_missing");
    std::fs::create_dir_all(&dir).unwrap();
    let spec = JobSpec::from_json_str(MANIFEST).unwrap();
    assert!(matches!(
        spec.into_render_job(&dir),
        Err(SlidecastError::Asset(_))
    ));

    let mut spec = JobSpec::from_json_str(MANIFEST).unwrap();
    spec.assets.remove("bed");
    assert!(matches!(
        spec.into_render_job(&dir),
        Err(SlidecastError::Asset(_))
    ));
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn malformed_json_is_a_serde_error() {
    assert!(matches!(
        JobSpec::from_json_str("{ \"slides\": 3 }"),
        Err(SlidecastError::Serde(_))
    ));
    assert!(JobSpec::load(Path::new("/definitely/not/here.json")).is_err());
}
