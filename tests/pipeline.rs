//! End-to-end pipeline tests through the public API: files on disk in,
//! named PNG artifacts out.

use image::{Rgb, RgbImage, Rgba, RgbaImage};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use tintype::config::Config;
use tintype::intake;
use tintype::session::Session;
use tintype::types::Status;

fn write_jpeg(path: &Path, width: u32, height: u32, rgb: [u8; 3]) {
    RgbImage::from_pixel(width, height, Rgb(rgb))
        .save(path)
        .unwrap();
}

fn write_png(path: &Path, width: u32, height: u32, rgba: [u8; 4]) {
    RgbaImage::from_pixel(width, height, Rgba(rgba))
        .save(path)
        .unwrap();
}

fn assert_grayscale_600x800(png: &[u8]) {
    let frame = image::load_from_memory(png).unwrap().to_rgba8();
    assert_eq!(frame.dimensions(), (600, 800));
    for px in frame.pixels() {
        assert_eq!(px[0], px[1]);
        assert_eq!(px[1], px[2]);
    }
}

async fn session_over_dir(dir: &Path) -> Session {
    let session = Session::new(Config::default());
    for path in intake::collect_sources(dir) {
        session.add_path(path).await;
    }
    session
}

#[tokio::test]
async fn batch_normalizes_every_source_to_the_target_frame() {
    let tmp = TempDir::new().unwrap();
    // Landscape 4:3 and portrait 3:4 sources both land on the 600x800 canvas.
    write_jpeg(&tmp.path().join("landscape.jpg"), 1600, 1200, [180, 90, 40]);
    write_png(&tmp.path().join("portrait.png"), 1200, 1600, [40, 90, 180, 255]);

    let session = session_over_dir(tmp.path()).await;
    session.process_all().await;

    let items = session.items();
    assert_eq!(items.len(), 2);
    for item in &items {
        assert_eq!(item.status, Status::Complete, "item {}", item.name);
        assert_grayscale_600x800(item.normalized.as_ref().unwrap());
    }

    let names: Vec<String> = session
        .download_entries()
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    assert_eq!(
        names,
        vec!["landscape_processed.png", "portrait_processed.png"]
    );
}

#[tokio::test(start_paused = true)]
async fn captions_render_with_auto_contrast() {
    let tmp = TempDir::new().unwrap();
    write_png(&tmp.path().join("night.png"), 1200, 1600, [40, 40, 40, 255]);

    let session = session_over_dir(tmp.path()).await;
    session.process_all().await;

    let id = session.items()[0].id.clone();
    session.set_overlay_active(&id, true);
    session.set_overlay_text(&id, "one\ntwo");
    tokio::time::sleep(Duration::from_millis(400)).await;
    session.flush_renders().await;

    let item = session.item(&id).unwrap();
    assert_eq!(item.status, Status::Complete);
    assert!(item.with_text.is_some());
    // Dark frame → white caption, recorded back into the settings.
    assert_eq!(item.settings.color, "#FFFFFF");
    assert_grayscale_600x800(item.normalized.as_ref().unwrap());

    let names: Vec<String> = session
        .download_entries()
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    assert_eq!(names, vec!["night_text_overlay.png"]);
}

#[tokio::test(start_paused = true)]
async fn caption_edit_burst_debounces_to_one_render() {
    let tmp = TempDir::new().unwrap();
    write_png(&tmp.path().join("photo.png"), 600, 800, [200, 200, 200, 255]);

    let session = session_over_dir(tmp.path()).await;
    session.process_all().await;
    let id = session.items()[0].id.clone();

    session.set_overlay_active(&id, true);
    session.set_overlay_text(&id, "a");
    tokio::time::sleep(Duration::from_millis(80)).await;
    session.set_overlay_text(&id, "ab");
    tokio::time::sleep(Duration::from_millis(80)).await;
    session.set_overlay_text(&id, "abc");

    tokio::time::sleep(Duration::from_millis(500)).await;
    session.flush_renders().await;

    assert_eq!(session.renders_completed(), 1);
    let item = session.item(&id).unwrap();
    assert_eq!(item.overlay_text, "abc");
    // Light frame → black caption.
    assert_eq!(item.settings.color, "#000000");
}

#[tokio::test]
async fn oversized_file_fails_without_processing() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("huge.jpg");
    std::fs::write(&path, vec![0u8; 6 * 1024 * 1024]).unwrap();

    let session = session_over_dir(tmp.path()).await;
    session.process_all().await;

    let items = session.items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].status, Status::Failed);
    assert_eq!(
        items[0].error.as_deref(),
        Some("File size exceeds 5MB limit.")
    );
    assert!(session.download_entries().is_empty());
}

#[tokio::test]
async fn removed_item_disappears_from_downloads() {
    let tmp = TempDir::new().unwrap();
    write_png(&tmp.path().join("keep.png"), 600, 800, [90, 90, 90, 255]);
    write_png(&tmp.path().join("toss.png"), 600, 800, [90, 90, 90, 255]);

    let session = session_over_dir(tmp.path()).await;
    session.process_all().await;

    let toss = session
        .items()
        .iter()
        .find(|item| item.name == "toss.png")
        .unwrap()
        .id
        .clone();
    session.remove(&toss);

    let names: Vec<String> = session
        .download_entries()
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    assert_eq!(names, vec!["keep_processed.png"]);
}
