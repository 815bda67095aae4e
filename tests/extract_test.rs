mod common;

use std::sync::Arc;

use tempfile::TempDir;

use common::{CaptureProgress, FakeDecoder, UtfOcr, sheet, touch_files};
use crocus::{Config, ContentExtractor, CrocusError, Engine, NullProgress};

fn extractor_with(dir: &TempDir, decoder: FakeDecoder) -> ContentExtractor {
    ContentExtractor::with_collaborators(
        dir.path().join("content"),
        Arc::new(decoder),
        Arc::new(UtfOcr),
    )
}

#[test]
fn test_decode_failure_skips_file_but_run_succeeds() {
    let dir = TempDir::new().unwrap();
    touch_files(&dir.path().join("content"), &["bad.xlsx", "good.xlsx", "ok.xlsx"]);

    let decoder = FakeDecoder::new()
        .failing("bad.xlsx")
        .insert("good.xlsx", vec![sheet("S", &[&["alpha"]], &[])])
        .insert("ok.xlsx", vec![sheet("S", &[&["beta"]], &[])]);
    let extractor = extractor_with(&dir, decoder);

    let outcome = extractor.process_directory(&NullProgress).unwrap();
    assert_eq!(outcome.workbooks.len(), 2);
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].relative_path, "bad.xlsx");
    assert!(matches!(
        outcome.skipped[0].error,
        CrocusError::DecodeFailure { .. }
    ));
}

#[test]
fn test_read_only_failure_falls_back_to_full_parse() {
    let dir = TempDir::new().unwrap();
    touch_files(&dir.path().join("content"), &["tricky.xlsx"]);

    let decoder = FakeDecoder::new()
        .failing_readonly("tricky.xlsx")
        .insert("tricky.xlsx", vec![sheet("S", &[&["rescued"]], &[])]);
    let extractor = extractor_with(&dir, decoder);

    let outcome = extractor.process_directory(&NullProgress).unwrap();
    assert_eq!(outcome.workbooks.len(), 1);
    assert!(outcome.skipped.is_empty());
    assert_eq!(outcome.workbooks[0].sheets[0].cell_text, "rescued");
}

#[test]
fn test_lock_files_and_foreign_extensions_are_not_visited() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("content");
    touch_files(
        &root,
        &["real.xlsx", "~$real.xlsx", "notes.txt", "data.csv"],
    );

    // Only the qualifying file is known to the decoder; visiting any
    // other file would produce a skip report.
    let decoder = FakeDecoder::new().insert("real.xlsx", vec![sheet("S", &[&["x"]], &[])]);
    let extractor = extractor_with(&dir, decoder);

    let outcome = extractor.process_directory(&NullProgress).unwrap();
    assert_eq!(outcome.workbooks.len(), 1);
    assert!(outcome.skipped.is_empty());
}

#[test]
fn test_ocr_failure_is_local_to_the_image() {
    let dir = TempDir::new().unwrap();
    touch_files(&dir.path().join("content"), &["imgs.xlsx"]);

    let decoder = FakeDecoder::new().insert(
        "imgs.xlsx",
        vec![sheet(
            "Pics",
            &[&["cells"]],
            &[("A1", "FAIL this one"), ("B2", "readable text")],
        )],
    );
    let extractor = extractor_with(&dir, decoder);

    let outcome = extractor.process_directory(&NullProgress).unwrap();
    assert_eq!(outcome.workbooks.len(), 1);
    let images = &outcome.workbooks[0].sheets[0].images;
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].coordinate, "B2");
    assert_eq!(images[0].text, "readable text");
}

#[test]
fn test_progress_is_monotonic_and_complete() {
    let dir = TempDir::new().unwrap();
    touch_files(&dir.path().join("content"), &["a.xlsx", "b.xlsx", "c.xlsx"]);

    let decoder = FakeDecoder::new()
        .insert("a.xlsx", vec![sheet("S", &[&["x"]], &[])])
        .failing("b.xlsx")
        .insert("c.xlsx", vec![sheet("S", &[&["y"]], &[])]);
    let extractor = extractor_with(&dir, decoder);

    let progress = CaptureProgress::default();
    let outcome = extractor.process_directory(&progress).unwrap();
    assert_eq!(outcome.workbooks.len(), 2);

    let events = progress.events.lock().unwrap().clone();
    assert_eq!(events, vec![(1, 3), (2, 3), (3, 3)]);
}

#[test]
fn test_lazy_iteration_can_be_abandoned() {
    let dir = TempDir::new().unwrap();
    touch_files(&dir.path().join("content"), &["a.xlsx", "b.xlsx"]);

    let decoder = FakeDecoder::new()
        .insert("a.xlsx", vec![sheet("S", &[&["x"]], &[])])
        .insert("b.xlsx", vec![sheet("S", &[&["y"]], &[])]);
    let extractor = extractor_with(&dir, decoder);

    let mut iter = extractor.workbooks(&NullProgress).unwrap();
    let first = iter.next().unwrap().unwrap();
    assert_eq!(first.filename, "a.xlsx");
    drop(iter);

    // A fresh iterator restarts the scan from the beginning.
    let names: Vec<_> = extractor
        .workbooks(&NullProgress)
        .unwrap()
        .map(|item| item.unwrap().filename)
        .collect();
    assert_eq!(names, vec!["a.xlsx", "b.xlsx"]);
}

#[test]
fn test_cell_grid_rendering_preserves_order() {
    let dir = TempDir::new().unwrap();
    touch_files(&dir.path().join("content"), &["grid.xlsx"]);

    let decoder = FakeDecoder::new().insert(
        "grid.xlsx",
        vec![sheet(
            "Grid",
            &[&["a1", "b1", "c1"], &["a2", "", "c2"]],
            &[],
        )],
    );
    let extractor = extractor_with(&dir, decoder);

    let outcome = extractor.process_directory(&NullProgress).unwrap();
    assert_eq!(
        outcome.workbooks[0].sheets[0].cell_text,
        "a1\tb1\tc1\na2\t\tc2"
    );
}

#[test]
fn test_engine_process_directory_end_to_end_with_failures() {
    let dir = TempDir::new().unwrap();
    let content_root = dir.path().join("content");
    touch_files(&content_root, &["broken.xlsx", "fine.xlsx"]);

    let decoder = FakeDecoder::new()
        .failing("broken.xlsx")
        .insert("fine.xlsx", vec![sheet("S", &[&["needle"]], &[])]);
    let engine = Engine::with_collaborators(
        Config::new(content_root, dir.path().join("index")),
        Arc::new(decoder),
        Arc::new(UtfOcr),
    );

    // The run still produces documents for all other workbooks.
    let outcome = engine.process_directory(&NullProgress).unwrap();
    assert_eq!(outcome.workbooks.len(), 1);
    assert_eq!(outcome.skipped.len(), 1);

    engine.index_content(&outcome.workbooks).unwrap();
    let results = engine.search("content", "needle", None).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].filename, "fine.xlsx");
}
