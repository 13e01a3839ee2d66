// tests/trim_flow.rs

use affirm_audio::config::TrimConfig;
use affirm_audio::encoder::{encode, WAV_MIME};
use affirm_audio::trim::TrimController;
use affirm_audio::waveform::terminal::TextCanvas;
use affirm_audio::{
    ResourceStore, ResourceUrl, SampleBuffer, SampleDecoder, TrimEditor, TrimHandle,
    WaveformRenderer,
};
use std::sync::{Arc, Mutex};

const RATE: u32 = 44_100;

fn ten_second_clip() -> SampleBuffer {
    let samples = (0..RATE as usize * 10)
        .map(|i| (i as f32 * 0.01).sin() * 0.6)
        .collect();
    SampleBuffer::new(vec![samples], RATE).unwrap()
}

fn editor(store: &ResourceStore, completed: Arc<Mutex<Vec<ResourceUrl>>>) -> TrimEditor {
    let mut controller = TrimController::new(
        WaveformRenderer::new(800, 150, 16.0),
        TrimConfig::default(),
        TextCanvas::new(80, 10),
    );
    controller.on_trim_complete(move |url| completed.lock().unwrap().push(url.clone()));
    TrimEditor::new(controller, SampleDecoder::new(store.clone()))
}

#[tokio::test]
async fn dragging_to_twenty_and_eighty_keeps_six_seconds() {
    let store = ResourceStore::new();
    let source = store.create(encode(&ten_second_clip()).unwrap(), WAV_MIME);
    let completed = Arc::new(Mutex::new(Vec::new()));
    let editor = editor(&store, completed.clone());
    editor.load(&source).await.unwrap();

    assert_eq!(editor.pointer_down(0.0), Some(TrimHandle::Start));
    assert!(editor.pointer_move(160.0));
    editor.pointer_up();
    assert_eq!(editor.pointer_down(800.0), Some(TrimHandle::End));
    assert!(editor.pointer_move(640.0));
    editor.pointer_up();
    assert_eq!((editor.window().start(), editor.window().end()), (20.0, 80.0));

    let outcome = editor.commit().unwrap();
    assert_eq!(*completed.lock().unwrap(), vec![outcome.url.clone()]);

    let trimmed = SampleDecoder::new(store.clone())
        .decode(&outcome.url)
        .await
        .unwrap();
    let one_frame = 1.0 / RATE as f64;
    assert!((trimmed.duration_secs() - 6.0).abs() <= one_frame);
    assert!(editor.window().is_full());
}

#[tokio::test]
async fn committing_again_revokes_the_previous_result() {
    let store = ResourceStore::new();
    let source = store.create(encode(&ten_second_clip()).unwrap(), WAV_MIME);
    let editor = editor(&store, Arc::default());
    editor.load(&source).await.unwrap();

    assert!(editor.drag_to(TrimHandle::End, 50.0));
    let first = editor.commit().unwrap();
    assert!(editor.drag_to(TrimHandle::Start, 50.0));
    let second = editor.commit().unwrap();

    assert!(!store.contains(&first.url));
    assert!(store.contains(&second.url));
    assert!(store.contains(&source));
    assert!((second.duration_secs() - 2.5).abs() < 1e-6);
}

#[tokio::test]
async fn a_slow_load_cannot_overwrite_a_newer_one() {
    let store = ResourceStore::new();
    let editor = editor(&store, Arc::default());
    let short = store.create(
        encode(&SampleBuffer::new(vec![vec![0.0; 100]], RATE).unwrap()).unwrap(),
        WAV_MIME,
    );

    let stale = editor.begin_load();
    editor.load(&short).await.unwrap();
    let outcome = editor.finish_load(stale, Ok(ten_second_clip())).unwrap();

    assert_eq!(outcome, affirm_audio::LoadOutcome::Superseded);
    let frames = editor.with_controller(|c| c.buffer().map(|b| b.frame_count()));
    assert_eq!(frames, Some(100));
}
