// The record→stop→upload→emit pipeline: exactly-once upload, round-trip of
// the stored URL into the emitted audio message, guard behavior.

mod common;

use common::{frame, settle, LoopbackChannel, ScriptedBackend, ScriptedEngineFactory, StubClipStore};
use common::{final_event, interim_event};
use parley::audio::Recorder;
use parley::error::CaptureError;
use parley::room::{Identity, RoomController, RoomEvent, RoomSync};
use parley::transcribe::LiveTranscriber;
use std::sync::atomic::Ordering;
use std::sync::Arc;

async fn controller_with(
    backend: ScriptedBackend,
    store: Arc<StubClipStore>,
    channel: Arc<LoopbackChannel>,
    script: Vec<parley::transcribe::RecognitionEvent>,
) -> RoomController {
    let mut sync = RoomSync::new(
        channel,
        Identity {
            room_id: "r1".into(),
            user_id: "u1".into(),
            user_name: "Alice".into(),
        },
    );
    sync.join().await.unwrap();

    RoomController::new(
        Recorder::new(Box::new(backend)),
        LiveTranscriber::new(ScriptedEngineFactory::new(script)),
        store,
        sync,
    )
}

fn audio_messages(events: &[RoomEvent]) -> Vec<&RoomEvent> {
    events
        .iter()
        .filter(|e| matches!(e, RoomEvent::AudioMessage(_)))
        .collect()
}

#[tokio::test]
async fn recorded_clip_round_trips_into_one_audio_message() {
    let channel = LoopbackChannel::new();
    let store = StubClipStore::returning("http://store/clip-1.wav");
    let backend = ScriptedBackend::new(vec![frame(vec![1; 1600], 0), frame(vec![2; 1600], 100)]);

    let mut controller = controller_with(
        backend,
        store.clone(),
        channel.clone(),
        vec![interim_event("hel"), final_event("hello room")],
    )
    .await;

    controller.start_recording().await.unwrap();
    assert!(controller.is_recording());
    settle().await;

    controller.stop_recording().await;
    assert!(!controller.is_recording());
    assert!(!controller.is_uploading());

    assert_eq!(store.upload_count(), 1);

    let events = channel.published_events();
    let audio = audio_messages(&events);
    assert_eq!(audio.len(), 1);
    let RoomEvent::AudioMessage(payload) = audio[0] else {
        unreachable!()
    };
    // The stored URL and the live transcript travel together
    assert_eq!(payload.audio_url, "http://store/clip-1.wav");
    assert_eq!(payload.transcript, "hello room");
}

#[tokio::test]
async fn double_flush_uploads_exactly_once() {
    let channel = LoopbackChannel::new();
    let store = StubClipStore::returning("http://store/clip-2.wav");
    let backend = ScriptedBackend::new(vec![frame(vec![5; 1600], 0)]);

    let mut controller =
        controller_with(backend, store.clone(), channel.clone(), vec![]).await;

    controller.start_recording().await.unwrap();
    settle().await;
    controller.stop_recording().await;

    // A re-render of the enclosing view re-triggers the upload path
    controller.flush_upload().await;
    controller.flush_upload().await;

    assert_eq!(store.upload_count(), 1);
    assert_eq!(audio_messages(&channel.published_events()).len(), 1);
}

#[tokio::test]
async fn empty_capture_is_no_content_not_an_error() {
    let channel = LoopbackChannel::new();
    let store = StubClipStore::returning("http://store/never.wav");
    let backend = ScriptedBackend::new(Vec::new());

    let mut controller =
        controller_with(backend, store.clone(), channel.clone(), vec![]).await;

    controller.start_recording().await.unwrap();
    controller.stop_recording().await;

    assert_eq!(store.upload_count(), 0);
    assert!(audio_messages(&channel.published_events()).is_empty());
    assert!(controller.banner().is_none());
}

#[tokio::test]
async fn upload_failure_surfaces_a_banner_and_reenables_recording() {
    let channel = LoopbackChannel::new();
    let store = StubClipStore::returning("http://store/fail.wav");
    store.fail.store(true, Ordering::SeqCst);
    let backend = ScriptedBackend::new(vec![frame(vec![7; 1600], 0)]);

    let mut controller =
        controller_with(backend, store.clone(), channel.clone(), vec![]).await;

    controller.start_recording().await.unwrap();
    settle().await;
    controller.stop_recording().await;

    assert_eq!(store.upload_count(), 0);
    assert!(controller.banner().unwrap().contains("upload"));
    assert!(audio_messages(&channel.published_events()).is_empty());

    // No retry happened on its own, and the record control works again
    controller.flush_upload().await;
    assert_eq!(store.upload_count(), 0);

    store.fail.store(false, Ordering::SeqCst);
    assert!(controller.start_recording().await.is_ok());
}

#[tokio::test]
async fn capture_failure_becomes_a_banner_not_a_panic() {
    let channel = LoopbackChannel::new();
    let store = StubClipStore::returning("http://store/x.wav");
    let backend = ScriptedBackend::failing(|| CaptureError::PermissionDenied);

    let mut controller = controller_with(backend, store, channel, vec![]).await;

    let result = controller.start_recording().await;
    assert!(matches!(result, Err(CaptureError::PermissionDenied)));
    assert!(!controller.is_recording());
    assert_eq!(controller.banner(), Some("microphone access denied"));
}

#[tokio::test]
async fn blank_text_send_emits_nothing() {
    let channel = LoopbackChannel::new();
    let store = StubClipStore::returning("http://store/x.wav");
    let backend = ScriptedBackend::new(Vec::new());

    let controller = controller_with(backend, store, channel.clone(), vec![]).await;

    let sent = controller.send_text("   ").await.unwrap();
    assert!(!sent);
    assert!(channel
        .published_events()
        .iter()
        .all(|e| !matches!(e, RoomEvent::TextMessage(_))));
}

#[tokio::test]
async fn participants_render_humans_before_personas() {
    let channel = LoopbackChannel::new();
    let store = StubClipStore::returning("http://store/x.wav");
    let backend = ScriptedBackend::new(Vec::new());

    let controller = controller_with(backend, store, channel.clone(), vec![]).await;

    controller.sync().seed_automated(vec![
        parley::room::Participant::automated("ai-1", "AI Participant 2"),
        parley::room::Participant::automated("ai-0", "AI Participant 1"),
    ]);
    channel.emit(RoomEvent::UserJoined {
        socket_id: "s1".into(),
        user_id: "u2".into(),
        user_name: "Bob".into(),
    });
    settle().await;

    let names: Vec<_> = controller
        .participants()
        .iter()
        .map(|p| p.name().to_string())
        .collect();
    assert_eq!(names, vec!["Bob", "AI Participant 1", "AI Participant 2"]);
}
