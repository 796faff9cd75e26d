use std::sync::Arc;

use opendal::{Operator, services::Memory};
use pasteup_business::{
    ObjectStoreFactory, Orchestrator, RecordingInteraction, Session, Settings,
};
use pasteup_input::RawPayload;
use pasteup_services::{
    DocumentRef, HashBackend, Hasher, MemoryStateStore, NoProgress, ObjectStoreSettings,
    ObjectStoreUploader,
};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PNG: &[u8] = b"\x89PNG\r\n\x1a\nstill-frame";
const GIF: &[u8] = b"GIF89a-animated-frames";

fn orchestrator(op: &Operator) -> Orchestrator {
    let mut settings = Settings::default();
    settings.general.retrieve_original_image = true;
    settings.object_store = ObjectStoreSettings {
        region: "us-east-1".to_owned(),
        bucket: "media".to_owned(),
        public_url_base: "https://cdn.example.com/".to_owned(),
        ..Default::default()
    };

    let op = op.clone();
    let factory: ObjectStoreFactory =
        Arc::new(move |settings| ObjectStoreUploader::with_operator(settings, op.clone()));
    Orchestrator::new(settings, Arc::new(MemoryStateStore::new()))
        .with_hasher(Arc::new(Hasher::with_backend(HashBackend::Reference)))
        .with_object_store_factory(factory)
}

fn pasted_image(server: &MockServer) -> RawPayload {
    RawPayload::new()
        .with_file("image/png", "frame.png", PNG.to_vec())
        .with_text(
            "text/html",
            format!(r#"<p><img alt="cat" src="{}/media/anim.gif?size=large&amp;v=2"></p>"#, server.uri()),
        )
}

async fn paste(orchestrator: &Orchestrator, payload: &RawPayload, interaction: &RecordingInteraction) -> Option<String> {
    let doc = DocumentRef::new("/notes/cats.md", "markdown");
    let cancel = CancellationToken::new();
    let session = Session {
        document: &doc,
        interaction,
        progress: &NoProgress,
        cancel: &cancel,
    };
    orchestrator
        .handle_paste(payload, session)
        .await
        .map(|outcome| outcome.snippet)
}

#[tokio::test]
async fn original_animation_replaces_still_frame() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/media/anim.gif"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "image/gif"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/media/anim.gif"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/gif")
                .set_body_bytes(GIF.to_vec()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let op = Operator::new(Memory::default()).unwrap().finish();
    let orchestrator = orchestrator(&op);
    let interaction = RecordingInteraction::new();

    let snippet = paste(&orchestrator, &pasted_image(&server), &interaction).await;
    assert_eq!(
        snippet.as_deref(),
        Some("![anim](https://cdn.example.com/anim.gif)")
    );
    assert_eq!(op.read("anim.gif").await.unwrap().to_vec(), GIF);
    assert!(!op.exists("frame.png").await.unwrap());
}

#[tokio::test]
async fn matching_content_type_keeps_pasted_file() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "image/png"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(GIF.to_vec()))
        .expect(0)
        .mount(&server)
        .await;

    let op = Operator::new(Memory::default()).unwrap().finish();
    let orchestrator = orchestrator(&op);
    let interaction = RecordingInteraction::new();

    let snippet = paste(&orchestrator, &pasted_image(&server), &interaction).await;
    assert_eq!(
        snippet.as_deref(),
        Some("![frame](https://cdn.example.com/frame.png)")
    );
    assert_eq!(op.read("frame.png").await.unwrap().to_vec(), PNG);
}

#[tokio::test]
async fn failed_retrieval_warns_and_uploads_pasted_file() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let op = Operator::new(Memory::default()).unwrap().finish();
    let orchestrator = orchestrator(&op);
    let interaction = RecordingInteraction::new();

    let snippet = paste(&orchestrator, &pasted_image(&server), &interaction).await;
    assert_eq!(
        snippet.as_deref(),
        Some("![frame](https://cdn.example.com/frame.png)")
    );
    let warnings = interaction.warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].starts_with("Could not retrieve the original image"));
}

#[tokio::test]
async fn repeated_paste_hits_cache() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "image/png"))
        .mount(&server)
        .await;

    let op = Operator::new(Memory::default()).unwrap().finish();
    let orchestrator = orchestrator(&op);
    let interaction = RecordingInteraction::new();

    let first = paste(&orchestrator, &pasted_image(&server), &interaction).await;
    op.delete("frame.png").await.unwrap();
    let second = paste(&orchestrator, &pasted_image(&server), &interaction).await;

    assert_eq!(first, second);
    assert!(!op.exists("frame.png").await.unwrap());
    assert_eq!(orchestrator.undo_entries().len(), 1);

    orchestrator.clear_cache();
    paste(&orchestrator, &pasted_image(&server), &interaction).await;
    assert!(op.exists("frame.png").await.unwrap());
}
