//! End-to-end pipeline test: generated PDFs and CSV side-files in, a
//! mocked chat-completion service, JSONL dataset out.

use std::time::Duration;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use paperforge::config::PipelineConfig;
use paperforge::core::dataset::FineTuneExample;
use paperforge::core::pipeline::Pipeline;
use paperforge::core::question::QuestionDeriver;
use paperforge::core::retry::RetryPolicy;

/// Build a minimal PDF; each element of `pages` is one page's text lines.
fn create_test_pdf(pages: &[&[&str]]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");

    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for lines in pages {
        let mut operations = Vec::new();
        let mut y = 700;
        for line in lines.iter() {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), 12.into()]));
            operations.push(Operation::new("Td", vec![50.into(), y.into()]));
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
            operations.push(Operation::new("ET", vec![]));
            y -= 20;
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            Dictionary::new(),
            content.encode().expect("encode content stream"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).expect("save test PDF");
    buffer
}

async fn mock_llm() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [
                { "message": { "role": "assistant", "content": "How does X affect Y?" } }
            ]
        })))
        .mount(&server)
        .await;
    server
}

fn deriver(endpoint: &str) -> QuestionDeriver {
    QuestionDeriver::new(
        endpoint,
        "test-key",
        "gpt-4o",
        RetryPolicy::new(2, Duration::from_millis(1)),
        Duration::from_secs(5),
    )
}

fn pipeline_config(dir: &TempDir) -> PipelineConfig {
    PipelineConfig {
        input_dir: dir.path().to_path_buf(),
        output_file: dir.path().join("fine_tune_data.jsonl"),
        ..PipelineConfig::default()
    }
}

fn read_dataset(dir: &TempDir) -> Vec<FineTuneExample> {
    let contents =
        std::fs::read_to_string(dir.path().join("fine_tune_data.jsonl")).expect("read dataset");
    contents
        .lines()
        .map(|line| serde_json::from_str(line).expect("parse example"))
        .collect()
}

#[tokio::test]
async fn test_prepare_builds_one_example_per_usable_paper() {
    let _ = env_logger::builder().is_test(true).try_init();
    let server = mock_llm().await;
    let dir = TempDir::new().expect("temp dir");

    std::fs::write(
        dir.path().join("12345.pdf"),
        create_test_pdf(&[&["The Title"], &["We study X in depth."]]),
    )
    .expect("write pdf");
    std::fs::write(
        dir.path().join("12345.csv"),
        "publicationYear,authors,title,abstract\n2020,\"[Jane Doe]\",First,Alpha\n",
    )
    .expect("write side-file");

    let summary = Pipeline::new(pipeline_config(&dir), deriver(&server.uri()))
        .run()
        .await
        .expect("pipeline run");
    assert_eq!(summary.examples, 1);
    assert_eq!(summary.skipped, 0);

    let examples = read_dataset(&dir);
    assert_eq!(examples.len(), 1);
    let example = &examples[0];
    assert!(example.prompt.contains("title:'First'"));
    assert!(example.prompt.contains("authors:'Jane Doe'"));
    assert!(example.prompt.contains("research question = 'How does X affect Y?'"));
    assert!(example.completion.contains("We study X in depth."));
}

#[tokio::test]
async fn test_paper_without_side_file_is_skipped() {
    let server = mock_llm().await;
    let dir = TempDir::new().expect("temp dir");

    std::fs::write(
        dir.path().join("1.pdf"),
        create_test_pdf(&[&["Title"], &["Body one."]]),
    )
    .expect("write pdf");
    std::fs::write(
        dir.path().join("2.pdf"),
        create_test_pdf(&[&["Title"], &["Body two."]]),
    )
    .expect("write pdf");
    std::fs::write(
        dir.path().join("2.csv"),
        "publicationYear,authors,title,abstract\n2021,\"[A B]\",T,Abs\n",
    )
    .expect("write side-file");

    let summary = Pipeline::new(pipeline_config(&dir), deriver(&server.uri()))
        .run()
        .await
        .expect("pipeline run");
    assert_eq!(summary.examples, 1);
    assert_eq!(summary.skipped, 1);

    let examples = read_dataset(&dir);
    assert!(examples[0].completion.contains("Body two."));
}

#[tokio::test]
async fn test_single_page_paper_is_skipped_even_with_metadata() {
    let server = mock_llm().await;
    let dir = TempDir::new().expect("temp dir");

    std::fs::write(
        dir.path().join("1.pdf"),
        create_test_pdf(&[&["Only a title page"]]),
    )
    .expect("write pdf");
    std::fs::write(
        dir.path().join("1.csv"),
        "publicationYear,authors,title,abstract\n2021,\"[A B]\",T,Abs\n",
    )
    .expect("write side-file");

    let summary = Pipeline::new(pipeline_config(&dir), deriver(&server.uri()))
        .run()
        .await
        .expect("pipeline run");
    assert_eq!(summary.examples, 0);
    assert_eq!(summary.skipped, 1);
    assert!(read_dataset(&dir).is_empty());

    // The LLM is never called for a paper with no extracted text.
    assert!(server.received_requests().await.expect("requests").is_empty());
}

#[tokio::test]
async fn test_llm_failure_skips_paper_after_retries() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("down"))
        .mount(&server)
        .await;
    let dir = TempDir::new().expect("temp dir");

    std::fs::write(
        dir.path().join("1.pdf"),
        create_test_pdf(&[&["Title"], &["Body text."]]),
    )
    .expect("write pdf");
    std::fs::write(
        dir.path().join("1.csv"),
        "publicationYear,authors,title,abstract\n2021,\"[A B]\",T,Abs\n",
    )
    .expect("write side-file");

    let summary = Pipeline::new(pipeline_config(&dir), deriver(&server.uri()))
        .run()
        .await
        .expect("pipeline run");
    assert_eq!(summary.examples, 0);
    assert_eq!(summary.skipped, 1);

    // Both retry attempts reached the service.
    assert_eq!(server.received_requests().await.expect("requests").len(), 2);
}
