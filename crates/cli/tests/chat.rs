mod support;

use docqa_cli::chat;
use docqa_core::session::NO_DOCUMENT_ANSWER;
use support::PARIS;

#[tokio::test]
async fn answers_each_line_until_exit() {
    let session = support::session();
    session.ingest(PARIS).await.unwrap();

    let input: &[u8] = b"What is the capital of France?\n\n   \nexit\nnever asked\n";
    let mut output = Vec::new();
    let answered = chat::run(&session, input, &mut output).await.unwrap();
    assert_eq!(answered, 1);

    let text = String::from_utf8(output).unwrap();
    assert!(text.contains("Paris is the capital of France."));
    assert!(text.contains("Confidence: "));
    assert!(!text.contains("never asked"));
}

#[tokio::test]
async fn stops_at_end_of_input() {
    let session = support::session();
    let input: &[u8] = b"Anything?";
    let mut output = Vec::new();
    let answered = chat::run(&session, input, &mut output).await.unwrap();
    assert_eq!(answered, 1);
    let text = String::from_utf8(output).unwrap();
    assert!(text.contains(NO_DOCUMENT_ANSWER));
    assert!(text.contains("Confidence: 0%"));
}
