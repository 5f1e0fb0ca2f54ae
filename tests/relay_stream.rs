//! Token-stream behavior of the streaming relay: ordering, end-marker
//! handling, malformed-line tolerance, and post-commit failure.

use bytes::Bytes;
use futures::stream::{self, StreamExt};
use ragrelay::relay::TokenStream;

type BoxedError = Box<dyn std::error::Error + Send + Sync>;

fn upstream_of(chunks: Vec<Result<Bytes, BoxedError>>) -> TokenStream {
    TokenStream::new(stream::iter(chunks).boxed())
}

fn data_line(token: &str) -> String {
    format!(
        "data: {}\n",
        serde_json::json!({ "choices": [{ "delta": { "content": token } }] })
    )
}

async fn collect_tokens(mut tokens: TokenStream) -> (String, bool) {
    let mut out = String::new();
    let mut failed = false;
    while let Some(item) = tokens.next().await {
        match item {
            Ok(bytes) => out.push_str(std::str::from_utf8(&bytes).unwrap()),
            Err(_) => failed = true,
        }
    }
    (out, failed)
}

#[tokio::test]
async fn test_tokens_forwarded_in_arrival_order() {
    let payload = format!(
        "{}{}{}data: [DONE]\n",
        data_line("The "),
        data_line("answer "),
        data_line("is 42.")
    );
    let tokens = upstream_of(vec![Ok(Bytes::from(payload))]);

    let (out, failed) = collect_tokens(tokens).await;
    assert_eq!(out, "The answer is 42.");
    assert!(!failed);
}

#[tokio::test]
async fn test_event_line_split_across_chunks() {
    let line = data_line("hello");
    let (head, tail) = line.split_at(line.len() / 2);
    let tokens = upstream_of(vec![
        Ok(Bytes::from(head.to_string())),
        Ok(Bytes::from(tail.to_string())),
        Ok(Bytes::from_static(b"data: [DONE]\n")),
    ]);

    let (out, failed) = collect_tokens(tokens).await;
    assert_eq!(out, "hello");
    assert!(!failed);
}

#[tokio::test]
async fn test_nothing_forwarded_after_done_marker() {
    let payload = format!(
        "{}data: [DONE]\n{}",
        data_line("kept"),
        data_line("dropped")
    );
    let tokens = upstream_of(vec![
        Ok(Bytes::from(payload)),
        Ok(Bytes::from(data_line("also dropped"))),
    ]);

    let (out, failed) = collect_tokens(tokens).await;
    assert_eq!(out, "kept");
    assert!(!failed);
}

#[tokio::test]
async fn test_malformed_line_skipped_neighbors_survive() {
    let payload = format!(
        "{}data: {{broken json\n{}data: [DONE]\n",
        data_line("before "),
        data_line("after")
    );
    let tokens = upstream_of(vec![Ok(Bytes::from(payload))]);

    let (out, failed) = collect_tokens(tokens).await;
    assert_eq!(out, "before after");
    assert!(!failed);
}

#[tokio::test]
async fn test_keepalive_and_empty_lines_ignored() {
    let payload = format!(
        ": keep-alive\n\n{}\r\ndata: [DONE]\n",
        data_line("token").trim_end()
    );
    let tokens = upstream_of(vec![Ok(Bytes::from(payload))]);

    let (out, failed) = collect_tokens(tokens).await;
    assert_eq!(out, "token");
    assert!(!failed);
}

#[tokio::test]
async fn test_upstream_error_truncates_stream() {
    let err: BoxedError = "connection reset by peer".into();
    let mut tokens = upstream_of(vec![Ok(Bytes::from(data_line("partial"))), Err(err)]);

    let first = tokens.next().await.unwrap();
    assert_eq!(first.unwrap(), Bytes::from("partial"));

    let second = tokens.next().await.unwrap();
    assert!(second.is_err());

    // Terminal after failure: no more items.
    assert!(tokens.next().await.is_none());
}

#[tokio::test]
async fn test_unterminated_final_line_still_forwarded() {
    // Body ends mid-line: the last event has no trailing newline.
    let line = data_line("tail");
    let tokens = upstream_of(vec![Ok(Bytes::from(line.trim_end().to_string()))]);

    let (out, failed) = collect_tokens(tokens).await;
    assert_eq!(out, "tail");
    assert!(!failed);
}

#[tokio::test]
async fn test_unterminated_done_marker_forwards_nothing() {
    let payload = format!("{}data: [DONE]", data_line("kept"));
    let tokens = upstream_of(vec![Ok(Bytes::from(payload))]);

    let (out, failed) = collect_tokens(tokens).await;
    assert_eq!(out, "kept");
    assert!(!failed);
}

#[tokio::test]
async fn test_eof_without_done_ends_cleanly() {
    let tokens = upstream_of(vec![Ok(Bytes::from(data_line("tail")))]);

    let (out, failed) = collect_tokens(tokens).await;
    assert_eq!(out, "tail");
    assert!(!failed);
}
