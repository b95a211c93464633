//! Streaming response decoder.
//!
//! The completion endpoint streams SSE-style lines of the form
//! `data: <json>` and terminates with `data: [DONE]`. Each data frame
//! carries only the incremental text delta for that step, so the decoder
//! rebuilds the cumulative text before handing the response to the
//! caller's callback.

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use tracing::{debug, trace};

use crate::completion::{CompletionChoice, CompletionResponse, Usage};
use crate::error::Error;

const DATA_PREFIX: &[u8] = b"data: ";
const DONE_SENTINEL: &[u8] = b"[DONE]";

/// One decoded data frame. Every field is optional: absent fields leave
/// the accumulated value untouched when merged.
#[derive(Debug, Deserialize)]
struct CompletionFrame {
    id: Option<String>,
    object: Option<String>,
    created: Option<u64>,
    model: Option<String>,
    choices: Option<Vec<CompletionChoice>>,
    usage: Option<Usage>,
}

/// Consume an event-stream body line by line, merging each data frame
/// into `output` and invoking `on_data` once per accepted frame.
///
/// Returns `Ok(())` only when the `[DONE]` sentinel is seen. A stream
/// that ends without the sentinel, including a clean close, is an
/// abnormal termination; `output` still holds everything merged up to
/// that point.
pub(crate) async fn decode_completion_stream<S, F>(
    body: S,
    output: &mut CompletionResponse,
    on_data: &mut F,
) -> Result<(), Error>
where
    S: Stream<Item = Result<Bytes, Error>>,
    F: FnMut(&CompletionResponse),
{
    let mut body = std::pin::pin!(body);
    let mut buffer = BytesMut::new();
    let mut carried = String::new();

    while let Some(chunk) = body.next().await {
        buffer.extend_from_slice(&chunk?);

        while let Some(end) = buffer.iter().position(|&b| b == b'\n') {
            let line = buffer.split_to(end + 1);
            if decode_line(&line, output, &mut carried, on_data)? == LineOutcome::Finished {
                debug!("stream terminated by sentinel");
                return Ok(());
            }
        }
    }

    // A trailing partial line is dropped here on purpose: without the
    // sentinel the stream already failed, whatever the buffer holds.
    Err(Error::UnexpectedEof)
}

#[derive(Debug, PartialEq, Eq)]
enum LineOutcome {
    Continue,
    Finished,
}

fn decode_line<F>(
    line: &[u8],
    output: &mut CompletionResponse,
    carried: &mut String,
    on_data: &mut F,
) -> Result<LineOutcome, Error>
where
    F: FnMut(&CompletionResponse),
{
    let line = line.trim_ascii();

    // Only data frames matter; blank lines, comments and other event
    // types are dropped.
    let Some(data) = line.strip_prefix(DATA_PREFIX) else {
        return Ok(LineOutcome::Continue);
    };
    let data = data.trim_ascii();

    if data.starts_with(DONE_SENTINEL) {
        return Ok(LineOutcome::Finished);
    }

    let frame: CompletionFrame =
        serde_json::from_slice(data).map_err(|source| Error::StreamData {
            content: String::from_utf8_lossy(data).into_owned(),
            source,
        })?;

    trace!(bytes = data.len(), "merging data frame");
    merge_frame(output, carried, frame);
    on_data(output);

    Ok(LineOutcome::Continue)
}

/// Merge one frame into the accumulated response.
///
/// Present fields replace the accumulated value, absent fields are
/// ignored, and the first choice's text is special-cased: `carried`
/// holds the cumulative text and is prepended to the frame's fragment,
/// so the accumulator always holds the full concatenation.
///
/// `carried` persists across frames and is refreshed only when the
/// accumulator has a first choice. A frame that replaces the choice
/// list with an empty one therefore does not lose the text gathered so
/// far; the next fragment continues from it.
fn merge_frame(output: &mut CompletionResponse, carried: &mut String, frame: CompletionFrame) {
    if let Some(choice) = output.choices.first() {
        carried.clone_from(&choice.text);
    }

    if let Some(id) = frame.id {
        output.id = id;
    }
    if let Some(object) = frame.object {
        output.object = object;
    }
    if let Some(created) = frame.created {
        output.created = created;
    }
    if let Some(model) = frame.model {
        output.model = model;
    }
    if let Some(usage) = frame.usage {
        output.usage = usage;
    }
    if let Some(choices) = frame.choices {
        output.choices = choices;
        if let Some(choice) = output.choices.first_mut() {
            choice.text.insert_str(0, carried);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn frame_with_text(text: &str) -> CompletionFrame {
        CompletionFrame {
            id: None,
            object: None,
            created: None,
            model: None,
            choices: Some(vec![CompletionChoice {
                text: text.to_string(),
                ..CompletionChoice::default()
            }]),
            usage: None,
        }
    }

    fn chunks(parts: &[&str]) -> Vec<Result<Bytes, Error>> {
        parts
            .iter()
            .map(|part| Ok(Bytes::copy_from_slice(part.as_bytes())))
            .collect()
    }

    async fn decode(
        parts: Vec<Result<Bytes, Error>>,
    ) -> (CompletionResponse, Vec<String>, Result<(), Error>) {
        let mut output = CompletionResponse::default();
        let mut observed = Vec::new();
        let result = decode_completion_stream(stream::iter(parts), &mut output, &mut |res| {
            let text = res
                .choices
                .first()
                .map(|choice| choice.text.clone())
                .unwrap_or_default();
            observed.push(text);
        })
        .await;
        (output, observed, result)
    }

    #[test]
    fn merge_concatenates_first_choice_text() {
        let mut output = CompletionResponse::default();
        let mut carried = String::new();
        merge_frame(&mut output, &mut carried, frame_with_text("Hello"));
        merge_frame(&mut output, &mut carried, frame_with_text(", world"));
        assert_eq!(output.choices[0].text, "Hello, world");
    }

    #[test]
    fn merge_replaces_non_text_fields_per_frame() {
        let mut output = CompletionResponse::default();
        let mut carried = String::new();
        merge_frame(
            &mut output,
            &mut carried,
            CompletionFrame {
                id: Some("cmpl-1".into()),
                model: Some("ada".into()),
                ..frame_with_text("a")
            },
        );
        merge_frame(
            &mut output,
            &mut carried,
            CompletionFrame {
                id: Some("cmpl-2".into()),
                ..frame_with_text("b")
            },
        );

        assert_eq!(output.id, "cmpl-2");
        assert_eq!(output.model, "ada");
        assert_eq!(output.choices[0].text, "ab");
    }

    #[test]
    fn merge_without_choices_keeps_accumulated_choices() {
        let mut output = CompletionResponse::default();
        let mut carried = String::new();
        merge_frame(&mut output, &mut carried, frame_with_text("keep"));
        merge_frame(
            &mut output,
            &mut carried,
            CompletionFrame {
                usage: Some(Usage {
                    total_tokens: 7,
                    ..Usage::default()
                }),
                choices: None,
                id: None,
                object: None,
                created: None,
                model: None,
            },
        );

        assert_eq!(output.choices[0].text, "keep");
        assert_eq!(output.usage.total_tokens, 7);
    }

    #[test]
    fn merge_carries_text_past_a_frame_with_empty_choices() {
        let mut output = CompletionResponse::default();
        let mut carried = String::new();
        merge_frame(&mut output, &mut carried, frame_with_text("A"));
        merge_frame(
            &mut output,
            &mut carried,
            CompletionFrame {
                choices: Some(Vec::new()),
                id: None,
                object: None,
                created: None,
                model: None,
                usage: None,
            },
        );
        assert!(output.choices.is_empty());

        merge_frame(&mut output, &mut carried, frame_with_text("B"));
        assert_eq!(output.choices[0].text, "AB");
    }

    #[tokio::test]
    async fn accumulates_across_frames_until_sentinel() {
        let (output, observed, result) = decode(chunks(&[
            "data: {\"choices\":[{\"text\":\"Hello\"}]}\n",
            "data: {\"choices\":[{\"text\":\", world\"}]}\n",
            "data: [DONE]\n",
        ]))
        .await;

        result.unwrap();
        assert_eq!(observed, vec!["Hello", "Hello, world"]);
        assert_eq!(output.choices[0].text, "Hello, world");
    }

    #[tokio::test]
    async fn empty_choices_frame_does_not_drop_accumulated_text() {
        let (output, observed, result) = decode(chunks(&[
            "data: {\"choices\":[{\"text\":\"A\"}]}\n",
            "data: {\"choices\":[]}\n",
            "data: {\"choices\":[{\"text\":\"B\"}]}\n",
            "data: [DONE]\n",
        ]))
        .await;

        result.unwrap();
        assert_eq!(observed, vec!["A", "", "AB"]);
        assert_eq!(output.choices[0].text, "AB");
    }

    #[tokio::test]
    async fn handles_frames_split_across_chunks() {
        let (output, observed, result) = decode(chunks(&[
            "data: {\"choices\":[{\"te",
            "xt\":\"Hel",
            "lo\"}]}\ndata: [D",
            "ONE]\n",
        ]))
        .await;

        result.unwrap();
        assert_eq!(observed, vec!["Hello"]);
        assert_eq!(output.choices[0].text, "Hello");
    }

    #[tokio::test]
    async fn skips_lines_without_data_prefix() {
        let (output, observed, result) = decode(chunks(&[
            "\n",
            ": keep-alive\n",
            "event: message\n",
            "data: {\"choices\":[{\"text\":\"ok\"}]}\n",
            "data: [DONE]\n",
        ]))
        .await;

        result.unwrap();
        assert_eq!(observed, vec!["ok"]);
        assert_eq!(output.choices[0].text, "ok");
    }

    #[tokio::test]
    async fn stream_end_without_sentinel_is_an_error() {
        let (output, observed, result) =
            decode(chunks(&["data: {\"choices\":[{\"text\":\"part\"}]}\n"])).await;

        assert!(matches!(result, Err(Error::UnexpectedEof)));
        assert_eq!(observed, vec!["part"]);
        assert_eq!(output.choices[0].text, "part");
    }

    #[tokio::test]
    async fn empty_stream_is_an_error() {
        let (output, observed, result) = decode(Vec::new()).await;

        assert!(matches!(result, Err(Error::UnexpectedEof)));
        assert!(observed.is_empty());
        assert!(output.choices.is_empty());
    }

    #[tokio::test]
    async fn malformed_frame_aborts_with_prior_accumulation() {
        let (output, observed, result) = decode(chunks(&[
            "data: {\"choices\":[{\"text\":\"good\"}]}\n",
            "data: {not json}\n",
            "data: {\"choices\":[{\"text\":\"never\"}]}\n",
        ]))
        .await;

        match result {
            Err(Error::StreamData { content, .. }) => assert_eq!(content, "{not json}"),
            other => panic!("expected stream data error, got {other:?}"),
        }
        assert_eq!(observed, vec!["good"]);
        assert_eq!(output.choices[0].text, "good");
    }

    #[tokio::test]
    async fn read_failure_surfaces_the_transport_error() {
        let parts = vec![
            Ok(Bytes::from_static(b"data: {\"choices\":[{\"text\":\"hi\"}]}\n")),
            Err(Error::Configuration("connection reset".to_string())),
        ];
        let (output, observed, result) = decode(parts).await;

        assert!(matches!(result, Err(Error::Configuration(_))));
        assert_eq!(observed, vec!["hi"]);
        assert_eq!(output.choices[0].text, "hi");
    }
}
