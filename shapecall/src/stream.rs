//! Streaming text output.
//!
//! A [`TextStream`] yields the fragments of one generation in order. It is
//! finite and single-consumer; callers that need the text twice buffer it
//! with [`collect_text`]. Dropping the stream stops consumption.

use std::fmt;
use std::pin::Pin;

use futures::{Stream, StreamExt};

use crate::error::{BackendError, Result};

/// Ordered, finite sequence of text fragments.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// What one NDJSON line of a streamed response carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A text fragment, possibly empty.
    Text(String),
    /// The final line, with whatever text it still carries. Nothing follows.
    Done(String),
}

/// Reassembles newline-delimited lines from arbitrary network chunks.
///
/// Bytes are buffered rather than text, so a multi-byte character split
/// across two chunks decodes intact.
#[derive(Debug, Default, Clone)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `bytes` and returns every line completed by them, without line
    /// terminators. Blank lines are dropped.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            if let Some(line) = decode_line(&line) {
                lines.push(line);
            }
        }
        lines
    }

    /// Returns the unterminated remainder, if it is not blank.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.pending);
        decode_line(&rest)
    }
}

fn decode_line(bytes: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_owned())
}

/// Turns a byte stream of NDJSON lines into a [`TextStream`].
///
/// Each complete line goes through `parse_line`. Empty fragments are skipped,
/// and [`StreamEvent::Done`] yields its text, if any, before ending the
/// stream. The first transport or parse error is yielded and ends it too.
pub fn ndjson_text_stream<S, B, E, P>(bytes: S, parse_line: P) -> TextStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: fmt::Display + Send + 'static,
    P: Fn(&str) -> Result<StreamEvent> + Send + 'static,
{
    Box::pin(read_ndjson(bytes, parse_line))
}

// `tail_expr_drop_order` fires inside the `try_stream!` expansion.
#[allow(tail_expr_drop_order)]
fn read_ndjson<S, B, E, P>(bytes: S, parse_line: P) -> impl Stream<Item = Result<String>> + Send
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: fmt::Display + Send + 'static,
    P: Fn(&str) -> Result<StreamEvent> + Send + 'static,
{
    async_stream::try_stream! {
        let mut bytes = Box::pin(bytes);
        let mut buffer = LineBuffer::new();
        let mut done = false;

        while !done {
            let lines = match bytes.next().await {
                Some(chunk) => {
                    let chunk = chunk.map_err(|e| BackendError::stream(e.to_string()))?;
                    buffer.push(chunk.as_ref())
                }
                None => {
                    done = true;
                    buffer.finish().into_iter().collect()
                }
            };

            for line in lines {
                match parse_line(&line)? {
                    StreamEvent::Text(text) if text.is_empty() => {}
                    StreamEvent::Text(text) => yield text,
                    StreamEvent::Done(text) => {
                        done = true;
                        if !text.is_empty() {
                            yield text;
                        }
                        break;
                    }
                }
            }
        }
    }
}

/// A stream over already-known fragments.
#[must_use]
pub fn text_stream<I>(fragments: I) -> TextStream
where
    I: IntoIterator<Item = String>,
    I::IntoIter: Send + 'static,
{
    Box::pin(futures::stream::iter(fragments.into_iter().map(Ok)))
}

/// Concatenates every fragment, in order.
///
/// # Errors
///
/// Returns the first error the stream yields.
pub async fn collect_text(mut stream: TextStream) -> Result<String> {
    let mut text = String::new();
    while let Some(fragment) = stream.next().await {
        text.push_str(&fragment?);
    }
    Ok(text)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn chunks(parts: &[&'static [u8]]) -> impl Stream<Item = std::result::Result<Vec<u8>, String>> + Send + 'static {
        let owned: Vec<std::result::Result<Vec<u8>, String>> =
            parts.iter().map(|p| Ok(p.to_vec())).collect();
        futures::stream::iter(owned)
    }

    fn parse(line: &str) -> Result<StreamEvent> {
        let value: serde_json::Value = serde_json::from_str(line)?;
        let text = value["response"].as_str().unwrap_or_default().to_owned();
        if value["done"].as_bool() == Some(true) {
            return Ok(StreamEvent::Done(text));
        }
        Ok(StreamEvent::Text(text))
    }

    mod line_buffer {
        use super::*;

        #[test]
        fn splits_complete_lines() {
            let mut buffer = LineBuffer::new();
            assert_eq!(buffer.push(b"a\nb\n\nc"), ["a", "b"]);
            assert_eq!(buffer.push(b"d\r\n"), ["cd"]);
            assert_eq!(buffer.finish(), None);
        }

        #[test]
        fn keeps_split_multibyte_characters() {
            let text = "héllo\n".as_bytes();
            let mut buffer = LineBuffer::new();
            assert!(buffer.push(&text[..2]).is_empty());
            assert_eq!(buffer.push(&text[2..]), ["héllo"]);
        }

        #[test]
        fn finish_flushes_remainder() {
            let mut buffer = LineBuffer::new();
            assert!(buffer.push(b"  tail  ").is_empty());
            assert_eq!(buffer.finish().as_deref(), Some("tail"));
            assert_eq!(buffer.finish(), None);
        }
    }

    mod ndjson {
        use super::*;

        #[tokio::test]
        async fn fragments_concatenate_in_order() {
            let stream = ndjson_text_stream(
                chunks(&[
                    b"{\"response\":\"Hel\"}\n{\"respo",
                    b"nse\":\"lo, \"}\n",
                    b"{\"response\":\"world\"}\n{\"done\":true}\n",
                ]),
                parse,
            );
            assert_eq!(collect_text(stream).await.unwrap(), "Hello, world");
        }

        #[tokio::test]
        async fn done_stops_reading() {
            let stream = ndjson_text_stream(
                chunks(&[b"{\"response\":\"a\"}\n{\"done\":true}\n{\"response\":\"b\"}\n"]),
                parse,
            );
            let fragments: Vec<String> = stream.map(|r| r.unwrap()).collect().await;
            assert_eq!(fragments, ["a"]);
        }

        #[tokio::test]
        async fn final_line_text_is_kept() {
            let stream = ndjson_text_stream(
                chunks(&[b"{\"response\":\"a\"}\n{\"response\":\"b\",\"done\":true}\n"]),
                parse,
            );
            let fragments: Vec<String> = stream.map(|r| r.unwrap()).collect().await;
            assert_eq!(fragments, ["a", "b"]);
        }

        #[tokio::test]
        async fn skips_empty_fragments_and_reads_unterminated_tail() {
            let stream = ndjson_text_stream(
                chunks(&[b"{\"response\":\"\"}\n{\"response\":\"x\"}"]),
                parse,
            );
            let fragments: Vec<String> = stream.map(|r| r.unwrap()).collect().await;
            assert_eq!(fragments, ["x"]);
        }

        #[tokio::test]
        async fn parse_error_ends_stream() {
            let mut stream = ndjson_text_stream(
                chunks(&[b"{\"response\":\"a\"}\nnot json\n{\"response\":\"b\"}\n"]),
                parse,
            );
            assert_eq!(stream.next().await.unwrap().unwrap(), "a");
            assert!(matches!(stream.next().await, Some(Err(Error::Json(_)))));
            assert!(stream.next().await.is_none());
        }

        #[tokio::test]
        async fn transport_error_is_stream_error() {
            let parts: Vec<std::result::Result<Vec<u8>, String>> = vec![
                Ok(b"{\"response\":\"a\"}\n".to_vec()),
                Err("connection reset".to_owned()),
            ];
            let stream = ndjson_text_stream(futures::stream::iter(parts), parse);
            let err = collect_text(stream).await.unwrap_err();
            assert!(matches!(err, Error::Backend(BackendError::Stream(_))));
        }
    }

    #[tokio::test]
    async fn collect_known_fragments() {
        let stream = text_stream(["Hel", "lo, ", "world"].map(String::from));
        assert_eq!(collect_text(stream).await.unwrap(), "Hello, world");
    }
}
