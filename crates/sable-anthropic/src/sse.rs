// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SSE parser for Messages API streaming responses.

use std::pin::Pin;

use eventsource_stream::Eventsource;
use futures::stream::{Stream, StreamExt};
use sable_core::SableError;
use serde::de::DeserializeOwned;

use crate::types::{
    ApiError, SseContentBlockDelta, SseContentBlockStart, SseContentBlockStop, SseMessageDelta,
    SseMessageStart,
};

/// Typed events of the Anthropic streaming protocol.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    MessageStart(SseMessageStart),
    ContentBlockStart(SseContentBlockStart),
    ContentBlockDelta(SseContentBlockDelta),
    ContentBlockStop(SseContentBlockStop),
    MessageDelta(SseMessageDelta),
    MessageStop,
    Ping,
    Error(ApiError),
}

pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, SableError>> + Send>>;

fn decode<T: DeserializeOwned>(event: &str, data: &str) -> Result<T, SableError> {
    serde_json::from_str(data).map_err(|e| SableError::Provider {
        message: format!("failed to parse {event}: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Decodes one SSE event by name. Unknown event names yield `None`.
pub fn parse_event(event: &str, data: &str) -> Option<Result<StreamEvent, SableError>> {
    let parsed = match event {
        "message_start" => decode(event, data).map(StreamEvent::MessageStart),
        "content_block_start" => decode(event, data).map(StreamEvent::ContentBlockStart),
        "content_block_delta" => decode(event, data).map(StreamEvent::ContentBlockDelta),
        "content_block_stop" => decode(event, data).map(StreamEvent::ContentBlockStop),
        "message_delta" => decode(event, data).map(StreamEvent::MessageDelta),
        "message_stop" => Ok(StreamEvent::MessageStop),
        "ping" => Ok(StreamEvent::Ping),
        "error" => decode(event, data).map(StreamEvent::Error),
        _ => return None,
    };
    Some(parsed)
}

/// Turns a streaming HTTP response into typed [`StreamEvent`]s.
pub fn parse_sse_stream(response: reqwest::Response) -> EventStream {
    let events = response.bytes_stream().eventsource().filter_map(|result| async move {
        match result {
            Ok(event) => parse_event(&event.event, &event.data),
            Err(e) => Some(Err(SableError::provider(format!("SSE stream error: {e}")))),
        }
    });
    Box::pin(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SseDelta;

    async fn serve_sse(body: &str) -> (wiremock::MockServer, reqwest::Response) {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body.to_string()),
            )
            .mount(&server)
            .await;
        let resp = reqwest::get(server.uri()).await.unwrap();
        (server, resp)
    }

    #[test]
    fn text_delta_event() {
        let event = parse_event(
            "content_block_delta",
            r#"{"index":0,"delta":{"type":"text_delta","text":"Hello"}}"#,
        )
        .unwrap()
        .unwrap();
        match event {
            StreamEvent::ContentBlockDelta(d) => {
                assert_eq!(d.index, 0);
                assert!(matches!(d.delta, SseDelta::TextDelta { ref text } if text == "Hello"));
            }
            other => panic!("expected ContentBlockDelta, got {other:?}"),
        }
    }

    #[test]
    fn unknown_event_is_skipped() {
        assert!(parse_event("future_event", "{}").is_none());
    }

    #[test]
    fn malformed_payload_is_an_error() {
        let err = parse_event("message_delta", "{not json").unwrap().unwrap_err();
        assert!(err.to_string().contains("message_delta"));
    }

    #[test]
    fn error_event_carries_type_and_message() {
        let event = parse_event(
            "error",
            r#"{"error":{"type":"overloaded_error","message":"Overloaded"}}"#,
        )
        .unwrap()
        .unwrap();
        match event {
            StreamEvent::Error(e) => {
                assert_eq!(e.error.type_, "overloaded_error");
                assert_eq!(e.error.message, "Overloaded");
            }
            other => panic!("expected Error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn stream_skips_unknown_and_parses_in_order() {
        let body = concat!(
            "event: ping\ndata: {}\n\n",
            "event: unknown_future_event\ndata: {\"a\":1}\n\n",
            "event: message_delta\ndata: {\"delta\":{\"stop_reason\":\"end_turn\"},\"usage\":{\"output_tokens\":25}}\n\n",
            "event: message_stop\ndata: {}\n\n",
        );
        let (_server, response) = serve_sse(body).await;
        let events: Vec<_> = parse_sse_stream(response).collect().await;
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], Ok(StreamEvent::Ping)));
        match &events[1] {
            Ok(StreamEvent::MessageDelta(md)) => {
                assert_eq!(md.delta.stop_reason.as_deref(), Some("end_turn"));
                assert_eq!(md.usage.as_ref().unwrap().output_tokens, 25);
            }
            other => panic!("expected MessageDelta, got {other:?}"),
        }
        assert!(matches!(events[2], Ok(StreamEvent::MessageStop)));
    }
}
