// Licensed to the Apache Software Foundation (ASF) under one or more
// contributor license agreements.  See the NOTICE file distributed with
// this work for additional information regarding copyright ownership.
// The ASF licenses this file to You under the Apache License, Version 2.0
// (the "License"); you may not use this file except in compliance with
// the License.  You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

mod common;

use common::CaptureReporter;
use http::{Method, Request, Response, StatusCode};
use httpspan::instrument::server::{RequestContext, TraceLayer};
use httpspan::trace::propagation::context::TRACE_CONTEXT_HEADER_KEY;
use httpspan::trace::propagation::decoder::decode_propagation;
use httpspan::trace::segment::{RefType, SpanType};
use httpspan::trace::tracer::Tracer;
use std::convert::Infallible;
use tower::{Layer, ServiceExt, service_fn};

const UPSTREAM_HEADER: &str =
    "1-MQ==-NQ==-3-bWVzaA==-aW5zdGFuY2U=-L2FwaS92MS9oZWFsdGg=-ZXhhbXBsZS5jb206ODA4MA==";

async fn ok_handler(_req: Request<()>) -> Result<Response<String>, Infallible> {
    Ok(Response::new("hoge".to_string()))
}

#[tokio::test]
async fn root_span_without_trace_header() {
    let reporter = CaptureReporter::new();
    let tracer = Tracer::new("producer", "node_0", reporter.clone());
    let service = TraceLayer::new(tracer, "/foo").layer(service_fn(ok_handler));

    let request = Request::builder().uri("/foo").body(()).unwrap();
    let response = service.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let segments = reporter.segments();
    assert_eq!(segments.len(), 1);
    let spans = &segments[0].spans;
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].operation_name, "GET /foo");
    assert_eq!(spans[0].span_type, SpanType::Entry);
    assert_eq!(spans[0].parent_span_id, -1);
    assert!(spans[0].refs.is_empty());
    assert!(spans[0].end_time >= spans[0].start_time);
}

#[tokio::test]
async fn child_span_with_trace_header() {
    let reporter = CaptureReporter::new();
    let tracer = Tracer::new("consumer", "node_0", reporter.clone());
    let service = TraceLayer::new(tracer, "/pong").layer(service_fn(ok_handler));

    let request = Request::builder()
        .method(Method::GET)
        .uri("/pong")
        .header(TRACE_CONTEXT_HEADER_KEY, UPSTREAM_HEADER)
        .body(())
        .unwrap();
    service.oneshot(request).await.unwrap();

    let segments = reporter.segments();
    assert_eq!(segments.len(), 1);
    let segment = &segments[0];
    assert_eq!(segment.trace_id, "1");

    let span = &segment.spans[0];
    assert_eq!(span.operation_name, "GET /pong");
    assert_eq!(span.refs.len(), 1);
    assert_eq!(span.refs[0].ref_type, RefType::CrossProcess);
    assert_eq!(span.refs[0].parent_trace_segment_id, "5");
    assert_eq!(span.refs[0].parent_span_id, 3);
    assert_eq!(span.refs[0].parent_service, "mesh");
}

#[tokio::test]
async fn malformed_trace_header_falls_back_to_root() {
    let reporter = CaptureReporter::new();
    let tracer = Tracer::new("consumer", "node_0", reporter.clone());
    let service = TraceLayer::new(tracer, "/pong").layer(service_fn(ok_handler));

    let request = Request::builder()
        .uri("/pong")
        .header(TRACE_CONTEXT_HEADER_KEY, "not-a-context")
        .body(())
        .unwrap();
    let response = service.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let segments = reporter.segments();
    assert_eq!(segments.len(), 1);
    let span = &segments[0].spans[0];
    assert_eq!(span.parent_span_id, -1);
    assert!(span.refs.is_empty());
}

#[tokio::test]
async fn span_finished_when_handler_errors() {
    async fn failing_handler(_req: Request<()>) -> Result<Response<String>, &'static str> {
        Err("handler exploded")
    }

    let reporter = CaptureReporter::new();
    let tracer = Tracer::new("producer", "node_0", reporter.clone());
    let service = TraceLayer::new(tracer, "/fail").layer(service_fn(failing_handler));

    let request = Request::builder().uri("/fail").body(()).unwrap();
    let result = service.oneshot(request).await;
    assert!(result.is_err());

    // The entry span finished exactly once anyway.
    let segments = reporter.segments();
    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].spans.len(), 1);
    assert_eq!(segments[0].spans[0].operation_name, "GET /fail");
}

#[tokio::test]
async fn handler_tags_span_through_request_context() {
    async fn tagging_handler(req: Request<()>) -> Result<Response<String>, Infallible> {
        let context = req
            .extensions()
            .get::<RequestContext>()
            .expect("request context missing");
        context.span().add_tag("http.status_code", "200");
        context.span().add_log([("event", "handled")]);
        Ok(Response::new("ok".to_string()))
    }

    let reporter = CaptureReporter::new();
    let tracer = Tracer::new("producer", "node_0", reporter.clone());
    let service = TraceLayer::new(tracer, "/tagged").layer(service_fn(tagging_handler));

    let request = Request::builder().uri("/tagged").body(()).unwrap();
    service.oneshot(request).await.unwrap();

    let segments = reporter.segments();
    let span = &segments[0].spans[0];
    assert_eq!(
        span.tags,
        vec![("http.status_code".to_string(), "200".to_string())]
    );
    assert_eq!(span.logs.len(), 1);
    assert_eq!(span.logs[0].data[0], ("event".to_string(), "handled".to_string()));
}

#[tokio::test]
async fn outbound_request_from_request_context() {
    async fn proxy_handler(req: Request<()>) -> Result<Response<String>, Infallible> {
        let context = req
            .extensions()
            .get::<RequestContext>()
            .expect("request context missing");

        let outbound = Request::builder()
            .method(Method::GET)
            .uri("http://consumer:8082/pong")
            .body(())
            .unwrap();
        let (outbound, span) = context.trace_request("GET /pong", outbound);

        let header = outbound
            .headers()
            .get(TRACE_CONTEXT_HEADER_KEY)
            .expect("propagation header missing")
            .to_str()
            .unwrap();
        let propagation = decode_propagation(header).unwrap();
        assert_eq!(propagation.parent_span_id, span.span_id());
        assert_eq!(propagation.parent_service, "producer");
        assert_eq!(propagation.destination_endpoint, "/pong");
        assert_eq!(propagation.destination_address, "consumer:8082");

        drop(span);
        Ok(Response::new("ok".to_string()))
    }

    let reporter = CaptureReporter::new();
    let tracer = Tracer::new("producer", "node_0", reporter.clone());
    let service = TraceLayer::new(tracer, "/ping").layer(service_fn(proxy_handler));

    let request = Request::builder().uri("/ping").body(()).unwrap();
    service.oneshot(request).await.unwrap();

    let segments = reporter.segments();
    assert_eq!(segments.len(), 1);
    let spans = &segments[0].spans;
    assert_eq!(spans.len(), 2);

    // The exit span closed inside the handler, before the entry span.
    assert_eq!(spans[0].span_type, SpanType::Exit);
    assert_eq!(spans[0].span_id, 1);
    assert_eq!(spans[0].parent_span_id, 0);
    assert_eq!(spans[0].peer, "consumer:8082");
    assert_eq!(spans[1].span_type, SpanType::Entry);
    assert_eq!(spans[1].operation_name, "GET /ping");
}
