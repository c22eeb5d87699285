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
use http::{Method, Request};
use httpspan::instrument::client::{ClientTrace, ConnectionInfo, trace_request};
use httpspan::trace::propagation::context::TRACE_CONTEXT_HEADER_KEY;
use httpspan::trace::propagation::decoder::decode_propagation;
use httpspan::trace::tracer::Tracer;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

fn outbound_request(uri: &str) -> Request<()> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(())
        .unwrap()
}

#[test]
fn injected_header_round_trips() {
    let reporter = CaptureReporter::new();
    let tracer = Tracer::new("producer", "node_0", reporter.clone());
    let mut context = tracer.create_trace_context();
    let entry = context.create_entry_span("GET /ping");

    let (request, span) = trace_request(
        "GET /pong",
        &mut context,
        outbound_request("http://consumer:8082/pong"),
    );

    let header = request
        .headers()
        .get(TRACE_CONTEXT_HEADER_KEY)
        .expect("propagation header missing")
        .to_str()
        .unwrap();
    let propagation = decode_propagation(header).unwrap();
    assert!(propagation.do_sample);
    assert_eq!(propagation.parent_trace_id, context.trace_id());
    assert_eq!(propagation.parent_trace_segment_id, context.trace_segment_id());
    assert_eq!(propagation.parent_span_id, span.span_id());
    assert_eq!(propagation.parent_service, "producer");
    assert_eq!(propagation.parent_service_instance, "node_0");
    assert_eq!(propagation.destination_endpoint, "/pong");
    assert_eq!(propagation.destination_address, "consumer:8082");

    drop(span);
    drop(entry);
    drop(context);
    let segments = reporter.segments();
    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].spans.len(), 2);
}

#[test]
fn lifecycle_callbacks_append_one_log_each() {
    let reporter = CaptureReporter::new();
    let tracer = Tracer::new("producer", "node_0", reporter.clone());
    let mut context = tracer.create_trace_context();

    let (request, span) = trace_request(
        "GET /pong",
        &mut context,
        outbound_request("http://consumer:8082/pong"),
    );
    let trace = request
        .extensions()
        .get::<ClientTrace>()
        .expect("client trace missing")
        .clone();

    trace.get_conn("consumer:8082");
    trace.got_conn(ConnectionInfo {
        reused: true,
        was_idle: true,
        idle_time: Some(Duration::from_millis(5)),
    });
    trace.dns_start("consumer");
    trace.dns_done(&[IpAddr::V4(Ipv4Addr::LOCALHOST)], None);
    trace.connect_done("tcp", "127.0.0.1:8082", None);
    trace.wrote_request(None);
    trace.got_first_response_byte();

    drop(span);
    drop(context);

    let segments = reporter.segments();
    let span = &segments[0].spans[0];
    assert_eq!(span.logs.len(), 7);

    let events: Vec<&str> = span
        .logs
        .iter()
        .map(|log| log.data[0].1.as_str())
        .collect();
    assert_eq!(
        events,
        vec![
            "get connection",
            "got connection",
            "dns start",
            "dns done",
            "connect done",
            "wrote request",
            "got first response byte",
        ]
    );
    for log in &span.logs {
        assert_eq!(log.data[0].0, "event");
    }
}

#[test]
fn no_logs_for_events_that_do_not_fire() {
    let reporter = CaptureReporter::new();
    let tracer = Tracer::new("producer", "node_0", reporter.clone());
    let mut context = tracer.create_trace_context();

    // IP literal host, DNS never fires.
    let (request, span) = trace_request(
        "GET /pong",
        &mut context,
        outbound_request("http://127.0.0.1:8082/pong"),
    );
    let trace = request
        .extensions()
        .get::<ClientTrace>()
        .expect("client trace missing")
        .clone();

    trace.get_conn("127.0.0.1:8082");
    trace.connect_done("tcp", "127.0.0.1:8082", None);

    drop(span);
    drop(context);

    let segments = reporter.segments();
    let span = &segments[0].spans[0];
    assert_eq!(span.logs.len(), 2);
    assert!(
        span.logs
            .iter()
            .all(|log| !log.data[0].1.starts_with("dns"))
    );
}

#[test]
fn callbacks_fire_from_other_threads() {
    let reporter = CaptureReporter::new();
    let tracer = Tracer::new("producer", "node_0", reporter.clone());
    let mut context = tracer.create_trace_context();

    let (request, span) = trace_request(
        "GET /pong",
        &mut context,
        outbound_request("http://consumer:8082/pong"),
    );
    let trace = request
        .extensions()
        .get::<ClientTrace>()
        .expect("client trace missing")
        .clone();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let trace = trace.clone();
            std::thread::spawn(move || trace.got_first_response_byte())
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    drop(span);
    drop(context);

    let segments = reporter.segments();
    assert_eq!(segments[0].spans[0].logs.len(), 4);
}

#[test]
fn late_callbacks_after_finish_are_discarded() {
    let reporter = CaptureReporter::new();
    let tracer = Tracer::new("producer", "node_0", reporter.clone());
    let mut context = tracer.create_trace_context();

    let (request, span) = trace_request(
        "GET /pong",
        &mut context,
        outbound_request("http://consumer:8082/pong"),
    );
    let trace = request
        .extensions()
        .get::<ClientTrace>()
        .expect("client trace missing")
        .clone();

    drop(span);
    trace.got_first_response_byte();
    drop(context);

    let segments = reporter.segments();
    assert!(segments[0].spans[0].logs.is_empty());
}

#[test]
fn caller_tags_transport_error() {
    let reporter = CaptureReporter::new();
    let tracer = Tracer::new("producer", "node_0", reporter.clone());
    let mut context = tracer.create_trace_context();

    let (_request, mut span) = trace_request(
        "GET /pong",
        &mut context,
        outbound_request("http://consumer:8082/pong"),
    );
    span.span_object_mut().is_error = true;

    drop(span);
    drop(context);

    let segments = reporter.segments();
    assert!(segments[0].spans[0].is_error);
}

#[test]
fn error_flag_through_span_handle() {
    let reporter = CaptureReporter::new();
    let tracer = Tracer::new("producer", "node_0", reporter.clone());
    let mut context = tracer.create_trace_context();

    let (_request, span) = trace_request(
        "GET /pong",
        &mut context,
        outbound_request("http://consumer:8082/pong"),
    );
    span.handle().set_error();

    drop(span);
    drop(context);

    let segments = reporter.segments();
    assert!(segments[0].spans[0].is_error);
}
