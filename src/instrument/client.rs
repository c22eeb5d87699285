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

//! Outbound request instrumentation.
//!
//! [`trace_request`] starts an exit span for an outbound HTTP request,
//! injects the propagation header and attaches the [`ClientTrace`]
//! lifecycle callbacks to the request extensions. The caller performs the
//! round-trip, tags transport errors and finishes the span by dropping it:
//!
//! ```
//! use httpspan::{instrument::client::trace_request, trace::tracer::Tracer};
//!
//! let tracer = Tracer::new("gateway", "node_0", ());
//! let mut context = tracer.create_trace_context();
//!
//! let request = http::Request::builder()
//!     .method(http::Method::GET)
//!     .uri("http://upstream:8082/pong")
//!     .body(())
//!     .unwrap();
//!
//! let (request, span) = trace_request("GET /pong", &mut context, request);
//! assert!(request.headers().contains_key("x-trace-context"));
//!
//! // Perform the round-trip with `request`, tag failures with
//! // `span.span_object_mut().is_error = true`, then finish:
//! drop(span);
//! ```

use crate::trace::{
    propagation::{context::TRACE_CONTEXT_HEADER_KEY, encoder::encode_propagation},
    span::{Span, SpanHandle},
    trace_context::TracingContext,
};
use http::{HeaderValue, Request};
use std::{net::IpAddr, time::Duration};

/// Start an exit span for `request` and prepare the request for sending.
///
/// The span is a child of the context's active span and takes its peer from
/// the request URI authority. The span's context is encoded into the
/// [`TRACE_CONTEXT_HEADER_KEY`] header, and a [`ClientTrace`] is stored in
/// the request extensions for the transport to fire lifecycle events
/// through.
///
/// The returned span stays open: the caller finishes it after the
/// round-trip completes and is responsible for tagging transport errors on
/// it. This function does not perform the network call.
pub fn trace_request<B>(
    operation_name: &str,
    context: &mut TracingContext,
    mut request: Request<B>,
) -> (Request<B>, Span) {
    let address = request
        .uri()
        .authority()
        .map(|authority| authority.as_str().to_owned())
        .unwrap_or_default();
    let span = context.create_exit_span(operation_name, &address);

    let header = encode_propagation(context, request.uri().path(), &address);
    let value = HeaderValue::from_str(&header).expect("propagation header is valid ASCII");
    request.headers_mut().insert(TRACE_CONTEXT_HEADER_KEY, value);
    request
        .extensions_mut()
        .insert(ClientTrace::new(span.handle()));

    (request, span)
}

/// Connection details reported when a connection is acquired.
#[derive(Debug, Clone, Default)]
pub struct ConnectionInfo {
    /// Whether the connection was reused from a pool.
    pub reused: bool,
    /// Whether the connection was idle before being handed out.
    pub was_idle: bool,
    /// How long the connection was idle, when known.
    pub idle_time: Option<Duration>,
}

/// Lifecycle callbacks for one outbound request.
///
/// [`trace_request`] stores a `ClientTrace` in the request extensions; the
/// transport integration retrieves it and invokes the callbacks as the
/// corresponding events fire during connection setup and request execution.
/// Every callback appends exactly one log entry to the span; an event that
/// doesn't fire leaves no entry. Callbacks are safe to invoke from any
/// execution context and tolerate racing the span's finish, entries
/// appended after the span finished are discarded.
#[derive(Clone)]
pub struct ClientTrace {
    span: SpanHandle,
}

impl ClientTrace {
    pub(crate) fn new(span: SpanHandle) -> Self {
        Self { span }
    }

    /// A connection is about to be obtained for `host_port`.
    pub fn get_conn(&self, host_port: &str) {
        self.span
            .add_log([("event", "get connection"), ("host:port", host_port)]);
    }

    /// A connection was obtained.
    pub fn got_conn(&self, info: ConnectionInfo) {
        let idle_time = info
            .idle_time
            .map(|idle| idle.as_millis().to_string())
            .unwrap_or_default();
        self.span.add_log([
            ("event".to_string(), "got connection".to_string()),
            ("reused".to_string(), info.reused.to_string()),
            ("was_idle".to_string(), info.was_idle.to_string()),
            ("idle_time_ms".to_string(), idle_time),
        ]);
    }

    /// DNS resolution started for `host`. Never fires for IP literal hosts.
    pub fn dns_start(&self, host: &str) {
        self.span.add_log([("event", "dns start"), ("host", host)]);
    }

    /// DNS resolution finished.
    pub fn dns_done(&self, addrs: &[IpAddr], error: Option<&str>) {
        let addrs = addrs
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        self.span.add_log([
            ("event".to_string(), "dns done".to_string()),
            ("addrs".to_string(), addrs),
            ("error".to_string(), error.unwrap_or_default().to_string()),
        ]);
    }

    /// Connection establishment to `addr` over `network` completed.
    pub fn connect_done(&self, network: &str, addr: &str, error: Option<&str>) {
        self.span.add_log([
            ("event", "connect done"),
            ("network", network),
            ("address", addr),
            ("error", error.unwrap_or_default()),
        ]);
    }

    /// The first byte of the response arrived.
    pub fn got_first_response_byte(&self) {
        self.span.add_log([("event", "got first response byte")]);
    }

    /// The request, including any body, was fully written.
    pub fn wrote_request(&self, error: Option<&str>) {
        self.span.add_log([
            ("event", "wrote request"),
            ("error", error.unwrap_or_default()),
        ]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait AssertSyncSend: Sync + Send {}

    impl AssertSyncSend for ClientTrace {}
}
