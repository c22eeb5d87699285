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

//! Recorded trace data model. A [`TraceSegment`] is the unit handed to the
//! reporter when a tracing context completes.

use crate::common::{TimePeriod, fetch_time};
use serde::{Deserialize, Serialize};

/// Kind of a span within its segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpanType {
    /// Inbound to this service.
    Entry,
    /// Outbound from this service.
    Exit,
    /// Internal to this service.
    Local,
}

/// How a reference to another trace segment came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefType {
    /// The parent span lives in another process, propagated via headers.
    CrossProcess,
    /// The parent span lives in another thread of this process.
    CrossThread,
}

/// Link from a span to its parent span in another trace segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanReference {
    /// Kind of the link.
    pub ref_type: RefType,
    /// Trace id shared with the parent.
    pub trace_id: String,
    /// Segment id of the parent span.
    pub parent_trace_segment_id: String,
    /// Span id of the parent span within its segment.
    pub parent_span_id: i32,
    /// Service name the parent belongs to.
    pub parent_service: String,
    /// Service instance the parent belongs to.
    pub parent_service_instance: String,
    /// Endpoint name the parent requested.
    pub parent_endpoint: String,
    /// Address the parent used to reach this service.
    pub network_address_used_at_peer: String,
}

/// A single structured log entry attached to a span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Milliseconds since the epoch at append time.
    pub time: i64,
    /// Key-value payload.
    pub data: Vec<(String, String)>,
}

impl LogEntry {
    /// New entry stamped with the current time.
    pub(crate) fn now<K, V, I>(message: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        LogEntry {
            time: fetch_time(TimePeriod::Log),
            data: message
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

/// The recorded form of one span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanObject {
    /// Id of this span, unique within its segment.
    pub span_id: i32,
    /// Id of the parent span within the same segment, `-1` for a root span.
    pub parent_span_id: i32,
    /// Milliseconds since the epoch when the span started.
    pub start_time: i64,
    /// Milliseconds since the epoch when the span finished, `0` while open.
    pub end_time: i64,
    /// References to parent spans in other segments.
    pub refs: Vec<SpanReference>,
    /// Operation name, e.g. `"GET /ping"`.
    pub operation_name: String,
    /// Remote address for exit spans, empty otherwise.
    pub peer: String,
    /// Kind of the span.
    pub span_type: SpanType,
    /// Whether the operation failed.
    pub is_error: bool,
    /// Key-value tags.
    pub tags: Vec<(String, String)>,
    /// Structured log entries.
    pub logs: Vec<LogEntry>,
}

impl SpanObject {
    pub(crate) fn new(
        span_id: i32,
        parent_span_id: i32,
        operation_name: String,
        peer: String,
        span_type: SpanType,
    ) -> Self {
        SpanObject {
            span_id,
            parent_span_id,
            start_time: fetch_time(TimePeriod::Start),
            end_time: 0,
            refs: Vec::new(),
            operation_name,
            peer,
            span_type,
            is_error: false,
            tags: Vec::new(),
            logs: Vec::new(),
        }
    }

    /// Append one log entry, stamped with the current time.
    pub fn add_log<K, V, I>(&mut self, message: I)
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.logs.push(LogEntry::now(message));
    }

    /// Append a tag.
    pub fn add_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.tags.push((key.into(), value.into()));
    }
}

/// All spans finished under one tracing context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceSegment {
    /// Trace id, shared by every segment of the trace.
    pub trace_id: String,
    /// Id of this segment, unique within the trace.
    pub trace_segment_id: String,
    /// Service that produced the segment.
    pub service: String,
    /// Service instance that produced the segment.
    pub service_instance: String,
    /// Finished spans, in finish order.
    pub spans: Vec<SpanObject>,
}
