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

//! Propagation context.

/// Name of the HTTP header that carries the encoded propagation context.
pub static TRACE_CONTEXT_HEADER_KEY: &str = "x-trace-context";

/// PropagationContext carries the trace info decoded from an upstream
/// request. In general, this context is used to continue the trace in a new
/// [`TracingContext`](crate::trace::trace_context::TracingContext) after the
/// carrier header has been decoded.
#[derive(Debug)]
pub struct PropagationContext {
    /// It defines whether next span should be traced or not.
    pub do_sample: bool,

    /// It defines the trace ID that the previous span has. It expresses the
    /// unique value of the entire trace.
    pub parent_trace_id: String,

    /// It defines the segment ID that the previous span has.
    pub parent_trace_segment_id: String,

    /// It defines the parent span's span ID.
    pub parent_span_id: i32,

    /// Service name of the service the parent belongs to.
    pub parent_service: String,

    /// Instance name of the service the parent belongs to.
    pub parent_service_instance: String,

    /// An endpoint name that the parent requested to.
    pub destination_endpoint: String,

    /// An address that the parent requested to. It can be authority or
    /// network address.
    pub destination_address: String,
}
