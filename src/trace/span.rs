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

//! Span is the unit of work in a trace: one inbound request, one outbound
//! call or one local operation.

use crate::trace::{
    segment::{LogEntry, SpanObject},
    trace_context::{SpanStack, SpanUid},
};
use parking_lot::Mutex;
use std::{
    fmt::Formatter,
    mem::take,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

/// Span represents the trace information of a single operation. An Entry
/// span records an inbound request, an Exit span an outbound call.
///
/// Finishing is expressed as `Drop`: a span finishes exactly once, on every
/// exit path, when its guard variable goes out of scope.
///
/// # Example
///
/// ```
/// use httpspan::trace::tracer::Tracer;
///
/// fn handle_request(tracer: Tracer) {
///     let mut ctx = tracer.create_trace_context();
///
///     {
///         // Entry span for the inbound request. Assign a variable name
///         // to guard the span not to be dropped immediately.
///         let _span = ctx.create_entry_span("GET /ping");
///
///         {
///             // Exit span for an outbound call.
///             let _span2 = ctx.create_exit_span("GET /pong", "upstream:8082");
///
///             // Auto close span2 when dropped.
///         }
///
///         // Auto close span when dropped.
///     }
///
///     // Auto report ctx when dropped.
/// }
/// ```
#[must_use = "assign a variable name to guard the span not be dropped immediately."]
pub struct Span {
    uid: SpanUid,
    obj: Option<SpanObject>,
    shared: SpanHandle,
    stack: Arc<SpanStack>,
}

impl std::fmt::Debug for Span {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Span")
            .field(
                "data",
                match self.obj {
                    Some(ref obj) => obj,
                    None => &"<none>",
                },
            )
            .finish()
    }
}

impl Span {
    pub(crate) fn new(uid: SpanUid, obj: SpanObject, stack: Arc<SpanStack>) -> Self {
        Self {
            uid,
            obj: Some(obj),
            shared: SpanHandle::default(),
            stack,
        }
    }

    /// Get immutable span object reference.
    #[inline]
    pub fn span_object(&self) -> &SpanObject {
        self.obj.as_ref().unwrap()
    }

    /// Mutable with inner span object.
    #[inline]
    pub fn span_object_mut(&mut self) -> &mut SpanObject {
        self.obj.as_mut().unwrap()
    }

    /// Get span id.
    pub fn span_id(&self) -> i32 {
        self.span_object().span_id
    }

    /// Add logs to the span.
    pub fn add_log<K, V, I>(&mut self, message: I)
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.span_object_mut().add_log(message)
    }

    /// Add tag to the span.
    pub fn add_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.span_object_mut().add_tag(key, value)
    }

    /// Handle for appending logs and tags from other execution contexts,
    /// e.g. transport lifecycle callbacks. Entries land on the span when it
    /// finishes; entries appended afterwards are discarded.
    pub fn handle(&self) -> SpanHandle {
        self.shared.clone()
    }
}

impl Drop for Span {
    /// Drain handle entries, stamp the end time, pop from the context
    /// active span stack and archive into the finished spans.
    fn drop(&mut self) {
        let mut obj = take(&mut self.obj).unwrap();
        self.shared.drain_into(&mut obj);
        self.stack.finalize_span(self.uid, obj);
    }
}

/// Cloneable, thread-safe sink for span logs, tags and the error flag.
///
/// Handles are handed to code that runs concurrently with the span owner,
/// such as connection lifecycle callbacks. Updates through a handle never
/// block the span and are folded into the span object when it finishes.
#[derive(Clone, Default)]
pub struct SpanHandle {
    inner: Arc<HandleInner>,
}

#[derive(Default)]
struct HandleInner {
    logs: Mutex<Vec<LogEntry>>,
    tags: Mutex<Vec<(String, String)>>,
    is_error: AtomicBool,
}

impl SpanHandle {
    /// Append one log entry, stamped with the current time.
    pub fn add_log<K, V, I>(&self, message: I)
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.inner.logs.lock().push(LogEntry::now(message));
    }

    /// Append a tag.
    pub fn add_tag(&self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.tags.lock().push((key.into(), value.into()));
    }

    /// Flag the span as failed.
    pub fn set_error(&self) {
        self.inner.is_error.store(true, Ordering::Relaxed);
    }

    fn drain_into(&self, obj: &mut SpanObject) {
        obj.logs.append(&mut self.inner.logs.lock());
        obj.tags.append(&mut self.inner.tags.lock());
        if self.inner.is_error.load(Ordering::Relaxed) {
            obj.is_error = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait AssertSend: Send {}

    impl AssertSend for Span {}

    trait AssertSyncSend: Sync + Send {}

    impl AssertSyncSend for SpanHandle {}
}
