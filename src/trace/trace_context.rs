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

//! TracingContext is the context of the tracing process. Span should only be
//! created through context, and be archived into the context after the span
//! finished.

use crate::{
    common::{TimePeriod, fetch_time, random_id},
    error::LOCK_MSG,
    trace::{
        propagation::context::PropagationContext,
        segment::{RefType, SpanObject, SpanReference, SpanType, TraceSegment},
        span::Span,
        tracer::{Tracer, WeakTracer},
    },
};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::{
    fmt::Formatter,
    mem::take,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

/// The span uid identifies a [`Span`] within its context for the crate.
pub(crate) type SpanUid = usize;

pub(crate) struct ActiveSpan {
    uid: SpanUid,
    span_id: i32,
    /// Filled by [`TracingContext::continued`].
    r#ref: Option<SpanReference>,
}

impl ActiveSpan {
    fn new(uid: SpanUid, span_id: i32) -> Self {
        Self {
            uid,
            span_id,
            r#ref: None,
        }
    }
}

#[derive(Default)]
pub(crate) struct SpanStack {
    finalized: RwLock<Vec<SpanObject>>,
    active: RwLock<Vec<ActiveSpan>>,
}

impl SpanStack {
    fn active(&self) -> RwLockReadGuard<'_, Vec<ActiveSpan>> {
        self.active.try_read().expect(LOCK_MSG)
    }

    fn active_mut(&self) -> RwLockWriteGuard<'_, Vec<ActiveSpan>> {
        self.active.try_write().expect(LOCK_MSG)
    }

    fn pop_active(&self, uid: SpanUid) -> Option<ActiveSpan> {
        let mut stack = self.active_mut();
        if stack
            .last()
            .map(|span| span.uid == uid)
            .unwrap_or_default()
        {
            stack.pop()
        } else {
            None
        }
    }

    /// Close the span. Spans close in LIFO order.
    pub(crate) fn finalize_span(&self, uid: SpanUid, mut obj: SpanObject) {
        let Some(active_span) = self.pop_active(uid) else {
            panic!("finalized span isn't the active span");
        };

        obj.end_time = fetch_time(TimePeriod::End);
        if let Some(r#ref) = active_span.r#ref {
            obj.refs.push(r#ref);
        }
        self.finalized.try_write().expect(LOCK_MSG).push(obj);
    }
}

/// TracingContext is the context of the tracing process. Span should only be
/// created through context, and be archived into the context after the span
/// finished. When the context drops, the finished spans are converted into a
/// [`TraceSegment`] and handed to the tracer's reporter.
#[must_use = "call `create_entry_span` after `TracingContext` created."]
pub struct TracingContext {
    trace_id: String,
    trace_segment_id: String,
    service: String,
    service_instance: String,
    next_span_id: i32,
    span_stack: Arc<SpanStack>,
    primary_endpoint_name: String,
    span_uid_generator: AtomicUsize,
    tracer: WeakTracer,
}

impl std::fmt::Debug for TracingContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TracingContext")
            .field("trace_id", &self.trace_id)
            .field("trace_segment_id", &self.trace_segment_id)
            .field("service", &self.service)
            .field("service_instance", &self.service_instance)
            .field("next_span_id", &self.next_span_id)
            .finish()
    }
}

impl TracingContext {
    /// Generate a new trace context.
    pub(crate) fn new(
        service_name: impl Into<String>,
        instance_name: impl Into<String>,
        tracer: WeakTracer,
    ) -> Self {
        TracingContext {
            trace_id: random_id(),
            trace_segment_id: random_id(),
            service: service_name.into(),
            service_instance: instance_name.into(),
            next_span_id: Default::default(),
            span_stack: Default::default(),
            primary_endpoint_name: Default::default(),
            span_uid_generator: AtomicUsize::new(0),
            tracer,
        }
    }

    /// Get trace id.
    #[inline]
    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// Get trace segment id.
    #[inline]
    pub fn trace_segment_id(&self) -> &str {
        &self.trace_segment_id
    }

    /// Get service name.
    #[inline]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Get service instance.
    #[inline]
    pub fn service_instance(&self) -> &str {
        &self.service_instance
    }

    #[inline]
    fn inc_next_span_id(&mut self) -> i32 {
        let span_id = self.next_span_id;
        self.next_span_id += 1;
        span_id
    }

    fn generate_span_uid(&self) -> SpanUid {
        self.span_uid_generator.fetch_add(1, Ordering::SeqCst)
    }

    /// Create a new entry span, which records an operation triggered by an
    /// external service. The span is a child of the currently active span,
    /// or the root of a fresh trace when the context has none.
    pub fn create_entry_span(&mut self, operation_name: &str) -> Span {
        let obj = SpanObject::new(
            self.inc_next_span_id(),
            self.peek_active_span_id().unwrap_or(-1),
            operation_name.to_string(),
            String::default(),
            SpanType::Entry,
        );
        self.start_span(obj)
    }

    /// Create a new entry span continued from a propagated upstream context,
    /// decoded from the carrier header with
    /// [`decode_propagation`](crate::trace::propagation::decoder::decode_propagation).
    ///
    /// The context adopts the upstream trace id and the span records a
    /// [`RefType::CrossProcess`] reference to the upstream span.
    pub fn create_entry_span_with_propagation(
        &mut self,
        operation_name: &str,
        propagation: &PropagationContext,
    ) -> Span {
        let mut span = self.create_entry_span(operation_name);
        self.trace_id = propagation.parent_trace_id.clone();
        span.span_object_mut().refs.push(SpanReference {
            ref_type: RefType::CrossProcess,
            trace_id: self.trace_id.clone(),
            parent_trace_segment_id: propagation.parent_trace_segment_id.clone(),
            parent_span_id: propagation.parent_span_id,
            parent_service: propagation.parent_service.clone(),
            parent_service_instance: propagation.parent_service_instance.clone(),
            parent_endpoint: propagation.destination_endpoint.clone(),
            network_address_used_at_peer: propagation.destination_address.clone(),
        });
        span
    }

    /// Create a new exit span, which records an outbound call to
    /// `remote_peer`. The span is a child of the currently active span; a
    /// context without spans yields a root exit span (pure client usage).
    pub fn create_exit_span(&mut self, operation_name: &str, remote_peer: &str) -> Span {
        let obj = SpanObject::new(
            self.inc_next_span_id(),
            self.peek_active_span_id().unwrap_or(-1),
            operation_name.to_string(),
            remote_peer.to_string(),
            SpanType::Exit,
        );
        self.start_span(obj)
    }

    /// Create a new local span for an operation internal to the service.
    pub fn create_local_span(&mut self, operation_name: &str) -> Span {
        let obj = SpanObject::new(
            self.inc_next_span_id(),
            self.peek_active_span_id().unwrap_or(-1),
            operation_name.to_string(),
            String::default(),
            SpanType::Local,
        );
        self.start_span(obj)
    }

    fn start_span(&mut self, obj: SpanObject) -> Span {
        let uid = self.push_active_span(&obj);
        Span::new(uid, obj, self.span_stack.clone())
    }

    /// Capture a snapshot for cross-thread propagation.
    pub fn capture(&self) -> ContextSnapshot {
        ContextSnapshot {
            trace_id: self.trace_id.clone(),
            trace_segment_id: self.trace_segment_id.clone(),
            span_id: self.peek_active_span_id().unwrap_or(-1),
            parent_endpoint: self.primary_endpoint_name.clone(),
        }
    }

    /// Build the reference between this segment and a cross-thread segment.
    ///
    /// # Panics
    ///
    /// Panic if the tracer is dropped.
    pub fn continued(&mut self, snapshot: ContextSnapshot) {
        if snapshot.is_valid() {
            self.trace_id = snapshot.trace_id.clone();

            let tracer = self.upgrade_tracer();

            let segment_ref = SpanReference {
                ref_type: RefType::CrossThread,
                trace_id: snapshot.trace_id,
                parent_trace_segment_id: snapshot.trace_segment_id,
                parent_span_id: snapshot.span_id,
                parent_service: tracer.service_name().to_owned(),
                parent_service_instance: tracer.instance_name().to_owned(),
                parent_endpoint: snapshot.parent_endpoint,
                network_address_used_at_peer: Default::default(),
            };

            if let Some(active) = self.span_stack.active_mut().last_mut() {
                active.r#ref = Some(segment_ref);
            }
        }
    }

    /// It converts the tracing context into a trace segment. The finished
    /// spans are taken, so this method shouldn't be called twice.
    pub(crate) fn convert_to_segment(&mut self) -> TraceSegment {
        TraceSegment {
            trace_id: self.trace_id.clone(),
            trace_segment_id: self.trace_segment_id.clone(),
            service: self.service.clone(),
            service_instance: self.service_instance.clone(),
            spans: take(&mut *self.span_stack.finalized.try_write().expect(LOCK_MSG)),
        }
    }

    pub(crate) fn peek_active_span_id(&self) -> Option<i32> {
        self.span_stack.active().last().map(|span| span.span_id)
    }

    fn push_active_span(&mut self, obj: &SpanObject) -> SpanUid {
        let uid = self.generate_span_uid();

        self.primary_endpoint_name = obj.operation_name.clone();
        self.span_stack
            .active_mut()
            .push(ActiveSpan::new(uid, obj.span_id));

        uid
    }

    fn upgrade_tracer(&self) -> Tracer {
        self.tracer.upgrade().expect("tracer has dropped")
    }
}

impl Drop for TracingContext {
    /// Convert to a trace segment, and hand to the tracer for reporting. A
    /// context that outlives its tracer discards the segment.
    fn drop(&mut self) {
        match self.tracer.upgrade() {
            Some(tracer) => tracer.finalize_context(self),
            None => tracing::warn!(
                trace_id = %self.trace_id,
                "tracer dropped before context finalized, trace segment discarded"
            ),
        }
    }
}

/// Cross threads context snapshot.
#[derive(Debug)]
pub struct ContextSnapshot {
    trace_id: String,
    trace_segment_id: String,
    span_id: i32,
    parent_endpoint: String,
}

impl ContextSnapshot {
    /// Check if the snapshot is created from current context.
    pub fn is_from_current(&self, context: &TracingContext) -> bool {
        !self.trace_segment_id.is_empty() && self.trace_segment_id == context.trace_segment_id()
    }

    /// Check if the snapshot is valid.
    pub fn is_valid(&self) -> bool {
        !self.trace_segment_id.is_empty() && self.span_id > -1 && !self.trace_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait AssertSend: Send {}

    impl AssertSend for TracingContext {}
}
