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

//! Inbound request instrumentation.
//!
//! [`TraceLayer`] wraps the service registered for one route pattern. For
//! every request it looks for a propagated context in the request headers,
//! starts an entry span named `"{METHOD} {pattern}"` (a child of the
//! upstream span when the header decodes, a root span otherwise), stores a
//! [`RequestContext`] in the request extensions for downstream use, and
//! finishes the span when the wrapped service's future completes, errors or
//! is dropped.

use crate::{
    instrument::client::trace_request,
    trace::{
        propagation::{context::TRACE_CONTEXT_HEADER_KEY, decoder::decode_propagation},
        span::{Span, SpanHandle},
        trace_context::TracingContext,
        tracer::Tracer,
    },
};
use futures_core::future::BoxFuture;
use http::Request;
use parking_lot::Mutex;
use std::{
    sync::Arc,
    task::{Context, Poll},
};
use tower_layer::Layer;
use tower_service::Service;

/// Layer that instruments the handler registered for one route pattern.
#[derive(Clone)]
pub struct TraceLayer {
    tracer: Tracer,
    pattern: String,
}

impl TraceLayer {
    /// New layer for the handler registered for `pattern`.
    pub fn new(tracer: Tracer, pattern: impl Into<String>) -> Self {
        Self {
            tracer,
            pattern: pattern.into(),
        }
    }
}

impl<S> Layer<S> for TraceLayer {
    type Service = TraceService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TraceService {
            inner,
            tracer: self.tracer.clone(),
            pattern: self.pattern.clone(),
        }
    }
}

/// Service produced by [`TraceLayer`].
#[derive(Clone)]
pub struct TraceService<S> {
    inner: S,
    tracer: Tracer,
    pattern: String,
}

impl<S, B> Service<Request<B>> for TraceService<S>
where
    S: Service<Request<B>>,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<S::Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        // Absence of a parent context is the normal case, so extraction
        // failures silently fall back to a root span.
        let propagation = req
            .headers()
            .get(TRACE_CONTEXT_HEADER_KEY)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| decode_propagation(value).ok());

        let mut context = self.tracer.create_trace_context();
        let operation_name = format!("{} {}", req.method(), self.pattern);
        let span = match propagation {
            Some(propagation) => {
                context.create_entry_span_with_propagation(&operation_name, &propagation)
            }
            None => context.create_entry_span(&operation_name),
        };

        let request_context = RequestContext {
            span: span.handle(),
            context: Arc::new(Mutex::new(context)),
        };
        req.extensions_mut().insert(request_context.clone());

        let guard = SpanGuard {
            span: Some(span),
            context: Some(request_context),
        };
        let fut = self.inner.call(req);
        Box::pin(async move {
            let result = fut.await;
            drop(guard);
            result
        })
    }
}

/// Handle stored in the request extensions by [`TraceService`].
///
/// Downstream code uses it to tag and log on the entry span and to derive
/// child spans for outbound requests. The trace segment is reported when
/// the last clone drops.
#[derive(Clone)]
pub struct RequestContext {
    span: SpanHandle,
    context: Arc<Mutex<TracingContext>>,
}

impl RequestContext {
    /// Handle to the entry span of this request.
    pub fn span(&self) -> &SpanHandle {
        &self.span
    }

    /// Run `f` with the underlying tracing context, e.g. to create a local
    /// child span. The lock is held for the duration of the closure; don't
    /// hold it across awaits.
    pub fn with_context<T>(&self, f: impl FnOnce(&mut TracingContext) -> T) -> T {
        let mut context = self.context.lock();
        f(&mut context)
    }

    /// Outbound counterpart of this request, see
    /// [`trace_request`](crate::instrument::client::trace_request).
    pub fn trace_request<B>(
        &self,
        operation_name: &str,
        request: Request<B>,
    ) -> (Request<B>, Span) {
        self.with_context(|context| trace_request(operation_name, context, request))
    }
}

/// Owns the entry span for the duration of the wrapped call.
struct SpanGuard {
    span: Option<Span>,
    context: Option<RequestContext>,
}

impl Drop for SpanGuard {
    /// The entry span must finalize into the context before the context
    /// reference is released and the segment reported.
    fn drop(&mut self) {
        drop(self.span.take());
        drop(self.context.take());
    }
}
