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

//! Propagation decoder.

use crate::{
    Result,
    error::Error,
    trace::propagation::context::PropagationContext,
};
use base64::prelude::*;

/// Decode the context value packed in the
/// [`TRACE_CONTEXT_HEADER_KEY`](super::context::TRACE_CONTEXT_HEADER_KEY)
/// header.
///
/// A missing or malformed header is a normal case for callers: treat the
/// error as "no parent" and start a root span.
pub fn decode_propagation(header_value: &str) -> Result<PropagationContext> {
    let pieces: Vec<&str> = header_value.split('-').collect();

    if pieces.len() != 8 {
        return Err(Error::DecodePropagation("expected 8 `-` separated fields"));
    }

    Ok(PropagationContext {
        do_sample: parse_sample_status(pieces[0])?,
        parent_trace_id: decode_field(pieces[1])?,
        parent_trace_segment_id: decode_field(pieces[2])?,
        parent_span_id: pieces[3]
            .parse()
            .map_err(|_| Error::DecodePropagation("parent span id isn't an integer"))?,
        parent_service: decode_field(pieces[4])?,
        parent_service_instance: decode_field(pieces[5])?,
        destination_endpoint: decode_field(pieces[6])?,
        destination_address: decode_field(pieces[7])?,
    })
}

fn parse_sample_status(status: &str) -> Result<bool> {
    match status {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(Error::DecodePropagation("unknown sample status")),
    }
}

fn decode_field(enc: &str) -> Result<String> {
    let raw = BASE64_STANDARD
        .decode(enc)
        .map_err(|_| Error::DecodePropagation("field isn't valid base64"))?;
    String::from_utf8(raw).map_err(|_| Error::DecodePropagation("field isn't valid utf-8"))
}
