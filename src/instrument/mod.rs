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

//! HTTP instrumentation helpers.
//!
//! [`server`] wraps an inbound handler so that every request runs under an
//! entry span continued from the propagated upstream context. [`client`]
//! prepares an outbound request: it opens an exit span, injects the span
//! context into the request headers and attaches connection lifecycle
//! callbacks that log onto the span while the request executes.

pub mod client;
pub mod server;
