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

use thiserror::Error;

/// The span stack locks are only held for the duration of a push or pop.
pub(crate) const LOCK_MSG: &str = "span stack lock should not be contended";

/// Crate-level error type.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The propagation header value failed to decode.
    #[error("failed to decode propagation context: {0}")]
    DecodePropagation(&'static str),
}

/// Crate-level result type.
pub type Result<T, E = Error> = std::result::Result<T, E>;
