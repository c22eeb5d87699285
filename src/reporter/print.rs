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

//! Print reporter.

use super::{CollectItem, Report};

/// Reporter that prints finished segments to stdout or stderr, for
/// debugging.
#[derive(Default, Clone)]
pub struct PrintReporter {
    use_stderr: bool,
}

impl PrintReporter {
    /// New stdout print reporter.
    #[inline]
    pub fn new() -> Self {
        Default::default()
    }

    /// Print to stderr instead of stdout.
    pub fn use_stderr(mut self, use_stderr: bool) -> Self {
        self.use_stderr = use_stderr;
        self
    }
}

impl Report for PrintReporter {
    #[allow(clippy::print_stdout)]
    fn report(&self, item: CollectItem) {
        match item {
            CollectItem::Trace(segment) => {
                if self.use_stderr {
                    eprintln!("trace segment={:?}", segment);
                } else {
                    println!("trace segment={:?}", segment);
                }
            }
        }
    }
}
