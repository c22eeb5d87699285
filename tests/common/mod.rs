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

use httpspan::reporter::{CollectItem, Report};
use httpspan::trace::segment::TraceSegment;
use std::sync::{Arc, Mutex};

/// Reporter that captures finished segments for assertions.
#[derive(Default, Clone)]
pub struct CaptureReporter {
    segments: Arc<Mutex<Vec<TraceSegment>>>,
}

impl CaptureReporter {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn segments(&self) -> Vec<TraceSegment> {
        self.segments.lock().unwrap().clone()
    }
}

impl Report for CaptureReporter {
    fn report(&self, item: CollectItem) {
        match item {
            CollectItem::Trace(segment) => self.segments.lock().unwrap().push(*segment),
            _ => {}
        }
    }
}
