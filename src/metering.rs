// (C) Copyright IBM Corp. 2025.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Recording of evaluation events.
//!
//! Every feature/property evaluation is recorded as an event and handed to
//! a background batcher over a channel, so evaluation never blocks on
//! metering. The batcher aggregates per (subject, entity, segment) and
//! periodically hands the collected usages to a [`MeteringClient`], the
//! collaborator that owns the actual transmission.

use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::utils::ThreadHandle;

/// Segment id recorded when an evaluation did not match any segment.
pub const DEFAULT_SEGMENT_ID: &str = "$$null$$";

pub(crate) const DEFAULT_TRANSMIT_INTERVAL: Duration = Duration::from_secs(600);

/// Aggregated evaluations of one feature or property for one entity and
/// matched segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationUsage {
    pub feature_id: Option<String>,
    pub property_id: Option<String>,
    pub entity_id: String,
    /// The matched segment id, or [`DEFAULT_SEGMENT_ID`].
    pub segment_id: String,
    /// Time of the most recent evaluation in this batch.
    pub evaluation_time: DateTime<Utc>,
    pub count: u64,
}

/// Collaborator receiving batched evaluation usages, e.g. for transmission
/// to a metering service.
pub trait MeteringClient: Send + Sync {
    fn push_usages(&self, collection_id: &str, environment_id: &str, usages: Vec<EvaluationUsage>);
}

#[derive(Debug, Clone)]
pub(crate) enum SubjectId {
    Feature(String),
    Property(String),
}

#[derive(Debug)]
struct EvaluationEvent {
    subject_id: SubjectId,
    entity_id: String,
    segment_id: Option<String>,
    evaluation_time: DateTime<Utc>,
}

/// Records evaluation events for eventual transmission. Cheap to clone;
/// all clones feed the same batcher thread.
#[derive(Debug, Clone)]
pub(crate) struct MeteringRecorder {
    evaluation_event_sender: mpsc::Sender<EvaluationEvent>,
}

impl MeteringRecorder {
    /// Records the evaluation of a feature or property. Never blocks; if
    /// the batcher is gone the event is dropped.
    pub(crate) fn record_evaluation(
        &self,
        subject_id: SubjectId,
        entity_id: &str,
        segment_id: Option<&str>,
    ) {
        let event = EvaluationEvent {
            subject_id,
            entity_id: entity_id.to_string(),
            segment_id: segment_id.map(|s| s.to_string()),
            evaluation_time: Utc::now(),
        };
        if self.evaluation_event_sender.send(event).is_err() {
            log::debug!("Metering batcher is gone, dropping evaluation event");
        }
    }
}

/// Keeps the batcher thread alive; metering stops when this is dropped and
/// all recorder clones are gone.
#[derive(Debug)]
pub(crate) struct MeteringThreadHandle {
    _thread_handle: ThreadHandle<()>,
}

/// Starts the metering batcher thread.
pub(crate) fn start_metering(
    collection_id: String,
    environment_id: String,
    transmit_interval: Duration,
    client: Arc<dyn MeteringClient>,
) -> (MeteringThreadHandle, MeteringRecorder) {
    let (sender, receiver) = mpsc::channel();

    let thread = ThreadHandle::new(move |_terminator: mpsc::Receiver<()>| {
        let mut batcher = MeteringBatcher::new(collection_id, environment_id, transmit_interval, client);
        loop {
            match receiver.recv_timeout(Duration::from_millis(100)) {
                Ok(event) => batcher.handle_event(event),
                // Hit the timeout, give the batcher a chance to flush:
                Err(mpsc::RecvTimeoutError::Timeout) => {}
                // All senders have been dropped, exit the thread:
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    batcher.flush();
                    break;
                }
            }
            batcher.maybe_flush();
        }
    });

    (
        MeteringThreadHandle {
            _thread_handle: thread,
        },
        MeteringRecorder {
            evaluation_event_sender: sender,
        },
    )
}

#[derive(Hash, Eq, PartialEq, Clone, Debug)]
struct MeteringKey {
    feature_id: Option<String>,
    property_id: Option<String>,
    entity_id: String,
    segment_id: String,
}

struct MeteringBatcher {
    collection_id: String,
    environment_id: String,
    transmit_interval: Duration,
    client: Arc<dyn MeteringClient>,
    usages: HashMap<MeteringKey, (u64, DateTime<Utc>)>,
    last_flush: Instant,
}

impl MeteringBatcher {
    fn new(
        collection_id: String,
        environment_id: String,
        transmit_interval: Duration,
        client: Arc<dyn MeteringClient>,
    ) -> Self {
        Self {
            collection_id,
            environment_id,
            transmit_interval,
            client,
            usages: HashMap::new(),
            last_flush: Instant::now(),
        }
    }

    fn handle_event(&mut self, event: EvaluationEvent) {
        let (feature_id, property_id) = match event.subject_id {
            SubjectId::Feature(id) => (Some(id), None),
            SubjectId::Property(id) => (None, Some(id)),
        };
        let key = MeteringKey {
            feature_id,
            property_id,
            entity_id: event.entity_id,
            segment_id: event
                .segment_id
                .unwrap_or_else(|| DEFAULT_SEGMENT_ID.to_string()),
        };
        let entry = self.usages.entry(key).or_insert((0, event.evaluation_time));
        entry.0 += 1;
        entry.1 = event.evaluation_time;
    }

    fn maybe_flush(&mut self) {
        if self.last_flush.elapsed() >= self.transmit_interval {
            self.flush();
        }
    }

    fn flush(&mut self) {
        self.last_flush = Instant::now();
        if self.usages.is_empty() {
            return;
        }
        let usages = self
            .usages
            .drain()
            .map(|(key, (count, evaluation_time))| EvaluationUsage {
                feature_id: key.feature_id,
                property_id: key.property_id,
                entity_id: key.entity_id,
                segment_id: key.segment_id,
                evaluation_time,
                count,
            })
            .collect();
        self.client
            .push_usages(&self.collection_id, &self.environment_id, usages);
    }
}
