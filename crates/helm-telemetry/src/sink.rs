// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Stock [`MetricsSink`] implementations.

use anyhow::{anyhow, Context as _};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use helm_core::{MetricsSink, MetricsSummary};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Forwards summaries to another thread over a bounded channel.
///
/// Delivery never blocks the loop thread: a full channel rejects the summary.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<MetricsSummary>,
}

impl ChannelSink {
    /// Creates a sink and the receiving end of its channel.
    pub fn new(capacity: usize) -> (Self, Receiver<MetricsSummary>) {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        (Self { tx }, rx)
    }
}

impl MetricsSink for ChannelSink {
    fn on_segment_metrics(&self, summary: &MetricsSummary) -> anyhow::Result<()> {
        match self.tx.try_send(summary.clone()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(anyhow!("metrics channel is full")),
            Err(TrySendError::Disconnected(_)) => Err(anyhow!("metrics receiver disconnected")),
        }
    }
}

#[derive(Serialize)]
struct MetricsDocument<'a> {
    metadata: &'a serde_json::Value,
    metrics: &'a MetricsSummary,
}

/// Writes each summary, with the experiment metadata, as a JSON document.
///
/// Files are named `<YYYYmmdd-HHMMSS>-segment-<n>.json` inside the target
/// directory, which is created on first use.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    dir: PathBuf,
    metadata: serde_json::Value,
}

impl JsonFileSink {
    /// Creates a sink writing into `dir`.
    pub fn new(dir: impl Into<PathBuf>, metadata: serde_json::Value) -> Self {
        Self {
            dir: dir.into(),
            metadata,
        }
    }

    /// The output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, summary: &MetricsSummary) -> PathBuf {
        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        self.dir
            .join(format!("{stamp}-segment-{}.json", summary.segment))
    }
}

impl MetricsSink for JsonFileSink {
    fn on_segment_metrics(&self, summary: &MetricsSummary) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating {}", self.dir.display()))?;
        let path = self.path_for(summary);
        let document = MetricsDocument {
            metadata: &self.metadata,
            metrics: summary,
        };
        let json = serde_json::to_string_pretty(&document)?;
        fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
        log::info!("JsonFileSink: metrics stored in {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(segment: u64) -> MetricsSummary {
        MetricsSummary {
            segment,
            iterations: 12,
            mean_iteration_time: 0.05,
            ..Default::default()
        }
    }

    #[test]
    fn test_channel_sink_delivers() {
        let (sink, rx) = ChannelSink::new(4);
        sink.on_segment_metrics(&summary(1)).unwrap();
        let received = rx.try_recv().unwrap();
        assert_eq!(received.segment, 1);
        assert_eq!(received.iterations, 12);
    }

    #[test]
    fn test_channel_sink_rejects_when_full_or_closed() {
        let (sink, rx) = ChannelSink::new(1);
        sink.on_segment_metrics(&summary(1)).unwrap();
        assert!(sink.on_segment_metrics(&summary(2)).is_err());
        drop(rx);
        assert!(sink.on_segment_metrics(&summary(3)).is_err());
    }

    #[test]
    fn test_json_sink_writes_document() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("metrics");
        let sink = JsonFileSink::new(&out, serde_json::json!({ "world": "circuit.world" }));

        sink.on_segment_metrics(&summary(2)).unwrap();

        let entries: Vec<_> = fs::read_dir(&out).unwrap().collect();
        assert_eq!(entries.len(), 1);
        let path = entries[0].as_ref().unwrap().path();
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .ends_with("-segment-2.json"));

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["metadata"]["world"], "circuit.world");
        assert_eq!(value["metrics"]["iterations"], 12);
        assert_eq!(value["metrics"]["has_first_output"], false);
    }
}
