use super::{AfterFinish, RowSink};
use crate::aggregate::GroupRegistry;
use crate::error::Error;
use crate::value::Value;

/// Wraps the writer that was active before the first aggregated row was
/// seen (per the two-phase aggregation state machine). Buffers per-group
/// aggregator state and, on `finish`, emits one row per group in
/// ascending canonical-key order.
pub struct AggregateWriter {
    inner: Box<dyn RowSink>,
    registry: GroupRegistry,
}

impl AggregateWriter {
    pub fn new(inner: Box<dyn RowSink>, registry: GroupRegistry) -> Self {
        AggregateWriter { inner, registry }
    }

    pub fn increment(&mut self, group_key: &str, values: Vec<Value>) -> Result<(), Error> {
        self.registry.increment(group_key, values)
    }
}

impl RowSink for AggregateWriter {
    /// Aggregation never receives rows through plain `write` — callers
    /// drive it through `increment`. A bare `write` is only reachable if
    /// the pipeline is misused, so it is forwarded as a single-group
    /// passthrough rather than silently dropped.
    fn write(&mut self, record: Vec<Value>) -> Result<bool, Error> {
        self.inner.write(record)
    }

    fn finish(&mut self, after_finish: &mut AfterFinish<'_>) -> Result<(), Error> {
        let registry = std::mem::take(&mut self.registry);
        for row in registry.finalize() {
            if !self.inner.write(row)? {
                break;
            }
        }
        self.inner.finish(after_finish)
    }
}
