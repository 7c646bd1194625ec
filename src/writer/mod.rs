mod aggregate_writer;
mod sort;
mod top;
mod uniq;

pub use aggregate_writer::AggregateWriter;
pub use sort::SortedWriter;
pub use top::TopWriter;
pub use uniq::{UniqCountWriter, UniqWriter};

use crate::error::Error;
use crate::value::Value;

/// Signal invoked once the whole chain has finished flushing. Carries no
/// row payload — it is the "fully done" continuation supplied by the
/// caller of `finish`, not a per-row callback.
pub type AfterFinish<'a> = dyn FnMut() -> Result<(), Error> + 'a;

/// The capability every pipeline stage implements: accept one record,
/// report whether the downstream is saturated, and cascade a final flush.
/// Chained by owning `Box<dyn RowSink>` links rather than inheritance.
pub trait RowSink {
    /// Returns `false` if downstream is saturated and the pipeline should
    /// stop feeding records.
    fn write(&mut self, record: Vec<Value>) -> Result<bool, Error>;

    /// Variant of `write` carrying an explicit sort key, used only when
    /// `ORDER BY` is active. Every writer except `SortedWriter` has no use
    /// for the key and simply discards it.
    fn write_with_key(&mut self, _sort_key: Vec<Value>, record: Vec<Value>) -> Result<bool, Error> {
        self.write(record)
    }

    /// Flushes this writer's own buffered state into the downstream link
    /// (if any), then invokes upstream `finish` so the cascade reaches the
    /// terminal sink, which finally calls `after_finish`.
    fn finish(&mut self, after_finish: &mut AfterFinish<'_>) -> Result<(), Error>;
}

/// Terminal adapter wrapping the external output sink so the writer chain
/// can treat it uniformly as a `RowSink`.
pub struct SinkWriter<'a> {
    pub write_fn: &'a mut dyn FnMut(Vec<Value>) -> Result<bool, Error>,
    pub finish_fn: &'a mut dyn FnMut(&mut AfterFinish<'_>) -> Result<(), Error>,
}

impl<'a> RowSink for SinkWriter<'a> {
    fn write(&mut self, record: Vec<Value>) -> Result<bool, Error> {
        (self.write_fn)(record)
    }

    fn finish(&mut self, after_finish: &mut AfterFinish<'_>) -> Result<(), Error> {
        (self.finish_fn)(after_finish)
    }
}
