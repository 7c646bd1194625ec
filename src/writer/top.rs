use super::{AfterFinish, RowSink};
use crate::error::Error;
use crate::value::Value;

/// Enforces `LIMIT`. Always the innermost wrapper of the output sink so
/// that `LIMIT` counts rows actually produced — for aggregate queries,
/// that means post-aggregation rows, since `AggregateWriter` only writes
/// on `finish`.
pub struct TopWriter {
    inner: Box<dyn RowSink>,
    top_count: Option<usize>,
    written: usize,
}

impl TopWriter {
    pub fn new(inner: Box<dyn RowSink>, top_count: Option<usize>) -> Self {
        TopWriter {
            inner,
            top_count,
            written: 0,
        }
    }
}

impl RowSink for TopWriter {
    fn write(&mut self, record: Vec<Value>) -> Result<bool, Error> {
        if let Some(limit) = self.top_count {
            if self.written >= limit {
                return Ok(false);
            }
        }
        let keep_going = self.inner.write(record)?;
        self.written += 1;
        if let Some(limit) = self.top_count {
            if self.written >= limit {
                return Ok(false);
            }
        }
        Ok(keep_going)
    }

    fn finish(&mut self, after_finish: &mut AfterFinish<'_>) -> Result<(), Error> {
        self.inner.finish(after_finish)
    }
}
