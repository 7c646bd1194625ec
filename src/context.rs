use crate::aggregate::{Aggregator, GroupRegistry};
use crate::error::Error;
use crate::value::Value;
use crate::writer::{AfterFinish, AggregateWriter, RowSink};

/// Which of the two output paths the active writer chain is on. The
/// transition `Direct -> Aggregating` happens at most once per query, on
/// the first row that evaluates to at least one `AggregationToken`
/// (Stage 0 -> Stage 1 of the aggregation state machine).
enum WriterSlot {
    Direct(Box<dyn RowSink>),
    Aggregating(AggregateWriter),
    /// Placeholder used only during the brief window of `activate_aggregation`
    /// while the direct writer is being re-wrapped.
    Empty,
}

/// The single owned value replacing the source's process-wide mutable
/// state for the lifetime of one query: record/update counters, the
/// aggregation stage, the writer chain, and the one-shot latches.
pub struct ExecutionContext {
    nr: u64,
    nu: u64,
    writer: WriterSlot,
    used: bool,
    finished_with_error: bool,
}

impl ExecutionContext {
    pub fn new(writer: Box<dyn RowSink>) -> Self {
        ExecutionContext {
            nr: 0,
            nu: 0,
            writer: WriterSlot::Direct(writer),
            used: false,
            finished_with_error: false,
        }
    }

    /// Must be called once before the first record; a second call on a
    /// context that already ran fails with the module-reuse guard.
    pub fn begin(&mut self) -> Result<(), Error> {
        if self.used {
            return Err(Error::unexpected("Module can only be used once"));
        }
        self.used = true;
        Ok(())
    }

    pub fn nr(&self) -> u64 {
        self.nr
    }

    pub fn nu(&self) -> u64 {
        self.nu
    }

    pub fn next_record(&mut self) -> u64 {
        self.nr += 1;
        self.nr
    }

    pub fn record_update(&mut self) {
        self.nu += 1;
    }

    pub fn is_finished_with_error(&self) -> bool {
        self.finished_with_error
    }

    pub fn mark_finished_with_error(&mut self) {
        self.finished_with_error = true;
    }

    pub fn is_aggregating(&self) -> bool {
        matches!(self.writer, WriterSlot::Aggregating(_))
    }

    /// Transitions from Stage 0/directly-writing to Stage 1: wraps the
    /// current writer in an `AggregateWriter` owning fresh per-column
    /// aggregator templates. Columns without an `AggregationToken` get a
    /// `ConstGroupVerifier`.
    pub fn activate_aggregation(&mut self, templates: Vec<Aggregator>) {
        let direct = match std::mem::replace(&mut self.writer, WriterSlot::Empty) {
            WriterSlot::Direct(inner) => inner,
            other => {
                // Already aggregating or mid-transition: nothing to wrap.
                self.writer = other;
                return;
            }
        };
        self.writer = WriterSlot::Aggregating(AggregateWriter::new(direct, GroupRegistry::new(templates)));
    }

    /// Stage 2: folds one aggregated row's per-column values into its
    /// group. Only valid once aggregation has been activated.
    pub fn aggregate_increment(&mut self, group_key: &str, values: Vec<Value>) -> Result<(), Error> {
        match &mut self.writer {
            WriterSlot::Aggregating(writer) => writer.increment(group_key, values),
            _ => Err(Error::unexpected("aggregate_increment called before aggregation was activated")),
        }
    }

    /// Non-aggregated row emission. Only valid while still on the direct
    /// writer path. `sort_key` is forwarded only when `ORDER BY` built the
    /// active chain around a `SortedWriter`; every other writer ignores it.
    pub fn write_row(&mut self, sort_key: Option<Vec<Value>>, record: Vec<Value>) -> Result<bool, Error> {
        match &mut self.writer {
            WriterSlot::Direct(writer) => match sort_key {
                Some(key) => writer.write_with_key(key, record),
                None => writer.write(record),
            },
            WriterSlot::Aggregating(_) => {
                Err(Error::unexpected("write_row called after aggregation was activated"))
            }
            WriterSlot::Empty => Err(Error::unexpected("writer chain is mid-transition")),
        }
    }

    pub fn finish(&mut self, after_finish: &mut AfterFinish<'_>) -> Result<(), Error> {
        match &mut self.writer {
            WriterSlot::Direct(writer) => writer.finish(after_finish),
            WriterSlot::Aggregating(writer) => writer.finish(after_finish),
            WriterSlot::Empty => Err(Error::unexpected("writer chain is mid-transition")),
        }
    }
}
