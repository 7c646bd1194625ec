use tracing::{info_span, trace};

use crate::driver::{InputIterator, OutputWriter, RecordDriver};
use crate::error::Error;
use crate::joiner::{JoinMap, Joiner};
use crate::options::ExecutionOptions;
use crate::query::{JoinOperation, QueryPlan, WriterType};
use crate::value::Value;
use crate::writer::{AfterFinish, RowSink, SortedWriter, TopWriter, UniqCountWriter, UniqWriter};

/// Adapts the external `OutputWriter` contract to the internal `RowSink`
/// chain so it can sit at the bottom of the writer stack uniformly with
/// every other writer.
struct OutputWriterSink<'a> {
    inner: &'a mut dyn OutputWriter,
}

impl<'a> RowSink for OutputWriterSink<'a> {
    fn write(&mut self, record: Vec<Value>) -> Result<bool, Error> {
        self.inner.write(record)
    }

    fn finish(&mut self, after_finish: &mut AfterFinish<'_>) -> Result<(), Error> {
        self.inner.finish(after_finish)
    }
}

fn build_joiner<'a>(
    join_operation: JoinOperation,
    join_map: Option<&'a dyn JoinMap>,
) -> Result<Joiner<'a>, Error> {
    match join_operation {
        JoinOperation::Void => Ok(Joiner::Void),
        JoinOperation::Join | JoinOperation::Inner => {
            let map = join_map.ok_or_else(|| {
                Error::unexpected("join operation requires a join map but none was provided")
            })?;
            Ok(Joiner::Inner { map })
        }
        JoinOperation::Left => {
            let map = join_map.ok_or_else(|| {
                Error::unexpected("join operation requires a join map but none was provided")
            })?;
            Ok(Joiner::Left { map })
        }
        JoinOperation::StrictLeft => {
            let map = join_map.ok_or_else(|| {
                Error::unexpected("join operation requires a join map but none was provided")
            })?;
            Ok(Joiner::StrictLeft { map })
        }
    }
}

/// Builds the writer chain, innermost (`base`, wrapping the external
/// sink) outward. `TopWriter` always sits directly around `base` so
/// `LIMIT` counts rows actually produced; at most one of `Uniq` /
/// `UniqCount` / `Sort` wraps that, chosen by the compiled flags.
/// `Aggregate` is not built here — it is spliced in lazily by
/// `ExecutionContext::activate_aggregation` on the first aggregated row.
fn build_writer_chain(plan: &QueryPlan<'_>, base: Box<dyn RowSink>) -> Box<dyn RowSink> {
    let top = Box::new(TopWriter::new(base, plan.top_count));
    if plan.sort_flag {
        Box::new(SortedWriter::new(top, plan.reverse_flag))
    } else {
        match plan.writer_type {
            WriterType::Simple => top,
            WriterType::Uniq => Box::new(UniqWriter::new(top)),
            WriterType::UniqCount => Box::new(UniqCountWriter::new(top)),
        }
    }
}

/// Runs one compiled query to completion. Drives `input_iterator`, joins
/// through `join_map` (when the plan calls for one), and writes through
/// `output_writer`. Exactly one of `success_cb`/`error_cb` fires, exactly
/// once: `success_cb(warnings)` on a clean finish, `error_cb(kind,
/// message)` the first time anything in the pipeline fails.
pub fn run(
    input_iterator: &mut dyn InputIterator,
    join_map: Option<&dyn JoinMap>,
    output_writer: &mut dyn OutputWriter,
    plan: QueryPlan<'_>,
    options: ExecutionOptions,
    mut success_cb: impl FnMut(Vec<String>),
    mut error_cb: impl FnMut(&str, &str),
) {
    let span = info_span!("rbql_run", debug = options.debug());
    let _enter = span.enter();

    if let Some(map) = join_map {
        if let Err(err) = map.build() {
            let (kind, message) = err.as_external();
            error_cb(kind, message);
            return;
        }
    }

    let joiner = match build_joiner(plan.join_operation, join_map) {
        Ok(joiner) => joiner,
        Err(err) => {
            let (kind, message) = err.as_external();
            error_cb(kind, message);
            return;
        }
    };

    let sink = OutputWriterSink {
        inner: output_writer,
    };
    let writer = build_writer_chain(&plan, Box::new(sink));
    let ctx = crate::context::ExecutionContext::new(writer);

    let mut driver = match RecordDriver::new(ctx, joiner, plan, options.debug()) {
        Ok(driver) => driver,
        Err(err) => {
            let (kind, message) = err.as_external();
            error_cb(kind, message);
            return;
        }
    };

    let mut record_callback = |record: crate::record::Record| driver.process_record(record);
    let start_result = input_iterator.start(&mut record_callback);
    drop(record_callback);

    match start_result {
        Ok(()) => {
            let mut after_finish = || -> Result<(), Error> { Ok(()) };
            let finish_result = driver.finish(&mut after_finish);
            // Release the driver's borrow of `output_writer` before reading
            // its warnings below.
            drop(driver);
            match finish_result {
                Ok(()) => {
                    // §4.1/§5: the driver finishes the input iterator itself
                    // once the pipeline has drained, rather than leaving
                    // that to each `InputIterator` implementation.
                    if let Err(err) = input_iterator.finish() {
                        let (kind, message) = err.as_external();
                        error_cb(kind, message);
                        return;
                    }
                    trace!("pipeline finished successfully");
                    let mut warnings = input_iterator.get_warnings();
                    warnings.extend(output_writer.get_warnings());
                    if let Some(map) = join_map {
                        warnings.extend(map.get_warnings());
                    }
                    success_cb(warnings);
                }
                Err(err) => {
                    // Writer-signaled stop or a mid-pipeline error: drain
                    // the iterator before reporting, per §5 Cancellation.
                    // The original error wins regardless of how `finish`
                    // behaves.
                    let _ = input_iterator.finish();
                    let (kind, message) = err.as_external();
                    error_cb(kind, message);
                }
            }
        }
        Err(err) => {
            drop(driver);
            let _ = input_iterator.finish();
            let (kind, message) = err.as_external();
            error_cb(kind, message);
        }
    }
}
