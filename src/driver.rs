use tracing::{trace, warn};

use crate::context::ExecutionContext;
use crate::error::Error;
use crate::joiner::Joiner;
use crate::query::QueryPlan;
use crate::record::Record;
use crate::row::{process_select, process_update};
use crate::writer::AfterFinish;

/// Decodes records from a source. Its concrete decoding is out of scope;
/// this crate only drives it through the callback contract. `start` takes
/// the per-record callback directly rather than through a stateful setter,
/// the synchronous re-expression of the source's callback-registration
/// API: the callback returns `Ok(false)` to signal "stop, no error", in
/// which case a conforming implementation calls its own `finish` before
/// `start` returns, mirroring the driver's "writer signaled stop" handling.
pub trait InputIterator {
    fn start(&mut self, record_callback: &mut dyn FnMut(Record) -> Result<bool, Error>) -> Result<(), Error>;
    fn finish(&mut self) -> Result<(), Error>;
    fn get_warnings(&self) -> Vec<String>;
}

/// Serializes records to a sink. Its concrete serialization is out of
/// scope; this crate only drives it through the `RowSink`-shaped contract.
pub trait OutputWriter {
    fn write(&mut self, record: Vec<crate::value::Value>) -> Result<bool, Error>;
    fn finish(&mut self, after_finish: &mut AfterFinish<'_>) -> Result<(), Error>;
    fn get_warnings(&self) -> Vec<String>;
}

/// Drives one query's records through the pipeline, owning the execution
/// context, the joiner, and the compiled query plan for its lifetime.
pub struct RecordDriver<'a> {
    ctx: ExecutionContext,
    joiner: Joiner<'a>,
    plan: QueryPlan<'a>,
    debug: bool,
}

impl<'a> RecordDriver<'a> {
    pub fn new(
        ctx: ExecutionContext,
        joiner: Joiner<'a>,
        plan: QueryPlan<'a>,
        debug: bool,
    ) -> Result<Self, Error> {
        let mut driver = RecordDriver {
            ctx,
            joiner,
            plan,
            debug,
        };
        driver.ctx.begin()?;
        Ok(driver)
    }

    /// Entry point invoked once per input record. Increments `NR`; if the
    /// engine has already terminated with error, returns silently.
    /// Returns `true` while the pipeline should keep receiving records.
    pub fn process_record(&mut self, record: Record) -> Result<bool, Error> {
        if self.ctx.is_finished_with_error() {
            return Ok(true);
        }
        let nr = self.ctx.next_record();
        trace!(nr, "processing record");
        match self.do_process_record(&record, nr) {
            Ok(keep_going) => Ok(keep_going),
            Err(err) => {
                self.ctx.mark_finished_with_error();
                Err(self.classify(err, nr))
            }
        }
    }

    fn do_process_record(&mut self, record: &Record, nr: u64) -> Result<bool, Error> {
        if self.plan.is_select_query {
            process_select(&mut self.ctx, &self.joiner, &self.plan, record, nr)
        } else {
            process_update(&mut self.ctx, &self.joiner, &self.plan, record, nr)
        }
    }

    /// Maps any propagated error onto the driver's classification table.
    /// `BadField`/`Parsing`/`Runtime` already carry a correctly formatted
    /// message; anything else is wrapped with the generic execution-error
    /// format. In debug mode a captured backtrace is appended, mirroring
    /// the teacher's `Backtrace::force_capture`/`BacktraceStatus::Captured`
    /// idiom for surfacing a trace alongside an otherwise-opaque error.
    fn classify(&self, err: Error, nr: u64) -> Error {
        use crate::error::ErrorKind;
        match err.kind() {
            ErrorKind::BadField | ErrorKind::Parsing | ErrorKind::Runtime => err,
            ErrorKind::Unexpected => {
                warn!(nr, message = err.message(), "unexpected error during record processing");
                let mut message = format!("At record: {nr}, Details: {}", err.message());
                if self.debug {
                    let backtrace = std::backtrace::Backtrace::force_capture();
                    if let std::backtrace::BacktraceStatus::Captured = backtrace.status() {
                        message.push_str(&format!("\nBacktrace:\n{backtrace}"));
                    }
                }
                Error::runtime(message)
            }
        }
    }

    pub fn finish(&mut self, after_finish: &mut AfterFinish<'_>) -> Result<(), Error> {
        self.ctx.finish(after_finish)
    }

    pub fn nu(&self) -> u64 {
        self.ctx.nu()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{JoinOperation, WriterType};
    use crate::value::Value;
    use crate::writer::{SinkWriter, TopWriter};
    use std::cell::RefCell;
    use std::rc::Rc;

    struct AlwaysTrue;
    impl crate::query::WhereExpr for AlwaysTrue {
        fn evaluate(&self, _star_fields: &[Value], _nr: u64) -> Result<bool, Error> {
            Ok(true)
        }
    }

    struct SelectFirstColumn;
    impl crate::query::SelectExpr for SelectFirstColumn {
        fn evaluate(
            &self,
            star_fields: &[Value],
            _nr: u64,
        ) -> Result<Vec<crate::eval::EvalValue>, Error> {
            Ok(vec![crate::eval::EvalValue::Scalar(star_fields[0].clone())])
        }
    }

    #[test]
    fn already_finished_with_error_is_silently_skipped() {
        let collected = Rc::new(RefCell::new(Vec::new()));
        let collected_write = Rc::clone(&collected);
        let mut write_fn = move |record: Vec<Value>| -> Result<bool, Error> {
            collected_write.borrow_mut().push(record);
            Ok(true)
        };
        let mut finish_fn = |cb: &mut AfterFinish<'_>| cb();
        let sink = SinkWriter {
            write_fn: &mut write_fn,
            finish_fn: &mut finish_fn,
        };
        let top = TopWriter::new(Box::new(sink), None);
        let ctx = ExecutionContext::new(Box::new(top));

        let where_expr = AlwaysTrue;
        let select_expr = SelectFirstColumn;
        let plan = QueryPlan {
            where_expression: &where_expr,
            select_expression: &select_expr,
            update_statements: None,
            aggregation_key_expression: None,
            sort_key_expression: None,
            lhs_join_var: None,
            sort_flag: false,
            reverse_flag: false,
            top_count: None,
            is_select_query: true,
            writer_type: WriterType::Simple,
            join_operation: JoinOperation::Void,
        };
        let mut driver = RecordDriver::new(ctx, Joiner::Void, plan, false).unwrap();
        driver.ctx.mark_finished_with_error();
        let keep_going = driver
            .process_record(Record::new(vec![Value::Int(1)]))
            .unwrap();
        assert!(keep_going);
        assert!(collected.borrow().is_empty());
    }
}
