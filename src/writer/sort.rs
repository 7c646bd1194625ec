use super::{AfterFinish, RowSink};
use crate::error::Error;
use crate::value::Value;

/// `ORDER BY`: buffers all rows, each tagged with its sort key (the final
/// component of which is always `NR`, appended by the caller so the sort
/// is total even when two rows' leading key components compare equal).
/// On `finish`, sorts stably by the leading key components, applies the
/// optional `reverse`, and emits the payload of each entry.
pub struct SortedWriter {
    inner: Box<dyn RowSink>,
    reverse: bool,
    buffered: Vec<(Vec<Value>, Vec<Value>)>,
}

impl SortedWriter {
    pub fn new(inner: Box<dyn RowSink>, reverse: bool) -> Self {
        SortedWriter {
            inner,
            reverse,
            buffered: Vec::new(),
        }
    }

    /// `sort_key` must already include the `NR` tiebreaker as its last
    /// element; `payload` is the row to emit once sorted.
    pub fn push(&mut self, sort_key: Vec<Value>, payload: Vec<Value>) {
        self.buffered.push((sort_key, payload));
    }

    /// Lexicographic elementwise comparison. A shorter key that is a
    /// prefix of a longer one compares equal at the overlapping
    /// positions — the appended `NR` component guarantees totality.
    fn stable_compare(a: &[Value], b: &[Value]) -> std::cmp::Ordering {
        for (x, y) in a.iter().zip(b.iter()) {
            let ord = x.compare(y);
            if ord != std::cmp::Ordering::Equal {
                return ord;
            }
        }
        std::cmp::Ordering::Equal
    }
}

impl RowSink for SortedWriter {
    /// `ORDER BY` never receives rows through plain `write`; callers buffer
    /// via `push` with an explicit sort key instead. A bare `write` call
    /// buffers with an empty key, i.e. stable passthrough order.
    fn write(&mut self, record: Vec<Value>) -> Result<bool, Error> {
        self.push(Vec::new(), record);
        Ok(true)
    }

    fn write_with_key(&mut self, sort_key: Vec<Value>, record: Vec<Value>) -> Result<bool, Error> {
        self.push(sort_key, record);
        Ok(true)
    }

    fn finish(&mut self, after_finish: &mut AfterFinish<'_>) -> Result<(), Error> {
        self.buffered
            .sort_by(|(a, _), (b, _)| Self::stable_compare(a, b));
        if self.reverse {
            self.buffered.reverse();
        }
        for (_, payload) in std::mem::take(&mut self.buffered) {
            if !self.inner.write(payload)? {
                break;
            }
        }
        self.inner.finish(after_finish)
    }
}
