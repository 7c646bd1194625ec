use std::collections::HashMap;

use super::{AfterFinish, RowSink};
use crate::error::Error;
use crate::record::Record;
use crate::value::Value;

/// `DISTINCT`: tracks a set of canonical record encodings. A duplicate is
/// silently dropped (write returns `true`, keep feeding); a new record is
/// forwarded immediately.
pub struct UniqWriter {
    inner: Box<dyn RowSink>,
    seen: std::collections::HashSet<String>,
}

impl UniqWriter {
    pub fn new(inner: Box<dyn RowSink>) -> Self {
        UniqWriter {
            inner,
            seen: std::collections::HashSet::new(),
        }
    }

    fn canonical_key(record: &[Value]) -> Result<String, Error> {
        Record::new(record.to_vec()).to_canonical_key()
    }
}

impl RowSink for UniqWriter {
    fn write(&mut self, record: Vec<Value>) -> Result<bool, Error> {
        let key = Self::canonical_key(&record)?;
        if !self.seen.insert(key) {
            return Ok(true);
        }
        self.inner.write(record)
    }

    fn finish(&mut self, after_finish: &mut AfterFinish<'_>) -> Result<(), Error> {
        self.inner.finish(after_finish)
    }
}

/// `DISTINCT COUNT`: tallies occurrences of each canonical record; on
/// `finish`, emits each record prefixed by its count, in insertion order
/// of first occurrence.
pub struct UniqCountWriter {
    inner: Box<dyn RowSink>,
    order: Vec<String>,
    counts: HashMap<String, (usize, Vec<Value>)>,
}

impl UniqCountWriter {
    pub fn new(inner: Box<dyn RowSink>) -> Self {
        UniqCountWriter {
            inner,
            order: Vec::new(),
            counts: HashMap::new(),
        }
    }

    fn canonical_key(record: &[Value]) -> Result<String, Error> {
        Record::new(record.to_vec()).to_canonical_key()
    }
}

impl RowSink for UniqCountWriter {
    fn write(&mut self, record: Vec<Value>) -> Result<bool, Error> {
        let key = Self::canonical_key(&record)?;
        match self.counts.entry(key.clone()) {
            std::collections::hash_map::Entry::Occupied(mut existing) => {
                existing.get_mut().0 += 1;
            }
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert((1, record));
                self.order.push(key);
            }
        }
        Ok(true)
    }

    fn finish(&mut self, after_finish: &mut AfterFinish<'_>) -> Result<(), Error> {
        for key in std::mem::take(&mut self.order) {
            if let Some((count, record)) = self.counts.remove(&key) {
                let mut out = Vec::with_capacity(record.len() + 1);
                out.push(Value::Int(count as i64));
                out.extend(record);
                if !self.inner.write(out)? {
                    break;
                }
            }
        }
        self.inner.finish(after_finish)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::SinkWriter;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn uniq_drops_duplicates() {
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
        let mut uniq = UniqWriter::new(Box::new(sink));
        uniq.write(vec![Value::Str("x".into())]).unwrap();
        uniq.write(vec![Value::Str("y".into())]).unwrap();
        uniq.write(vec![Value::Str("x".into())]).unwrap();
        assert_eq!(collected.borrow().len(), 2);
    }

    #[test]
    fn uniq_count_emits_counts_in_first_seen_order() {
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
        let mut writer = UniqCountWriter::new(Box::new(sink));
        for value in ["x", "y", "x", "x"] {
            writer.write(vec![Value::Str(value.into())]).unwrap();
        }
        let mut noop = || Ok(());
        writer.finish(&mut noop).unwrap();
        assert_eq!(
            *collected.borrow(),
            vec![
                vec![Value::Int(3), Value::Str("x".into())],
                vec![Value::Int(1), Value::Str("y".into())],
            ]
        );
    }
}
