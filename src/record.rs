use crate::error::Error;
use crate::value::Value;

/// An ordered sequence of field values from the input or produced for
/// output. Field access goes through the `safe_*` helpers below rather
/// than plain indexing, since record width varies per row.
#[derive(Debug, Clone, PartialEq)]
pub struct Record(pub Vec<Value>);

impl Record {
    pub fn new(fields: Vec<Value>) -> Self {
        Record(fields)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> &[Value] {
        &self.0
    }

    /// `a{idx+1}`-style optional access: out of range yields `null` rather
    /// than an error. Used for inputs of unknown/variable width.
    pub fn safe_get(&self, idx: usize) -> Value {
        self.0.get(idx).cloned().unwrap_or(Value::Null)
    }

    /// Mandatory reference access, e.g. a join key: out of range raises
    /// `BadField(idx)`.
    pub fn safe_join_get(&self, idx: usize, nr: u64) -> Result<Value, Error> {
        self.0
            .get(idx)
            .cloned()
            .ok_or_else(|| Error::bad_field(idx, nr))
    }

    /// `UPDATE` target access: `idx_1based` out of range raises
    /// `BadField(idx_1based - 1)`.
    pub fn safe_set(&mut self, idx_1based: usize, value: Value, nr: u64) -> Result<(), Error> {
        let idx = idx_1based
            .checked_sub(1)
            .ok_or_else(|| Error::bad_field(0, nr))?;
        match self.0.get_mut(idx) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(Error::bad_field(idx, nr)),
        }
    }

    /// A null-filled record of the given width, used by `LeftJoiner` when
    /// no RHS match exists.
    pub fn null_filled(width: usize) -> Self {
        Record(vec![Value::Null; width])
    }

    /// Concatenates a left record with an optional RHS record, producing
    /// the `star_fields` a row processor evaluates expressions against.
    pub fn concat(&self, rhs: Option<&Record>) -> Record {
        let mut fields = self.0.clone();
        if let Some(rhs) = rhs {
            fields.extend(rhs.0.iter().cloned());
        }
        Record(fields)
    }

    pub fn to_canonical_key(&self) -> Result<String, Error> {
        Value::Array(self.0.clone()).to_canonical_key()
    }
}
