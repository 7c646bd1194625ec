use crate::error::Error;
use crate::record::Record;
use crate::value::Value;

/// External entity exposing a preloaded right-hand-side table for join
/// lookups. Its concrete storage and population strategy are out of scope
/// here; this crate only consumes the lookup, `max_record_len`, and
/// `build` contracts.
pub trait JoinMap {
    /// Preloads the table. Called once by `run()` before the first record
    /// is processed, the synchronous re-expression of the source's
    /// `build(on_success, on_error)` callback pair: `run()` delays driving
    /// the input iterator until this returns, and surfaces an `Err` through
    /// the same error path as any other pipeline failure. Join maps that
    /// arrive already built (the common case for a synchronous host) use
    /// the default no-op.
    fn build(&self) -> Result<(), Error> {
        Ok(())
    }
    fn get_join_records(&self, key: &Value) -> Vec<Record>;
    fn max_record_len(&self) -> usize;
    fn get_warnings(&self) -> Vec<String> {
        Vec::new()
    }
}

/// The four join strategies, sharing the contract `get_rhs(left_key) ->
/// list<record>`.
pub enum Joiner<'a> {
    /// No `FROM JOIN`: yields exactly one synthetic empty RHS so the row
    /// processor iterates the left row once.
    Void,
    Inner { map: &'a dyn JoinMap },
    Left { map: &'a dyn JoinMap },
    StrictLeft { map: &'a dyn JoinMap },
}

impl<'a> Joiner<'a> {
    /// Produces the RHS candidates for one left row. `None` entries stand
    /// for "no RHS fields to concatenate" (the `Void` and null-filled
    /// `Left` cases); `Some` entries are real matched records.
    pub fn get_rhs(&self, left_key: &Value) -> Result<Vec<Option<Record>>, Error> {
        match self {
            Joiner::Void => Ok(vec![None]),
            Joiner::Inner { map } => {
                Ok(map.get_join_records(left_key).into_iter().map(Some).collect())
            }
            Joiner::Left { map } => {
                let matches = map.get_join_records(left_key);
                if matches.is_empty() {
                    Ok(vec![Some(Record::null_filled(map.max_record_len()))])
                } else {
                    Ok(matches.into_iter().map(Some).collect())
                }
            }
            Joiner::StrictLeft { map } => {
                let mut matches = map.get_join_records(left_key);
                if matches.len() != 1 {
                    return Err(Error::runtime(format!(
                        "In 'STRICT LEFT JOIN' each key in A must have exactly one match in B. Bad A key: '{left_key}'"
                    )));
                }
                Ok(vec![Some(matches.remove(0))])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestMap {
        rows: Vec<(Value, Vec<Record>)>,
        width: usize,
    }

    impl JoinMap for TestMap {
        fn get_join_records(&self, key: &Value) -> Vec<Record> {
            self.rows
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
                .unwrap_or_default()
        }

        fn max_record_len(&self) -> usize {
            self.width
        }
    }

    #[test]
    fn void_yields_one_null_rhs() {
        let joiner = Joiner::Void;
        let rhs = joiner.get_rhs(&Value::Int(1)).unwrap();
        assert_eq!(rhs, vec![None]);
    }

    #[test]
    fn left_null_fills_width_on_miss() {
        let map = TestMap {
            rows: vec![],
            width: 2,
        };
        let joiner = Joiner::Left { map: &map };
        let rhs = joiner.get_rhs(&Value::Int(1)).unwrap();
        assert_eq!(rhs, vec![Some(Record::null_filled(2))]);
    }

    #[test]
    fn strict_left_errors_on_multiple_matches() {
        let map = TestMap {
            rows: vec![(
                Value::Int(1),
                vec![
                    Record::new(vec![Value::Int(1)]),
                    Record::new(vec![Value::Int(2)]),
                ],
            )],
            width: 1,
        };
        let joiner = Joiner::StrictLeft { map: &map };
        let err = joiner.get_rhs(&Value::Int(1)).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Runtime);
    }

    #[test]
    fn strict_left_errors_on_zero_matches() {
        let map = TestMap {
            rows: vec![],
            width: 1,
        };
        let joiner = Joiner::StrictLeft { map: &map };
        assert!(joiner.get_rhs(&Value::Int(9)).is_err());
    }
}
