use crate::error::Error;
use crate::value::Value;

/// One aggregate function's per-group state, and the uniform
/// `increment`/`get_final` contract shared by all nine kinds.
///
/// Each variant carries only the state its finalization needs: scalars for
/// `Min`/`Max`/`Sum`, a running `(sum, count)` pair for `Avg`, a running
/// `(sum, sum_sq, count)` triple for `Variance`, and a buffered list for
/// `Median`/`ArrayAgg`, the only two that cannot finalize in O(1).
#[derive(Debug, Clone)]
pub enum Aggregator {
    Min(Option<f64>),
    Max(Option<f64>),
    Sum(f64),
    Avg { sum: f64, count: u64 },
    Variance { sum: f64, sum_sq: f64, count: u64 },
    Median(Vec<f64>),
    Count(u64),
    ArrayAgg(Vec<Value>),
    /// Used implicitly for non-aggregated output columns in an aggregate
    /// query: asserts every row in a group produced the same value.
    ConstGroupVerifier(Option<Value>),
}

impl Aggregator {
    /// Fresh, empty state of the same kind — used when a new group key is
    /// first seen.
    pub fn new_instance(&self) -> Self {
        match self {
            Aggregator::Min(_) => Aggregator::Min(None),
            Aggregator::Max(_) => Aggregator::Max(None),
            Aggregator::Sum(_) => Aggregator::Sum(0.0),
            Aggregator::Avg { .. } => Aggregator::Avg { sum: 0.0, count: 0 },
            Aggregator::Variance { .. } => Aggregator::Variance {
                sum: 0.0,
                sum_sq: 0.0,
                count: 0,
            },
            Aggregator::Median(_) => Aggregator::Median(Vec::new()),
            Aggregator::Count(_) => Aggregator::Count(0),
            Aggregator::ArrayAgg(_) => Aggregator::ArrayAgg(Vec::new()),
            Aggregator::ConstGroupVerifier(_) => Aggregator::ConstGroupVerifier(None),
        }
    }

    /// Folds one contributed value into this group's state.
    /// `output_column` is the 1-based output position, used only to name
    /// the column in a `ConstGroupVerifier` mismatch error.
    pub fn increment(&mut self, value: Value, output_column: usize) -> Result<(), Error> {
        match self {
            Aggregator::Min(state) => {
                let n = value.parse_number()?;
                *state = Some(state.map_or(n, |cur| cur.min(n)));
            }
            Aggregator::Max(state) => {
                let n = value.parse_number()?;
                *state = Some(state.map_or(n, |cur| cur.max(n)));
            }
            Aggregator::Sum(sum) => {
                *sum += value.parse_number()?;
            }
            Aggregator::Avg { sum, count } => {
                *sum += value.parse_number()?;
                *count += 1;
            }
            Aggregator::Variance {
                sum,
                sum_sq,
                count,
            } => {
                let n = value.parse_number()?;
                *sum += n;
                *sum_sq += n * n;
                *count += 1;
            }
            Aggregator::Median(values) => {
                values.push(value.parse_number()?);
            }
            // COUNT(*) semantics: every row in the group counts, value is
            // ignored.
            Aggregator::Count(count) => {
                *count += 1;
            }
            Aggregator::ArrayAgg(values) => {
                values.push(value);
            }
            Aggregator::ConstGroupVerifier(existing) => match existing {
                None => *existing = Some(value),
                Some(seen) if *seen == value => {}
                Some(seen) => {
                    return Err(Error::runtime(format!(
                        "Inconsistent value in non-aggregated output column {output_column}: '{seen}' vs '{value}'"
                    )));
                }
            },
        }
        Ok(())
    }

    /// Computes the final value for this group. Consumes buffered state
    /// (`Median`, `ArrayAgg`) since a group is only ever finalized once.
    pub fn get_final(&self) -> Value {
        match self {
            Aggregator::Min(state) => state.map(Value::Float).unwrap_or(Value::Null),
            Aggregator::Max(state) => state.map(Value::Float).unwrap_or(Value::Null),
            Aggregator::Sum(sum) => Value::Float(*sum),
            Aggregator::Avg { sum, count } => {
                if *count == 0 {
                    Value::Null
                } else {
                    Value::Float(sum / *count as f64)
                }
            }
            Aggregator::Variance {
                sum,
                sum_sq,
                count,
            } => {
                if *count == 0 {
                    Value::Null
                } else {
                    let n = *count as f64;
                    let mean = sum / n;
                    Value::Float(sum_sq / n - mean * mean)
                }
            }
            Aggregator::Median(values) => {
                if values.is_empty() {
                    return Value::Null;
                }
                let mut sorted = values.clone();
                sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                let mid = sorted.len() / 2;
                let median = if sorted.len() % 2 == 0 {
                    (sorted[mid - 1] + sorted[mid]) / 2.0
                } else {
                    sorted[mid]
                };
                Value::Float(median)
            }
            Aggregator::Count(count) => Value::Int(*count as i64),
            // Default post-processor: join with `|`.
            Aggregator::ArrayAgg(values) => {
                let joined = values
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join("|");
                Value::Str(joined)
            }
            Aggregator::ConstGroupVerifier(existing) => existing.clone().unwrap_or(Value::Null),
        }
    }
}
