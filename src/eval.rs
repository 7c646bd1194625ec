use crate::error::Error;
use crate::value::Value;

/// Which of the eight aggregate functions produced a token. Used on the
/// first aggregated row to build the matching `Aggregator` template for
/// that output position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggKind {
    Min,
    Max,
    Sum,
    Avg,
    Variance,
    Median,
    Count,
    ArrayAgg,
}

impl AggKind {
    pub fn new_template(self) -> crate::aggregate::Aggregator {
        use crate::aggregate::Aggregator;
        match self {
            AggKind::Min => Aggregator::Min(None),
            AggKind::Max => Aggregator::Max(None),
            AggKind::Sum => Aggregator::Sum(0.0),
            AggKind::Avg => Aggregator::Avg { sum: 0.0, count: 0 },
            AggKind::Variance => Aggregator::Variance {
                sum: 0.0,
                sum_sq: 0.0,
                count: 0,
            },
            AggKind::Median => Aggregator::Median(Vec::new()),
            AggKind::Count => Aggregator::Count(0),
            AggKind::ArrayAgg => Aggregator::ArrayAgg(Vec::new()),
        }
    }
}

/// Sentinel produced by an aggregate call (`MIN`, `MAX`, `SUM`, `AVG`,
/// `VARIANCE`, `MEDIAN`, `COUNT`, `ARRAY_AGG`) during row expression
/// evaluation. Kept in place of a value until post-row processing assigns
/// it to an aggregator slot.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationToken {
    pub aggregator_index: usize,
    pub kind: AggKind,
    pub contributed_value: Value,
}

/// Sentinel marking the output position where `UNNEST(list)` was called.
/// At most one may exist per row.
#[derive(Debug, Clone, PartialEq)]
pub struct UnnestMarker {
    pub list: Vec<Value>,
}

/// The result of evaluating one row expression. Tagged so that arithmetic
/// and stringification can reject the non-scalar variants at evaluation
/// time, enforcing that aggregate results and unnest lists cannot be
/// composed inside arithmetic/string expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalValue {
    Scalar(Value),
    Agg(AggregationToken),
    Unnest(UnnestMarker),
}

impl EvalValue {
    pub fn scalar(v: impl Into<Value>) -> Self {
        EvalValue::Scalar(v.into())
    }

    pub fn is_agg(&self) -> bool {
        matches!(self, EvalValue::Agg(_))
    }

    pub fn is_unnest(&self) -> bool {
        matches!(self, EvalValue::Unnest(_))
    }

    /// Unwraps a scalar value, failing for `Agg`/`Unnest` operands. This is
    /// the enforcement point for "converting the token to string must
    /// fail" and for rejecting `UNNEST` used inside an expression.
    pub fn as_scalar(&self) -> Result<&Value, Error> {
        match self {
            EvalValue::Scalar(v) => Ok(v),
            EvalValue::Agg(_) => Err(Error::parsing(
                "Usage of RBQL aggregation functions inside JavaScript expressions is not allowed, see the docs",
            )),
            EvalValue::Unnest(_) => {
                Err(Error::parsing("UNNEST result cannot be used inside an expression"))
            }
        }
    }

    pub fn into_scalar(self) -> Result<Value, Error> {
        match self {
            EvalValue::Scalar(v) => Ok(v),
            EvalValue::Agg(_) => Err(Error::parsing(
                "Usage of RBQL aggregation functions inside JavaScript expressions is not allowed, see the docs",
            )),
            EvalValue::Unnest(_) => {
                Err(Error::parsing("UNNEST result cannot be used inside an expression"))
            }
        }
    }

    /// Display coercion used when an output row is finally written. Fails
    /// for non-scalar variants for the same reason `as_scalar` does.
    pub fn to_display_value(&self) -> Result<Value, Error> {
        self.as_scalar().cloned()
    }
}

impl From<Value> for EvalValue {
    fn from(v: Value) -> Self {
        EvalValue::Scalar(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregation_token_cannot_be_stringified() {
        let token = EvalValue::Agg(AggregationToken {
            aggregator_index: 0,
            kind: AggKind::Min,
            contributed_value: Value::Int(1),
        });
        assert!(token.as_scalar().is_err());
    }

    #[test]
    fn scalar_round_trips() {
        let v = EvalValue::scalar(Value::Int(5));
        assert_eq!(v.as_scalar().unwrap(), &Value::Int(5));
    }
}
