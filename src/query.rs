use crate::error::Error;
use crate::eval::EvalValue;
use crate::record::Record;
use crate::value::Value;

/// `WHERE <predicate>`, evaluated against `star_fields` (left fields, or
/// left ++ right when a join is active). `nr` is the current 1-based
/// record count, forwarded so a `BadField` raised mid-expression (e.g. an
/// out-of-range `a5` reference) can be formatted with the driver's exact
/// classification message without a second round-trip through the driver.
pub trait WhereExpr {
    fn evaluate(&self, star_fields: &[Value], nr: u64) -> Result<bool, Error>;
}

/// `SELECT <columns>`, evaluated against `star_fields`. Yields one
/// `EvalValue` per output column; `Agg` entries side-effect nothing by
/// themselves — the row processor reads the number of `Agg` entries back
/// out of the result to drive the aggregation state machine.
pub trait SelectExpr {
    fn evaluate(&self, star_fields: &[Value], nr: u64) -> Result<Vec<EvalValue>, Error>;

    /// The number of aggregate-function calls the compiler placed in this
    /// SELECT clause, known statically at compile time. Used to validate
    /// that every token actually reached an output position (catching
    /// aggregate calls nested inside an otherwise-scalar expression that
    /// did not already fail during evaluation).
    fn functional_aggregator_count(&self) -> usize {
        0
    }
}

/// `UPDATE <assignments>`, applied to a mutable copy of the left record.
/// Assignments target `up_fields[idx]` via 1-based `safe_set`.
pub trait UpdateStmts {
    fn apply(&self, up_fields: &mut Record, nr: u64) -> Result<(), Error>;
}

/// A single-value expression evaluated per row: used for both the
/// `aggregation_key_expression` (GROUP BY key) and the `sort_key_expression`
/// (ORDER BY key components).
pub trait KeyExpr {
    fn evaluate(&self, star_fields: &[Value], nr: u64) -> Result<Vec<Value>, Error>;
}

/// The left-hand join key expression (`lhs_join_var`), evaluated against
/// the left record alone, before any RHS is known.
pub trait JoinKeyExpr {
    fn evaluate(&self, left_fields: &[Value], nr: u64) -> Result<Value, Error>;
}

/// Which writer variant the compiler selected for non-aggregate output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterType {
    Simple,
    Uniq,
    UniqCount,
}

/// Which join strategy the compiler selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOperation {
    Void,
    Join,
    Inner,
    Left,
    StrictLeft,
}

/// The materialized code-generation contract between the (out of scope)
/// query compiler and this core: every per-record expression plus the
/// flags that determine how the writer chain and joiner are constructed.
pub struct QueryPlan<'a> {
    pub where_expression: &'a dyn WhereExpr,
    pub select_expression: &'a dyn SelectExpr,
    pub update_statements: Option<&'a dyn UpdateStmts>,
    pub aggregation_key_expression: Option<&'a dyn KeyExpr>,
    pub sort_key_expression: Option<&'a dyn KeyExpr>,
    pub lhs_join_var: Option<&'a dyn JoinKeyExpr>,

    pub sort_flag: bool,
    pub reverse_flag: bool,
    pub top_count: Option<usize>,
    pub is_select_query: bool,
    pub writer_type: WriterType,
    pub join_operation: JoinOperation,
}
