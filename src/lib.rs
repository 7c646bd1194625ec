//! Record-processing core of an embedded SQL-like query engine.
//!
//! This crate drives one compiled query (a [`query::QueryPlan`]) over an
//! [`driver::InputIterator`], through an optional [`joiner::JoinMap`], and
//! out through an [`driver::OutputWriter`]. Parsing, code generation, and
//! concrete record decoding/encoding are all out of scope: this crate
//! consumes those contracts, it does not implement them.
//!
//! Entry point: [`run::run`].

mod aggregate;
mod context;
mod driver;
mod error;
mod eval;
mod joiner;
mod options;
mod query;
mod record;
mod row;
mod run;
mod value;
mod writer;

pub use aggregate::Aggregator;
pub use driver::{InputIterator, OutputWriter};
pub use error::{Error, ErrorKind};
pub use eval::{AggKind, AggregationToken, EvalValue, UnnestMarker};
pub use joiner::{JoinMap, Joiner};
pub use options::ExecutionOptions;
pub use query::{
    JoinKeyExpr, JoinOperation, KeyExpr, QueryPlan, SelectExpr, UpdateStmts, WhereExpr, WriterType,
};
pub use record::Record;
pub use run::run;
pub use value::Value;
