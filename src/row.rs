use crate::aggregate::Aggregator;
use crate::context::ExecutionContext;
use crate::error::Error;
use crate::eval::EvalValue;
use crate::joiner::Joiner;
use crate::query::QueryPlan;
use crate::record::Record;
use crate::value::Value;

/// `process_select`: evaluates the predicate and output expression for
/// every RHS candidate of one left row, then routes the result to the
/// aggregated, unnested, or simple output path. Returns `false` as soon as
/// any write signals the pipeline should stop.
pub fn process_select(
    ctx: &mut ExecutionContext,
    joiner: &Joiner<'_>,
    plan: &QueryPlan<'_>,
    left: &Record,
    nr: u64,
) -> Result<bool, Error> {
    let left_key = match plan.lhs_join_var {
        Some(key_expr) => key_expr.evaluate(left.fields(), nr)?,
        None => Value::Null,
    };
    let rhs_candidates = joiner.get_rhs(&left_key)?;

    for rhs in &rhs_candidates {
        let star = left.concat(rhs.as_ref());

        if !plan.where_expression.evaluate(star.fields(), nr)? {
            continue;
        }

        let out_fields = plan.select_expression.evaluate(star.fields(), nr)?;
        let agg_count = out_fields.iter().filter(|v| v.is_agg()).count();

        let keep_going = if agg_count > 0 || ctx.is_aggregating() {
            select_aggregated(ctx, plan, &star, out_fields, agg_count, nr)?
        } else if let Some(pos) = out_fields.iter().position(|v| v.is_unnest()) {
            select_unnested(ctx, plan, &star, out_fields, pos, nr)?
        } else {
            select_simple(ctx, plan, &star, out_fields, nr)?
        };

        if !keep_going {
            return Ok(false);
        }
    }

    Ok(true)
}

fn select_aggregated(
    ctx: &mut ExecutionContext,
    plan: &QueryPlan<'_>,
    star: &Record,
    out_fields: Vec<EvalValue>,
    agg_count: usize,
    nr: u64,
) -> Result<bool, Error> {
    if !ctx.is_aggregating() {
        let declared = plan.select_expression.functional_aggregator_count();
        if agg_count != declared {
            return Err(Error::parsing(
                "Usage of RBQL aggregation functions inside JavaScript expressions is not allowed, see the docs",
            ));
        }
        let templates: Vec<Aggregator> = out_fields
            .iter()
            .map(|v| match v {
                EvalValue::Agg(token) => token.kind.new_template(),
                _ => Aggregator::ConstGroupVerifier(None),
            })
            .collect();
        ctx.activate_aggregation(templates);
    }

    let group_key = match plan.aggregation_key_expression {
        Some(key_expr) => Value::Array(key_expr.evaluate(star.fields(), nr)?).to_canonical_key()?,
        None => "null".to_string(),
    };

    let values = out_fields
        .into_iter()
        .map(|v| match v {
            EvalValue::Scalar(value) => Ok(value),
            EvalValue::Agg(token) => Ok(token.contributed_value),
            EvalValue::Unnest(_) => {
                Err(Error::parsing("UNNEST cannot be combined with aggregation"))
            }
        })
        .collect::<Result<Vec<_>, Error>>()?;

    ctx.aggregate_increment(&group_key, values)?;
    Ok(true)
}

fn select_unnested(
    ctx: &mut ExecutionContext,
    plan: &QueryPlan<'_>,
    star: &Record,
    out_fields: Vec<EvalValue>,
    marker_pos: usize,
    nr: u64,
) -> Result<bool, Error> {
    let mut prefix = Vec::with_capacity(out_fields.len() - 1);
    let mut list = Vec::new();
    for (idx, field) in out_fields.into_iter().enumerate() {
        if idx == marker_pos {
            match field {
                EvalValue::Unnest(marker) => list = marker.list,
                _ => unreachable!("marker_pos located an Unnest variant"),
            }
        } else {
            prefix.push(field.into_scalar()?);
        }
    }

    for element in list {
        let mut row = prefix.clone();
        row.insert(marker_pos, element);
        let sort_key = sort_key_with_tiebreak(plan, star, nr)?;
        if !ctx.write_row(sort_key, row)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn select_simple(
    ctx: &mut ExecutionContext,
    plan: &QueryPlan<'_>,
    star: &Record,
    out_fields: Vec<EvalValue>,
    nr: u64,
) -> Result<bool, Error> {
    let row = out_fields
        .into_iter()
        .map(EvalValue::into_scalar)
        .collect::<Result<Vec<_>, Error>>()?;
    let sort_key = sort_key_with_tiebreak(plan, star, nr)?;
    ctx.write_row(sort_key, row)
}

fn sort_key_with_tiebreak(
    plan: &QueryPlan<'_>,
    star: &Record,
    nr: u64,
) -> Result<Option<Vec<Value>>, Error> {
    if !plan.sort_flag {
        return Ok(None);
    }
    let mut key = match plan.sort_key_expression {
        Some(expr) => expr.evaluate(star.fields(), nr)?,
        None => Vec::new(),
    };
    key.push(Value::Int(nr as i64));
    Ok(Some(key))
}

/// `process_update`: applies the `UPDATE` assignments to a mutable copy of
/// the left record when exactly one RHS candidate matches and the `WHERE`
/// clause holds; always emits the (possibly unmodified) row.
pub fn process_update(
    ctx: &mut ExecutionContext,
    joiner: &Joiner<'_>,
    plan: &QueryPlan<'_>,
    left: &Record,
    nr: u64,
) -> Result<bool, Error> {
    let left_key = match plan.lhs_join_var {
        Some(key_expr) => key_expr.evaluate(left.fields(), nr)?,
        None => Value::Null,
    };
    let rhs_candidates = joiner.get_rhs(&left_key)?;

    if rhs_candidates.len() > 1 {
        return Err(Error::runtime(
            "More than one record in UPDATE query matched A-key in join table B",
        ));
    }

    let mut up_fields = left.clone();

    if let Some(rhs) = rhs_candidates.first() {
        let star = left.concat(rhs.as_ref());
        if plan.where_expression.evaluate(star.fields(), nr)? {
            ctx.record_update();
            if let Some(stmts) = plan.update_statements {
                stmts.apply(&mut up_fields, nr)?;
            }
        }
    }

    ctx.write_row(None, up_fields.fields().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{AggKind, AggregationToken};
    use crate::writer::{AfterFinish, SinkWriter, TopWriter};
    use std::cell::RefCell;
    use std::rc::Rc;

    struct AlwaysTrue;
    impl crate::query::WhereExpr for AlwaysTrue {
        fn evaluate(&self, _star_fields: &[Value], _nr: u64) -> Result<bool, Error> {
            Ok(true)
        }
    }

    struct EqualsX;
    impl crate::query::WhereExpr for EqualsX {
        fn evaluate(&self, star_fields: &[Value], _nr: u64) -> Result<bool, Error> {
            Ok(star_fields.get(1) == Some(&Value::Str("x".into())))
        }
    }

    struct SelectFirstColumn;
    impl crate::query::SelectExpr for SelectFirstColumn {
        fn evaluate(&self, star_fields: &[Value], _nr: u64) -> Result<Vec<EvalValue>, Error> {
            Ok(vec![EvalValue::Scalar(star_fields[0].clone())])
        }
    }

    struct SelectSumSecondColumn;
    impl crate::query::SelectExpr for SelectSumSecondColumn {
        fn evaluate(&self, star_fields: &[Value], _nr: u64) -> Result<Vec<EvalValue>, Error> {
            Ok(vec![
                EvalValue::Scalar(star_fields[0].clone()),
                EvalValue::Agg(AggregationToken {
                    aggregator_index: 0,
                    kind: AggKind::Sum,
                    contributed_value: star_fields[1].clone(),
                }),
            ])
        }

        fn functional_aggregator_count(&self) -> usize {
            1
        }
    }

    struct GroupByFirstColumn;
    impl crate::query::KeyExpr for GroupByFirstColumn {
        fn evaluate(&self, star_fields: &[Value], _nr: u64) -> Result<Vec<Value>, Error> {
            Ok(vec![star_fields[0].clone()])
        }
    }

    fn make_plan<'a>(
        where_expression: &'a dyn crate::query::WhereExpr,
        select_expression: &'a dyn crate::query::SelectExpr,
        aggregation_key_expression: Option<&'a dyn crate::query::KeyExpr>,
    ) -> QueryPlan<'a> {
        QueryPlan {
            where_expression,
            select_expression,
            update_statements: None,
            aggregation_key_expression,
            sort_key_expression: None,
            lhs_join_var: None,
            sort_flag: false,
            reverse_flag: false,
            top_count: None,
            is_select_query: true,
            writer_type: crate::query::WriterType::Simple,
            join_operation: crate::query::JoinOperation::Void,
        }
    }

    fn collecting_context() -> (ExecutionContext, Rc<RefCell<Vec<Vec<Value>>>>) {
        let collected = Rc::new(RefCell::new(Vec::new()));
        let collected_write = Rc::clone(&collected);
        let write_fn: Box<dyn FnMut(Vec<Value>) -> Result<bool, Error>> =
            Box::new(move |record| {
                collected_write.borrow_mut().push(record);
                Ok(true)
            });
        let write_fn = Box::leak(write_fn);
        let finish_fn: Box<dyn FnMut(&mut AfterFinish<'_>) -> Result<(), Error>> =
            Box::new(|cb: &mut AfterFinish<'_>| cb());
        let finish_fn = Box::leak(finish_fn);
        let sink = SinkWriter {
            write_fn,
            finish_fn,
        };
        let top = TopWriter::new(Box::new(sink), None);
        (ExecutionContext::new(Box::new(top)), collected)
    }

    #[test]
    fn select_with_where_filters_rows() {
        let (mut ctx, collected) = collecting_context();
        let where_expr = EqualsX;
        let select_expr = SelectFirstColumn;
        let plan = make_plan(&where_expr, &select_expr, None);
        let joiner = Joiner::Void;

        for (nr, (a1, a2)) in [(1, (1, "x")), (2, (2, "y")), (3, (3, "x"))].into_iter().enumerate() {
            let record = Record::new(vec![Value::Int(a1), Value::Str(a2.into())]);
            process_select(&mut ctx, &joiner, &plan, &record, nr as u64 + 1).unwrap();
        }

        assert_eq!(
            *collected.borrow(),
            vec![vec![Value::Int(1)], vec![Value::Int(3)]]
        );
    }

    #[test]
    fn sum_group_by_aggregates_across_rows() {
        let (mut ctx, collected) = collecting_context();
        let where_expr = AlwaysTrue;
        let select_expr = SelectSumSecondColumn;
        let group_expr = GroupByFirstColumn;
        let plan = make_plan(&where_expr, &select_expr, Some(&group_expr));
        let joiner = Joiner::Void;

        for (nr, (a1, a2)) in [("a", 1), ("b", 2), ("a", 3)].into_iter().enumerate() {
            let record = Record::new(vec![Value::Str(a1.into()), Value::Int(a2)]);
            process_select(&mut ctx, &joiner, &plan, &record, nr as u64 + 1).unwrap();
        }
        let mut noop = || Ok(());
        ctx.finish(&mut noop).unwrap();

        assert_eq!(
            *collected.borrow(),
            vec![
                vec![Value::Str("a".into()), Value::Float(4.0)],
                vec![Value::Str("b".into()), Value::Float(2.0)],
            ]
        );
    }

    struct SetSecondColumnToZ;
    impl crate::query::UpdateStmts for SetSecondColumnToZ {
        fn apply(&self, up_fields: &mut Record, nr: u64) -> Result<(), Error> {
            up_fields.safe_set(2, Value::Str("z".into()), nr)
        }
    }

    #[test]
    fn update_strict_modifies_matching_rows_only() {
        let (mut ctx, collected) = collecting_context();
        let where_expr = EqualsFirstColumnOne;
        let select_expr = SelectFirstColumn;
        let update_stmts = SetSecondColumnToZ;
        let mut plan = make_plan(&where_expr, &select_expr, None);
        plan.update_statements = Some(&update_stmts);
        let joiner = Joiner::Void;

        let rows = [(1, "a"), (2, "b"), (1, "c")];
        for (nr, (a1, a2)) in rows.into_iter().enumerate() {
            let record = Record::new(vec![Value::Int(a1), Value::Str(a2.into())]);
            process_update(&mut ctx, &joiner, &plan, &record, nr as u64 + 1).unwrap();
        }

        assert_eq!(
            *collected.borrow(),
            vec![
                vec![Value::Int(1), Value::Str("z".into())],
                vec![Value::Int(2), Value::Str("b".into())],
                vec![Value::Int(1), Value::Str("z".into())],
            ]
        );
        assert_eq!(ctx.nu(), 2);
    }

    struct EqualsFirstColumnOne;
    impl crate::query::WhereExpr for EqualsFirstColumnOne {
        fn evaluate(&self, star_fields: &[Value], _nr: u64) -> Result<bool, Error> {
            Ok(star_fields.first() == Some(&Value::Int(1)))
        }
    }
}
