//! Safe materialization of raw cells into their planned column kinds.
//!
//! No conversion failure ever escapes this module: a cell that cannot be
//! promoted to its planned kind becomes null, so an export never aborts
//! mid-table on bad data.

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

use crate::{
    parsers::{parse_date_flexible, parse_decimal_flexible},
    plan::TypingPlan,
    table::{ColumnKind, RawTable, TypedColumn, TypedTable},
    value::Value,
};

/// Rewrites `raw` into a [`TypedTable`] following `plan`.
///
/// Null input cells propagate as null regardless of target kind; everything
/// else is converted or degraded to null.
pub fn materialize(raw: &RawTable, plan: &TypingPlan) -> TypedTable {
    let columns = plan
        .columns
        .iter()
        .map(|column_plan| {
            let source = &raw.columns[column_plan.index];
            TypedColumn {
                name: source.name.clone(),
                system_name: source.system_name.clone(),
                kind: column_plan.resolved,
            }
        })
        .collect();

    let rows = raw
        .rows
        .iter()
        .map(|row| {
            plan.columns
                .iter()
                .map(|column_plan| {
                    row.get(column_plan.index)
                        .and_then(|cell| cell.as_ref())
                        .and_then(|value| convert(value, column_plan.resolved))
                })
                .collect()
        })
        .collect();

    TypedTable {
        name: raw.name.clone(),
        columns,
        rows,
    }
}

fn convert(value: &Value, kind: ColumnKind) -> Option<Value> {
    match kind {
        ColumnKind::Text => Some(Value::Text(value.as_invariant())),
        ColumnKind::DateTime => match value {
            Value::DateTime(dt) => Some(Value::DateTime(*dt)),
            Value::Date(d) => d.and_hms_opt(0, 0, 0).map(Value::DateTime),
            other => parse_date_flexible(&other.as_invariant()).map(Value::DateTime),
        },
        ColumnKind::Decimal => match value {
            Value::Decimal(d) => Some(Value::Decimal(*d)),
            Value::Integer(i) => Some(Value::Decimal(Decimal::from(*i))),
            Value::Float(f) => Decimal::from_f64(*f)
                .or_else(|| parse_decimal_flexible(&value.as_invariant()))
                .map(Value::Decimal),
            other => parse_decimal_flexible(&other.as_invariant()).map(Value::Decimal),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan;
    use crate::table::Column;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn single_column(name: &str, column: &str, values: Vec<Option<Value>>) -> RawTable {
        let mut table = RawTable::new(name, vec![Column::new(column)]);
        for value in values {
            table.push_row(vec![value]);
        }
        table
    }

    #[test]
    fn nulls_propagate_for_every_kind() {
        for (table, column) in [("doc", "A"), ("dc_orders", "DOCID"), ("other", "B")] {
            let raw = single_column(table, column, vec![None, None]);
            let typed = materialize(&raw, &plan::build(&raw, None));
            assert!(typed.rows.iter().all(|row| row[0].is_none()));
        }
    }

    #[test]
    fn leading_zeros_survive_text_materialization() {
        let raw = single_column(
            "dc_orders",
            "DOCID",
            vec![
                Some(Value::Text("000123".into())),
                Some(Value::Text("000987".into())),
            ],
        );
        let typed = materialize(&raw, &plan::build(&raw, None));
        assert_eq!(typed.columns[0].kind, ColumnKind::Text);
        assert_eq!(typed.rows[0][0], Some(Value::Text("000123".into())));
        assert_eq!(typed.rows[1][0], Some(Value::Text("000987".into())));
    }

    #[test]
    fn datetime_column_parses_text_and_nulls_garbage() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let mut raw = RawTable::new("x", vec![Column::new("D")]);
        raw.push_row(vec![Some(Value::DateTime(date.and_hms_opt(1, 2, 3).unwrap()))]);
        raw.push_row(vec![Some(Value::Date(date))]);
        raw.push_row(vec![Some(Value::Text("04.03.2024".into()))]);
        raw.push_row(vec![Some(Value::Text("garbage".into()))]);

        let mut typing = plan::build(&raw, None);
        typing.columns[0].resolved = ColumnKind::DateTime;
        let typed = materialize(&raw, &typing);

        assert_eq!(
            typed.rows[0][0],
            Some(Value::DateTime(date.and_hms_opt(1, 2, 3).unwrap()))
        );
        assert_eq!(
            typed.rows[1][0],
            Some(Value::DateTime(date.and_hms_opt(0, 0, 0).unwrap()))
        );
        assert_eq!(
            typed.rows[2][0],
            Some(Value::DateTime(date.and_hms_opt(0, 0, 0).unwrap()))
        );
        assert_eq!(typed.rows[3][0], None);
    }

    #[test]
    fn decimal_column_converts_native_and_grouped_text() {
        let mut raw = RawTable::new("x", vec![Column::new("AMOUNT")]);
        raw.push_row(vec![Some(Value::Text("12 345,10".into()))]);
        raw.push_row(vec![Some(Value::Integer(7))]);
        raw.push_row(vec![Some(Value::Float(2.5))]);
        raw.push_row(vec![Some(Value::Text("n/a".into()))]);

        let mut typing = plan::build(&raw, None);
        typing.columns[0].resolved = ColumnKind::Decimal;
        let typed = materialize(&raw, &typing);

        assert_eq!(
            typed.rows[0][0],
            Some(Value::Decimal(Decimal::from_str("12345.10").unwrap()))
        );
        assert_eq!(typed.rows[1][0], Some(Value::Decimal(Decimal::from(7))));
        assert_eq!(
            typed.rows[2][0],
            Some(Value::Decimal(Decimal::from_str("2.5").unwrap()))
        );
        assert_eq!(typed.rows[3][0], None);
    }

    #[test]
    fn shape_is_preserved() {
        let mut raw = RawTable::new("t", vec![Column::new("A"), Column::new("B")]);
        raw.push_row(vec![Some(Value::Text("1".into())), None]);
        raw.push_row(vec![None, Some(Value::Text("2".into()))]);
        let typed = materialize(&raw, &plan::build(&raw, None));
        assert_eq!(typed.columns.len(), 2);
        assert_eq!(typed.rows.len(), 2);
    }
}
