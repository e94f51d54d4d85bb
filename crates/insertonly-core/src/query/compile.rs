//! SQL text generation for query specifications.

use serde_json::Value;

use super::{ColumnRef, InsertSpec, Join, Predicate, Projection, SelectSpec, Source, Statement};
use crate::error::{InsertOnlyError, InsertOnlyResult};

/// Double-quote an identifier, doubling embedded quotes.
pub fn quote_ident(name: &str) -> InsertOnlyResult<String> {
    if name.trim().is_empty() || name.contains('\0') {
        return Err(InsertOnlyError::invalid_identifier(name));
    }
    Ok(format!("\"{}\"", name.replace('"', "\"\"")))
}

fn column_sql(column: &ColumnRef) -> InsertOnlyResult<String> {
    match &column.qualifier {
        Some(qualifier) => Ok(format!("{}.{}", quote_ident(qualifier)?, quote_ident(&column.name)?)),
        None => quote_ident(&column.name),
    }
}

fn source_sql(source: &Source) -> InsertOnlyResult<String> {
    match &source.alias {
        Some(alias) => Ok(format!("{} AS {}", quote_ident(&source.table)?, quote_ident(alias)?)),
        None => quote_ident(&source.table),
    }
}

fn projection_sql(projection: &Projection) -> InsertOnlyResult<String> {
    match projection {
        Projection::Column(column) if column.qualifier.is_some() => {
            Ok(format!("{} AS {}", column_sql(column)?, quote_ident(&column.name)?))
        }
        Projection::Column(column) => column_sql(column),
        Projection::Max(column) => Ok(format!("MAX({})", column_sql(column)?)),
    }
}

fn join_sql(join: &Join) -> InsertOnlyResult<String> {
    if join.on.is_empty() {
        return Err(InsertOnlyError::malformed_query(format!(
            "join on '{}' has no condition",
            join.source.table
        )));
    }
    let conditions = join
        .on
        .iter()
        .map(|(left, right)| Ok(format!("{} = {}", column_sql(left)?, column_sql(right)?)))
        .collect::<InsertOnlyResult<Vec<_>>>()?;
    Ok(format!(" INNER JOIN {} ON {}", source_sql(&join.source)?, conditions.join(" AND ")))
}

fn predicate_sql(predicate: &Predicate, params: &mut Vec<Value>) -> InsertOnlyResult<String> {
    match predicate {
        Predicate::Eq(column, Value::Null) => Ok(format!("{} IS NULL", column_sql(column)?)),
        Predicate::Eq(column, value) => {
            params.push(value.clone());
            Ok(format!("{} = ?", column_sql(column)?))
        }
        Predicate::In(_, values) if values.is_empty() => Ok("0 = 1".to_string()),
        Predicate::In(column, values) => {
            params.extend(values.iter().cloned());
            let placeholders = vec!["?"; values.len()].join(", ");
            Ok(format!("{} IN ({})", column_sql(column)?, placeholders))
        }
        Predicate::InSubquery(column, subquery) => {
            let inner = select_sql(subquery, params)?;
            Ok(format!("{} IN ({})", column_sql(column)?, inner))
        }
        Predicate::IsFalse(column) => Ok(format!("COALESCE({}, 0) = 0", column_sql(column)?)),
    }
}

fn select_sql(spec: &SelectSpec, params: &mut Vec<Value>) -> InsertOnlyResult<String> {
    if spec.projection.is_empty() {
        return Err(InsertOnlyError::malformed_query(format!(
            "select from '{}' projects no columns",
            spec.source.table
        )));
    }

    let projection = spec
        .projection
        .iter()
        .map(projection_sql)
        .collect::<InsertOnlyResult<Vec<_>>>()?;
    let mut sql = format!("SELECT {} FROM {}", projection.join(", "), source_sql(&spec.source)?);

    for join in &spec.joins {
        sql.push_str(&join_sql(join)?);
    }

    if !spec.predicates.is_empty() {
        let predicates = spec
            .predicates
            .iter()
            .map(|p| predicate_sql(p, params))
            .collect::<InsertOnlyResult<Vec<_>>>()?;
        sql.push_str(" WHERE ");
        sql.push_str(&predicates.join(" AND "));
    }

    if !spec.group_by.is_empty() {
        let columns = spec
            .group_by
            .iter()
            .map(column_sql)
            .collect::<InsertOnlyResult<Vec<_>>>()?;
        sql.push_str(" GROUP BY ");
        sql.push_str(&columns.join(", "));
    }

    if !spec.order_by.is_empty() {
        let keys = spec
            .order_by
            .iter()
            .map(|(column, order)| Ok(format!("{} {}", column_sql(column)?, order.as_sql())))
            .collect::<InsertOnlyResult<Vec<_>>>()?;
        sql.push_str(" ORDER BY ");
        sql.push_str(&keys.join(", "));
    }

    match (spec.limit, spec.offset) {
        (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset)),
        (Some(limit), None) => sql.push_str(&format!(" LIMIT {}", limit)),
        // SQLite only accepts OFFSET after a LIMIT
        (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {}", offset)),
        (None, None) => {}
    }

    Ok(sql)
}

/// Compile a SELECT specification.
pub fn compile_select(spec: &SelectSpec) -> InsertOnlyResult<Statement> {
    let mut params = Vec::new();
    let sql = select_sql(spec, &mut params)?;
    Ok(Statement {
        sql,
        params,
        binary_params: Vec::new(),
    })
}

/// Compile an INSERT specification.
pub fn compile_insert(spec: &InsertSpec) -> InsertOnlyResult<Statement> {
    let table = quote_ident(&spec.table)?;

    if spec.values.is_empty() {
        return Ok(Statement {
            sql: format!("INSERT INTO {} DEFAULT VALUES", table),
            params: Vec::new(),
            binary_params: Vec::new(),
        });
    }

    let columns = spec
        .values
        .keys()
        .map(|name| quote_ident(name))
        .collect::<InsertOnlyResult<Vec<_>>>()?;
    let placeholders = vec!["?"; columns.len()].join(", ");
    let binary_params = spec
        .values
        .keys()
        .enumerate()
        .filter(|(_, name)| spec.binary_columns.iter().any(|c| c == *name))
        .map(|(index, _)| index)
        .collect();

    Ok(Statement {
        sql: format!("INSERT INTO {} ({}) VALUES ({})", table, columns.join(", "), placeholders),
        params: spec.values.values().cloned().collect(),
        binary_params,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::query::Order;
    use crate::types::record_from_value;
    use serde_json::json;

    fn latest_ids(table: &str) -> SelectSpec {
        SelectSpec::from(Source::table(table))
            .project(Projection::Max(ColumnRef::new("id")))
            .group_by(ColumnRef::new("uuid"))
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("teams").unwrap(), "\"teams\"");
        assert_eq!(quote_ident("we\"ird").unwrap(), "\"we\"\"ird\"");
        assert!(quote_ident("").is_err());
        assert!(quote_ident("  ").is_err());
        assert!(quote_ident("a\0b").is_err());
    }

    #[test]
    fn test_fetch_latest_by_equality() {
        let criteria = record_from_value(json!({"uuid": "u-1"})).unwrap();
        let spec = SelectSpec::from(Source::table("players"))
            .columns(None, ["uuid", "deleted", "name"])
            .filter_eq(None, &criteria)
            .order_by(ColumnRef::new("id"), Order::Desc)
            .limit(1);

        let stmt = compile_select(&spec).unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT \"uuid\", \"deleted\", \"name\" FROM \"players\" WHERE \"uuid\" = ? ORDER BY \"id\" DESC LIMIT 1"
        );
        assert_eq!(stmt.params, vec![json!("u-1")]);
    }

    #[test]
    fn test_current_rows_subquery() {
        let spec = SelectSpec::from(Source::table("players"))
            .columns(None, ["uuid", "deleted"])
            .filter(Predicate::InSubquery(ColumnRef::new("id"), Box::new(latest_ids("players"))))
            .filter(Predicate::IsFalse(ColumnRef::new("deleted")))
            .order_by(ColumnRef::new("uuid"), Order::Asc);

        let stmt = compile_select(&spec).unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT \"uuid\", \"deleted\" FROM \"players\" WHERE \"id\" IN \
             (SELECT MAX(\"id\") FROM \"players\" GROUP BY \"uuid\") \
             AND COALESCE(\"deleted\", 0) = 0 ORDER BY \"uuid\" ASC"
        );
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn test_join_with_aliases_and_param_order() {
        let spec = SelectSpec::from(Source::aliased("players", "i"))
            .columns(Some("i"), ["uuid"])
            .join(Join {
                source: Source::aliased("teams_players", "j"),
                on: vec![(
                    ColumnRef::qualified("j", "player_uuid"),
                    ColumnRef::qualified("i", "uuid"),
                )],
            })
            .filter(Predicate::Eq(ColumnRef::qualified("i", "name"), json!("Ana")))
            .filter(Predicate::In(
                ColumnRef::qualified("j", "team_uuid"),
                vec![json!("t1"), json!("t2")],
            ));

        let stmt = compile_select(&spec).unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT \"i\".\"uuid\" AS \"uuid\" FROM \"players\" AS \"i\" \
             INNER JOIN \"teams_players\" AS \"j\" ON \"j\".\"player_uuid\" = \"i\".\"uuid\" \
             WHERE \"i\".\"name\" = ? AND \"j\".\"team_uuid\" IN (?, ?)"
        );
        assert_eq!(stmt.params, vec![json!("Ana"), json!("t1"), json!("t2")]);
    }

    #[test]
    fn test_null_and_empty_in_predicates() {
        let spec = SelectSpec::from(Source::table("t"))
            .columns(None, ["a"])
            .filter(Predicate::Eq(ColumnRef::new("b"), serde_json::Value::Null))
            .filter(Predicate::In(ColumnRef::new("c"), vec![]));

        let stmt = compile_select(&spec).unwrap();
        assert_eq!(stmt.sql, "SELECT \"a\" FROM \"t\" WHERE \"b\" IS NULL AND 0 = 1");
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn test_offset_without_limit() {
        let spec = SelectSpec::from(Source::table("t")).columns(None, ["a"]).offset(5);
        assert_eq!(compile_select(&spec).unwrap().sql, "SELECT \"a\" FROM \"t\" LIMIT -1 OFFSET 5");

        let spec = spec.limit(2);
        assert_eq!(compile_select(&spec).unwrap().sql, "SELECT \"a\" FROM \"t\" LIMIT 2 OFFSET 5");
    }

    #[test]
    fn test_empty_projection_rejected() {
        let spec = SelectSpec::from(Source::table("t"));
        let err = compile_select(&spec).unwrap_err();
        assert_eq!(err.code(), ErrorCode::QueryMalformed);
    }

    #[test]
    fn test_join_without_condition_rejected() {
        let spec = SelectSpec::from(Source::aliased("players", "i"))
            .columns(Some("i"), ["uuid"])
            .join(Join {
                source: Source::aliased("teams_players", "j"),
                on: vec![],
            });
        let err = compile_select(&spec).unwrap_err();
        assert_eq!(err.code(), ErrorCode::QueryMalformed);
        assert_ne!(err.code(), ErrorCode::ValInvalidIdentifier);
    }

    #[test]
    fn test_compile_insert() {
        let values = record_from_value(json!({"uuid": "u-1", "deleted": false, "name": "Ana"})).unwrap();
        let stmt = compile_insert(&InsertSpec::new("players", values)).unwrap();
        assert_eq!(
            stmt.sql,
            "INSERT INTO \"players\" (\"deleted\", \"name\", \"uuid\") VALUES (?, ?, ?)"
        );
        assert_eq!(stmt.params, vec![json!(false), json!("Ana"), json!("u-1")]);

        assert!(stmt.binary_params.is_empty());

        let stmt = compile_insert(&InsertSpec::new("players", Default::default())).unwrap();
        assert_eq!(stmt.sql, "INSERT INTO \"players\" DEFAULT VALUES");
    }

    #[test]
    fn test_compile_insert_marks_binary_params() {
        let values = record_from_value(json!({"avatar": [1, 255], "name": "Ana", "uuid": "u-1"})).unwrap();
        let spec = InsertSpec::new("players", values).binary_columns(["avatar", "missing"]);
        let stmt = compile_insert(&spec).unwrap();
        assert_eq!(stmt.binary_params, vec![0]);
        assert_eq!(stmt.params[0], json!([1, 255]));
    }
}
