use super::Grammar;

/// PostgreSQL dialect: numbered `$n` placeholders and `RETURNING *` on
/// every data modifying statement.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresGrammar;

impl Grammar for PostgresGrammar {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn position_bindings(&self, sql: &str) -> String {
        renumber_placeholders(sql)
    }

    fn returns_modified_rows(&self) -> bool {
        true
    }
}

/// Replace every `?` outside single-quoted literals with `$1..$n`, left to
/// right.
///
/// Text without `?` tokens is returned unchanged, so renumbering an already
/// renumbered statement is a no-op.
///
/// # Examples
/// ```
/// use quarry_core::grammar::renumber_placeholders;
///
/// let sql = renumber_placeholders("SELECT * FROM t WHERE a = ? AND b = '?' AND c = ?");
/// assert_eq!(sql, "SELECT * FROM t WHERE a = $1 AND b = '?' AND c = $2");
/// ```
pub fn renumber_placeholders(sql: &str) -> String {
    let mut output = String::with_capacity(sql.len() + 8);
    let mut in_literal = false;
    let mut position = 0;
    for ch in sql.chars() {
        match ch {
            '\'' => {
                in_literal = !in_literal;
                output.push(ch);
            }
            '?' if !in_literal => {
                position += 1;
                output.push('$');
                output.push_str(&position.to_string());
            }
            _ => output.push(ch),
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{InsertRows, QueryParts};
    use crate::predicate::{value_predicate, Connector};
    use crate::schema::{ColumnConstraint, ColumnType, CreateColumn};
    use crate::Value;
    use proptest::prelude::*;

    #[test]
    fn test_positions() {
        assert_eq!(
            renumber_placeholders("INSERT INTO t (a, b) VALUES (?, ?), (?, ?)"),
            "INSERT INTO t (a, b) VALUES ($1, $2), ($3, $4)"
        );
        assert_eq!(renumber_placeholders("SELECT 1"), "SELECT 1");
        assert_eq!(
            renumber_placeholders("name = 'who''s ?' AND id = ?"),
            "name = 'who''s ?' AND id = $1"
        );
    }

    #[test]
    fn test_update_and_delete_return_rows() {
        let mut query = QueryParts::new("users");
        query.wheres.push(value_predicate(("id", 1), Connector::And));

        let update = PostgresGrammar
            .compile_update(&query, &[("name".to_string(), Value::from("x"))])
            .unwrap();
        assert_eq!(
            update.sql(),
            "UPDATE users SET name = ? WHERE id = ? RETURNING *"
        );
        assert_eq!(
            PostgresGrammar.position_bindings(update.sql()),
            "UPDATE users SET name = $1 WHERE id = $2 RETURNING *"
        );

        let delete = PostgresGrammar.compile_delete(&query).unwrap();
        assert_eq!(delete.sql(), "DELETE FROM users WHERE id = ? RETURNING *");
    }

    #[test]
    fn test_insert_return() {
        let rows = InsertRows::from_rows(vec![vec![("name", Value::from("a"))]]).unwrap();
        let statements = PostgresGrammar.compile_insert_return("users", &rows).unwrap();
        assert_eq!(statements.len(), 1);
        assert_eq!(
            statements[0].sql(),
            "INSERT INTO users (name) VALUES (?) RETURNING *"
        );
    }

    #[test]
    fn test_unsigned_is_ignored() {
        let column = CreateColumn::new("age", ColumnType::Int).with(ColumnConstraint::Unsigned);
        let (definition, _) = PostgresGrammar.compile_column(&column).unwrap();
        assert_eq!(definition, "age int");
    }

    proptest! {
        #[test]
        fn renumbering_is_idempotent(parts in prop::collection::vec("[a-z =']{0,6}", 1..12)) {
            let sql = parts.join("?");
            let once = renumber_placeholders(&sql);
            let twice = renumber_placeholders(&once);
            prop_assert_eq!(&once, &twice);
            prop_assert_eq!(super::super::count_placeholders(&once), 0);
        }

        #[test]
        fn renumbering_is_sequential(count in 0usize..40) {
            let sql = vec!["?"; count].join(", ");
            let renumbered = renumber_placeholders(&sql);
            let expected: Vec<String> = (1..=count).map(|n| format!("${}", n)).collect();
            prop_assert_eq!(renumbered, expected.join(", "));
        }
    }
}
