use super::{Grammar, Sql};
use crate::builder::InsertRows;
use crate::schema::{ColumnDefault, ColumnType, StringLength};
use crate::Result;

// Largest value MySQL accepts for LIMIT, needed when only OFFSET is set
const MAX_LIMIT: &str = "18446744073709551615";

/// MySQL dialect
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlGrammar;

impl Grammar for MySqlGrammar {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn compile_limit_offset(&self, limit: Option<i64>, offset: Option<i64>, sql: &mut Sql) {
        match (limit, offset) {
            (Some(limit), _) => sql.push_str(&format!(" LIMIT {}", limit)),
            (None, Some(_)) => sql.push_str(&format!(" LIMIT {}", MAX_LIMIT)),
            (None, None) => {}
        }
        if let Some(offset) = offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }
    }

    /// MySQL has no `RETURNING`; each row is inserted on its own and read
    /// back through `LAST_INSERT_ID()` on the same connection.
    fn compile_insert_return(&self, table: &str, rows: &InsertRows) -> Result<Vec<Sql>> {
        let mut statements = Vec::with_capacity(rows.rows.len() * 2);
        for row in &rows.rows {
            let single = InsertRows {
                columns: rows.columns.clone(),
                rows: vec![row.clone()],
            };
            statements.push(self.compile_insert(table, &single)?);
            statements.push(Sql::raw(format!(
                "SELECT * FROM {} WHERE id = LAST_INSERT_ID()",
                table
            )));
        }
        Ok(statements)
    }

    fn compile_drop_index(&self, table: &str, index: &str) -> Sql {
        Sql::raw(format!("DROP INDEX {} ON {}", index, table))
    }

    fn column_type(&self, column_type: &ColumnType) -> String {
        match column_type {
            ColumnType::Bool => "boolean".to_string(),
            ColumnType::Date => "datetime".to_string(),
            ColumnType::Double => "double".to_string(),
            ColumnType::Increments => "serial".to_string(),
            ColumnType::Int => "int".to_string(),
            ColumnType::BigInt => "bigint".to_string(),
            ColumnType::Json => "json".to_string(),
            ColumnType::String(StringLength::Unlimited) => "text".to_string(),
            ColumnType::String(StringLength::Limit(characters)) => {
                format!("varchar({})", characters)
            }
            // no native uuid type
            ColumnType::Uuid => "varchar(36)".to_string(),
        }
    }

    fn unsigned_modifier(&self) -> Option<&'static str> {
        Some("UNSIGNED")
    }

    fn default_literal(&self, default: &ColumnDefault, column_type: &ColumnType) -> String {
        match default {
            // text (but not varchar) literals must be parenthesized
            ColumnDefault::Literal(value)
                if *column_type == ColumnType::String(StringLength::Unlimited) =>
            {
                format!("({})", value.literal())
            }
            ColumnDefault::Literal(value) => value.literal(),
            ColumnDefault::Expression(expression) => expression.clone(),
            ColumnDefault::Json(json) => self.json_literal(json),
        }
    }

    fn json_literal(&self, json: &str) -> String {
        format!("('{}')", json.replace('\'', "''"))
    }
}
