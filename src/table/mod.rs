//! Projection of tagged entities onto fixed column sets.

use crate::types::{Entity, FieldRef};
use serde_json::Value;

/// A named table with a fixed header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Creates an empty table.
    pub fn new(name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Projects entities and appends the rows.
    pub fn extend<'a, I>(&mut self, entities: I)
    where
        I: IntoIterator<Item = &'a Entity>,
    {
        let columns: Vec<&str> = self.columns.iter().map(String::as_str).collect();
        let rows: Vec<Vec<String>> = entities.into_iter().map(|e| project_row(e, &columns)).collect();
        self.rows.extend(rows);
    }

    /// Gets the table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the header.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Gets the rows.
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Gets one cell by row and column name.
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.get(col).map(String::as_str)
    }
}

/// Projects entities onto `columns`, one row per entity.
///
/// Missing fields render empty and fields not listed are dropped.
pub fn project<'a, I>(entities: I, columns: &[&str]) -> Vec<Vec<String>>
where
    I: IntoIterator<Item = &'a Entity>,
{
    entities
        .into_iter()
        .map(|entity| project_row(entity, columns))
        .collect()
}

fn project_row(entity: &Entity, columns: &[&str]) -> Vec<String> {
    columns
        .iter()
        .map(|column| match entity.get(column) {
            Some(FieldRef::Tag(tag)) => tag.to_string(),
            Some(FieldRef::Source(value)) => render(value),
            None => String::new(),
        })
        .collect()
}

/// Renders one JSON value as a cell.
pub fn render(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        nested => nested.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Context, ORGANIZATION};
    use crate::tagging;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use test_case::test_case;

    #[test_case(json!("Rust"), "Rust" ; "string")]
    #[test_case(json!(42), "42" ; "integer")]
    #[test_case(json!(1.5), "1.5" ; "float")]
    #[test_case(json!(true), "true" ; "bool true")]
    #[test_case(json!(false), "false" ; "bool false")]
    #[test_case(json!(null), "" ; "null")]
    #[test_case(json!({"login": "acme"}), r#"{"login":"acme"}"# ; "object")]
    #[test_case(json!([1, 2]), "[1,2]" ; "array")]
    fn test_render(value: Value, expected: &str) {
        assert_eq!(render(&value), expected);
    }

    #[test]
    fn test_project_missing_and_extra_fields() {
        let entities = vec![
            Entity::from_value(json!({"name": "widgets", "fork": false, "secret": "x"})).unwrap(),
            Entity::from_value(json!({"name": "gadgets", "language": null})).unwrap(),
        ];
        let rows = project(&entities, &["name", "language", "fork"]);

        assert_eq!(
            rows,
            vec![
                vec!["widgets".to_string(), String::new(), "false".to_string()],
                vec!["gadgets".to_string(), String::new(), String::new()],
            ]
        );
    }

    #[test]
    fn test_project_reads_tags_before_source() {
        let entity = Entity::from_value(json!({"organization": {"login": "upstream"}, "name": "w"})).unwrap();
        let tagged = tagging::tag(vec![entity], &Context::organization("acme"));

        let rows = project(&tagged, &[ORGANIZATION, "name"]);
        assert_eq!(rows, vec![vec!["acme".to_string(), "w".to_string()]]);
    }

    #[test]
    fn test_table_accumulates_rows() {
        let mut table = Table::new("members", &["login"]);
        let first = vec![Entity::from_value(json!({"login": "alice"})).unwrap()];
        let second = vec![Entity::from_value(json!({"login": "bob"})).unwrap()];
        table.extend(&first);
        table.extend(&second);

        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(1, "login"), Some("bob"));
        assert_eq!(table.cell(0, "missing"), None);
        assert_eq!(table.columns(), &["login".to_string()]);
    }
}
