//! CSV serialization of tables.

use crate::table::Table;
use std::io::Write;

/// Writes the header and every row of a table.
pub fn write_csv<W: Write>(table: &Table, out: W) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(table.columns())?;
    for row in table.rows() {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Entity;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_header_and_quoting() {
        let mut table = Table::new("org_repositories", &["name", "description"]);
        let entities = vec![
            Entity::from_value(json!({"name": "widgets", "description": "Fast, small"})).unwrap(),
            Entity::from_value(json!({"name": "gadgets"})).unwrap(),
        ];
        table.extend(&entities);

        let mut buffer = Vec::new();
        write_csv(&table, &mut buffer).unwrap();

        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "name,description\nwidgets,\"Fast, small\"\ngadgets,\n"
        );
    }

    #[test]
    fn test_empty_table_has_header_only() {
        let table = Table::new("members_info", &["organization", "login"]);
        let mut buffer = Vec::new();
        write_csv(&table, &mut buffer).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), "organization,login\n");
    }
}
