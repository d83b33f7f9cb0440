//! Table output formatting

use tabled::{
    Table, Tabled,
    builder::Builder,
    settings::{Alignment, Modify, Style, object::Rows},
};

/// Format rows as a table
pub fn format_table<T: Tabled>(data: &[T]) -> String {
    if data.is_empty() {
        return "No results found.".to_string();
    }

    let mut table = Table::new(data);
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));

    table.to_string()
}

/// Format a single record as a two-column FIELD/VALUE table. Empty values
/// show as `-`.
pub fn format_detail(fields: &[(&str, Option<String>)]) -> String {
    let mut builder = Builder::default();
    builder.push_record(["FIELD", "VALUE"]);
    for (field, value) in fields {
        let value = value.as_deref().filter(|v| !v.is_empty()).unwrap_or("-");
        builder.push_record([*field, value]);
    }

    let mut table = builder.build();
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Tabled)]
    struct TestRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "NAME")]
        name: String,
    }

    #[test]
    fn test_format_table_empty() {
        let items: Vec<TestRow> = vec![];
        assert_eq!(format_table(&items), "No results found.");
    }

    #[test]
    fn test_format_table_rows() {
        let items = vec![
            TestRow {
                id: "1".to_string(),
                name: "First".to_string(),
            },
            TestRow {
                id: "2".to_string(),
                name: "Second".to_string(),
            },
        ];

        let result = format_table(&items);

        assert!(result.contains("ID"));
        assert!(result.contains("NAME"));
        assert!(result.contains("First"));
        assert!(result.contains("Second"));
        // Rounded style uses ╭ for top-left corner
        assert!(result.contains("╭"));
        assert!(result.contains("╰"));
    }

    #[test]
    fn test_format_detail() {
        let result = format_detail(&[
            ("Name", Some("app".to_string())),
            ("Description", None),
            ("Branch", Some(String::new())),
        ]);

        assert!(result.contains("FIELD"));
        assert!(result.contains("app"));
        assert!(result.contains("Description"));
        assert_eq!(result.matches(" - ").count(), 2);
    }
}
