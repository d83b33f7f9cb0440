//! Output formatting for CLI results

use serde::Serialize;
use tabled::Tabled;

use crate::cli::OutputFormat;
use crate::error::Result;

pub mod json;
pub mod table;

/// Print a list as a table of `R` rows or as JSON
pub fn print_list<'a, T, R>(
    items: &'a [T],
    format: OutputFormat,
    to_row: impl Fn(&'a T) -> R,
) -> Result<()>
where
    T: Serialize,
    R: Tabled,
{
    let output = match format {
        OutputFormat::Table => {
            let rows: Vec<R> = items.iter().map(to_row).collect();
            table::format_table(&rows)
        }
        OutputFormat::Json => json::format_json_list(items)?,
    };
    println!("{}", output);
    Ok(())
}

/// Print one record as a FIELD/VALUE table or as JSON
pub fn print_detail<T: Serialize>(
    item: &T,
    format: OutputFormat,
    fields: &[(&str, Option<String>)],
) -> Result<()> {
    let output = match format {
        OutputFormat::Table => table::format_detail(fields),
        OutputFormat::Json => json::format_json(item)?,
    };
    println!("{}", output);
    Ok(())
}
