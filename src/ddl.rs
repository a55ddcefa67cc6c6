//! Read-only `CREATE TABLE` preview for a loaded table.

use crate::graph::parse_reference;
use crate::schema::Table;

/// Format a table as a `CREATE TABLE` statement.
pub fn create_table(table: &Table) -> String {
    let mut output = String::new();

    if let Some(description) = table.description.as_deref() {
        for line in description.lines() {
            output.push_str("-- ");
            output.push_str(line.trim_end());
            output.push('\n');
        }
    }

    output.push_str(&format!(
        "CREATE TABLE {}.{} (\n",
        quote_ident(&table.schema),
        quote_ident(&table.name)
    ));

    let mut lines: Vec<String> = table
        .columns
        .iter()
        .map(|c| {
            let typ = if c.typ.trim().is_empty() { "text" } else { c.typ.trim() };
            if c.is_primary_key {
                format!("{} {} NOT NULL", quote_ident(&c.name), typ)
            } else {
                format!("{} {}", quote_ident(&c.name), typ)
            }
        })
        .collect();

    let pk: Vec<String> = table
        .columns
        .iter()
        .filter(|c| c.is_primary_key)
        .map(|c| quote_ident(&c.name))
        .collect();
    if !pk.is_empty() {
        lines.push(format!("PRIMARY KEY ({})", pk.join(", ")));
    }

    for column in &table.columns {
        let Some(reference) = column.references.as_deref() else {
            continue;
        };
        // Unresolvable references are left out of the preview
        let Some(target) = parse_reference(table, reference) else {
            continue;
        };
        lines.push(format!(
            "FOREIGN KEY ({}) REFERENCES {}.{} ({})",
            quote_ident(&column.name),
            quote_ident(&target.schema),
            quote_ident(&target.table),
            quote_ident(&target.column)
        ));
    }

    for (i, line) in lines.iter().enumerate() {
        output.push_str("    ");
        output.push_str(line);
        if i + 1 < lines.len() {
            output.push(',');
        }
        output.push('\n');
    }
    output.push_str(");\n");
    output
}

/// Quote an identifier unless it is a plain lowercase name.
fn quote_ident(ident: &str) -> String {
    let plain = !ident.is_empty()
        && ident
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_lowercase() || c == '_')
        && ident
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if plain {
        ident.to_string()
    } else {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }
}
