//! Output formatters for fetched pages.

use std::collections::BTreeSet;

use clap::ValueEnum;
use comfy_table::Table;
use pagewise_core::paging::{PageLink, PagingStatsSnapshot};
use pagewise_core::storage::Entity;
use serde::Serialize;

use crate::loader::value_to_json;

/// Output format for pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format
    Table,
    /// JSON format
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// A fetched page and its surroundings.
#[derive(Debug, Serialize)]
pub struct PageView {
    /// Page number.
    pub page: usize,
    /// Total number of pages.
    pub page_count: usize,
    /// Records on the page.
    #[serde(serialize_with = "serialize_records")]
    pub records: Vec<Entity>,
    /// Navigation links.
    pub links: Vec<PageLink>,
    /// How the page was reached.
    pub stats: PagingStatsSnapshot,
}

fn serialize_records<S: serde::Serializer>(records: &[Entity], s: S) -> Result<S::Ok, S::Error> {
    let rows: Vec<serde_json::Value> = records.iter().map(entity_to_json).collect();
    rows.serialize(s)
}

fn entity_to_json(entity: &Entity) -> serde_json::Value {
    let mut obj = serde_json::Map::new();
    obj.insert("key".into(), serde_json::Value::String(entity.key().to_string()));
    for (name, value) in entity.fields() {
        obj.insert(name.clone(), value_to_json(value));
    }
    serde_json::Value::Object(obj)
}

/// Render a page in the requested format.
pub fn render(view: &PageView, format: OutputFormat) -> String {
    match format {
        OutputFormat::Table => render_table(view),
        OutputFormat::Json => {
            serde_json::to_string_pretty(view).unwrap_or_else(|_| "{}".to_string())
        }
    }
}

fn render_table(view: &PageView) -> String {
    let mut output = String::new();

    if view.records.is_empty() {
        output.push_str("No results");
    } else {
        let columns: BTreeSet<&str> = view
            .records
            .iter()
            .flat_map(|e| e.fields().iter().map(|(n, _)| n.as_str()))
            .collect();

        let mut table = Table::new();
        let mut header = vec!["key"];
        header.extend(columns.iter().copied());
        table.set_header(header);

        for entity in &view.records {
            let mut row = vec![entity.key().to_string()];
            for column in &columns {
                row.push(match entity.get(column) {
                    Some(value) => display_value(&value_to_json(value)),
                    None => String::new(),
                });
            }
            table.add_row(row);
        }
        output.push_str(&table.to_string());
    }

    output.push_str(&format!("\n\nPage {} of {}", view.page, view.page_count));
    if !view.links.is_empty() {
        let links: Vec<String> = view
            .links
            .iter()
            .map(|l| format!("{} <{}>", l.label, l.url))
            .collect();
        output.push('\n');
        output.push_str(&links.join(" | "));
    }
    output
}

fn display_value(json: &serde_json::Value) -> String {
    match json {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => "NULL".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewise_core::paging::page_links;
    use pagewise_proto::{Key, Value};

    fn view() -> PageView {
        PageView {
            page: 1,
            page_count: 2,
            records: vec![Entity::new(Key::new("Person", "alex"))
                .with("name", "Alex")
                .with("birthdate", Value::date(1978, 3, 9))],
            links: page_links(1, 2, "/people", "page", 10).unwrap(),
            stats: PagingStatsSnapshot::default(),
        }
    }

    #[test]
    fn test_table_output() {
        let out = render(&view(), OutputFormat::Table);
        assert!(out.contains("Person:alex"));
        assert!(out.contains("1978-03-09"));
        assert!(out.contains("Page 1 of 2"));
        assert!(out.contains("Last </people?page=2>"));
    }

    #[test]
    fn test_json_output() {
        let out = render(&view(), OutputFormat::Json);
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json["records"][0]["name"], "Alex");
        assert_eq!(json["links"][2]["kind"], "last");
        assert_eq!(json["stats"]["offset_queries"], 0);
    }
}
