//! Retained-mode row model
//!
//! Records in the visible slice are mapped to rows of display cells and
//! reconciled into a [`ListView`] keyed by record id. Rows that did not change
//! are left alone, so whatever is attached to a row key (actions, selection)
//! survives re-rendering.

use chrono::{DateTime, Utc};
use melodex_common::Record;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Placeholder for missing values
pub const MISSING: &str = "-";

/// Visual weight of a status badge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Neutral,
    Good,
    Warn,
    Bad,
}

/// Label for one value of a small-integer status field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusLabel {
    pub value: i64,
    pub label: &'static str,
    pub tone: Tone,
}

impl StatusLabel {
    pub const fn new(value: i64, label: &'static str, tone: Tone) -> Self {
        Self { value, label, tone }
    }
}

/// How a column turns a field into a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    /// Cut at `max_chars` characters with a `...` suffix
    Truncated { max_chars: usize },
    Status(&'static [StatusLabel]),
    /// Media path, falling back to a default asset
    Media { default_asset: &'static str },
    /// Epoch milliseconds or date string
    Timestamp,
    IdList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub title: &'static str,
    pub field: &'static str,
    pub kind: ColumnKind,
}

impl Column {
    pub const fn new(title: &'static str, field: &'static str, kind: ColumnKind) -> Self {
        Self { title, field, kind }
    }
}

/// One rendered value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Cell {
    Text(String),
    Badge { label: String, tone: Tone },
    Media(String),
}

impl Cell {
    pub fn text(&self) -> &str {
        match self {
            Cell::Text(s) | Cell::Media(s) => s,
            Cell::Badge { label, .. } => label,
        }
    }
}

/// Stable identity of a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RowKey {
    Id(i64),
    /// Records without a usable id, keyed by absolute list position
    Position(u64),
}

impl RowKey {
    pub fn id(&self) -> Option<i64> {
        match self {
            RowKey::Id(id) => Some(*id),
            RowKey::Position(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowView {
    pub key: RowKey,
    pub selected: bool,
    pub cells: Vec<Cell>,
}

/// What a reconcile pass changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderDiff {
    pub inserted: Vec<RowKey>,
    pub updated: Vec<RowKey>,
    pub removed: Vec<RowKey>,
    pub unchanged: usize,
}

impl RenderDiff {
    pub fn is_noop(&self) -> bool {
        self.inserted.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

/// Rows currently on screen
#[derive(Debug, Clone, Default)]
pub struct ListView {
    rows: Vec<RowView>,
}

impl ListView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[RowView] {
        &self.rows
    }

    pub fn row(&self, key: RowKey) -> Option<&RowView> {
        self.rows.iter().find(|r| r.key == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = RowKey> + '_ {
        self.rows.iter().map(|r| r.key)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Replace the displayed rows with `next`, reporting per-key changes
    pub fn reconcile(&mut self, next: Vec<RowView>) -> RenderDiff {
        let mut diff = RenderDiff::default();
        let mut previous: HashMap<RowKey, RowView> =
            self.rows.drain(..).map(|r| (r.key, r)).collect();

        for row in &next {
            match previous.remove(&row.key) {
                Some(old) if old == *row => diff.unchanged += 1,
                Some(_) => diff.updated.push(row.key),
                None => diff.inserted.push(row.key),
            }
        }
        let mut removed: Vec<RowKey> = previous.into_keys().collect();
        removed.sort();
        diff.removed = removed;

        self.rows = next;
        diff
    }

    pub fn clear(&mut self) -> RenderDiff {
        self.reconcile(Vec::new())
    }

    /// Plain-text table with a selection column
    pub fn to_table(&self, columns: &[Column]) -> String {
        let mut header: Vec<String> = vec![" ".to_string()];
        header.extend(columns.iter().map(|c| c.title.to_string()));

        let body: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| {
                let mut line = vec![if row.selected { "x" } else { " " }.to_string()];
                line.extend(row.cells.iter().map(|c| c.text().to_string()));
                line
            })
            .collect();

        let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
        for line in &body {
            for (i, cell) in line.iter().enumerate() {
                if let Some(w) = widths.get_mut(i) {
                    *w = (*w).max(cell.chars().count());
                }
            }
        }

        let format_line = |cells: &[String]| -> String {
            cells
                .iter()
                .zip(&widths)
                .map(|(cell, w)| format!("{:<width$}", cell, width = *w))
                .collect::<Vec<_>>()
                .join(" | ")
                .trim_end()
                .to_string()
        };

        let mut out = String::new();
        out.push_str(&format_line(&header));
        out.push('\n');
        out.push_str(
            &widths
                .iter()
                .map(|w| "-".repeat(*w))
                .collect::<Vec<_>>()
                .join("-+-"),
        );
        out.push('\n');
        for line in &body {
            out.push_str(&format_line(line));
            out.push('\n');
        }
        out
    }
}

/// Map the visible slice to rows
///
/// `offset` is the absolute position of the first record, used to key
/// records that have no id (or repeat an id already on the page).
pub fn build_rows(
    visible: &[Record],
    columns: &[Column],
    selection: &BTreeSet<i64>,
    offset: u64,
) -> Vec<RowView> {
    let mut seen = HashSet::new();
    visible
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let key = match record.id() {
                Some(id) if seen.insert(id) => RowKey::Id(id),
                _ => RowKey::Position(offset + i as u64),
            };
            RowView {
                key,
                selected: key.id().map(|id| selection.contains(&id)).unwrap_or(false),
                cells: columns.iter().map(|c| render_cell(record, c)).collect(),
            }
        })
        .collect()
}

/// Render one field; never fails, every miss has a fallback
pub fn render_cell(record: &Record, column: &Column) -> Cell {
    match column.kind {
        ColumnKind::Text => Cell::Text(text_or_missing(record, column.field)),
        ColumnKind::Truncated { max_chars } => {
            Cell::Text(truncate(&text_or_missing(record, column.field), max_chars))
        }
        ColumnKind::Status(labels) => match record.get_i64(column.field) {
            Some(value) => match labels.iter().find(|l| l.value == value) {
                Some(l) => Cell::Badge {
                    label: l.label.to_string(),
                    tone: l.tone,
                },
                None => Cell::Badge {
                    label: format!("Unknown ({})", value),
                    tone: Tone::Neutral,
                },
            },
            None => Cell::Badge {
                label: MISSING.to_string(),
                tone: Tone::Neutral,
            },
        },
        ColumnKind::Media { default_asset } => Cell::Media(
            record
                .get_str(column.field)
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| default_asset.to_string()),
        ),
        ColumnKind::Timestamp => Cell::Text(
            record
                .get(column.field)
                .map(format_timestamp)
                .unwrap_or_else(|| MISSING.to_string()),
        ),
        ColumnKind::IdList => Cell::Text(
            record
                .get_id_list(column.field)
                .filter(|ids| !ids.is_empty())
                .map(|ids| {
                    ids.iter()
                        .map(i64::to_string)
                        .collect::<Vec<_>>()
                        .join(",")
                })
                .unwrap_or_else(|| MISSING.to_string()),
        ),
    }
}

fn text_or_missing(record: &Record, field: &str) -> String {
    record
        .get_str(field)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| MISSING.to_string())
}

/// Cut `text` to `max_chars` characters, marking the cut with `...`
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars).collect();
    format!("{}...", kept)
}

fn format_timestamp(value: &Value) -> String {
    match value {
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| n.to_string()),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc).format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|_| s.clone()),
        _ => MISSING.to_string(),
    }
}
