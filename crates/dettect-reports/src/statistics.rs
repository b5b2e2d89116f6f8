//! Knowledge base statistics, printed to the console

use std::fmt::Write as _;

use dettect_core::model::{SortKey, UpdateKind};
use dettect_store::knowledge::{KnowledgeBase, ObjectKind};

/// One counted row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountRow {
    pub name: String,
    pub count: usize,
}

fn sorted(mut rows: Vec<CountRow>) -> Vec<CountRow> {
    rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    rows
}

/// Number of techniques per ATT&CK data source, most used first
pub fn data_source_counts(kb: &KnowledgeBase) -> Vec<CountRow> {
    sorted(
        kb.techniques_by_data_source()
            .into_iter()
            .map(|(name, techniques)| CountRow {
                name,
                count: techniques.len(),
            })
            .collect(),
    )
}

/// Number of techniques per mitigation, most used first
pub fn mitigation_counts(kb: &KnowledgeBase) -> Vec<CountRow> {
    sorted(
        kb.objects(ObjectKind::Mitigation)
            .map(|m| CountRow {
                name: format!("{} {}", m.attack_id, m.name),
                count: kb.techniques_mitigated_by(m).len(),
            })
            .collect(),
    )
}

/// Render counted rows as an aligned table
pub fn render_counts(heading: &str, rows: &[CountRow]) -> String {
    let width = rows
        .iter()
        .map(|r| r.name.len())
        .max()
        .unwrap_or(0)
        .max(heading.len());
    let mut out = String::new();
    let _ = writeln!(out, "{:<width$} | Techniques", heading, width = width);
    let _ = writeln!(out, "{}", "-".repeat(width + 13));
    for row in rows {
        let _ = writeln!(out, "{:<width$} | {}", row.name, row.count, width = width);
    }
    let _ = writeln!(out, "{}", "-".repeat(width + 13));
    let total: usize = rows.iter().map(|r| r.count).sum();
    let _ = writeln!(out, "{:<width$} | {}", "Total", total, width = width);
    out
}

/// One line of the updates report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRow {
    pub date: String,
    pub attack_id: String,
    pub name: String,
}

/// Objects of one family sorted by creation or modification date, newest
/// first
pub fn updates(kb: &KnowledgeBase, kind: UpdateKind, sort: SortKey) -> Vec<UpdateRow> {
    let object_kind = match kind {
        UpdateKind::Techniques => ObjectKind::Technique,
        UpdateKind::Groups => ObjectKind::Group,
        UpdateKind::Software => ObjectKind::Software,
    };
    let mut rows: Vec<UpdateRow> = kb
        .objects(object_kind)
        .map(|o| {
            let stamp = match sort {
                SortKey::Created => &o.created,
                SortKey::Modified => &o.modified,
            };
            UpdateRow {
                date: stamp.get(..10).unwrap_or(stamp).to_string(),
                attack_id: o.attack_id.clone(),
                name: o.name.clone(),
            }
        })
        .collect();
    rows.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.attack_id.cmp(&b.attack_id)));
    rows
}

pub fn render_updates(kind: UpdateKind, sort: SortKey, rows: &[UpdateRow]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} sorted by {} date:", kind, sort);
    for row in rows {
        let _ = writeln!(out, "{}  {:<10} {}", row.date, row.attack_id, row.name);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_counts_totals() {
        let rows = sorted(vec![
            CountRow {
                name: "File Access".into(),
                count: 2,
            },
            CountRow {
                name: "Process Creation".into(),
                count: 5,
            },
        ]);
        assert_eq!(rows[0].name, "Process Creation");

        let table = render_counts("Data source", &rows);
        let lines: Vec<&str> = table.lines().collect();
        assert!(lines[0].starts_with("Data source"));
        assert!(lines[2].ends_with("| 5"));
        assert!(lines.last().unwrap().ends_with("| 7"));
    }

    #[test]
    fn test_updates_on_empty_knowledge_base() {
        let kb = KnowledgeBase::default();
        assert!(updates(&kb, UpdateKind::Groups, SortKey::Created).is_empty());
        assert_eq!(
            render_updates(UpdateKind::Groups, SortKey::Created, &[]),
            "groups sorted by created date:\n"
        );
    }
}
