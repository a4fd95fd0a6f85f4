//! # Table and Grouping Engine
//!
//! Turns a table declaration into the flat block sequence the pagination
//! engine streams across pages: group headers, rows and group footers in
//! group-key order, recursing through the group chain. Column titles and
//! the per-page header/footer builders become repeat-on-page ornaments, so
//! they re-enter the pagination engine like ordinary content and take part
//! in page-break decisions.

use std::rc::Rc;

use crate::env::Environment;
use crate::model::{Block, GroupOrder, Row, Spacing, TableDef, TableGroup};
use crate::style::Font;

use super::wrap::{PageBlockBuilder, PageOrnament};

/// Vertical gap between consecutive table items.
pub const ROW_SPACING: f64 = 2.0;

/// The flat, ordered item sequence for a table: group headers, row blocks
/// and group footers, recursing through the group chain outermost-first.
pub fn row_items(def: &TableDef) -> Vec<Block> {
    let mut out = Vec::with_capacity(def.rows.len());
    emit_groups(def, &def.groups, &def.rows, &mut out);
    out
}

fn emit_groups(def: &TableDef, groups: &[TableGroup], rows: &[Row], out: &mut Vec<Block>) {
    let Some((group, rest)) = groups.split_first() else {
        out.extend(rows.iter().map(|r| row_block(def, r)));
        return;
    };

    // Distinct keys, ordered by the group's comparator. Rows keep their
    // input order within a key.
    let mut keys: Vec<String> = Vec::new();
    for row in rows {
        let key = (group.key)(row);
        if !keys.contains(&key) {
            keys.push(key);
        }
    }
    keys.sort();
    if group.order == GroupOrder::Descending {
        keys.reverse();
    }

    for key in keys {
        let group_rows: Vec<Row> = rows
            .iter()
            .filter(|r| (group.key)(r) == key)
            .cloned()
            .collect();
        if let Some(header) = &group.header {
            out.push(header(&key));
        }
        emit_groups(def, rest, &group_rows, out);
        if let Some(footer) = &group.footer {
            out.push(footer(&key, &group_rows));
        }
    }
}

/// One data row as a block: a horizontal stack of cell texts, each taking
/// its column's proportional width and alignment.
fn row_block(def: &TableDef, row: &Row) -> Block {
    if let Some(builder) = &def.row_builder {
        return builder(row);
    }
    let cells = def
        .columns
        .iter()
        .enumerate()
        .map(|(i, column)| {
            let alignment = column.alignment;
            Block::text(row.get(i).cloned().unwrap_or_default())
                .modified(move |e| e.text_alignment = alignment)
                .proportional(column.width)
        })
        .collect();
    Block::hstack(cells, Spacing::Fixed(6.0))
}

/// The column-title row, bold, in column order.
pub fn titles_row(def: &TableDef) -> Block {
    let cells = def
        .columns
        .iter()
        .map(|column| {
            let alignment = column.alignment;
            Block::text(column.title.clone())
                .modified(move |e| {
                    e.text_alignment = alignment;
                    e.font = Font {
                        weight: 700,
                        ..e.font.clone()
                    };
                })
                .proportional(column.width)
        })
        .collect();
    Block::hstack(cells, Spacing::Fixed(6.0))
}

/// The repeat-on-page content for this table: the page-header builder and
/// the column titles at the top, the page-footer builder at the bottom.
pub fn ornament(def: &TableDef) -> Option<PageOrnament> {
    let titles = (def.show_column_titles && !def.columns.is_empty()).then(|| titles_row(def));
    let page_header = def.page_header.clone();
    let page_footer = def.page_footer.clone();

    if titles.is_none() && page_header.is_none() && page_footer.is_none() {
        return None;
    }

    let header: Option<PageBlockBuilder> = if titles.is_some() || page_header.is_some() {
        Some(Rc::new(move |page| {
            let mut parts = Vec::new();
            if let Some(build) = &page_header {
                parts.push(build(page));
            }
            if let Some(titles) = &titles {
                parts.push(titles.clone());
            }
            Block::vstack(parts, Spacing::Fixed(ROW_SPACING))
        }))
    } else {
        None
    };
    let footer: Option<PageBlockBuilder> =
        page_footer.map(|build| Rc::new(move |page: usize| build(page)) as PageBlockBuilder);

    Some(PageOrnament { header, footer })
}

/// The item sequence for a table placed in secondary or atomic position,
/// where no ornament hook is available: the titles lead the items instead.
pub fn inline_items(def: &TableDef) -> Vec<Block> {
    let mut items = Vec::new();
    if def.show_column_titles && !def.columns.is_empty() {
        items.push(titles_row(def));
    }
    items.extend(row_items(def));
    items
}

/// The environment the table's content sees: the column descriptors are
/// published for nested cell content.
pub fn table_env(def: &TableDef, env: &Environment) -> Environment {
    let columns = def.columns.clone();
    env.with(move |e| e.table_columns = columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TableGroup;
    use crate::style::TableColumn;

    fn sample_def() -> TableDef {
        TableDef::new(
            vec![TableColumn::new("Region", 1.0), TableColumn::new("City", 2.0)],
            vec![
                vec!["North".into(), "Oslo".into()],
                vec!["South".into(), "Rome".into()],
                vec!["North".into(), "Tallinn".into()],
            ],
        )
    }

    #[test]
    fn ungrouped_tables_emit_one_block_per_row() {
        let items = row_items(&sample_def());
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn grouping_partitions_rows_in_key_order() {
        let def = sample_def().group(
            TableGroup::on_column(0)
                .header(|key| Block::text(format!("H:{key}")))
                .footer(|key, rows| Block::text(format!("F:{key}:{}", rows.len()))),
        );
        let items = row_items(&def);
        // North (header, 2 rows, footer), then South (header, 1 row, footer).
        assert_eq!(items.len(), 7);
        match &items[0] {
            Block::Text(s) => assert_eq!(s, "H:North"),
            other => panic!("expected header first, got {other:?}"),
        }
        match &items[3] {
            Block::Text(s) => assert_eq!(s, "F:North:2"),
            other => panic!("expected footer after rows, got {other:?}"),
        }
        match &items[4] {
            Block::Text(s) => assert_eq!(s, "H:South"),
            other => panic!("expected second group header, got {other:?}"),
        }
    }

    #[test]
    fn descending_order_reverses_keys() {
        let def = sample_def().group(
            TableGroup::on_column(0)
                .order(GroupOrder::Descending)
                .header(|key| Block::text(format!("H:{key}"))),
        );
        let items = row_items(&def);
        match &items[0] {
            Block::Text(s) => assert_eq!(s, "H:South"),
            other => panic!("expected South first, got {other:?}"),
        }
    }

    #[test]
    fn ornament_carries_titles_and_page_hooks() {
        let def = sample_def().page_footer(|page| Block::text(format!("p{page}")));
        let ornament = ornament(&def).expect("titles and footer present");
        assert!(ornament.header.is_some());
        assert!(ornament.footer.is_some());

        let silent = sample_def().column_titles(false);
        assert!(super::ornament(&silent).is_none());
    }
}
