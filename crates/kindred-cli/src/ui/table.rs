//! Table rendering for search results using comfy-table.

use comfy_table::presets::NOTHING;
use comfy_table::{Cell, CellAlignment, ColumnConstraint, Table, Width};

use kindred_core::SearchHit;

use super::color::terminal_width;
use super::format::{format_thousands, single_line, truncate_str};

/// Width taken by every column except TITLE.
const FIXED_COLUMNS_WIDTH: usize = 48;

/// Render ranked search results.
///
/// # Example Output
///
/// ```text
///  #  SCORE  TYPE     TITLE                  VIEWS  ID
///  1  0.912  webtoon  Salt and Ash             120  w-1
///  2  0.734  novel    Tidewater                  3  w-2
/// ```
pub fn render_results_table(hits: &[SearchHit], score: impl Fn(f32) -> String) -> String {
    if hits.is_empty() {
        return String::new();
    }

    let title_width = terminal_width()
        .saturating_sub(FIXED_COLUMNS_WIDTH)
        .clamp(16, 60);

    let mut table = Table::new();
    table.load_preset(NOTHING);

    table.set_header(vec![
        Cell::new("#").set_alignment(CellAlignment::Right),
        Cell::new("SCORE").set_alignment(CellAlignment::Right),
        Cell::new("TYPE"),
        Cell::new("TITLE"),
        Cell::new("VIEWS").set_alignment(CellAlignment::Right),
        Cell::new("ID"),
    ]);

    table.set_constraints(vec![
        ColumnConstraint::LowerBoundary(Width::Fixed(2)), // #
        ColumnConstraint::LowerBoundary(Width::Fixed(5)), // SCORE
        ColumnConstraint::LowerBoundary(Width::Fixed(7)), // TYPE
        ColumnConstraint::LowerBoundary(Width::Fixed(8)), // TITLE
        ColumnConstraint::LowerBoundary(Width::Fixed(5)), // VIEWS
        ColumnConstraint::LowerBoundary(Width::Fixed(6)), // ID
    ]);

    for (i, hit) in hits.iter().enumerate() {
        let title = truncate_str(&single_line(&hit.work.title), title_width);

        table.add_row(vec![
            Cell::new(i + 1).set_alignment(CellAlignment::Right),
            Cell::new(score(hit.score)).set_alignment(CellAlignment::Right),
            Cell::new(hit.work.kind.map_or("-", |k| k.as_str())),
            Cell::new(title),
            Cell::new(format_thousands(hit.work.view_count)).set_alignment(CellAlignment::Right),
            Cell::new(hit.work.id.as_str()),
        ]);
    }

    table.trim_fmt().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kindred_core::{Work, WorkKind};

    #[test]
    fn test_empty_results_render_nothing() {
        assert_eq!(render_results_table(&[], |s| s.to_string()), "");
    }

    #[test]
    fn test_results_table_rows() {
        let hits = vec![
            SearchHit::new(Work::new("w-1", "Salt and Ash", WorkKind::Webtoon).summary(), 0.912),
            SearchHit::new(Work::new("w-2", "Tidewater", WorkKind::Novel).summary(), 0.734),
        ];
        let output = render_results_table(&hits, |s| format!("{:.3}", s));

        assert!(output.contains("SCORE"));
        assert!(output.contains("Salt and Ash"));
        assert!(output.contains("0.734"));
        assert!(output.contains("webtoon"));
        let salt = output.find("w-1").unwrap();
        let tide = output.find("w-2").unwrap();
        assert!(salt < tide);
    }
}
