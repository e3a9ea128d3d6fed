pub mod facts;
pub mod localities;
pub mod normalize;
pub mod regions;
pub mod repair;

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::error::PipelineError;

static BORDERED_TABLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table.table-bordered").unwrap());
static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());
static LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

/// One `<td>`: trimmed text (None when empty) and the first link inside it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cell {
    pub text: Option<String>,
    pub href: Option<String>,
}

impl Cell {
    fn from_element(td: ElementRef) -> Self {
        let text = normalize_whitespace(&element_text(td));
        Cell {
            text: if text.is_empty() { None } else { Some(text) },
            href: td
                .select(&LINK)
                .next()
                .and_then(|a| a.value().attr("href"))
                .map(str::to_string),
        }
    }
}

/// Column position -> field. `None` marks a column that is read but ignored.
pub type ColumnSchema<F> = &'static [Option<F>];

pub fn element_text(element: ElementRef) -> String {
    element.text().collect::<String>()
}

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// All `table.table-bordered` elements in document order.
pub fn bordered_tables(document: &Html) -> Vec<ElementRef<'_>> {
    document.select(&BORDERED_TABLE).collect()
}

/// Rows of `table` in document order, minus any whose text contains `skip_label`.
pub fn data_rows<'a>(table: ElementRef<'a>, skip_label: &str) -> Vec<ElementRef<'a>> {
    table
        .select(&ROW)
        .filter(|row| !element_text(*row).contains(skip_label))
        .collect()
}

/// Pairs each `<td>` of `row` with its schema field. More cells than the schema
/// describes means the source layout changed, which is fatal.
pub fn map_cells<F: Copy>(
    row: ElementRef,
    schema: ColumnSchema<F>,
    page: &str,
) -> Result<Vec<(F, Cell)>, PipelineError> {
    let cells: Vec<ElementRef> = row.select(&CELL).collect();
    if cells.len() > schema.len() {
        return Err(PipelineError::structural(
            page,
            format!(
                "row has {} cells, expected at most {}",
                cells.len(),
                schema.len()
            ),
        ));
    }
    Ok(cells
        .into_iter()
        .zip(schema.iter())
        .filter_map(|(td, field)| field.map(|f| (f, Cell::from_element(td))))
        .collect())
}
