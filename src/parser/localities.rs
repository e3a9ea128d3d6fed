use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::debug;

use super::{bordered_tables, data_rows, element_text, map_cells, normalize_whitespace, ColumnSchema};
use crate::error::PipelineError;

static LIST: LazyLock<Selector> = LazyLock::new(|| Selector::parse("ul").unwrap());
static LIST_ITEM: LazyLock<Selector> = LazyLock::new(|| Selector::parse("li").unwrap());

const HEADER_LABEL: &str = "Название";
const EXPECTED_TABLES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LocalityColumn {
    Name,
    Kind,
    Population,
    AreaName,
}

/// Column 0 is a running number and carries no data.
const LOCALITY_COLUMNS: ColumnSchema<LocalityColumn> = &[
    None,
    Some(LocalityColumn::Name),
    Some(LocalityColumn::Kind),
    Some(LocalityColumn::Population),
    Some(LocalityColumn::AreaName),
];

/// A settlement row as scraped, bound to the persisted region it came from.
/// `kind` and `population` may be swapped on some pages; see `repair`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalityRecord {
    pub region_id: i64,
    pub name: String,
    pub kind: Option<String>,
    pub population: Option<String>,
    pub area_name: Option<String>,
}

/// Bullet texts from the first list of a region page, not yet field-mapped.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionFacts {
    pub region_id: i64,
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct LocalityPage {
    pub localities: Vec<LocalityRecord>,
    pub facts: Option<RegionFacts>,
}

/// Parses one region sub-page. The page must hold exactly two bordered
/// tables; localities live in the second one.
pub fn parse_locality_page(
    html: &str,
    region_id: i64,
    page: &str,
) -> Result<LocalityPage, PipelineError> {
    let document = Html::parse_document(html);
    let tables = bordered_tables(&document);
    if tables.len() != EXPECTED_TABLES {
        return Err(PipelineError::structural(
            page,
            format!(
                "expected {} bordered tables, found {}",
                EXPECTED_TABLES,
                tables.len()
            ),
        ));
    }

    let mut localities = Vec::new();
    for row in data_rows(tables[1], HEADER_LABEL) {
        let mut record = LocalityRecord {
            region_id,
            ..Default::default()
        };
        let mut name = None;
        for (column, cell) in map_cells(row, LOCALITY_COLUMNS, page)? {
            match column {
                LocalityColumn::Name => name = cell.text,
                LocalityColumn::Kind => record.kind = cell.text,
                LocalityColumn::Population => record.population = cell.text,
                LocalityColumn::AreaName => record.area_name = cell.text,
            }
        }
        match name {
            Some(name) => {
                record.name = name;
                localities.push(record);
            }
            None => debug!("Skipping locality row without a name on {}", page),
        }
    }

    let facts = document.select(&LIST).next().and_then(|list| {
        let items: Vec<String> = list
            .select(&LIST_ITEM)
            .map(|li| normalize_whitespace(&element_text(li)))
            .collect();
        if items.is_empty() {
            None
        } else {
            Some(RegionFacts { region_id, items })
        }
    });

    debug!(
        "{}: {} localities, {} fact items",
        page,
        localities.len(),
        facts.as_ref().map_or(0, |f| f.items.len())
    );
    Ok(LocalityPage { localities, facts })
}
