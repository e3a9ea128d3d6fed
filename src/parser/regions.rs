use scraper::Html;
use tracing::{debug, info};

use super::normalize::{extract_int, parse_decimal_comma};
use super::{bordered_tables, data_rows, map_cells, ColumnSchema};
use crate::error::PipelineError;

/// Row label of the listing table's summary row.
const SUMMARY_LABEL: &str = "% от общего населения РФ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RegionColumn {
    Name,
    AdmCenter,
    Population,
    Percent,
    District,
    Density,
}

const REGION_COLUMNS: ColumnSchema<RegionColumn> = &[
    Some(RegionColumn::Name),
    Some(RegionColumn::AdmCenter),
    Some(RegionColumn::Population),
    Some(RegionColumn::Percent),
    Some(RegionColumn::District),
    Some(RegionColumn::Density),
];

/// A listing row as scraped: every field is raw cell text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionRecord {
    pub name: String,
    pub adm_center: Option<String>,
    pub population: Option<String>,
    pub percent: Option<String>,
    pub district: Option<String>,
    pub density: Option<String>,
    pub locality_href: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedRegion {
    pub name: String,
    pub adm_center: Option<String>,
    pub population: Option<i64>,
    pub percent_population: Option<f64>,
    pub population_density: Option<f64>,
    /// Lowercased federal district abbreviation, matched by containment later.
    pub district: Option<String>,
    pub locality_href: Option<String>,
}

/// Parses the top-level listing page. `page` names the source in errors.
pub fn parse_regions(html: &str, page: &str) -> Result<Vec<RegionRecord>, PipelineError> {
    let document = Html::parse_document(html);
    let tables = bordered_tables(&document);
    let table = match tables.as_slice() {
        [table] => *table,
        [] => return Err(PipelineError::structural(page, "no bordered region table")),
        more => {
            return Err(PipelineError::structural(
                page,
                format!("expected one bordered table, found {}", more.len()),
            ))
        }
    };

    let mut records = Vec::new();
    for row in data_rows(table, SUMMARY_LABEL) {
        let mut record = RegionRecord::default();
        let mut name = None;
        for (column, cell) in map_cells(row, REGION_COLUMNS, page)? {
            match column {
                RegionColumn::Name => {
                    record.locality_href = cell.href;
                    name = cell.text;
                }
                RegionColumn::AdmCenter => record.adm_center = cell.text,
                RegionColumn::Population => record.population = cell.text,
                RegionColumn::Percent => record.percent = cell.text,
                RegionColumn::District => record.district = cell.text,
                RegionColumn::Density => record.density = cell.text,
            }
        }
        match name {
            Some(name) => {
                record.name = name;
                records.push(record);
            }
            None => debug!("Skipping region row without a name on {}", page),
        }
    }

    info!("Parsed {} regions from {}", records.len(), page);
    Ok(records)
}

impl RegionRecord {
    /// Converts numeric columns; unparseable values are left unset.
    pub fn normalize(self) -> NormalizedRegion {
        let name = self.name;
        let population = self.population.as_deref().and_then(|raw| {
            extract_int(raw)
                .map_err(|e| debug!("{}: population: {}", name, e))
                .ok()
        });
        let percent_population = self.percent.as_deref().and_then(|raw| {
            parse_decimal_comma(raw)
                .map_err(|e| debug!("{}: percent: {}", name, e))
                .ok()
        });
        let population_density = self.density.as_deref().and_then(|raw| {
            parse_decimal_comma(raw)
                .map_err(|e| debug!("{}: density: {}", name, e))
                .ok()
        });

        NormalizedRegion {
            adm_center: self.adm_center,
            population,
            percent_population,
            population_density,
            district: self.district.map(|d| d.to_lowercase()),
            locality_href: self.locality_href,
            name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <html><body>
        <table class="table table-bordered">
          <tr><th>Регион</th><th>Центр</th><th>Население</th><th>% от общего населения РФ</th><th>ФО</th><th>Плотность</th></tr>
          <tr>
            <td><a href="/moskva">Москва</a></td><td>Москва</td><td>13 010 112</td>
            <td>8,87</td><td>ЦФО</td><td>4 950,6</td>
          </tr>
          <tr>
            <td>Ненецкий АО</td><td></td><td>41 434</td><td></td><td>СЗФО</td>
          </tr>
        </table>
        </body></html>"#;

    #[test]
    fn parses_rows_in_order_and_skips_summary() {
        let regions = parse_regions(LISTING, "listing").unwrap();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].name, "Москва");
        assert_eq!(regions[0].locality_href.as_deref(), Some("/moskva"));
        assert_eq!(regions[0].population.as_deref(), Some("13 010 112"));
        assert_eq!(regions[1].name, "Ненецкий АО");
        assert_eq!(regions[1].locality_href, None);
    }

    #[test]
    fn empty_cells_stay_unset() {
        let regions = parse_regions(LISTING, "listing").unwrap();
        let nao = &regions[1];
        assert_eq!(nao.adm_center, None);
        assert_eq!(nao.percent, None);
        assert_eq!(nao.density, None);
    }

    #[test]
    fn missing_table_is_structural() {
        let err = parse_regions("<html><body><p>maintenance</p></body></html>", "listing")
            .unwrap_err();
        assert!(matches!(err, PipelineError::Structural { .. }));
    }

    #[test]
    fn second_bordered_table_is_structural() {
        let html = format!(
            "{}<table class=\"table-bordered\"><tr><td>Реклама</td></tr></table>",
            LISTING
        );
        let err = parse_regions(&html, "listing").unwrap_err();
        match err {
            PipelineError::Structural { page, detail } => {
                assert_eq!(page, "listing");
                assert!(detail.contains("found 2"), "{}", detail);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn normalizes_numbers_and_district() {
        let region = parse_regions(LISTING, "listing").unwrap().remove(0).normalize();
        assert_eq!(region.population, Some(13_010_112));
        assert_eq!(region.percent_population, Some(8.87));
        assert_eq!(region.population_density, Some(4950.6));
        assert_eq!(region.district.as_deref(), Some("цфо"));
    }

    #[test]
    fn normalize_tolerates_missing_and_garbage_fields() {
        let region = RegionRecord {
            name: "Тест".into(),
            population: Some("нет данных".into()),
            ..Default::default()
        }
        .normalize();
        assert_eq!(region.population, None);
        assert_eq!(region.percent_population, None);
        assert_eq!(region.district, None);
    }
}
