use std::collections::HashMap;

use tracing::debug;

use crate::db::{DistrictRow, NewRegion};
use crate::error::PipelineError;
use crate::parser::localities::LocalityRecord;
use crate::parser::regions::NormalizedRegion;
use crate::parser::repair::population_value;

/// First district whose short Cyrillic field contains `abbrev` wins.
/// The field may list several abbreviations ("урфо, уфо"); any containment
/// counts. No match, or no abbreviation at all, gives `None`.
pub fn resolve_district(abbrev: Option<&str>, districts: &[DistrictRow]) -> Option<i64> {
    let abbrev = abbrev.map(str::trim).filter(|a| !a.is_empty())?.to_lowercase();
    let found = districts
        .iter()
        .find(|d| d.name_short_ru.to_lowercase().contains(&abbrev))
        .map(|d| d.id);
    if found.is_none() {
        debug!("No federal district matches {:?}", abbrev);
    }
    found
}

pub fn link_region(region: &NormalizedRegion, districts: &[DistrictRow]) -> NewRegion {
    NewRegion {
        name: region.name.clone(),
        adm_center: region.adm_center.clone(),
        population: region.population,
        percent_population: region.percent_population,
        federal_district_id: resolve_district(region.district.as_deref(), districts),
        population_density: region.population_density,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StagedArea {
    pub region_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StagedLocality {
    pub region_id: i64,
    pub name: String,
    pub kind: Option<String>,
    pub population: Option<i64>,
    /// Index into `StagedBatch::areas`.
    pub area: Option<usize>,
}

/// Areas and localities of one run, built fully in memory before the
/// replace-all so no row is written while the batch is still growing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StagedBatch {
    pub areas: Vec<StagedArea>,
    pub localities: Vec<StagedLocality>,
}

impl StagedBatch {
    /// Every area reference resolves and stays inside the locality's region.
    pub fn validate(&self) -> Result<(), PipelineError> {
        for l in &self.localities {
            let Some(idx) = l.area else { continue };
            let area = self.areas.get(idx).ok_or_else(|| {
                PipelineError::Integrity(format!("locality {:?} points at missing area #{}", l.name, idx))
            })?;
            if area.region_id != l.region_id {
                return Err(PipelineError::Integrity(format!(
                    "locality {:?} of region {} linked to area {:?} of region {}",
                    l.name, l.region_id, area.name, area.region_id
                )));
            }
        }
        Ok(())
    }
}

/// Deduplicates areas on (region, name) while collecting localities.
#[derive(Debug, Default)]
pub struct BatchBuilder {
    index: HashMap<(i64, String), usize>,
    batch: StagedBatch,
}

impl BatchBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn area_for(&mut self, region_id: i64, name: &str) -> usize {
        if let Some(&idx) = self.index.get(&(region_id, name.to_string())) {
            return idx;
        }
        let idx = self.batch.areas.len();
        self.batch.areas.push(StagedArea {
            region_id,
            name: name.to_string(),
        });
        self.index.insert((region_id, name.to_string()), idx);
        idx
    }

    /// Adds an already repaired record.
    pub fn push(&mut self, record: LocalityRecord) {
        let area = record
            .area_name
            .as_deref()
            .map(|name| self.area_for(record.region_id, name));
        let population = population_value(&record);
        self.batch.localities.push(StagedLocality {
            region_id: record.region_id,
            name: record.name,
            kind: record.kind,
            population,
            area,
        });
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = LocalityRecord>) {
        for r in records {
            self.push(r);
        }
    }

    pub fn finish(self) -> Result<StagedBatch, PipelineError> {
        self.batch.validate()?;
        Ok(self.batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::districts::FEDERAL_DISTRICTS;

    fn districts() -> Vec<DistrictRow> {
        FEDERAL_DISTRICTS
            .iter()
            .enumerate()
            .map(|(i, s)| DistrictRow {
                id: i as i64 + 1,
                name: s.name.to_string(),
                name_short_en: s.name_short_en.to_string(),
                name_short_ru: s.name_short_ru.to_string(),
            })
            .collect()
    }

    fn locality(region_id: i64, name: &str, area: Option<&str>) -> LocalityRecord {
        LocalityRecord {
            region_id,
            name: name.into(),
            kind: Some("село".into()),
            population: Some("100".into()),
            area_name: area.map(String::from),
        }
    }

    #[test]
    fn resolves_exact_abbreviation() {
        let d = districts();
        let id = resolve_district(Some("сзфо"), &d).unwrap();
        assert_eq!(d[(id - 1) as usize].name, "Северо-Западный федеральный округ");
    }

    #[test]
    fn resolves_any_listed_abbreviation() {
        let d = districts();
        assert_eq!(resolve_district(Some("уфо"), &d), Some(6));
        assert_eq!(resolve_district(Some("урфо"), &d), Some(6));
        assert_eq!(resolve_district(Some("двфо"), &d), Some(8));
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(resolve_district(Some("ЦФО"), &districts()), Some(1));
    }

    #[test]
    fn unknown_or_empty_abbreviation_is_unlinked() {
        let d = districts();
        assert_eq!(resolve_district(Some("хз"), &d), None);
        assert_eq!(resolve_district(Some("  "), &d), None);
        assert_eq!(resolve_district(None, &d), None);
    }

    #[test]
    fn first_match_wins() {
        // "фо" is contained in every short name
        assert_eq!(resolve_district(Some("фо"), &districts()), Some(1));
    }

    #[test]
    fn areas_are_deduplicated_across_batches() {
        let mut builder = BatchBuilder::new();
        builder.extend(vec![locality(1, "Апатиты", Some("Северный"))]);
        builder.extend(vec![locality(1, "Кировск", Some("Северный"))]);
        let batch = builder.finish().unwrap();
        assert_eq!(batch.areas.len(), 1);
        assert_eq!(batch.localities[0].area, Some(0));
        assert_eq!(batch.localities[1].area, Some(0));
    }

    #[test]
    fn same_area_name_in_two_regions_is_two_areas() {
        let mut builder = BatchBuilder::new();
        builder.push(locality(1, "А", Some("Центральный район")));
        builder.push(locality(2, "Б", Some("Центральный район")));
        let batch = builder.finish().unwrap();
        assert_eq!(batch.areas.len(), 2);
        assert_eq!(batch.areas[0].region_id, 1);
        assert_eq!(batch.areas[1].region_id, 2);
    }

    #[test]
    fn locality_without_area_stays_unlinked() {
        let mut builder = BatchBuilder::new();
        builder.push(locality(1, "Ура-Губа", None));
        let batch = builder.finish().unwrap();
        assert!(batch.areas.is_empty());
        assert_eq!(batch.localities[0].area, None);
        assert_eq!(batch.localities[0].population, Some(100));
    }

    #[test]
    fn cross_region_link_fails_validation() {
        let batch = StagedBatch {
            areas: vec![StagedArea {
                region_id: 1,
                name: "Северный".into(),
            }],
            localities: vec![StagedLocality {
                region_id: 2,
                name: "X".into(),
                kind: None,
                population: None,
                area: Some(0),
            }],
        };
        assert!(matches!(batch.validate(), Err(PipelineError::Integrity(_))));
    }

    #[test]
    fn links_region_fields() {
        let region = NormalizedRegion {
            name: "Мурманская область".into(),
            population: Some(667_744),
            district: Some("сзфо".into()),
            ..Default::default()
        };
        let new = link_region(&region, &districts());
        assert_eq!(new.federal_district_id, Some(5));
        assert_eq!(new.population, Some(667_744));
    }
}
