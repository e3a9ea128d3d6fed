//! Some region pages have the "type" and "population" columns swapped.
//! The correction is a best-effort guess in three tiers:
//!
//! 1. `population` parses as a number: the record is already right.
//! 2. `kind` parses as a number instead: swap the two.
//! 3. Neither parses: whichever text is longer than two characters is the
//!    type, the other one is the population.

use tracing::debug;

use super::localities::LocalityRecord;
use super::normalize::extract_int;

/// Texts up to this many characters are taken to be the population in tier 3.
const MAX_POPULATION_TEXT_CHARS: usize = 2;

/// Reassigns `kind`/`population` in place. Records with both fields absent
/// are left untouched.
pub fn repair(record: &mut LocalityRecord) {
    if record.kind.is_none() && record.population.is_none() {
        return;
    }

    let population_ok = record
        .population
        .as_deref()
        .is_some_and(|p| extract_int(p).is_ok());
    if population_ok {
        return;
    }

    let kind_is_number = record
        .kind
        .as_deref()
        .is_some_and(|k| extract_int(k).is_ok());
    if kind_is_number {
        std::mem::swap(&mut record.kind, &mut record.population);
        return;
    }

    let kind_chars = record.kind.as_deref().map_or(0, |k| k.chars().count());
    if kind_chars <= MAX_POPULATION_TEXT_CHARS {
        std::mem::swap(&mut record.kind, &mut record.population);
    }
}

/// Integer population after repair; non-numeric leftovers become unset.
pub fn population_value(record: &LocalityRecord) -> Option<i64> {
    record.population.as_deref().and_then(|raw| {
        extract_int(raw)
            .map_err(|e| debug!("{} (region {}): population: {}", record.name, record.region_id, e))
            .ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: Option<&str>, population: Option<&str>) -> LocalityRecord {
        LocalityRecord {
            region_id: 1,
            name: "Тест".into(),
            kind: kind.map(String::from),
            population: population.map(String::from),
            area_name: None,
        }
    }

    #[test]
    fn correct_record_is_unchanged() {
        let mut r = record(Some("город"), Some("54321"));
        let before = r.clone();
        repair(&mut r);
        assert_eq!(r, before);
        assert_eq!(population_value(&r), Some(54321));
    }

    #[test]
    fn repair_is_idempotent() {
        let mut r = record(Some("12000"), Some("деревня"));
        repair(&mut r);
        let once = r.clone();
        repair(&mut r);
        assert_eq!(r, once);
    }

    #[test]
    fn numeric_type_is_swapped() {
        let mut r = record(Some("12000"), Some("деревня"));
        repair(&mut r);
        assert_eq!(r.kind.as_deref(), Some("деревня"));
        assert_eq!(population_value(&r), Some(12000));
    }

    #[test]
    fn missing_population_with_numeric_type_is_swapped() {
        let mut r = record(Some("1 200"), None);
        repair(&mut r);
        assert_eq!(r.kind, None);
        assert_eq!(population_value(&r), Some(1200));
    }

    #[test]
    fn length_fallback_keeps_long_type() {
        let mut r = record(Some("пос."), Some("гор"));
        repair(&mut r);
        assert_eq!(r.kind.as_deref(), Some("пос."));
        assert_eq!(r.population.as_deref(), Some("гор"));
        assert_eq!(population_value(&r), None);
    }

    #[test]
    fn length_fallback_swaps_short_type() {
        let mut r = record(Some("с."), Some("деревня"));
        repair(&mut r);
        assert_eq!(r.kind.as_deref(), Some("деревня"));
        assert_eq!(r.population.as_deref(), Some("с."));
    }

    #[test]
    fn length_fallback_with_absent_type_moves_text_to_type() {
        let mut r = record(None, Some("хутор"));
        repair(&mut r);
        assert_eq!(r.kind.as_deref(), Some("хутор"));
        assert_eq!(r.population, None);
    }

    #[test]
    fn empty_record_is_untouched() {
        let mut r = record(None, None);
        repair(&mut r);
        assert_eq!(r, record(None, None));
    }

    #[test]
    fn same_input_same_output() {
        let mut a = record(Some("ст"), Some("аул"));
        let mut b = a.clone();
        repair(&mut a);
        repair(&mut b);
        assert_eq!(a, b);
    }
}
