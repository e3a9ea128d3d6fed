use tracing::debug;

use super::localities::RegionFacts;
use super::normalize::{digit_tokens, extract_int};

const SUBJECT_CODE_LABEL: &str = "Код субъекта России";
const PHONE_CODE_LABEL: &str = "Телефонный код";

/// Field values recovered from a region's fact list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionSupplement {
    pub region_id: i64,
    pub subject_code: Option<i64>,
    /// All phone codes found, joined with ", ".
    pub phone_code: Option<String>,
}

impl RegionSupplement {
    pub fn is_empty(&self) -> bool {
        self.subject_code.is_none() && self.phone_code.is_none()
    }
}

pub fn extract(facts: &RegionFacts) -> RegionSupplement {
    let mut supplement = RegionSupplement {
        region_id: facts.region_id,
        ..Default::default()
    };

    for item in &facts.items {
        if item.contains(SUBJECT_CODE_LABEL) {
            match extract_int(item) {
                Ok(code) => supplement.subject_code = Some(code),
                Err(e) => debug!("region {}: subject code: {}", facts.region_id, e),
            }
        }
        if item.contains(PHONE_CODE_LABEL) {
            let codes = digit_tokens(item);
            if codes.is_empty() {
                debug!("region {}: no phone codes in {:?}", facts.region_id, item);
            } else {
                supplement.phone_code = Some(codes.join(", "));
            }
        }
    }

    supplement
}
