/// Federal districts are reference data and are never scraped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistrictSeed {
    pub name: &'static str,
    pub name_short_en: &'static str,
    /// One or more accepted Cyrillic abbreviations, comma-separated.
    pub name_short_ru: &'static str,
}

pub const FEDERAL_DISTRICTS: [DistrictSeed; 8] = [
    DistrictSeed {
        name: "Центральный федеральный округ",
        name_short_en: "tsfo",
        name_short_ru: "цфо",
    },
    DistrictSeed {
        name: "Приволжский федеральный округ",
        name_short_en: "pfo",
        name_short_ru: "пфо",
    },
    DistrictSeed {
        name: "Сибирский федеральный округ",
        name_short_en: "sfo",
        name_short_ru: "сфо",
    },
    DistrictSeed {
        name: "Южный федеральный округ",
        name_short_en: "yufo",
        name_short_ru: "юфо",
    },
    DistrictSeed {
        name: "Северо-Западный федеральный округ",
        name_short_en: "szfo",
        name_short_ru: "сзфо",
    },
    DistrictSeed {
        name: "Уральский федеральный округ",
        name_short_en: "ufo",
        name_short_ru: "урфо, уфо",
    },
    DistrictSeed {
        name: "Северо-Кавказский федеральный округ",
        name_short_en: "skfo",
        name_short_ru: "скфо",
    },
    DistrictSeed {
        name: "Дальневосточный федеральный округ",
        name_short_en: "dfo",
        name_short_ru: "двфо, дфо",
    },
];
