use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use crate::districts::DistrictSeed;
use crate::hierarchy::StagedBatch;

/// Persistence gateway. Owns the connection; components receive `&Store`.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {:?}", parent))?;
            }
        }
        let conn = Connection::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    pub fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS federal_districts (
                id            INTEGER PRIMARY KEY,
                name          TEXT NOT NULL,
                name_short_en TEXT NOT NULL,
                name_short_ru TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS regions (
                id                  INTEGER PRIMARY KEY,
                name                TEXT NOT NULL,
                adm_center          TEXT,
                population          INTEGER,
                percent_population  REAL,
                federal_district_id INTEGER REFERENCES federal_districts(id) ON DELETE SET NULL,
                population_density  REAL,
                subject_code        INTEGER,
                phone_code          TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_regions_district ON regions(federal_district_id);

            CREATE TABLE IF NOT EXISTS areas (
                id        INTEGER PRIMARY KEY,
                name      TEXT NOT NULL,
                region_id INTEGER REFERENCES regions(id) ON DELETE CASCADE,
                UNIQUE(region_id, name)
            );

            CREATE TABLE IF NOT EXISTS localities (
                id            INTEGER PRIMARY KEY,
                name          TEXT NOT NULL,
                locality_type TEXT,
                population    INTEGER,
                area_id       INTEGER REFERENCES areas(id) ON DELETE SET NULL
            );
            CREATE INDEX IF NOT EXISTS idx_localities_area ON localities(area_id);
            ",
        )?;
        Ok(())
    }

    // ── Federal districts ──

    /// Upserts the seed table with ids `1..=seeds.len()`. Ids stay stable across
    /// runs so re-seeding never detaches regions already linked to a district.
    pub fn seed_federal_districts(&self, seeds: &[DistrictSeed]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO federal_districts (id, name, name_short_en, name_short_ru)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                     name = excluded.name,
                     name_short_en = excluded.name_short_en,
                     name_short_ru = excluded.name_short_ru",
            )?;
            for (i, s) in seeds.iter().enumerate() {
                let id = i as i64 + 1;
                count += stmt.execute(params![id, s.name, s.name_short_en, s.name_short_ru])?;
            }
        }
        tx.execute(
            "DELETE FROM federal_districts WHERE id > ?1",
            [seeds.len() as i64],
        )?;
        tx.commit()?;
        Ok(count)
    }

    /// All districts in seed table order.
    pub fn federal_districts(&self) -> Result<Vec<DistrictRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, name_short_en, name_short_ru FROM federal_districts ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(DistrictRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    name_short_en: row.get(2)?,
                    name_short_ru: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ── Regions ──

    /// Truncates and bulk-inserts regions, returning ids in input order.
    pub fn replace_regions(&self, rows: &[NewRegion]) -> Result<Vec<i64>> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM regions", [])?;
        let mut ids = Vec::with_capacity(rows.len());
        {
            let mut stmt = tx.prepare(
                "INSERT INTO regions
                 (name, adm_center, population, percent_population, federal_district_id, population_density)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for r in rows {
                stmt.execute(params![
                    r.name,
                    r.adm_center,
                    r.population,
                    r.percent_population,
                    r.federal_district_id,
                    r.population_density,
                ])?;
                ids.push(tx.last_insert_rowid());
            }
        }
        tx.commit()?;
        Ok(ids)
    }

    pub fn find_region(&self, id: i64) -> Result<Option<RegionRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, name, federal_district_id, subject_code, phone_code
                 FROM regions WHERE id = ?1",
                [id],
                |row| {
                    Ok(RegionRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        federal_district_id: row.get(2)?,
                        subject_code: row.get(3)?,
                        phone_code: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Sets subject/phone code on an existing region; `None` keeps the stored value.
    pub fn update_region_codes(
        &self,
        id: i64,
        subject_code: Option<i64>,
        phone_code: Option<&str>,
    ) -> Result<usize> {
        let n = self.conn.execute(
            "UPDATE regions
             SET subject_code = COALESCE(?2, subject_code),
                 phone_code   = COALESCE(?3, phone_code)
             WHERE id = ?1",
            params![id, subject_code, phone_code],
        )?;
        Ok(n)
    }

    // ── Areas + localities ──

    /// Replaces both tables with `batch` in one transaction.
    pub fn replace_areas_and_localities(&self, batch: &StagedBatch) -> Result<(usize, usize)> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM localities", [])?;
        tx.execute("DELETE FROM areas", [])?;

        let mut area_ids = Vec::with_capacity(batch.areas.len());
        {
            let mut a_stmt = tx.prepare("INSERT INTO areas (name, region_id) VALUES (?1, ?2)")?;
            for a in &batch.areas {
                a_stmt.execute(params![a.name, a.region_id])?;
                area_ids.push(tx.last_insert_rowid());
            }

            let mut l_stmt = tx.prepare(
                "INSERT INTO localities (name, locality_type, population, area_id)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for l in &batch.localities {
                let area_id = l.area.map(|idx| area_ids[idx]);
                l_stmt.execute(params![l.name, l.kind, l.population, area_id])?;
            }
        }
        tx.commit()?;
        Ok((batch.areas.len(), batch.localities.len()))
    }

    // ── Overview ──

    pub fn fetch_overview(&self, district: Option<&str>, limit: usize) -> Result<Vec<OverviewRow>> {
        let sql = format!(
            "SELECT r.name, COALESCE(fd.name_short_ru, ''), r.population, r.subject_code,
                    COALESCE(r.phone_code, ''),
                    (SELECT COUNT(*) FROM areas a WHERE a.region_id = r.id),
                    (SELECT COUNT(*) FROM localities l JOIN areas a ON l.area_id = a.id
                     WHERE a.region_id = r.id)
             FROM regions r
             LEFT JOIN federal_districts fd ON fd.id = r.federal_district_id
             {}
             ORDER BY r.id
             LIMIT {}",
            if district.is_some() {
                "WHERE instr(fd.name_short_ru, ?1) > 0"
            } else {
                ""
            },
            limit
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let map = |row: &rusqlite::Row| -> rusqlite::Result<OverviewRow> {
            Ok(OverviewRow {
                name: row.get(0)?,
                district: row.get(1)?,
                population: row.get(2)?,
                subject_code: row.get(3)?,
                phone_code: row.get(4)?,
                areas: row.get(5)?,
                localities: row.get(6)?,
            })
        };
        let rows = match district {
            Some(d) => stmt
                .query_map([d.to_lowercase()], map)?
                .collect::<Result<Vec<_>, _>>()?,
            None => stmt.query_map([], map)?.collect::<Result<Vec<_>, _>>()?,
        };
        Ok(rows)
    }

    // ── Stats ──

    pub fn stats(&self) -> Result<Stats> {
        let count = |table: &str| -> Result<usize> {
            let n: usize = self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))?;
            Ok(n)
        };
        Ok(Stats {
            federal_districts: count("federal_districts")?,
            regions: count("regions")?,
            areas: count("areas")?,
            localities: count("localities")?,
        })
    }

    #[cfg(test)]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DistrictRow {
    pub id: i64,
    pub name: String,
    pub name_short_en: String,
    pub name_short_ru: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewRegion {
    pub name: String,
    pub adm_center: Option<String>,
    pub population: Option<i64>,
    pub percent_population: Option<f64>,
    pub federal_district_id: Option<i64>,
    pub population_density: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegionRow {
    pub id: i64,
    pub name: String,
    pub federal_district_id: Option<i64>,
    pub subject_code: Option<i64>,
    pub phone_code: Option<String>,
}

pub struct OverviewRow {
    pub name: String,
    pub district: String,
    pub population: Option<i64>,
    pub subject_code: Option<i64>,
    pub phone_code: String,
    pub areas: i64,
    pub localities: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub federal_districts: usize,
    pub regions: usize,
    pub areas: usize,
    pub localities: usize,
}
