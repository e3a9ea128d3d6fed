use std::sync::Arc;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use reqwest::Url;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::db::{Stats, Store};
use crate::districts::FEDERAL_DISTRICTS;
use crate::error::PipelineError;
use crate::fetch::Fetch;
use crate::hierarchy::{link_region, BatchBuilder};
use crate::parser::facts::{self, RegionSupplement};
use crate::parser::localities::{parse_locality_page, LocalityPage};
use crate::parser::regions::parse_regions;
use crate::parser::repair::repair;

/// A persisted region that has a locality sub-page to visit.
#[derive(Debug, Clone)]
struct RegionPage {
    region_id: i64,
    name: String,
    url: String,
}

pub struct Pipeline<'a, F: Fetch> {
    fetcher: Arc<F>,
    store: &'a Store,
    base_url: Url,
    concurrency: usize,
}

impl<'a, F: Fetch> Pipeline<'a, F> {
    pub fn new(fetcher: F, store: &'a Store, base_url: &str, concurrency: usize) -> Result<Self> {
        Ok(Self {
            fetcher: Arc::new(fetcher),
            store,
            base_url: Url::parse(base_url)?,
            concurrency: concurrency.max(1),
        })
    }

    /// Full re-scrape: districts, regions, localities, then region codes.
    pub async fn run(&self) -> Result<Stats> {
        self.store.init_schema()?;

        let seeded = self.store.seed_federal_districts(&FEDERAL_DISTRICTS)?;
        info!("Seeded {} federal districts", seeded);

        let pages = self.load_regions().await?;

        let parsed = self.load_localities(pages).await?;

        let mut builder = BatchBuilder::new();
        let mut supplements = Vec::new();
        for page in parsed {
            let LocalityPage { mut localities, facts: page_facts } = page;
            localities.iter_mut().for_each(repair);
            builder.extend(localities);
            supplements.extend(page_facts.as_ref().map(facts::extract));
        }
        let batch = builder.finish()?;
        let (areas, localities) = self.store.replace_areas_and_localities(&batch)?;
        info!("Saved {} areas, {} localities", areas, localities);

        self.apply_supplements(&supplements)?;

        let stats = self.store.stats()?;
        info!(
            "Summary. Federal districts: {} Regions: {} Areas: {} Localities: {}",
            stats.federal_districts, stats.regions, stats.areas, stats.localities
        );
        Ok(stats)
    }

    /// Fetches, parses and persists the listing. Returns the regions with a sub-page.
    async fn load_regions(&self) -> Result<Vec<RegionPage>> {
        let listing_url = self.base_url.as_str();
        info!("Fetching regions from {}", listing_url);
        let html = self.fetcher.fetch(listing_url).await?;
        let regions: Vec<_> = parse_regions(&html, listing_url)
            .inspect_err(|e| warn!("Listing {}: {}", listing_url, e))?
            .into_iter()
            .map(|r| r.normalize())
            .collect();

        let districts = self.store.federal_districts()?;
        let rows: Vec<_> = regions.iter().map(|r| link_region(r, &districts)).collect();
        let unlinked = rows.iter().filter(|r| r.federal_district_id.is_none()).count();
        let ids = self.store.replace_regions(&rows)?;
        info!("Saved {} regions ({} without federal district)", ids.len(), unlinked);

        let mut pages = Vec::new();
        for (region, id) in regions.into_iter().zip(ids) {
            let Some(href) = region.locality_href else { continue };
            match self.base_url.join(&href) {
                Ok(url) => pages.push(RegionPage {
                    region_id: id,
                    name: region.name,
                    url: url.into(),
                }),
                Err(e) => warn!("{}: bad locality link {:?}: {}", region.name, href, e),
            }
        }
        Ok(pages)
    }

    /// Fetches every sub-page (bounded concurrency), then parses them all.
    /// Any failure aborts before areas/localities are touched.
    async fn load_localities(&self, pages: Vec<RegionPage>) -> Result<Vec<LocalityPage>> {
        info!("Fetching {} locality pages", pages.len());
        let semaphore = Arc::new(Semaphore::new(self.concurrency));

        let pb = ProgressBar::new(pages.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
                .progress_chars("#>-"),
        );

        let mut tasks = JoinSet::new();
        for (idx, page) in pages.iter().enumerate() {
            let fetcher = Arc::clone(&self.fetcher);
            let sem = Arc::clone(&semaphore);
            let url = page.url.clone();
            let pb = pb.clone();
            tasks.spawn(async move {
                let _permit = sem.acquire_owned().await;
                let body = fetcher.fetch(&url).await;
                pb.inc(1);
                (idx, body)
            });
        }

        // Completion order; dropping `tasks` on error aborts the fetches still in flight.
        let mut bodies: Vec<Option<String>> = vec![None; pages.len()];
        while let Some(joined) = tasks.join_next().await {
            let (idx, body) = joined?;
            match body {
                Ok(body) => bodies[idx] = Some(body),
                Err(e) => {
                    pb.abandon();
                    warn!("Failed to fetch localities of {}: {}", pages[idx].name, e);
                    return Err(e.into());
                }
            }
        }
        pb.finish_and_clear();

        let bodies: Vec<String> = bodies.into_iter().flatten().collect();
        let parsed = pages
            .par_iter()
            .zip(bodies.par_iter())
            .map(|(page, html)| {
                parse_locality_page(html, page.region_id, &page.url).inspect_err(|e| {
                    warn!("Region {} (id {}): {}", page.name, page.region_id, e)
                })
            })
            .collect::<Result<Vec<_>, PipelineError>>()?;

        let total: usize = parsed.iter().map(|p| p.localities.len()).sum();
        let with_facts = parsed.iter().filter(|p| p.facts.is_some()).count();
        info!(
            "Parsed {} localities, supplementary facts for {} regions",
            total, with_facts
        );
        Ok(parsed)
    }

    fn apply_supplements(&self, supplements: &[RegionSupplement]) -> Result<()> {
        let mut updated = 0;
        for s in supplements.iter().filter(|s| !s.is_empty()) {
            let Some(region) = self.store.find_region(s.region_id)? else {
                warn!("Region {} vanished before codes could be saved", s.region_id);
                continue;
            };
            debug!(
                "{}: subject code {:?}, phone code {:?}",
                region.name, s.subject_code, s.phone_code
            );
            self.store
                .update_region_codes(s.region_id, s.subject_code, s.phone_code.as_deref())?;
            updated += 1;
        }
        info!("Updated codes for {} regions", updated);
        Ok(())
    }
}
