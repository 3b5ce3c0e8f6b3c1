use crate::api::{self, Params, WikiApi};
use crate::config::{PROP_COORDINATES, PROP_GEOGRAPHY, PROP_OSM_RELATION};
use crate::models::{classify_member, ClaimValue, Member};
use crate::stats::CrawlStats;
use crate::store::{CategoryStore, Dimension};
use anyhow::{Context, Result};
use indicatif::ProgressBar;
use rustc_hash::FxHashSet;
use serde_json::Value;
use tracing::{debug, error, info, warn};

/// `categorymembers` listing for `title`, plus the Wikidata item of the category page itself.
pub fn category_members_params(title: &str) -> Params {
    api::params(&[
        ("action", "query"),
        ("list", "categorymembers"),
        ("cmtitle", title),
        ("cmlimit", "max"),
        ("cmprop", "ids|title"),
        ("prop", "pageprops"),
        ("ppprop", "wikibase_item"),
        ("titles", title),
    ])
}

/// `(namespace, title)` of every member listed on one result page.
pub fn members_of(page: &Value) -> Vec<(i64, &str)> {
    page.pointer("/query/categorymembers")
        .and_then(Value::as_array)
        .map(|members| {
            members
                .iter()
                .filter_map(|m| {
                    let ns = m.get("ns").and_then(Value::as_i64)?;
                    let title = m.get("title").and_then(Value::as_str)?;
                    Some((ns, title))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// The `wikibase_item` page prop of the queried category page, if any.
pub fn wikibase_item_of(page: &Value) -> Option<String> {
    let pages = page.pointer("/query/pages")?;
    let first = match pages {
        Value::Array(list) => list.first()?,
        Value::Object(map) => map.values().next()?,
        _ => return None,
    };
    first
        .pointer("/pageprops/wikibase_item")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Walks a category tree through the API and fills the store.
pub struct Crawler<'a, A: WikiApi + ?Sized> {
    api: &'a mut A,
    store: &'a CategoryStore,
    stats: &'a CrawlStats,
}

impl<'a, A: WikiApi + ?Sized> Crawler<'a, A> {
    pub fn new(api: &'a mut A, store: &'a CategoryStore, stats: &'a CrawlStats) -> Self {
        Self { api, store, stats }
    }

    /// Crawls `root_title` and every category below it, depth-first.
    ///
    /// A category found as a child is descended into at most once per call. It is
    /// still listed under every parent that names it. The root itself is not marked
    /// as seen, so a back-link to it is crawled again.
    pub fn crawl(&mut self, root_title: &str) -> Result<()> {
        let mut seen_children: FxHashSet<String> = FxHashSet::default();
        let mut worklist: Vec<(String, u32)> = vec![(root_title.to_string(), 0)];
        let pb = ProgressBar::new_spinner();

        info!(root = root_title, "Starting crawl");

        while let Some((title, depth)) = worklist.pop() {
            pb.set_message(title.clone());
            let discovered = self.crawl_category(&title, depth, &mut seen_children)?;
            worklist.extend(discovered.into_iter().rev().map(|child| (child, depth + 1)));
            pb.tick();
        }

        pb.finish_and_clear();
        info!(
            categories = self.stats.categories(),
            pages = self.stats.members(),
            "Crawl complete"
        );
        Ok(())
    }

    /// Stores one category's members and metadata; returns children not seen before.
    fn crawl_category(
        &mut self,
        title: &str,
        depth: u32,
        seen_children: &mut FxHashSet<String>,
    ) -> Result<Vec<String>> {
        info!(category = title, depth, "Crawling category");
        self.stats.inc_categories();

        let mut discovered = Vec::new();
        let mut item: Option<String> = None;
        let mut first_page = true;

        for page in api::query(&mut *self.api, category_members_params(title)) {
            let page = page.with_context(|| format!("Failed to list members of {}", title))?;
            self.stats.inc_api_pages();

            if first_page {
                item = wikibase_item_of(&page);
                first_page = false;
            }

            for (ns, member) in members_of(&page) {
                match classify_member(ns, member) {
                    Member::ChildCategory(child) => {
                        self.store.append(Dimension::Children, title, &child)?;
                        self.stats.inc_child_links();
                        if seen_children.insert(child.clone()) {
                            discovered.push(child);
                        }
                    }
                    Member::UserPage(user) => {
                        self.store.append(Dimension::Pages, title, &user)?;
                        self.stats.inc_member_pages();
                    }
                    Member::Ignored => {
                        debug!(category = title, ns, member, "Ignoring member");
                        self.stats.inc_ignored();
                    }
                }
            }
        }

        self.resolve_metadata(title, item)?;
        Ok(discovered)
    }

    /// item -> geography (P2633) -> coordinates (P625) and OSM relation (P402).
    fn resolve_metadata(&mut self, title: &str, item: Option<String>) -> Result<()> {
        let Some(item) = item else {
            warn!(category = title, "No Wikidata item");
            return Ok(());
        };
        self.store.replace(Dimension::WikidataItem, title, &item)?;
        self.stats.inc_wikidata_items();

        let geography = match self.claim(title, &item, PROP_GEOGRAPHY) {
            Some(ClaimValue::Item(id)) => id,
            Some(other) => {
                warn!(category = title, item = %item, value = ?other, "Geography claim is not an item");
                return Ok(());
            }
            None => {
                warn!(category = title, item = %item, "No geography claim");
                return Ok(());
            }
        };
        self.store.replace(Dimension::GeographyItem, title, &geography)?;
        self.stats.inc_geography_items();

        match self.claim(title, &geography, PROP_COORDINATES) {
            Some(ClaimValue::Coordinate(ll)) => {
                self.store.replace(Dimension::LatLng, title, &ll.to_string())?;
                self.stats.inc_coordinates();
            }
            Some(other) => {
                warn!(category = title, geography = %geography, value = ?other, "Coordinate claim is not a coordinate");
            }
            None => warn!(category = title, geography = %geography, "No coordinate claim"),
        }

        match self.claim(title, &geography, PROP_OSM_RELATION) {
            Some(value) => {
                self.store
                    .replace(Dimension::OsmId, title, &value.to_store_line())?;
                self.stats.inc_osm_ids();
            }
            None => warn!(category = title, geography = %geography, "No OpenStreetMap relation claim"),
        }

        Ok(())
    }

    /// Claim lookup where a failed request only costs this category its metadata.
    fn claim(&mut self, title: &str, entity: &str, property: &str) -> Option<ClaimValue> {
        match self.api.first_claim_value(entity, property) {
            Ok(value) => value,
            Err(e) => {
                error!(category = title, entity, property, error = ?e, "Claim lookup failed");
                self.stats.inc_metadata_errors();
                None
            }
        }
    }
}
