use std::sync::atomic::{AtomicU64, Ordering};

/// Counters collected while crawling
#[derive(Default)]
pub struct CrawlStats {
    pub categories_crawled: AtomicU64,
    pub api_pages: AtomicU64,
    pub member_pages: AtomicU64,
    pub child_links: AtomicU64,
    pub ignored_members: AtomicU64,
    pub wikidata_items: AtomicU64,
    pub geography_items: AtomicU64,
    pub coordinates: AtomicU64,
    pub osm_ids: AtomicU64,
    pub metadata_errors: AtomicU64,
}

impl CrawlStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_categories(&self) {
        self.categories_crawled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_api_pages(&self) {
        self.api_pages.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_member_pages(&self) {
        self.member_pages.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_child_links(&self) {
        self.child_links.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_ignored(&self) {
        self.ignored_members.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_wikidata_items(&self) {
        self.wikidata_items.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_geography_items(&self) {
        self.geography_items.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_coordinates(&self) {
        self.coordinates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_osm_ids(&self) {
        self.osm_ids.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_metadata_errors(&self) {
        self.metadata_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn categories(&self) -> u64 {
        self.categories_crawled.load(Ordering::Relaxed)
    }

    pub fn pages(&self) -> u64 {
        self.api_pages.load(Ordering::Relaxed)
    }

    pub fn members(&self) -> u64 {
        self.member_pages.load(Ordering::Relaxed)
    }

    pub fn children(&self) -> u64 {
        self.child_links.load(Ordering::Relaxed)
    }

    pub fn ignored(&self) -> u64 {
        self.ignored_members.load(Ordering::Relaxed)
    }

    pub fn items(&self) -> u64 {
        self.wikidata_items.load(Ordering::Relaxed)
    }

    pub fn geographies(&self) -> u64 {
        self.geography_items.load(Ordering::Relaxed)
    }

    pub fn coordinates(&self) -> u64 {
        self.coordinates.load(Ordering::Relaxed)
    }

    pub fn osm(&self) -> u64 {
        self.osm_ids.load(Ordering::Relaxed)
    }

    pub fn metadata_errors(&self) -> u64 {
        self.metadata_errors.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let stats = CrawlStats::new();
        assert_eq!(stats.categories(), 0);
        assert_eq!(stats.pages(), 0);
        assert_eq!(stats.members(), 0);
        assert_eq!(stats.osm(), 0);
    }

    #[test]
    fn counters_accumulate() {
        let stats = CrawlStats::new();
        stats.inc_categories();
        stats.inc_categories();
        stats.inc_api_pages();
        stats.inc_member_pages();
        stats.inc_child_links();
        stats.inc_ignored();
        stats.inc_wikidata_items();
        stats.inc_geography_items();
        stats.inc_coordinates();
        stats.inc_osm_ids();
        stats.inc_metadata_errors();

        assert_eq!(stats.categories(), 2);
        assert_eq!(stats.pages(), 1);
        assert_eq!(stats.members(), 1);
        assert_eq!(stats.children(), 1);
        assert_eq!(stats.ignored(), 1);
        assert_eq!(stats.items(), 1);
        assert_eq!(stats.geographies(), 1);
        assert_eq!(stats.coordinates(), 1);
        assert_eq!(stats.osm(), 1);
        assert_eq!(stats.metadata_errors(), 1);
    }
}
