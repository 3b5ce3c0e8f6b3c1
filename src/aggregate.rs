use crate::models::MapArea;
use crate::store::{CategoryStore, Dimension};
use anyhow::{bail, Result};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, info};

/// State of one aggregation walk.
#[derive(Default)]
struct Walk {
    /// Finalized areas in post-order
    areas: Vec<MapArea>,
    index: FxHashMap<String, usize>,
    /// Titles on the current recursion path, root first
    path: Vec<String>,
    on_path: FxHashSet<String>,
}

/// Builds map areas from a populated store. Never touches the network.
pub struct Aggregator<'a> {
    store: &'a CategoryStore,
}

impl<'a> Aggregator<'a> {
    pub fn new(store: &'a CategoryStore) -> Self {
        Self { store }
    }

    /// One [`MapArea`] per category reachable from `root_title`, children before parents.
    ///
    /// A category reachable through several parents is finalized once (first depth
    /// wins). Its count is added under every parent. A category that reaches itself
    /// is an error.
    pub fn aggregate(&self, root_title: &str) -> Result<Vec<MapArea>> {
        let mut walk = Walk::default();
        let total = self.visit(root_title, 0, &mut walk)?;

        for area in &mut walk.areas {
            area.lat_lng = self.store.read_lat_lng(&area.title);
            area.osm_id = self.store.read_scalar(Dimension::OsmId, &area.title);
        }

        info!(
            root = root_title,
            total,
            areas = walk.areas.len(),
            "Aggregation complete"
        );
        Ok(walk.areas)
    }

    /// Returns the transitive page count of `title`.
    fn visit(&self, title: &str, depth: u32, walk: &mut Walk) -> Result<u64> {
        if let Some(&i) = walk.index.get(title) {
            debug!(category = title, depth, "Already aggregated via another parent");
            return Ok(walk.areas[i].count);
        }
        if !walk.on_path.insert(title.to_string()) {
            bail!(
                "Cycle detected in category tree: {} -> {}",
                walk.path.join(" -> "),
                title
            );
        }
        walk.path.push(title.to_string());

        let mut count = self.store.read_list(Dimension::Pages, title).len() as u64;
        for child in self.store.read_ordered(Dimension::Children, title) {
            count += self.visit(&child, depth + 1, walk)?;
        }

        walk.path.pop();
        walk.on_path.remove(title);

        walk.index.insert(title.to_string(), walk.areas.len());
        walk.areas.push(MapArea::new(title, count, depth));
        Ok(count)
    }
}
