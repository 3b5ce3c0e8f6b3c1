//! catmap: Wikipedia category tree → geocoded JSON map dataset
//!
//! Two passes over a category tree:
//!
//! 1. **Crawl** -- Page through `categorymembers` for the root category and every
//!    sub-category below it. Record user pages, child categories and the Wikidata
//!    item → geography → coordinate/OSM chain in a file-backed [`store::CategoryStore`]
//! 2. **Aggregate** -- Walk the stored tree offline. Compute each category's
//!    transitive page count and depth, then attach coordinates
//! 3. **Emit** -- Write the resulting [`models::MapArea`] list as `data.min.js` and `data.js`
//!
//! # Key Modules
//!
//! - [`api`] -- `WikiApi` trait, continuation paging, blocking MediaWiki/Wikidata client
//! - [`store`] -- Append-only per-dimension line store with path-safe title keys
//! - [`crawl`] -- Depth-first category crawl
//! - [`aggregate`] -- Transitive counts with cycle detection
//! - [`emit`] -- JSON output
//! - [`models`] -- `MapArea`, `LatLng`, claim values, namespace classification
//! - [`stats`] -- Crawl counters
//! - [`config`] -- Constants and run configuration
//!
//! # Example Usage
//!
//! ```bash
//! # Crawl, aggregate and write public/data.js + public/data.min.js
//! catmap "Categoria:Utenti per regione - Italia"
//!
//! # Rebuild the output from an existing store without touching the network
//! catmap --offline "Categoria:Utenti per regione - Italia"
//! ```

pub mod aggregate;
pub mod api;
pub mod config;
pub mod crawl;
pub mod emit;
pub mod models;
pub mod stats;
pub mod store;
