use std::path::PathBuf;

/// MediaWiki API of the wiki whose category tree is crawled
pub const DEFAULT_API_URL: &str = "https://it.wikipedia.org/w/api.php";

/// Wikibase API used for claim lookups
pub const DEFAULT_WIKIDATA_URL: &str = "https://www.wikidata.org/w/api.php";

pub const DEFAULT_USER_AGENT: &str = "catmap/0.1 (category map crawler)";

/// Root category crawled when none is given on the command line
pub const DEFAULT_ROOT_TITLE: &str = "Categoria:Utenti per regione - Italia";

pub const DEFAULT_STORE_DIR: &str = "store";
pub const DEFAULT_OUTPUT_DIR: &str = "public";

/// Minimum delay between two API requests
pub const DEFAULT_RATE_LIMIT_MS: u64 = 500;
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_MAX_RETRIES: usize = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1_000;

/// Wikidata property: geography of topic
pub const PROP_GEOGRAPHY: &str = "P2633";
/// Wikidata property: coordinate location
pub const PROP_COORDINATES: &str = "P625";
/// Wikidata property: OpenStreetMap relation ID
pub const PROP_OSM_RELATION: &str = "P402";

pub const NS_USER: i64 = 2;
pub const NS_USER_TALK: i64 = 3;
pub const NS_CATEGORY: i64 = 14;

/// Encoded store keys longer than this are shortened and suffixed with a digest
pub const MAX_KEY_LEN: usize = 200;
/// Encoded prefix kept in front of the digest for shortened keys
pub const HASHED_KEY_PREFIX_LEN: usize = 120;

pub const MINIFIED_OUTPUT: &str = "data.min.js";
pub const PRETTY_OUTPUT: &str = "data.js";

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_url: String,
    pub wikidata_url: String,
    pub user_agent: String,
    pub timeout_ms: u64,
    pub rate_limit_ms: u64,
    pub max_retries: usize,
    pub retry_delay_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            wikidata_url: DEFAULT_WIKIDATA_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            rate_limit_ms: DEFAULT_RATE_LIMIT_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
        }
    }
}

/// Everything a run needs, built once by the binary and handed to each component.
#[derive(Debug, Clone)]
pub struct Config {
    pub store_dir: PathBuf,
    pub output_dir: PathBuf,
    pub api: ApiConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from(DEFAULT_STORE_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            api: ApiConfig::default(),
        }
    }
}
