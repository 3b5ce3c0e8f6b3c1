use crate::config::{HASHED_KEY_PREFIX_LEN, MAX_KEY_LEN};
use crate::models::LatLng;
use anyhow::{bail, Context, Result};
use rustc_hash::FxHashSet;
use sha2::{Digest, Sha256};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{trace, warn};

/// One logical key -> lines mapping inside the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Pages,
    Children,
    WikidataItem,
    GeographyItem,
    LatLng,
    OsmId,
}

impl Dimension {
    pub const ALL: [Dimension; 6] = [
        Dimension::Pages,
        Dimension::Children,
        Dimension::WikidataItem,
        Dimension::GeographyItem,
        Dimension::LatLng,
        Dimension::OsmId,
    ];

    pub fn dir_name(self) -> &'static str {
        match self {
            Dimension::Pages => "pages",
            Dimension::Children => "children",
            Dimension::WikidataItem => "wikidata-item",
            Dimension::GeographyItem => "geography-item",
            Dimension::LatLng => "latlng",
            Dimension::OsmId => "osm-id",
        }
    }
}

/// Turns a title into a filename that cannot escape its dimension directory.
///
/// Everything but `[A-Za-z0-9_~-]` is percent-encoded, dots included, so the key
/// is never `.`/`..` and never holds a separator. Keys over [`MAX_KEY_LEN`] bytes are
/// cut and suffixed with `+<sha256>`; `+` never appears in a plain key.
pub fn encode_key(title: &str) -> Result<String> {
    if title.is_empty() {
        bail!("Cannot store an empty title");
    }
    let encoded = urlencoding::encode(title).replace('.', "%2E");
    if encoded.len() <= MAX_KEY_LEN {
        return Ok(encoded);
    }
    let digest = hex::encode(Sha256::digest(title.as_bytes()));
    Ok(format!("{}+{}", &encoded[..HASHED_KEY_PREFIX_LEN], digest))
}

/// Recovers the title from a plain key. Hashed keys are one-way and give `None`.
pub fn decode_key(key: &str) -> Option<String> {
    if key.contains('+') {
        return None;
    }
    urlencoding::decode(key).ok().map(|s| s.into_owned())
}

/// File-backed, append-only category store: `<root>/<dimension>/<key>`.
pub struct CategoryStore {
    root: PathBuf,
}

impl CategoryStore {
    /// Opens (creating if needed) the store directory and one sub-directory per dimension.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        for dim in Dimension::ALL {
            let dir = root.join(dim.dir_name());
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create store directory: {:?}", dir))?;
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, dim: Dimension, title: &str) -> Result<PathBuf> {
        Ok(self.root.join(dim.dir_name()).join(encode_key(title)?))
    }

    /// Appends one line and syncs it to disk before returning.
    pub fn append(&self, dim: Dimension, title: &str, line: &str) -> Result<()> {
        if line.contains(['\n', '\r']) {
            bail!("Refusing to store a multi-line value for {:?}: {:?}", title, line);
        }
        let path = self.path_for(dim, title)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open store file for append: {:?}", path))?;
        writeln!(file, "{}", line)
            .with_context(|| format!("Failed to append to store file: {:?}", path))?;
        file.sync_data()
            .with_context(|| format!("Failed to sync store file: {:?}", path))?;
        trace!(dimension = dim.dir_name(), title, line, "Appended");
        Ok(())
    }

    /// Overwrites a single-value entry atomically via rename.
    pub fn replace(&self, dim: Dimension, title: &str, value: &str) -> Result<()> {
        if value.contains(['\n', '\r']) {
            bail!("Refusing to store a multi-line value for {:?}: {:?}", title, value);
        }
        let path = self.path_for(dim, title)?;
        let tmp_path = path.with_extension("tmp");
        {
            let mut file = File::create(&tmp_path)
                .with_context(|| format!("Failed to create temp store file: {:?}", tmp_path))?;
            writeln!(file, "{}", value)
                .with_context(|| format!("Failed to write temp store file: {:?}", tmp_path))?;
            file.sync_data()
                .with_context(|| format!("Failed to sync temp store file: {:?}", tmp_path))?;
        }
        fs::rename(&tmp_path, &path)
            .with_context(|| format!("Failed to rename temp store file to: {:?}", path))?;
        Ok(())
    }

    /// Trimmed, non-empty lines in file order. Missing or unreadable files read as empty.
    fn read_lines(&self, dim: Dimension, title: &str) -> Vec<String> {
        let path = match self.path_for(dim, title) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, title, "Invalid store key, treating as absent");
                return Vec::new();
            }
        };
        match fs::read_to_string(&path) {
            Ok(content) => content
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                warn!(error = %e, path = ?path, "Unreadable store file, treating as absent");
                Vec::new()
            }
        }
    }

    /// Unique values for `title`; order is not meaningful.
    pub fn read_list(&self, dim: Dimension, title: &str) -> FxHashSet<String> {
        self.read_lines(dim, title).into_iter().collect()
    }

    /// Unique values for `title` in first-seen order.
    pub fn read_ordered(&self, dim: Dimension, title: &str) -> Vec<String> {
        let mut seen = FxHashSet::default();
        self.read_lines(dim, title)
            .into_iter()
            .filter(|l| seen.insert(l.clone()))
            .collect()
    }

    pub fn read_scalar(&self, dim: Dimension, title: &str) -> Option<String> {
        self.read_lines(dim, title).into_iter().next()
    }

    pub fn read_lat_lng(&self, title: &str) -> Option<LatLng> {
        let raw = self.read_scalar(Dimension::LatLng, title)?;
        let parsed = LatLng::parse(&raw);
        if parsed.is_none() {
            warn!(title, value = raw, "Malformed coordinate in store, ignoring");
        }
        parsed
    }
}
