use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use thiserror::Error;

/// Read-only mapping from Stack Exchange site id to API site slug.
#[derive(Debug, Clone, Default)]
pub struct SiteDirectory {
    slugs: HashMap<i64, String>,
}

#[derive(Debug, Error)]
pub enum SiteDirectoryError {
    #[error("failed to read site directory {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed site directory line {line_no}: {line:?}")]
    Malformed { line_no: usize, line: String },
    #[error("site id {site_id} listed twice (line {line_no})")]
    Duplicate { site_id: i64, line_no: usize },
    #[error("site directory contains no sites")]
    Empty,
}

impl SiteDirectory {
    pub fn load(path: &Path) -> Result<Self, SiteDirectoryError> {
        let contents = fs::read_to_string(path).map_err(|source| SiteDirectoryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents)
    }

    /// Parses `<id> <slug>` lines. Blank lines and `#` comments are skipped.
    pub fn parse(contents: &str) -> Result<Self, SiteDirectoryError> {
        let mut slugs = HashMap::new();
        for (idx, raw) in contents.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut parts = line.split_whitespace();
            let (Some(id), Some(slug), None) = (parts.next(), parts.next(), parts.next()) else {
                return Err(SiteDirectoryError::Malformed {
                    line_no,
                    line: raw.to_string(),
                });
            };
            let site_id = id
                .parse::<i64>()
                .map_err(|_| SiteDirectoryError::Malformed {
                    line_no,
                    line: raw.to_string(),
                })?;

            if slugs.insert(site_id, slug.to_string()).is_some() {
                return Err(SiteDirectoryError::Duplicate { site_id, line_no });
            }
        }

        if slugs.is_empty() {
            return Err(SiteDirectoryError::Empty);
        }
        Ok(Self { slugs })
    }

    pub fn slug(&self, site_id: i64) -> Option<&str> {
        self.slugs.get(&site_id).map(String::as_str)
    }

    /// Site ids in ascending order.
    pub fn site_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.slugs.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.slugs.len()
    }
}

impl<S: Into<String>> FromIterator<(i64, S)> for SiteDirectory {
    fn from_iter<I: IntoIterator<Item = (i64, S)>>(iter: I) -> Self {
        Self {
            slugs: iter.into_iter().map(|(id, slug)| (id, slug.into())).collect(),
        }
    }
}
