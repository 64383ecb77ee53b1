use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};

use crate::config::AppConfig;

#[derive(Debug, Clone)]
pub struct ResolvedPaths {
    pub logs_dir: PathBuf,
    pub sites_file: PathBuf,
    pub rules_file: Option<PathBuf>,
}

/// Creates the log directory and checks that configured input files exist.
pub fn resolve_paths(config: &AppConfig) -> Result<ResolvedPaths> {
    let logs_dir = ensure_dir(&config.directories.logs_dir)?;
    let sites_file = existing_file(&config.sites_file, "SITES_FILE")?;
    let rules_file = config
        .rules_file
        .as_deref()
        .map(|path| existing_file(path, "RULES_FILE"))
        .transpose()?;

    Ok(ResolvedPaths {
        logs_dir,
        sites_file,
        rules_file,
    })
}

fn ensure_dir(path: &str) -> Result<PathBuf> {
    let dir = PathBuf::from(path);
    if !dir.exists() {
        fs::create_dir_all(&dir).with_context(|| format!("failed to create directory {}", path))?;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(metadata) = fs::metadata(&dir) {
            let mut perms = metadata.permissions();
            perms.set_mode(0o755);
            let _ = fs::set_permissions(&dir, perms);
        }
    }
    Ok(dir.canonicalize().unwrap_or(dir))
}

fn existing_file(path: &str, var: &str) -> Result<PathBuf> {
    let file = Path::new(path);
    if !file.is_file() {
        bail!("{var} points to {}, which is not a readable file", file.display());
    }
    Ok(file.canonicalize().unwrap_or_else(|_| file.to_path_buf()))
}
