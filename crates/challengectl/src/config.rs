use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use recordpatch::{OptionsError, PatchOptions};
use thiserror::Error;

const CONFIG_CANDIDATES: &[&str] = &[
    ".challengectl.yml",
    ".challengectl.yaml",
    "challengectl.yml",
    "challengectl.yaml",
];

#[derive(Error, Debug)]
#[error("configuration error in {path}")]
pub(crate) struct ConfigError {
    /// The path to the configuration file that caused this error.
    path: String,
    /// The source of this error.
    pub(crate) source: ConfigErrorInner,
}

#[derive(Error, Debug)]
pub(crate) enum ConfigErrorInner {
    /// An I/O error occurred while loading the config.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The options are syntactically or semantically invalid.
    #[error(transparent)]
    Options(#[from] OptionsError),
}

/// Runtime configuration, as loaded from a config file (or the defaults).
#[derive(Debug, Default)]
pub(crate) struct Config {
    pub(crate) options: PatchOptions,
    /// Where the config was loaded from, if anywhere.
    pub(crate) path: Option<Utf8PathBuf>,
}

impl Config {
    /// Loads the [`Config`] that applies to `near`.
    ///
    /// An explicit `--config` always wins. Otherwise, the config is
    /// discovered by walking up from `near` (if given) or the current
    /// directory.
    pub(crate) fn new(
        no_config: bool,
        explicit: Option<&Utf8Path>,
        near: Option<&Utf8Path>,
    ) -> Result<Self, ConfigError> {
        if no_config {
            tracing::debug!("config loading disabled");
            return Ok(Self::default());
        }

        if let Some(path) = explicit {
            return Self::load_file(path);
        }

        let dir = match near {
            Some(path) if path.is_dir() => path,
            Some(path) => match path.parent().map(|p| p.as_str()) {
                // `parent()` gives `Some("")` for bare filenames.
                Some("") | None => Utf8Path::new("."),
                Some(p) => p.into(),
            },
            None => Utf8Path::new("."),
        };

        match Self::discover_in_dir(dir).map_err(|err| ConfigError {
            path: dir.to_string(),
            source: err,
        })? {
            Some(path) => Self::load_file(&path),
            None => Ok(Self::default()),
        }
    }

    fn load_file(path: &Utf8Path) -> Result<Self, ConfigError> {
        tracing::debug!("loading config from `{path}`");

        let err = |source: ConfigErrorInner| ConfigError {
            path: path.to_string(),
            source,
        };

        let contents = fs::read_to_string(path).map_err(|e| err(e.into()))?;
        let options = PatchOptions::load(&contents).map_err(|e| err(e.into()))?;

        Ok(Self {
            options,
            path: Some(path.to_path_buf()),
        })
    }

    /// Walk up from `path` looking for a config file, stopping at the
    /// filesystem root or the first directory containing `.git`.
    fn discover_in_dir(path: &Utf8Path) -> Result<Option<Utf8PathBuf>, ConfigErrorInner> {
        tracing::debug!("attempting config discovery in `{path}`");

        let canonical = path.canonicalize_utf8()?;
        let mut candidate_path = canonical.as_path();

        loop {
            for candidate in CONFIG_CANDIDATES {
                let candidate_path = candidate_path.join(candidate);
                if candidate_path.is_file() {
                    tracing::debug!("found config candidate at `{candidate_path}`");
                    return Ok(Some(candidate_path));
                }
            }

            if candidate_path.join(".git").exists() {
                tracing::debug!("found `{candidate_path}/.git`, stopping search");
                return Ok(None);
            }

            let Some(parent) = candidate_path.parent() else {
                tracing::debug!("reached filesystem root without finding a config");
                return Ok(None);
            };

            candidate_path = parent;
        }
    }
}
