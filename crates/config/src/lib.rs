//! Layered configuration.
//!
//! Layers, lowest priority first:
//!
//! 1. built-in defaults;
//! 2. `config.toml` in the user's config directory (`~/.config/zimdb/` on Linux);
//! 3. an explicit file passed on the command line (TOML, YAML or JSON);
//! 4. `ZIMDB_` environment variables, nested keys separated by `__`
//!    (`ZIMDB_CONVERT__WORKERS=8`).
//!
//! Command-line flags are applied on top by the binary.

pub mod error;

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use zimdb_assets::{AssetPolicy, MAX_INLINE_BYTES, Profile};

const ENV_PREFIX: &str = "ZIMDB_";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub convert: ConvertConfig,
    pub assets: AssetsConfig,
    pub pageviews: PageviewsConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// Paths starting with this are articles of the default namespace.
    pub article_prefix: String,
    /// Paths starting with any of these are internal and never stored.
    pub internal_prefixes: Vec<String>,
    /// Minimum decoded body length, in characters.
    pub min_content_length: usize,
    /// Minimum title length, in characters.
    pub min_title_length: usize,
    /// Entries per shard in parallel mode.
    pub batch_size: u32,
    /// Processed entries between commits.
    pub commit_interval: usize,
    /// `1` converts sequentially into the output; more runs shards in parallel.
    pub workers: usize,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            article_prefix: "A/".to_string(),
            internal_prefixes: ["-", "M/", "X/", "W/"].map(String::from).to_vec(),
            min_content_length: 100,
            min_title_length: 2,
            batch_size: 5000,
            commit_interval: 1000,
            workers: 1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    pub inline_images: bool,
    /// Recompression profile; implies `inline_images`.
    pub recompress: Option<Profile>,
    pub inline_stylesheets: bool,
    pub max_inline_bytes: usize,
    pub recompress_timeout_secs: u64,
    /// Explicit path to ImageMagick, instead of searching `PATH`.
    pub tool: Option<PathBuf>,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            inline_images: false,
            recompress: None,
            inline_stylesheets: false,
            max_inline_bytes: MAX_INLINE_BYTES,
            recompress_timeout_secs: 10,
            tool: None,
        }
    }
}

impl AssetsConfig {
    pub fn policy(&self) -> AssetPolicy {
        AssetPolicy::from_flags(self.inline_images, self.recompress)
    }

    pub fn recompress_timeout(&self) -> Duration {
        Duration::from_secs(self.recompress_timeout_secs)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageviewsConfig {
    /// Lines with a lower monthly total are dropped.
    pub min_monthly_views: u64,
    /// Domain allow-list, e.g. `en.wikipedia`.
    pub domains: Vec<String>,
    /// Input lines between commits.
    pub commit_interval: usize,
}

impl Default for PageviewsConfig {
    fn default() -> Self {
        Self { min_monthly_views: 500, domains: vec!["en.wikipedia".to_string()], commit_interval: 10_000 }
    }
}

impl Config {
    /// Load every layer; `explicit` must exist if given.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let user = Self::user_config_path().filter(|path| path.is_file());
        Self::load_from(user.as_deref(), explicit)
    }

    fn load_from(user: Option<&Path>, explicit: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = user {
            tracing::debug!(path = %path.display(), "Loading user configuration");
            figment = merge_file(figment, path)?;
        }
        if let Some(path) = explicit {
            if !path.is_file() {
                exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
            }
            figment = merge_file(figment, path)?;
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment.extract().or_raise(|| ErrorKind::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// `config.toml` in the platform's per-user configuration directory.
    pub fn user_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "zimdb").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<&str> = Vec::new();
        if self.convert.article_prefix.is_empty() {
            errors.push("convert.article_prefix must not be empty");
        }
        if self.convert.batch_size == 0 {
            errors.push("convert.batch_size must be positive");
        }
        if self.convert.commit_interval == 0 {
            errors.push("convert.commit_interval must be positive");
        }
        if self.convert.workers == 0 {
            errors.push("convert.workers must be positive");
        }
        if self.assets.recompress_timeout_secs == 0 {
            errors.push("assets.recompress_timeout_secs must be positive");
        }
        if self.pageviews.commit_interval == 0 {
            errors.push("pageviews.commit_interval must be positive");
        }
        if !errors.is_empty() {
            exn::bail!(ErrorKind::Invalid(errors.join("; ")));
        }
        Ok(())
    }
}

fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
    let extension = path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase);
    Ok(match extension.as_deref() {
        Some("toml") => figment.merge(Toml::file_exact(path)),
        Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path)),
        Some("json") => figment.merge(Json::file_exact(path)),
        _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.convert.batch_size, 5000);
        assert_eq!(config.convert.min_content_length, 100);
        assert_eq!(config.assets.policy(), AssetPolicy::Disabled);
        assert_eq!(config.pageviews.domains, ["en.wikipedia"]);
    }

    #[rstest]
    #[case("zimdb.toml", "[convert]\nworkers = 4\n\n[assets]\nrecompress = \"moderate\"\n")]
    #[case("zimdb.yaml", "convert:\n  workers: 4\nassets:\n  recompress: moderate\n")]
    #[case("zimdb.json", r#"{"convert": {"workers": 4}, "assets": {"recompress": "moderate"}}"#)]
    fn explicit_files_override_defaults(#[case] name: &str, #[case] contents: &str) {
        Jail::expect_with(|jail| {
            jail.create_file(name, contents)?;
            let config = Config::load_from(None, Some(Path::new(name))).unwrap();
            assert_eq!(config.convert.workers, 4);
            assert_eq!(config.convert.batch_size, 5000, "unset keys keep their defaults");
            assert_eq!(config.assets.policy(), AssetPolicy::Recompress(Profile::Moderate));
            Ok(())
        });
    }

    #[test]
    fn environment_beats_files() {
        Jail::expect_with(|jail| {
            jail.create_file("user.toml", "[convert]\nworkers = 2\nbatch_size = 100\n")?;
            jail.create_file("explicit.toml", "[convert]\nworkers = 3\n")?;
            jail.set_env("ZIMDB_CONVERT__WORKERS", "8");
            let config = Config::load_from(Some(Path::new("user.toml")), Some(Path::new("explicit.toml"))).unwrap();
            assert_eq!(config.convert.workers, 8);
            assert_eq!(config.convert.batch_size, 100);
            Ok(())
        });
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = Config::load_from(None, Some(Path::new("/nonexistent/zimdb.toml"))).unwrap_err();
        assert!(matches!(*err, ErrorKind::NotFound(_)));
    }

    #[test]
    fn unknown_extensions_are_rejected() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        let err = Config::load_from(None, Some(file.path())).unwrap_err();
        assert!(matches!(*err, ErrorKind::UnsupportedFormat(_)));
    }

    #[test]
    fn zero_workers_are_invalid() {
        Jail::expect_with(|jail| {
            jail.create_file("zimdb.toml", "[convert]\nworkers = 0\n")?;
            let err = Config::load_from(None, Some(Path::new("zimdb.toml"))).unwrap_err();
            assert!(matches!(&*err, ErrorKind::Invalid(message) if message.contains("workers")));
            Ok(())
        });
    }

    #[test]
    fn unknown_profiles_fail_to_parse() {
        Jail::expect_with(|jail| {
            jail.create_file("zimdb.toml", "[assets]\nrecompress = \"lossless\"\n")?;
            let err = Config::load_from(None, Some(Path::new("zimdb.toml"))).unwrap_err();
            assert!(matches!(*err, ErrorKind::Parse));
            Ok(())
        });
    }
}
