use crate::error::{PulseError, Result};
use crate::model::CommitType;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const LOCAL_CONFIG: &str = ".gitpulse.toml";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub repository: RepositoryConfig,
    pub git: GitConfig,
    pub issues: IssuesConfig,
    pub output: OutputConfig,
    pub classifier: ClassifierConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Local clone to analyse; the current directory when unset.
    pub path: Option<PathBuf>,
    pub owner: String,
    pub name: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct GitConfig {
    pub binary: String,
    /// humantime syntax, e.g. "2m" or "90s".
    pub timeout: String,
    /// Commit cap for the numstat-based type analysis.
    pub max_count: Option<usize>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct IssuesConfig {
    pub api_base: String,
    pub state: String,
    pub labels: String,
    pub per_page: u32,
    pub max_pages: u32,
    pub timeout: String,
    pub user_agent: String,
    /// Environment variable holding a token sent as a bearer header.
    pub token_env: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ClassifierConfig {
    pub priority: Vec<CommitType>,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            path: None,
            owner: "pallets".to_string(),
            name: "flask".to_string(),
        }
    }
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            binary: "git".to_string(),
            timeout: "2m".to_string(),
            max_count: Some(500),
        }
    }
}

impl Default for IssuesConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            state: "closed".to_string(),
            labels: "bug".to_string(),
            per_page: 100,
            max_pages: 1,
            timeout: "30s".to_string(),
            user_agent: concat!("gitpulse/", env!("CARGO_PKG_VERSION")).to_string(),
            token_env: Some("GITHUB_TOKEN".to_string()),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("analysis"),
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            priority: CommitType::PRIORITY.to_vec(),
        }
    }
}

impl Config {
    /// Load the first config file found: `explicit`, then `./.gitpulse.toml`,
    /// then `<config dir>/gitpulse/config.toml`. Defaults when none exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(PulseError::Config(format!(
                    "config file {} does not exist",
                    path.display()
                )));
            }
            return Self::from_file(path);
        }

        let local = Path::new(LOCAL_CONFIG);
        if local.exists() {
            return Self::from_file(local);
        }

        if let Some(dir) = dirs::config_dir() {
            let global = dir.join("gitpulse/config.toml");
            if global.exists() {
                return Self::from_file(&global);
            }
        }

        tracing::debug!("no config file found, using defaults");
        Ok(Config::default())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.git.timeout()?;
        self.issues.timeout()?;
        if self.issues.per_page == 0 || self.issues.per_page > 100 {
            return Err(PulseError::Config(format!(
                "issues.per_page must be between 1 and 100, got {}",
                self.issues.per_page
            )));
        }
        Ok(())
    }
}

impl GitConfig {
    pub fn timeout(&self) -> Result<Duration> {
        parse_timeout("git.timeout", &self.timeout)
    }
}

impl IssuesConfig {
    pub fn timeout(&self) -> Result<Duration> {
        parse_timeout("issues.timeout", &self.timeout)
    }

    pub fn token(&self) -> Option<String> {
        self.token_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .filter(|t| !t.trim().is_empty())
    }
}

fn parse_timeout(key: &str, value: &str) -> Result<Duration> {
    humantime::parse_duration(value)
        .map_err(|e| PulseError::Config(format!("{key} = '{value}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_the_reference_project() {
        let config = Config::default();
        assert_eq!(config.repository.owner, "pallets");
        assert_eq!(config.repository.name, "flask");
        assert_eq!(config.issues.per_page, 100);
        assert_eq!(config.git.timeout().unwrap(), Duration::from_secs(120));
        assert_eq!(config.issues.timeout().unwrap(), Duration::from_secs(30));
        assert_eq!(config.classifier.priority, CommitType::PRIORITY.to_vec());
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = Config::from_toml(
            r#"
            [repository]
            path = "../flask"

            [git]
            timeout = "45s"

            [classifier]
            priority = ["bugfix", "feature"]
            "#,
        )
        .unwrap();

        assert_eq!(config.repository.path, Some(PathBuf::from("../flask")));
        assert_eq!(config.repository.owner, "pallets");
        assert_eq!(config.git.timeout().unwrap(), Duration::from_secs(45));
        assert_eq!(config.git.max_count, Some(500));
        assert_eq!(config.classifier.priority, vec![CommitType::Bugfix, CommitType::Feature]);
        assert_eq!(config.output.dir, PathBuf::from("analysis"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(Config::from_toml("[git]\ntimeout = \"soon\"").is_err());
        assert!(Config::from_toml("[issues]\nper_page = 0").is_err());
        assert!(Config::from_toml("[classifier]\npriority = [\"misc\"]").is_err());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("nope.toml")));
        assert!(matches!(err, Err(PulseError::Config(_))));
    }
}
