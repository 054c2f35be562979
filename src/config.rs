use ini::{Ini, ParseOption, Properties};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const DEFAULT_CONFIG_PATH: &str = "~/.cfdtunnel/config";
pub const DEFAULT_LOCAL_PORT: &str = "5555";

#[derive(Debug, Clone, Default)]
struct ProfileSection {
    host: Option<String>,
    port: Option<String>,
    env: Vec<String>,
}

impl ProfileSection {
    fn from_properties(props: &Properties) -> Self {
        ProfileSection {
            host: props.get("host").map(str::to_string),
            port: props.get("port").map(str::to_string),
            // `env` repeats; every occurrence is kept in file order.
            env: props
                .get_all("env")
                .filter(|e| !e.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

/// A resolved profile: where to tunnel to, which local port to expose, and
/// the raw `KEY=VALUE` entries to overlay on the subcommand's environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelProfile {
    pub name: String,
    pub host: String,
    pub port: String,
    pub env_vars: Vec<String>,
}

#[derive(Debug)]
pub struct Config {
    path: PathBuf,
    profiles: BTreeMap<String, ProfileSection>,
}

impl Config {
    pub fn parse(path: impl Into<PathBuf>, contents: &str) -> Result<Self> {
        let path = path.into();
        // Backslashes are kept literally so values like Windows paths survive.
        let opt = ParseOption {
            enabled_escape: false,
            ..ParseOption::default()
        };
        let ini = match Ini::load_from_str_opt(contents, opt) {
            Ok(ini) => ini,
            Err(source) => return Err(Error::ConfigParse { path, source }),
        };

        let mut profiles = BTreeMap::new();
        for (name, props) in ini.iter() {
            // Keys above the first section header belong to no profile.
            if let Some(name) = name {
                let section = ProfileSection::from_properties(props);
                profiles.insert(name.to_string(), section);
            }
        }
        Ok(Config { path, profiles })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn profile_names(&self) -> Vec<String> {
        self.profiles.keys().cloned().collect()
    }

    /// Resolve a named section. A missing or empty port falls back to
    /// [`DEFAULT_LOCAL_PORT`]; `env` entries are kept verbatim and in order.
    pub fn profile(&self, name: &str) -> Result<TunnelProfile> {
        let section = self
            .profiles
            .get(name)
            .ok_or_else(|| Error::ProfileNotFound {
                profile: name.to_string(),
                path: self.path.clone(),
                available: self.profile_names(),
            })?;

        let host = section
            .host
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::MissingHost {
                profile: name.to_string(),
            })?;

        let port = match section.port.as_deref().map(str::trim) {
            Some(p) if !p.is_empty() => p.to_string(),
            _ => DEFAULT_LOCAL_PORT.to_string(),
        };

        Ok(TunnelProfile {
            name: name.to_string(),
            host: host.to_string(),
            port,
            env_vars: section.env.clone(),
        })
    }
}

pub fn expand_config_path(p: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(p).to_string())
}

pub fn load_config(config_path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(config_path).map_err(|source| Error::ConfigRead {
        path: config_path.to_path_buf(),
        source,
    })?;
    Config::parse(config_path, &contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
[alias1]
host=https://kubernetes.foo.bar.com
port=1234

[alias2]
host = sql.foo.bar.com

[empty-port]
host = db.foo.bar.com
port =

[single-env]
host = api.foo.bar.com
env = MY_ENV_VAR=value

[multi-env]
host = api.foo.bar.com
env = MY_ENV_VAR=value
env = HTTPS_PROXY=socks5://127.0.0.1:5555
env = IGNORED:value

[quoted]
host = \"api.foo.bar.com\"
env = PATH_HINT=C:\\tools\\bin

[no-host]
port = 1234
";

    fn sample() -> Config {
        Config::parse("/tmp/cfdtunnel-test", SAMPLE).expect("sample config parses")
    }

    #[test]
    fn resolves_complete_profile() {
        let profile = sample().profile("alias1").unwrap();
        assert_eq!(
            profile,
            TunnelProfile {
                name: "alias1".into(),
                host: "https://kubernetes.foo.bar.com".into(),
                port: "1234".into(),
                env_vars: vec![],
            }
        );
    }

    #[test]
    fn missing_port_uses_default() {
        let profile = sample().profile("alias2").unwrap();
        assert_eq!(profile.host, "sql.foo.bar.com");
        assert_eq!(profile.port, DEFAULT_LOCAL_PORT);
    }

    #[test]
    fn empty_port_uses_default() {
        assert_eq!(sample().profile("empty-port").unwrap().port, "5555");
    }

    #[test]
    fn repeated_env_keys_keep_declaration_order_and_malformed_entries() {
        let config = sample();
        assert_eq!(
            config.profile("single-env").unwrap().env_vars,
            vec!["MY_ENV_VAR=value".to_string()]
        );
        assert_eq!(
            config.profile("multi-env").unwrap().env_vars,
            vec![
                "MY_ENV_VAR=value".to_string(),
                "HTTPS_PROXY=socks5://127.0.0.1:5555".to_string(),
                "IGNORED:value".to_string(),
            ]
        );
    }

    #[test]
    fn quotes_are_stripped_and_backslashes_kept() {
        let profile = sample().profile("quoted").unwrap();
        assert_eq!(profile.host, "api.foo.bar.com");
        assert_eq!(
            profile.env_vars,
            vec!["PATH_HINT=C:\\tools\\bin".to_string()]
        );
    }

    #[test]
    fn unknown_profile_is_not_found() {
        let err = sample().profile("missing").unwrap_err();
        match err {
            Error::ProfileNotFound {
                profile, available, ..
            } => {
                assert_eq!(profile, "missing");
                assert!(available.contains(&"alias1".to_string()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn profile_without_host_is_rejected() {
        assert!(matches!(
            sample().profile("no-host"),
            Err(Error::MissingHost { .. })
        ));
    }

    #[test]
    fn keys_outside_sections_are_not_a_profile() {
        let config = Config::parse("/tmp/top", "host = stray\n[db]\nhost = db\n").unwrap();
        assert_eq!(config.profile_names(), vec!["db"]);
    }

    #[test]
    fn unterminated_section_is_a_parse_error() {
        let err = Config::parse("/tmp/bad", "[alias1\nhost = x\n").unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("config")).unwrap_err();
        assert!(matches!(err, Error::ConfigRead { .. }));
    }

    #[test]
    fn empty_file_has_no_profiles() {
        let config = Config::parse("/tmp/empty", "").unwrap();
        assert!(config.profile_names().is_empty());
    }

    #[test]
    fn tilde_expands_to_home() {
        let expanded = expand_config_path(DEFAULT_CONFIG_PATH);
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.ends_with(".cfdtunnel/config"));
    }
}
