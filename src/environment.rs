use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};

use tracing::{debug, warn};

/// The complete environment handed to the subcommand. Built once, applied
/// with `env_clear` so the orchestrator's own environment is never mutated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChildEnv {
    vars: BTreeMap<OsString, OsString>,
}

impl ChildEnv {
    pub fn inherit() -> Self {
        Self::from_vars(std::env::vars_os())
    }

    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        ChildEnv {
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Overlay raw `KEY=VALUE` entries in order; a later entry for the same
    /// key wins. Entries without `=`, or with an empty key, are skipped.
    pub fn overlay<S: AsRef<str>>(mut self, entries: &[S]) -> Self {
        for entry in entries {
            let entry = entry.as_ref();
            match parse_assignment(entry) {
                Some((key, value)) => {
                    debug!(key, "exporting environment variable");
                    self.vars.insert(key.into(), value.into());
                }
                None => warn!(entry, "ignoring env entry that is not KEY=VALUE"),
            }
        }
        self
    }

    pub fn get(&self, key: impl AsRef<OsStr>) -> Option<&OsStr> {
        self.vars.get(key.as_ref()).map(OsString::as_os_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OsStr, &OsStr)> {
        self.vars.iter().map(|(k, v)| (k.as_os_str(), v.as_os_str()))
    }
}

// Split on the first '=' so values such as URLs with query strings survive.
fn parse_assignment(entry: &str) -> Option<(&str, &str)> {
    let (key, value) = entry.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key, value))
}
