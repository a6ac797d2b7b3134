use serde::{Deserialize, Serialize};
use std::fmt;

/// Build selector at the artifact-fetcher boundary. Upstream catalogs
/// disagree on the shape: some number their builds, others name them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BuildId {
    Numeric(u32),
    Named(String),
}

impl fmt::Display for BuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildId::Numeric(n) => write!(f, "{}", n),
            BuildId::Named(s) => f.write_str(s),
        }
    }
}
