use crate::errors::ChartEngineError;
use chart_query::allow_list::{AllowList, ChartTable};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const DEFAULT_QUERY_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    pub tables: Vec<ChartTable>,
    /// Per query limit. Zero disables it.
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,
}

fn default_query_timeout_ms() -> u64 {
    DEFAULT_QUERY_TIMEOUT_MS
}

impl EngineConfig {
    pub fn new(tables: Vec<ChartTable>) -> EngineConfig {
        EngineConfig {
            tables,
            query_timeout_ms: DEFAULT_QUERY_TIMEOUT_MS,
        }
    }

    pub fn from_json_str(json: &str) -> Result<EngineConfig, ChartEngineError> {
        serde_json::from_str(json).map_err(|e| ChartEngineError::Config(e.to_string()))
    }

    pub fn from_json_file(path: &Path) -> Result<EngineConfig, ChartEngineError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| ChartEngineError::Config(format!("{}: {}", path.display(), e)))?;
        EngineConfig::from_json_str(&json)
    }

    pub fn query_timeout(&self) -> Option<Duration> {
        if self.query_timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.query_timeout_ms))
        }
    }

    pub fn allow_list(&self) -> Result<AllowList, ChartEngineError> {
        AllowList::new(self.tables.clone()).map_err(|e| ChartEngineError::Config(e.to_string()))
    }
}
