//! 配置模块，负责加载搜索配置JSON文件
//!
//! ```json
//! {
//!   "tables": { "Control": "controls" },
//!   "states": {
//!     "Control": { "values": ["Draft", "Deprecated", "Active"] },
//!     "CycleTaskGroupObjectTask": { "field": "Task State", "values": ["Assigned", "Finished"] }
//!   },
//!   "main_query_type": "values"
//! }
//! ```

use crate::request::QueryType;
use crate::status_filter::{StateRegistry, StateVocabulary};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// 模型名到SQL表名的映射，供SQL预览使用
    #[serde(default)]
    pub tables: HashMap<String, String>,
    /// 每个模型的有效状态
    #[serde(default)]
    pub states: HashMap<String, StateVocabulary>,
    #[serde(default)]
    pub main_query_type: QueryType,
}

impl SearchConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config = serde_json::from_str(&content).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::debug!(path = %path.display(), "loaded search config");
        Ok(config)
    }

    /// 加载 `path`，任何错误都回退到 [`SearchConfig::default`]
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::from_json_file(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "using default search config");
                Self::default()
            }
        }
    }

    /// 获取模型对应的表名，未配置时使用小写的模型名
    pub fn table_name(&self, model_name: &str) -> String {
        self.tables
            .get(model_name)
            .cloned()
            .unwrap_or_else(|| model_name.to_lowercase())
    }

    pub fn state_registry(&self) -> StateRegistry {
        StateRegistry::new(self.states.clone())
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        let mut tables = HashMap::new();
        for (model, table) in [
            ("Control", "controls"),
            ("Risk", "risks"),
            ("Requirement", "requirements"),
            ("Standard", "standards"),
            ("Regulation", "regulations"),
            ("Program", "programs"),
            ("Audit", "audits"),
            ("Assessment", "assessments"),
            ("Issue", "issues"),
            ("CycleTaskGroupObjectTask", "cycle_task_group_object_tasks"),
        ] {
            tables.insert(model.to_string(), table.to_string());
        }

        let basic = StateVocabulary::new(&["Draft", "Deprecated", "Active"]);
        let mut states = HashMap::new();
        for model in ["Control", "Risk", "Requirement", "Standard", "Regulation", "Program"] {
            states.insert(model.to_string(), basic.clone());
        }
        states.insert(
            "Audit".to_string(),
            StateVocabulary::new(&[
                "Planned",
                "In Progress",
                "Manager Review",
                "Ready for External Review",
                "Completed",
                "Deprecated",
            ]),
        );
        states.insert(
            "Assessment".to_string(),
            StateVocabulary::new(&[
                "Not Started",
                "In Progress",
                "In Review",
                "Verified",
                "Completed",
                "Deprecated",
                "Rework Needed",
            ]),
        );
        states.insert(
            "Issue".to_string(),
            StateVocabulary::new(&["Draft", "Deprecated", "Active", "Fixed", "Fixed and Verified"]),
        );
        states.insert(
            "CycleTaskGroupObjectTask".to_string(),
            StateVocabulary::new(&["Assigned", "In Progress", "Finished", "Declined", "Deprecated", "Verified"])
                .with_field("Task State"),
        );

        Self {
            tables,
            states,
            main_query_type: QueryType::Values,
        }
    }
}
