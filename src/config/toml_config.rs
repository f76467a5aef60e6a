use crate::core::ConfigProvider;
use crate::domain::model::{Group, QuoteInputs, Toggle};
use crate::utils::error::{QuoteError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_non_negative, validate_path, validate_range, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

static ENV_VAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").unwrap());

/// 一份報價設定檔
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteConfig {
    pub engagement: QuoteInputs,
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Directory holding the three master CSV files.
    pub path: String,
    #[serde(default)]
    pub strict: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionConfig {
    #[serde(default)]
    pub groups: Vec<BulkSelection>,
    #[serde(default)]
    pub categories: Vec<BulkSelection>,
    #[serde(default)]
    pub tasks: Vec<TaskSelection>,
}

/// 群組或類別：字串代表勾選，表格可指定 `selected = false` 取消
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BulkSelection {
    Name(String),
    Entry {
        name: String,
        #[serde(default = "default_selected")]
        selected: bool,
    },
}

impl BulkSelection {
    pub fn name(&self) -> &str {
        match self {
            BulkSelection::Name(name) | BulkSelection::Entry { name, .. } => name,
        }
    }

    pub fn selected(&self) -> bool {
        match self {
            BulkSelection::Name(_) => true,
            BulkSelection::Entry { selected, .. } => *selected,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSelection {
    pub category: String,
    pub task: String,
    #[serde(default = "default_selected")]
    pub selected: bool,
}

fn default_selected() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub output_path: String,
}

impl QuoteConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => QuoteError::MissingConfigError {
                field: format!("quote file {}", path.display()),
            },
            _ => QuoteError::IoError(e),
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| QuoteError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${HOURLY_RATE})，未設定的保留原樣
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .to_string()
    }

    /// CLI 參數覆寫路徑
    pub fn apply_overrides(&mut self, catalog_dir: Option<String>, output_path: Option<String>) {
        if let Some(dir) = catalog_dir {
            self.catalog.path = dir;
        }
        if let Some(path) = output_path {
            self.export.output_path = path;
        }
    }

    fn parse_groups(&self) -> Result<Vec<(Group, bool)>> {
        self.selection
            .groups
            .iter()
            .map(|entry| {
                Group::parse(entry.name())
                    .map(|group| (group, entry.selected()))
                    .ok_or_else(|| QuoteError::InvalidConfigValueError {
                        field: "selection.groups".to_string(),
                        value: entry.name().to_string(),
                        reason: "Expected Common, Upstream or Downstream".to_string(),
                    })
            })
            .collect()
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        let e = &self.engagement;

        validate_non_empty_string("engagement.company_name", &e.company_name)?;
        validate_non_empty_string("engagement.scale_label", &e.scale_label)?;
        validate_range("engagement.hourly_rate", e.hourly_rate, 1, u64::MAX)?;
        validate_range("engagement.duration_months", e.duration_months, 1, 12)?;
        // 6 代表「超過 5 家」
        validate_range("engagement.group_company_count", e.group_company_count, 0, 6)?;
        validate_range("engagement.meeting_frequency", e.meeting_frequency, 0, 31)?;
        validate_range(
            "engagement.workshop_count",
            e.workshop_count,
            0,
            e.max_workshops(),
        )?;
        validate_non_negative("engagement.kickoff_hours", e.kickoff_hours)?;

        if e.language_support && !e.language_support_effective() {
            tracing::warn!("⚠️ language_support ignored: region does not include overseas sites");
        }

        validate_path("catalog.path", &self.catalog.path)?;
        validate_path("export.output_path", &self.export.output_path)?;

        self.parse_groups()?;
        for (idx, category) in self.selection.categories.iter().enumerate() {
            validate_non_empty_string(&format!("selection.categories[{}]", idx), category.name())?;
        }
        for (idx, task) in self.selection.tasks.iter().enumerate() {
            validate_non_empty_string(&format!("selection.tasks[{}].category", idx), &task.category)?;
            validate_non_empty_string(&format!("selection.tasks[{}].task", idx), &task.task)?;
        }

        Ok(())
    }

    /// Toggles in application order: groups, then categories, then tasks.
    pub fn selection_toggles(&self) -> Vec<Toggle> {
        let groups = self
            .selection
            .groups
            .iter()
            .filter_map(|entry| {
                Group::parse(entry.name()).map(|group| Toggle::Group {
                    group,
                    selected: entry.selected(),
                })
            });
        let categories = self.selection.categories.iter().map(|entry| Toggle::Category {
            category: entry.name().to_string(),
            selected: entry.selected(),
        });
        let tasks = self.selection.tasks.iter().map(|t| Toggle::Task {
            category: t.category.clone(),
            task: t.task.clone(),
            selected: t.selected,
        });

        groups.chain(categories).chain(tasks).collect()
    }
}

impl ConfigProvider for QuoteConfig {
    fn inputs(&self) -> &QuoteInputs {
        &self.engagement
    }

    fn catalog_path(&self) -> &str {
        &self.catalog.path
    }

    fn output_path(&self) -> &str {
        &self.export.output_path
    }

    fn toggles(&self) -> Vec<Toggle> {
        self.selection_toggles()
    }
}

impl Validate for QuoteConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
