use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 运行时配置：默认值 -> 可选 TOML 文件 -> 命令行覆盖
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP 监听地址（只用于本地表单）
    pub bind: String,

    /// 模型目录：churn_model.json / feature_names.json / policy.json
    pub model_dir: PathBuf,

    /// "Key factors" 的阈值
    pub insights: InsightThresholds,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            model_dir: PathBuf::from("models/churn"),
            insights: InsightThresholds::default(),
        }
    }
}

impl Config {
    pub fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("read config: {}", path.display()))?;
        let cfg: Config =
            toml::from_str(&s).with_context(|| format!("parse config: {}", path.display()))?;
        Ok(cfg)
    }

    /// Load `path` if given, otherwise defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) => Self::from_toml_file(p),
            None => Ok(Self::default()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightThresholds {
    /// tenure 严格小于该值才提示
    pub short_tenure_months: u32,
    /// 月费严格大于该值才提示
    pub high_monthly_charges: f64,
}

impl Default for InsightThresholds {
    fn default() -> Self {
        Self {
            short_tenure_months: 12,
            high_monthly_charges: 70.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            model_dir = "/srv/churn"

            [insights]
            high_monthly_charges = 80.0
            "#,
        )
        .unwrap();
        assert_eq!(cfg.bind, "127.0.0.1:8080");
        assert_eq!(cfg.model_dir, PathBuf::from("/srv/churn"));
        assert_eq!(cfg.insights.short_tenure_months, 12);
        assert_eq!(cfg.insights.high_monthly_charges, 80.0);
    }

    #[test]
    fn load_without_path_is_default() {
        assert_eq!(Config::load(None).unwrap(), Config::default());
    }
}
