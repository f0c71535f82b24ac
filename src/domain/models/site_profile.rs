// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// 站点配置错误
#[derive(Error, Debug)]
pub enum SiteProfileError {
    #[error("Unknown site profile: {0}")]
    UnknownSite(String),
    #[error("Failed to read site profile: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid site profile YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid profile path pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// 每个字段的候选选择器，按优先级排列
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldSelectors {
    pub name: Vec<String>,
    pub company: Vec<String>,
    /// "City, ST" 形式的位置文本
    pub location: Vec<String>,
    pub city: Vec<String>,
    pub state: Vec<String>,
    pub phone: Vec<String>,
    pub email: Vec<String>,
}

/// 目标站点约定
///
/// 列表页、档案页的选择器和路径约定都以数据形式描述，
/// 站点改版时只需更新配置。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteProfile {
    /// 站点标识，写入每条档案记录的 `source_site`
    pub name: String,
    /// 列表页中档案链接的选择器
    pub listing_link_selectors: Vec<String>,
    /// 档案页路径必须匹配的正则
    pub profile_path_pattern: String,
    /// 命中即排除的路径片段
    #[serde(default)]
    pub excluded_path_fragments: Vec<String>,
    /// 下一页链接的选择器
    #[serde(default)]
    pub next_page_selectors: Vec<String>,
    /// 字段选择器
    #[serde(default)]
    pub fields: FieldSelectors,
    /// 站点特有字段的选择器
    #[serde(default)]
    pub extra_fields: BTreeMap<String, Vec<String>>,
    /// 封锁页面特征短语（小写匹配）
    #[serde(default)]
    pub block_phrases: Vec<String>,
    /// 归一化档案URL时是否去掉查询串
    #[serde(default = "default_strip_query")]
    pub strip_query: bool,
}

fn default_strip_query() -> bool {
    true
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl SiteProfile {
    /// 房地产经纪人目录的内置配置
    pub fn realtor() -> Self {
        let mut extra_fields = BTreeMap::new();
        extra_fields.insert(
            "specializations".to_string(),
            strings(&["[data-testid=\"agent-specializations\"]", ".agent-specializations"]),
        );
        extra_fields.insert(
            "languages".to_string(),
            strings(&["[data-testid=\"agent-languages\"]", ".agent-languages"]),
        );
        extra_fields.insert(
            "price_range".to_string(),
            strings(&["[data-testid=\"price-range\"]", ".price-range"]),
        );

        Self {
            name: "realtor".to_string(),
            listing_link_selectors: strings(&[
                "[data-testid=\"component-agentCard\"] a[href]",
                "a.agent-name[href]",
                ".agent-list-card a[href]",
                "a[href*=\"/realestateagents/\"]",
            ]),
            profile_path_pattern: r"^/realestateagents/[0-9a-fA-F]{16,}".to_string(),
            excluded_path_fragments: strings(&["/search/", "/office/", "/pg-", "/agentreviews"]),
            next_page_selectors: strings(&[
                "a[aria-label=\"Go to next page\"]",
                "a[rel=\"next\"]",
                "a.next-link",
            ]),
            fields: FieldSelectors {
                name: strings(&[
                    "[data-testid=\"agent-name\"]",
                    ".profile-details h2",
                    ".agent-name",
                    "h1",
                ]),
                company: strings(&[
                    "[data-testid=\"office-name\"]",
                    ".agent-company",
                    ".broker-name",
                ]),
                location: strings(&[
                    "[data-testid=\"agent-address\"]",
                    ".agent-location",
                    ".profile-address",
                ]),
                city: Vec::new(),
                state: Vec::new(),
                phone: strings(&["[data-testid=\"agent-phone\"]", ".agent-phone"]),
                email: strings(&["[data-testid=\"agent-email\"]", ".agent-email"]),
            },
            extra_fields,
            block_phrases: strings(&[
                "captcha",
                "access denied",
                "are you a robot",
                "unusual traffic",
                "pardon our interruption",
                "verify you are a human",
                "request blocked",
            ]),
            strip_query: true,
        }
    }

    /// 按名称获取内置配置
    pub fn builtin(name: &str) -> Result<Self, SiteProfileError> {
        match name {
            "realtor" => Ok(Self::realtor()),
            other => Err(SiteProfileError::UnknownSite(other.to_string())),
        }
    }

    /// 从 YAML 文本解析
    pub fn from_yaml_str(yaml: &str) -> Result<Self, SiteProfileError> {
        let profile: SiteProfile = serde_yaml::from_str(yaml)?;
        profile.profile_path_regex()?;
        Ok(profile)
    }

    /// 从 YAML 文件加载
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, SiteProfileError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// 按配置解析：有文件路径时读文件，否则用内置配置
    pub fn resolve(name: &str, path: Option<&str>) -> Result<Self, SiteProfileError> {
        match path {
            Some(path) => Self::from_yaml_file(path),
            None => Self::builtin(name),
        }
    }

    /// 编译档案路径正则
    pub fn profile_path_regex(&self) -> Result<Regex, SiteProfileError> {
        Ok(Regex::new(&self.profile_path_pattern)?)
    }
}
