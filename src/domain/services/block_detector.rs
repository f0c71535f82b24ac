// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::site_profile::SiteProfile;
use crate::domain::services::selectors::visible_text;
use scraper::Html;

/// 命中的封锁特征
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSignal {
    pub phrase: String,
}

impl std::fmt::Display for BlockSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "blocked by target site (matched \"{}\")", self.phrase)
    }
}

/// CAPTCHA/封锁页面检测器
///
/// 对页面可见文本做小写子串匹配。命中后整个作业应当终止，
/// 继续请求只会让封锁升级。
#[derive(Debug, Clone)]
pub struct BlockDetector {
    phrases: Vec<String>,
}

impl BlockDetector {
    pub fn new(profile: &SiteProfile) -> Self {
        Self::with_phrases(profile.block_phrases.iter().cloned())
    }

    pub fn with_phrases(phrases: impl IntoIterator<Item = String>) -> Self {
        Self {
            phrases: phrases
                .into_iter()
                .map(|phrase| phrase.trim().to_lowercase())
                .filter(|phrase| !phrase.is_empty())
                .collect(),
        }
    }

    /// 检测页面是否为封锁/验证页面
    pub fn detect(&self, html: &str) -> Option<BlockSignal> {
        if self.phrases.is_empty() {
            return None;
        }
        let document = Html::parse_document(html);
        let text = visible_text(&document).to_lowercase();
        self.phrases
            .iter()
            .find(|phrase| text.contains(phrase.as_str()))
            .map(|phrase| BlockSignal {
                phrase: phrase.clone(),
            })
    }
}
