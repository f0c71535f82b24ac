// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::site_profile::{SiteProfile, SiteProfileError};
use crate::domain::services::selectors::compile_selectors;
use crate::utils::url_utils::{normalize_link, same_site};
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use tracing::debug;
use url::Url;

/// 档案链接收集器
///
/// 从列表页中按候选选择器收集档案链接，归一化为绝对URL，
/// 过滤掉不符合档案路径约定的链接，并用集合去重。
/// 返回顺序不保证与页面顺序一致。
pub struct ProfileLinkCollector {
    link_selectors: Vec<Selector>,
    next_page_selectors: Vec<Selector>,
    profile_path: Regex,
    excluded_fragments: Vec<String>,
    strip_query: bool,
}

impl ProfileLinkCollector {
    /// 根据站点配置创建收集器
    pub fn new(profile: &SiteProfile) -> Result<Self, SiteProfileError> {
        Ok(Self {
            link_selectors: compile_selectors(&profile.listing_link_selectors),
            next_page_selectors: compile_selectors(&profile.next_page_selectors),
            profile_path: profile.profile_path_regex()?,
            excluded_fragments: profile.excluded_path_fragments.clone(),
            strip_query: profile.strip_query,
        })
    }

    /// 收集列表页中的档案URL
    ///
    /// # 参数
    ///
    /// * `html` - 列表页HTML
    /// * `page_url` - 列表页URL，用于解析相对链接
    ///
    /// # 返回值
    ///
    /// 去重后的绝对档案URL；没有任何选择器命中时返回空列表
    pub fn collect(&self, html: &str, page_url: &Url) -> Vec<String> {
        let document = Html::parse_document(html);
        let mut found = HashSet::new();

        for selector in &self.link_selectors {
            for element in document.select(selector) {
                let Some(href) = element.value().attr("href") else {
                    continue;
                };
                let Some(url) = normalize_link(page_url, href, self.strip_query) else {
                    continue;
                };
                if self.is_profile_url(&url, page_url) {
                    found.insert(url.to_string());
                }
            }
        }

        debug!("Collected {} profile links from {}", found.len(), page_url);
        found.into_iter().collect()
    }

    /// 查找下一页列表URL
    pub fn next_page(&self, html: &str, page_url: &Url) -> Option<Url> {
        let document = Html::parse_document(html);
        self.next_page_selectors.iter().find_map(|selector| {
            document
                .select(selector)
                .filter_map(|element| element.value().attr("href"))
                .filter_map(|href| normalize_link(page_url, href, false))
                .find(|url| same_site(url, page_url) && url != page_url)
        })
    }

    /// 判断URL是否属于目标站点的档案路径约定
    pub fn is_profile_url(&self, url: &Url, page_url: &Url) -> bool {
        if !same_site(url, page_url) {
            return false;
        }
        let path = url.path();
        if self
            .excluded_fragments
            .iter()
            .any(|fragment| path.contains(fragment.as_str()))
        {
            return false;
        }
        self.profile_path.is_match(path)
    }
}
