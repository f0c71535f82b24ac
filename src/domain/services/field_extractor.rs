// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::profile_record::{split_name, ProfileRecord};
use crate::domain::models::site_profile::SiteProfile;
use crate::domain::services::selectors::{compile_selectors, element_text, first_text, visible_text};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::{Map, Value};
use uuid::Uuid;

static TEL_LINKS: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href^="tel:"], a[href^="TEL:"]"#).unwrap());
static MAILTO_LINKS: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href^="mailto:"], a[href^="MAILTO:"]"#).unwrap());

static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\+?1[-.\s]?)?\(?\b([2-9]\d{2})\)?[-.\s]?(\d{3})[-.\s]?(\d{4})\b").unwrap()
});
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap());

// Stats are best-effort: any number followed by the keyword counts, so unrelated
// numbers near these words can leak in.
static DEALS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+)\s*(?:closed\s+)?(?:deals?|transactions?)").unwrap());
static YEARS_RE: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)(\d+)\+?\s*(?:years?|yrs?)\s+(?:of\s+)?experience").unwrap(),
        Regex::new(r"(?i)experience:?\s*(\d+)\+?\s*(?:years?|yrs?)").unwrap(),
    ]
});
static REVIEWS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(\d+)\s*reviews?").unwrap());

/// 从档案页提取的字段
///
/// 所有字段都是可选的；没有姓名的档案由调用方丢弃。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedProfile {
    pub full_name: Option<String>,
    pub company: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub phones: Vec<String>,
    pub emails: Vec<String>,
    pub years_experience: Option<i32>,
    pub deals_closed: Option<i32>,
    pub review_count: Option<i32>,
    pub extra: Map<String, Value>,
}

impl ExtractedProfile {
    /// 转换为档案记录，没有姓名时返回 `None`
    pub fn into_record(
        self,
        job_id: Uuid,
        profile_url: String,
        source_site: &str,
    ) -> Option<ProfileRecord> {
        let full_name = self.full_name?;
        let (first_name, last_name) = split_name(&full_name);
        Some(ProfileRecord {
            job_id,
            profile_url,
            source_site: source_site.to_string(),
            full_name,
            first_name,
            last_name,
            company: self.company,
            city: self.city,
            state: self.state,
            phone: self.phones.first().cloned(),
            phones: self.phones,
            email: self.emails.first().cloned(),
            emails: self.emails,
            years_experience: self.years_experience,
            deals_closed: self.deals_closed,
            review_count: self.review_count,
            extra: self.extra,
        })
    }
}

/// 字段提取器
///
/// 每个字段持有一个按优先级排列的选择器列表，第一个得到非空文本的选择器胜出。
/// 电话和邮箱优先取 `tel:`/`mailto:` 链接，再退回到可见文本的正则扫描。
pub struct FieldExtractor {
    name: Vec<Selector>,
    company: Vec<Selector>,
    location: Vec<Selector>,
    city: Vec<Selector>,
    state: Vec<Selector>,
    phone: Vec<Selector>,
    email: Vec<Selector>,
    extra: Vec<(String, Vec<Selector>)>,
}

impl FieldExtractor {
    /// 根据站点配置创建提取器
    pub fn new(profile: &SiteProfile) -> Self {
        let fields = &profile.fields;
        Self {
            name: compile_selectors(&fields.name),
            company: compile_selectors(&fields.company),
            location: compile_selectors(&fields.location),
            city: compile_selectors(&fields.city),
            state: compile_selectors(&fields.state),
            phone: compile_selectors(&fields.phone),
            email: compile_selectors(&fields.email),
            extra: profile
                .extra_fields
                .iter()
                .map(|(key, selectors)| (key.clone(), compile_selectors(selectors)))
                .collect(),
        }
    }

    /// 提取档案字段
    pub fn extract(&self, html: &str) -> ExtractedProfile {
        let document = Html::parse_document(html);
        let text = visible_text(&document);

        let (mut city, mut state) = first_text(&document, &self.location)
            .map(|location| split_location(&location))
            .unwrap_or_default();
        if let Some(value) = first_text(&document, &self.city) {
            city = Some(value);
        }
        if let Some(value) = first_text(&document, &self.state) {
            state = Some(value);
        }

        let mut extra = Map::new();
        for (key, selectors) in &self.extra {
            if let Some(value) = first_text(&document, selectors) {
                extra.insert(key.clone(), Value::String(value));
            }
        }

        ExtractedProfile {
            full_name: first_text(&document, &self.name),
            company: first_text(&document, &self.company),
            city,
            state,
            phones: self.extract_phones(&document, &text),
            emails: self.extract_emails(&document, &text),
            years_experience: YEARS_RE.iter().find_map(|re| capture_number(re, &text)),
            deals_closed: capture_number(&DEALS_RE, &text),
            review_count: capture_number(&REVIEWS_RE, &text),
            extra,
        }
    }

    fn extract_phones(&self, document: &Html, text: &str) -> Vec<String> {
        // tel: anchors are authoritative
        let from_links: Vec<String> = document
            .select(&TEL_LINKS)
            .filter_map(|element| element.value().attr("href"))
            .filter_map(|href| normalize_phone(strip_scheme(href, "tel:")))
            .collect();
        if !from_links.is_empty() {
            return dedup(from_links);
        }

        let from_selectors: Vec<String> = self
            .phone
            .iter()
            .flat_map(|selector| document.select(selector))
            .map(|element| element_text(&element))
            .flat_map(|value| phones_in(&value))
            .collect();
        if !from_selectors.is_empty() {
            return dedup(from_selectors);
        }

        dedup(phones_in(text))
    }

    fn extract_emails(&self, document: &Html, text: &str) -> Vec<String> {
        let from_links: Vec<String> = document
            .select(&MAILTO_LINKS)
            .filter_map(|element| element.value().attr("href"))
            .filter_map(|href| normalize_email(strip_scheme(href, "mailto:")))
            .collect();
        if !from_links.is_empty() {
            return dedup(from_links);
        }

        let from_selectors: Vec<String> = self
            .email
            .iter()
            .flat_map(|selector| document.select(selector))
            .map(|element| element_text(&element))
            .flat_map(|value| emails_in(&value))
            .collect();
        if !from_selectors.is_empty() {
            return dedup(from_selectors);
        }

        dedup(emails_in(text))
    }
}

fn strip_scheme<'a>(href: &'a str, scheme: &str) -> &'a str {
    let href = href.trim();
    if href.len() >= scheme.len() && href[..scheme.len()].eq_ignore_ascii_case(scheme) {
        &href[scheme.len()..]
    } else {
        href
    }
}

/// 归一化电话号码：只保留数字和开头的 `+`
fn normalize_phone(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let mut out = String::new();
    for (i, c) in raw.chars().enumerate() {
        if c.is_ascii_digit() || (i == 0 && c == '+') {
            out.push(c);
        }
    }
    let digits = out.chars().filter(char::is_ascii_digit).count();
    (digits >= 7).then_some(out)
}

/// 归一化邮箱：去掉查询参数并转为小写
fn normalize_email(raw: &str) -> Option<String> {
    let address = raw.split('?').next().unwrap_or_default().trim();
    (address.contains('@') && !address.starts_with('@')).then(|| address.to_lowercase())
}

fn phones_in(text: &str) -> Vec<String> {
    PHONE_RE
        .captures_iter(text)
        .map(|caps| format!("{}{}{}", &caps[1], &caps[2], &caps[3]))
        .collect()
}

fn emails_in(text: &str) -> Vec<String> {
    EMAIL_RE
        .find_iter(text)
        .filter_map(|m| normalize_email(m.as_str()))
        .collect()
}

fn capture_number(re: &Regex, text: &str) -> Option<i32> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn dedup(values: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    values
        .into_iter()
        .filter(|value| seen.insert(value.clone()))
        .collect()
}

/// 拆分 "City, ST 98101" 或 "123 Main St, City, ST" 形式的位置
fn split_location(location: &str) -> (Option<String>, Option<String>) {
    let parts: Vec<&str> = location
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();

    match parts.as_slice() {
        [] => (None, None),
        [only] => (Some(only.to_string()), None),
        [.., city, state] => {
            let state = state.split_whitespace().next().map(str::to_string);
            (Some(city.to_string()), state)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> FieldExtractor {
        FieldExtractor::new(&SiteProfile::realtor())
    }

    const PROFILE: &str = r#"
        <html><head><title>Jane Doe - Realtor</title></head><body>
          <h1 data-testid="agent-name">  Jane   Doe </h1>
          <div data-testid="office-name">Acme Realty Group</div>
          <div data-testid="agent-address">Seattle, WA 98101</div>
          <p>Call the front desk at (425) 555-0000 for showings.</p>
          <a href="tel:2065551234">Call Jane</a>
          <a href="mailto:Jane.Doe@Example.com?subject=Hello">Email</a>
          <section>
            <span>12 years of experience</span>
            <span>85 closed deals</span>
            <span>31 reviews</span>
          </section>
          <div data-testid="agent-languages">English, Spanish</div>
        </body></html>
    "#;

    #[test]
    fn test_extracts_full_profile() {
        let extracted = extractor().extract(PROFILE);

        assert_eq!(extracted.full_name.as_deref(), Some("Jane Doe"));
        assert_eq!(extracted.company.as_deref(), Some("Acme Realty Group"));
        assert_eq!(extracted.city.as_deref(), Some("Seattle"));
        assert_eq!(extracted.state.as_deref(), Some("WA"));
        assert_eq!(extracted.emails, vec!["jane.doe@example.com".to_string()]);
        assert_eq!(extracted.years_experience, Some(12));
        assert_eq!(extracted.deals_closed, Some(85));
        assert_eq!(extracted.review_count, Some(31));
        assert_eq!(extracted.extra["languages"], Value::String("English, Spanish".into()));
    }

    #[test]
    fn test_tel_anchor_wins_over_visible_digits() {
        let extracted = extractor().extract(PROFILE);
        assert_eq!(extracted.phones, vec!["2065551234".to_string()]);

        let record = extracted
            .into_record(Uuid::new_v4(), "https://example.com/a".into(), "realtor")
            .unwrap();
        assert_eq!(record.phone.as_deref(), Some("2065551234"));
        assert_eq!(record.first_name.as_deref(), Some("Jane"));
        assert_eq!(record.last_name.as_deref(), Some("Doe"));
    }

    #[test]
    fn test_falls_back_to_text_scan() {
        let html = r#"<html><body><h1>Bob Smith</h1>
            <p>Reach me: 206.555.9876 or bob@smithhomes.com</p></body></html>"#;
        let extracted = extractor().extract(html);

        assert_eq!(extracted.phones, vec!["2065559876".to_string()]);
        assert_eq!(extracted.emails, vec!["bob@smithhomes.com".to_string()]);
    }

    #[test]
    fn test_missing_fields_stay_none() {
        let extracted = extractor().extract("<html><body><h1>Solo Agent</h1></body></html>");

        assert_eq!(extracted.full_name.as_deref(), Some("Solo Agent"));
        assert!(extracted.company.is_none());
        assert!(extracted.city.is_none());
        assert!(extracted.phones.is_empty());
        assert!(extracted.years_experience.is_none());
    }

    #[test]
    fn test_profile_without_name_is_not_a_record() {
        let html = r#"<html><body>
            <div class="agent-company">Acme</div>
            <a href="tel:2065551234">call</a></body></html>"#;
        let extracted = extractor().extract(html);

        assert!(extracted.full_name.is_none());
        assert_eq!(extracted.company.as_deref(), Some("Acme"));
        assert!(extracted
            .into_record(Uuid::new_v4(), "https://example.com/a".into(), "realtor")
            .is_none());
    }

    #[test]
    fn test_split_location_variants() {
        assert_eq!(
            split_location("123 Main St, Bellevue, WA 98004"),
            (Some("Bellevue".into()), Some("WA".into()))
        );
        assert_eq!(split_location("Tacoma"), (Some("Tacoma".into()), None));
        assert_eq!(split_location(" , "), (None, None));
    }
}
