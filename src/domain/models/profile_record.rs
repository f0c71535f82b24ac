// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// 档案记录实体
///
/// 一个被抓取的经纪人档案。`profile_url` 在同一作业内唯一，
/// 重复抓取同一URL时合并更新而不是插入新行。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    /// 所属作业ID
    pub job_id: Uuid,
    /// 档案页URL（自然键）
    pub profile_url: String,
    /// 来源站点标识
    pub source_site: String,
    /// 完整姓名
    pub full_name: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// 所属公司/经纪行
    pub company: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    /// 首选电话
    pub phone: Option<String>,
    /// 页面上出现的所有电话
    pub phones: Vec<String>,
    /// 首选邮箱
    pub email: Option<String>,
    /// 页面上出现的所有邮箱
    pub emails: Vec<String>,
    /// 从业年限（正则提取，尽力而为）
    pub years_experience: Option<i32>,
    /// 成交数（正则提取，尽力而为）
    pub deals_closed: Option<i32>,
    /// 评价数
    pub review_count: Option<i32>,
    /// 站点特有的额外字段
    pub extra: Map<String, Value>,
}

impl ProfileRecord {
    /// 创建只含必需字段的档案记录
    pub fn new(job_id: Uuid, profile_url: String, source_site: String, full_name: String) -> Self {
        let (first_name, last_name) = split_name(&full_name);
        Self {
            job_id,
            profile_url,
            source_site,
            full_name,
            first_name,
            last_name,
            ..Default::default()
        }
    }

    /// 用较新的记录覆盖当前记录
    ///
    /// 只有较新记录中非空的字段才会覆盖，空值保留已有数据。
    /// 名和姓总是由合并后的完整姓名重新拆分。
    pub fn merge_from(&mut self, newer: &ProfileRecord) {
        if !newer.full_name.trim().is_empty() {
            self.full_name = newer.full_name.clone();
        }
        if !newer.source_site.is_empty() {
            self.source_site = newer.source_site.clone();
        }
        let (first_name, last_name) = split_name(&self.full_name);
        self.first_name = first_name;
        self.last_name = last_name;
        overwrite(&mut self.company, &newer.company);
        overwrite(&mut self.city, &newer.city);
        overwrite(&mut self.state, &newer.state);
        overwrite(&mut self.phone, &newer.phone);
        overwrite(&mut self.email, &newer.email);
        overwrite(&mut self.years_experience, &newer.years_experience);
        overwrite(&mut self.deals_closed, &newer.deals_closed);
        overwrite(&mut self.review_count, &newer.review_count);
        if !newer.phones.is_empty() {
            self.phones = newer.phones.clone();
        }
        if !newer.emails.is_empty() {
            self.emails = newer.emails.clone();
        }
        for (key, value) in &newer.extra {
            if !value.is_null() {
                self.extra.insert(key.clone(), value.clone());
            }
        }
    }
}

fn overwrite<T: Clone>(current: &mut Option<T>, newer: &Option<T>) {
    if newer.is_some() {
        *current = newer.clone();
    }
}

/// 按第一个空格拆分姓名
///
/// "Jane Mary Doe" → ("Jane", "Mary Doe")；单个词只有名没有姓。
pub fn split_name(full_name: &str) -> (Option<String>, Option<String>) {
    let trimmed = full_name.trim();
    if trimmed.is_empty() {
        return (None, None);
    }
    match trimmed.split_once(char::is_whitespace) {
        Some((first, last)) => {
            let last = last.trim();
            (
                Some(first.to_string()),
                (!last.is_empty()).then(|| last.to_string()),
            )
        }
        None => (Some(trimmed.to_string()), None),
    }
}
