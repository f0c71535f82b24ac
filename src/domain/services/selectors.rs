// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use scraper::{ElementRef, Html, Selector};
use tracing::warn;

/// 编译一组候选选择器，保持原有顺序
///
/// 无法解析的选择器会被跳过并记录警告，不影响其余候选。
pub fn compile_selectors(candidates: &[String]) -> Vec<Selector> {
    candidates
        .iter()
        .filter_map(|raw| match Selector::parse(raw) {
            Ok(selector) => Some(selector),
            Err(e) => {
                warn!("Skipping invalid selector {:?}: {:?}", raw, e);
                None
            }
        })
        .collect()
}

/// 元素的可见文本，连续空白折叠为单个空格
pub fn element_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// 依次尝试候选选择器，返回第一个去除空白后非空的文本
pub fn first_text(document: &Html, selectors: &[Selector]) -> Option<String> {
    selectors.iter().find_map(|selector| {
        document
            .select(selector)
            .map(|element| element_text(&element))
            .find(|text| !text.is_empty())
    })
}

/// 整个文档的可见文本
///
/// 跳过 script/style/noscript/template 内的文本节点。
pub fn visible_text(document: &Html) -> String {
    let mut out = String::new();
    for node in document.tree.nodes() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor.value().as_element().is_some_and(|element| {
                matches!(element.name(), "script" | "style" | "noscript" | "template")
            })
        });
        if hidden {
            continue;
        }
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(trimmed);
        }
    }
    out
}
