// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use url::{ParseError, Url};

/// 将可能为相对路径的URL转换为绝对路径URL
pub fn resolve_url(base_url: &Url, path: &str) -> Result<Url, ParseError> {
    base_url.join(path)
}

/// 将链接归一化为可比较的绝对URL
///
/// 忽略锚点、mailto/tel/javascript 链接和非 http(s) 协议；
/// 去掉片段，按需去掉查询串，并去掉路径末尾的斜杠。
pub fn normalize_link(base_url: &Url, href: &str, strip_query: bool) -> Option<Url> {
    let href = href.trim();
    if href.is_empty()
        || href.starts_with('#')
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("javascript:")
    {
        return None;
    }

    let mut url = resolve_url(base_url, href).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }

    url.set_fragment(None);
    if strip_query {
        url.set_query(None);
    }

    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        url.set_path(path.trim_end_matches('/'));
    }

    Some(url)
}

/// 判断两个URL是否属于同一站点（忽略 www. 前缀）
pub fn same_site(a: &Url, b: &Url) -> bool {
    let strip = |host: &str| host.trim_start_matches("www.").to_ascii_lowercase();
    match (a.host_str(), b.host_str()) {
        (Some(x), Some(y)) => strip(x) == strip(y),
        _ => false,
    }
}
