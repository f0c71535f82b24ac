// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 纯解析逻辑，不涉及网络和存储：
/// - 链接收集（link_collector）：从列表页收集档案URL
/// - 字段提取（field_extractor）：从档案页提取结构化字段
/// - 封锁检测（block_detector）：识别 CAPTCHA/封锁页面
/// - 选择器工具（selectors）：候选选择器和可见文本
pub mod block_detector;
pub mod field_extractor;
pub mod link_collector;
pub mod selectors;
