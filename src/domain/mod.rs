// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域层模块
///
/// - 领域模型（models）：作业、档案记录和站点配置
/// - 仓库接口（repositories）：持久化抽象接口
/// - 服务（services）：页面解析相关的领域服务
///
/// 领域层不依赖任何外部实现。
pub mod models;
pub mod repositories;
pub mod services;
