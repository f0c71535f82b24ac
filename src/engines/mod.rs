// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod browser_fetcher;
pub mod http_fetcher;
pub mod router;
pub mod stealth;
pub mod traits;
