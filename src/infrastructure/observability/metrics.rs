// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics::describe_counter;

/// 注册指标描述
///
/// 未安装记录器时指标调用为空操作，由宿主进程决定是否导出
pub fn describe_metrics() {
    describe_counter!(
        "pricecrawl_listings_scraped_total",
        "Listings normalized and kept, by site"
    );
    describe_counter!(
        "pricecrawl_listings_dropped_total",
        "Listings dropped because title or price could not be normalized, by site"
    );
    describe_counter!(
        "pricecrawl_submissions_total",
        "Category batch submissions to the backend, by result"
    );
    describe_counter!(
        "pricecrawl_runs_total",
        "Scraper runs, by status (completed or skipped)"
    );
}
