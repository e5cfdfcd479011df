// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::run_state::ScraperIdentity;
use crate::utils::errors::MalformedDataError;
use crate::utils::price::parse_price;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const MAX_TITLE_CHARS: usize = 100;

const KNOWN_BRANDS: &[&str] = &[
    "Apple", "Samsung", "Xiaomi", "HP", "Dell", "Sony", "Logitech", "Infinix", "Techno", "Realme",
    "Oppo", "Vivo", "Anker", "Bose",
];

/// 抓取分类
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// 分类名称
    pub name: String,
    /// 列表页路径
    pub path: String,
}

impl Category {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// 页面上提取出的原始商品条目
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawListing {
    pub title: String,
    pub price_text: String,
    pub url: String,
    pub image_url: Option<String>,
    /// 商品图片的 alt 文本
    pub image_alt: Option<String>,
}

/// 规范化后的商品价格记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    /// 分类名称
    pub category: String,
    /// 商品标题
    pub title: String,
    /// 数值价格，非负
    pub price: f64,
    /// 商品详情地址
    pub source_url: String,
    /// 来源站点
    pub source: String,
    /// 品牌，未识别时为 "Generic"
    pub brand: String,
    /// 商品描述，取图片 alt 文本，没有时使用标题
    pub description: String,
    /// 商品图片
    pub image_url: Option<String>,
    /// 抓取时间
    pub scraped_at: DateTime<Utc>,
}

impl ListingRecord {
    /// 将原始条目规范化为价格记录
    ///
    /// 标题为空或价格无法解析时返回 `MalformedDataError`
    pub fn normalize(
        raw: &RawListing,
        category: &str,
        source: &str,
        scraped_at: DateTime<Utc>,
    ) -> Result<Self, MalformedDataError> {
        let title = clean_title(&raw.title);
        if title.is_empty() {
            return Err(MalformedDataError::MissingTitle);
        }
        let price = parse_price(&raw.price_text)?;
        let description = raw
            .image_alt
            .as_deref()
            .map(collapse_whitespace)
            .filter(|alt| !alt.is_empty())
            .unwrap_or_else(|| title.clone());

        Ok(Self {
            category: category.to_string(),
            brand: extract_brand(&title).to_string(),
            description,
            title,
            price,
            source_url: raw.url.clone(),
            source: source.to_string(),
            image_url: raw.image_url.clone(),
            scraped_at,
        })
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 取第一行、合并空白并截断到 100 个字符
fn clean_title(title: &str) -> String {
    let first_line = title.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    collapse_whitespace(first_line)
        .chars()
        .take(MAX_TITLE_CHARS)
        .collect()
}

/// 按已知品牌列表识别品牌
pub fn extract_brand(title: &str) -> &'static str {
    let lower = title.to_lowercase();
    KNOWN_BRANDS
        .iter()
        .find(|brand| lower.contains(&brand.to_lowercase()))
        .copied()
        .unwrap_or("Generic")
}

/// 一次提交给后端的分类批次
#[derive(Debug, Clone, Serialize)]
pub struct ListingBatch {
    /// 抓取器标识
    pub scraper: ScraperIdentity,
    /// 分类名称
    pub category: String,
    /// 商品记录
    pub listings: Vec<ListingRecord>,
}
