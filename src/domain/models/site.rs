// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 内置站点类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteKind {
    Daraz,
    Amazon,
}

impl fmt::Display for SiteKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SiteKind::Daraz => write!(f, "daraz"),
            SiteKind::Amazon => write!(f, "amazon"),
        }
    }
}

/// 站点画像
///
/// 描述一个电商站点的地址和列表页选择器。各选择器按顺序尝试，
/// 第一个命中的选择器生效。
#[derive(Debug, Clone)]
pub struct SiteProfile {
    /// 展示名称，写入商品记录的 `source`
    pub name: String,
    /// 站点根地址
    pub base_url: String,
    /// 商品卡片选择器
    pub item_selectors: Vec<String>,
    /// 标题选择器
    pub title_selectors: Vec<String>,
    /// 价格选择器
    pub price_selectors: Vec<String>,
    /// 商品链接选择器
    pub link_selectors: Vec<String>,
    /// 图片选择器
    pub image_selectors: Vec<String>,
    /// 页面出现这些文本时认为被验证码拦截
    pub captcha_markers: Vec<String>,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl SiteProfile {
    /// 根据站点类型构建内置画像
    pub fn for_kind(kind: SiteKind) -> Self {
        match kind {
            SiteKind::Daraz => Self::daraz(),
            SiteKind::Amazon => Self::amazon(),
        }
    }

    /// Daraz 站点画像
    pub fn daraz() -> Self {
        Self {
            name: "Daraz".to_string(),
            base_url: "https://www.daraz.pk".to_string(),
            item_selectors: strings(&[
                "[data-qa-locator=\"product-item\"]",
                ".gridItem--YqX5D",
                ".ant-col-5",
            ]),
            title_selectors: strings(&[
                "a[href*=\"/products/\"]",
                ".product-card__name",
                ".title",
                ".name",
            ]),
            price_selectors: strings(&[
                ".product-card__price-current",
                ".ooOxS",
                "[class*=\"price\"]",
            ]),
            link_selectors: strings(&["a[href*=\"/products/\"]", "a"]),
            image_selectors: strings(&["img"]),
            captcha_markers: strings(&["punish", "captcha"]),
        }
    }

    /// Amazon 站点画像
    pub fn amazon() -> Self {
        Self {
            name: "Amazon".to_string(),
            base_url: "https://www.amazon.com".to_string(),
            item_selectors: strings(&[
                "[data-component-type=\"s-search-result\"]",
                ".s-result-item[data-asin]",
                ".s-card-container",
            ]),
            title_selectors: strings(&[
                "h2 a span",
                "h2 span",
                ".a-size-medium",
                ".a-size-base-plus",
            ]),
            price_selectors: strings(&[".a-price .a-offscreen", ".a-price-whole"]),
            link_selectors: strings(&["h2 a", "a.a-link-normal"]),
            image_selectors: strings(&["img.s-image"]),
            captcha_markers: strings(&["api-services-support@amazon.com", "captcha"]),
        }
    }

    /// 覆盖站点根地址
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// 拼接分类列表页地址
    pub fn category_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// 页面内容是否像验证码拦截页
    pub fn looks_like_captcha(&self, page: &str) -> bool {
        let page = page.to_lowercase();
        self.captcha_markers
            .iter()
            .any(|marker| page.contains(&marker.to_lowercase()))
    }
}
