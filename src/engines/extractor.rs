// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::listing::RawListing;
use crate::domain::models::site::SiteProfile;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

const IMAGE_ATTRIBUTES: &[&str] = &["src", "data-src", "data-lazysrc", "data-original"];
const LAZY_IMAGE_SUFFIXES: &[&str] = &[".jpg_", ".jpeg_", ".png_", ".webp_"];

/// 从渲染后的列表页 HTML 中提取商品条目
///
/// 商品卡片选择器按顺序尝试，第一个命中的生效。缺少标题或价格文本的卡片被跳过，
/// 最多返回 `limit` 个条目。
///
/// # 参数
///
/// * `html` - 页面 HTML
/// * `profile` - 站点画像
/// * `page_url` - 页面地址，用于解析相对链接
/// * `limit` - 最大条目数
pub fn extract_listings(
    html: &str,
    profile: &SiteProfile,
    page_url: &str,
    limit: usize,
) -> Vec<RawListing> {
    if limit == 0 {
        return Vec::new();
    }

    let document = Html::parse_document(html);
    let base = Url::parse(page_url)
        .or_else(|_| Url::parse(&profile.base_url))
        .ok();

    let title_selectors = compile(&profile.title_selectors);
    let price_selectors = compile(&profile.price_selectors);
    let link_selectors = compile(&profile.link_selectors);
    let image_selectors = compile(&profile.image_selectors);

    let item_selectors = compile(&profile.item_selectors);
    let items = item_selectors
        .iter()
        .map(|s| document.select(s).collect::<Vec<_>>())
        .find(|found| !found.is_empty())
        .unwrap_or_default();
    debug!(count = items.len(), site = %profile.name, "Matched listing items");

    let mut listings = Vec::new();
    for item in items {
        if listings.len() >= limit {
            break;
        }

        let link = first_match(item, &link_selectors);
        let title = first_text(item, &title_selectors)
            .or_else(|| link.and_then(|a| a.value().attr("title")).map(str::to_string))
            .unwrap_or_default();
        let price_text = first_text(item, &price_selectors).unwrap_or_default();
        if title.trim().is_empty() || price_text.trim().is_empty() {
            continue;
        }

        let url = link
            .and_then(|a| a.value().attr("href"))
            .and_then(|href| resolve(base.as_ref(), href))
            .unwrap_or_else(|| page_url.to_string());

        let image = first_image(item, &image_selectors, base.as_ref());
        listings.push(RawListing {
            title,
            price_text,
            url,
            image_alt: image.as_ref().and_then(|(_, alt)| alt.clone()),
            image_url: image.map(|(src, _)| src),
        });
    }

    listings
}

fn compile(selectors: &[String]) -> Vec<Selector> {
    selectors
        .iter()
        .filter_map(|s| match Selector::parse(s) {
            Ok(selector) => Some(selector),
            Err(e) => {
                warn!(selector = %s, error = %e, "Ignoring invalid CSS selector");
                None
            }
        })
        .collect()
}

fn first_match<'a>(item: ElementRef<'a>, selectors: &[Selector]) -> Option<ElementRef<'a>> {
    selectors.iter().find_map(|s| item.select(s).next())
}

fn first_text(item: ElementRef<'_>, selectors: &[Selector]) -> Option<String> {
    selectors.iter().find_map(|s| {
        item.select(s)
            .map(|el| el.text().collect::<String>().trim().to_string())
            .find(|text| !text.is_empty())
    })
}

/// 第一张可用图片的地址及其 `alt` 文本
fn first_image(
    item: ElementRef<'_>,
    selectors: &[Selector],
    base: Option<&Url>,
) -> Option<(String, Option<String>)> {
    selectors.iter().flat_map(|s| item.select(s)).find_map(|img| {
        let src = IMAGE_ATTRIBUTES
            .iter()
            .filter_map(|attr| img.value().attr(attr))
            .map(str::trim)
            .filter(|src| !src.is_empty() && !src.starts_with("data:"))
            .find_map(|src| resolve(base, src))?;
        let alt = img
            .value()
            .attr("alt")
            .map(str::trim)
            .filter(|alt| !alt.is_empty())
            .map(str::to_string);
        Some((strip_lazy_suffix(&src), alt))
    })
}

/// 解析相对地址和协议相对地址（`//cdn...`）
fn resolve(base: Option<&Url>, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with("javascript:") {
        return None;
    }
    match base {
        Some(base) => base.join(href).ok().map(String::from),
        None => Url::parse(href).ok().map(String::from),
    }
}

/// 去掉懒加载缩略图后缀，例如 `a.jpg_200x200q80.avif` 还原为 `a.jpg`
fn strip_lazy_suffix(src: &str) -> String {
    for suffix in LAZY_IMAGE_SUFFIXES {
        if let Some(pos) = src.find(suffix) {
            return src[..pos + suffix.len() - 1].to_string();
        }
    }
    src.to_string()
}
