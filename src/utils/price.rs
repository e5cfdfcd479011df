// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::utils::errors::MalformedDataError;
use once_cell::sync::Lazy;
use regex::Regex;

// 第一个数字开头、由数字和分隔符组成的片段
static PRICE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d[\d.,'\u{00A0}\u{202F}]*").expect("Failed to compile price regex"));

/// 解析带货币符号和本地化分隔符的价格文本
///
/// 支持 `Rs. 1,299`、`$1,299.99`、`1.299,00 €` 等格式。最后一个 `.` 或 `,`
/// 后面恰好三位数字时视为千位分隔符，否则视为小数点。
pub fn parse_price(text: &str) -> Result<f64, MalformedDataError> {
    let token = PRICE_TOKEN
        .find(text)
        .map(|m| m.as_str().trim_end_matches(|c: char| !c.is_ascii_digit()))
        .ok_or_else(|| MalformedDataError::UnparseablePrice(text.trim().to_string()))?;

    let normalized = normalize_number(token);
    let price: f64 = normalized
        .parse()
        .map_err(|_| MalformedDataError::UnparseablePrice(text.trim().to_string()))?;

    if !price.is_finite() || price < 0.0 {
        return Err(MalformedDataError::PriceOutOfRange(price));
    }
    Ok(price)
}

fn normalize_number(token: &str) -> String {
    let decimal_at = token.rfind(&['.', ','][..]).filter(|&pos| {
        let fraction_len = token[pos + 1..].chars().filter(char::is_ascii_digit).count();
        fraction_len != 3
    });

    match decimal_at {
        Some(pos) => {
            let integer: String = token[..pos].chars().filter(char::is_ascii_digit).collect();
            let fraction: String = token[pos + 1..].chars().filter(char::is_ascii_digit).collect();
            let integer = if integer.is_empty() { "0".to_string() } else { integer };
            format!("{}.{}", integer, fraction)
        }
        None => token.chars().filter(char::is_ascii_digit).collect(),
    }
}
