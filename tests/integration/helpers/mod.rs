// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use parking_lot::Mutex;
use pricecrawl::domain::models::listing::{Category, RawListing};
use pricecrawl::domain::models::site::SiteProfile;
use pricecrawl::engines::traits::{EngineError, RenderEngine, RenderSession};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// 按分类名称返回固定条目的渲染引擎
#[derive(Default)]
pub struct CannedEngine {
    pages: Mutex<HashMap<String, Vec<RawListing>>>,
    pub sessions_opened: AtomicU32,
    pub sessions_closed: Arc<AtomicU32>,
}

impl CannedEngine {
    pub fn with_page(self, category: &str, listings: Vec<RawListing>) -> Self {
        self.pages.lock().insert(category.to_string(), listings);
        self
    }

    pub fn opened(&self) -> u32 {
        self.sessions_opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> u32 {
        self.sessions_closed.load(Ordering::SeqCst)
    }
}

struct CannedSession {
    pages: HashMap<String, Vec<RawListing>>,
    closed: Arc<AtomicU32>,
}

#[async_trait]
impl RenderEngine for CannedEngine {
    async fn open_session(
        &self,
        _profile: Arc<SiteProfile>,
    ) -> Result<Box<dyn RenderSession>, EngineError> {
        self.sessions_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(CannedSession {
            pages: self.pages.lock().clone(),
            closed: self.sessions_closed.clone(),
        }))
    }

    fn name(&self) -> &'static str {
        "canned"
    }
}

#[async_trait]
impl RenderSession for CannedSession {
    async fn fetch_category(
        &self,
        category: &Category,
        limit: usize,
    ) -> Result<Vec<RawListing>, EngineError> {
        let mut listings = self.pages.get(&category.name).cloned().unwrap_or_default();
        listings.truncate(limit);
        Ok(listings)
    }

    async fn close(&mut self) -> Result<(), EngineError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn raw(title: &str, price: &str) -> RawListing {
    RawListing {
        title: title.to_string(),
        price_text: price.to_string(),
        url: format!(
            "https://www.daraz.pk/products/{}.html",
            title.to_lowercase().replace(' ', "-")
        ),
        image_url: Some("https://static-01.daraz.pk/p/item.jpg".to_string()),
        image_alt: None,
    }
}

pub fn morning(day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 10, day)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap()
}
