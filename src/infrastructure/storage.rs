// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::warn;

use crate::domain::models::run_state::{RunState, ScraperIdentity};
use crate::domain::repositories::run_state_repository::{RunStateError, RunStateRepository};

type StateMap = BTreeMap<String, serde_json::Value>;

/// JSON 文件运行状态仓库
///
/// 文件格式为 `{ "<标识>": "YYYY-MM-DD" }`，可以手工查看和删除。
/// 写入先落临时文件再原子替换。
pub struct JsonFileRunStateRepository {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileRunStateRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// 状态文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读取全部条目，文件不存在或内容损坏时返回空表
    async fn read_map(&self) -> Result<StateMap, RunStateError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(StateMap::new()),
            Err(e) => return Err(RunStateError::Io(e)),
        };
        if content.trim().is_empty() {
            return Ok(StateMap::new());
        }

        match serde_json::from_str::<StateMap>(&content) {
            Ok(map) => Ok(map),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Run state file is corrupt, ignoring it");
                Ok(StateMap::new())
            }
        }
    }

    async fn write_map(&self, map: &StateMap) -> Result<(), RunStateError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let body = serde_json::to_string_pretty(map)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

/// 解析日期，兼容旧版本写入的完整 ISO 时间
fn parse_run_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| value.parse::<NaiveDateTime>().ok().map(|dt| dt.date()))
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.naive_local().date())
        })
}

#[async_trait]
impl RunStateRepository for JsonFileRunStateRepository {
    async fn load(&self, identity: &ScraperIdentity) -> Result<Option<RunState>, RunStateError> {
        let _guard = self.lock.lock().await;
        let map = self.read_map().await?;

        let Some(value) = map.get(identity.as_str()) else {
            return Ok(None);
        };
        match value.as_str().and_then(parse_run_date) {
            Some(last_run_date) => Ok(Some(RunState {
                identity: identity.clone(),
                last_run_date,
            })),
            None => {
                warn!(scraper = %identity, value = %value, "Unreadable run state entry, treating as never run");
                Ok(None)
            }
        }
    }

    async fn save(&self, identity: &ScraperIdentity, date: NaiveDate) -> Result<(), RunStateError> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_map().await?;
        map.insert(
            identity.as_str().to_string(),
            serde_json::Value::String(date.format("%Y-%m-%d").to_string()),
        );
        self.write_map(&map).await
    }

    async fn clear(&self, identity: &ScraperIdentity) -> Result<(), RunStateError> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_map().await?;
        if map.remove(identity.as_str()).is_some() {
            self.write_map(&map).await?;
        }
        Ok(())
    }
}

/// 内存运行状态仓库
///
/// 进程内有效，用于测试和不需要持久化的场景
#[derive(Default)]
pub struct InMemoryRunStateRepository {
    entries: parking_lot::Mutex<HashMap<ScraperIdentity, NaiveDate>>,
}

impl InMemoryRunStateRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RunStateRepository for InMemoryRunStateRepository {
    async fn load(&self, identity: &ScraperIdentity) -> Result<Option<RunState>, RunStateError> {
        Ok(self.entries.lock().get(identity).map(|date| RunState {
            identity: identity.clone(),
            last_run_date: *date,
        }))
    }

    async fn save(&self, identity: &ScraperIdentity, date: NaiveDate) -> Result<(), RunStateError> {
        self.entries.lock().insert(identity.clone(), date);
        Ok(())
    }

    async fn clear(&self, identity: &ScraperIdentity) -> Result<(), RunStateError> {
        self.entries.lock().remove(identity);
        Ok(())
    }
}
