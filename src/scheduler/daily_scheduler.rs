// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::scheduler::clock::Clock;
use crate::workers::manager::{CycleReport, RunOrchestrator, SchedulerState};
use chrono::{NaiveDateTime, NaiveTime};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// 单次挂起的最长时间，醒来后按墙上时间重新判断是否到点
const DEFAULT_SLEEP_STEP: Duration = Duration::from_secs(60);

/// 调度方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleConfig {
    /// 立即执行一个周期后退出，`force` 为 true 时忽略运行状态
    Immediate { force: bool },
    /// 每天在本地时间 `NaiveTime` 触发
    DailyAt(NaiveTime),
}

/// 计算下一次触发时间
///
/// 当前时间早于今天的目标时间时返回今天，否则返回明天
pub fn next_trigger(now: NaiveDateTime, target: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(target);
    if now < today {
        return today;
    }
    now.date()
        .succ_opt()
        .map(|tomorrow| tomorrow.and_time(target))
        .unwrap_or(today)
}

/// 每日调度器
///
/// 状态循环：SLEEPING → CHECKING → RUNNING → SUBMITTING → SLEEPING。
/// 停止信号只在 SLEEPING 阶段生效，正在进行的运行和提交不会被打断。
/// SLEEPING 按 `sleep_step` 分段挂起，每次醒来比较墙上时间，
/// 夏令时切换、NTP 校时或主机休眠都不会让触发时间漂移。
pub struct DailyScheduler {
    orchestrator: Arc<RunOrchestrator>,
    clock: Arc<dyn Clock>,
    config: ScheduleConfig,
    max_cycles: Option<usize>,
    sleep_step: Duration,
}

impl DailyScheduler {
    /// 创建调度器
    ///
    /// # 参数
    ///
    /// * `orchestrator` - 运行编排器
    /// * `clock` - 时钟
    /// * `config` - 调度方式
    pub fn new(orchestrator: Arc<RunOrchestrator>, clock: Arc<dyn Clock>, config: ScheduleConfig) -> Self {
        Self {
            orchestrator,
            clock,
            config,
            max_cycles: None,
            sleep_step: DEFAULT_SLEEP_STEP,
        }
    }

    /// 设置单次挂起的最长时间
    pub fn with_sleep_step(mut self, sleep_step: Duration) -> Self {
        self.sleep_step = sleep_step.max(Duration::from_millis(1));
        self
    }

    /// 限制每日模式下的周期数，达到后退出
    pub fn with_max_cycles(mut self, max_cycles: usize) -> Self {
        self.max_cycles = Some(max_cycles);
        self
    }

    /// 运行调度循环，返回已执行周期的报告
    ///
    /// # 参数
    ///
    /// * `shutdown` - 值变为 true 时在下一个 SLEEPING 边界退出
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Vec<CycleReport> {
        let target = match self.config {
            ScheduleConfig::Immediate { force } => {
                return vec![self.orchestrator.run_cycle(force).await];
            }
            ScheduleConfig::DailyAt(target) => target,
        };

        let mut reports = Vec::new();
        'cycle: loop {
            if *shutdown.borrow() {
                info!("Stop requested, leaving scheduler loop");
                break;
            }
            if self.max_cycles.is_some_and(|max| reports.len() >= max) {
                break;
            }

            let trigger = next_trigger(self.clock.now(), target);
            self.orchestrator.set_state(SchedulerState::Sleeping);
            info!(next_run = %trigger, "Sleeping until next scheduled run");

            loop {
                let now = self.clock.now();
                if now >= trigger {
                    break;
                }
                let step = (trigger - now)
                    .to_std()
                    .unwrap_or(Duration::ZERO)
                    .min(self.sleep_step);

                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            warn!("Stop signal channel closed, leaving scheduler loop");
                            break 'cycle;
                        }
                        continue 'cycle;
                    }
                    _ = self.clock.sleep(step) => {}
                }
            }

            debug!(now = %self.clock.now(), "Scheduled time reached");
            reports.push(self.orchestrator.run_cycle(false).await);
        }

        self.orchestrator.set_state(SchedulerState::Idle);
        reports
    }
}
