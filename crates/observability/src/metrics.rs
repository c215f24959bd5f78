//! 会话指标收集模块
//!
//! 基于 TickMeta 与录制事件收集和统计同步/录制的运行指标。

use std::collections::BTreeMap;

use contracts::TickMeta;
use metrics::{counter, gauge, histogram};

/// 从 TickMeta 记录指标
///
/// 每次 `advance` 成功产生 SyncedTick 时调用。
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_tick_metrics;
///
/// let tick = synchronizer.advance(timeout)?;
/// record_tick_metrics(&tick.meta, tick.frame_id);
/// ```
pub fn record_tick_metrics(meta: &TickMeta, frame_id: u64) {
    counter!("drive_recorder_ticks_total").increment(1);

    // 帧 ID (用于检测跳帧)
    gauge!("drive_recorder_last_frame_id").set(frame_id as f64);

    histogram!("drive_recorder_tick_latency_ms").record(meta.latency_ms);

    for (producer, count) in &meta.stale {
        record_stale_payloads(producer, *count as u64);
    }

    if meta.duplicates > 0 {
        counter!("drive_recorder_duplicate_payloads_total").increment(meta.duplicates as u64);
    }
}

/// 记录过期 (旧帧) 数据被丢弃
pub fn record_stale_payloads(producer: &str, count: u64) {
    if count == 0 {
        return;
    }
    counter!(
        "drive_recorder_stale_payloads_total",
        "producer" => producer.to_string()
    )
    .increment(count);
}

/// 记录同步超时
pub fn record_sync_timeout(missing: &[String]) {
    counter!("drive_recorder_sync_timeouts_total").increment(1);
    for producer in missing {
        counter!(
            "drive_recorder_producer_missing_total",
            "producer" => producer.clone()
        )
        .increment(1);
    }
}

/// 记录一行写入录制文件
pub fn record_row_written(capacity_grew: bool) {
    counter!("drive_recorder_rows_written_total").increment(1);
    if capacity_grew {
        counter!("drive_recorder_capacity_growths_total").increment(1);
    }
}

/// 会话指标聚合器
///
/// 在内存中聚合指标，便于运行结束时输出摘要。
#[derive(Debug, Clone, Default)]
pub struct SessionStatsAggregator {
    /// 成功同步的帧数
    pub total_ticks: u64,

    /// 超时次数
    pub timeouts: u64,

    /// 丢弃的过期数据总数
    pub total_stale: u64,

    /// 丢弃的重复数据总数
    pub total_duplicates: u64,

    /// 写入行数
    pub rows_written: u64,

    /// 容量扩展次数
    pub capacity_growths: u64,

    /// 打开过的录制文件数
    pub recordings: u64,

    /// 同步延迟统计 (毫秒)
    pub latency_stats: RunningStats,

    /// 各数据源过期次数
    pub stale_counts: BTreeMap<String, u64>,

    /// 各数据源超时缺失次数
    pub missing_counts: BTreeMap<String, u64>,
}

impl SessionStatsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新同步统计
    pub fn update(&mut self, meta: &TickMeta) {
        self.total_ticks += 1;
        self.total_duplicates += meta.duplicates as u64;
        self.latency_stats.push(meta.latency_ms);

        for (producer, count) in &meta.stale {
            self.total_stale += *count as u64;
            *self.stale_counts.entry(producer.clone()).or_insert(0) += *count as u64;
        }
    }

    /// 记录一次超时
    pub fn record_timeout(&mut self, missing: &[String]) {
        self.timeouts += 1;
        for producer in missing {
            *self.missing_counts.entry(producer.clone()).or_insert(0) += 1;
        }
    }

    /// 记录一次行写入
    pub fn record_row(&mut self, capacity_grew: bool) {
        self.rows_written += 1;
        if capacity_grew {
            self.capacity_growths += 1;
        }
    }

    /// 记录新开启的录制
    pub fn record_recording_opened(&mut self) {
        self.recordings += 1;
    }

    /// 生成摘要报告
    pub fn summary(&self) -> SessionSummary {
        let attempts = self.total_ticks + self.timeouts;
        SessionSummary {
            total_ticks: self.total_ticks,
            timeouts: self.timeouts,
            timeout_rate: if attempts > 0 {
                self.timeouts as f64 / attempts as f64 * 100.0
            } else {
                0.0
            },
            total_stale: self.total_stale,
            total_duplicates: self.total_duplicates,
            rows_written: self.rows_written,
            capacity_growths: self.capacity_growths,
            recordings: self.recordings,
            latency_ms: StatsSummary::from(&self.latency_stats),
            stale_counts: self.stale_counts.clone(),
            missing_counts: self.missing_counts.clone(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 会话摘要
#[derive(Debug, Clone, Default)]
pub struct SessionSummary {
    pub total_ticks: u64,
    pub timeouts: u64,
    pub timeout_rate: f64,
    pub total_stale: u64,
    pub total_duplicates: u64,
    pub rows_written: u64,
    pub capacity_growths: u64,
    pub recordings: u64,
    pub latency_ms: StatsSummary,
    pub stale_counts: BTreeMap<String, u64>,
    pub missing_counts: BTreeMap<String, u64>,
}

impl std::fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Drive Session Summary ===")?;
        writeln!(f, "Synchronized frames: {}", self.total_ticks)?;
        writeln!(
            f,
            "Timeouts: {} ({:.2}%)",
            self.timeouts, self.timeout_rate
        )?;
        writeln!(f, "Stale payloads discarded: {}", self.total_stale)?;
        writeln!(f, "Duplicate payloads drained: {}", self.total_duplicates)?;
        writeln!(f, "Tick latency (ms): {}", self.latency_ms)?;
        writeln!(
            f,
            "Rows written: {} across {} recording(s), {} capacity growth(s)",
            self.rows_written, self.recordings, self.capacity_growths
        )?;

        if !self.stale_counts.is_empty() {
            writeln!(f, "Stale payloads by producer:")?;
            for (producer, count) in &self.stale_counts {
                writeln!(f, "  {}: {}", producer, count)?;
            }
        }

        if !self.missing_counts.is_empty() {
            writeln!(f, "Missing producers on timeout:")?;
            for (producer, count) in &self.missing_counts {
                writeln!(f, "  {}: {}", producer, count)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
