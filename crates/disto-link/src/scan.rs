//! 扫描参数

use disto_protocol::DEVICE_NAME_FILTERS;
use std::time::Duration;

/// 默认扫描时长
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(10);

/// 设备扫描参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// 扫描时长
    pub timeout: Duration,
    /// 名称过滤关键字（大小写不敏感，任意一个命中即可；为空时接受所有设备）
    pub name_filters: Vec<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_SCAN_TIMEOUT,
            name_filters: DEVICE_NAME_FILTERS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ScanOptions {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn name_filters<I, S>(mut self, filters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.name_filters = filters.into_iter().map(Into::into).collect();
        self
    }

    /// 不做名称过滤，接受所有设备（包括没有广播名称的设备）
    pub fn any_device(self) -> Self {
        self.name_filters(std::iter::empty::<String>())
    }

    /// 广播名称是否命中过滤条件
    ///
    /// 过滤条件为空时总是命中；否则没有名称的设备永远不命中。
    pub fn matches_name(&self, name: Option<&str>) -> bool {
        if self.name_filters.is_empty() {
            return true;
        }
        let Some(name) = name else {
            return false;
        };
        let lower = name.to_lowercase();
        self.name_filters
            .iter()
            .any(|pattern| lower.contains(&pattern.to_lowercase()))
    }
}
