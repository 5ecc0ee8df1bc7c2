//! 连接握手时序
//!
//! 设备固件要求在启用通知前等待，否则通知不可靠：
//!
//! 1. 打开链路并做服务发现
//! 2. 检查 DISTO 服务是否存在，然后取得通知流
//! 3. 等待 950ms
//! 4. 启用 DISTANCE 通知
//! 5. 等待 100ms
//! 6. 启用 DISTANCE_UNIT 通知
//!
//! 这两个延时是固件要求，不是调优参数。
//!
//! 通知流必须在第一次订阅之前取得：后端只交付取流之后到达的通知，
//! 设备在启用 DISTANCE_UNIT 通知后会立即推送当前单位。

use crate::error::ConnectError;
use disto_link::{Characteristic, LinkAdapter, NotificationStream};
use disto_protocol::DISTO_SERVICE_UUID;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 服务发现后、启用第一个通知前的等待时间
pub const SETTLE_DELAY: Duration = Duration::from_millis(950);

/// 两次启用通知之间的等待时间
pub const INTER_SUBSCRIBE_DELAY: Duration = Duration::from_millis(100);

/// 握手时序
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeTiming {
    pub settle_delay: Duration,
    pub inter_subscribe_delay: Duration,
}

impl Default for HandshakeTiming {
    fn default() -> Self {
        Self {
            settle_delay: SETTLE_DELAY,
            inter_subscribe_delay: INTER_SUBSCRIBE_DELAY,
        }
    }
}

impl HandshakeTiming {
    /// 握手总等待时间
    pub fn total(&self) -> Duration {
        self.settle_delay + self.inter_subscribe_delay
    }
}

async fn enable_notifications<L>(link: &L, characteristic: Characteristic) -> Result<(), ConnectError>
where
    L: LinkAdapter + ?Sized,
{
    info!("Enabling notifications on {} characteristic", characteristic);
    link.subscribe(characteristic)
        .await
        .map_err(|source| ConnectError::Subscribe {
            characteristic,
            source,
        })
}

/// 执行握手
///
/// 成功返回时两个通知都已启用，返回的通知流包含订阅后到达的全部通知。
/// 任何一步失败都是终止性的，调用方负责关闭链路
/// （见 [`Session::establish`](crate::Session::establish)）。
pub async fn handshake<L>(
    link: &L,
    timing: &HandshakeTiming,
) -> Result<NotificationStream, ConnectError>
where
    L: LinkAdapter + ?Sized,
{
    // 1. 打开链路 + 服务发现
    link.open().await?;
    let services = link.discover_services().await?;

    // 2. 能力检查
    if !services.contains(&DISTO_SERVICE_UUID) {
        warn!("DISTO service {} not found!", DISTO_SERVICE_UUID);
        for service in &services {
            warn!("  available service: {}", service);
        }
        return Err(ConnectError::CapabilityMissing {
            service: DISTO_SERVICE_UUID,
            available: services,
        });
    }
    info!("Found DISTO service");
    let notifications = link.notifications().await?;

    // 3. 固件要求：启用通知前等待
    debug!("Waiting {:?} (device protocol requirement)", timing.settle_delay);
    tokio::time::sleep(timing.settle_delay).await;

    // 4. DISTANCE
    enable_notifications(link, Characteristic::Distance).await?;

    // 5. 两次订阅之间等待
    debug!("Waiting {:?}", timing.inter_subscribe_delay);
    tokio::time::sleep(timing.inter_subscribe_delay).await;

    // 6. DISTANCE_UNIT
    enable_notifications(link, Characteristic::DistanceUnit).await?;

    Ok(notifications)
}
