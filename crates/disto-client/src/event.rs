//! 引擎事件
//!
//! 引擎不直接打印或输出任何东西，所有用户可见的结果都通过事件通道交给展示层。

use crate::state::CycleId;
use disto_link::Characteristic;
use disto_protocol::{DistoCommand, MeasurementSample};
use tokio::sync::mpsc::UnboundedReceiver;

/// 事件接收端
pub type EventReceiver = UnboundedReceiver<EngineEvent>;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// 最终测量值（直接模式下 `cycle` 为 `None`）
    Finalized {
        sample: MeasurementSample,
        cycle: Option<CycleId>,
    },
    /// 定时模式：检测到按键，新周期开始（`sample` 是按键时的粗测值）
    ButtonPressed {
        cycle: CycleId,
        sample: MeasurementSample,
    },
    /// 激光已打开
    LaserActivated { cycle: CycleId },
    /// 即将发送测量命令
    MeasureTriggered { cycle: CycleId },
    /// 触发测量后未收到结果
    MeasurementTimeout { cycle: CycleId },
    /// 延迟测量过程中发现链路丢失
    LinkLost { cycle: CycleId },
    /// 命令发送失败（链路仍在）
    CommandFailed {
        command: DistoCommand,
        error: String,
    },
    /// 负载长度异常
    DecodeWarning {
        characteristic: Characteristic,
        len: usize,
    },
    /// 单位变化
    UnitChanged { unit_code: u8 },
    /// 通知流结束
    Disconnected,
}

impl EngineEvent {
    /// 最终测量值（如果是）
    pub fn sample(&self) -> Option<MeasurementSample> {
        match self {
            EngineEvent::Finalized { sample, .. } => Some(*sample),
            _ => None,
        }
    }

    /// 是否结束了一个周期
    pub fn resolves_cycle(&self) -> Option<CycleId> {
        match self {
            EngineEvent::Finalized { cycle, .. } => *cycle,
            EngineEvent::MeasurementTimeout { cycle } | EngineEvent::LinkLost { cycle } => {
                Some(*cycle)
            },
            _ => None,
        }
    }
}
