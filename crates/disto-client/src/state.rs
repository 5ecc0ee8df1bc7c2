//! 测量周期状态机
//!
//! [`EngineState`] 是引擎唯一的可变状态。所有状态转换都是同步方法，
//! 由调用方在一次短临界区内完成"检查 + 设置"，从不跨越 `.await`。
//!
//! # 定时模式
//!
//! ```text
//!            distance (无周期)
//!   Idle ─────────────────────────▶ AwaitingFinal(id, armed = false)
//!     ▲                                   │ arm(id)：即将发送测量命令
//!     │                                   ▼
//!     │  distance → 最终值          AwaitingFinal(id, armed = true)
//!     ├───────────────────────────────────┤
//!     │  retire(id)：超时 / 链路丢失       │
//!     └───────────────────────────────────┘
//! ```
//!
//! 周期在 `armed` 之前收到的距离通知是第二次按键，直接忽略。

use crate::config::MeasurementMode;
use disto_protocol::MeasurementSample;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// 周期 ID（单调递增，退役后永不复用）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CycleId(u64);

impl CycleId {
    /// 第 n 个周期的 ID（从 1 开始）
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for CycleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 引擎阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    AwaitingFinal,
}

/// 一次测量周期（按键 → 最终值）
#[derive(Debug)]
pub struct Cycle {
    pub id: CycleId,
    pub created_at: Instant,
    /// 测量命令是否已（或正在）发出
    pub armed: bool,
    /// 延迟测量任务
    pub task: Option<JoinHandle<()>>,
}

/// 距离通知的处理结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DistanceOutcome {
    /// 直接模式：立即作为最终值
    Direct(MeasurementSample),
    /// 新周期开始，调用方需要启动延迟测量任务
    Started {
        cycle: CycleId,
        sample: MeasurementSample,
    },
    /// 周期完成
    Finalized {
        cycle: CycleId,
        sample: MeasurementSample,
    },
    /// 周期尚未发出测量命令，视为重复按键
    Ignored { cycle: CycleId },
}

/// 引擎状态快照
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSnapshot {
    pub mode: MeasurementMode,
    pub phase: CyclePhase,
    pub active_cycle: Option<CycleId>,
    pub armed: bool,
    pub unit_code: u8,
    pub last_cycle_id: Option<CycleId>,
}

impl EngineSnapshot {
    pub fn is_idle(&self) -> bool {
        self.phase == CyclePhase::Idle
    }
}

/// 引擎状态
#[derive(Debug)]
pub struct EngineState {
    mode: MeasurementMode,
    unit_code: u8,
    cycle: Option<Cycle>,
    next_id: u64,
}

impl EngineState {
    pub fn new(mode: MeasurementMode) -> Self {
        Self {
            mode,
            unit_code: 0,
            cycle: None,
            next_id: 1,
        }
    }

    pub fn mode(&self) -> MeasurementMode {
        self.mode
    }

    /// 当前单位代码（默认 0，即米）
    pub fn unit_code(&self) -> u8 {
        self.unit_code
    }

    /// 是否有测量正在进行
    pub fn in_progress(&self) -> bool {
        self.cycle.is_some()
    }

    pub fn phase(&self) -> CyclePhase {
        if self.cycle.is_some() {
            CyclePhase::AwaitingFinal
        } else {
            CyclePhase::Idle
        }
    }

    pub fn active_cycle(&self) -> Option<CycleId> {
        self.cycle.as_ref().map(|c| c.id)
    }

    /// 单位通知：无条件更新
    pub fn on_unit(&mut self, code: u8) {
        self.unit_code = code;
    }

    /// 距离通知
    pub fn on_distance(&mut self, value: f32) -> DistanceOutcome {
        let sample = MeasurementSample::new(value, self.unit_code);

        if self.mode == MeasurementMode::Direct {
            return DistanceOutcome::Direct(sample);
        }

        match self.cycle.as_ref().map(|c| (c.id, c.armed)) {
            Some((cycle, true)) => {
                self.cycle = None;
                DistanceOutcome::Finalized { cycle, sample }
            },
            Some((cycle, false)) => DistanceOutcome::Ignored { cycle },
            None => {
                let id = CycleId(self.next_id);
                self.next_id += 1;
                self.cycle = Some(Cycle {
                    id,
                    created_at: Instant::now(),
                    armed: false,
                    task: None,
                });
                DistanceOutcome::Started { cycle: id, sample }
            },
        }
    }

    /// 是否仍是当前周期
    pub fn is_current(&self, id: CycleId) -> bool {
        self.active_cycle() == Some(id)
    }

    /// 记录周期的延迟任务
    ///
    /// 周期已经退役时把句柄原样返回。
    pub fn attach_task(&mut self, id: CycleId, task: JoinHandle<()>) -> Option<JoinHandle<()>> {
        match self.cycle.as_mut() {
            Some(cycle) if cycle.id == id => {
                cycle.task = Some(task);
                None
            },
            _ => Some(task),
        }
    }

    /// 标记周期即将发送测量命令，之后的距离通知即为最终值
    pub fn arm(&mut self, id: CycleId) -> bool {
        match self.cycle.as_mut() {
            Some(cycle) if cycle.id == id => {
                cycle.armed = true;
                true
            },
            _ => false,
        }
    }

    /// 退役指定周期（超时、链路丢失）
    ///
    /// 只有 `id` 仍是当前周期时才生效。
    pub fn retire(&mut self, id: CycleId) -> Option<Cycle> {
        if self.is_current(id) {
            self.cycle.take()
        } else {
            None
        }
    }

    /// 无条件清空当前周期（关闭引擎时使用）
    pub fn reset(&mut self) -> Option<Cycle> {
        self.cycle.take()
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            mode: self.mode,
            phase: self.phase(),
            active_cycle: self.active_cycle(),
            armed: self.cycle.as_ref().is_some_and(|c| c.armed),
            unit_code: self.unit_code,
            last_cycle_id: (self.next_id > 1).then(|| CycleId(self.next_id - 1)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn started(outcome: DistanceOutcome) -> CycleId {
        match outcome {
            DistanceOutcome::Started { cycle, .. } => cycle,
            other => panic!("Expected Started, got {:?}", other),
        }
    }

    #[test]
    fn test_direct_mode_never_allocates() {
        let mut state = EngineState::new(MeasurementMode::Direct);
        state.on_unit(3);
        let outcome = state.on_distance(3.0);
        assert_eq!(outcome, DistanceOutcome::Direct(MeasurementSample::new(3.0, 3)));
        assert!(!state.in_progress());
        assert_eq!(state.snapshot().last_cycle_id, None);
    }

    #[test]
    fn test_timer_cycle_happy_path() {
        let mut state = EngineState::new(MeasurementMode::Timer);
        let id = started(state.on_distance(2.43));
        assert_eq!(state.phase(), CyclePhase::AwaitingFinal);

        // 测量命令发出前的通知被忽略
        assert_eq!(state.on_distance(2.44), DistanceOutcome::Ignored { cycle: id });
        assert!(state.is_current(id));

        assert!(state.arm(id));
        assert_eq!(
            state.on_distance(2.5),
            DistanceOutcome::Finalized {
                cycle: id,
                sample: MeasurementSample::new(2.5, 0),
            }
        );
        assert_eq!(state.phase(), CyclePhase::Idle);
        assert!(!state.arm(id));
        assert!(state.retire(id).is_none());
    }

    #[test]
    fn test_retire_only_current() {
        let mut state = EngineState::new(MeasurementMode::Timer);
        let first = started(state.on_distance(1.0));
        assert!(state.retire(first).is_some());

        let second = started(state.on_distance(1.0));
        assert!(second > first);
        // 旧任务的超时不能影响新周期
        assert!(state.retire(first).is_none());
        assert!(state.is_current(second));
    }

    #[test]
    fn test_unit_does_not_touch_cycle() {
        let mut state = EngineState::new(MeasurementMode::Timer);
        let id = started(state.on_distance(1.0));
        state.on_unit(6);
        assert!(state.is_current(id));
        assert_eq!(state.snapshot().unit_code, 6);
        assert!(!state.snapshot().armed);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Distance(f32),
        Unit(u8),
        ArmCurrent,
        RetireCurrent,
        RetireStale(u64),
        Reset,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            4 => (0.0f32..100.0).prop_map(Op::Distance),
            1 => (0u8..12).prop_map(Op::Unit),
            2 => Just(Op::ArmCurrent),
            1 => Just(Op::RetireCurrent),
            1 => (1u64..20).prop_map(Op::RetireStale),
            1 => Just(Op::Reset),
        ]
    }

    proptest! {
        /// 周期 ID 严格递增且从不复用，任意时刻最多一个活动周期
        #[test]
        fn prop_cycle_ids_never_reused(ops in prop::collection::vec(op_strategy(), 1..200)) {
            let mut state = EngineState::new(MeasurementMode::Timer);
            let mut issued: Vec<CycleId> = Vec::new();

            for op in ops {
                let before = state.active_cycle();
                match op {
                    Op::Distance(v) => match state.on_distance(v) {
                        DistanceOutcome::Started { cycle, .. } => {
                            prop_assert!(before.is_none());
                            prop_assert!(issued.last().is_none_or(|last| cycle > *last));
                            prop_assert!(!issued.contains(&cycle));
                            issued.push(cycle);
                        },
                        DistanceOutcome::Finalized { cycle, .. } => {
                            prop_assert_eq!(before, Some(cycle));
                            prop_assert!(state.active_cycle().is_none());
                        },
                        DistanceOutcome::Ignored { cycle } => {
                            prop_assert_eq!(before, Some(cycle));
                            prop_assert_eq!(state.active_cycle(), Some(cycle));
                        },
                        DistanceOutcome::Direct(_) => prop_assert!(false, "timer mode"),
                    },
                    Op::Unit(code) => {
                        state.on_unit(code);
                        prop_assert_eq!(state.active_cycle(), before);
                    },
                    Op::ArmCurrent => {
                        if let Some(id) = before {
                            prop_assert!(state.arm(id));
                        }
                    },
                    Op::RetireCurrent => {
                        if let Some(id) = before {
                            prop_assert!(state.retire(id).is_some());
                        }
                    },
                    Op::RetireStale(raw) => {
                        let id = CycleId(raw);
                        let retired = state.retire(id).is_some();
                        prop_assert_eq!(retired, before == Some(id));
                    },
                    Op::Reset => {
                        state.reset();
                    },
                }
                prop_assert_eq!(state.in_progress(), state.active_cycle().is_some());
            }
        }
    }
}
