//! 测量引擎场景测试
//!
//! 使用 MockLinkAdapter + 暂停时钟，精确检查命令时序和周期状态：
//! - 直接模式：收到即输出
//! - 定时模式：按键 → 开激光 → 延时 → 测量 → 最终值
//! - 超时恢复、重复按键、链路丢失、关闭

use disto_client::{
    CycleId, CyclePhase, EngineConfig, EngineEvent, EngineHandle, EventReceiver, MeasurementEngine,
};
use disto_driver::DistoBuilder;
use disto_link::{Characteristic, LinkAdapter, MockLinkAdapter, MockOperationKind};
use disto_protocol::{DistoCommand, MeasurementSample};
use std::time::Duration;
use tokio::time::{Instant, sleep_until};

struct Harness {
    mock: MockLinkAdapter,
    handle: EngineHandle<MockLinkAdapter>,
    events: EventReceiver,
    t0: Instant,
}

impl Harness {
    async fn start(config: EngineConfig) -> Self {
        let mock = MockLinkAdapter::new();
        let session = DistoBuilder::new()
            .connect_with(mock.clone())
            .await
            .expect("handshake with mock link");
        let (handle, events) = MeasurementEngine::new(config)
            .spawn(session)
            .expect("engine spawn");
        Self {
            mock,
            handle,
            events,
            t0: Instant::now(),
        }
    }

    /// 推进到 t0 + ms，并让所有就绪任务跑完
    async fn at(&self, ms: u64) {
        sleep_until(self.t0 + Duration::from_millis(ms)).await;
        settle().await;
    }

    fn drain(&mut self) -> Vec<EngineEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(event);
        }
        out
    }

    /// 已发送的命令及相对 t0 的时间
    fn commands(&self) -> Vec<(String, Duration)> {
        self.mock
            .sent_commands()
            .into_iter()
            .map(|(payload, at)| {
                (
                    String::from_utf8_lossy(&payload).into_owned(),
                    at.saturating_duration_since(self.t0),
                )
            })
            .collect()
    }
}

async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

fn assert_near(actual: Duration, expected_ms: u64) {
    let expected = Duration::from_millis(expected_ms);
    let diff = if actual > expected {
        actual - expected
    } else {
        expected - actual
    };
    assert!(
        diff <= Duration::from_millis(2),
        "expected ~{:?}, got {:?}",
        expected,
        actual
    );
}

fn finalized(events: &[EngineEvent]) -> Vec<MeasurementSample> {
    events.iter().filter_map(EngineEvent::sample).collect()
}

fn first_cycle() -> CycleId {
    CycleId::new(1)
}

#[tokio::test(start_paused = true)]
async fn direct_mode_emits_immediately() {
    let mut h = Harness::start(EngineConfig::direct()).await;

    assert!(h.mock.inject_unit(3));
    assert!(h.mock.inject_raw(Characteristic::Distance, &[0x00, 0x00, 0x40, 0x40]));
    settle().await;

    let events = h.drain();
    assert_eq!(
        events,
        vec![
            EngineEvent::UnitChanged { unit_code: 3 },
            EngineEvent::Finalized {
                sample: MeasurementSample::new(3.0, 3),
                cycle: None,
            },
        ]
    );
    assert_eq!(Instant::now(), h.t0);
    assert!(h.commands().is_empty());
    assert!(h.handle.snapshot().is_idle());
}

#[tokio::test(start_paused = true)]
async fn timer_mode_happy_path() {
    let mut h = Harness::start(EngineConfig::timer()).await;
    let id = first_cycle();

    assert!(h.mock.inject_distance(2.43));
    settle().await;
    let events = h.drain();
    assert_eq!(
        events,
        vec![
            EngineEvent::ButtonPressed {
                cycle: id,
                sample: MeasurementSample::new(2.43, 0),
            },
            EngineEvent::LaserActivated { cycle: id },
        ]
    );
    assert_eq!(h.handle.snapshot().phase, CyclePhase::AwaitingFinal);

    h.at(1200).await;
    assert!(h.mock.inject_distance(2.5));
    settle().await;

    let events = h.drain();
    assert_eq!(
        events,
        vec![
            EngineEvent::MeasureTriggered { cycle: id },
            EngineEvent::Finalized {
                sample: MeasurementSample::new(2.5, 0),
                cycle: Some(id),
            },
        ]
    );

    let commands = h.commands();
    assert_eq!(commands.len(), 2);
    assert_eq!(commands[0].0, "o");
    assert_near(commands[0].1, 0);
    assert_eq!(commands[1].0, "g");
    assert_near(commands[1].1, 1000);

    let snapshot = h.handle.snapshot();
    assert!(snapshot.is_idle());
    assert_eq!(snapshot.last_cycle_id, Some(id));

    // 旧周期的超时到期后不能产生任何事件
    h.at(6000).await;
    assert!(h.drain().is_empty());
}

#[tokio::test(start_paused = true)]
async fn timer_mode_timeout_recovers() {
    let mut h = Harness::start(EngineConfig::timer()).await;
    let id = first_cycle();

    assert!(h.mock.inject_distance(1.0));
    h.at(3990).await;
    assert!(
        !h.drain()
            .iter()
            .any(|e| matches!(e, EngineEvent::MeasurementTimeout { .. }))
    );
    assert_eq!(h.handle.snapshot().active_cycle, Some(id));

    h.at(4010).await;
    let events = h.drain();
    assert_eq!(events, vec![EngineEvent::MeasurementTimeout { cycle: id }]);
    assert!(finalized(&events).is_empty());
    assert!(h.handle.snapshot().is_idle());

    // 超时后下一次按键开启新周期
    assert!(h.mock.inject_distance(1.0));
    settle().await;
    let snapshot = h.handle.snapshot();
    assert!(snapshot.active_cycle.is_some_and(|next| next > id));
}

#[tokio::test(start_paused = true)]
async fn second_press_during_delay_is_ignored() {
    let mut h = Harness::start(EngineConfig::timer()).await;
    let id = first_cycle();

    assert!(h.mock.inject_distance(2.43));
    settle().await;
    h.drain();

    h.at(500).await;
    assert!(h.mock.inject_distance(9.99));
    settle().await;
    assert!(h.drain().is_empty());
    let snapshot = h.handle.snapshot();
    assert_eq!(snapshot.active_cycle, Some(id));
    assert_eq!(snapshot.last_cycle_id, Some(id));
    assert!(!snapshot.armed);

    h.at(1200).await;
    assert!(h.mock.inject_distance(2.5));
    settle().await;
    let events = h.drain();
    assert_eq!(finalized(&events), vec![MeasurementSample::new(2.5, 0)]);
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, EngineEvent::ButtonPressed { .. }))
            .count(),
        0
    );
    // 只发过一次 "o" 和一次 "g"
    assert_eq!(h.commands().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn disconnect_during_delay_reports_link_lost() {
    let mut h = Harness::start(EngineConfig::timer()).await;
    let id = first_cycle();

    assert!(h.mock.inject_distance(2.43));
    h.at(500).await;
    h.mock.set_connected(false);

    h.at(1010).await;
    let events = h.drain();
    assert_eq!(events.last(), Some(&EngineEvent::LinkLost { cycle: id }));
    assert!(finalized(&events).is_empty());
    assert!(h.handle.snapshot().is_idle());
    assert!(!h.handle.is_connected());

    let commands: Vec<String> = h.commands().into_iter().map(|(c, _)| c).collect();
    assert_eq!(commands, vec!["o".to_string()]);

    h.at(6000).await;
    assert!(h.drain().is_empty());
}

#[tokio::test(start_paused = true)]
async fn press_on_dead_link_resets_immediately() {
    let mut h = Harness::start(EngineConfig::timer()).await;
    let id = first_cycle();
    h.mock.set_connected(false);

    assert!(h.mock.inject_distance(2.0));
    settle().await;

    let events = h.drain();
    assert_eq!(
        events,
        vec![
            EngineEvent::ButtonPressed {
                cycle: id,
                sample: MeasurementSample::new(2.0, 0),
            },
            EngineEvent::LinkLost { cycle: id },
        ]
    );
    assert!(h.commands().is_empty());
    assert!(h.handle.snapshot().is_idle());
}

#[tokio::test(start_paused = true)]
async fn transient_write_failure_still_times_out() {
    let mut h = Harness::start(EngineConfig::timer()).await;
    let id = first_cycle();
    h.mock.set_fail_writes(true);

    assert!(h.mock.inject_distance(2.0));
    h.at(4010).await;

    let events = h.drain();
    let failed: Vec<DistoCommand> = events
        .iter()
        .filter_map(|e| match e {
            EngineEvent::CommandFailed { command, .. } => Some(*command),
            _ => None,
        })
        .collect();
    assert_eq!(failed, vec![DistoCommand::LaserOn, DistoCommand::Measure]);
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, EngineEvent::LaserActivated { .. }))
    );
    assert_eq!(events.last(), Some(&EngineEvent::MeasurementTimeout { cycle: id }));
    assert!(h.handle.snapshot().is_idle());
}

#[tokio::test(start_paused = true)]
async fn unit_updates_apply_to_next_sample() {
    let mut h = Harness::start(EngineConfig::timer()).await;

    assert!(h.mock.inject_distance(1.0));
    h.at(100).await;
    assert!(h.mock.inject_unit(6));
    h.at(1100).await;
    assert!(h.mock.inject_distance(1.5));
    settle().await;

    let samples = finalized(&h.drain());
    assert_eq!(samples, vec![MeasurementSample::new(1.5, 6)]);
    assert_eq!(h.handle.snapshot().unit_code, 6);
}

#[tokio::test(start_paused = true)]
async fn malformed_payloads_are_not_fatal() {
    let mut h = Harness::start(EngineConfig::direct()).await;

    assert!(h.mock.inject_raw(Characteristic::Distance, &[1, 2, 3]));
    assert!(h.mock.inject_raw(Characteristic::DistanceUnit, &[]));
    settle().await;

    assert_eq!(
        h.drain(),
        vec![
            EngineEvent::DecodeWarning {
                characteristic: Characteristic::Distance,
                len: 3,
            },
            EngineEvent::Finalized {
                sample: MeasurementSample::new(0.0, 0),
                cycle: None,
            },
            EngineEvent::UnitChanged { unit_code: 0 },
        ]
    );

    // 超长负载上报原始长度
    assert!(h.mock.inject_raw(Characteristic::Distance, &[0u8; 24]));
    settle().await;
    assert_eq!(
        h.drain().first(),
        Some(&EngineEvent::DecodeWarning {
            characteristic: Characteristic::Distance,
            len: 24,
        })
    );

    // 引擎继续工作
    assert!(h.mock.inject_distance(4.25));
    settle().await;
    assert_eq!(finalized(&h.drain()), vec![MeasurementSample::new(4.25, 0)]);
}

#[tokio::test(start_paused = true)]
async fn stray_unit_notification_produces_no_sample() {
    let mut h = Harness::start(EngineConfig::timer()).await;

    assert!(h.mock.inject_unit(1));
    h.at(5000).await;
    let events = h.drain();
    assert_eq!(events, vec![EngineEvent::UnitChanged { unit_code: 1 }]);
    assert!(h.commands().is_empty());
}

#[tokio::test(start_paused = true)]
async fn manual_commands_do_not_touch_cycle_state() {
    let mut h = Harness::start(EngineConfig::direct()).await;

    assert_eq!(h.handle.send_token("gi").await.unwrap(), DistoCommand::MeasureWithAngle);
    h.handle.send(DistoCommand::LaserOff).await.unwrap();
    assert!(h.handle.send_token("x").await.is_err());

    let commands: Vec<String> = h.commands().into_iter().map(|(c, _)| c).collect();
    assert_eq!(commands, vec!["gi".to_string(), "p".to_string()]);
    assert!(h.handle.snapshot().is_idle());
    assert!(h.drain().is_empty());
}

#[tokio::test(start_paused = true)]
async fn stream_end_reports_disconnect() {
    let mut h = Harness::start(EngineConfig::timer()).await;
    h.mock.end_notifications();
    settle().await;
    assert_eq!(h.drain(), vec![EngineEvent::Disconnected]);
}

#[tokio::test(start_paused = true)]
async fn shutdown_mid_cycle_closes_link() {
    let mut h = Harness::start(EngineConfig::timer()).await;

    assert!(h.mock.inject_distance(2.0));
    settle().await;
    h.drain();

    let mock = h.mock.clone();
    h.handle.shutdown().await.unwrap();
    assert!(!mock.is_connected());
    assert_eq!(
        mock.operations().last().map(|op| op.kind.clone()),
        Some(MockOperationKind::Close)
    );

    // 延迟任务已中止：不再发送测量命令，也不会上报超时
    sleep_until(h.t0 + Duration::from_secs(6)).await;
    settle().await;
    let mut rest = Vec::new();
    while let Ok(event) = h.events.try_recv() {
        rest.push(event);
    }
    assert!(rest.is_empty(), "{:?}", rest);
    let commands: Vec<Vec<u8>> = mock.sent_commands().into_iter().map(|(p, _)| p).collect();
    assert_eq!(commands, vec![b"o".to_vec()]);
}

#[tokio::test(start_paused = true)]
async fn dropping_handle_mid_cycle_cancels_measure() {
    let Harness {
        mock,
        handle,
        mut events,
        t0,
    } = Harness::start(EngineConfig::timer()).await;

    assert!(mock.inject_distance(2.0));
    settle().await;
    sleep_until(t0 + Duration::from_millis(500)).await;
    drop(handle);

    sleep_until(t0 + Duration::from_secs(6)).await;
    settle().await;

    let commands: Vec<Vec<u8>> = mock.sent_commands().into_iter().map(|(p, _)| p).collect();
    assert_eq!(commands, vec![b"o".to_vec()]);
    let mut rest = Vec::new();
    while let Ok(event) = events.try_recv() {
        rest.push(event);
    }
    assert!(
        !rest.iter().any(|e| matches!(
            e,
            EngineEvent::MeasureTriggered { .. } | EngineEvent::MeasurementTimeout { .. }
        )),
        "{:?}",
        rest
    );
}
