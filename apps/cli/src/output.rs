//! 终端输出
//!
//! 把引擎事件渲染成用户提示。数值固定 3 位小数，小数点可配置。

use clap::ValueEnum;
use disto_sdk::{EngineEvent, MeasurementSample};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 小数分隔符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
pub enum Separator {
    /// `1.234`
    #[value(name = ".")]
    #[serde(rename = ".")]
    Dot,
    /// `1,234`
    #[default]
    #[value(name = ",")]
    #[serde(rename = ",")]
    Comma,
}

impl Separator {
    pub fn as_char(self) -> char {
        match self {
            Separator::Dot => '.',
            Separator::Comma => ',',
        }
    }
}

impl std::fmt::Display for Separator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// 3 位小数，使用指定的小数分隔符
pub fn format_value(value: f32, separator: Separator) -> String {
    let text = format!("{:.3}", value);
    match separator {
        Separator::Dot => text,
        Separator::Comma => text.replace('.', ","),
    }
}

/// 数值 + 单位标签
pub fn format_sample(sample: &MeasurementSample, separator: Separator) -> String {
    format!("{} {}", format_value(sample.value, separator), sample.unit())
}

/// "1.0 second" / "2.5 seconds"
pub fn delay_text(delay: Duration) -> String {
    let secs = delay.as_secs_f64();
    if secs == 1.0 {
        format!("{:.1} second", secs)
    } else {
        format!("{:.1} seconds", secs)
    }
}

/// 事件渲染
#[derive(Debug, Clone, Copy)]
pub struct Presenter {
    pub separator: Separator,
    pub delay: Duration,
}

impl Presenter {
    pub fn new(separator: Separator, delay: Duration) -> Self {
        Self { separator, delay }
    }

    /// 事件对应的提示；不需要提示的事件返回 `None`
    pub fn render(&self, event: &EngineEvent) -> Option<String> {
        let line = match event {
            EngineEvent::ButtonPressed { sample, .. } => format!(
                "⏱️  Button detected (measurement: {}) - measuring in {}...",
                format_sample(sample, self.separator),
                delay_text(self.delay)
            ),
            EngineEvent::LaserActivated { .. } => "🔴 Laser activated - aim at target...".to_string(),
            EngineEvent::MeasureTriggered { .. } => "📡 Measuring...".to_string(),
            EngineEvent::Finalized {
                sample,
                cycle: Some(_),
            } => format!("✓ Final measurement: {}\n", format_sample(sample, self.separator)),
            EngineEvent::Finalized { sample, cycle: None } => {
                format!("📏 Distance: {}\n", format_sample(sample, self.separator))
            },
            EngineEvent::MeasurementTimeout { .. } => {
                "⚠️  Timeout - no measurement received, resetting...".to_string()
            },
            EngineEvent::LinkLost { .. } => "❌ Error: connection lost".to_string(),
            EngineEvent::CommandFailed { command, error } => {
                format!("⚠️  Error sending command {}: {}", command, error)
            },
            EngineEvent::DecodeWarning { len, .. } => {
                format!("⚠️  Warning: expected 4 bytes, got {}", len)
            },
            EngineEvent::Disconnected => "❌ Device disconnected".to_string(),
            EngineEvent::UnitChanged { .. } => return None,
        };
        Some(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use disto_sdk::client::CycleId;
    use disto_sdk::DistoCommand;

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(1.2344, Separator::Dot), "1.234");
        assert_eq!(format_value(1.2346, Separator::Comma), "1,235");
        assert_eq!(format_value(3.0, Separator::Comma), "3,000");
        assert_eq!(format_value(0.0, Separator::Dot), "0.000");
    }

    #[test]
    fn test_delay_text() {
        assert_eq!(delay_text(Duration::from_secs(1)), "1.0 second");
        assert_eq!(delay_text(Duration::from_millis(2500)), "2.5 seconds");
        assert_eq!(delay_text(Duration::ZERO), "0.0 seconds");
    }

    #[test]
    fn test_render_events() {
        let presenter = Presenter::new(Separator::Comma, Duration::from_secs(1));
        let cycle = CycleId::new(1);

        let line = presenter
            .render(&EngineEvent::ButtonPressed {
                cycle,
                sample: MeasurementSample::new(2.43, 0),
            })
            .unwrap();
        assert_eq!(
            line,
            "⏱️  Button detected (measurement: 2,430 m) - measuring in 1.0 second..."
        );

        let line = presenter
            .render(&EngineEvent::Finalized {
                sample: MeasurementSample::new(2.5, 12),
                cycle: Some(cycle),
            })
            .unwrap();
        assert_eq!(line, "✓ Final measurement: 2,500 unknown(12)\n");

        let line = presenter
            .render(&EngineEvent::Finalized {
                sample: MeasurementSample::new(3.0, 3),
                cycle: None,
            })
            .unwrap();
        assert_eq!(line, "📏 Distance: 3,000 mm\n");

        let line = presenter
            .render(&EngineEvent::CommandFailed {
                command: DistoCommand::LaserOn,
                error: "busy".into(),
            })
            .unwrap();
        assert!(line.contains("laser-on"));

        assert!(presenter.render(&EngineEvent::UnitChanged { unit_code: 1 }).is_none());
    }
}
