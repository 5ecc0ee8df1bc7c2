//! 命令词表
//!
//! 命令以 ASCII 字符串写入 `COMMAND` 特征。

use crate::ProtocolError;
use std::str::FromStr;

/// 设备命令
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DistoCommand {
    /// 测量距离（`g`）
    Measure,
    /// 测量距离 + 倾角（`gi`）
    MeasureWithAngle,
    /// 仅测量倾角（`iv`）
    MeasureAngle,
    /// 打开激光（`o`）
    LaserOn,
    /// 关闭激光（`p`）
    LaserOff,
}

impl DistoCommand {
    /// 全部命令
    pub const ALL: [DistoCommand; 5] = [
        DistoCommand::Measure,
        DistoCommand::MeasureWithAngle,
        DistoCommand::MeasureAngle,
        DistoCommand::LaserOn,
        DistoCommand::LaserOff,
    ];

    /// 设备指令（ASCII 助记符）
    pub fn token(self) -> &'static str {
        match self {
            DistoCommand::Measure => "g",
            DistoCommand::MeasureWithAngle => "gi",
            DistoCommand::MeasureAngle => "iv",
            DistoCommand::LaserOn => "o",
            DistoCommand::LaserOff => "p",
        }
    }

    /// 命令名称（kebab-case）
    pub fn name(self) -> &'static str {
        match self {
            DistoCommand::Measure => "measure",
            DistoCommand::MeasureWithAngle => "measure-angle",
            DistoCommand::MeasureAngle => "angle",
            DistoCommand::LaserOn => "laser-on",
            DistoCommand::LaserOff => "laser-off",
        }
    }

    /// 写入 `COMMAND` 特征的字节
    pub fn payload(self) -> &'static [u8] {
        self.token().as_bytes()
    }

    /// 是否会让设备回传距离通知
    pub fn triggers_measurement(self) -> bool {
        matches!(
            self,
            DistoCommand::Measure | DistoCommand::MeasureWithAngle
        )
    }
}

impl std::fmt::Display for DistoCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:?})", self.name(), self.token())
    }
}

impl FromStr for DistoCommand {
    type Err = ProtocolError;

    /// 同时接受设备指令（`g`、`gi` ...）和命令名称（`measure`、`laser-on` ...）
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        DistoCommand::ALL
            .into_iter()
            .find(|cmd| cmd.token() == needle || cmd.name().eq_ignore_ascii_case(needle))
            .ok_or_else(|| ProtocolError::UnknownCommand(needle.to_string()))
    }
}
