//! 队伍颜色
//!
//! 场地左右对称，蓝队的动作序列是黄队序列左右镜像后的结果。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 队伍颜色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamColor {
    Yellow,
    Blue,
}

impl TeamColor {
    pub fn as_str(self) -> &'static str {
        match self {
            TeamColor::Yellow => "yellow",
            TeamColor::Blue => "blue",
        }
    }

    /// 是否需要对基准（黄队）序列做左右镜像
    pub fn is_mirrored(self) -> bool {
        self == TeamColor::Blue
    }
}

impl fmt::Display for TeamColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 颜色解析错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown team color '{0}' (expected 'yellow' or 'blue')")]
pub struct ParseColorError(pub String);

impl FromStr for TeamColor {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yellow" => Ok(TeamColor::Yellow),
            "blue" => Ok(TeamColor::Blue),
            _ => Err(ParseColorError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_color() {
        assert_eq!("yellow".parse::<TeamColor>(), Ok(TeamColor::Yellow));
        assert_eq!(" Blue ".parse::<TeamColor>(), Ok(TeamColor::Blue));
        assert!("green".parse::<TeamColor>().is_err());
    }

    #[test]
    fn test_only_blue_is_mirrored() {
        assert!(TeamColor::Blue.is_mirrored());
        assert!(!TeamColor::Yellow.is_mirrored());
        assert_eq!(TeamColor::Yellow.to_string(), "yellow");
    }
}
