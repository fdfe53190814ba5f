//! 模拟场地：拉线和障碍物脚本

use anyhow::{Context, Result, bail};
use bigbot::driver::SimProbes;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing::info;

/// 障碍物出现时模拟的测距读数（cm）
const OBSTACLE_DISTANCE_CM: f64 = 5.0;

/// 启动后多久模拟拔出拉线
pub const START_DELAY: Duration = Duration::from_millis(500);

/// 一段障碍物出现的比赛时间窗口 `AT:FOR`（秒）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObstacleWindow {
    pub at: Duration,
    pub duration: Duration,
}

impl ObstacleWindow {
    pub fn contains(&self, match_time: Duration) -> bool {
        match_time >= self.at && match_time < self.at + self.duration
    }
}

impl FromStr for ObstacleWindow {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (at, duration) = s
            .split_once(':')
            .context("expected AT:FOR in seconds, e.g. 12.5:3")?;
        let at: f64 = at.trim().parse().with_context(|| format!("invalid AT '{}'", at))?;
        let duration: f64 = duration
            .trim()
            .parse()
            .with_context(|| format!("invalid FOR '{}'", duration))?;
        if !(at.is_finite() && at >= 0.0 && duration.is_finite() && duration > 0.0) {
            bail!("AT must be >= 0 and FOR > 0, got {}:{}", at, duration);
        }
        Ok(Self {
            at: Duration::from_secs_f64(at),
            duration: Duration::from_secs_f64(duration),
        })
    }
}

/// 按脚本驱动模拟硬件的输入
pub struct SimField {
    probes: SimProbes,
    obstacles: Vec<ObstacleWindow>,
    launched: Instant,
    pull_start_switch: bool,
    blocked: bool,
}

impl SimField {
    pub fn new(probes: SimProbes, obstacles: Vec<ObstacleWindow>, pull_start_switch: bool) -> Self {
        Self {
            probes,
            obstacles,
            launched: Instant::now(),
            pull_start_switch,
            blocked: false,
        }
    }

    /// 每个周期在 `update()` 之前调用
    ///
    /// `match_time` 为 `None` 表示比赛尚未开始。
    pub fn step(&mut self, now: Instant, match_time: Option<Duration>) {
        match match_time {
            None => {
                if self.pull_start_switch && now.saturating_duration_since(self.launched) >= START_DELAY {
                    info!("Simulated start switch pulled");
                    self.probes.start_switch.toggle();
                    self.pull_start_switch = false;
                }
            },
            Some(elapsed) => {
                let blocked = self.obstacles.iter().any(|w| w.contains(elapsed));
                if blocked != self.blocked {
                    self.blocked = blocked;
                    if blocked {
                        info!("Simulated obstacle appears at {:.2}s", elapsed.as_secs_f64());
                    } else {
                        info!("Simulated obstacle leaves at {:.2}s", elapsed.as_secs_f64());
                    }
                    self.probes
                        .set_all_distances(blocked.then_some(OBSTACLE_DISTANCE_CM));
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_window() {
        let window: ObstacleWindow = "12.5:3".parse().unwrap();
        assert_eq!(window.at, Duration::from_millis(12500));
        assert_eq!(window.duration, Duration::from_secs(3));
        assert!(window.contains(Duration::from_secs(13)));
        assert!(!window.contains(Duration::from_millis(15500)));
    }

    #[test]
    fn test_parse_window_rejects_garbage() {
        assert!("12".parse::<ObstacleWindow>().is_err());
        assert!("a:1".parse::<ObstacleWindow>().is_err());
        assert!("1:0".parse::<ObstacleWindow>().is_err());
        assert!("-1:2".parse::<ObstacleWindow>().is_err());
    }
}
