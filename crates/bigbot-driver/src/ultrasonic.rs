//! 超声波避障
//!
//! 每个传感器按安装位置（[`UsPosition`]）登记，可单独启用/禁用。
//! 障碍判定只做简单阈值比较，再经过边沿检测得到 [`UsEvent`]：
//!
//! | 上次 | 本次 | 事件 |
//! |------|------|------|
//! | 无   | 有   | `ObstacleDetected` |
//! | 有   | 有   | `ObstaclePresent` |
//! | 有   | 无   | `ObstacleCleared` |
//! | 无   | 无   | `NoEvent` |

use bigbot_hal::RangeSensor;
use bigbot_tools::ObstacleConfig;
use smallvec::SmallVec;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// 传感器安装位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UsPosition {
    FrontLeft,
    FrontRight,
    BackLeft,
    BackRight,
}

impl UsPosition {
    pub const ALL: [UsPosition; 4] = [
        UsPosition::FrontLeft,
        UsPosition::FrontRight,
        UsPosition::BackLeft,
        UsPosition::BackRight,
    ];
    pub const FRONT: [UsPosition; 2] = [UsPosition::FrontLeft, UsPosition::FrontRight];
    pub const BACK: [UsPosition; 2] = [UsPosition::BackLeft, UsPosition::BackRight];

    /// 左右镜像
    pub fn mirrored(self) -> Self {
        match self {
            UsPosition::FrontLeft => UsPosition::FrontRight,
            UsPosition::FrontRight => UsPosition::FrontLeft,
            UsPosition::BackLeft => UsPosition::BackRight,
            UsPosition::BackRight => UsPosition::BackLeft,
        }
    }
}

/// 一组传感器位置
pub type UsPositions = SmallVec<[UsPosition; 4]>;

/// 避障事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsEvent {
    NoEvent,
    ObstacleDetected,
    ObstaclePresent,
    ObstacleCleared,
}

struct SensorSlot {
    sensor: Box<dyn RangeSensor>,
    enabled: bool,
    last_distance: Option<f64>,
}

/// 超声波控制器
pub struct UltrasonicController {
    sensors: BTreeMap<UsPosition, SensorSlot>,
    config: ObstacleConfig,
    obstacle: bool,
}

impl UltrasonicController {
    pub fn new(config: ObstacleConfig) -> Self {
        Self {
            sensors: BTreeMap::new(),
            config,
            obstacle: false,
        }
    }

    /// 登记传感器（默认启用）；同一位置重复登记会替换旧传感器
    pub fn add_sensor(&mut self, position: UsPosition, sensor: Box<dyn RangeSensor>) {
        self.sensors.insert(
            position,
            SensorSlot {
                sensor,
                enabled: true,
                last_distance: None,
            },
        );
    }

    pub fn has_sensor(&self, position: UsPosition) -> bool {
        self.sensors.contains_key(&position)
    }

    /// 启用传感器；未登记的位置返回 `false`
    pub fn enable_sensor(&mut self, position: UsPosition) -> bool {
        match self.sensors.get_mut(&position) {
            Some(slot) => {
                slot.enabled = true;
                true
            },
            None => {
                warn!("No ultrasonic sensor at {:?}", position);
                false
            },
        }
    }

    /// 禁用传感器并丢弃其读数
    pub fn disable_sensor(&mut self, position: UsPosition) -> bool {
        match self.sensors.get_mut(&position) {
            Some(slot) => {
                slot.enabled = false;
                slot.last_distance = None;
                true
            },
            None => {
                warn!("No ultrasonic sensor at {:?}", position);
                false
            },
        }
    }

    /// 翻转传感器启用状态，返回新状态
    pub fn toggle_sensor(&mut self, position: UsPosition) -> Option<bool> {
        let enabled = self.sensors.get(&position)?.enabled;
        if enabled {
            self.disable_sensor(position);
        } else {
            self.enable_sensor(position);
        }
        Some(!enabled)
    }

    pub fn is_enabled(&self, position: UsPosition) -> bool {
        self.sensors.get(&position).is_some_and(|slot| slot.enabled)
    }

    pub fn enabled_sensors(&self) -> UsPositions {
        self.sensors
            .iter()
            .filter(|(_, slot)| slot.enabled)
            .map(|(&position, _)| position)
            .collect()
    }

    /// 读取所有启用传感器的距离
    ///
    /// 单个传感器读取失败只记录告警，其读数按"无回波"处理。
    pub fn measure_distances(&mut self) {
        for (position, slot) in self.sensors.iter_mut() {
            if !slot.enabled {
                continue;
            }
            slot.last_distance = match slot.sensor.distance_cm() {
                Ok(distance) => distance,
                Err(e) => {
                    warn!("Ultrasonic {:?} read failed: {}", position, e);
                    None
                },
            };
        }
    }

    /// 最近一次读数
    pub fn distance(&self, position: UsPosition) -> Option<f64> {
        self.sensors.get(&position).and_then(|slot| slot.last_distance)
    }

    fn closest(&self) -> Option<(UsPosition, f64)> {
        self.sensors
            .iter()
            .filter(|(_, slot)| slot.enabled)
            .filter_map(|(&position, slot)| slot.last_distance.map(|d| (position, d)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// 根据最近一次读数判定避障事件
    pub fn check_obstacles(&mut self) -> UsEvent {
        let closest = self.closest();
        let obstacle = match closest {
            Some((_, distance)) if self.obstacle => {
                distance < self.config.threshold_cm + self.config.clear_margin_cm
            },
            Some((_, distance)) => distance < self.config.threshold_cm,
            None => false,
        };

        let event = match (self.obstacle, obstacle) {
            (false, true) => UsEvent::ObstacleDetected,
            (true, true) => UsEvent::ObstaclePresent,
            (true, false) => UsEvent::ObstacleCleared,
            (false, false) => UsEvent::NoEvent,
        };
        self.obstacle = obstacle;

        match event {
            UsEvent::ObstacleDetected => {
                if let Some((position, distance)) = closest {
                    info!("Obstacle detected by {:?} at {:.1} cm", position, distance);
                }
            },
            UsEvent::ObstacleCleared => info!("Obstacle cleared"),
            UsEvent::ObstaclePresent => debug!("Obstacle still present"),
            UsEvent::NoEvent => {},
        }
        event
    }

    /// 当前是否处于"有障碍"状态
    pub fn obstacle_present(&self) -> bool {
        self.obstacle
    }
}
