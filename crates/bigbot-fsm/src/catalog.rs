//! 比赛序列目录
//!
//! 所有序列以黄方场地为基准编写；蓝方使用左右镜像后的版本
//! （旋转方向互换，左右传感器互换）。
//!
//! # 示例
//!
//! ```rust
//! use bigbot_fsm::catalog::SequenceCatalog;
//! use bigbot_tools::{MotionConfig, TeamColor};
//!
//! let catalog = SequenceCatalog::new(&MotionConfig::default());
//! let plan = catalog.match_plan(TeamColor::Blue);
//! assert_eq!(plan[0].name(), "init");
//! ```

use crate::command::Command;
use crate::sequence::Sequence;
use crate::state::StateId;
use bigbot_driver::{ServoGroup, UsPosition};
use bigbot_tools::{MotionConfig, TeamColor};
use std::time::Duration;

/// 中央夹爪张开角度（左、右）
pub const CLAW_OPEN: [f64; 2] = [150.0, 30.0];
/// 中央夹爪闭合角度
pub const CLAW_CLOSED: [f64; 2] = [90.0, 90.0];
/// 外侧夹爪收起角度
pub const OUTER_STOWED: [f64; 2] = [40.0, 40.0];
pub const BANNER_DEPLOYED: f64 = 180.0;
pub const BANNER_STOWED: f64 = 0.0;

/// 小机器人离开终点区的比赛时间
pub const END_ZONE_CLEAR_TIME: Duration = Duration::from_secs(85);

/// 序列目录
#[derive(Debug, Clone)]
pub struct SequenceCatalog {
    speed: f64,
    quarter_turn: f64,
}

impl SequenceCatalog {
    /// 所有可按名称获取的序列
    pub const NAMES: [&'static str; 9] = [
        "init",
        "deploy_banner",
        "first_can_move",
        "first_can_build_move",
        "sprint_to_cans",
        "end_zone_approach",
        "end_zone_entry",
        "claw_test",
        "wheel_test",
    ];

    pub fn new(motion: &MotionConfig) -> Self {
        Self {
            speed: motion.default_speed,
            quarter_turn: motion.quarter_turn_degrees,
        }
    }

    /// 比赛方案：按顺序执行的序列列表
    pub fn match_plan(&self, color: TeamColor) -> Vec<Sequence> {
        [
            self.init(),
            self.deploy_banner(),
            self.sprint_to_cans(),
            self.end_zone_approach(),
            self.end_zone_entry(),
        ]
        .into_iter()
        .map(|sequence| for_color(sequence, color))
        .collect()
    }

    /// 按名称获取序列，未知名称返回 `None`
    pub fn by_name(&self, name: &str, color: TeamColor) -> Option<Sequence> {
        let sequence = match name {
            "init" => self.init(),
            "deploy_banner" => self.deploy_banner(),
            "first_can_move" => self.first_can_move(),
            "first_can_build_move" => self.first_can_build_move(),
            "sprint_to_cans" => self.sprint_to_cans(),
            "end_zone_approach" => self.end_zone_approach(),
            "end_zone_entry" => self.end_zone_entry(),
            "claw_test" => self.claw_test(),
            "wheel_test" => self.wheel_test(),
            _ => return None,
        };
        Some(for_color(sequence, color))
    }

    // ========== 序列定义（黄方） ==========

    pub fn init(&self) -> Sequence {
        Sequence::new(
            "init",
            vec![
                Command::show_score(),
                Command::servo(ServoGroup::CentralClaws, &CLAW_CLOSED, StateId::CloseClaw),
                Command::stop(),
            ],
        )
    }

    pub fn deploy_banner(&self) -> Sequence {
        Sequence::new(
            "deploy_banner",
            vec![
                // 横幅在车尾，后退贴边时后方传感器会看到场地边框
                Command::disable_sensors(&UsPosition::BACK),
                Command::move_backward(5.0, self.speed),
                Command::servo(ServoGroup::BannerDeployer, &[BANNER_DEPLOYED], StateId::Actuate),
                Command::move_forward(5.0, self.speed),
                Command::servo(ServoGroup::BannerDeployer, &[BANNER_STOWED], StateId::Actuate),
                Command::enable_sensors(&UsPosition::BACK),
            ],
        )
    }

    pub fn first_can_move(&self) -> Sequence {
        let turn = self.quarter_turn;
        Sequence::new(
            "first_can_move",
            vec![
                Command::toggle_sensors(&UsPosition::FRONT),
                Command::move_forward(50.0, self.speed),
                Command::rotate_left(turn, self.speed),
                Command::toggle_sensors(&UsPosition::FRONT),
                Command::move_forward(50.0, self.speed),
                Command::rotate_right(turn, self.speed),
                Command::move_forward(30.0, self.speed),
            ],
        )
    }

    pub fn first_can_build_move(&self) -> Sequence {
        let turn = self.quarter_turn;
        Sequence::new(
            "first_can_build_move",
            vec![
                Command::move_backward(30.0, self.speed),
                Command::rotate_right(turn, self.speed),
                Command::move_forward(15.0, self.speed),
                Command::rotate_right(turn, self.speed),
                Command::move_forward(40.0, self.speed),
            ],
        )
    }

    /// 冲向罐子区：出发区 → 第一排罐子 → 建造区
    pub fn sprint_to_cans(&self) -> Sequence {
        let turn = self.quarter_turn;
        Sequence::new(
            "sprint_to_cans",
            vec![
                Command::toggle_sensors(&UsPosition::BACK),
                Command::move_forward(50.0, self.speed),
                Command::toggle_sensors(&UsPosition::BACK),
                Command::rotate_left(turn, self.speed),
                Command::move_forward(55.0, self.speed),
                // 推罐子时前方传感器会被罐子触发
                Command::toggle_sensors(&UsPosition::FRONT),
                Command::rotate_left(turn, self.speed),
                Command::move_forward(60.0, self.speed),
                Command::move_backward(60.0, self.speed),
                Command::rotate_right(turn, self.speed),
                Command::toggle_sensors(&UsPosition::FRONT),
                Command::move_forward(40.0, self.speed),
                Command::rotate_right(110.0, self.speed),
                Command::move_forward(140.0, self.speed),
                Command::servo(ServoGroup::CentralClaws, &CLAW_CLOSED, StateId::CloseClaw),
            ],
        )
    }

    /// 靠近终点区，并等到小机器人离开
    pub fn end_zone_approach(&self) -> Sequence {
        Sequence::new(
            "end_zone_approach",
            vec![
                Command::move_backward(30.0, self.speed),
                Command::rotate_right(self.quarter_turn, self.speed),
                Command::move_forward(40.0, self.speed),
                Command::wait_until(END_ZONE_CLEAR_TIME),
            ],
        )
    }

    pub fn end_zone_entry(&self) -> Sequence {
        Sequence::new(
            "end_zone_entry",
            vec![
                Command::move_forward(30.0, self.speed),
                Command::servo(ServoGroup::CentralClaws, &CLAW_OPEN, StateId::OpenClaw),
                Command::stop(),
            ],
        )
    }

    pub fn claw_test(&self) -> Sequence {
        Sequence::new(
            "claw_test",
            vec![
                Command::servo(ServoGroup::All, &[150.0; 4], StateId::Actuate),
                Command::servo(ServoGroup::All, &[90.0; 4], StateId::Actuate),
                Command::servo(ServoGroup::All, &[150.0; 4], StateId::Actuate),
                Command::servo(ServoGroup::Outer, &OUTER_STOWED, StateId::Actuate),
            ],
        )
    }

    pub fn wheel_test(&self) -> Sequence {
        Sequence::new("wheel_test", vec![Command::rotate_left(10.0, self.speed)])
    }
}

fn for_color(sequence: Sequence, color: TeamColor) -> Sequence {
    if color.is_mirrored() {
        sequence.mirrored()
    } else {
        sequence
    }
}
