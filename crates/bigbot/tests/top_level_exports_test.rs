//! 顶层导出测试
//!
//! 验证常用类型可以从 `bigbot` 顶层和 prelude 直接导入

use bigbot::{
    ConfigError, DriverError, FsmError, HalError, RobotBuilder, RobotConfig, SequenceCatalog,
    StateId, TeamColor,
};

#[test]
fn test_top_level_exports() {
    let _builder: RobotBuilder = RobotBuilder::new();
    let _hal: HalError = HalError::Unavailable("board".to_string());
    let _driver: DriverError = DriverError::MissingDevice("motors");
    let _fsm: FsmError = FsmError::Configuration { id: StateId::Idle };
    let _config: Result<RobotConfig, ConfigError> = RobotConfig::from_toml_str("");

    let plan = SequenceCatalog::new(&RobotConfig::default().motion).match_plan(TeamColor::Yellow);
    assert!(!plan.is_empty());
}

#[test]
fn test_prelude_exports() {
    use bigbot::prelude::*;

    let _registry: StateRegistry = StateRegistry::with_defaults();
    let _command: Command = Command::stop();
    let _position: UsPosition = UsPosition::FrontLeft;
    let _group: ServoGroup = ServoGroup::CentralClaws;
}

#[test]
fn test_logger_init_is_idempotent() {
    let _ = bigbot::init_logger("info");
    // 全局订阅者只能设置一次
    assert!(bigbot::init_logger("info").is_err());
}
