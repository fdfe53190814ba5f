//! 当前状态管理

use super::{StateContext, StateFactory, StateId, StateParams, StateRegistry};
use crate::error::FsmError;
use tracing::{info, warn};

/// 状态机（当前状态 + 工厂）
pub struct StateMachine {
    factory: StateFactory,
    current: Option<StateId>,
    params: StateParams,
}

impl StateMachine {
    pub fn new(registry: StateRegistry) -> Self {
        Self {
            factory: StateFactory::new(registry),
            current: None,
            params: StateParams::None,
        }
    }

    pub fn current(&self) -> Option<StateId> {
        self.current
    }

    /// 最近一次 `set_state` 请求的参数（包括被跳过的同状态切换）
    pub fn current_params(&self) -> StateParams {
        self.params.clone()
    }

    pub fn factory(&self) -> &StateFactory {
        &self.factory
    }

    /// 切换状态
    ///
    /// 先对旧状态调用 `exit()`，再对新状态调用 `enter(params)`。
    /// 新状态与当前状态相同时两者都跳过，只更新记录的参数，返回 `Ok(false)`。
    ///
    /// # 错误
    ///
    /// - 参数类型与状态不匹配：[`FsmError::InvalidStateParams`]（不发生切换）
    /// - 新状态未注册：[`FsmError::Configuration`]（不发生切换）
    /// - `enter()` 失败：错误原样返回，此时新状态已经是当前状态
    pub fn set_state(
        &mut self,
        ctx: &mut StateContext<'_>,
        id: StateId,
        params: StateParams,
    ) -> Result<bool, FsmError> {
        params.check(id)?;
        if self.current == Some(id) {
            self.params = params;
            return Ok(false);
        }

        // 先确认新状态可以构造，再离开旧状态
        self.factory.get_state(id)?;

        let previous = self.current;
        if let Some(old) = previous {
            let state = self.factory.get_state(old)?;
            if let Err(e) = state.exit(ctx) {
                warn!("Error while leaving state {}: {}", old, e);
            }
        }

        self.current = Some(id);
        self.params = params.clone();
        match previous {
            Some(old) => info!("State: {} -> {}", old, id),
            None => info!("State: {}", id),
        }
        self.factory.get_state(id)?.enter(ctx, &params)?;
        Ok(true)
    }

    /// 执行当前状态的 `execute()`
    pub fn execute_current(&mut self, ctx: &mut StateContext<'_>) -> Result<(), FsmError> {
        match self.current {
            Some(id) => self.factory.get_state(id)?.execute(ctx),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MatchClock;
    use crate::state::State;
    use bigbot_driver::{Robot, RobotBuilder};
    use bigbot_tools::RobotConfig;
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    /// 记录回调顺序的状态
    struct Recording {
        id: StateId,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl State for Recording {
        fn id(&self) -> StateId {
            self.id
        }

        fn enter(&mut self, _ctx: &mut StateContext<'_>, params: &StateParams) -> Result<(), FsmError> {
            self.log
                .lock()
                .unwrap()
                .push(format!("enter {} {:?}", self.id, params.kind()));
            Ok(())
        }

        fn execute(&mut self, _ctx: &mut StateContext<'_>) -> Result<(), FsmError> {
            self.log.lock().unwrap().push(format!("execute {}", self.id));
            Ok(())
        }

        fn exit(&mut self, _ctx: &mut StateContext<'_>) -> Result<(), FsmError> {
            self.log.lock().unwrap().push(format!("exit {}", self.id));
            Ok(())
        }
    }

    fn recording_machine(ids: &[StateId]) -> (StateMachine, Arc<Mutex<Vec<String>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = StateRegistry::new();
        for &id in ids {
            let log = log.clone();
            registry.register(id, move || {
                Box::new(Recording {
                    id,
                    log: log.clone(),
                })
            });
        }
        (StateMachine::new(registry), log)
    }

    fn robot() -> Robot {
        RobotBuilder::simulated().0.build().unwrap()
    }

    #[test]
    fn test_exit_then_enter_order() {
        let (mut machine, log) = recording_machine(&[StateId::Idle, StateId::MoveForward]);
        let mut robot = robot();
        let mut clock = MatchClock::new(Duration::from_secs(100));
        let config = RobotConfig::default();
        let mut ctx = StateContext {
            robot: &mut robot,
            clock: &mut clock,
            config: &config,
            now: Instant::now(),
        };

        assert!(machine.set_state(&mut ctx, StateId::Idle, StateParams::None).unwrap());
        machine.execute_current(&mut ctx).unwrap();
        let movement = StateParams::Movement {
            distance_cm: 20.0,
            speed: 0.5,
        };
        assert!(machine.set_state(&mut ctx, StateId::MoveForward, movement).unwrap());

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "enter idle None",
                "execute idle",
                "exit idle",
                "enter move-forward Movement",
            ]
        );
        assert_eq!(machine.current(), Some(StateId::MoveForward));
    }

    #[test]
    fn test_same_state_is_skipped() {
        let (mut machine, log) = recording_machine(&[StateId::Stop]);
        let mut robot = robot();
        let mut clock = MatchClock::new(Duration::from_secs(100));
        let config = RobotConfig::default();
        let mut ctx = StateContext {
            robot: &mut robot,
            clock: &mut clock,
            config: &config,
            now: Instant::now(),
        };

        assert!(machine.set_state(&mut ctx, StateId::Stop, StateParams::None).unwrap());
        assert!(!machine.set_state(&mut ctx, StateId::Stop, StateParams::None).unwrap());
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_same_state_refreshes_params() {
        let mut machine = StateMachine::new(StateRegistry::with_defaults());
        let mut robot = robot();
        let mut clock = MatchClock::new(Duration::from_secs(100));
        let config = RobotConfig::default();
        let mut ctx = StateContext {
            robot: &mut robot,
            clock: &mut clock,
            config: &config,
            now: Instant::now(),
        };

        let open = StateParams::actuation(&[150.0, 30.0]);
        let closed = StateParams::actuation(&[90.0, 90.0]);
        assert!(machine.set_state(&mut ctx, StateId::OpenClaw, open).unwrap());
        assert!(!machine.set_state(&mut ctx, StateId::OpenClaw, closed.clone()).unwrap());
        assert_eq!(machine.current_params(), closed);

        // 未注册或参数不匹配的请求不改变记录
        let err = machine.set_state(&mut ctx, StateId::OpenClaw, StateParams::None);
        assert!(err.is_err());
        assert_eq!(machine.current_params(), closed);
    }

    #[test]
    fn test_unregistered_target_keeps_current_state() {
        let (mut machine, log) = recording_machine(&[StateId::Idle]);
        let mut robot = robot();
        let mut clock = MatchClock::new(Duration::from_secs(100));
        let config = RobotConfig::default();
        let mut ctx = StateContext {
            robot: &mut robot,
            clock: &mut clock,
            config: &config,
            now: Instant::now(),
        };

        machine.set_state(&mut ctx, StateId::Idle, StateParams::None).unwrap();
        let err = machine
            .set_state(&mut ctx, StateId::AvoidObstacle, StateParams::None)
            .unwrap_err();
        assert!(matches!(
            err,
            FsmError::Configuration {
                id: StateId::AvoidObstacle
            }
        ));
        assert_eq!(machine.current(), Some(StateId::Idle));
        // 旧状态没有被 exit
        assert_eq!(*log.lock().unwrap(), vec!["enter idle None"]);
    }

    #[test]
    fn test_mismatched_params_rejected() {
        let mut machine = StateMachine::new(StateRegistry::with_defaults());
        let mut robot = robot();
        let mut clock = MatchClock::new(Duration::from_secs(100));
        let config = RobotConfig::default();
        let mut ctx = StateContext {
            robot: &mut robot,
            clock: &mut clock,
            config: &config,
            now: Instant::now(),
        };

        let err = machine
            .set_state(&mut ctx, StateId::Wait, StateParams::actuation(&[10.0]))
            .unwrap_err();
        assert!(matches!(err, FsmError::InvalidStateParams { .. }));
        assert_eq!(machine.current(), None);
    }

    #[test]
    fn test_current_params() {
        let mut machine = StateMachine::new(StateRegistry::with_defaults());
        let mut robot = robot();
        let mut clock = MatchClock::new(Duration::from_secs(100));
        let config = RobotConfig::default();
        let mut ctx = StateContext {
            robot: &mut robot,
            clock: &mut clock,
            config: &config,
            now: Instant::now(),
        };

        let params = StateParams::Wait {
            duration: Duration::from_millis(500),
        };
        machine
            .set_state(&mut ctx, StateId::Wait, params.clone())
            .unwrap();
        assert_eq!(machine.current_params(), params);
    }
}
