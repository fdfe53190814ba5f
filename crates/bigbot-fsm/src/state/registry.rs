//! 状态注册表与工厂
//!
//! 注册是显式的：在构造状态机时传入 [`StateRegistry`]，没有全局缓存。

use super::builtin::{ActionState, AvoidObstacleState, IdleState, StopState};
use super::{State, StateId};
use crate::error::FsmError;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tracing::debug;

/// 状态构造函数
pub type StateConstructor = Box<dyn Fn() -> Box<dyn State> + Send>;

/// 状态注册表：`StateId → 构造函数`
///
/// # 示例
///
/// ```
/// use bigbot_fsm::state::{StateId, StateRegistry, StopState};
///
/// let mut registry = StateRegistry::new();
/// registry.register(StateId::Stop, || Box::new(StopState::new()));
/// assert!(registry.is_registered(StateId::Stop));
/// assert!(!registry.is_registered(StateId::Idle));
/// ```
#[derive(Default)]
pub struct StateRegistry {
    constructors: HashMap<StateId, StateConstructor>,
}

impl StateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册全部内置状态
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry
            .register(StateId::Idle, || Box::new(IdleState::new()))
            .register(StateId::Stop, || Box::new(StopState::new()))
            .register(StateId::AvoidObstacle, || {
                Box::new(AvoidObstacleState::new())
            });
        for id in [
            StateId::MoveForward,
            StateId::MoveBackward,
            StateId::RotateLeft,
            StateId::RotateRight,
            StateId::OpenClaw,
            StateId::CloseClaw,
            StateId::Actuate,
            StateId::Wait,
        ] {
            registry.register(id, move || Box::new(ActionState::new(id)));
        }
        registry
    }

    /// 注册（或替换）一个状态的构造函数
    pub fn register<F>(&mut self, id: StateId, constructor: F) -> &mut Self
    where
        F: Fn() -> Box<dyn State> + Send + 'static,
    {
        self.constructors.insert(id, Box::new(constructor));
        self
    }

    pub fn is_registered(&self, id: StateId) -> bool {
        self.constructors.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

/// 状态工厂
///
/// 第一次请求时构造实例并缓存，之后返回同一个实例。
pub struct StateFactory {
    registry: StateRegistry,
    cache: HashMap<StateId, Box<dyn State>>,
}

impl StateFactory {
    pub fn new(registry: StateRegistry) -> Self {
        Self {
            registry,
            cache: HashMap::new(),
        }
    }

    /// 获取（必要时构造）状态实例
    ///
    /// # 错误
    ///
    /// `id` 未注册时返回 [`FsmError::Configuration`]。
    pub fn get_state(&mut self, id: StateId) -> Result<&mut dyn State, FsmError> {
        match self.cache.entry(id) {
            Entry::Occupied(entry) => Ok(entry.into_mut().as_mut()),
            Entry::Vacant(entry) => {
                let constructor = self
                    .registry
                    .constructors
                    .get(&id)
                    .ok_or(FsmError::Configuration { id })?;
                debug!("Constructing state {}", id);
                Ok(entry.insert(constructor()).as_mut())
            },
        }
    }

    /// 已缓存的实例（不触发构造）
    pub fn cached(&self, id: StateId) -> Option<&dyn State> {
        self.cache.get(&id).map(|state| state.as_ref())
    }

    /// 已构造的实例数量
    pub fn constructed_count(&self) -> usize {
        self.cache.len()
    }

    pub fn registry(&self) -> &StateRegistry {
        &self.registry
    }
}
