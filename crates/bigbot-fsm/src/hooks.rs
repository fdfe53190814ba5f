//! 钩子系统（Hook System）
//!
//! 序列管理器在命令开始/完成、暂停/恢复以及全部序列完成时触发回调，
//! 用于进度显示、日志和测试断言。
//!
//! # 使用示例
//!
//! ```rust
//! use bigbot_fsm::hooks::{HookManager, StepRecorder, StepHook};
//! use std::sync::Arc;
//!
//! let mut hooks = HookManager::new();
//! let (recorder, rx) = StepRecorder::new();
//! hooks.add_callback(Arc::new(recorder) as Arc<dyn StepHook>);
//! hooks.trigger_completed();
//! assert!(rx.try_recv().is_ok());
//! ```

use crossbeam_channel::{Receiver, Sender, bounded};
use std::fmt;
use std::sync::Arc;

/// 步骤位置：第几个序列的第几条命令（均从 0 开始）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepPosition {
    pub sequence: usize,
    pub command: usize,
}

impl fmt::Display for StepPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.sequence, self.command)
    }
}

/// 回调收到的步骤信息
#[derive(Debug, Clone, Copy)]
pub struct StepInfo<'a> {
    pub position: StepPosition,
    pub sequence_name: &'a str,
    pub command_name: &'static str,
}

/// 步骤回调 Trait
///
/// 回调在主循环线程上同步执行，实现必须非阻塞。
pub trait StepHook: Send + Sync {
    fn on_step_started(&self, step: &StepInfo<'_>);

    fn on_step_finished(&self, step: &StepInfo<'_>);

    fn on_paused(&self, step: &StepInfo<'_>) {
        let _ = step;
    }

    fn on_resumed(&self, step: &StepInfo<'_>) {
        let _ = step;
    }

    fn on_completed(&self) {}
}

/// 钩子管理器
#[derive(Default)]
pub struct HookManager {
    callbacks: Vec<Arc<dyn StepHook>>,
}

impl HookManager {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            callbacks: Vec::new(),
        }
    }

    pub fn add_callback(&mut self, callback: Arc<dyn StepHook>) {
        self.callbacks.push(callback);
    }

    pub fn clear(&mut self) {
        self.callbacks.clear();
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    pub fn trigger_started(&self, step: &StepInfo<'_>) {
        for callback in &self.callbacks {
            callback.on_step_started(step);
        }
    }

    pub fn trigger_finished(&self, step: &StepInfo<'_>) {
        for callback in &self.callbacks {
            callback.on_step_finished(step);
        }
    }

    pub fn trigger_paused(&self, step: &StepInfo<'_>) {
        for callback in &self.callbacks {
            callback.on_paused(step);
        }
    }

    pub fn trigger_resumed(&self, step: &StepInfo<'_>) {
        for callback in &self.callbacks {
            callback.on_resumed(step);
        }
    }

    pub fn trigger_completed(&self) {
        for callback in &self.callbacks {
            callback.on_completed();
        }
    }
}

/// 录制的步骤事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepEvent {
    Started {
        position: StepPosition,
        command: &'static str,
    },
    Finished {
        position: StepPosition,
        command: &'static str,
    },
    Paused {
        position: StepPosition,
    },
    Resumed {
        position: StepPosition,
    },
    Completed,
}

/// 把步骤事件转发到 Channel 的钩子
///
/// 使用 `try_send`，缓冲区满时丢弃事件，不阻塞主循环。
pub struct StepRecorder {
    sender: Sender<StepEvent>,
}

impl StepRecorder {
    /// 默认缓冲区容量
    pub const DEFAULT_CAPACITY: usize = 1024;

    pub fn new() -> (Self, Receiver<StepEvent>) {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> (Self, Receiver<StepEvent>) {
        let (sender, receiver) = bounded(capacity);
        (Self { sender }, receiver)
    }
}

impl StepHook for StepRecorder {
    fn on_step_started(&self, step: &StepInfo<'_>) {
        let _ = self.sender.try_send(StepEvent::Started {
            position: step.position,
            command: step.command_name,
        });
    }

    fn on_step_finished(&self, step: &StepInfo<'_>) {
        let _ = self.sender.try_send(StepEvent::Finished {
            position: step.position,
            command: step.command_name,
        });
    }

    fn on_paused(&self, step: &StepInfo<'_>) {
        let _ = self.sender.try_send(StepEvent::Paused {
            position: step.position,
        });
    }

    fn on_resumed(&self, step: &StepInfo<'_>) {
        let _ = self.sender.try_send(StepEvent::Resumed {
            position: step.position,
        });
    }

    fn on_completed(&self) {
        let _ = self.sender.try_send(StepEvent::Completed);
    }
}
