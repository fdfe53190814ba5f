//! 序列管理器
//!
//! 按顺序执行序列列表中的每一条命令，任意时刻最多只有一条活动命令。
//!
//! # 阶段
//!
//! ```text
//!            execute_step()              pause()
//!   Idle ─────────────────> Executing ───────────> Paused
//!    ^   (新命令开始)            │    <───────────   │
//!    │                          │       resume()     │
//!    └──────────────────────────┘                    │
//!        (倒计时到期 / 即时命令完成)                    │
//!                                                    │
//!   所有序列执行完毕 ─────────────> Completed <─────────┘ shutdown()
//! ```
//!
//! # 保证
//!
//! - 每条被执行的命令恰好调用一次 `finished()`
//! - 命令严格按序列内顺序、序列严格按列表顺序执行，不跳过也不重复（`reset()` 除外）
//! - 倒计时到期只通过主循环处理，暂停与到期不会同时生效

use crate::command::{Command, CommandContext, Progress};
use crate::error::FsmError;
use crate::hooks::{HookManager, StepHook, StepInfo, StepPosition};
use crate::sequence::Sequence;
use crate::state::{StateId, StateParams};
use bigbot_driver::{Countdown, TimerService};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 管理器阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerPhase {
    /// 没有活动命令
    Idle,
    /// 活动命令执行中
    Executing,
    /// 活动命令已暂停
    Paused,
    /// 所有序列已完成（或已关闭）
    Completed,
}

/// 单次调用的结果
#[derive(Debug)]
pub enum StepOutcome {
    /// 没有发生变化（命令进行中、已暂停、或调用不合法被忽略）
    Unchanged,
    /// 新命令开始执行；即时命令此时已经完成
    Started {
        position: StepPosition,
        state: Option<(StateId, StateParams)>,
    },
    /// 活动命令的倒计时到期，命令已完成
    Finished { position: StepPosition },
    Paused { position: StepPosition },
    Resumed { position: StepPosition },
    /// 命令执行出错，已被中止并完成
    Failed {
        position: StepPosition,
        error: FsmError,
    },
    /// 所有序列已完成
    Completed,
}

struct ActiveStep {
    position: StepPosition,
    command: Command,
    countdown: Option<Countdown>,
}

/// 序列管理器
pub struct SequenceManager {
    sequences: Vec<Sequence>,
    timers: TimerService,
    sequence_index: usize,
    /// 当前序列中最后取出的命令下标；`None` 表示尚未取出
    command_index: Option<usize>,
    active: Option<ActiveStep>,
    phase: ManagerPhase,
    hooks: HookManager,
}

impl SequenceManager {
    pub fn new(sequences: Vec<Sequence>, timers: TimerService) -> Self {
        Self {
            sequences,
            timers,
            sequence_index: 0,
            command_index: None,
            active: None,
            phase: ManagerPhase::Idle,
            hooks: HookManager::new(),
        }
    }

    /// 创建管理器并启动专用的定时调度线程
    pub fn spawn(sequences: Vec<Sequence>) -> Result<Self, FsmError> {
        Ok(Self::new(sequences, TimerService::spawn()?))
    }

    // ========== 查询 ==========

    pub fn phase(&self) -> ManagerPhase {
        self.phase
    }

    /// 是否有已执行但尚未完成的命令
    pub fn is_executing(&self) -> bool {
        self.active.is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.phase == ManagerPhase::Paused
    }

    pub fn all_sequences_completed(&self) -> bool {
        self.phase == ManagerPhase::Completed
    }

    pub fn sequence_index(&self) -> usize {
        self.sequence_index
    }

    pub fn command_index(&self) -> Option<usize> {
        self.command_index
    }

    pub fn sequences(&self) -> &[Sequence] {
        &self.sequences
    }

    /// 活动命令的位置
    pub fn current_position(&self) -> Option<StepPosition> {
        self.active.as_ref().map(|active| active.position)
    }

    pub fn active_command(&self) -> Option<&Command> {
        self.active.as_ref().map(|active| &active.command)
    }

    pub fn active_countdown(&self) -> Option<&Countdown> {
        self.active.as_ref().and_then(|active| active.countdown.as_ref())
    }

    pub fn add_hook(&mut self, hook: Arc<dyn StepHook>) {
        self.hooks.add_callback(hook);
    }

    fn step_info(&self, position: StepPosition, command: &Command) -> StepInfo<'_> {
        StepInfo {
            position,
            sequence_name: self
                .sequences
                .get(position.sequence)
                .map(Sequence::name)
                .unwrap_or(""),
            command_name: command.name(),
        }
    }

    // ========== 推进 ==========

    /// 取出下一条命令（克隆自序列原型），必要时滚动到下一个序列
    ///
    /// 所有序列都已取完时返回 `None`。
    pub fn get_next_command(&mut self) -> Option<(StepPosition, Command)> {
        loop {
            let sequence = self.sequences.get(self.sequence_index)?;
            let next = self.command_index.map_or(0, |index| index + 1);
            if let Some(command) = sequence.get(next) {
                self.command_index = Some(next);
                let position = StepPosition {
                    sequence: self.sequence_index,
                    command: next,
                };
                return Some((position, command.clone()));
            }

            self.sequence_index += 1;
            self.command_index = None;
            if let Some(sequence) = self.sequences.get(self.sequence_index) {
                info!(
                    "Moving to sequence {} '{}'",
                    self.sequence_index,
                    sequence.name()
                );
            }
        }
    }

    /// 每个周期调用一次
    ///
    /// 先处理倒计时到期；没有活动命令时取出下一条命令并执行。
    /// 每次调用最多开始一条新命令。
    pub fn execute_step(&mut self, ctx: &mut CommandContext<'_>) -> StepOutcome {
        if self.phase == ManagerPhase::Completed {
            return StepOutcome::Completed;
        }
        if let Some(outcome) = self.poll_timers(ctx) {
            return outcome;
        }
        if self.phase == ManagerPhase::Paused || self.active.is_some() {
            return StepOutcome::Unchanged;
        }

        match self.get_next_command() {
            Some((position, command)) => self.start(ctx, position, command),
            None => {
                self.phase = ManagerPhase::Completed;
                info!("All sequences completed");
                self.hooks.trigger_completed();
                StepOutcome::Completed
            },
        }
    }

    fn start(
        &mut self,
        ctx: &mut CommandContext<'_>,
        position: StepPosition,
        mut command: Command,
    ) -> StepOutcome {
        info!(
            "Moving to step {} in sequence {}: {}",
            position.command,
            position.sequence,
            command.name()
        );
        self.hooks.trigger_started(&self.step_info(position, &command));
        let state = command.state();

        let executed = match &mut command {
            Command::Immediate(cmd) => cmd.execute(ctx).map(|()| None),
            Command::TimeBased(cmd) => cmd.execute(ctx).map(Some),
        };

        match executed {
            Ok(None) => {
                self.retire(ctx, position, command);
                self.phase = ManagerPhase::Idle;
                StepOutcome::Started { position, state }
            },
            Ok(Some(time_needed)) => {
                let countdown = self.timers.start_at(time_needed, ctx.now);
                self.active = Some(ActiveStep {
                    position,
                    command,
                    countdown: Some(countdown),
                });
                self.phase = ManagerPhase::Executing;
                StepOutcome::Started { position, state }
            },
            Err(error) => self.fail(ctx, position, command, error),
        }
    }

    /// 处理倒计时到期；活动命令完成时返回 `Finished`
    fn poll_timers(&mut self, ctx: &mut CommandContext<'_>) -> Option<StepOutcome> {
        let mut fired = false;
        for expired in self.timers.drain_expired() {
            if let Some(countdown) = self
                .active
                .as_mut()
                .and_then(|active| active.countdown.as_mut())
                && countdown.on_expired(expired.token)
            {
                fired = true;
                break;
            }
        }
        if !fired {
            return None;
        }

        let active = self.active.take()?;
        let position = active.position;
        self.retire(ctx, position, active.command);
        self.phase = ManagerPhase::Idle;
        Some(StepOutcome::Finished { position })
    }

    /// 调用 `finished()` 并通知钩子
    fn retire(&mut self, ctx: &mut CommandContext<'_>, position: StepPosition, mut command: Command) {
        if let Err(e) = command.finished(ctx) {
            warn!("Cleanup of {} at {} failed: {}", command.name(), position, e);
        }
        debug!("Step {} ({}) finished", position, command.name());
        self.hooks.trigger_finished(&self.step_info(position, &command));
    }

    /// 中止出错的命令：先取消倒计时，再停止动作，最后完成
    fn fail(
        &mut self,
        ctx: &mut CommandContext<'_>,
        position: StepPosition,
        mut command: Command,
        error: FsmError,
    ) -> StepOutcome {
        warn!("{} at {} failed: {}", command.name(), position, error);
        if let Err(e) = command.abort(ctx) {
            warn!("Failed to stop {} at {}: {}", command.name(), position, e);
        }
        self.retire(ctx, position, command);
        self.phase = ManagerPhase::Idle;
        StepOutcome::Failed { position, error }
    }

    // ========== 暂停 / 恢复 ==========

    /// 暂停活动命令（先暂停倒计时，再暂停命令）
    ///
    /// 只在 `Executing` 阶段有效，其他阶段返回 `Unchanged`。
    pub fn pause(&mut self, ctx: &mut CommandContext<'_>) -> StepOutcome {
        if self.phase != ManagerPhase::Executing {
            debug!("Ignoring pause in {:?}", self.phase);
            return StepOutcome::Unchanged;
        }
        let Some(active) = self.active.as_mut() else {
            return StepOutcome::Unchanged;
        };

        if let Some(countdown) = active.countdown.as_mut() {
            countdown.pause_at(ctx.now);
        }
        if let Err(e) = active.command.pause(ctx) {
            warn!(
                "Failed to pause {} at {}: {}",
                active.command.name(),
                active.position,
                e
            );
        }

        let position = active.position;
        self.phase = ManagerPhase::Paused;
        info!("Paused at step {}", position);
        if let Some(active) = self.active.as_ref() {
            self.hooks
                .trigger_paused(&self.step_info(position, &active.command));
        }
        StepOutcome::Paused { position }
    }

    /// 恢复活动命令（先恢复倒计时，再恢复命令）
    ///
    /// 只在 `Paused` 阶段有效，其他阶段返回 `Unchanged`。
    pub fn resume(&mut self, ctx: &mut CommandContext<'_>) -> StepOutcome {
        if self.phase != ManagerPhase::Paused {
            debug!("Ignoring resume in {:?}", self.phase);
            return StepOutcome::Unchanged;
        }
        let Some(active) = self.active.as_mut() else {
            self.phase = ManagerPhase::Idle;
            return StepOutcome::Unchanged;
        };

        let progress = match active.countdown.as_mut() {
            Some(countdown) => {
                let progress = Progress::new(countdown.elapsed_at(ctx.now), countdown.time_needed());
                countdown.resume_at(ctx.now);
                progress
            },
            None => Progress::new(Duration::ZERO, Duration::ZERO),
        };
        let position = active.position;

        if let Err(error) = active.command.resume(ctx, progress) {
            let Some(mut active) = self.active.take() else {
                return StepOutcome::Unchanged;
            };
            if let Some(countdown) = active.countdown.as_mut() {
                countdown.cancel();
            }
            return self.fail(ctx, position, active.command, error);
        }

        self.phase = ManagerPhase::Executing;
        info!("Resumed step {}", position);
        if let Some(active) = self.active.as_ref() {
            self.hooks
                .trigger_resumed(&self.step_info(position, &active.command));
        }
        StepOutcome::Resumed { position }
    }

    // ========== 重置 / 关闭 ==========

    /// 中止活动命令：取消倒计时、停止动作、调用 `finished()`
    fn abandon_active(&mut self, ctx: &mut CommandContext<'_>) {
        if let Some(mut active) = self.active.take() {
            if let Some(countdown) = active.countdown.as_mut() {
                countdown.cancel();
            }
            if let Err(e) = active.command.abort(ctx) {
                warn!(
                    "Failed to stop {} at {}: {}",
                    active.command.name(),
                    active.position,
                    e
                );
            }
            self.retire(ctx, active.position, active.command);
        }
    }

    /// 回到第一个序列的第一条命令
    pub fn reset(&mut self, ctx: &mut CommandContext<'_>) {
        self.abandon_active(ctx);
        self.sequence_index = 0;
        self.command_index = None;
        self.phase = ManagerPhase::Idle;
        info!("Sequence manager reset");
    }

    /// 中止活动命令并停止推进
    pub fn shutdown(&mut self, ctx: &mut CommandContext<'_>) {
        self.abandon_active(ctx);
        self.phase = ManagerPhase::Completed;
    }
}
