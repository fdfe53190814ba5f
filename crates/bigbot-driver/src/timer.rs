//! 可暂停倒计时（Countdown）与调度线程（TimerService）
//!
//! # 线程模型
//!
//! - 调度线程只负责"到点通知"：收到 `Arm` 后在截止时刻向到期通道发送 [`TimerExpired`]，
//!   不持有也不修改任何倒计时或命令的状态。
//! - 所有 [`Countdown`] 的状态转换（暂停、恢复、取消、触发）都发生在主循环线程上。
//!
//! 因此"暂停"与"即将到期"不会竞争：暂停会更换令牌（token），
//! 旧令牌的到期消息在主循环里被识别为过期消息并丢弃。
//!
//! # 示例
//!
//! ```rust
//! use bigbot_driver::timer::TimerService;
//! use std::time::Duration;
//!
//! let service = TimerService::spawn().unwrap();
//! let mut countdown = service.start(Duration::from_millis(20));
//!
//! let expired = service
//!     .recv_expired_timeout(Duration::from_secs(1))
//!     .expect("timer should fire");
//! assert!(countdown.on_expired(expired.token));
//! assert!(countdown.is_fired());
//! ```

use crate::error::DriverError;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use std::mem::ManuallyDrop;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{JoinHandle, spawn};
use std::time::{Duration, Instant};
use tracing::{debug, error, trace};

/// 一次"布防"（arming）的唯一标识
///
/// 每次 `start()` / `resume()` 都会分配新的令牌，旧令牌的到期消息自动失效。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(u64);

/// 调度线程发出的到期通知
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerExpired {
    pub token: TimerToken,
}

enum SchedulerCommand {
    Arm {
        token: TimerToken,
        deadline: Instant,
    },
    Disarm {
        token: TimerToken,
    },
    Shutdown,
}

/// 倒计时使用的调度句柄（可克隆）
#[derive(Clone)]
struct TimerHandle {
    cmd_tx: Sender<SchedulerCommand>,
    next_token: Arc<AtomicU64>,
}

impl TimerHandle {
    fn arm(&self, deadline: Instant) -> TimerToken {
        let token = TimerToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        if self
            .cmd_tx
            .send(SchedulerCommand::Arm { token, deadline })
            .is_err()
        {
            error!("Timer thread is gone, countdown {:?} will never fire", token);
        }
        token
    }

    fn disarm(&self, token: TimerToken) {
        // 调度线程已退出时无需撤销
        let _ = self.cmd_tx.send(SchedulerCommand::Disarm { token });
    }
}

/// Extension trait for timeout-capable thread joins
trait JoinTimeout {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()>;
}

impl<T: Send + 'static> JoinTimeout for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()> {
        let (tx, rx) = crossbeam_channel::bounded(1);

        spawn(move || {
            let result = self.join();
            let _ = tx.send(result);
        });

        match rx.recv_timeout(timeout) {
            Ok(join_result) => join_result.map(|_| ()),
            Err(RecvTimeoutError::Timeout) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "Thread join timeout",
            ))),
            Err(RecvTimeoutError::Disconnected) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "Thread panicked during join",
            ))),
        }
    }
}

/// 定时调度服务
///
/// 拥有唯一的调度线程。Drop 时通知线程退出并等待（最长 2 秒）。
pub struct TimerService {
    cmd_tx: ManuallyDrop<Sender<SchedulerCommand>>,
    expired_rx: Receiver<TimerExpired>,
    next_token: Arc<AtomicU64>,
    thread: Option<JoinHandle<()>>,
}

impl TimerService {
    /// 启动调度线程
    ///
    /// # 错误
    ///
    /// 操作系统拒绝创建线程时返回 [`DriverError::Spawn`]。
    pub fn spawn() -> Result<Self, DriverError> {
        let (cmd_tx, cmd_rx) = unbounded();
        let (expired_tx, expired_rx) = unbounded();

        let thread = std::thread::Builder::new()
            .name("bigbot-timer".to_string())
            .spawn(move || scheduler_loop(cmd_rx, expired_tx))
            .map_err(DriverError::Spawn)?;

        Ok(Self {
            cmd_tx: ManuallyDrop::new(cmd_tx),
            expired_rx,
            next_token: Arc::new(AtomicU64::new(1)),
            thread: Some(thread),
        })
    }

    fn handle(&self) -> TimerHandle {
        TimerHandle {
            cmd_tx: (*self.cmd_tx).clone(),
            next_token: self.next_token.clone(),
        }
    }

    /// 启动一个新的倒计时（立即开始计时）
    pub fn start(&self, time_needed: Duration) -> Countdown {
        self.start_at(time_needed, Instant::now())
    }

    /// 以指定起始时刻启动倒计时
    pub fn start_at(&self, time_needed: Duration, now: Instant) -> Countdown {
        let handle = self.handle();
        let token = handle.arm(now + time_needed);
        trace!("Countdown {:?} armed for {:?}", token, time_needed);
        Countdown {
            time_needed,
            elapsed: Duration::ZERO,
            started_at: Some(now),
            phase: CountdownPhase::Running,
            token,
            handle,
        }
    }

    /// 非阻塞地取出所有已到达的到期通知
    pub fn drain_expired(&self) -> impl Iterator<Item = TimerExpired> + '_ {
        self.expired_rx.try_iter()
    }

    /// 阻塞等待下一条到期通知（主要用于测试）
    pub fn recv_expired_timeout(&self, timeout: Duration) -> Option<TimerExpired> {
        self.expired_rx.recv_timeout(timeout).ok()
    }

    /// 调度线程是否仍在运行
    pub fn is_alive(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for TimerService {
    fn drop(&mut self) {
        // 倒计时持有 Sender 的克隆，仅靠断开通道无法让线程退出，先显式通知
        let _ = self.cmd_tx.send(SchedulerCommand::Shutdown);
        unsafe {
            ManuallyDrop::drop(&mut self.cmd_tx);
        }

        let join_timeout = Duration::from_secs(2);
        if let Some(handle) = self.thread.take()
            && let Err(_e) = handle.join_timeout(join_timeout)
        {
            error!(
                "Timer thread panicked or failed to shut down within {:?}",
                join_timeout
            );
        }
    }
}

fn scheduler_loop(cmd_rx: Receiver<SchedulerCommand>, expired_tx: Sender<TimerExpired>) {
    let mut pending: Vec<(Instant, TimerToken)> = Vec::new();

    loop {
        let now = Instant::now();
        pending.retain(|&(deadline, token)| {
            if deadline <= now {
                let _ = expired_tx.send(TimerExpired { token });
                false
            } else {
                true
            }
        });

        let next_deadline = pending.iter().map(|&(deadline, _)| deadline).min();
        let received = match next_deadline {
            Some(deadline) => cmd_rx.recv_deadline(deadline),
            None => cmd_rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match received {
            Ok(SchedulerCommand::Arm { token, deadline }) => pending.push((deadline, token)),
            Ok(SchedulerCommand::Disarm { token }) => pending.retain(|&(_, t)| t != token),
            Ok(SchedulerCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {},
        }
    }

    debug!("Timer thread exited ({} pending timers dropped)", pending.len());
}

/// 倒计时阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownPhase {
    Running,
    Paused,
    Fired,
    Cancelled,
}

/// 可暂停/恢复的倒计时
///
/// # 不变量
///
/// - 累计耗时 `elapsed` 在触发前不超过 `time_needed`
/// - 每个倒计时最多触发一次；取消后永不触发
/// - 只有当前令牌的到期消息、且处于 `Running` 阶段时才会触发
pub struct Countdown {
    time_needed: Duration,
    elapsed: Duration,
    started_at: Option<Instant>,
    phase: CountdownPhase,
    token: TimerToken,
    handle: TimerHandle,
}

impl Countdown {
    pub fn time_needed(&self) -> Duration {
        self.time_needed
    }

    pub fn phase(&self) -> CountdownPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == CountdownPhase::Running
    }

    pub fn is_paused(&self) -> bool {
        self.phase == CountdownPhase::Paused
    }

    pub fn is_fired(&self) -> bool {
        self.phase == CountdownPhase::Fired
    }

    pub fn is_cancelled(&self) -> bool {
        self.phase == CountdownPhase::Cancelled
    }

    /// 当前布防的令牌
    pub fn token(&self) -> TimerToken {
        self.token
    }

    /// 截至 `now` 的累计耗时（不超过 `time_needed`）
    pub fn elapsed_at(&self, now: Instant) -> Duration {
        let running = match (self.phase, self.started_at) {
            (CountdownPhase::Running, Some(started)) => now.saturating_duration_since(started),
            _ => Duration::ZERO,
        };
        (self.elapsed + running).min(self.time_needed)
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed_at(Instant::now())
    }

    /// 截至 `now` 的剩余时间
    pub fn remaining_at(&self, now: Instant) -> Duration {
        self.time_needed.saturating_sub(self.elapsed_at(now))
    }

    /// 完成比例 `[0.0, 1.0]`；`time_needed` 为零时视为已完成
    pub fn progress_at(&self, now: Instant) -> f64 {
        if self.time_needed.is_zero() {
            return 1.0;
        }
        (self.elapsed_at(now).as_secs_f64() / self.time_needed.as_secs_f64()).clamp(0.0, 1.0)
    }

    pub fn pause(&mut self) -> bool {
        self.pause_at(Instant::now())
    }

    /// 暂停：把本段运行时间计入 `elapsed` 并撤销调度
    ///
    /// 非 `Running` 阶段调用是空操作，返回 `false`。
    pub fn pause_at(&mut self, now: Instant) -> bool {
        if self.phase != CountdownPhase::Running {
            debug!("Ignoring pause of {:?} countdown", self.phase);
            return false;
        }
        self.elapsed = self.elapsed_at(now);
        self.started_at = None;
        self.phase = CountdownPhase::Paused;
        self.handle.disarm(self.token);
        trace!(
            "Countdown {:?} paused at {:?}/{:?}",
            self.token, self.elapsed, self.time_needed
        );
        true
    }

    pub fn resume(&mut self) -> Option<Duration> {
        self.resume_at(Instant::now())
    }

    /// 恢复：按剩余时间 `max(0, time_needed - elapsed)` 重新布防
    ///
    /// 返回剩余时间；非 `Paused` 阶段调用是空操作，返回 `None`。
    pub fn resume_at(&mut self, now: Instant) -> Option<Duration> {
        if self.phase != CountdownPhase::Paused {
            debug!("Ignoring resume of {:?} countdown", self.phase);
            return None;
        }
        let remaining = self.time_needed.saturating_sub(self.elapsed);
        self.token = self.handle.arm(now + remaining);
        self.started_at = Some(now);
        self.phase = CountdownPhase::Running;
        trace!("Countdown {:?} resumed, {:?} remaining", self.token, remaining);
        Some(remaining)
    }

    /// 取消：之后的任何到期消息都不会触发（可重复调用）
    pub fn cancel(&mut self) {
        match self.phase {
            CountdownPhase::Running => {
                self.handle.disarm(self.token);
                self.phase = CountdownPhase::Cancelled;
            },
            CountdownPhase::Paused => self.phase = CountdownPhase::Cancelled,
            CountdownPhase::Fired | CountdownPhase::Cancelled => {},
        }
    }

    /// 处理一条到期消息，只有第一次有效触发返回 `true`
    ///
    /// 触发后已用时间记为 `time_needed`，与消息处理得多晚无关。
    pub fn on_expired(&mut self, token: TimerToken) -> bool {
        if self.phase != CountdownPhase::Running || token != self.token {
            trace!(
                "Dropping stale expiry {:?} (current {:?}, {:?})",
                token, self.token, self.phase
            );
            return false;
        }
        self.elapsed = self.time_needed;
        self.started_at = None;
        self.phase = CountdownPhase::Fired;
        true
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        if self.phase == CountdownPhase::Running {
            self.handle.disarm(self.token);
        }
    }
}

impl std::fmt::Debug for Countdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Countdown")
            .field("time_needed", &self.time_needed)
            .field("elapsed", &self.elapsed)
            .field("phase", &self.phase)
            .field("token", &self.token)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const WAIT: Duration = Duration::from_secs(2);

    #[test]
    fn test_countdown_fires_once() {
        let service = TimerService::spawn().unwrap();
        let mut countdown = service.start(Duration::from_millis(10));

        let expired = service.recv_expired_timeout(WAIT).expect("should fire");
        assert!(countdown.on_expired(expired.token));
        // 同一条消息再次处理不会重复触发
        assert!(!countdown.on_expired(expired.token));
        assert!(countdown.is_fired());
        assert_eq!(countdown.elapsed(), Duration::from_millis(10));
    }

    #[test]
    fn test_late_expiry_reports_exact_elapsed() {
        let service = TimerService::spawn().unwrap();
        let mut countdown = service.start(Duration::from_millis(10));
        let expired = service.recv_expired_timeout(WAIT).expect("should fire");
        std::thread::sleep(Duration::from_millis(30));
        assert!(countdown.on_expired(expired.token));
        assert_eq!(countdown.elapsed(), Duration::from_millis(10));
        assert_eq!(countdown.elapsed_at(Instant::now()), Duration::from_millis(10));
    }

    #[test]
    fn test_zero_duration_fires_immediately() {
        let service = TimerService::spawn().unwrap();
        let mut countdown = service.start(Duration::ZERO);
        let expired = service.recv_expired_timeout(WAIT).expect("should fire");
        assert!(countdown.on_expired(expired.token));
        assert_eq!(countdown.progress_at(Instant::now()), 1.0);
    }

    #[test]
    fn test_pause_accumulates_elapsed() {
        let service = TimerService::spawn().unwrap();
        let t0 = Instant::now();
        let mut countdown = service.start_at(Duration::from_secs(5), t0);

        assert!(countdown.pause_at(t0 + Duration::from_secs(2)));
        // 暂停期间时间不累计
        assert_eq!(
            countdown.elapsed_at(t0 + Duration::from_secs(30)),
            Duration::from_secs(2)
        );

        let remaining = countdown.resume_at(t0 + Duration::from_secs(10));
        assert_eq!(remaining, Some(Duration::from_secs(3)));
        assert_eq!(
            countdown.elapsed_at(t0 + Duration::from_secs(11)),
            Duration::from_secs(3)
        );
        countdown.cancel();
    }

    #[test]
    fn test_resume_without_pause_is_noop() {
        let service = TimerService::spawn().unwrap();
        let mut countdown = service.start(Duration::from_secs(5));
        let token = countdown.token();
        assert_eq!(countdown.resume(), None);
        assert!(countdown.is_running());
        assert_eq!(countdown.token(), token);
        countdown.cancel();
    }

    #[test]
    fn test_pause_twice_is_noop() {
        let service = TimerService::spawn().unwrap();
        let t0 = Instant::now();
        let mut countdown = service.start_at(Duration::from_secs(5), t0);
        assert!(countdown.pause_at(t0 + Duration::from_secs(1)));
        assert!(!countdown.pause_at(t0 + Duration::from_secs(3)));
        assert_eq!(
            countdown.elapsed_at(t0 + Duration::from_secs(4)),
            Duration::from_secs(1)
        );
    }

    #[test]
    fn test_stale_token_after_pause_is_ignored() {
        let service = TimerService::spawn().unwrap();
        let mut countdown = service.start(Duration::from_millis(5));
        let old_token = countdown.token();

        // 模拟：调度线程已经发出到期消息，但主循环先处理了暂停
        std::thread::sleep(Duration::from_millis(20));
        assert!(countdown.pause());
        assert!(!countdown.on_expired(old_token));
        assert!(countdown.is_paused());

        // 恢复后以新令牌触发
        countdown.resume().unwrap();
        assert_ne!(countdown.token(), old_token);
        let mut fired = false;
        while let Some(expired) = service.recv_expired_timeout(WAIT) {
            if countdown.on_expired(expired.token) {
                fired = true;
                break;
            }
        }
        assert!(fired);
    }

    #[test]
    fn test_cancel_is_idempotent_and_blocks_expiry() {
        let service = TimerService::spawn().unwrap();
        let mut countdown = service.start(Duration::from_millis(5));
        let token = countdown.token();
        countdown.cancel();
        countdown.cancel();
        assert!(countdown.is_cancelled());
        assert!(!countdown.on_expired(token));
        assert_eq!(countdown.resume(), None);
    }

    #[test]
    fn test_disarmed_timer_does_not_post() {
        let service = TimerService::spawn().unwrap();
        let mut countdown = service.start(Duration::from_millis(30));
        countdown.cancel();
        assert!(service.recv_expired_timeout(Duration::from_millis(100)).is_none());
    }

    #[test]
    fn test_service_shutdown_joins_thread() {
        let service = TimerService::spawn().unwrap();
        let countdown = service.start(Duration::from_secs(60));
        assert!(service.is_alive());
        // 倒计时仍然存活时 Drop 服务也能正常退出
        drop(service);
        drop(countdown);
    }

    proptest! {
        /// 任意暂停/恢复序列下：累计耗时 = 各运行段之和（且不超过 time_needed）
        #[test]
        fn prop_elapsed_is_sum_of_running_segments(
            total_ms in 1u64..10_000,
            segments in proptest::collection::vec((0u64..3_000, 0u64..3_000), 0..8),
        ) {
            let service = TimerService::spawn().unwrap();
            let t0 = Instant::now();
            let total = Duration::from_millis(total_ms);
            let mut countdown = service.start_at(total, t0);

            let mut now = t0;
            let mut expected = Duration::ZERO;
            for (run_ms, pause_ms) in segments {
                now += Duration::from_millis(run_ms);
                expected += Duration::from_millis(run_ms);
                countdown.pause_at(now);
                now += Duration::from_millis(pause_ms);
                let remaining = countdown.resume_at(now).unwrap();
                prop_assert_eq!(remaining, total.saturating_sub(expected));
            }
            prop_assert_eq!(countdown.elapsed_at(now), expected.min(total));
            countdown.cancel();
        }
    }
}
