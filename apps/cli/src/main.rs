//! BigBot CLI
//!
//! 在模拟硬件上运行一场比赛：等待拉线、按队伍颜色执行比赛序列、
//! 按脚本注入障碍物，直到比赛结束、序列执行完毕或收到 Ctrl-C。

mod sim;

use anyhow::{Context, Result, anyhow};
use bigbot::prelude::*;
use clap::Parser;
use sim::{ObstacleWindow, SimField};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{error, info, warn};

/// BigBot 比赛运行器
#[derive(Parser, Debug)]
#[command(name = "bigbot-cli")]
#[command(about = "Run a BigBot match on simulated hardware", long_about = None)]
#[command(version)]
struct Cli {
    /// 队伍颜色（yellow | blue）
    color: TeamColor,

    /// 显示屏上的预期得分（默认取配置文件中的 match.default_score）
    score: Option<u32>,

    /// 配置文件路径（TOML）
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// 覆盖比赛时长（秒）
    #[arg(long, value_name = "SECS")]
    match_duration: Option<f64>,

    /// 不等待启动拉线，立即开赛
    #[arg(long)]
    no_start_switch: bool,

    /// 在比赛时间 AT 秒处注入持续 FOR 秒的障碍物（可重复）
    #[arg(long = "sim-obstacle", value_name = "AT:FOR")]
    sim_obstacles: Vec<ObstacleWindow>,

    /// 只运行指定的序列（可重复），例如 --sequence claw_test
    #[arg(long = "sequence", value_name = "NAME")]
    sequences: Vec<String>,
}

fn main() -> ExitCode {
    if let Err(e) = bigbot::init_logger("info") {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        },
    }
}

fn load_config(cli: &Cli) -> Result<RobotConfig> {
    let mut config = match &cli.config {
        Some(path) => RobotConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => RobotConfig::default(),
    };
    if let Some(secs) = cli.match_duration {
        config.match_.duration_s = secs;
    }
    if cli.no_start_switch {
        config.match_.wait_for_start_switch = false;
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn build_plan(cli: &Cli, config: &RobotConfig) -> Result<Vec<Sequence>> {
    let catalog = SequenceCatalog::new(&config.motion);
    if cli.sequences.is_empty() {
        return Ok(catalog.match_plan(cli.color));
    }
    cli.sequences
        .iter()
        .map(|name| {
            catalog.by_name(name, cli.color).ok_or_else(|| {
                anyhow!(
                    "Unknown sequence '{}' (known: {})",
                    name,
                    SequenceCatalog::NAMES.join(", ")
                )
            })
        })
        .collect()
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let plan = build_plan(&cli, &config)?;
    let score = cli.score.unwrap_or(config.match_.default_score);

    let (builder, probes) = RobotBuilder::simulated();
    let robot = builder
        .config(config.clone())
        .score(score)
        .build()
        .context("Failed to build robot")?;
    let mut fsm = RobotFsm::new(robot, config.clone(), StateRegistry::with_defaults(), plan)
        .context("Failed to create state machine")?;
    let mut field = SimField::new(
        probes,
        cli.sim_obstacles.clone(),
        config.match_.wait_for_start_switch,
    );

    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();
    ctrlc::set_handler(move || {
        flag.store(false, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl-C handler")?;

    info!(
        "BigBot ready: {} side, expected score {}, {} sequences",
        cli.color,
        score,
        fsm.sequences().sequences().len()
    );

    let outcome = run_loop(&mut fsm, &mut field, &running, &config);
    // 无论循环如何结束都要停车、释放舵机
    let shutdown = fsm.shutdown().context("Failed to shut down robot");
    outcome?;
    shutdown
}

fn run_loop(
    fsm: &mut RobotFsm,
    field: &mut SimField,
    running: &AtomicBool,
    config: &RobotConfig,
) -> Result<()> {
    let period = config.match_.tick();
    let mut next_tick = Instant::now();

    loop {
        if !running.load(Ordering::SeqCst) {
            info!("Interrupted, stopping");
            return Ok(());
        }
        if fsm.is_end_of_match() {
            info!("Match ended");
            return Ok(());
        }
        if fsm.is_finished() {
            info!("All sequences done");
            return Ok(());
        }

        let now = Instant::now();
        let match_time = fsm
            .is_match_started()
            .then(|| fsm.clock().elapsed_at(now));
        field.step(now, match_time);
        fsm.update_at(now).context("Update failed")?;

        next_tick += period;
        let now = Instant::now();
        if next_tick > now {
            spin_sleep::sleep(next_tick - now);
        } else {
            warn!(
                "Main loop overrun by {:?}, resetting tick anchor",
                now - next_tick
            );
            next_tick = now;
        }
    }
}
