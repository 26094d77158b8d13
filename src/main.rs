// ==========================================
// 设备维保排程系统 - 周期扫描入口
// ==========================================
// 职责: 作为外部定时触发器，为全部启用模板补齐生成窗口
//
// 环境变量:
// - MAINT_DB_PATH: 数据库路径（默认: 用户数据目录）
// - MAINT_WEEKS_AHEAD: 生成窗口周数（默认: 配置项 maintenance/default_weeks_ahead）
// - MAINT_SWEEP_INTERVAL_SECS: 设置后常驻运行，按间隔重复扫描；未设置则只扫描一次
// - MAINT_LOG_FORMAT / RUST_LOG: 日志格式与级别
// ==========================================

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use maintenance_scheduler::app::{get_default_db_path, AppState};
use maintenance_scheduler::config::ScheduleConfigReader;
use maintenance_scheduler::logging;

fn env_u64(name: &str) -> anyhow::Result<Option<u64>> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => {
            let value = raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("环境变量 {} 不是合法的非负整数: {}", name, raw))?;
            Ok(Some(value))
        }
        _ => Ok(None),
    }
}

fn run_sweep(state: &AppState, weeks_ahead: u32) -> anyhow::Result<()> {
    let summary = state
        .maintenance_api
        .generate_for_all_active_templates(weeks_ahead)
        .context("周期扫描失败")?;

    for failure in &summary.failures {
        tracing::error!(
            template_id = %failure.template_id,
            reason = %failure.reason,
            "模板生成失败"
        );
    }

    tracing::info!(
        templates_processed = summary.templates_processed,
        instances_created = summary.instances_created,
        unassigned = summary.assignment_failures,
        failures = summary.failures.len(),
        "扫描结束"
    );

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} - 周期扫描", maintenance_scheduler::APP_NAME);
    tracing::info!("系统版本: {}", maintenance_scheduler::VERSION);
    tracing::info!("==================================================");

    let db_path = get_default_db_path();
    tracing::info!("使用数据库: {}", db_path);

    let state = Arc::new(AppState::new(db_path).map_err(anyhow::Error::msg)?);

    let weeks_ahead = match env_u64("MAINT_WEEKS_AHEAD")? {
        Some(w) => u32::try_from(w).context("MAINT_WEEKS_AHEAD 超出范围")?,
        None => state.config_manager.get_default_weeks_ahead()?,
    };
    let interval_secs = env_u64("MAINT_SWEEP_INTERVAL_SECS")?;

    let Some(interval_secs) = interval_secs.filter(|s| *s > 0) else {
        return run_sweep(&state, weeks_ahead);
    };

    tracing::info!(interval_secs, weeks_ahead, "常驻模式启动");
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let state = state.clone();
                // 扫描为同步数据库操作，放到阻塞线程池执行
                let result = tokio::task::spawn_blocking(move || run_sweep(&state, weeks_ahead))
                    .await
                    .context("扫描任务异常退出")?;
                if let Err(e) = result {
                    tracing::error!(error = %e, "本轮扫描失败，等待下一轮");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("收到退出信号，停止扫描");
                break;
            }
        }
    }

    Ok(())
}
