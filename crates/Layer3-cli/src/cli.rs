//! Non-interactive commands

use futures::future::join_all;
use taskflow_foundation::{Error, TaskflowConfig};
use taskflow_task::{TaskService, TaskStatus};
use tracing::{info, warn};

/// Submit one task and print every status until it finishes
pub async fn run_once(
    config: &TaskflowConfig,
    description: &str,
    priority: &str,
) -> anyhow::Result<()> {
    let service = TaskService::new(config);

    info!("Submitting a new task: {} with priority: {}", description, priority);
    let task_id = service.submit_task(description, priority)?;
    println!("Task submitted with ID: {}", task_id);

    let mut stream = service.stream_task_status(&task_id)?;
    println!("Waiting for status updates...");

    loop {
        tokio::select! {
            next = stream.recv() => match next {
                Some(status) => println!("Task status [{}]: {}", task_id, status),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                println!("\nInterrupted, task is {}", service.check_task_status(&task_id));
                return Ok(());
            }
        }
    }

    match stream.terminal() {
        Some(status) => {
            if let Some(task) = service.task(&task_id) {
                let took = task.duration().unwrap_or_default();
                println!("Task finished as {} in {:.2?}", status, took);
                if let Some(error) = task.error {
                    println!("  error: {}", error);
                }
            }
        }
        None => {
            warn!(task_id = %task_id, "status stream ended early");
            let status = service.wait_task(&task_id, None).await?;
            println!("Task finished as {}", status);
        }
    }

    Ok(())
}

/// Submit `count` tasks, wait for all of them and print the statistics
pub async fn run_load(
    config: &TaskflowConfig,
    count: usize,
    priority: &str,
    json: bool,
) -> anyhow::Result<()> {
    let service = TaskService::new(config);

    let mut task_ids = Vec::with_capacity(count);
    let mut refused = 0usize;
    for i in 0..count {
        match service.submit_task(&format!("Load task {}", i + 1), priority) {
            Ok(task_id) => task_ids.push(task_id),
            Err(Error::CapacityExceeded(_)) => refused += 1,
            Err(e) => return Err(e.into()),
        }
    }
    info!(submitted = task_ids.len(), refused, "load submitted");

    let outcomes = join_all(task_ids.iter().map(|id| service.wait_task(id, None))).await;
    let unfinished = outcomes
        .iter()
        .filter(|outcome| !matches!(outcome, Ok(status) if status.is_terminal()))
        .count();
    if unfinished > 0 {
        warn!(unfinished, "some tasks did not report a terminal status");
    }

    let stats = service.get_statistics();
    if json {
        let report = serde_json::json!({
            "statistics": stats,
            "refused": refused,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("\nTask Statistics\n");
        println!("{}", stats);
        if refused > 0 {
            println!("\n{} submissions refused (engine.max_active_tasks reached)", refused);
        }
        let rate = match stats.total() {
            0 => 0.0,
            total => stats.count(TaskStatus::Completed) as f64 * 100.0 / total as f64,
        };
        println!("\nSuccess rate: {:.1}%", rate);
    }

    Ok(())
}

/// Print the merged configuration as TOML
pub fn print_config(config: &TaskflowConfig) -> anyhow::Result<()> {
    print!("{}", config.to_toml()?);
    Ok(())
}
