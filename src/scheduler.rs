use anyhow::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::time::{Duration, MissedTickBehavior, interval};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, info};

use crate::config::SchedulerConfig;
use crate::services::CycleRunner;

/// Re-arms reconciliation cycles on a fixed interval or a cron expression.
pub struct Scheduler {
    runner: Arc<dyn CycleRunner>,
    config: SchedulerConfig,
    running: Arc<AtomicBool>,
}

impl Scheduler {
    pub fn new(runner: Arc<dyn CycleRunner>, config: SchedulerConfig) -> Self {
        Self {
            runner,
            config,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Runs until [`Scheduler::stop`] is called.
    pub async fn start(&self) -> Result<()> {
        if !self.config.enabled {
            info!("Scheduler is disabled in config");
            return Ok(());
        }

        self.running.store(true, Ordering::SeqCst);
        info!("Starting background scheduler");

        if let Some(cron_expr) = &self.config.cron_expression {
            self.run_with_cron(cron_expr).await
        } else {
            self.run_with_interval().await
        }
    }

    async fn run_with_cron(&self, cron_expr: &str) -> Result<()> {
        let mut sched = JobScheduler::new().await?;

        let runner = Arc::clone(&self.runner);
        let running = Arc::clone(&self.running);
        let allow_overlap = self.config.allow_overlap;

        let job = Job::new_async(cron_expr, move |_uuid, _lock| {
            let runner = Arc::clone(&runner);
            let running = Arc::clone(&running);
            Box::pin(async move {
                if running.load(Ordering::SeqCst) {
                    dispatch(runner, allow_overlap).await;
                }
            })
        })?;

        sched.add(job).await?;
        sched.start().await?;

        info!("Scheduler running with cron: {}", cron_expr);

        while self.running.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        sched.shutdown().await?;
        Ok(())
    }

    async fn run_with_interval(&self) -> Result<()> {
        let minutes = u64::from(self.config.poll_interval_minutes);
        info!(
            allow_overlap = self.config.allow_overlap,
            "Scheduler running every {} minutes", minutes
        );

        let mut ticker = interval(Duration::from_secs(minutes * 60));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if !self.running.load(Ordering::SeqCst) {
                break;
            }
            dispatch(Arc::clone(&self.runner), self.config.allow_overlap).await;
        }

        Ok(())
    }

    pub fn stop(&self) {
        info!("Stopping scheduler...");
        self.running.store(false, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Starts a cycle. With overlap allowed the timer re-arms without waiting.
async fn dispatch(runner: Arc<dyn CycleRunner>, allow_overlap: bool) {
    if allow_overlap {
        tokio::spawn(async move {
            runner.run_cycle().await;
        });
        debug!("Cycle dispatched");
    } else {
        runner.run_cycle().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CycleId;
    use crate::services::CycleReport;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    struct CountingRunner {
        runs: AtomicUsize,
    }

    #[async_trait]
    impl CycleRunner for CountingRunner {
        async fn run_cycle(&self) -> CycleReport {
            self.runs.fetch_add(1, Ordering::SeqCst);
            CycleReport {
                cycle_id: CycleId::new(),
                feeds: vec![],
            }
        }
    }

    #[tokio::test]
    async fn test_disabled_scheduler_returns() {
        let runner = Arc::new(CountingRunner {
            runs: AtomicUsize::new(0),
        });
        let scheduler = Scheduler::new(
            runner.clone(),
            SchedulerConfig {
                enabled: false,
                ..Default::default()
            },
        );

        scheduler.start().await.unwrap();
        assert!(!scheduler.is_running());
        assert_eq!(runner.runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_serial_dispatch_awaits_cycle() {
        let runner = Arc::new(CountingRunner {
            runs: AtomicUsize::new(0),
        });
        dispatch(runner.clone(), false).await;
        assert_eq!(runner.runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_runs_first_cycle_immediately() {
        let runner = Arc::new(CountingRunner {
            runs: AtomicUsize::new(0),
        });
        let scheduler = Arc::new(Scheduler::new(
            runner.clone(),
            SchedulerConfig {
                allow_overlap: false,
                ..Default::default()
            },
        ));

        let handle = tokio::spawn({
            let scheduler = scheduler.clone();
            async move { scheduler.start().await }
        });

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(runner.runs.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(15 * 60)).await;
        assert_eq!(runner.runs.load(Ordering::SeqCst), 2);

        scheduler.stop();
        handle.abort();
    }
}
