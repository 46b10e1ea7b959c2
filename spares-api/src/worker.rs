use chrono::{DateTime, Duration as ChronoDuration, Utc};
use spares_order::{LifecycleResult, SweepReport};
use spares_store::app_config::ScheduleConfig;
use tokio::time::{sleep, Duration};
use tracing::{error, info};

use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sweep {
    Delays,
    NaturalRubber,
}

impl Sweep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sweep::Delays => "delays",
            Sweep::NaturalRubber => "natural_rubber",
        }
    }

    /// Runs the sweep once and counts the run. Shared by the schedulers and
    /// the manual trigger endpoints.
    pub async fn run(self, state: &AppState) -> LifecycleResult<SweepReport> {
        let result = match self {
            Sweep::Delays => state.engine.check_and_notify_delays().await,
            Sweep::NaturalRubber => state.engine.check_natural_rubber_alerts().await,
        };
        let outcome = if result.is_ok() { "ok" } else { "error" };
        state
            .metrics
            .sweep_runs
            .with_label_values(&[self.as_str(), outcome])
            .inc();
        result
    }
}

/// Next occurrence of `hour:00` UTC strictly after `now`.
pub fn next_run_after(now: DateTime<Utc>, hour: u32) -> DateTime<Utc> {
    let today = now
        .date_naive()
        .and_hms_opt(hour % 24, 0, 0)
        .unwrap_or_default()
        .and_utc();
    if today > now {
        today
    } else {
        today + ChronoDuration::days(1)
    }
}

pub async fn run_daily(state: AppState, sweep: Sweep, hour: u32) {
    info!(sweep = sweep.as_str(), hour, "Daily sweep scheduled");
    loop {
        let now = Utc::now();
        let wait = (next_run_after(now, hour) - now)
            .to_std()
            .unwrap_or(Duration::from_secs(60));
        sleep(wait).await;

        match sweep.run(&state).await {
            Ok(report) => info!(sweep = sweep.as_str(), ?report, "Scheduled sweep done"),
            Err(e) => error!(sweep = sweep.as_str(), error = %e, "Scheduled sweep failed"),
        }
    }
}

pub fn spawn_schedulers(state: &AppState, schedule: &ScheduleConfig) {
    tokio::spawn(run_daily(state.clone(), Sweep::Delays, schedule.delay_check_hour));
    tokio::spawn(run_daily(
        state.clone(),
        Sweep::NaturalRubber,
        schedule.rubber_check_hour,
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, h, m, 0).unwrap()
    }

    #[test]
    fn test_next_run_later_today() {
        assert_eq!(next_run_after(at(1, 3, 15), 6), at(1, 6, 0));
    }

    #[test]
    fn test_next_run_rolls_to_tomorrow() {
        assert_eq!(next_run_after(at(1, 6, 0), 6), at(2, 6, 0));
        assert_eq!(next_run_after(at(1, 0, 0), 0), at(2, 0, 0));
        assert_eq!(next_run_after(at(31, 23, 59), 0), Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap());
    }
}
