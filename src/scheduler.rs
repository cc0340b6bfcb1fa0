use std::sync::Arc;

use time::{Date, Duration, OffsetDateTime, Time, UtcOffset};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::SchedulerConfig;
use crate::meals::{dto::PlanOutcome, services::Planner};

/// Next UTC instant strictly after `now` whose wall-clock time is `at`.
pub fn next_run_after(now: OffsetDateTime, at: Time) -> OffsetDateTime {
    let now = now.to_offset(UtcOffset::UTC);
    let candidate = now.replace_time(at);
    if candidate > now {
        candidate
    } else {
        candidate + Duration::DAY
    }
}

/// Records `day` as run, or returns false if that day (or a later one) already ran.
pub fn claim_run(last_run: &mut Option<Date>, day: Date) -> bool {
    if last_run.is_some_and(|last| last >= day) {
        return false;
    }
    *last_run = Some(day);
    true
}

/// One scheduled plan run. Goes through the same checks as an interactive request.
pub async fn run_daily_plan(planner: &Planner) -> PlanOutcome {
    let outcome = planner.generate_plan().await;
    match &outcome {
        PlanOutcome::Complete(meals) => info!(meals = meals.len(), "scheduled plan generated"),
        PlanOutcome::ProfileMissing => info!("scheduled plan skipped: no profile"),
        PlanOutcome::NeedClarification(_) => info!("scheduled plan skipped: meal times missing"),
        PlanOutcome::LlmError(e) => warn!(error = %e, "scheduled plan failed"),
    }
    outcome
}

/// Starts the daily plan job, or returns `None` when it is disabled.
pub fn spawn(planner: Arc<Planner>, cfg: &SchedulerConfig) -> Option<JoinHandle<()>> {
    if !cfg.enabled {
        info!("daily plan scheduler disabled");
        return None;
    }
    if !planner.generation_configured() {
        warn!("daily plan scheduler running without a generator; runs will report gemini_not_configured");
    }
    let at = cfg.run_at;
    info!(%at, "daily plan scheduler started (UTC)");
    Some(tokio::spawn(async move {
        let mut last_run = None;
        loop {
            let now = OffsetDateTime::now_utc();
            let next = next_run_after(now, at);
            tokio::time::sleep((next - now).unsigned_abs()).await;
            // The sleep is monotonic; the wall clock may have moved back meanwhile.
            let day = OffsetDateTime::now_utc().date();
            if !claim_run(&mut last_run, day) {
                debug!(%day, "daily plan already ran; skipping");
                continue;
            }
            run_daily_plan(&planner).await;
        }
    }))
}
