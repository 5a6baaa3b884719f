//! `crowdcount stats`: print today's usage as a fresh session sees it.

use crowd_sessions::SessionContext;

use crate::state::AppState;

pub fn run(state: &AppState, json: bool) -> anyhow::Result<()> {
    let mut session = SessionContext::new("cli:stats");
    let stats = state.limiter.usage_stats(&mut session);

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Date: {}", stats.date);
    println!(
        "Total usage today: {}/{}",
        stats.total_calls, stats.daily_total_limit
    );
    println!("Per-session limit: {}", stats.daily_user_limit);
    let remaining = stats.daily_total_limit.saturating_sub(stats.total_calls);
    println!("Calls remaining today: {remaining}");
    Ok(())
}
