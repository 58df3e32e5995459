use crate::services::CycleRunner;
use crate::state::SharedState;

pub async fn cmd_check(state: &SharedState) -> anyhow::Result<()> {
    if state.cycle.feeds().is_empty() {
        println!("No feeds configured. Add URLs under [feeds] in the config file.");
        return Ok(());
    }

    println!("Checking {} feed(s)...", state.cycle.feeds().len());
    let report = state.cycle.run_cycle().await;

    println!("{:-<70}", "");
    for feed in &report.feeds {
        if feed.fetch_failed {
            println!("✗ {} (fetch failed)", feed.url);
            continue;
        }
        println!("✓ {}", feed.url);
        println!(
            "  Entries: {} | Matched: {} | Queued: {} | Failures: {}",
            feed.entries, feed.matched, feed.emitted, feed.failures
        );
    }
    println!("{:-<70}", "");
    println!(
        "Cycle {}: {} download(s) queued, {} feed(s) failed",
        report.cycle_id,
        report.emitted(),
        report.failed_feeds()
    );

    Ok(())
}
