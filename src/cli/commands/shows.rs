use crate::models::{Show, ShowSummary};
use crate::state::SharedState;
use std::path::PathBuf;

fn print_summaries(heading: &str, shows: &[ShowSummary]) {
    println!("{heading} ({}):", shows.len());
    println!("{:-<70}", "");

    for summary in shows {
        let show = &summary.show;
        println!("• {} [{}]", show.name, show.tracker);
        if let Some(dest) = &show.copy_destination {
            println!("  Copy to: {}", dest.display());
        }
        match summary.downloads.last() {
            Some(last) => println!(
                "  Downloads: {} | last {} from {}",
                summary.downloads.len(),
                last.date.format("%Y-%m-%d %H:%M"),
                last.tracker
            ),
            None => println!("  Downloads: 0"),
        }
    }
}

pub async fn cmd_list_shows(state: &SharedState) -> anyhow::Result<()> {
    let shows = state.watchlist.list_shows().await;
    if shows.is_empty() {
        println!("No shows are being watched.");
        println!("Use 'showfeed shows add <name>' to start watching one.");
        return Ok(());
    }

    print_summaries("Watched Shows", &shows);
    Ok(())
}

pub async fn cmd_list_removed(state: &SharedState) -> anyhow::Result<()> {
    let shows = state.watchlist.list_removed_shows().await;
    if shows.is_empty() {
        println!("No removed shows.");
        return Ok(());
    }

    print_summaries("Removed Shows", &shows);
    Ok(())
}

pub async fn cmd_add_shows(
    state: &SharedState,
    names: &[String],
    copy_to: Option<PathBuf>,
    tracker: Option<String>,
) -> anyhow::Result<()> {
    let shows = names.iter().map(|name| {
        let mut show = Show::new(name);
        show.copy_destination.clone_from(&copy_to);
        if let Some(tracker) = &tracker {
            show.tracker.clone_from(tracker);
        }
        show
    });

    let outcome = state.watchlist.add_shows(shows, Some("cli")).await;

    for show in &outcome.added {
        println!("+ Watching {}", show.name);
    }
    for (name, reason) in &outcome.rejected {
        println!("! Skipped '{name}': {reason}");
    }

    if outcome.added.is_empty() {
        anyhow::bail!("No shows were added");
    }
    Ok(())
}

pub async fn cmd_remove_shows(state: &SharedState, names: &[String]) -> anyhow::Result<()> {
    let removed = state.watchlist.remove_shows(names).await;
    println!("Removed {removed} of {} show(s)", names.len());
    Ok(())
}

pub async fn cmd_restore_show(state: &SharedState, name: &str) -> anyhow::Result<()> {
    let show = state.watchlist.restore_show(name).await?;
    println!("Watching {} again", show.name);
    Ok(())
}
