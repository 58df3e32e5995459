use crate::models::ShowStatistics;
use crate::parser::normalize_title;
use crate::state::SharedState;

pub async fn cmd_history(
    state: &SharedState,
    show: Option<&str>,
    limit: usize,
) -> anyhow::Result<()> {
    let stats = match show {
        Some(name) => vec![state.statistics.for_show(&normalize_title(name)).await?],
        None => state.statistics.all().await?,
    };

    let stats: Vec<ShowStatistics> = stats
        .into_iter()
        .filter(|s| !s.downloads.is_empty())
        .collect();

    if stats.is_empty() {
        println!("No download history.");
        return Ok(());
    }

    for show in stats {
        println!("{} ({} downloads)", show.name, show.downloads.len());
        println!("{:-<70}", "");
        for event in show.downloads.iter().rev().take(limit) {
            println!(
                "  {} | {}",
                event.date.format("%Y-%m-%d %H:%M:%S"),
                event.tracker
            );
        }
        println!();
    }

    Ok(())
}
