use crate::services::TransferComplete;
use crate::state::SharedState;
use std::path::PathBuf;

pub async fn cmd_complete(
    state: &SharedState,
    release_name: &str,
    download_dir: PathBuf,
) -> anyhow::Result<()> {
    let transfer = TransferComplete {
        release_name: release_name.to_string(),
        download_directory: download_dir,
    };

    match state.completion.on_transfer_complete(&transfer).await? {
        Some(outcome) => println!(
            "Copied {} file(s) of {} to {}",
            outcome.files,
            outcome.show,
            outcome.destination.display()
        ),
        None => println!("Nothing to copy for {release_name}"),
    }

    Ok(())
}
