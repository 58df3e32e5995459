mod check;
mod complete;
mod history;
mod init;
mod shows;

pub use check::cmd_check;
pub use complete::cmd_complete;
pub use history::cmd_history;
pub use init::cmd_init;
pub use shows::{cmd_add_shows, cmd_list_removed, cmd_list_shows, cmd_remove_shows, cmd_restore_show};
