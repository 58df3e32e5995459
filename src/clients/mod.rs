pub mod feed;
pub mod qbittorrent;
