pub mod client;

pub use client::{
    fetch_all, file_sha1, validate_sha1, DownloadEntry, DownloadService, Downloader,
};
