use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// Where the TUI writes its log, since the terminal itself is taken.
    pub fn log_path() -> PathBuf {
        if let Ok(home) = std::env::var("HOME") {
            let state_dir = PathBuf::from(home)
                .join(".local")
                .join("state")
                .join("speedread");
            state_dir.join("speedread.log")
        } else if let Some(proj_dirs) = ProjectDirs::from("", "", "speedread") {
            proj_dirs.data_local_dir().join("speedread.log")
        } else {
            std::env::temp_dir().join("speedread.log")
        }
    }
}
