use std::path::PathBuf;
use std::sync::OnceLock;

static EXE_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the directory containing the executable.
///
/// Falls back to `<data_local_dir>/gamepro` (then `.`) if the executable
/// path cannot be determined.
pub fn get_exe_dir() -> &'static PathBuf {
    EXE_DIR.get_or_init(|| {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .or_else(|| dirs::data_local_dir().map(|d| d.join("gamepro")))
            .unwrap_or_else(|| PathBuf::from("."))
    })
}

/// Returns the logs directory: `<exe_dir>/logs/`
pub fn get_logs_dir() -> PathBuf {
    get_exe_dir().join("logs")
}

/// Returns the log file: `<exe_dir>/logs/gamepro.log`
pub fn get_log_path() -> PathBuf {
    get_logs_dir().join("gamepro.log")
}

/// Returns the default calibration directory: `<exe_dir>/calibration/`
pub fn get_calibration_dir() -> PathBuf {
    get_exe_dir().join("calibration")
}

/// Returns the config file path: `<exe_dir>/config.json`
pub fn get_config_path() -> PathBuf {
    get_exe_dir().join("config.json")
}

/// Ensures all output directories exist. Call at startup.
pub fn ensure_directories() -> std::io::Result<()> {
    std::fs::create_dir_all(get_logs_dir())?;
    std::fs::create_dir_all(get_calibration_dir())?;
    Ok(())
}
