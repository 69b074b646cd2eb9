//! Process-wide detection of a usable browser runtime.
//!
//! Autodetection runs at most once per process; the answer is cached and
//! every later batch reuses it. Executables that failed to launch are
//! remembered too, so a broken install is tried once, not once per file.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex, OnceLock, PoisonError};

use tracing::{debug, info};

/// Common Chrome/Chromium install locations.
const CHROME_PATHS: &[&str] = &[
    // Linux
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    "/opt/google/chrome/google-chrome",
    // macOS
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
];

/// Executable names looked up on `PATH`.
const CHROME_COMMANDS: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "chrome",
];

static DETECTED_BROWSER: OnceLock<Option<PathBuf>> = OnceLock::new();

static FAILED_LAUNCHES: LazyLock<Mutex<HashSet<PathBuf>>> =
    LazyLock::new(|| Mutex::new(HashSet::new()));

/// Resolves the browser executable to launch.
///
/// An explicitly configured path wins when it exists. Otherwise the cached
/// autodetection result is returned.
#[must_use]
pub fn browser_executable(configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            return Some(path.to_path_buf());
        }
        debug!(path = %path.display(), "configured browser executable does not exist");
    }
    DETECTED_BROWSER.get_or_init(detect_browser).clone()
}

/// Whether the browser transport can even be attempted on this host.
///
/// Always false when the crate is built without the `browser` feature.
#[must_use]
pub fn browser_runtime_available(configured: Option<&Path>) -> bool {
    cfg!(feature = "browser")
        && browser_executable(configured).is_some_and(|path| !launch_failed(&path))
}

/// Marks an executable as unable to start for the rest of the process.
pub fn record_launch_failure(executable: &Path) {
    let mut failed = FAILED_LAUNCHES.lock().unwrap_or_else(PoisonError::into_inner);
    if failed.insert(executable.to_path_buf()) {
        info!(path = %executable.display(), "browser launch failed; not retrying this process");
    }
}

/// Whether launching this executable already failed in this process.
#[must_use]
pub fn launch_failed(executable: &Path) -> bool {
    FAILED_LAUNCHES
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .contains(executable)
}

fn detect_browser() -> Option<PathBuf> {
    for path in CHROME_PATHS {
        let candidate = Path::new(path);
        if candidate.exists() {
            info!(path, "found browser runtime");
            return Some(candidate.to_path_buf());
        }
    }

    for command in CHROME_COMMANDS {
        if let Ok(path) = which::which(command) {
            info!(path = %path.display(), "found browser runtime in PATH");
            return Some(path);
        }
    }

    debug!("no browser runtime found");
    None
}
