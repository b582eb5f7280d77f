use crate::config::schema::BrowserSettings;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicU16, Ordering};

static CDP_PORT_COUNTER: AtomicU16 = AtomicU16::new(9322);

/// Allocate the next remote-debugging port.
/// Starts at 9322 and increments; wraps around at 65500.
pub fn allocate_cdp_port() -> u16 {
    let port = CDP_PORT_COUNTER.fetch_add(1, Ordering::SeqCst);
    if port > 65500 {
        CDP_PORT_COUNTER.store(9322, Ordering::SeqCst);
        return 9322;
    }
    port
}

/// Locate a Chrome/Chromium binary: explicit setting, `CHROME_PATH`,
/// well-known install paths, then `PATH`.
pub fn find_chrome(configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = configured {
        return path.exists().then(|| path.to_path_buf());
    }

    if let Ok(p) = std::env::var("CHROME_PATH") {
        let pb = PathBuf::from(&p);
        if pb.exists() {
            return Some(pb);
        }
    }

    let candidates: &[&str] = {
        #[cfg(target_os = "linux")]
        {
            &[
                "/usr/bin/google-chrome",
                "/usr/bin/google-chrome-stable",
                "/usr/bin/chromium-browser",
                "/usr/bin/chromium",
                "/usr/local/bin/google-chrome",
                "/snap/bin/chromium",
            ]
        }
        #[cfg(target_os = "macos")]
        {
            &[
                "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
                "/Applications/Chromium.app/Contents/MacOS/Chromium",
            ]
        }
        #[cfg(target_os = "windows")]
        {
            &[
                r"C:\Program Files\Google\Chrome\Application\chrome.exe",
                r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
            ]
        }
        #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
        {
            &[]
        }
    };

    for path in candidates {
        let pb = PathBuf::from(path);
        if pb.exists() {
            return Some(pb);
        }
    }

    for name in &["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"] {
        if let Ok(out) = Command::new("which").arg(name).output() {
            if out.status.success() {
                let p = String::from_utf8_lossy(&out.stdout).trim().to_string();
                let pb = PathBuf::from(&p);
                if !p.is_empty() && pb.exists() {
                    return Some(pb);
                }
            }
        }
    }

    None
}

/// Build the Chrome command for an automation session.
pub fn build_command(
    chrome_path: &Path,
    settings: &BrowserSettings,
    cdp_port: u16,
    user_data_dir: &Path,
) -> Command {
    let mut cmd = Command::new(chrome_path);

    cmd.arg(format!("--remote-debugging-port={}", cdp_port));
    cmd.arg(format!("--user-data-dir={}", user_data_dir.display()));

    if settings.headless {
        cmd.arg("--headless=new");
        cmd.arg("--disable-gpu");
    }

    cmd.arg("--no-sandbox");
    cmd.arg("--disable-dev-shm-usage");
    cmd.arg(format!(
        "--window-size={},{}",
        settings.window_width, settings.window_height
    ));
    cmd.arg("--disable-extensions");
    cmd.arg("--disable-notifications");
    cmd.arg("--no-first-run");
    cmd.arg("--no-default-browser-check");
    cmd.arg("--disable-background-networking");
    cmd.arg("--disable-sync");
    cmd.arg(format!("--user-agent={}", settings.user_agent));

    for arg in &settings.custom_args {
        cmd.arg(arg);
    }

    cmd.arg("about:blank");

    cmd.stdout(Stdio::null()).stderr(Stdio::null());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        // Detach Chrome into its own session
        unsafe {
            cmd.pre_exec(|| {
                libc::setsid();
                Ok(())
            });
        }
    }

    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_of(cmd: &Command) -> Vec<String> {
        cmd.get_args()
            .map(|s| s.to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn test_allocate_cdp_port_increments() {
        let p1 = allocate_cdp_port();
        let p2 = allocate_cdp_port();
        assert!(p2 > p1 || p2 == 9322);
    }

    #[test]
    fn test_build_command_headless() {
        let settings = BrowserSettings::default();
        let cmd = build_command(
            Path::new("/usr/bin/google-chrome"),
            &settings,
            9333,
            Path::new("/tmp/e2e-profile"),
        );
        let args = args_of(&cmd);

        assert!(args.contains(&"--remote-debugging-port=9333".to_string()));
        assert!(args.contains(&"--user-data-dir=/tmp/e2e-profile".to_string()));
        assert!(args.contains(&"--headless=new".to_string()));
        assert!(args.contains(&"--window-size=1920,1080".to_string()));
        assert!(args.iter().any(|a| a.starts_with("--user-agent=Mozilla/5.0")));
        assert_eq!(args.last().map(String::as_str), Some("about:blank"));
    }

    #[test]
    fn test_build_command_headed_with_custom_args() {
        let settings = BrowserSettings {
            headless: false,
            window_width: 1280,
            window_height: 720,
            custom_args: vec!["--lang=en-IN".to_string()],
            ..BrowserSettings::default()
        };
        let cmd = build_command(
            Path::new("/usr/bin/chromium"),
            &settings,
            9444,
            Path::new("/tmp/p"),
        );
        let args = args_of(&cmd);

        assert!(!args.contains(&"--headless=new".to_string()));
        assert!(args.contains(&"--window-size=1280,720".to_string()));
        assert!(args.contains(&"--lang=en-IN".to_string()));
    }

    #[test]
    fn test_find_chrome_respects_missing_configured_path() {
        assert!(find_chrome(Some(Path::new("/nonexistent/chrome"))).is_none());
    }
}
