use async_trait::async_trait;
use chrono::Local;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::{ArgShape, Tool, ToolRegistry};
use crate::action::ToolArgs;

const DEFAULT_VOLUME_STEP: u32 = 10;

/// Spoken aliases, launch program, process name and display name
type KnownApp = (&'static [&'static str], &'static str, &'static str, &'static str);

const KNOWN_APPS: &[KnownApp] = &[
    (&["chrome"], "google-chrome", "chrome", "Google Chrome"),
    (&["vs code", "vscode", "visual studio code", "code"], "code", "code", "Visual Studio Code"),
    (&["notepad", "text editor"], "gedit", "gedit", "Notepad"),
    (&["calculator"], "gnome-calculator", "gnome-calculator", "Calculator"),
    (&["spotify"], "spotify", "spotify", "Spotify"),
    (&["terminal"], "x-terminal-emulator", "gnome-terminal", "Terminal"),
    (&["files", "explorer"], "nautilus", "nautilus", "Files"),
];

/// Every method answers with a sentence for the user. `open_app` and
/// `open_website` start that sentence with "Opening" on success.
#[async_trait]
pub trait Desktop: Send + Sync {
    async fn open_app(&self, name: &str) -> String;
    async fn close_app(&self, name: &str) -> String;
    async fn open_website(&self, url: &str) -> String;
    async fn google_search(&self, query: &str) -> String;
    async fn play_youtube(&self, query: &str) -> String;
    /// shutdown, restart or lock
    async fn system_control(&self, command: &str) -> String;
    async fn take_screenshot(&self, name: Option<&str>) -> String;
    /// mute, up, down or set, with an optional percentage
    async fn volume_control(&self, action: &str, amount: Option<u32>) -> String;
    async fn media_control(&self, action: &str) -> String;
    /// copy (with text) or paste
    async fn clipboard(&self, action: &str, text: Option<&str>) -> String;
    /// create_folder, create_file (with content), delete or read
    async fn file_operations(&self, action: &str, path: &str, content: Option<&str>) -> String;
    /// Screen brightness in percent
    async fn brightness_control(&self, level: u32) -> String;
}

fn known_app(name: &str) -> Option<&'static KnownApp> {
    let lower = name.trim().to_lowercase();
    KNOWN_APPS.iter().find(|(aliases, ..)| {
        aliases.iter().any(|alias| {
            if alias.contains(' ') {
                lower.contains(alias)
            } else {
                lower.split_whitespace().any(|w| w == *alias)
            }
        })
    })
}

/// Program name and display name for a spoken application name
pub fn resolve_app(name: &str) -> (String, String) {
    match known_app(name) {
        Some((_, program, _, display)) => (program.to_string(), display.to_string()),
        None => (
            name.trim().to_lowercase().replace(' ', "-"),
            name.trim().to_string(),
        ),
    }
}

/// Exact process name and display name of an app we know how to close
pub fn kill_target(name: &str) -> Option<(&'static str, &'static str)> {
    known_app(name).map(|(_, _, process, display)| (*process, *display))
}

/// Whether an `open_app` or `open_website` reply reports success
pub fn opened(reply: &str) -> bool {
    reply.starts_with("Opening ")
}

/// Add a scheme to bare host names
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

/// `pactl` arguments and the reply for a volume request
pub fn volume_command(action: &str, amount: Option<u32>) -> Option<(Vec<String>, String)> {
    const SINK: &str = "@DEFAULT_SINK@";
    let action = action.to_lowercase();
    let args = |verb: &str, value: String| vec![verb.to_string(), SINK.to_string(), value];

    if action.contains("mute") {
        return Some((
            args("set-sink-mute", "toggle".into()),
            "Volume muted/unmuted.".to_string(),
        ));
    }
    if action.contains("up") || action.contains("increase") {
        let step = amount.unwrap_or(DEFAULT_VOLUME_STEP);
        let reply = match amount {
            Some(a) => format!("Volume increased by {a}%."),
            None => "Volume increased.".to_string(),
        };
        return Some((args("set-sink-volume", format!("+{step}%")), reply));
    }
    if action.contains("down") || action.contains("decrease") {
        let step = amount.unwrap_or(DEFAULT_VOLUME_STEP);
        let reply = match amount {
            Some(a) => format!("Volume decreased by {a}%."),
            None => "Volume decreased.".to_string(),
        };
        return Some((args("set-sink-volume", format!("-{step}%")), reply));
    }
    if action.contains("set") {
        let level = amount?.min(100);
        return Some((
            args("set-sink-volume", format!("{level}%")),
            format!("Volume set to {level}%."),
        ));
    }
    None
}

/// `playerctl` verb and the reply for a media request
pub fn media_command(action: &str) -> Option<(&'static str, &'static str)> {
    let action = action.to_lowercase();
    if action.contains("stop") {
        Some(("stop", "Media stopped."))
    } else if action.contains("next") || action.contains("skip") {
        Some(("next", "Skipping to next track."))
    } else if action.contains("prev") || action.contains("back") {
        Some(("previous", "Going to previous track."))
    } else if action.contains("pause") || action.contains("play") || action.contains("resume") {
        Some(("play-pause", "Media paused/played."))
    } else {
        None
    }
}

/// Shells out to common Linux desktop utilities
pub struct SystemDesktop {
    screenshot_dir: PathBuf,
}

impl SystemDesktop {
    pub fn new(screenshot_dir: PathBuf) -> Self {
        Self { screenshot_dir }
    }

    /// Start a program in the background
    fn launch(program: &str, args: &[&str]) -> std::io::Result<()> {
        Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(|_| ())
    }

    /// Run to completion, returning stdout on success
    async fn run(program: &str, args: &[&str]) -> Result<String, String> {
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| format!("{program}: {e}"))?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(format!("{program} exited with {}: {}", output.status, stderr.trim()))
        }
    }

    fn open_url(&self, url: &str) -> Result<(), String> {
        Self::launch("xdg-open", &[url]).map_err(|e| e.to_string())
    }

    async fn copy_text(text: &str) -> Result<(), String> {
        let mut last_error = String::from("no clipboard tool found");
        let candidates: [(&str, &[&str]); 2] =
            [("wl-copy", &[]), ("xclip", &["-selection", "clipboard"])];
        for (program, args) in candidates {
            let child = Command::new(program)
                .args(args)
                .stdin(Stdio::piped())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn();
            let mut child = match child {
                Ok(child) => child,
                Err(e) => {
                    last_error = format!("{program}: {e}");
                    continue;
                }
            };
            if let Some(mut stdin) = child.stdin.take() {
                stdin
                    .write_all(text.as_bytes())
                    .await
                    .map_err(|e| e.to_string())?;
            }
            let status = child.wait().await.map_err(|e| e.to_string())?;
            if status.success() {
                return Ok(());
            }
            last_error = format!("{program} exited with {status}");
        }
        Err(last_error)
    }
}

#[async_trait]
impl Desktop for SystemDesktop {
    async fn open_app(&self, name: &str) -> String {
        let (program, display) = resolve_app(name);
        match Self::launch(&program, &[]) {
            Ok(()) => format!("Opening {display}"),
            Err(e) => {
                tracing::warn!(app = %program, error = %e, "failed to launch app");
                format!("I couldn't find an app named {name}")
            }
        }
    }

    async fn close_app(&self, name: &str) -> String {
        let Some((process, display)) = kill_target(name) else {
            return format!("I don't have a specific kill command for {} yet.", name.trim());
        };
        match Self::run("pkill", &["-x", process]).await {
            Ok(_) => format!("Closed {display}."),
            Err(e) => {
                tracing::debug!(error = %e, "pkill failed");
                format!("Failed to close {display}. It may not be running.")
            }
        }
    }

    async fn open_website(&self, url: &str) -> String {
        let url = normalize_url(url);
        match self.open_url(&url) {
            Ok(()) => format!("Opening {url}"),
            Err(e) => format!("Failed to open {url}: {e}"),
        }
    }

    async fn google_search(&self, query: &str) -> String {
        let url = format!(
            "https://www.google.com/search?q={}",
            urlencoding::encode(query)
        );
        match self.open_url(&url) {
            Ok(()) => format!("Searching Google for {query}"),
            Err(e) => format!("Google search failed: {e}"),
        }
    }

    async fn play_youtube(&self, query: &str) -> String {
        let url = format!(
            "https://www.youtube.com/results?search_query={}",
            urlencoding::encode(query)
        );
        match self.open_url(&url) {
            Ok(()) => format!("Playing {query} on YouTube"),
            Err(e) => format!("Failed to play on YouTube: {e}"),
        }
    }

    async fn system_control(&self, command: &str) -> String {
        let command = command.to_lowercase();
        let (script, reply) = if command.contains("shutdown") || command.contains("power off") {
            ("sleep 5 && systemctl poweroff", "Shutting down the system in 5 seconds.")
        } else if command.contains("restart") || command.contains("reboot") {
            ("sleep 5 && systemctl reboot", "Restarting the system in 5 seconds.")
        } else if command.contains("lock") {
            ("loginctl lock-session", "System locked.")
        } else {
            return "System command not recognized.".to_string();
        };

        match Self::launch("sh", &["-c", script]) {
            Ok(()) => reply.to_string(),
            Err(e) => format!("System control failed: {e}"),
        }
    }

    async fn take_screenshot(&self, name: Option<&str>) -> String {
        if let Err(e) = std::fs::create_dir_all(&self.screenshot_dir) {
            return format!("Failed to take screenshot: {e}");
        }

        let file_name = match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(n) if n.ends_with(".png") => n.to_string(),
            Some(n) => format!("{n}.png"),
            None => format!("screenshot_{}.png", Local::now().format("%Y%m%d_%H%M%S")),
        };
        let path = self.screenshot_dir.join(file_name);
        let target = path.to_string_lossy().to_string();

        let candidates: [(&str, Vec<&str>); 4] = [
            ("gnome-screenshot", vec!["-f", target.as_str()]),
            ("grim", vec![target.as_str()]),
            ("scrot", vec![target.as_str()]),
            ("import", vec!["-window", "root", target.as_str()]),
        ];
        for (program, args) in candidates {
            if Self::run(program, &args).await.is_ok() {
                return format!("Screenshot saved to {}", path.display());
            }
        }
        "Failed to take screenshot: no screenshot tool found".to_string()
    }

    async fn volume_control(&self, action: &str, amount: Option<u32>) -> String {
        let Some((args, reply)) = volume_command(action, amount) else {
            return "Unknown volume command.".to_string();
        };
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        match Self::run("pactl", &args).await {
            Ok(_) => reply,
            Err(e) => format!("Volume control failed: {e}"),
        }
    }

    async fn media_control(&self, action: &str) -> String {
        let Some((verb, reply)) = media_command(action) else {
            return "Unknown media command.".to_string();
        };
        match Self::run("playerctl", &[verb]).await {
            Ok(_) => reply.to_string(),
            Err(e) => format!("Media control failed: {e}"),
        }
    }

    async fn clipboard(&self, action: &str, text: Option<&str>) -> String {
        if action.to_lowercase().contains("copy") {
            let text = text.unwrap_or_default();
            return match Self::copy_text(text).await {
                Ok(()) => "Copied to clipboard.".to_string(),
                Err(e) => format!("Clipboard failed: {e}"),
            };
        }

        let pasted = match Self::run("wl-paste", &[]).await {
            Ok(text) => Ok(text),
            Err(_) => Self::run("xclip", &["-selection", "clipboard", "-o"]).await,
        };
        match pasted {
            Ok(text) => format!("Clipboard: {text}"),
            Err(e) => format!("Clipboard failed: {e}"),
        }
    }

    async fn file_operations(&self, action: &str, path: &str, content: Option<&str>) -> String {
        let path = path.trim();
        if path.is_empty() {
            return "File op failed: no path given".to_string();
        }
        let result = match action.trim().to_lowercase().as_str() {
            "create_folder" => fs::create_dir_all(path)
                .await
                .map(|_| format!("Created folder: {path}")),
            "create_file" => fs::write(path, content.unwrap_or_default())
                .await
                .map(|_| format!("Created file: {path}")),
            "delete" => {
                let removed = match fs::metadata(path).await {
                    Ok(meta) if meta.is_dir() => fs::remove_dir_all(path).await,
                    Ok(_) => fs::remove_file(path).await,
                    Err(e) => Err(e),
                };
                removed.map(|_| format!("Deleted: {path}"))
            }
            "read" => fs::read_to_string(path).await,
            other => return format!("Unknown file operation: {other}"),
        };
        result.unwrap_or_else(|e| format!("File op failed: {e}"))
    }

    async fn brightness_control(&self, level: u32) -> String {
        let level = level.min(100);
        let percent = format!("{level}%");
        match Self::run("brightnessctl", &["set", percent.as_str()]).await {
            Ok(_) => format!("Brightness set to {level}%"),
            Err(e) => format!("Brightness failed: {e}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesktopOp {
    OpenApp,
    CloseApp,
    OpenWebsite,
    GoogleSearch,
    PlayYoutube,
    SystemControl,
    TakeScreenshot,
    VolumeControl,
    MediaControl,
    ClipboardControl,
    FileOperations,
    BrightnessControl,
}

impl DesktopOp {
    pub const ALL: [DesktopOp; 12] = [
        DesktopOp::OpenApp,
        DesktopOp::CloseApp,
        DesktopOp::OpenWebsite,
        DesktopOp::GoogleSearch,
        DesktopOp::PlayYoutube,
        DesktopOp::SystemControl,
        DesktopOp::TakeScreenshot,
        DesktopOp::VolumeControl,
        DesktopOp::MediaControl,
        DesktopOp::ClipboardControl,
        DesktopOp::FileOperations,
        DesktopOp::BrightnessControl,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DesktopOp::OpenApp => "open_app",
            DesktopOp::CloseApp => "close_app",
            DesktopOp::OpenWebsite => "open_website",
            DesktopOp::GoogleSearch => "google_search",
            DesktopOp::PlayYoutube => "play_youtube",
            DesktopOp::SystemControl => "system_control",
            DesktopOp::TakeScreenshot => "take_screenshot",
            DesktopOp::VolumeControl => "volume_control",
            DesktopOp::MediaControl => "media_control",
            DesktopOp::ClipboardControl => "clipboard_control",
            DesktopOp::FileOperations => "file_operations",
            DesktopOp::BrightnessControl => "brightness_control",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            DesktopOp::OpenApp => "Open a desktop application",
            DesktopOp::CloseApp => "Close a running application",
            DesktopOp::OpenWebsite => "Open a URL in the browser",
            DesktopOp::GoogleSearch => "Search Google in the browser",
            DesktopOp::PlayYoutube => "Play a song or video on YouTube",
            DesktopOp::SystemControl => "shutdown, restart or lock the computer",
            DesktopOp::TakeScreenshot => "Capture the screen to a file",
            DesktopOp::VolumeControl => "mute, up, down or set the volume",
            DesktopOp::MediaControl => "pause, resume, stop, next or previous track",
            DesktopOp::ClipboardControl => "copy text to or paste from the clipboard",
            DesktopOp::FileOperations => "create_folder, create_file, delete or read a path",
            DesktopOp::BrightnessControl => "set screen brightness from 0 to 100",
        }
    }

    fn shape(&self) -> ArgShape {
        match self {
            DesktopOp::OpenApp | DesktopOp::CloseApp => ArgShape::new(&["name"], &[]),
            DesktopOp::OpenWebsite => ArgShape::new(&["url"], &[]),
            DesktopOp::GoogleSearch => ArgShape::new(&["query"], &[]),
            DesktopOp::PlayYoutube => ArgShape::new(&["song"], &[]),
            DesktopOp::SystemControl => ArgShape::new(&["cmd"], &[]),
            DesktopOp::TakeScreenshot => ArgShape::new(&[], &["name"]),
            DesktopOp::VolumeControl => ArgShape::new(&["action"], &["amount"]),
            DesktopOp::MediaControl => ArgShape::new(&["action"], &[]),
            DesktopOp::ClipboardControl => ArgShape::new(&["action"], &["text"]),
            DesktopOp::FileOperations => ArgShape::new(&["action", "path"], &["content"]),
            DesktopOp::BrightnessControl => ArgShape::new(&["level"], &[]),
        }
    }
}

/// A single desktop operation exposed as a tool
pub struct DesktopTool {
    op: DesktopOp,
    desktop: Arc<dyn Desktop>,
}

impl DesktopTool {
    pub fn new(op: DesktopOp, desktop: Arc<dyn Desktop>) -> Self {
        Self { op, desktop }
    }
}

#[async_trait]
impl Tool for DesktopTool {
    fn name(&self) -> &str {
        self.op.name()
    }

    fn description(&self) -> &str {
        self.op.description()
    }

    fn shape(&self) -> ArgShape {
        self.op.shape()
    }

    async fn execute(&self, args: &ToolArgs) -> String {
        let first = args.get(0).unwrap_or_default();
        let desktop = &self.desktop;
        match self.op {
            DesktopOp::OpenApp => desktop.open_app(first).await,
            DesktopOp::CloseApp => desktop.close_app(first).await,
            DesktopOp::OpenWebsite => desktop.open_website(first).await,
            DesktopOp::GoogleSearch => desktop.google_search(first).await,
            DesktopOp::PlayYoutube => desktop.play_youtube(first).await,
            DesktopOp::SystemControl => desktop.system_control(first).await,
            DesktopOp::TakeScreenshot => desktop.take_screenshot(args.get(0)).await,
            DesktopOp::VolumeControl => {
                let amount = args.get(1).and_then(|a| a.trim().trim_end_matches('%').parse().ok());
                desktop.volume_control(first, amount).await
            }
            DesktopOp::MediaControl => desktop.media_control(first).await,
            DesktopOp::ClipboardControl => desktop.clipboard(first, args.get(1)).await,
            DesktopOp::FileOperations => {
                let path = args.get(1).unwrap_or_default();
                desktop.file_operations(first, path, args.get(2)).await
            }
            DesktopOp::BrightnessControl => match first.trim().trim_end_matches('%').parse() {
                Ok(level) => desktop.brightness_control(level).await,
                Err(_) => format!("Brightness failed: '{first}' is not a level"),
            },
        }
    }
}

pub fn register(registry: &mut ToolRegistry, desktop: Arc<dyn Desktop>) {
    for op in DesktopOp::ALL {
        registry.register(Arc::new(DesktopTool::new(op, desktop.clone())));
    }
}
