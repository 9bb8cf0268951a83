// Terminal console - line commands for the Detection page
//
// Reads commands from stdin, forwards them to the DetectionController and
// prints state change events as they arrive.

use crate::state::StateManager;
use crate::ui::controller::DetectionController;
use crate::ui::render::{render_dashboard, render_event, render_history, render_status};
use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

const MEDIA_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "webp", "mp4", "avi", "mov", "webm"];

pub const HELP: &str = "\
Commands:
  upload [path]        select an image or video (opens a file dialog without a path)
  camera start|stop    start or stop the live camera
  capture              take a photo from the live camera
  analyze              send the selected media for PPE detection
  reset                clear the selection and result
  status               show the current selection and result
  history [page]       list past detections
  dashboard            show detection totals
  help                 show this help
  quit                 exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Upload(Option<Utf8PathBuf>),
    CameraStart,
    CameraStop,
    Capture,
    Analyze,
    Reset,
    Status,
    History(u32),
    Dashboard,
    Help,
    Quit,
}

impl Command {
    /// Parse one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Command>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_ascii_lowercase().as_str() {
            "upload" | "open" => {
                let path = rest.trim_matches(|c| c == '"' || c == '\'');
                Command::Upload((!path.is_empty()).then(|| Utf8PathBuf::from(path)))
            }
            "camera" => match rest.to_ascii_lowercase().as_str() {
                "start" | "on" => Command::CameraStart,
                "stop" | "off" => Command::CameraStop,
                _ => return Err("usage: camera start|stop".to_string()),
            },
            "capture" => Command::Capture,
            "analyze" | "submit" => Command::Analyze,
            "reset" => Command::Reset,
            "status" => Command::Status,
            "history" => {
                let page = if rest.is_empty() {
                    1
                } else {
                    rest.parse::<u32>()
                        .ok()
                        .filter(|p| *p >= 1)
                        .ok_or_else(|| format!("invalid page: {}", rest))?
                };
                Command::History(page - 1)
            }
            "dashboard" => Command::Dashboard,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(format!("unknown command '{}'; type `help`", other)),
        };

        Ok(Some(command))
    }
}

/// Print rendered state changes until the channel closes
fn spawn_event_printer(state_manager: Arc<StateManager>) -> JoinHandle<()> {
    let mut rx = state_manager.subscribe();

    tokio::spawn(async move {
        tracing::debug!("Console event printer started");
        loop {
            match rx.recv().await {
                Ok(change) => {
                    tracing::trace!("State change received: {:?}", change);
                    if let Some(line) = render_event(&change, &state_manager.snapshot()) {
                        println!("{}", line);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Console fell behind by {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

/// Native file picker, run off the async thread
async fn pick_media_file() -> Option<Utf8PathBuf> {
    let picked = tokio::task::spawn_blocking(|| {
        rfd::FileDialog::new()
            .set_title("Select image or video")
            .add_filter("Images and videos", MEDIA_EXTENSIONS)
            .pick_file()
    })
    .await
    .ok()
    .flatten()?;

    Utf8PathBuf::try_from(picked)
        .map_err(|e| {
            tracing::error!("Failed to convert path to UTF-8: {}", e);
            e
        })
        .ok()
}

/// Run one command. Returns `false` when the console should exit.
async fn dispatch(controller: &DetectionController, command: Command) -> bool {
    match command {
        Command::Upload(path) => {
            let path = match path {
                Some(path) => Some(path),
                None => pick_media_file().await,
            };
            match path {
                Some(path) => {
                    // Failures are reported through UserNotice
                    let _ = controller.select_path(&path).await;
                }
                None => println!("No file selected."),
            }
        }
        Command::CameraStart => {
            println!("Starting {}...", controller.camera_name());
            let _ = controller.start_camera().await;
        }
        Command::CameraStop => {
            if !controller.stop_camera() {
                println!("Camera is not running.");
            }
        }
        Command::Capture => {
            let _ = controller.capture_photo();
        }
        Command::Analyze => {
            let controller = controller.clone();
            tokio::spawn(async move {
                let _ = controller.submit().await;
            });
        }
        Command::Reset => controller.reset(),
        Command::Status => println!("{}", render_status(&controller.state().snapshot())),
        Command::History(page) => match controller.history(page).await {
            Ok(view) => println!("{}", render_history(&view, page)),
            Err(e) => println!("Failed to fetch history: {}", e.user_message()),
        },
        Command::Dashboard => match controller.dashboard().await {
            Ok(view) => println!("{}", render_dashboard(&view)),
            Err(e) => println!("Failed to fetch stats: {}", e.user_message()),
        },
        Command::Help => println!("{}", HELP),
        Command::Quit => return false,
    }
    true
}

/// Interactive loop over stdin. Returns on `quit` or end of input.
pub async fn run_console(controller: DetectionController) -> Result<()> {
    let printer = spawn_event_printer(Arc::clone(controller.state()));

    println!("PPE entry check console. Type `help` for commands.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let Some(line) = lines
            .next_line()
            .await
            .context("Failed to read console input")?
        else {
            tracing::info!("Console input closed");
            break;
        };

        match Command::parse(&line) {
            Ok(Some(command)) => {
                tracing::debug!("Console command: {:?}", command);
                if !dispatch(&controller, command).await {
                    break;
                }
            }
            Ok(None) => {}
            Err(message) => println!("{}", message),
        }
    }

    controller.shutdown();
    printer.abort();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("  "), Ok(None));
        assert_eq!(Command::parse("upload"), Ok(Some(Command::Upload(None))));
        assert_eq!(
            Command::parse("upload \"/media/gate 3.jpg\""),
            Ok(Some(Command::Upload(Some(Utf8PathBuf::from("/media/gate 3.jpg")))))
        );
        assert_eq!(Command::parse("CAMERA start"), Ok(Some(Command::CameraStart)));
        assert_eq!(Command::parse("camera stop"), Ok(Some(Command::CameraStop)));
        assert_eq!(Command::parse("analyze"), Ok(Some(Command::Analyze)));
        assert_eq!(Command::parse("history"), Ok(Some(Command::History(0))));
        assert_eq!(Command::parse("history 3"), Ok(Some(Command::History(2))));
        assert_eq!(Command::parse("exit"), Ok(Some(Command::Quit)));
    }

    #[test]
    fn test_parse_errors() {
        assert!(Command::parse("camera").is_err());
        assert!(Command::parse("history 0").is_err());
        assert!(Command::parse("history x").is_err());
        assert!(Command::parse("launch").is_err());
    }
}
