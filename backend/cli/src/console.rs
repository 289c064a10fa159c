//! Terminal output: ANSI styling and the console step indicator.

use stepwise_core::{ControlKeys, ResumeLevel};
use stepwise_routing::StepIndicator;

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";

/// Check if the terminal supports color output.
pub fn supports_color() -> bool {
    std::env::var("NO_COLOR").is_err()
        && (std::env::var("COLORTERM").is_ok()
            || std::env::var("TERM").map(|t| t != "dumb").unwrap_or(false))
}

fn paint(style: &str, text: &str) -> String {
    if supports_color() {
        format!("{style}{text}{RESET}")
    } else {
        text.to_string()
    }
}

/// One line per control: key, then what it does.
pub fn render_bindings(controls: &ControlKeys) -> String {
    let mut rows: Vec<(String, String)> = controls
        .level_bindings()
        .map(|(level, key)| (key.to_string(), format!("resume at {level}")))
        .collect();
    rows.push((controls.terminate_key().to_string(), "terminate".to_string()));

    let width = rows.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    let mut out = String::new();
    for (key, action) in rows {
        out.push_str(&format!("  {}  {action}\n", paint(BOLD, &format!("{key:<width$}"))));
    }
    out
}

/// Reports step state on stderr so it interleaves with the program's stdout.
pub struct ConsoleIndicator {
    controls: ControlKeys,
}

impl ConsoleIndicator {
    pub fn new(controls: ControlKeys) -> Self {
        Self { controls }
    }

    fn hint(&self) -> String {
        let keys: Vec<String> = self
            .controls
            .level_bindings()
            .map(|(_, k)| k.to_string())
            .collect();
        format!("press {} or {}", keys.join("/"), self.controls.terminate_key())
    }
}

impl StepIndicator for ConsoleIndicator {
    fn level_selected(&self, level: ResumeLevel) {
        eprintln!("{} {level}", paint(CYAN, "level"));
    }

    fn suspended(&self, requested: ResumeLevel, message: &str) {
        eprintln!(
            "{} {message} {}",
            paint(YELLOW, &format!("|| {requested}")),
            paint(DIM, &format!("({})", self.hint()))
        );
    }

    fn resumed(&self, level: ResumeLevel) {
        eprintln!("{}", paint(GREEN, &format!("> {level}")));
    }
}
