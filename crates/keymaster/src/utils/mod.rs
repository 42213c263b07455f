use regex::Regex;
use std::sync::LazyLock;

pub mod config;
pub mod logging;

static ANSI_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("\x1b\\[[0-9;]*m").expect("valid ANSI escape pattern"));

#[macro_export]
macro_rules! println_pad {
    ($($arg:tt)*) => {{
        let __s = format!($($arg)*);
        for __line in __s.lines() {
            println!("    {}", __line);
        }
    }};
}

/// Number of terminal columns `s` occupies once color codes are stripped.
pub fn visible_len(s: &str) -> usize {
    ANSI_ESCAPE.replace_all(s, "").chars().count()
}

/// Frame the provided lines inside an ASCII box.
pub fn ansi_boxed_lines(lines: &[String]) -> Vec<String> {
    let width = lines.iter().map(|s| visible_len(s)).max().unwrap_or(0);

    let border = "-".repeat(width + 4);
    let mut boxed = Vec::with_capacity(lines.len() + 2);
    boxed.push(border.clone());
    for line in lines {
        let pad = width - visible_len(line);
        boxed.push(format!("| {}{} |", line, " ".repeat(pad)));
    }
    boxed.push(border);
    boxed
}

/// Prints the provided lines inside an ASCII box
pub fn print_ansi_boxed_lines(lines: &[String]) {
    for line in ansi_boxed_lines(lines) {
        println_pad!("{}", line);
    }
}
