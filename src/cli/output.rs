//! Terminal output formatting with colors
//!
//! Respects NO_COLOR, CLICOLOR, CLICOLOR_FORCE automatically. Only data goes
//! to stdout; status lines go to stderr so a plan can be piped.

use std::path::Path;

use colored::Colorize;

/// Print error (red bold "error:" prefix) to stderr
pub fn error(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "error".red().bold(), msg);
}

/// Print error and its causes; wrapper layers repeating the same message are skipped
pub fn error_chain(err: &(dyn std::error::Error + 'static)) {
    let mut last = err.to_string();
    error(&last);
    let mut source = err.source();
    while let Some(cause) = source {
        let msg = cause.to_string();
        if msg != last {
            eprintln!("  {} {}", "caused by:".dimmed(), msg);
            last = msg;
        }
        source = cause.source();
    }
}

/// Print warning (yellow "Warning:" prefix) to stderr
pub fn warning(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "Warning".yellow(), msg);
}

/// Print completed action (green label) to stderr
pub fn status(label: &str, msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", label.green(), msg);
}

/// Print a labelled path, marking missing ones
pub fn detail_path(label: &str, path: &Path) {
    let state = if path.exists() {
        "exists".green()
    } else {
        "not found".dimmed()
    };
    println!("{:>7}: {} ({})", label.cyan(), path.display(), state);
}

/// Print plain output (no color, for data)
pub fn info(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg);
}

/// Print text that carries its own trailing newline
pub fn raw(msg: &(impl std::fmt::Display + ?Sized)) {
    print!("{}", msg);
}
