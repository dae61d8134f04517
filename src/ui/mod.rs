// Wed Jan 15 2026 - Alex

pub mod progress;

pub use progress::RenderProgress;

use colored::Colorize;

pub fn print_info(message: &str) {
    println!("{} {}", "[INFO]".cyan(), message);
}

pub fn print_success(message: &str) {
    println!("{} {}", "[OK]".green(), message);
}

pub fn print_warning(message: &str) {
    println!("{} {}", "[WARN]".yellow(), message);
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "[ERROR]".red(), message);
}

/// Prints `key: value` lines under a bold heading.
pub fn print_summary(title: &str, items: &[(&str, String)]) {
    println!();
    println!("{}", title.bold().underline());
    for (key, value) in items {
        println!("  {}: {}", key.cyan(), value);
    }
}
