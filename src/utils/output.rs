// Colored terminal output helpers
use colored::Colorize;

pub fn print_success(msg: &str) {
    println!("{} {}", "ok".green(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "error:".red().bold(), msg);
}

pub fn print_info(msg: &str) {
    println!("{} {}", "::".blue(), msg);
}

/// One installed package line: `  + name @ revision`
pub fn print_package(name: &str, revision: &str) {
    println!("  {} {} {}", "+".green(), name, format!("@ {}", revision).dimmed());
}
