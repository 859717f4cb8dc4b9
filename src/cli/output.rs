//! Terminal output helpers.

use console::style;
use serde::Serialize;

/// Pretty-print a value as JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn success(message: &str) {
    eprintln!("{} {}", style("✓").green().bold(), message);
}

pub fn note(message: &str) {
    eprintln!("{}", style(message).dim());
}
