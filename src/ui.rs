use colored::Colorize;

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Render an optional catalog value, marking what the server cannot report
pub fn or_unavailable<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "(not reported)".to_string(), |v| v.to_string())
}

/// Render a connection limit
pub fn connection_limit(limit: i32) -> String {
    if limit == pgcatalog::UNLIMITED_CONNECTIONS {
        "unlimited".to_string()
    } else {
        limit.to_string()
    }
}

// ============================================================================
// Tests
// ============================================================================
