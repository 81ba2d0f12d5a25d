//! Output formatting for CLI responses.

/// Prints a success message.
pub fn print_success(message: &str) {
    println!("[OK] {message}");
}

/// Prints a warning message.
pub fn print_warning(message: &str) {
    eprintln!("[WARN] {message}");
}

/// Prints an informational message.
pub fn print_info(message: &str) {
    println!("[INFO] {message}");
}

/// Prints an aligned `label: value` line.
pub fn print_field(label: &str, value: &str) {
    println!("  {:<13}{value}", format!("{label}:"));
}
