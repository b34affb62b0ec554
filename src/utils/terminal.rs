//! Terminal output utilities

use console::{style, Term};

/// Print an error message to stderr
pub fn print_error(message: &str) {
    eprintln!("{}: {}", style("error").red().bold(), message);
}

/// Print the green SUCCESS banner
pub fn print_success_banner() {
    println!("{}", style("SUCCESS").green().bold());
}

/// Print the yellow FAILURE banner
pub fn print_failure_banner() {
    println!("{}", style("FAILURE").yellow().bold());
}

/// Print the red ERROR banner
pub fn print_error_banner() {
    println!("{}", style("ERROR").red().bold());
}

/// Clear the screen before the live display starts
///
/// Does nothing when stdout is not a terminal.
pub fn clear_screen() {
    let term = Term::stdout();
    if term.is_term() {
        let _ = term.clear_screen();
    }
}
