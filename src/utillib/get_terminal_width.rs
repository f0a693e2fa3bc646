use terminal_size::{terminal_size, Width};

/// Width for wrapping `--help` output, `reserve` columns less than
/// the terminal is wide (120 if stdout is not a terminal).
pub fn get_terminal_width(reserve: usize) -> usize {
    let width = match terminal_size() {
        Some((Width(w), _)) => usize::from(w),
        None => 120,
    };
    width.saturating_sub(reserve).max(40)
}
