//! Keyboard and touch input mapping.

/// Minimum displacement in CSS pixels before a touch counts as a swipe.
pub const SWIPE_THRESHOLD: f64 = 50.0;

/// A user intent decoded from raw input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderCommand {
    /// Advance one spread.
    NextSpread,
    /// Go back one spread.
    PrevSpread,
    /// Zoom in one step.
    ZoomIn,
    /// Zoom out one step.
    ZoomOut,
    /// Reset zoom to 1.0.
    ResetZoom,
    /// Enter or leave fullscreen.
    ToggleFullscreen,
    /// Leave fullscreen.
    ExitFullscreen,
    /// Swipe up; brings hidden controls back.
    RevealControls,
}

/// Map a keyboard key to a reader command.
///
/// Shortcuts are suppressed while a text input has focus so typing a
/// search query never turns pages.
pub fn command_for_key(key: &str, text_input_focused: bool) -> Option<ReaderCommand> {
    if text_input_focused {
        return None;
    }
    match key {
        "ArrowRight" | "ArrowDown" => Some(ReaderCommand::NextSpread),
        "ArrowLeft" | "ArrowUp" => Some(ReaderCommand::PrevSpread),
        "f" | "F" => Some(ReaderCommand::ToggleFullscreen),
        "+" | "=" => Some(ReaderCommand::ZoomIn),
        "-" => Some(ReaderCommand::ZoomOut),
        "0" => Some(ReaderCommand::ResetZoom),
        "Escape" => Some(ReaderCommand::ExitFullscreen),
        _ => None,
    }
}

/// Map a completed touch gesture to a reader command.
///
/// `dx` and `dy` are end minus start coordinates. Horizontal swipes
/// past the threshold turn pages; a dominant upward swipe reveals the
/// controls. Anything under the threshold is ignored as a tap.
pub fn command_for_swipe(dx: f64, dy: f64) -> Option<ReaderCommand> {
    if dx.abs() > SWIPE_THRESHOLD && dx.abs() > dy.abs() {
        if dx < 0.0 {
            Some(ReaderCommand::NextSpread)
        } else {
            Some(ReaderCommand::PrevSpread)
        }
    } else if dy < -SWIPE_THRESHOLD && dy.abs() > dx.abs() {
        Some(ReaderCommand::RevealControls)
    } else {
        None
    }
}
