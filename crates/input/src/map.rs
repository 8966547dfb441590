//! Key mapping from terminal events to driver actions.

use crate::types::DriverAction;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Map keyboard input to driver actions.
pub fn handle_key_event(key: KeyEvent) -> Option<DriverAction> {
    match key.code {
        KeyCode::Char('m') | KeyCode::Char('M') | KeyCode::Tab => {
            Some(DriverAction::CycleSchedule)
        }
        KeyCode::Char('f') | KeyCode::Char('F') => Some(DriverAction::ToggleView),

        // Intensity
        KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Up => Some(DriverAction::IntensityUp),
        KeyCode::Char('-') | KeyCode::Char('_') | KeyCode::Down => {
            Some(DriverAction::IntensityDown)
        }

        KeyCode::Char('p') | KeyCode::Char('P') | KeyCode::Char(' ') => Some(DriverAction::Pause),

        _ => None,
    }
}

/// Check if key should quit the display.
pub fn should_quit(key: KeyEvent) -> bool {
    matches!(
        key.code,
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc
    ) || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    #[test]
    fn test_schedule_and_view_keys() {
        assert_eq!(
            handle_key_event(KeyEvent::from(KeyCode::Char('m'))),
            Some(DriverAction::CycleSchedule)
        );
        assert_eq!(
            handle_key_event(KeyEvent::from(KeyCode::Tab)),
            Some(DriverAction::CycleSchedule)
        );
        assert_eq!(
            handle_key_event(KeyEvent::from(KeyCode::Char('F'))),
            Some(DriverAction::ToggleView)
        );
    }

    #[test]
    fn test_intensity_keys() {
        assert_eq!(
            handle_key_event(KeyEvent::from(KeyCode::Char('+'))),
            Some(DriverAction::IntensityUp)
        );
        assert_eq!(
            handle_key_event(KeyEvent::from(KeyCode::Char('='))),
            Some(DriverAction::IntensityUp)
        );
        assert_eq!(
            handle_key_event(KeyEvent::from(KeyCode::Down)),
            Some(DriverAction::IntensityDown)
        );
    }

    #[test]
    fn test_pause_keys() {
        assert_eq!(
            handle_key_event(KeyEvent::from(KeyCode::Char(' '))),
            Some(DriverAction::Pause)
        );
        assert_eq!(
            handle_key_event(KeyEvent::from(KeyCode::Char('P'))),
            Some(DriverAction::Pause)
        );
    }

    #[test]
    fn test_unmapped_key() {
        assert_eq!(handle_key_event(KeyEvent::from(KeyCode::Char('x'))), None);
    }

    #[test]
    fn test_quit_keys() {
        assert!(should_quit(KeyEvent::from(KeyCode::Char('q'))));
        assert!(should_quit(KeyEvent::from(KeyCode::Esc)));
        assert!(should_quit(KeyEvent::new(
            KeyCode::Char('c'),
            KeyModifiers::CONTROL
        )));
        assert!(!should_quit(KeyEvent::from(KeyCode::Char('c'))));
    }
}
