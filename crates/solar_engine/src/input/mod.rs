//! Input state queried by applications once per simulation tick

/// Keys the engine reports state for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum KeyCode {
    A, B, C, D, E, F, G, H, I, J, K, L, M,
    N, O, P, Q, R, S, T, U, V, W, X, Y, Z,
    Num0, Num1, Num2, Num3, Num4, Num5, Num6, Num7, Num8, Num9,
    Left,
    Right,
    Up,
    Down,
    Enter,
    Space,
    Escape,
}

impl KeyCode {
    /// Every key code, in declaration order
    pub const ALL: [KeyCode; 43] = [
        KeyCode::A, KeyCode::B, KeyCode::C, KeyCode::D, KeyCode::E, KeyCode::F, KeyCode::G,
        KeyCode::H, KeyCode::I, KeyCode::J, KeyCode::K, KeyCode::L, KeyCode::M, KeyCode::N,
        KeyCode::O, KeyCode::P, KeyCode::Q, KeyCode::R, KeyCode::S, KeyCode::T, KeyCode::U,
        KeyCode::V, KeyCode::W, KeyCode::X, KeyCode::Y, KeyCode::Z,
        KeyCode::Num0, KeyCode::Num1, KeyCode::Num2, KeyCode::Num3, KeyCode::Num4,
        KeyCode::Num5, KeyCode::Num6, KeyCode::Num7, KeyCode::Num8, KeyCode::Num9,
        KeyCode::Left, KeyCode::Right, KeyCode::Up, KeyCode::Down,
        KeyCode::Enter, KeyCode::Space, KeyCode::Escape,
    ];
}

/// Per-frame input snapshot provided by the windowing backend
pub trait InputState {
    /// Seconds elapsed since the previous frame
    fn frame_time(&self) -> f32;

    /// Whether `key` is currently held
    fn is_key_down(&self, key: KeyCode) -> bool;

    /// Cursor movement since the previous pump, in pixels
    fn mouse_delta(&self) -> (f32, f32);
}

/// Fixed input snapshot, handy for driving updates without a window
#[derive(Debug, Clone, Default)]
pub struct InputSnapshot {
    /// Frame time reported by [`InputState::frame_time`]
    pub frame_time: f32,
    /// Keys reported as held
    pub keys_down: Vec<KeyCode>,
    /// Cursor movement reported by [`InputState::mouse_delta`]
    pub mouse_delta: (f32, f32),
}

impl InputState for InputSnapshot {
    fn frame_time(&self) -> f32 {
        self.frame_time
    }

    fn is_key_down(&self, key: KeyCode) -> bool {
        self.keys_down.contains(&key)
    }

    fn mouse_delta(&self) -> (f32, f32) {
        self.mouse_delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_all_keys_unique() {
        let unique: HashSet<_> = KeyCode::ALL.iter().collect();
        assert_eq!(unique.len(), KeyCode::ALL.len());
    }

    #[test]
    fn test_snapshot_reports_keys() {
        let snapshot = InputSnapshot {
            frame_time: 0.016,
            keys_down: vec![KeyCode::W, KeyCode::Space],
            mouse_delta: (3.0, -1.0),
        };
        assert!(snapshot.is_key_down(KeyCode::W));
        assert!(!snapshot.is_key_down(KeyCode::S));
        assert_eq!(snapshot.mouse_delta(), (3.0, -1.0));
    }
}
