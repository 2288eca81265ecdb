// ============================================================================
// Activity State Management
// ============================================================================
//
// Implements the State Pattern for the activity lifecycle.
// Every record moves forward through the primary states below; the only
// backward edges are the resume paths out of PAUSED and STOPPED and a
// cancelled pause.
//
// Visibility is an orthogonal facet (`WindowFacet`): a record can be
// RESUMED while its window has not been drawn yet.
//
// ============================================================================

use serde::{Deserialize, Serialize};

/// Primary lifecycle state
///
/// State transitions:
/// ```text
/// Initializing ─> Launching ─> Resumed ⇄ Pausing ─> Paused ─> Stopping ─> Stopped
///                                 ^                    │                    │
///                                 └──── resume ────────┴────────────────────┘
///
/// any non-terminal state ──finish──> Finishing ──> Destroyed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityState {
    Initializing,
    Launching,
    Resumed,
    Pausing,
    Paused,
    Stopping,
    Stopped,
    Finishing,
    Destroyed,
}

impl ActivityState {
    /// Check if transition to next state is legal.
    pub fn can_transition_to(&self, next: ActivityState) -> bool {
        use ActivityState::*;
        match (self, next) {
            (Destroyed, _) => false,
            (Finishing, Destroyed) => true,
            (Finishing, _) => false,
            (_, Finishing) => true,
            _ => matches!(
                (self, next),
                (Initializing, Launching)
                    | (Launching, Resumed)
                    | (Resumed, Pausing)
                    | (Pausing, Paused)
                    | (Pausing, Resumed)
                    | (Paused, Resumed)
                    | (Paused, Stopping)
                    | (Stopping, Stopped)
                    | (Stopped, Resumed)
            ),
        }
    }

    /// Finish has been requested (or completed).
    pub fn is_finishing(&self) -> bool {
        matches!(self, ActivityState::Finishing | ActivityState::Destroyed)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ActivityState::Destroyed)
    }

    /// States from which a host acknowledgement can bring the record to RESUMED.
    pub fn can_resume(&self) -> bool {
        matches!(
            self,
            ActivityState::Launching | ActivityState::Paused | ActivityState::Stopped
        )
    }
}

impl std::fmt::Display for ActivityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ActivityState::Initializing => "INITIALIZING",
            ActivityState::Launching => "LAUNCHING",
            ActivityState::Resumed => "RESUMED",
            ActivityState::Pausing => "PAUSING",
            ActivityState::Paused => "PAUSED",
            ActivityState::Stopping => "STOPPING",
            ActivityState::Stopped => "STOPPED",
            ActivityState::Finishing => "FINISHING",
            ActivityState::Destroyed => "DESTROYED",
        };
        f.write_str(name)
    }
}

/// Window visibility facet.
///
/// Tracks the requested visibility (what the stack wants) together with the
/// reported one (what the window collaborator last said).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WindowFacet {
    /// Not requested, not drawn.
    Hidden,
    /// Requested; waiting for the window to report visible.
    #[default]
    Requested,
    /// Requested and reported visible.
    Shown,
    /// Hide requested while the window is still on screen.
    HidePending,
}

impl WindowFacet {
    /// The stack wants this window on screen.
    pub fn is_requested(&self) -> bool {
        matches!(self, WindowFacet::Requested | WindowFacet::Shown)
    }

    /// The window collaborator last reported it on screen.
    pub fn is_drawn(&self) -> bool {
        matches!(self, WindowFacet::Shown | WindowFacet::HidePending)
    }

    pub fn request_show(self) -> Self {
        if self.is_drawn() {
            WindowFacet::Shown
        } else {
            WindowFacet::Requested
        }
    }

    pub fn request_hide(self) -> Self {
        if self.is_drawn() {
            WindowFacet::HidePending
        } else {
            WindowFacet::Hidden
        }
    }

    pub fn drawn(self) -> Self {
        if self.is_requested() {
            WindowFacet::Shown
        } else {
            WindowFacet::HidePending
        }
    }

    pub fn gone(self) -> Self {
        if self.is_requested() {
            WindowFacet::Requested
        } else {
            WindowFacet::Hidden
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ActivityState::*;

    #[test]
    fn test_forward_path() {
        let path = [
            Initializing,
            Launching,
            Resumed,
            Pausing,
            Paused,
            Stopping,
            Stopped,
            Finishing,
            Destroyed,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_resume_edges() {
        assert!(Paused.can_transition_to(Resumed));
        assert!(Stopped.can_transition_to(Resumed));
        assert!(!Stopping.can_transition_to(Resumed));
        assert!(Pausing.can_transition_to(Resumed));
        assert!(Resumed.can_transition_to(Pausing));
        assert!(!Initializing.can_transition_to(Resumed));
    }

    #[test]
    fn test_finish_from_any_live_state() {
        for state in [Initializing, Launching, Resumed, Pausing, Paused, Stopping, Stopped] {
            assert!(state.can_transition_to(Finishing), "{} -> FINISHING", state);
            assert!(!state.can_transition_to(Destroyed), "{} -> DESTROYED", state);
        }
        assert!(!Finishing.can_transition_to(Finishing));
        assert!(!Destroyed.can_transition_to(Finishing));
        assert!(Destroyed.is_terminal());
        assert!(Finishing.is_finishing());
    }

    #[test]
    fn test_window_facet() {
        let facet = WindowFacet::default();
        assert!(facet.is_requested());
        assert!(!facet.is_drawn());

        let facet = facet.drawn();
        assert_eq!(facet, WindowFacet::Shown);

        let facet = facet.request_hide();
        assert_eq!(facet, WindowFacet::HidePending);
        assert!(!facet.is_requested());
        assert!(facet.is_drawn());

        let facet = facet.gone();
        assert_eq!(facet, WindowFacet::Hidden);
        assert_eq!(facet.request_show(), WindowFacet::Requested);
    }
}
