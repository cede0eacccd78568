//! Renderer lifecycle

use crate::core::error::Error;
use crate::core::types::Result;

/// Lifecycle of a [`Renderer`](super::renderer::Renderer)
///
/// `Uninitialized → Initializing → Ready → Updating → Submitted → Ready …`.
/// `Failed` can be entered from anywhere and is terminal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RendererState {
    #[default]
    Uninitialized,
    /// Building BLAS data, laying out buffers and compiling pipelines
    Initializing,
    /// Idle between frames
    Ready,
    /// Rebuilding the TLAS and writing per-frame data
    Updating,
    /// Command buffers handed to the queue
    Submitted,
    Failed,
}

impl RendererState {
    /// Whether `self → to` is a legal transition
    pub fn can_transition(self, to: RendererState) -> bool {
        use RendererState::*;
        matches!(
            (self, to),
            (Uninitialized, Initializing)
                | (Initializing, Ready)
                | (Ready, Updating)
                | (Updating, Submitted)
                | (Submitted, Ready)
                // A failed frame leaves the renderer usable for the next one
                | (Updating, Ready)
        ) || (to == Failed && self != Failed)
    }

    /// Move to `to`, rejecting illegal transitions
    pub fn transition(&mut self, to: RendererState) -> Result<()> {
        if !self.can_transition(to) {
            return Err(Error::InvalidState { from: *self, to });
        }
        log::trace!("Renderer state {:?} -> {:?}", self, to);
        *self = to;
        Ok(())
    }

    pub fn is_ready(self) -> bool {
        self == RendererState::Ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_cycle() {
        let mut state = RendererState::default();
        for next in [
            RendererState::Initializing,
            RendererState::Ready,
            RendererState::Updating,
            RendererState::Submitted,
            RendererState::Ready,
            RendererState::Updating,
        ] {
            state.transition(next).unwrap();
        }
        assert_eq!(state, RendererState::Updating);
    }

    #[test]
    fn test_illegal_transition_rejected() {
        let mut state = RendererState::Uninitialized;
        let err = state.transition(RendererState::Updating).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidState { from: RendererState::Uninitialized, to: RendererState::Updating }
        ));
        assert_eq!(state, RendererState::Uninitialized);

        let mut state = RendererState::Ready;
        assert!(state.transition(RendererState::Submitted).is_err());
    }

    #[test]
    fn test_failed_reachable_and_terminal() {
        for start in [
            RendererState::Uninitialized,
            RendererState::Initializing,
            RendererState::Ready,
            RendererState::Updating,
            RendererState::Submitted,
        ] {
            let mut state = start;
            state.transition(RendererState::Failed).unwrap();
            assert!(state.transition(RendererState::Ready).is_err());
            assert!(state.transition(RendererState::Failed).is_err());
        }
    }
}
