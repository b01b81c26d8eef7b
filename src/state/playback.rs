/// Playback state machine
///
/// Two states, one index. All transitions are total: an invalid command for
/// the current state (Resume while playing, ScrubTo while playing) leaves
/// the state unchanged rather than erroring.
///
/// Advancement is tick-driven. The frame at the current index is processed
/// when playback enters it (Play, Resume, or a tick stepping forward), so a
/// Stop between ticks always takes effect before the next frame.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle { index: usize },
    Playing { index: usize },
}

impl Default for PlaybackState {
    fn default() -> Self {
        PlaybackState::Idle { index: 0 }
    }
}

impl PlaybackState {
    pub fn index(self) -> usize {
        match self {
            PlaybackState::Idle { index } | PlaybackState::Playing { index } => index,
        }
    }

    pub fn is_playing(self) -> bool {
        matches!(self, PlaybackState::Playing { .. })
    }

    /// Start playback from the first frame, regardless of prior state
    pub fn play(self) -> Self {
        PlaybackState::Playing { index: 0 }
    }

    /// Continue playback from the current index. No effect while playing.
    pub fn resume(self) -> Self {
        match self {
            PlaybackState::Idle { index } => PlaybackState::Playing { index },
            playing => playing,
        }
    }

    /// Halt playback, preserving the index. No effect while idle.
    pub fn stop(self) -> Self {
        match self {
            PlaybackState::Playing { index } => PlaybackState::Idle { index },
            idle => idle,
        }
    }

    /// Back to the initial state (the session wipe is the caller's job)
    pub fn clear(self) -> Self {
        PlaybackState::Idle { index: 0 }
    }

    /// Manual scrub. Only valid while idle; ignored during playback.
    pub fn scrub_to(self, target: usize) -> Self {
        match self {
            PlaybackState::Idle { .. } => PlaybackState::Idle { index: target },
            playing => playing,
        }
    }

    /// One tick: step to the next frame, or settle at `Idle` on the last
    /// processed frame once the sequence is exhausted.
    pub fn advanced(self, last_index: usize) -> Self {
        match self {
            PlaybackState::Playing { index } if index < last_index => {
                PlaybackState::Playing { index: index + 1 }
            }
            PlaybackState::Playing { index } => PlaybackState::Idle {
                index: index.min(last_index),
            },
            idle => idle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_idle_zero() {
        assert_eq!(PlaybackState::default(), PlaybackState::Idle { index: 0 });
    }

    #[test]
    fn test_play_always_resets_to_zero() {
        assert_eq!(
            PlaybackState::Idle { index: 7 }.play(),
            PlaybackState::Playing { index: 0 }
        );
        assert_eq!(
            PlaybackState::Playing { index: 3 }.play(),
            PlaybackState::Playing { index: 0 }
        );
    }

    #[test]
    fn test_resume_continues_at_stopped_index() {
        let state = PlaybackState::Playing { index: 4 }.stop();
        assert_eq!(state, PlaybackState::Idle { index: 4 });
        assert_eq!(state.resume(), PlaybackState::Playing { index: 4 });
    }

    #[test]
    fn test_resume_while_playing_is_noop() {
        let state = PlaybackState::Playing { index: 2 };
        assert_eq!(state.resume(), state);
    }

    #[test]
    fn test_stop_while_idle_is_noop() {
        let state = PlaybackState::Idle { index: 2 };
        assert_eq!(state.stop(), state);
    }

    #[test]
    fn test_scrub_only_while_idle() {
        assert_eq!(
            PlaybackState::Idle { index: 1 }.scrub_to(5),
            PlaybackState::Idle { index: 5 }
        );
        assert_eq!(
            PlaybackState::Playing { index: 1 }.scrub_to(5),
            PlaybackState::Playing { index: 1 }
        );
    }

    #[test]
    fn test_clear_from_any_state() {
        assert_eq!(
            PlaybackState::Playing { index: 9 }.clear(),
            PlaybackState::Idle { index: 0 }
        );
        assert_eq!(
            PlaybackState::Idle { index: 9 }.clear(),
            PlaybackState::Idle { index: 0 }
        );
    }

    #[test]
    fn test_advanced_steps_then_settles_idle() {
        let mut state = PlaybackState::Playing { index: 0 };
        state = state.advanced(2);
        assert_eq!(state, PlaybackState::Playing { index: 1 });
        state = state.advanced(2);
        assert_eq!(state, PlaybackState::Playing { index: 2 });
        state = state.advanced(2);
        assert_eq!(state, PlaybackState::Idle { index: 2 });
    }

    #[test]
    fn test_advanced_while_idle_is_noop() {
        let state = PlaybackState::Idle { index: 1 };
        assert_eq!(state.advanced(5), state);
    }

    #[test]
    fn test_full_run_visits_indices_in_order() {
        let last = 4;
        let mut state = PlaybackState::default().play();
        let mut visited = vec![state.index()];

        while state.is_playing() {
            state = state.advanced(last);
            if state.is_playing() {
                visited.push(state.index());
            }
        }

        assert_eq!(visited, vec![0, 1, 2, 3, 4]);
        assert_eq!(state, PlaybackState::Idle { index: 4 });
    }
}
