// Tiltwatch - Escalation State Machine
//
// Tracks whether a tilt episode is open and whether it has escalated to the
// terminal Latched state. All transitions go through `transition`, a pure
// function of (phase, event); the evaluator applies the timer commands it
// returns.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::events::TiltStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// No tilt episode open; the escalation timer is cleared.
    #[default]
    Idle,
    /// A tilt episode is open and the escalation timer is counting.
    Open,
    /// Tilt outlasted the deadline. Terminal.
    Latched,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A fresh reading was classified.
    Classified(TiltStatus),
    /// The deadline notification was consumed; carries the tilt status held
    /// on the cycle that observed it.
    Deadline(TiltStatus),
}

/// Side effect the caller must apply to the escalation timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCommand {
    Enable,
    Clear,
}

pub fn transition(phase: Phase, event: Event) -> (Phase, Option<TimerCommand>) {
    use self::Event::*;
    use crate::events::TiltStatus::*;

    match (phase, event) {
        (Phase::Latched, _) => (Phase::Latched, None),

        (Phase::Idle, Classified(Tilted)) => (Phase::Open, Some(TimerCommand::Enable)),
        (Phase::Idle, Classified(Level)) => (Phase::Idle, None),
        // The timer is only ever armed while open; a stray notification is dropped.
        (Phase::Idle, Deadline(_)) => (Phase::Idle, None),

        // Already counting: no re-arm, whatever the reading says.
        (Phase::Open, Classified(_)) => (Phase::Open, None),
        (Phase::Open, Deadline(Level)) => (Phase::Idle, Some(TimerCommand::Clear)),
        (Phase::Open, Deadline(Tilted)) => (Phase::Latched, None),
    }
}

/// Escalation state owned by the evaluator.
#[derive(Debug, Default)]
pub struct Escalation {
    phase: Phase,
}

impl Escalation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// True while a tilt episode is open (the "has tilted" warning).
    pub fn has_tilted(&self) -> bool {
        self.phase == Phase::Open
    }

    pub fn is_latched(&self) -> bool {
        self.phase == Phase::Latched
    }

    /// Apply `event` and return the timer command it requires.
    pub fn apply(&mut self, event: Event) -> Option<TimerCommand> {
        let (next, command) = transition(self.phase, event);
        if next != self.phase {
            match next {
                Phase::Open => log::info!("Tilt episode opened, escalation timer armed"),
                Phase::Idle => log::info!("Level at deadline, tilt episode closed"),
                Phase::Latched => log::error!("Tilt persisted through deadline, CRITICAL latched"),
            }
        } else if matches!(event, Event::Deadline(_)) && next == Phase::Idle {
            log::warn!("Deadline notification with no open tilt episode, ignored");
        }
        self.phase = next;
        command
    }
}

// ---------------------------------------------------------------------------
// Alarm latch shared with the sampler
// ---------------------------------------------------------------------------

/// Set once by the evaluator when Critical latches; the sampler polls it to
/// stop producing.
#[derive(Debug, Clone, Default)]
pub struct AlarmLatch(Arc<AtomicBool>);

impl AlarmLatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    use crate::events::TiltStatus::{Level, Tilted};

    #[test]
    fn first_tilt_opens_episode_and_arms_timer() {
        assert_eq!(
            transition(Phase::Idle, Event::Classified(Tilted)),
            (Phase::Open, Some(TimerCommand::Enable))
        );
    }

    #[test]
    fn level_while_idle_changes_nothing() {
        assert_eq!(transition(Phase::Idle, Event::Classified(Level)), (Phase::Idle, None));
    }

    #[test]
    fn open_episode_never_rearms() {
        assert_eq!(transition(Phase::Open, Event::Classified(Tilted)), (Phase::Open, None));
        assert_eq!(transition(Phase::Open, Event::Classified(Level)), (Phase::Open, None));
    }

    #[test]
    fn deadline_while_level_closes_episode() {
        assert_eq!(
            transition(Phase::Open, Event::Deadline(Level)),
            (Phase::Idle, Some(TimerCommand::Clear))
        );
    }

    #[test]
    fn deadline_while_tilted_latches() {
        assert_eq!(transition(Phase::Open, Event::Deadline(Tilted)), (Phase::Latched, None));
    }

    #[test]
    fn stray_deadline_while_idle_is_ignored() {
        assert_eq!(transition(Phase::Idle, Event::Deadline(Tilted)), (Phase::Idle, None));
    }

    #[test]
    fn escalation_tracks_has_tilted() {
        let mut escalation = Escalation::new();
        assert!(!escalation.has_tilted());
        assert_eq!(escalation.apply(Event::Classified(Tilted)), Some(TimerCommand::Enable));
        assert!(escalation.has_tilted());
        assert_eq!(escalation.apply(Event::Classified(Level)), None);
        assert!(escalation.has_tilted());
        assert_eq!(escalation.apply(Event::Deadline(Level)), Some(TimerCommand::Clear));
        assert!(!escalation.has_tilted());
        assert_eq!(escalation.apply(Event::Classified(Tilted)), Some(TimerCommand::Enable));
    }

    #[test]
    fn alarm_latch_is_shared_between_clones() {
        let latch = AlarmLatch::new();
        let observer = latch.clone();
        assert!(!observer.is_set());
        latch.set();
        assert!(observer.is_set());
    }

    fn event_strategy() -> impl Strategy<Value = Event> {
        let tilt = prop_oneof![Just(Level), Just(Tilted)];
        prop_oneof![
            tilt.clone().prop_map(Event::Classified),
            tilt.prop_map(Event::Deadline),
        ]
    }

    proptest! {
        #[test]
        fn latched_is_terminal(events in prop::collection::vec(event_strategy(), 0..200)) {
            let mut phase = Phase::Latched;
            for event in events {
                let (next, command) = transition(phase, event);
                prop_assert_eq!(next, Phase::Latched);
                prop_assert_eq!(command, None);
                phase = next;
            }
        }

        #[test]
        fn timer_enabled_only_when_leaving_idle(
            events in prop::collection::vec(event_strategy(), 0..200),
        ) {
            let mut phase = Phase::Idle;
            for event in events {
                let (next, command) = transition(phase, event);
                if command == Some(TimerCommand::Enable) {
                    prop_assert_eq!(phase, Phase::Idle);
                    prop_assert_eq!(next, Phase::Open);
                }
                phase = next;
            }
        }
    }
}
