// Tiltwatch - Evaluator Task
//
// Consumes readings from the handoff queue, classifies them, drives the
// escalation state machine and its timer, and renders the LED matrix.
// Overlapping indications are time-multiplexed over a 3-phase frame counter:
//   phase 0: top/bottom warning rows   (episode open)
//   phase 1: left/right warning sides  (episode open)
//   phase 2: centre LED                (tilted right now)

use std::time::{Duration, Instant};

use crate::config::{MonitorConfig, INDICATOR_PHASES};
use crate::drivers::IndicatorSink;
use crate::error::DriverError;
use crate::escalation::{AlarmLatch, Escalation, Event, Phase, TimerCommand};
use crate::events::{Pattern, Reading, TiltStatus};
use crate::handoff::{Disconnected, Receiver};
use crate::timer::{DeadlineFlag, EscalationTimer};

const WARNING_EDGES_PHASE: u8 = 0;
const WARNING_SIDES_PHASE: u8 = 1;
const CURRENT_TILT_PHASE: u8 = 2;

/// Rotating counter choosing which indication a cycle renders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameSelector {
    phase: u8,
}

impl FrameSelector {
    pub fn phase(&self) -> u8 {
        self.phase
    }

    pub fn advance(&mut self) {
        self.phase = (self.phase + 1) % INDICATOR_PHASES;
    }
}

/// Outcome of one evaluation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cycle {
    Evaluated(TiltStatus),
    Latched,
}

pub struct Evaluator<T, S> {
    threshold: u32,
    escalation: Escalation,
    tilt: TiltStatus,
    selector: FrameSelector,
    deadline: DeadlineFlag,
    timer: T,
    indicator: S,
}

impl<T: EscalationTimer, S: IndicatorSink> Evaluator<T, S> {
    /// `deadline` must be the flag `timer` raises when it expires.
    pub fn new(config: &MonitorConfig, deadline: DeadlineFlag, timer: T, indicator: S) -> Self {
        Self {
            threshold: config.tilt_threshold,
            escalation: Escalation::new(),
            tilt: TiltStatus::Level,
            selector: FrameSelector::default(),
            deadline,
            timer,
            indicator,
        }
    }

    pub fn phase(&self) -> Phase {
        self.escalation.phase()
    }

    pub fn tilt(&self) -> TiltStatus {
        self.tilt
    }

    pub fn selector(&self) -> FrameSelector {
        self.selector
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn indicator(&self) -> &S {
        &self.indicator
    }

    /// One full cycle: deadline check, then a blocking read and evaluation.
    pub fn cycle(&mut self, rx: &Receiver<Reading>) -> Result<Cycle, Disconnected> {
        if self.poll_deadline() == Phase::Latched {
            return Ok(Cycle::Latched);
        }
        let reading = rx.recv()?;
        Ok(Cycle::Evaluated(self.evaluate(reading)))
    }

    /// Consume a pending deadline notification against the tilt status held
    /// for this cycle. Renders the alarm on the cycle that latches.
    pub fn poll_deadline(&mut self) -> Phase {
        if self.deadline.take() {
            let command = self.escalation.apply(Event::Deadline(self.tilt));
            self.run(command);
            if self.escalation.is_latched() {
                self.render(|s| s.put_pattern(Pattern::ALARM));
            }
        }
        self.escalation.phase()
    }

    /// Classify `reading`, open an episode on the first tilt, and render this
    /// cycle's frame. A latched evaluator ignores further readings.
    pub fn evaluate(&mut self, reading: Reading) -> TiltStatus {
        if self.escalation.is_latched() {
            return self.tilt;
        }

        log::debug!("X = {} Y = {} Z = {}", reading.x, reading.y, reading.z);

        let tilt = reading.classify(self.threshold);
        self.tilt = tilt;
        let command = self.escalation.apply(Event::Classified(tilt));
        self.run(command);

        match tilt {
            TiltStatus::Tilted if self.selector.phase() == CURRENT_TILT_PHASE => {
                self.render(|s| s.put_pattern(Pattern::CURRENT_TILT));
            }
            TiltStatus::Tilted => {}
            TiltStatus::Level => self.render(|s| s.all_off()),
        }

        if self.escalation.has_tilted() {
            match self.selector.phase() {
                WARNING_EDGES_PHASE => self.render(|s| s.put_pattern(Pattern::WARNING_EDGES)),
                WARNING_SIDES_PHASE => self.render(|s| s.put_pattern(Pattern::WARNING_SIDES)),
                _ => {}
            }
        }

        self.selector.advance();
        tilt
    }

    fn run(&mut self, command: Option<TimerCommand>) {
        match command {
            Some(TimerCommand::Enable) => self.timer.enable(),
            Some(TimerCommand::Clear) => self.timer.clear(),
            None => {}
        }
    }

    fn render(&mut self, draw: impl FnOnce(&mut S) -> Result<(), DriverError>) {
        if let Err(e) = draw(&mut self.indicator) {
            log::warn!("LED matrix error: {}", e);
        }
    }
}

/// Runs until the alarm latches or the sampler hangs up, then hands the
/// evaluator back.
pub fn evaluator_task<T: EscalationTimer, S: IndicatorSink>(
    mut evaluator: Evaluator<T, S>,
    rx: Receiver<Reading>,
    latch: AlarmLatch,
    interval: Duration,
) -> Evaluator<T, S> {
    log::info!("Evaluator task started ({:?} period)", interval);

    let mut worst_cycle = Duration::ZERO;

    loop {
        let tick_start = Instant::now();

        match evaluator.cycle(&rx) {
            Ok(Cycle::Evaluated(_)) => {}
            Ok(Cycle::Latched) => {
                latch.set();
                log::error!("CRITICAL tilt alarm latched, evaluator stopped");
                break;
            }
            Err(Disconnected) => {
                log::warn!("Handoff channel closed, exiting evaluator task");
                break;
            }
        }

        let elapsed = super::sleep_remainder(tick_start, interval);
        if elapsed > worst_cycle {
            worst_cycle = elapsed;
            log::debug!("New worst-case evaluation cycle: {:?}", worst_cycle);
        }
    }

    evaluator
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::ManualTimer;
    use crate::handoff;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Shown {
        Pattern(Pattern),
        Off,
    }

    #[derive(Default)]
    struct Recorder {
        log: Vec<Shown>,
    }

    impl IndicatorSink for Recorder {
        fn probe(&mut self) -> Result<(), DriverError> {
            Ok(())
        }

        fn put_pattern(&mut self, pattern: Pattern) -> Result<(), DriverError> {
            self.log.push(Shown::Pattern(pattern));
            Ok(())
        }

        fn all_off(&mut self) -> Result<(), DriverError> {
            self.log.push(Shown::Off);
            Ok(())
        }
    }

    const LEVEL: Reading = Reading::new(0, 0, 0);
    const TILTED: Reading = Reading::new(600, 0, 0);

    fn evaluator() -> (Evaluator<ManualTimer, Recorder>, ManualTimer, DeadlineFlag) {
        let config = MonitorConfig::default();
        let flag = DeadlineFlag::new();
        let timer = ManualTimer::new(config.escalation_deadline, flag.clone());
        let evaluator = Evaluator::new(&config, flag.clone(), timer.clone(), Recorder::default());
        (evaluator, timer, flag)
    }

    #[test]
    fn selector_wraps_after_three_phases() {
        let mut selector = FrameSelector::default();
        let phases: Vec<u8> = (0..7)
            .map(|_| {
                let p = selector.phase();
                selector.advance();
                p
            })
            .collect();
        assert_eq!(phases, vec![0, 1, 2, 0, 1, 2, 0]);
    }

    #[test]
    fn level_readings_blank_the_matrix_and_stay_idle() {
        let (mut ev, timer, _) = evaluator();
        for _ in 0..10 {
            assert_eq!(ev.evaluate(LEVEL), TiltStatus::Level);
        }
        assert_eq!(ev.phase(), Phase::Idle);
        assert_eq!(timer.arm_count(), 0);
        assert!(ev.indicator().log.iter().all(|s| *s == Shown::Off));
        assert_eq!(ev.indicator().log.len(), 10);
    }

    #[test]
    fn tilt_frames_are_multiplexed_over_three_phases() {
        let (mut ev, timer, _) = evaluator();
        for _ in 0..3 {
            ev.evaluate(TILTED);
        }
        assert_eq!(timer.arm_count(), 1);
        assert_eq!(
            ev.indicator().log,
            vec![
                Shown::Pattern(Pattern::WARNING_EDGES),
                Shown::Pattern(Pattern::WARNING_SIDES),
                Shown::Pattern(Pattern::CURRENT_TILT),
            ]
        );
    }

    #[test]
    fn level_during_open_episode_keeps_warning_but_clears_tilt() {
        let (mut ev, _, _) = evaluator();
        ev.evaluate(TILTED); // phase 0
        ev.evaluate(LEVEL); // phase 1
        ev.evaluate(LEVEL); // phase 2
        assert_eq!(ev.phase(), Phase::Open);
        assert_eq!(
            ev.indicator().log,
            vec![
                Shown::Pattern(Pattern::WARNING_EDGES),
                Shown::Off,
                Shown::Pattern(Pattern::WARNING_SIDES),
                Shown::Off,
            ]
        );
    }

    #[test]
    fn deadline_uses_the_tilt_held_for_the_cycle() {
        let (mut ev, timer, _) = evaluator();
        ev.evaluate(TILTED);
        timer.advance(Duration::from_millis(5000));
        // Latest classification is Tilted.
        assert_eq!(ev.poll_deadline(), Phase::Latched);
        assert_eq!(ev.indicator().log.last(), Some(&Shown::Pattern(Pattern::ALARM)));
    }

    #[test]
    fn level_at_deadline_recovers_and_rearms_later() {
        let (mut ev, timer, flag) = evaluator();
        ev.evaluate(TILTED);
        timer.advance(Duration::from_millis(2000));
        ev.evaluate(LEVEL);
        timer.advance(Duration::from_millis(3000));
        assert!(flag.is_raised());

        assert_eq!(ev.poll_deadline(), Phase::Idle);
        assert!(!flag.is_raised());
        assert!(!timer.is_armed());

        ev.evaluate(TILTED);
        assert_eq!(ev.phase(), Phase::Open);
        assert_eq!(timer.arm_count(), 2);
    }

    #[test]
    fn latched_evaluator_ignores_readings() {
        let (mut ev, timer, _) = evaluator();
        ev.evaluate(TILTED);
        timer.advance(Duration::from_secs(5));
        ev.poll_deadline();
        let rendered = ev.indicator().log.len();

        for _ in 0..5 {
            ev.evaluate(LEVEL);
            assert_eq!(ev.poll_deadline(), Phase::Latched);
        }
        assert_eq!(ev.indicator().log.len(), rendered);
    }

    #[test]
    fn cycle_reports_disconnect() {
        let (mut ev, _, _) = evaluator();
        let (tx, rx) = handoff::channel();
        tx.send(LEVEL).unwrap();
        drop(tx);
        assert_eq!(ev.cycle(&rx), Ok(Cycle::Evaluated(TiltStatus::Level)));
        assert_eq!(ev.cycle(&rx), Err(Disconnected));
    }

    #[test]
    fn task_latches_and_sets_alarm_latch() {
        let (ev, timer, _) = evaluator();
        let (tx, rx) = handoff::channel();
        let latch = AlarmLatch::new();

        tx.send(TILTED).unwrap();
        let worker_latch = latch.clone();
        let handle = std::thread::spawn(move || {
            evaluator_task(ev, rx, worker_latch, Duration::from_millis(1))
        });

        // Wait for the episode to open, then fire the deadline.
        while timer.arm_count() == 0 {
            std::thread::sleep(Duration::from_millis(1));
        }
        timer.advance(Duration::from_secs(5));
        // Unblock a pending recv so the next cycle sees the deadline. The
        // evaluator may already have latched and hung up.
        let _ = tx.send(TILTED);

        let ev = handle.join().unwrap();
        assert!(latch.is_set());
        assert_eq!(ev.phase(), Phase::Latched);
        let alarms = ev
            .indicator()
            .log
            .iter()
            .filter(|s| **s == Shown::Pattern(Pattern::ALARM))
            .count();
        assert_eq!(alarms, 1);
    }
}
