use crate::input::Cycle;
use crt_core::{Measurement, PointerEvent, TargetLayout, TrialConfig, TrialOutcome, TrialPhase};
use std::time::Duration;

/// Trial state with the timestamps each phase needs.
#[derive(Debug, Clone, PartialEq)]
pub enum TrialState {
    WaitHome,
    Delay {
        deadline: Duration,
    },
    Illuminated {
        rt_start: Duration,
        mt_start: Option<Duration>,
    },
    Feedback {
        measurement: Measurement,
        until: Duration,
    },
    Aborted {
        until: Duration,
    },
    Done(TrialOutcome),
}

impl TrialState {
    pub fn phase(&self) -> TrialPhase {
        match self {
            TrialState::WaitHome => TrialPhase::WaitHome,
            TrialState::Delay { .. } => TrialPhase::Delay,
            TrialState::Illuminated { .. } => TrialPhase::Illuminated,
            TrialState::Feedback { .. } => TrialPhase::Feedback,
            TrialState::Aborted { .. } => TrialPhase::Aborted,
            TrialState::Done(_) => TrialPhase::Done,
        }
    }
}

/// Side effects the session has to carry out after a transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrialEffect {
    /// The selected target was acquired; persist the measurement.
    Completed(Measurement),
    /// The pointer left home during the delay; nothing is persisted.
    Aborted,
    /// Dwell screens are over, the next slot may start.
    Finished(TrialOutcome),
    /// Stop everything immediately.
    Quit,
}

/// Read-only inputs shared by every transition of one trial.
#[derive(Debug, Clone, Copy)]
pub struct TrialContext<'a> {
    pub layout: &'a TargetLayout,
    pub trial: TrialConfig,
    pub feedback_dwell: Duration,
    pub abort_dwell: Duration,
}

/// Pure transition function: one cycle in, the next state and at most one
/// effect out.
///
/// Events are walked in arrival order, but the phase only changes after the
/// whole batch has been looked at. A quit anywhere in the batch wins over
/// everything else in it.
pub fn transition(
    state: &TrialState,
    cycle: &Cycle,
    ctx: &TrialContext<'_>,
) -> (TrialState, Option<TrialEffect>) {
    if cycle.has_quit() {
        return (state.clone(), Some(TrialEffect::Quit));
    }

    let layout = ctx.layout;
    match *state {
        TrialState::WaitHome => {
            if layout.is_inside_home(cycle.pointer) {
                let deadline = cycle.now + ctx.trial.delay_duration;
                (TrialState::Delay { deadline }, None)
            } else {
                (TrialState::WaitHome, None)
            }
        }
        TrialState::Delay { deadline } => {
            let left_in_batch = cycle.events.iter().any(|e| match e {
                PointerEvent::Move { pos, at } => *at < deadline && layout.is_outside_home(*pos),
                _ => false,
            });
            let outside_now = cycle.now < deadline && layout.is_outside_home(cycle.pointer);
            if left_in_batch || outside_now {
                let until = cycle.now + ctx.abort_dwell;
                (TrialState::Aborted { until }, Some(TrialEffect::Aborted))
            } else if cycle.now >= deadline {
                let next = TrialState::Illuminated {
                    rt_start: cycle.now,
                    mt_start: None,
                };
                (next, None)
            } else {
                (TrialState::Delay { deadline }, None)
            }
        }
        TrialState::Illuminated { rt_start, mt_start } => {
            illuminated(rt_start, mt_start, cycle, ctx)
        }
        TrialState::Feedback { measurement, until } => {
            if cycle.now >= until {
                let outcome = TrialOutcome::Completed(measurement);
                (
                    TrialState::Done(outcome),
                    Some(TrialEffect::Finished(outcome)),
                )
            } else {
                (TrialState::Feedback { measurement, until }, None)
            }
        }
        TrialState::Aborted { until } => {
            if cycle.now >= until {
                (
                    TrialState::Done(TrialOutcome::Aborted),
                    Some(TrialEffect::Finished(TrialOutcome::Aborted)),
                )
            } else {
                (TrialState::Aborted { until }, None)
            }
        }
        TrialState::Done(outcome) => (TrialState::Done(outcome), None),
    }
}

fn illuminated(
    rt_start: Duration,
    mut mt_start: Option<Duration>,
    cycle: &Cycle,
    ctx: &TrialContext<'_>,
) -> (TrialState, Option<TrialEffect>) {
    let layout = ctx.layout;
    let selected = ctx.trial.selected_target_index;
    let mut pressed_at = None;

    for event in &cycle.events {
        match *event {
            PointerEvent::Move { pos, at } if mt_start.is_none() && layout.is_outside_home(pos) => {
                // Events stamped before the illumination tick still count from it.
                mt_start = Some(at.max(rt_start));
            }
            PointerEvent::Press { pos, at } if layout.hits_target(selected, pos) => {
                pressed_at = Some(at.max(rt_start));
                break;
            }
            _ => {}
        }
    }

    let Some(pressed_at) = pressed_at else {
        return (TrialState::Illuminated { rt_start, mt_start }, None);
    };

    let measurement = match mt_start {
        Some(left_home) => Measurement {
            reaction_time: left_home - rt_start,
            movement_time: Some(pressed_at.saturating_sub(left_home)),
            target_index: selected,
        },
        // No departure was sampled: the whole response counts as reaction
        // time and movement time stays missing.
        None => Measurement {
            reaction_time: pressed_at - rt_start,
            movement_time: None,
            target_index: selected,
        },
    };
    let until = cycle.now + ctx.feedback_dwell;
    (
        TrialState::Feedback { measurement, until },
        Some(TrialEffect::Completed(measurement)),
    )
}

/// One trial's state plus the outcome it produced, if any.
#[derive(Debug, Clone)]
pub struct TrialStateMachine {
    number: usize,
    config: TrialConfig,
    state: TrialState,
    outcome: Option<TrialOutcome>,
}

impl TrialStateMachine {
    pub fn new(number: usize, config: TrialConfig) -> Self {
        Self {
            number,
            config,
            state: TrialState::WaitHome,
            outcome: None,
        }
    }

    pub fn number(&self) -> usize {
        self.number
    }

    pub fn config(&self) -> &TrialConfig {
        &self.config
    }

    pub fn state(&self) -> &TrialState {
        &self.state
    }

    pub fn phase(&self) -> TrialPhase {
        self.state.phase()
    }

    pub fn outcome(&self) -> Option<&TrialOutcome> {
        self.outcome.as_ref()
    }

    pub fn is_done(&self) -> bool {
        self.phase().is_terminal()
    }

    /// Applies one cycle and logs phase changes.
    pub fn step(
        &mut self,
        cycle: &Cycle,
        layout: &TargetLayout,
        feedback_dwell: Duration,
        abort_dwell: Duration,
    ) -> Option<TrialEffect> {
        let ctx = TrialContext {
            layout,
            trial: self.config,
            feedback_dwell,
            abort_dwell,
        };
        let before = self.phase();
        let (next, effect) = transition(&self.state, cycle, &ctx);
        self.state = next;

        match effect {
            Some(TrialEffect::Completed(m)) => {
                self.set_outcome(TrialOutcome::Completed(m));
                tracing::info!(
                    trial = self.number,
                    target = m.target_index,
                    rt_ms = m.reaction_time_ms(),
                    mt_ms = ?m.movement_time_ms(),
                    "target acquired"
                );
                if m.movement_time.is_none() {
                    tracing::warn!(
                        trial = self.number,
                        "target pressed without a recorded departure from home; movement time missing"
                    );
                }
            }
            Some(TrialEffect::Aborted) => {
                self.set_outcome(TrialOutcome::Aborted);
                tracing::info!(trial = self.number, "left home during delay, trial aborted");
            }
            _ => {}
        }

        let after = self.phase();
        if before != after {
            match &self.state {
                TrialState::Delay { deadline } => tracing::debug!(
                    trial = self.number,
                    delay_ms = self.config.delay_duration.as_millis() as u64,
                    deadline_ms = deadline.as_millis() as u64,
                    "pointer at home, delay started"
                ),
                TrialState::Illuminated { rt_start, .. } => tracing::debug!(
                    trial = self.number,
                    target = self.config.selected_target_index,
                    at_ms = rt_start.as_secs_f64() * 1000.0,
                    "target illuminated"
                ),
                _ => tracing::trace!(trial = self.number, from = ?before, to = ?after, "phase change"),
            }
        }
        effect
    }

    fn set_outcome(&mut self, outcome: TrialOutcome) {
        debug_assert!(self.outcome.is_none(), "trial {} produced two outcomes", self.number);
        self.outcome.get_or_insert(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crt_core::Point;

    const HOME: Point = Point::new(0.0, 0.0);

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn layout() -> TargetLayout {
        TargetLayout::new(HOME, 50.0, 50.0, 300.0, 4)
    }

    fn ctx(layout: &TargetLayout) -> TrialContext<'_> {
        TrialContext {
            layout,
            trial: TrialConfig {
                selected_target_index: 0,
                delay_duration: ms(1000),
            },
            feedback_dwell: ms(1000),
            abort_dwell: ms(1000),
        }
    }

    fn mv(x: f32, y: f32, at: Duration) -> PointerEvent {
        PointerEvent::Move {
            pos: Point::new(x, y),
            at,
        }
    }

    fn press(x: f32, y: f32, at: Duration) -> PointerEvent {
        PointerEvent::Press {
            pos: Point::new(x, y),
            at,
        }
    }

    #[test]
    fn wait_home_blocks_until_pointer_inside() {
        let layout = layout();
        let ctx = ctx(&layout);
        let far = Point::new(200.0, 0.0);
        let (s, e) = transition(&TrialState::WaitHome, &Cycle::idle(ms(5), far), &ctx);
        assert_eq!((s, e), (TrialState::WaitHome, None));

        // the rim does not count as inside
        let rim = Point::new(50.0, 0.0);
        let (s, _) = transition(&TrialState::WaitHome, &Cycle::idle(ms(6), rim), &ctx);
        assert_eq!(s, TrialState::WaitHome);

        let (s, e) = transition(&TrialState::WaitHome, &Cycle::idle(ms(10), HOME), &ctx);
        assert_eq!(s, TrialState::Delay { deadline: ms(1010) });
        assert_eq!(e, None);
    }

    #[test]
    fn leaving_home_during_delay_aborts() {
        let layout = layout();
        let ctx = ctx(&layout);
        let delay = TrialState::Delay { deadline: ms(1000) };

        let (s, e) = transition(&delay, &Cycle::idle(ms(500), Point::new(60.0, 0.0)), &ctx);
        assert_eq!(s, TrialState::Aborted { until: ms(1500) });
        assert_eq!(e, Some(TrialEffect::Aborted));
    }

    #[test]
    fn brief_excursion_in_batch_aborts_even_if_back_home() {
        let layout = layout();
        let ctx = ctx(&layout);
        let delay = TrialState::Delay { deadline: ms(1000) };
        let cycle = Cycle::new(
            ms(520),
            HOME,
            vec![mv(70.0, 0.0, ms(505)), mv(0.0, 0.0, ms(515))],
        );
        let (s, e) = transition(&delay, &cycle, &ctx);
        assert_eq!(s.phase(), TrialPhase::Aborted);
        assert_eq!(e, Some(TrialEffect::Aborted));
    }

    #[test]
    fn movement_on_the_rim_does_not_abort() {
        let layout = layout();
        let ctx = ctx(&layout);
        let delay = TrialState::Delay { deadline: ms(1000) };
        let cycle = Cycle::new(ms(300), Point::new(0.0, 50.0), vec![mv(0.0, 50.0, ms(299))]);
        let (s, e) = transition(&delay, &cycle, &ctx);
        assert_eq!(s, delay);
        assert_eq!(e, None);
    }

    #[test]
    fn delay_elapsing_at_home_illuminates() {
        let layout = layout();
        let ctx = ctx(&layout);
        let delay = TrialState::Delay { deadline: ms(1000) };
        let (s, e) = transition(&delay, &Cycle::idle(ms(999), HOME), &ctx);
        assert_eq!(s, delay);
        assert_eq!(e, None);

        let (s, e) = transition(&delay, &Cycle::idle(ms(1003), HOME), &ctx);
        assert_eq!(
            s,
            TrialState::Illuminated {
                rt_start: ms(1003),
                mt_start: None
            }
        );
        assert_eq!(e, None);
    }

    #[test]
    fn departure_after_deadline_still_illuminates() {
        let layout = layout();
        let ctx = ctx(&layout);
        let delay = TrialState::Delay { deadline: ms(1000) };
        let cycle = Cycle::new(ms(1010), Point::new(80.0, 0.0), vec![mv(80.0, 0.0, ms(1005))]);
        let (s, e) = transition(&delay, &cycle, &ctx);
        assert_eq!(s.phase(), TrialPhase::Illuminated);
        assert_eq!(e, None);
    }

    #[test]
    fn reaction_and_movement_times_from_event_stamps() {
        let layout = layout();
        let ctx = ctx(&layout);
        let lit = TrialState::Illuminated {
            rt_start: ms(2000),
            mt_start: None,
        };

        let cycle = Cycle::new(ms(2201), Point::new(60.0, 0.0), vec![mv(60.0, 0.0, ms(2200))]);
        let (s, e) = transition(&lit, &cycle, &ctx);
        assert_eq!(
            s,
            TrialState::Illuminated {
                rt_start: ms(2000),
                mt_start: Some(ms(2200))
            }
        );
        assert_eq!(e, None);

        let cycle = Cycle::new(ms(2501), Point::new(300.0, 0.0), vec![press(300.0, 0.0, ms(2500))]);
        let (s, e) = transition(&s, &cycle, &ctx);
        let expected = Measurement {
            reaction_time: ms(200),
            movement_time: Some(ms(300)),
            target_index: 0,
        };
        assert_eq!(
            s,
            TrialState::Feedback {
                measurement: expected,
                until: ms(3501)
            }
        );
        assert_eq!(e, Some(TrialEffect::Completed(expected)));
    }

    #[test]
    fn only_first_departure_sets_reaction_time() {
        let layout = layout();
        let ctx = ctx(&layout);
        let lit = TrialState::Illuminated {
            rt_start: ms(0),
            mt_start: None,
        };
        let cycle = Cycle::new(
            ms(400),
            Point::new(150.0, 0.0),
            vec![
                mv(20.0, 0.0, ms(100)),
                mv(55.0, 0.0, ms(180)),
                mv(0.0, 0.0, ms(250)),
                mv(150.0, 0.0, ms(390)),
            ],
        );
        let (s, _) = transition(&lit, &cycle, &ctx);
        assert_eq!(
            s,
            TrialState::Illuminated {
                rt_start: ms(0),
                mt_start: Some(ms(180))
            }
        );
    }

    #[test]
    fn presses_off_the_selected_target_are_ignored() {
        let layout = layout();
        let ctx = ctx(&layout);
        let lit = TrialState::Illuminated {
            rt_start: ms(0),
            mt_start: Some(ms(150)),
        };
        // target 1 sits straight up at (0, -300)
        let cycle = Cycle::new(
            ms(600),
            Point::new(0.0, -300.0),
            vec![press(0.0, -300.0, ms(590)), press(500.0, 500.0, ms(595))],
        );
        let (s, e) = transition(&lit, &cycle, &ctx);
        assert_eq!(s, lit);
        assert_eq!(e, None);
    }

    #[test]
    fn press_without_departure_leaves_movement_time_missing() {
        let layout = layout();
        let ctx = ctx(&layout);
        let lit = TrialState::Illuminated {
            rt_start: ms(1000),
            mt_start: None,
        };
        let cycle = Cycle::new(ms(1400), Point::new(290.0, 0.0), vec![press(290.0, 0.0, ms(1390))]);
        let (_, e) = transition(&lit, &cycle, &ctx);
        let Some(TrialEffect::Completed(m)) = e else {
            panic!("expected completion, got {e:?}");
        };
        assert_eq!(m.reaction_time, ms(390));
        assert_eq!(m.movement_time, None);
    }

    #[test]
    fn pointer_already_outside_at_illumination_fires_on_next_move() {
        let layout = layout();
        let ctx = ctx(&layout);
        let lit = TrialState::Illuminated {
            rt_start: ms(1000),
            mt_start: None,
        };
        // no events: no stall, no spurious measurement either
        let (s, e) = transition(&lit, &Cycle::idle(ms(1001), Point::new(90.0, 0.0)), &ctx);
        assert_eq!((s.clone(), e), (lit.clone(), None));

        let cycle = Cycle::new(ms(1020), Point::new(95.0, 0.0), vec![mv(95.0, 0.0, ms(1015))]);
        let (s, _) = transition(&s, &cycle, &ctx);
        assert_eq!(
            s,
            TrialState::Illuminated {
                rt_start: ms(1000),
                mt_start: Some(ms(1015))
            }
        );
    }

    #[test]
    fn stamps_before_illumination_clamp_to_zero_rt() {
        let layout = layout();
        let ctx = ctx(&layout);
        let lit = TrialState::Illuminated {
            rt_start: ms(1000),
            mt_start: None,
        };
        let cycle = Cycle::new(
            ms(1010),
            Point::new(300.0, 0.0),
            vec![mv(100.0, 0.0, ms(995)), press(300.0, 0.0, ms(990))],
        );
        let (_, e) = transition(&lit, &cycle, &ctx);
        let Some(TrialEffect::Completed(m)) = e else {
            panic!("expected completion");
        };
        assert_eq!(m.reaction_time, Duration::ZERO);
        assert_eq!(m.movement_time, Some(Duration::ZERO));
    }

    #[test]
    fn quit_short_circuits_any_phase() {
        let layout = layout();
        let ctx = ctx(&layout);
        let lit = TrialState::Illuminated {
            rt_start: ms(0),
            mt_start: Some(ms(100)),
        };
        let cycle = Cycle::new(
            ms(500),
            Point::new(300.0, 0.0),
            vec![press(300.0, 0.0, ms(480)), PointerEvent::Quit],
        );
        let (s, e) = transition(&lit, &cycle, &ctx);
        assert_eq!(s, lit);
        assert_eq!(e, Some(TrialEffect::Quit));

        let cycle = Cycle::new(ms(5), HOME, vec![PointerEvent::Quit]);
        let (_, e) = transition(&TrialState::WaitHome, &cycle, &ctx);
        assert_eq!(e, Some(TrialEffect::Quit));
    }

    #[test]
    fn dwell_screens_finish_after_their_time() {
        let layout = layout();
        let ctx = ctx(&layout);
        let aborted = TrialState::Aborted { until: ms(2000) };
        assert_eq!(transition(&aborted, &Cycle::idle(ms(1999), HOME), &ctx).1, None);
        let (s, e) = transition(&aborted, &Cycle::idle(ms(2000), HOME), &ctx);
        assert_eq!(s, TrialState::Done(TrialOutcome::Aborted));
        assert_eq!(e, Some(TrialEffect::Finished(TrialOutcome::Aborted)));

        let m = Measurement {
            reaction_time: ms(250),
            movement_time: Some(ms(400)),
            target_index: 2,
        };
        let fb = TrialState::Feedback {
            measurement: m,
            until: ms(5000),
        };
        let (s, e) = transition(&fb, &Cycle::idle(ms(5001), HOME), &ctx);
        assert_eq!(s, TrialState::Done(TrialOutcome::Completed(m)));
        assert_eq!(e, Some(TrialEffect::Finished(TrialOutcome::Completed(m))));
    }

    #[test]
    fn illuminated_and_wait_home_never_abort() {
        let layout = layout();
        let ctx = ctx(&layout);
        let far = Point::new(400.0, 400.0);
        let cycle = Cycle::new(ms(10), far, vec![mv(400.0, 400.0, ms(9))]);
        for state in [
            TrialState::WaitHome,
            TrialState::Illuminated {
                rt_start: ms(0),
                mt_start: None,
            },
        ] {
            let (s, e) = transition(&state, &cycle, &ctx);
            assert_ne!(s.phase(), TrialPhase::Aborted);
            assert_ne!(e, Some(TrialEffect::Aborted));
        }
    }

    #[test]
    fn machine_records_exactly_one_outcome() {
        let layout = layout();
        let mut trial = TrialStateMachine::new(
            1,
            TrialConfig {
                selected_target_index: 0,
                delay_duration: ms(100),
            },
        );
        let dwell = ms(1000);
        assert_eq!(trial.step(&Cycle::idle(ms(0), HOME), &layout, dwell, dwell), None);
        assert_eq!(trial.phase(), TrialPhase::Delay);
        let e = trial.step(&Cycle::idle(ms(50), Point::new(100.0, 0.0)), &layout, dwell, dwell);
        assert_eq!(e, Some(TrialEffect::Aborted));
        assert_eq!(trial.outcome(), Some(&TrialOutcome::Aborted));

        let e = trial.step(&Cycle::idle(ms(1050), HOME), &layout, dwell, dwell);
        assert_eq!(e, Some(TrialEffect::Finished(TrialOutcome::Aborted)));
        assert!(trial.is_done());
        assert_eq!(trial.step(&Cycle::idle(ms(2000), HOME), &layout, dwell, dwell), None);
        assert_eq!(trial.outcome(), Some(&TrialOutcome::Aborted));
    }
}
