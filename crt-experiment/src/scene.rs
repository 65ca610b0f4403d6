use crate::state::TrialState;
use crt_core::{Circle, Frame, Palette, Point, TargetLayout};

/// Turns trial state into a frame description.
#[derive(Debug, Clone)]
pub struct Scene {
    width: f32,
    height: f32,
    palette: Palette,
}

impl Scene {
    pub fn new(width: u32, height: u32, palette: Palette) -> Self {
        Self {
            width: width as f32,
            height: height as f32,
            palette,
        }
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn frame(
        &self,
        state: &TrialState,
        layout: &TargetLayout,
        selected: usize,
        trial_number: usize,
        n_trials: usize,
    ) -> Frame {
        let mut frame = Frame::default();
        let center_x = self.width / 2.0;
        let phase = state.phase();

        if phase.shows_layout() {
            let highlight = matches!(state, TrialState::Illuminated { .. }).then_some(selected);
            frame.home = Some(Circle {
                center: layout.home(),
                radius: layout.home_radius(),
                color: self.palette.home,
            });
            frame.targets = layout
                .targets()
                .iter()
                .enumerate()
                .map(|(i, &center)| Circle {
                    center,
                    radius: layout.target_radius(),
                    color: if Some(i) == highlight {
                        self.palette.highlight
                    } else {
                        self.palette.target
                    },
                })
                .collect();
            frame.push_text(
                format!("Trial {trial_number} of {n_trials}"),
                Point::new(center_x, 10.0),
            );
            if let Some(prompt) = phase.prompt() {
                frame.push_text(prompt, Point::new(center_x, 50.0));
            }
            return frame;
        }

        let middle = Point::new(center_x, self.height / 2.0);
        match state {
            TrialState::Aborted { .. } => {
                frame.push_text(format!("Trial {trial_number} ABORTED"), middle);
            }
            TrialState::Feedback { measurement, .. } => {
                frame.push_text(measurement.summary(), middle);
            }
            _ => {}
        }
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crt_core::Measurement;
    use std::time::Duration;

    fn setup() -> (Scene, TargetLayout) {
        let scene = Scene::new(800, 800, Palette::default());
        let layout = TargetLayout::new(Point::new(400.0, 400.0), 40.0, 30.0, 300.0, 8);
        (scene, layout)
    }

    #[test]
    fn highlight_only_while_illuminated() {
        let (scene, layout) = setup();
        let highlight = scene.palette().highlight;

        let waiting = scene.frame(&TrialState::WaitHome, &layout, 3, 1, 20);
        assert_eq!(waiting.targets.len(), 8);
        assert_eq!(waiting.target_with_color(highlight), None);
        assert!(waiting.has_text("Place mouse in the home circle"));

        let delay = scene.frame(
            &TrialState::Delay {
                deadline: Duration::from_secs(2),
            },
            &layout,
            3,
            1,
            20,
        );
        assert_eq!(delay.target_with_color(highlight), None);
        assert!(delay.has_text("Stay in home circle"));

        let lit = scene.frame(
            &TrialState::Illuminated {
                rt_start: Duration::ZERO,
                mt_start: None,
            },
            &layout,
            3,
            7,
            20,
        );
        assert_eq!(lit.target_with_color(highlight), Some(3));
        assert_eq!(
            lit.targets.iter().filter(|c| c.color == highlight).count(),
            1
        );
        assert!(lit.has_text("Trial 7 of 20"));
        assert_eq!(lit.texts.len(), 1);
    }

    #[test]
    fn dwell_screens_show_only_text() {
        let (scene, layout) = setup();
        let aborted = scene.frame(
            &TrialState::Aborted {
                until: Duration::from_secs(1),
            },
            &layout,
            0,
            4,
            20,
        );
        assert!(aborted.home.is_none());
        assert!(aborted.targets.is_empty());
        assert!(aborted.has_text("Trial 4 ABORTED"));

        let feedback = scene.frame(
            &TrialState::Feedback {
                measurement: Measurement {
                    reaction_time: Duration::from_millis(250),
                    movement_time: Some(Duration::from_millis(410)),
                    target_index: 0,
                },
                until: Duration::from_secs(1),
            },
            &layout,
            0,
            4,
            20,
        );
        assert!(feedback.has_text("RT: 250.0 ms  |  MT: 410.0 ms"));
        assert_eq!(feedback.texts[0].anchor, Point::new(400.0, 400.0));
    }
}
