// Tue Jan 13 2026 - Alex

use crate::animation::scene::Scene;
use crate::config::Config;
use crate::engine::job::{Frame, Job};
use crate::engine::queue::DynamicFrames;
use crate::engine::runner::Schedule;

/// Overlay transparency of every frame outside the slip fade-out.
pub const OVERLAY_TRANSPARENCY: f64 = 40.0;

/// Every frame of a run, laid out before the first job is dispatched.
#[derive(Debug, Clone)]
pub struct AnimationPlan {
    /// Frames rendered without waiting on ground motion.
    pub frames: Vec<Frame>,
    /// Camera sweep length.
    pub sweep_frames: usize,
    /// Slip fade-out length.
    pub fade_frames: usize,
    pub dynamic: Option<DynamicFrames>,
    pub animated: bool,
}

impl AnimationPlan {
    pub fn new(config: &Config, scene: &Scene) -> Self {
        if !config.animate {
            return Self {
                frames: vec![Frame::still(scene.strike_azimuth, scene.map_tilt, OVERLAY_TRANSPARENCY)],
                sweep_frames: 0,
                fade_frames: 0,
                dynamic: None,
                animated: false,
            };
        }

        let fr = config.framerate as f64;
        let sweep_frames = (config.transition_time * fr).floor() as usize;
        let fade_frames = (config.minor_transition_time * fr).floor() as usize;

        let mut frames = Vec::with_capacity(sweep_frames + fade_frames);
        frames.extend((0..sweep_frames).map(|i| sweep_frame(scene, i, sweep_frames, fade_frames)));
        frames.extend((0..fade_frames).map(|i| fade_frame(scene, i, sweep_frames, fade_frames)));

        let dynamic = scene.ground_motion.map(|gm| DynamicFrames {
            frame_count: dynamic_frame_count(scene, fr),
            framerate: fr,
            dt: gm.dt,
            nt: gm.nt,
            first_seq: (sweep_frames + fade_frames) as u32,
            t_frames: fade_frames,
            azimuth: scene.strike_azimuth,
            tilt: scene.map_tilt,
            transparency: OVERLAY_TRANSPARENCY,
        });

        log::debug!(
            "Planned {} sweep, {} fade and {} dynamic frames",
            sweep_frames,
            fade_frames,
            dynamic.as_ref().map_or(0, |d| d.frame_count)
        );

        Self {
            frames,
            sweep_frames,
            fade_frames,
            dynamic,
            animated: true,
        }
    }

    /// Initial queue contents: `Prep` first whenever dynamic frames exist.
    pub fn schedule(&self) -> Schedule {
        let mut jobs = Vec::with_capacity(self.frames.len() + 1);
        if self.dynamic.is_some() {
            jobs.push(Job::Prep);
        }
        jobs.extend(self.frames.iter().cloned().map(Job::Render));

        Schedule {
            jobs,
            dynamic: self.dynamic.clone(),
        }
    }

    pub fn static_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn dynamic_frames(&self) -> usize {
        self.dynamic.as_ref().map_or(0, |d| d.frame_count)
    }

    /// Length of the final sequence before lead-in and hold are added.
    pub fn total_frames(&self) -> usize {
        self.static_frames() + self.dynamic_frames()
    }
}

fn sweep_frame(scene: &Scene, i: usize, frames: usize, t_frames: usize) -> Frame {
    let frac = if frames > 1 { i as f64 / (frames - 1) as f64 } else { 1.0 };
    let scale_t = if t_frames > 0 {
        i.min(t_frames) as f64 / t_frames as f64
    } else {
        1.0
    };

    Frame {
        seq: Some(i as u32),
        azimuth: 180.0 + frac * (scene.strike_azimuth - 180.0),
        tilt: 90.0 - frac * (90.0 - scene.map_tilt),
        scale_t,
        transparency: OVERLAY_TRANSPARENCY,
        sim_time: None,
    }
}

fn fade_frame(scene: &Scene, i: usize, frames: usize, t_frames: usize) -> Frame {
    let scale_t = if t_frames > 1 {
        1.0 - i as f64 / (t_frames - 1) as f64
    } else {
        0.0
    };

    Frame {
        seq: Some((frames + i) as u32),
        azimuth: scene.strike_azimuth,
        tilt: scene.map_tilt,
        scale_t,
        transparency: 100.0 - (100.0 - OVERLAY_TRANSPARENCY) * scale_t,
        sim_time: None,
    }
}

/// Slip rates are shown at whole multiples of the source timestep, at most
/// one step per frame.
fn dynamic_frame_count(scene: &Scene, fr: f64) -> usize {
    let steps_per_frame = (1.0 / (scene.srf_dt * fr)).floor().max(1.0);
    let ddt = steps_per_frame * scene.srf_dt;
    let time_sr = (scene.rupture_time / ddt).ceil() * ddt;
    (time_sr * fr).floor() as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::job::JobKind;

    fn scene() -> Scene {
        Scene {
            name: "quake".to_string(),
            strike_azimuth: 240.0,
            map_tilt: 40.0,
            rupture_time: 1.95,
            srf_dt: 0.1,
            ground_motion: None,
        }
    }

    fn animated() -> Config {
        Config::default()
            .with_animate(true)
            .with_framerate(10)
            .with_transition_time(1.0)
            .with_minor_transition_time(0.5)
    }

    #[test]
    fn test_still_plan() {
        let plan = AnimationPlan::new(&Config::default(), &scene());
        let schedule = plan.schedule();

        assert!(!plan.animated);
        assert_eq!(schedule.dependencies(), 0);
        assert_eq!(schedule.jobs, vec![Job::Render(Frame::still(240.0, 40.0, 40.0))]);
    }

    #[test]
    fn test_sweep_moves_camera_to_map_view() {
        let plan = AnimationPlan::new(&animated(), &scene());
        assert_eq!(plan.sweep_frames, 10);
        assert_eq!(plan.fade_frames, 5);

        let first = &plan.frames[0];
        let last = &plan.frames[9];
        assert_eq!((first.azimuth, first.tilt, first.scale_t), (180.0, 90.0, 0.0));
        assert!((last.azimuth - 240.0).abs() < 1e-9);
        assert!((last.tilt - 40.0).abs() < 1e-9);
        assert_eq!(plan.frames[5].scale_t, 1.0);
    }

    #[test]
    fn test_fade_hides_colour_bar() {
        let plan = AnimationPlan::new(&animated(), &scene());
        let fade = &plan.frames[10..];

        assert_eq!(fade[0].seq, Some(10));
        assert_eq!((fade[0].scale_t, fade[0].transparency), (1.0, 40.0));
        assert_eq!((fade[4].scale_t, fade[4].transparency), (0.0, 100.0));
        assert!(fade.iter().all(|f| f.sim_time.is_none()));
    }

    #[test]
    fn test_ground_motion_enqueues_prep_first() {
        let plan = AnimationPlan::new(&animated(), &scene().with_ground_motion(30, 0.1));
        let schedule = plan.schedule();

        assert_eq!(schedule.jobs[0].kind(), JobKind::Prep);
        assert_eq!(schedule.dependencies(), 1);
        assert_eq!(schedule.initial_renders(), 15);

        let dynamic = schedule.dynamic.unwrap();
        assert_eq!(dynamic.first_seq, 15);
        assert_eq!(dynamic.frame_count, 20);
        assert_eq!(plan.total_frames(), 35);
    }

    #[test]
    fn test_dynamic_steps_skip_source_timesteps() {
        // 0.015 s source timestep at 25 fps shows every 2nd step
        let mut scene = scene();
        scene.srf_dt = 0.015;
        scene.rupture_time = 1.0;
        assert_eq!(dynamic_frame_count(&scene, 25.0), 25);
    }

    #[test]
    fn test_animation_without_ground_motion_has_no_generators() {
        let schedule = AnimationPlan::new(&animated(), &scene()).schedule();
        assert_eq!(schedule.dependencies(), 0);
        assert!(schedule.dynamic.is_none());
        assert!(schedule.jobs.iter().all(|j| j.kind() == JobKind::Render));
    }
}
