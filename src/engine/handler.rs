// Tue Jan 13 2026 - Alex

use crate::engine::error::HandlerError;
use crate::engine::job::{Frame, Job, JobKind, Partition};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// What a job left behind on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    Produced(PathBuf),
    /// Ran fine but there was nothing to write.
    Empty,
}

impl Artifact {
    pub fn is_produced(&self) -> bool {
        matches!(self, Artifact::Produced(_))
    }

    fn from_path(path: PathBuf) -> Self {
        if path.exists() {
            Artifact::Produced(path)
        } else {
            Artifact::Empty
        }
    }
}

/// Executes job bodies. One instance per worker, never shared.
pub trait JobHandler: Send {
    fn prep(&mut self) -> Result<Artifact, HandlerError>;
    fn shard_prep(&mut self, partition: &Partition) -> Result<Artifact, HandlerError>;
    fn render(&mut self, frame: &Frame) -> Result<Artifact, HandlerError>;
}

/// Output locations, computable from job kind and payload alone.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    workdir: PathBuf,
    name: String,
    frame_extension: String,
}

impl ArtifactPaths {
    pub fn new<P: Into<PathBuf>>(workdir: P, name: &str) -> Self {
        Self {
            workdir: workdir.into(),
            name: name.to_string(),
            frame_extension: "json".to_string(),
        }
    }

    pub fn with_frame_extension(mut self, extension: &str) -> Self {
        self.frame_extension = extension.trim_start_matches('.').to_string();
        self
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ground_motion_dir(&self) -> PathBuf {
        self.workdir.join("xyts")
    }

    pub fn prep(&self) -> PathBuf {
        self.ground_motion_dir().join("prep.json")
    }

    pub fn shard(&self, partition: &Partition) -> PathBuf {
        self.ground_motion_dir().join(format!("shard_{:03}.json", partition.start))
    }

    pub fn timeslice(&self, t: usize) -> PathBuf {
        self.ground_motion_dir().join(format!("ts{:04}.json", t))
    }

    pub fn frame(&self, seq: Option<u32>) -> PathBuf {
        match seq {
            Some(seq) => self.workdir.join(format!("{}_perspective_{:04}.{}", self.name, seq, self.frame_extension)),
            None => self.workdir.join(format!("{}_perspective.{}", self.name, self.frame_extension)),
        }
    }

    /// printf-style pattern of the numbered frames, as video encoders take it.
    pub fn frame_pattern(&self) -> PathBuf {
        self.workdir.join(format!("{}_perspective_%04d.{}", self.name, self.frame_extension))
    }

    pub fn output(&self, job: &Job) -> PathBuf {
        match job {
            Job::Prep => self.prep(),
            Job::ShardPrep(partition) => self.shard(partition),
            Job::Render(frame) => self.frame(frame.seq),
        }
    }
}

/// Ground motion time axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Timeslices {
    pub nt: usize,
    pub dt: f64,
}

/// Writes a JSON descriptor for every job; an image renderer picks them up.
pub struct ArtifactHandler {
    paths: ArtifactPaths,
    timeslices: Option<Timeslices>,
}

#[derive(Serialize)]
struct FrameDescriptor<'a> {
    name: &'a str,
    frame: &'a Frame,
    ground_motion: Option<PathBuf>,
}

impl ArtifactHandler {
    pub fn new(paths: ArtifactPaths, timeslices: Option<Timeslices>) -> Self {
        Self { paths, timeslices }
    }

    fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), HandlerError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_vec_pretty(value)?)?;
        Ok(())
    }
}

impl JobHandler for ArtifactHandler {
    fn prep(&mut self) -> Result<Artifact, HandlerError> {
        let Some(timeslices) = self.timeslices else {
            return Ok(Artifact::Empty);
        };
        let path = self.paths.prep();
        Self::write_json(&path, &timeslices)?;
        Ok(Artifact::Produced(path))
    }

    fn shard_prep(&mut self, partition: &Partition) -> Result<Artifact, HandlerError> {
        let prep = self.paths.prep();
        if !prep.exists() {
            return Err(HandlerError::MissingInput(prep));
        }
        let Some(timeslices) = self.timeslices else {
            return Ok(Artifact::Empty);
        };

        let mut written = Vec::new();
        for t in partition.indices(timeslices.nt) {
            let path = self.paths.timeslice(t);
            Self::write_json(&path, &serde_json::json!({ "timeslice": t, "time": t as f64 * timeslices.dt }))?;
            written.push(path);
        }
        if written.is_empty() {
            return Ok(Artifact::Empty);
        }

        let path = self.paths.shard(partition);
        Self::write_json(&path, &written)?;
        Ok(Artifact::Produced(path))
    }

    fn render(&mut self, frame: &Frame) -> Result<Artifact, HandlerError> {
        let ground_motion = match (frame.sim_time, self.timeslices) {
            (Some(sim_time), Some(timeslices)) => {
                let prep = self.paths.prep();
                if !prep.exists() {
                    return Err(HandlerError::MissingInput(prep));
                }
                let t = (sim_time / timeslices.dt).round() as usize;
                Some(self.paths.timeslice(t)).filter(|p| p.exists())
            }
            _ => None,
        };

        let path = self.paths.frame(frame.seq);
        let descriptor = FrameDescriptor {
            name: self.paths.name(),
            frame,
            ground_motion,
        };
        Self::write_json(&path, &descriptor)?;
        Ok(Artifact::Produced(path))
    }
}

/// Hands each job to an external program:
/// `program [args..] <kind> <output-path>`, payload JSON in `FRAME_FARM_JOB`.
pub struct CommandHandler {
    program: String,
    args: Vec<String>,
    paths: ArtifactPaths,
}

impl CommandHandler {
    pub fn new(program: String, args: Vec<String>, paths: ArtifactPaths) -> Self {
        Self { program, args, paths }
    }

    fn invoke(&self, job: &Job) -> Result<Artifact, HandlerError> {
        let output = self.paths.output(job);
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)?;
        }

        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(job.kind().name())
            .arg(&output)
            .env("FRAME_FARM_JOB", serde_json::to_string(job)?)
            .env("FRAME_FARM_WORKDIR", self.paths.workdir())
            .status()?;

        if !status.success() {
            return Err(HandlerError::Command {
                program: self.program.clone(),
                status: status.to_string(),
            });
        }

        Ok(Artifact::from_path(output))
    }
}

impl JobHandler for CommandHandler {
    fn prep(&mut self) -> Result<Artifact, HandlerError> {
        self.invoke(&Job::Prep)
    }

    fn shard_prep(&mut self, partition: &Partition) -> Result<Artifact, HandlerError> {
        self.invoke(&Job::ShardPrep(*partition))
    }

    fn render(&mut self, frame: &Frame) -> Result<Artifact, HandlerError> {
        let artifact = self.invoke(&Job::Render(frame.clone()))?;
        if !artifact.is_produced() {
            log::warn!("{} produced no {} output", self.program, JobKind::Render);
        }
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn handler(dir: &TempDir, nt: usize) -> ArtifactHandler {
        ArtifactHandler::new(
            ArtifactPaths::new(dir.path(), "quake"),
            Some(Timeslices { nt, dt: 0.5 }),
        )
    }

    #[test]
    fn test_paths_are_deterministic() {
        let paths = ArtifactPaths::new("/tmp/wd", "quake");
        assert_eq!(paths.frame(Some(12)), PathBuf::from("/tmp/wd/quake_perspective_0012.json"));
        assert_eq!(paths.frame(None), PathBuf::from("/tmp/wd/quake_perspective.json"));
        assert_eq!(paths.timeslice(3), PathBuf::from("/tmp/wd/xyts/ts0003.json"));
        assert_eq!(paths.output(&Job::ShardPrep(Partition::new(2, 4))), paths.shard(&Partition::new(2, 4)));

        let png = paths.with_frame_extension(".png");
        assert_eq!(png.frame(Some(1)), PathBuf::from("/tmp/wd/quake_perspective_0001.png"));
    }

    #[test]
    fn test_prep_then_shard_writes_partition() {
        let dir = TempDir::new().unwrap();
        let mut handler = handler(&dir, 5);

        assert!(handler.prep().unwrap().is_produced());
        let artifact = handler.shard_prep(&Partition::new(1, 2)).unwrap();

        assert!(artifact.is_produced());
        let paths = ArtifactPaths::new(dir.path(), "quake");
        assert!(paths.timeslice(1).exists());
        assert!(paths.timeslice(3).exists());
        assert!(!paths.timeslice(2).exists());
    }

    #[test]
    fn test_shard_past_last_timeslice_is_empty() {
        let dir = TempDir::new().unwrap();
        let mut handler = handler(&dir, 2);
        handler.prep().unwrap();

        assert_eq!(handler.shard_prep(&Partition::new(3, 4)).unwrap(), Artifact::Empty);
    }

    #[test]
    fn test_shard_without_prep_fails() {
        let dir = TempDir::new().unwrap();
        let mut handler = handler(&dir, 4);

        assert!(matches!(
            handler.shard_prep(&Partition::new(0, 1)),
            Err(HandlerError::MissingInput(_))
        ));
    }

    #[test]
    fn test_prep_without_ground_motion_is_empty() {
        let dir = TempDir::new().unwrap();
        let mut handler = ArtifactHandler::new(ArtifactPaths::new(dir.path(), "quake"), None);
        assert_eq!(handler.prep().unwrap(), Artifact::Empty);
    }

    #[test]
    fn test_render_still_and_dynamic() {
        let dir = TempDir::new().unwrap();
        let mut handler = handler(&dir, 4);

        let still = handler.render(&Frame::still(180.0, 60.0, 40.0)).unwrap();
        assert_eq!(still, Artifact::Produced(dir.path().join("quake_perspective.json")));

        let mut frame = Frame::still(180.0, 60.0, 40.0);
        frame.seq = Some(4);
        frame.sim_time = Some(1.0);
        assert!(matches!(handler.render(&frame), Err(HandlerError::MissingInput(_))));

        handler.prep().unwrap();
        handler.shard_prep(&Partition::new(0, 1)).unwrap();
        let artifact = handler.render(&frame).unwrap();
        let text = fs::read_to_string(dir.path().join("quake_perspective_0004.json")).unwrap();

        assert!(artifact.is_produced());
        assert!(text.contains("ts0002.json"));
    }

    #[cfg(unix)]
    #[test]
    fn test_command_handler_runs_program() {
        let dir = TempDir::new().unwrap();
        let paths = ArtifactPaths::new(dir.path(), "quake").with_frame_extension("png");
        let script = "test \"$1\" = render && echo \"$FRAME_FARM_JOB\" > \"$2\"".to_string();
        let mut handler = CommandHandler::new("sh".to_string(), vec!["-c".to_string(), script, "sh".to_string()], paths);

        let artifact = handler.render(&Frame::still(180.0, 60.0, 40.0)).unwrap();
        assert_eq!(artifact, Artifact::Produced(dir.path().join("quake_perspective.png")));

        // the script only writes render output
        assert!(matches!(handler.prep(), Err(HandlerError::Command { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_command_handler_without_output_is_empty() {
        let dir = TempDir::new().unwrap();
        let paths = ArtifactPaths::new(dir.path(), "quake");
        let mut handler = CommandHandler::new("true".to_string(), Vec::new(), paths);

        assert_eq!(handler.shard_prep(&Partition::new(0, 2)).unwrap(), Artifact::Empty);
    }
}
