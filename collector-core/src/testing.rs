//! Test doubles shared by the unit tests.

use crate::build_info::BuildDescriptor;
use crate::config::Config;
use crate::engine::{EngineHandle, PipelineEngine, ReadySignal};
use crate::factory::Factories;
use crate::mode::SessionProbe;
use crate::service::{ServiceStatus, StatusReport, StatusReporter};
use crate::settings::RunSettings;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::{Duration, Instant};

pub fn run_settings() -> RunSettings {
  RunSettings::new(
    BuildDescriptor::new("test-collector", "test distribution", "0.0.0"),
    Factories::default(),
    Config::default(),
  )
}

/// Polls `cond` until it holds; panics after five seconds.
pub fn wait_until(cond: impl Fn() -> bool) {
  let deadline = Instant::now() + Duration::from_secs(5);
  while !cond() {
    assert!(Instant::now() < deadline, "condition not reached in time");
    std::thread::sleep(Duration::from_millis(5));
  }
}

pub struct ScriptedProbe {
  answer: Result<bool, String>,
  calls: AtomicUsize,
}

impl ScriptedProbe {
  pub fn answer(interactive: bool) -> Self {
    Self {
      answer: Ok(interactive),
      calls: AtomicUsize::new(0),
    }
  }

  pub fn failing(msg: &str) -> Self {
    Self {
      answer: Err(msg.to_string()),
      calls: AtomicUsize::new(0),
    }
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

impl SessionProbe for ScriptedProbe {
  fn is_interactive_session(&self) -> anyhow::Result<bool> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    self.answer.clone().map_err(anyhow::Error::msg)
  }
}

#[derive(Clone, Default)]
pub struct RecordingReporter {
  reports: Arc<Mutex<Vec<StatusReport>>>,
  fail: bool,
}

impl RecordingReporter {
  pub fn failing() -> Self {
    Self {
      fail: true,
      ..Self::default()
    }
  }

  pub fn statuses(&self) -> Vec<ServiceStatus> {
    self.reports.lock().unwrap().iter().map(|r| r.status).collect()
  }

  pub fn last(&self) -> Option<StatusReport> {
    self.reports.lock().unwrap().last().copied()
  }
}

impl StatusReporter for RecordingReporter {
  fn report(&self, report: &StatusReport) -> anyhow::Result<()> {
    if self.fail {
      anyhow::bail!("service status handle is invalid");
    }
    self.reports.lock().unwrap().push(*report);
    Ok(())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
  RunUntilStopped,
  FailBuild,
  FailBeforeReady,
  /// Comes up, then returns cleanly without being asked to stop.
  ExitAfterReady,
  FailAfterStop,
}

#[derive(Clone)]
pub struct ScriptedEngine {
  script: Script,
  builds: Arc<AtomicUsize>,
  runs: Arc<AtomicUsize>,
  stops: Arc<AtomicUsize>,
}

impl ScriptedEngine {
  pub fn new(script: Script) -> Self {
    Self {
      script,
      builds: Arc::default(),
      runs: Arc::default(),
      stops: Arc::default(),
    }
  }

  pub fn build_calls(&self) -> usize {
    self.builds.load(Ordering::SeqCst)
  }

  pub fn run_calls(&self) -> usize {
    self.runs.load(Ordering::SeqCst)
  }

  pub fn stop_calls(&self) -> usize {
    self.stops.load(Ordering::SeqCst)
  }
}

impl PipelineEngine for ScriptedEngine {
  fn build(&self, _settings: &RunSettings) -> anyhow::Result<Box<dyn EngineHandle>> {
    self.builds.fetch_add(1, Ordering::SeqCst);
    if self.script == Script::FailBuild {
      anyhow::bail!("invalid pipeline configuration");
    }
    let (stop_tx, stop_rx) = mpsc::channel();
    Ok(Box::new(ScriptedHandle {
      script: self.script,
      runs: Arc::clone(&self.runs),
      stops: Arc::clone(&self.stops),
      stop_tx: Mutex::new(Some(stop_tx)),
      stop_rx: Mutex::new(Some(stop_rx)),
    }))
  }
}

struct ScriptedHandle {
  script: Script,
  runs: Arc<AtomicUsize>,
  stops: Arc<AtomicUsize>,
  stop_tx: Mutex<Option<mpsc::Sender<()>>>,
  stop_rx: Mutex<Option<mpsc::Receiver<()>>>,
}

impl EngineHandle for ScriptedHandle {
  fn run(&self, ready: ReadySignal) -> anyhow::Result<()> {
    self.runs.fetch_add(1, Ordering::SeqCst);
    if self.script == Script::FailBeforeReady {
      anyhow::bail!("receiver failed to bind");
    }
    ready.notify();
    if self.script == Script::ExitAfterReady {
      return Ok(());
    }

    let stop_rx = self.stop_rx.lock().unwrap().take().unwrap();
    let _ = stop_rx.recv();
    if self.script == Script::FailAfterStop {
      anyhow::bail!("exporter flush failed");
    }
    Ok(())
  }

  fn stop(&self) {
    self.stops.fetch_add(1, Ordering::SeqCst);
    if let Some(tx) = self.stop_tx.lock().unwrap().take() {
      let _ = tx.send(());
    }
  }
}
