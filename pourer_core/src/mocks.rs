//! Test and helper mocks for pourer_core

use std::collections::VecDeque;

use crate::bus::{Command, MessageBus, Reply, Request};
use crate::curve::Param;
use crate::view::{Display, View};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Message bus with canned answers that records all traffic.
#[derive(Debug, Clone, Default)]
pub struct ScriptedBus {
    /// Parameters returned by `GetParam`.
    pub params: [f64; 3],
    /// Parameters that become current after `CalibrationLoad`.
    pub stored_params: Option<[f64; 3]>,
    /// Answers for `CalibrationIsValid`, consumed in order; `true` when exhausted.
    pub validity: VecDeque<bool>,
    /// Answer for `IsWaterPouring`.
    pub pouring: bool,
    /// Command that fails when sent.
    pub fail_on: Option<Command>,
    pub commands: Vec<Command>,
    pub requests: Vec<Request>,
}

impl ScriptedBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bus for a station that already holds a model.
    pub fn calibrated(a: f64, b: f64, c: f64) -> Self {
        Self {
            params: [a, b, c],
            ..Self::default()
        }
    }

    pub fn with_stored(mut self, a: f64, b: f64, c: f64) -> Self {
        self.stored_params = Some([a, b, c]);
        self
    }

    pub fn count(&self, cmd: &Command) -> usize {
        self.commands.iter().filter(|c| *c == cmd).count()
    }

    pub fn clear_log(&mut self) {
        self.commands.clear();
        self.requests.clear();
    }
}

impl MessageBus for ScriptedBus {
    fn send(&mut self, cmd: Command) -> Result<(), BoxError> {
        self.commands.push(cmd);
        if self.fail_on == Some(cmd) {
            return Err(Box::new(std::io::Error::other(format!("{cmd:?} failed"))));
        }
        if cmd == Command::CalibrationLoad
            && let Some(p) = self.stored_params
        {
            self.params = p;
        }
        Ok(())
    }

    fn request(&mut self, req: Request) -> Result<Reply, BoxError> {
        self.requests.push(req);
        Ok(match req {
            Request::GetParam(p) => Reply::Param(match p {
                Param::A => self.params[0],
                Param::B => self.params[1],
                Param::C => self.params[2],
            }),
            Request::CalibrationIsValid(_) => Reply::Valid(self.validity.pop_front().unwrap_or(true)),
            Request::IsWaterPouring => Reply::Pouring(self.pouring),
        })
    }
}

/// Display that keeps every view it was asked to show.
#[derive(Debug, Clone, Default)]
pub struct RecordingDisplay {
    pub views: Vec<View>,
    /// View that fails to render (it is still recorded).
    pub fail_on: Option<View>,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<&View> {
        self.views.last()
    }
}

impl Display for RecordingDisplay {
    fn show(&mut self, view: &View) -> Result<(), BoxError> {
        self.views.push(view.clone());
        if self.fail_on.as_ref() == Some(view) {
            return Err(Box::new(std::io::Error::other("lcd write failed")));
        }
        Ok(())
    }
}
