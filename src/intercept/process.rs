//! Process creation and reaping

use super::{intercepted_call, symbols};
use std::io;
use std::process::{Command, ExitStatus, Output};

/// Spawn `command` (reported as `fork`)
pub fn spawn(command: &mut Command) -> io::Result<Child> {
    intercepted_call(symbols::FORK);
    command.spawn().map(|inner| Child { inner })
}

/// Run `command` to completion and collect its output (reported as `fork`)
pub fn output(command: &mut Command) -> io::Result<Output> {
    intercepted_call(symbols::FORK);
    command.output()
}

/// Child process spawned through [`spawn`]
#[derive(Debug)]
pub struct Child {
    inner: std::process::Child,
}

impl Child {
    pub fn id(&self) -> u32 {
        self.inner.id()
    }

    /// Block until the child exits (reported as `waitpid`)
    pub fn wait(&mut self) -> io::Result<ExitStatus> {
        intercepted_call(symbols::WAITPID);
        self.inner.wait()
    }

    pub fn try_wait(&mut self) -> io::Result<Option<ExitStatus>> {
        self.inner.try_wait()
    }

    pub fn kill(&mut self) -> io::Result<()> {
        self.inner.kill()
    }

    pub fn as_inner_mut(&mut self) -> &mut std::process::Child {
        &mut self.inner
    }
}
