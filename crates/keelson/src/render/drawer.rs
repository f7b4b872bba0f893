//! Drawing collaborator: hands DOT text to an external Graphviz process

use crate::core::{MachineError, MachineResult};
use std::io::Write;
use std::process::{Command, Stdio};
use std::thread;
use tracing::{debug, info};

/// Turns a graph description into image bytes
pub trait GraphDrawer: Send + Sync {
    /// Draw `dot`, returning the encoded output
    fn draw(&self, dot: &str) -> MachineResult<Vec<u8>>;

    /// Get the name of this drawer
    fn name(&self) -> &'static str;
}

/// Runs `dot -T<format>` (or another Graphviz program) on the graph
#[derive(Debug, Clone)]
pub struct GraphvizCommand {
    program: String,
    format: String,
}

impl Default for GraphvizCommand {
    fn default() -> Self {
        Self {
            program: "dot".to_string(),
            format: "png".to_string(),
        }
    }
}

impl GraphvizCommand {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use another layout program, e.g. `neato` or a full path
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Output format passed as `-T<format>`
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn format(&self) -> &str {
        &self.format
    }
}

impl GraphDrawer for GraphvizCommand {
    fn draw(&self, dot: &str) -> MachineResult<Vec<u8>> {
        debug!(program = %self.program, format = %self.format, "Starting drawing process");
        let mut child = Command::new(&self.program)
            .arg(format!("-T{}", self.format))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                MachineError::render_error(format!("failed to start `{}`: {}", self.program, e))
            })?;

        // Feed stdin from a thread so a large image cannot fill stdout first
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| MachineError::render_error("drawing process has no stdin"))?;
        let input = dot.to_string();
        let writer = thread::spawn(move || {
            let mut stdin = stdin;
            stdin.write_all(input.as_bytes())
        });

        let output = child.wait_with_output().map_err(|e| {
            MachineError::render_error(format!("`{}` did not finish: {}", self.program, e))
        })?;
        let written = writer
            .join()
            .map_err(|_| MachineError::render_error("stdin writer thread panicked"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MachineError::render_error(format!(
                "`{} -T{}` exited with {}: {}",
                self.program,
                self.format,
                output.status,
                stderr.trim()
            )));
        }
        written.map_err(|e| {
            MachineError::render_error(format!("failed to write graph to `{}`: {}", self.program, e))
        })?;

        info!(bytes = output.stdout.len(), format = %self.format, "Drew graph");
        Ok(output.stdout)
    }

    fn name(&self) -> &'static str {
        "graphviz"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let drawer = GraphvizCommand::new().with_program("neato").with_format("svg");
        assert_eq!(drawer.program(), "neato");
        assert_eq!(drawer.format(), "svg");
        assert_eq!(drawer.name(), "graphviz");
    }

    #[test]
    fn test_missing_program_is_a_render_error() {
        let err = GraphvizCommand::new()
            .with_program("keelson-no-such-program")
            .draw("digraph {}")
            .unwrap_err();
        assert!(matches!(err, MachineError::Render { .. }));
        assert!(err.to_string().contains("keelson-no-such-program"));
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_program_is_a_render_error() {
        let err = GraphvizCommand::new()
            .with_program("false")
            .draw("digraph {}")
            .unwrap_err();
        assert!(err.to_string().contains("exited with"));
    }
}
