//! Command-line interface for the keelson utility
//!
//! Validates Mermaid state diagrams and exports them as machine
//! configuration, Graphviz DOT, rendered images or plain-text tables.

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use tracing::debug;

use keelson::core::logging::{init_logging, LOG_FORMAT_ENV, LOG_LEVEL_ENV};
use keelson::pipeline::Pipeline;
use keelson::render::{outline, GraphDrawer, GraphvizCommand, MachineConfig, TransitionTable};
use keelson::{Direction, HierarchicalModel, InitialPolicy, ParseOptions, RenderConfig};

/// Keelson - Mermaid state diagrams to hierarchical state machines
#[derive(Parser)]
#[command(name = "keelson")]
#[command(about = "Validate Mermaid state diagrams and export hierarchical state machines")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Reject composite states without an explicit `[*] -->` line
    #[arg(long, global = true)]
    pub strict: bool,

    /// Set log level (trace|debug|info|warn|error)
    #[arg(long, value_enum, default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,

    /// Set log format (compact|pretty|json)
    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

/// Log level options
#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Log format options
#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Compact => "compact",
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check that a diagram reconstructs into a valid machine
    Validate {
        /// Input file containing the state diagram (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Print the runtime machine configuration as JSON
    Config {
        /// Input file containing the state diagram (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output file (use - for stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Indent the JSON
        #[arg(long)]
        pretty: bool,
    },

    /// Print the Graphviz DOT graph, initial markers included
    Dot {
        /// Input file containing the state diagram (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output file (use - for stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Override the diagram's own direction
        #[arg(long, value_enum)]
        direction: Option<DirectionChoice>,

        /// Graph name and caption
        #[arg(long, default_value = "StateMachine")]
        title: String,

        /// Leave entry/exit/do annotations out of node labels
        #[arg(long)]
        no_annotations: bool,
    },

    /// Render the graph to an image with Graphviz
    Draw {
        /// Input file containing the state diagram (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Image file to write
        #[arg(short, long)]
        output: PathBuf,

        /// Graphviz output format, passed as -T<format>
        #[arg(long, default_value = "png")]
        format: String,

        /// Graphviz program to run
        #[arg(long, default_value = "dot")]
        program: String,

        /// Override the diagram's own direction
        #[arg(long, value_enum)]
        direction: Option<DirectionChoice>,
    },

    /// Print the transition table, or the state outline
    Table {
        /// Input file containing the state diagram (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Print the nested state outline instead
        #[arg(long)]
        outline: bool,
    },
}

/// Layout directions accepted on the command line
#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
pub enum DirectionChoice {
    /// Top to bottom
    Td,
    /// Left to right
    Lr,
    /// Right to left
    Rl,
    /// Bottom to top
    Bt,
}

impl From<DirectionChoice> for Direction {
    fn from(value: DirectionChoice) -> Self {
        match value {
            DirectionChoice::Td => Direction::TopDown,
            DirectionChoice::Lr => Direction::LeftRight,
            DirectionChoice::Rl => Direction::RightLeft,
            DirectionChoice::Bt => Direction::BottomUp,
        }
    }
}

/// Main CLI application
#[derive(Default)]
pub struct KeelsonApp {
    options: ParseOptions,
}

impl KeelsonApp {
    /// Create a new application instance with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the application with the given CLI arguments
    pub fn run(mut self, cli: Cli) -> Result<()> {
        // Environment variables take precedence over the flags
        let log_level = std::env::var(LOG_LEVEL_ENV)
            .ok()
            .or_else(|| std::env::var("RUST_LOG").ok())
            .unwrap_or_else(|| cli.log_level.as_str().to_string());
        let log_format = std::env::var(LOG_FORMAT_ENV)
            .ok()
            .unwrap_or_else(|| cli.log_format.as_str().to_string());

        if let Err(e) = init_logging(Some(&log_level), Some(&log_format)) {
            eprintln!("Warning: Failed to initialize logging: {}", e);
        }

        if cli.verbose {
            eprintln!("Keelson v{}", env!("CARGO_PKG_VERSION"));
        }
        if cli.strict {
            self.options = self.options.with_initial_policy(InitialPolicy::Reject);
        }

        match cli.command {
            Commands::Validate { input } => self.validate_command(input, cli.verbose),
            Commands::Config {
                input,
                output,
                pretty,
            } => self.config_command(input, output, pretty),
            Commands::Dot {
                input,
                output,
                direction,
                title,
                no_annotations,
            } => {
                let mut config = RenderConfig::new()
                    .with_title(title)
                    .with_annotations(!no_annotations);
                if let Some(direction) = direction {
                    config = config.with_direction(direction.into());
                }
                self.dot_command(input, output, config)
            }
            Commands::Draw {
                input,
                output,
                format,
                program,
                direction,
            } => {
                let mut config = RenderConfig::new();
                if let Some(direction) = direction {
                    config = config.with_direction(direction.into());
                }
                let drawer = GraphvizCommand::new()
                    .with_program(program)
                    .with_format(format);
                self.draw_command(input, output, config, &drawer, cli.verbose)
            }
            Commands::Table { input, outline } => self.table_command(input, outline),
        }
    }

    fn pipeline(&self, config: RenderConfig) -> Pipeline {
        Pipeline::with_options(self.options.clone(), config)
    }

    fn parse(&self, content: &str) -> Result<HierarchicalModel> {
        Ok(self.pipeline(RenderConfig::default()).parse(content)?)
    }

    /// Handle the validate command
    fn validate_command(&self, input: Option<PathBuf>, verbose: bool) -> Result<()> {
        let content = self.read_input(input)?;

        if verbose {
            eprintln!("Read {} bytes of input", content.len());
        }

        match self.parse(&content) {
            Ok(model) => {
                println!("✓ {}", summary(&model));
                for id in model.defaulted_initials() {
                    println!("  note: `{}` has no `[*]` line; its first child is the initial state", id);
                }
                Ok(())
            }
            Err(e) => {
                println!("✗ Invalid state diagram: {}", e);
                Err(e)
            }
        }
    }

    /// Handle the config command
    fn config_command(
        &self,
        input: Option<PathBuf>,
        output: Option<PathBuf>,
        pretty: bool,
    ) -> Result<()> {
        let content = self.read_input(input)?;
        let config = MachineConfig::from_model(&self.parse(&content)?);
        let json = if pretty {
            config.to_json_pretty()?
        } else {
            config.to_json()?
        };
        self.write_output(output, &json)
    }

    /// Handle the dot command
    fn dot_command(
        &self,
        input: Option<PathBuf>,
        output: Option<PathBuf>,
        config: RenderConfig,
    ) -> Result<()> {
        let content = self.read_input(input)?;
        let rendered = self.pipeline(config).process(&content)?;
        self.write_output(output, &rendered.dot)
    }

    /// Handle the draw command
    fn draw_command(
        &self,
        input: Option<PathBuf>,
        output: PathBuf,
        config: RenderConfig,
        drawer: &dyn GraphDrawer,
        verbose: bool,
    ) -> Result<()> {
        let content = self.read_input(input)?;
        let rendered = self.pipeline(config).process(&content)?;
        let bytes = drawer.draw(&rendered.dot)?;
        fs::write(&output, &bytes)
            .map_err(|e| anyhow!("Failed to write output file '{}': {}", output.display(), e))?;

        if verbose {
            eprintln!("Wrote {} bytes to {}", bytes.len(), output.display());
        }
        Ok(())
    }

    /// Handle the table command
    fn table_command(&self, input: Option<PathBuf>, show_outline: bool) -> Result<()> {
        let content = self.read_input(input)?;
        let model = self.parse(&content)?;
        let text = if show_outline {
            outline(&model)
        } else {
            TransitionTable::from_model(&model).render()
        };
        self.write_output(None, &text)
    }

    /// Read input from file or stdin
    pub fn read_input(&self, input: Option<PathBuf>) -> Result<String> {
        match input {
            Some(path) if path.to_string_lossy() != "-" => {
                debug!(path = %path.display(), "Reading input file");
                fs::read_to_string(&path)
                    .map_err(|e| anyhow!("Failed to read input file '{}': {}", path.display(), e))
            }
            _ => {
                let mut content = String::new();
                io::stdin().read_to_string(&mut content)?;
                Ok(content)
            }
        }
    }

    /// Write output to file or stdout
    pub fn write_output(&self, output: Option<PathBuf>, content: &str) -> Result<()> {
        match output {
            Some(path) if path.to_string_lossy() != "-" => {
                fs::write(&path, content).map_err(|e| {
                    anyhow!("Failed to write output file '{}': {}", path.display(), e)
                })?;
            }
            _ => {
                let mut stdout = io::stdout();
                stdout.write_all(content.as_bytes())?;
                if !content.is_empty() && !content.ends_with('\n') {
                    stdout.write_all(b"\n")?;
                }
                stdout.flush()?;
            }
        }
        Ok(())
    }
}

/// One-line description of a valid model
fn summary(model: &HierarchicalModel) -> String {
    format!(
        "Valid state machine: {} states, {} transitions, {} regions, initial `{}`",
        model.states().len(),
        model.transitions().len(),
        model.regions().len(),
        model.root_initial()
    )
}
