use console::style;
use std::fmt;

/// Error shown to the user with suggestions
pub struct CliError {
    pub message: String,
    pub context: Option<String>,
    pub suggestions: Vec<String>,
    pub help_command: Option<String>,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
            help_command: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_help(mut self, command: impl Into<String>) -> Self {
        self.help_command = Some(command.into());
        self
    }

    pub fn display(&self) {
        eprintln!("{} {}\n", style("✗").red().bold(), style(&self.message).red().bold());

        if let Some(ref context) = self.context {
            eprintln!("{}", context);
            eprintln!();
        }

        if !self.suggestions.is_empty() {
            eprintln!("{}", style("To fix this:").yellow().bold());
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                eprintln!("  {}. {}", i + 1, suggestion);
            }
            eprintln!();
        }

        if let Some(ref help_cmd) = self.help_command {
            eprintln!("{} {}", style("Need help?").cyan(), style(help_cmd).cyan().bold());
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Debug for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// No works layer was given anywhere
pub fn works_not_set() -> CliError {
    CliError::new("No works layer given")
        .with_context("A values check needs the layer of proposed works to screen.")
        .with_suggestion("Pass it on the command line: valcheck run --works works.geojson")
        .with_suggestion("Or set VALCHECK_WORKS")
        .with_suggestion("Or add `works = \"works.geojson\"` to valcheck.toml")
        .with_help("Run: valcheck run --help")
}

/// An unknown mode name
pub fn invalid_mode(value: &str) -> CliError {
    CliError::new(format!("Unknown mode '{}'", value))
        .with_suggestion("Use one of DAP, JFMP, NBFT or LRLI")
        .with_help("Run: valcheck run --help")
}

/// The job ran but failed as a whole
pub fn job_failed(message: &str) -> CliError {
    CliError::new("Values check failed")
        .with_context(format!("The job was aborted before producing reports.\n\nReason: {}", message))
        .with_suggestion("Check that the works layer exists and is readable")
        .with_suggestion("Check that the output directory can be created and written")
        .with_help("Run with --verbose for the full log")
}

/// The matrix has datasets that cannot be evaluated
pub fn matrix_invalid(count: usize) -> CliError {
    CliError::new(format!("{} dataset(s) cannot be evaluated as configured", count))
        .with_context("Each listed dataset will be skipped by every job until it is fixed.")
        .with_suggestion("Add the missing keys or path aliases to the matrix or valcheck.toml")
        .with_help("Run: valcheck matrix --help")
}
