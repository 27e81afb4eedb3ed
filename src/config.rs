use crate::cli::{Args, ColorChoice};
use crate::interpreter::DEFAULT_MAX_CALL_DEPTH;
use std::path::PathBuf;

/// Where the program text comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    File(PathBuf),
    Inline(String),
    Stdin,
}

impl Source {
    /// Name shown in diagnostics.
    pub fn display_name(&self) -> String {
        match self {
            Source::File(path) => path.display().to_string(),
            Source::Inline(_) => "<command>".to_string(),
            Source::Stdin => "<stdin>".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dump {
    Tokens,
    Ast,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub source: Source,
    pub color_enabled: bool,
    pub verbose: bool,
    /// `None` runs without a call-depth limit.
    pub max_call_depth: Option<usize>,
    pub dump: Option<Dump>,
}

impl AppConfig {
    pub fn from_args(args: &Args) -> Self {
        let color_enabled = match args.color {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => atty::is(atty::Stream::Stderr) && atty::is(atty::Stream::Stdout),
        };

        let source = match (&args.script, &args.command) {
            (Some(path), _) => Source::File(path.clone()),
            (None, Some(text)) => Source::Inline(text.clone()),
            (None, None) => Source::Stdin,
        };

        let max_call_depth = match args.max_depth {
            Some(0) => None,
            Some(depth) => Some(depth),
            None => Some(DEFAULT_MAX_CALL_DEPTH),
        };

        let dump = if args.tokens {
            Some(Dump::Tokens)
        } else if args.ast {
            Some(Dump::Ast)
        } else {
            None
        };

        AppConfig {
            source,
            color_enabled,
            verbose: args.verbose,
            max_call_depth,
            dump,
        }
    }

    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "serpent=debug"
        } else {
            "serpent=warn"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn config(argv: &[&str]) -> AppConfig {
        AppConfig::from_args(&Args::try_parse_from(argv).unwrap())
    }

    #[test]
    fn test_source_selection() {
        assert_eq!(config(&["serpent", "a.sp"]).source, Source::File(PathBuf::from("a.sp")));
        assert_eq!(config(&["serpent", "-c", "pass"]).source, Source::Inline("pass".to_string()));
        assert_eq!(config(&["serpent"]).source, Source::Stdin);
    }

    #[test]
    fn test_max_depth_zero_disables_limit() {
        assert_eq!(config(&["serpent"]).max_call_depth, Some(DEFAULT_MAX_CALL_DEPTH));
        assert_eq!(config(&["serpent", "--max-depth", "0"]).max_call_depth, None);
        assert_eq!(config(&["serpent", "--max-depth", "10"]).max_call_depth, Some(10));
    }

    #[test]
    fn test_color_and_dump() {
        let cfg = config(&["serpent", "--color", "always", "--ast", "-v"]);
        assert!(cfg.color_enabled);
        assert_eq!(cfg.dump, Some(Dump::Ast));
        assert_eq!(cfg.log_filter(), "serpent=debug");
        assert!(!config(&["serpent", "--color", "never"]).color_enabled);
    }
}
