use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "serpent")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Interpreter for a small indentation-structured scripting language", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Args {
    /// Script to run; reads stdin when neither this nor `-c` is given.
    #[arg(value_name = "SCRIPT", conflicts_with = "command")]
    pub script: Option<PathBuf>,

    /// Program text passed inline.
    #[arg(short = 'c', long = "command", value_name = "SOURCE")]
    pub command: Option<String>,

    #[arg(long = "color", value_name = "WHEN", value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Maximum nesting of user function calls; 0 disables the limit.
    #[arg(long = "max-depth", value_name = "N")]
    pub max_depth: Option<usize>,

    /// Print the token stream instead of running.
    #[arg(long = "tokens", conflicts_with = "ast")]
    pub tokens: bool,

    /// Print the syntax tree instead of running.
    #[arg(long = "ast")]
    pub ast: bool,

    #[command(subcommand)]
    pub subcommand: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate shell completions.
    Complete {
        #[arg(value_name = "SHELL")]
        shell: Shell,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    Auto,
    Always,
    Never,
}

pub fn generate_completions(shell: Shell) {
    let mut cmd = Args::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, &bin_name, &mut io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_script_and_flags() {
        let args = Args::try_parse_from(["serpent", "prog.sp", "--color", "never", "--max-depth", "50"]).unwrap();
        assert_eq!(args.script, Some(PathBuf::from("prog.sp")));
        assert_eq!(args.color, ColorChoice::Never);
        assert_eq!(args.max_depth, Some(50));
        assert!(!args.verbose);
    }

    #[test]
    fn test_script_conflicts_with_inline_source() {
        assert!(Args::try_parse_from(["serpent", "prog.sp", "-c", "print(1)"]).is_err());
    }

    #[test]
    fn test_complete_subcommand() {
        let args = Args::try_parse_from(["serpent", "complete", "bash"]).unwrap();
        assert!(matches!(args.subcommand, Some(Commands::Complete { shell: Shell::Bash })));
    }
}
