use clap::Parser;
use owo_colors::OwoColorize;
use serpent::cli::{generate_completions, Args, Commands};
use serpent::config::{AppConfig, Dump, Source};
use serpent::diagnostic::render_diagnostics;
use serpent::{compile, tokenize, Error, Interpreter};
use std::io::{self, Read};
use std::process::ExitCode;
use tracing::{debug, info};

fn main() -> ExitCode {
    let args = Args::parse();

    if let Some(Commands::Complete { shell }) = args.subcommand {
        generate_completions(shell);
        return ExitCode::SUCCESS;
    }

    let config = AppConfig::from_args(&args);
    init_tracing(&config);

    let source = match read_source(&config.source) {
        Ok(source) => source,
        Err(message) => {
            error_message(&config, &message);
            return ExitCode::FAILURE;
        }
    };
    debug!(bytes = source.len(), source = %config.source.display_name(), "read program");

    let outcome = match config.dump {
        Some(Dump::Tokens) => dump_tokens(&source),
        Some(Dump::Ast) => dump_ast(&source),
        None => execute(&source, &config),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let rendered = render_diagnostics(
                &source,
                &config.source.display_name(),
                &error.to_diagnostics(),
                config.color_enabled,
            );
            eprint!("{}", rendered);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_filter()));
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(config.color_enabled)
                .with_target(true),
        )
        .with(filter)
        .init();
}

fn read_source(source: &Source) -> Result<String, String> {
    match source {
        Source::File(path) => std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read '{}': {}", path.display(), e)),
        Source::Inline(text) => Ok(text.clone()),
        Source::Stdin => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| format!("Failed to read from stdin: {}", e))?;
            Ok(buffer)
        }
    }
}

fn execute(source: &str, config: &AppConfig) -> Result<(), Error> {
    let program = compile(source)?;
    info!(statements = program.len(), "parsed program");
    let mut interpreter = Interpreter::new().with_max_call_depth(config.max_call_depth);
    let env = interpreter.global_environment();
    interpreter.execute(&program, &env)?;
    Ok(())
}

fn dump_tokens(source: &str) -> Result<(), Error> {
    for token in tokenize(source)? {
        println!("{:>4}:{:<3} {}", token.line(), token.column(), token.kind);
    }
    Ok(())
}

fn dump_ast(source: &str) -> Result<(), Error> {
    let program = compile(source)?;
    println!("{:#?}", program);
    Ok(())
}

fn error_message(config: &AppConfig, message: &str) {
    if config.color_enabled {
        eprintln!("{} {}", "error:".red().bold(), message);
    } else {
        eprintln!("error: {}", message);
    }
}
