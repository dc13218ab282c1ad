//! hookrun CLI application

// CLI binary needs to output to stdout/stderr - this is intentional
#![allow(clippy::print_stdout, clippy::print_stderr)]

use hookrun::cli::{self, Cli, Commands, EXIT_ERROR, exit_code_for, render_error};
use hookrun::commands::{self, CommandContext};
use hookrun::shutdown::install_signal_handlers;
use hookrun::tracing::{TracingConfig, TracingFormat, init_tracing_with_events};
use hookrun_events::{CliRenderer, CliRendererConfig, JsonRenderer, emit_shutdown};
use std::io::{IsTerminal, Write};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How long the renderer may take to drain pending events before exit
const RENDERER_DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

fn main() {
    // NOTE: eprintln! in the panic hook is intentional, tracing may be unusable mid-panic
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with RUST_LOG=debug for more information.");
    }));

    // clap exits with code 2 on invalid arguments
    let cli = cli::parse();

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Fatal error: Failed to create tokio runtime: {e}");
            std::process::exit(EXIT_ERROR);
        }
    };

    let exit_code = rt.block_on(run(cli));
    drop(rt);
    std::process::exit(exit_code);
}

async fn run(cli: Cli) -> i32 {
    let json = cli.json;
    let verbose = matches!(&cli.command, Commands::Run(args) if args.verbose);

    let tracing_config = TracingConfig {
        format: if json {
            TracingFormat::Json
        } else {
            TracingFormat::Compact
        },
        level: cli.level.into(),
        detail_events: verbose,
        ..TracingConfig::default()
    };
    let receiver = match init_tracing_with_events(&tracing_config) {
        Ok(rx) => rx,
        Err(err) => {
            render_error(&err, json);
            return exit_code_for(&err);
        }
    };

    let renderer = if json {
        let renderer = JsonRenderer::new();
        tokio::spawn(async move { renderer.run(receiver).await })
    } else {
        let renderer = CliRenderer::with_config(CliRendererConfig {
            verbose,
            ..CliRendererConfig::default()
        });
        tokio::spawn(async move { renderer.run(receiver).await })
    };

    let cancel = CancellationToken::new();
    install_signal_handlers(cancel.clone());

    let ctx = CommandContext {
        config: cli.config,
        cache_dir: cli.cache_dir,
        json,
        colors: !json && std::io::stdout().is_terminal(),
    };
    let result = commands::execute(cli.command, &ctx, &cancel).await;

    // Stops the signal task; the run is over either way
    cancel.cancel();
    emit_shutdown!();
    let _ = tokio::time::timeout(RENDERER_DRAIN_TIMEOUT, renderer).await;

    match result {
        Ok(output) => {
            if !output.stdout.is_empty() {
                let mut stdout = std::io::stdout().lock();
                let _ = writeln!(stdout, "{}", output.stdout.trim_end());
                let _ = stdout.flush();
            }
            output.exit_code
        }
        Err(err) => {
            render_error(&err, json);
            exit_code_for(&err)
        }
    }
}
