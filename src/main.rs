//! Network Speed Monitor - Main CLI Application
//!
//! Runs a single speed test or a continuous stability test and prints the
//! session's events as they arrive.

use clap::Parser;
use network_speed_monitor::{
    cli::Cli,
    config::{display_config_summary, load_config, validate_config, EnvManager},
    error::{exit_codes, AppError, ErrorReporter, Result},
    events::{EventStream, SessionEvent},
    log_debug, log_error, log_info, log_warn,
    logging::{Logger, LoggerFactory},
    output::OutputCoordinator,
    provider::HttpProviderFactory,
    session::SessionManager,
    PKG_NAME, VERSION,
};
use std::process;
use std::sync::Arc;

/// Exit code after a second Ctrl-C
const INTERRUPTED_EXIT_CODE: i32 = 130;

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
        process::exit(exit_codes::INTERNAL);
    }));

    let cli = Cli::parse();
    let reporter = ErrorReporter::new(cli.use_colors(), cli.verbose);

    match run_application(cli).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            reporter.report_error(&e);
            process::exit(e.exit_code());
        }
    }
}

fn build_info() -> String {
    match (option_env!("GIT_COMMIT"), option_env!("BUILD_TIME")) {
        (Some(commit), Some(time)) => format!(" ({} built {})", commit, time),
        (None, Some(time)) => format!(" (built {})", time),
        _ => String::new(),
    }
}

/// Main application logic; returns the process exit code
async fn run_application(cli: Cli) -> Result<i32> {
    cli.validate().map_err(AppError::validation)?;

    if cli.debug {
        eprintln!("{} v{}{}", PKG_NAME, VERSION, build_info());
        eprint!("{}", cli.get_config_summary());
    }

    let config = load_config(cli.clone())?;
    let output = OutputCoordinator::from_flags(cli.use_colors() && config.enable_color, config.verbose, cli.json);

    if config.debug {
        eprintln!("{}", display_config_summary(&config));
    }
    if config.verbose || config.debug {
        for problem in EnvManager::validate_current_env() {
            eprintln!("{}", output.render_warning(&problem)?);
        }
        for warning in validate_config(&config)? {
            eprintln!("{}", warning.format(cli.use_colors()));
        }
    }

    let loggers = LoggerFactory::new(config.clone());
    let app_logger = loggers.create_logger("APP").await;
    let error_logger = loggers.create_error_logger().await;
    log_debug!(
        app_logger,
        "Loaded {} server(s), meta endpoint {}",
        config.servers.len(),
        config.meta_url
    );

    let factory = HttpProviderFactory::new(config.clone())?;
    let manager = SessionManager::new(
        Arc::new(factory),
        config.timings(),
        loggers.create_session_logger().await,
    );

    if cli.list_servers {
        return match manager.list_servers(config.server_list_limit).await {
            Ok(servers) => {
                println!("{}", output.render_server_list(&servers)?);
                Ok(0)
            }
            Err(e) => {
                error_logger.log_error(&e, Some("list servers"), None).await;
                println!("{}", output.render_server_list_error(&e.to_string())?);
                Ok(e.exit_code())
            }
        };
    }

    let session_id = cli.session_id();
    let stream = if cli.continuous {
        log_info!(
            app_logger,
            "Starting continuous test {} for {} min",
            session_id,
            config.duration_minutes
        );
        manager
            .start_continuous_test(&session_id, config.duration_minutes, cli.server.clone())
            .await?
    } else {
        log_info!(app_logger, "Starting single test {}", session_id);
        manager.start_single_test(&session_id, cli.server.clone()).await?
    };

    let summary = print_events(&manager, &session_id, stream, &output, &app_logger).await?;

    if let Some(message) = summary.failure {
        log_error!(app_logger, "Session {} ended without a result: {}", session_id, message);
        return Ok(exit_codes::MEASUREMENT);
    }

    Ok(0)
}

/// What the printed stream amounted to
#[derive(Debug, Default)]
struct StreamSummary {
    /// Set when the session produced no terminal result
    failure: Option<String>,
}

/// Print events until the session ends, turning Ctrl-C into a stop request
async fn print_events(
    manager: &SessionManager,
    session_id: &str,
    mut stream: EventStream,
    output: &OutputCoordinator,
    logger: &Logger,
) -> Result<StreamSummary> {
    let mut stop_requested = false;
    let mut signals_available = true;
    let mut last_error: Option<String> = None;
    let mut got_result = false;
    let mut stopped = false;

    loop {
        tokio::select! {
            event = stream.recv() => {
                let Some(event) = event else { break };

                match &event {
                    SessionEvent::Final(_) | SessionEvent::Continuous(_) => got_result = true,
                    SessionEvent::Error { message, .. } => last_error = Some(message.clone()),
                    SessionEvent::TestStopped { .. } => stopped = true,
                    _ => {}
                }

                if let Some(line) = output.render_event(&event)? {
                    println!("{}", line);
                }
            }
            signal = tokio::signal::ctrl_c(), if signals_available => {
                if signal.is_err() {
                    signals_available = false;
                    continue;
                }
                if stop_requested {
                    process::exit(INTERRUPTED_EXIT_CODE);
                }
                stop_requested = true;
                log_warn!(logger, "Interrupted; stopping session {}", session_id);
                manager.stop_test(session_id).await;
                if !output.is_json() {
                    eprintln!(
                        "{}",
                        output.render_warning("Stop requested; finishing the current pass (Ctrl-C again to abort)")?
                    );
                }
            }
        }
    }

    let failure = if got_result || stopped {
        None
    } else {
        Some(last_error.unwrap_or_else(|| "session ended without a result".to_string()))
    };

    Ok(StreamSummary { failure })
}
