use colored::Colorize;
use roboplan::memory::{InMemoryLog, TrialLog};
use roboplan::protocol::{AllocationFormulator, ParsingOrchestrator};
use roboplan::{PipelineConfig, PipelineCoordinator, Trial};
use std::process::ExitCode;

const DEMO_INSTRUCTION: &str = "limo_scout1 search for the red_block. limo_heavy1 pick it up from \
floor6_hallway and place it on floor2_lab workbench.";

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("roboplan=info")),
        )
        .init();

    let config = match PipelineConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {e}", "config error:".red().bold());
            return ExitCode::FAILURE;
        }
    };

    let parser = match ParsingOrchestrator::from_config(&config) {
        Ok(parser) => parser,
        Err(e) => {
            eprintln!("{} {e}", "client error:".red().bold());
            return ExitCode::FAILURE;
        }
    };

    let args: Vec<String> = std::env::args().skip(1).collect();
    let instruction = if args.is_empty() {
        DEMO_INSTRUCTION.to_string()
    } else {
        args.join(" ")
    };

    let coordinator = PipelineCoordinator::new(parser, AllocationFormulator::default());
    let trial = Trial::new("cli", &instruction);
    let mut log = InMemoryLog::new();

    println!(
        "{} {} ({}) - {} trial(s)",
        "Evaluating".cyan().bold(),
        config.primary.model,
        config.primary.provider,
        config.trials
    );

    let summary = coordinator.run_evaluation(&trial, config.trials, &mut log);

    if let Some(last) = log.records().last() {
        match serde_json::to_string_pretty(last) {
            Ok(json) => println!("--- LAST TRIAL ---\n{json}"),
            Err(e) => eprintln!("failed to render trial record: {e}"),
        }
    }

    let rate = format!("{:.0}%", summary.success_rate() * 100.0);
    println!(
        "--- SUMMARY ---\nparsed: {} | fallbacks: {} | mean retries: {:.2} | logical score: {:.2}",
        if summary.successes == summary.trials { rate.green() } else { rate.yellow() },
        summary.fallbacks,
        summary.mean_retries,
        summary.mean_logical_score
    );

    ExitCode::SUCCESS
}
