//! Standalone diagnostic for the response-recovery pipeline.
//!
//! Runs the exact extraction and repair code the agent step uses, so a
//! response that misbehaves in production can be replayed here verbatim.
//! With no arguments it runs a built-in sample suite of known-awkward
//! model outputs.

use clap::Parser;

use screenpilot::response::extract::{extract, ExtractionMethod};
use screenpilot::response::repair::{repair_and_parse, RepairStatus};

#[derive(Parser)]
#[command(name = "parse_debug", about = "Analyze VLM response JSON parsing")]
struct Args {
    /// Raw response text to analyze; omit to run the built-in samples.
    text: Vec<String>,

    /// Payload label to look for in fenced blocks.
    #[arg(long, default_value = "json")]
    data_type: String,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    if args.text.is_empty() {
        run_samples(&args.data_type);
    } else {
        analyze(&args.text.join(" "), &args.data_type);
    }
}

fn analyze(input: &str, data_type: &str) {
    println!("input length: {}", input.len());

    let extraction = extract(input, data_type);
    println!("extraction method: {:?}", extraction.method);
    println!("strategies tried: {}", extraction.attempted.join(", "));
    if extraction.method == ExtractionMethod::Fallback {
        println!("note: no structured region found, candidate is the raw input");
    }
    println!("candidate:\n{}", extraction.text);
    println!("{}", "-".repeat(50));

    let outcome = repair_and_parse(&extraction.text);
    println!("repair status: {:?}", outcome.status);
    for diag in &outcome.diagnostics {
        println!("  diagnostic: {diag}");
    }
    match outcome.status {
        RepairStatus::Fallback => {
            println!("unrecoverable; substituted safe directive:");
        }
        _ => println!("parsed directive:"),
    }
    match serde_json::to_string_pretty(&outcome.directive) {
        Ok(pretty) => println!("{pretty}"),
        Err(e) => println!("(directive not serializable: {e})"),
    }
}

fn run_samples(data_type: &str) {
    let samples: &[(&str, &str)] = &[
        (
            "clean fenced block",
            "```json\n{\n    \"Reasoning\": \"This is a test\",\n    \"Next Action\": \"left_click\",\n    \"Box ID\": 5\n}\n```",
        ),
        (
            "trailing comma",
            "```json\n{\n    \"Reasoning\": \"This is a test\",\n    \"Next Action\": \"left_click\",\n    \"Box ID\": 5,\n}\n```",
        ),
        (
            "bare object, no fences",
            "\n{\n    \"Reasoning\": \"This is a test\",\n    \"Next Action\": \"left_click\",\n    \"Box ID\": 5\n}\n",
        ),
        (
            "prose around the fence",
            "Here is my analysis:\n```json\n{\n    \"Reasoning\": \"This is a test\",\n    \"Next Action\": \"left_click\",\n    \"Box ID\": 5\n}\n```\nHope this helps!",
        ),
        ("empty response", ""),
        (
            "missing comma between fields",
            "```json\n{\n    \"Reasoning\": \"This is a test\"\n    \"Next Action\": \"left_click\",\n    \"Box ID\": 5\n}\n```",
        ),
    ];

    for (i, (name, sample)) in samples.iter().enumerate() {
        println!("\nsample {}: {name}", i + 1);
        println!("{}", "=".repeat(60));
        analyze(sample, data_type);
    }
}
