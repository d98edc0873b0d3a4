//! Content blocker CLI
//!
//! CLI tool for compiling filter lists into Safari content blocker JSON.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::Instant;

use clap::{Parser, Subcommand};

use cb_compiler::pipeline::{convert_array, RuleInput};

#[derive(Parser)]
#[command(name = "cb-cli")]
#[command(about = "Safari content blocker list compiler and tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert filter lists into content blocker JSON
    Convert {
        /// Input filter list files
        #[arg(short, long, required = true)]
        input: Vec<String>,

        /// Output JSON file
        #[arg(short, long, default_value = "blockerList.json")]
        output: String,

        /// Maximum number of emitted entries (0 disables the cap)
        #[arg(short, long, default_value_t = 0)]
        limit: usize,

        /// Discard wide generic CSS rules
        #[arg(long)]
        optimize: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Report conversion errors without writing output
    Lint {
        /// Input filter list files
        #[arg(short, long, required = true)]
        input: Vec<String>,
    },
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Convert {
            input,
            output,
            limit,
            optimize,
            verbose,
        } => cmd_convert(&input, &output, limit, optimize, verbose),
        Commands::Lint { input } => cmd_lint(&input),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn read_inputs(inputs: &[String], verbose: bool) -> Result<(Vec<RuleInput>, usize), String> {
    let mut lines = Vec::new();
    let mut total_lines = 0usize;

    for (index, path) in inputs.iter().enumerate() {
        let content =
            fs::read_to_string(path).map_err(|e| format!("Failed to read '{}': {}", path, e))?;

        let line_count = content.lines().count();
        total_lines += line_count;

        if verbose {
            println!(
                "  [{}] {} - {} lines",
                index,
                Path::new(path).file_name().unwrap_or_default().to_string_lossy(),
                line_count
            );
        }

        lines.extend(content.lines().map(RuleInput::from));
    }

    Ok((lines, total_lines))
}

fn cmd_convert(
    inputs: &[String],
    output: &str,
    limit: usize,
    optimize: bool,
    verbose: bool,
) -> Result<(), String> {
    if inputs.is_empty() {
        return Err("No input files specified".to_string());
    }

    let start = Instant::now();
    let (lines, total_lines) = read_inputs(inputs, verbose)?;
    let read_time = start.elapsed();

    let convert_start = Instant::now();
    let result = convert_array(lines, limit, optimize);
    let convert_time = convert_start.elapsed();

    let mut file =
        fs::File::create(output).map_err(|e| format!("Failed to create '{}': {}", output, e))?;
    file.write_all(result.converted.as_bytes())
        .map_err(|e| format!("Failed to write '{}': {}", output, e))?;

    let total_time = start.elapsed();

    println!("Compiled {} filter lists to '{}'", inputs.len(), output);
    println!("  Lines:    {}", total_lines);
    if result.over_limit {
        println!(
            "  Entries:  {} -> {} (limit {})",
            result.total_converted_count, result.converted_count, limit
        );
    } else {
        println!("  Entries:  {}", result.converted_count);
    }
    println!("  Errors:   {}", result.errors_count);
    println!(
        "  Time:     {:.1}ms (read: {:.1}ms, convert: {:.1}ms)",
        total_time.as_secs_f64() * 1000.0,
        read_time.as_secs_f64() * 1000.0,
        convert_time.as_secs_f64() * 1000.0,
    );

    if verbose {
        for error in &result.errors {
            println!("  {error}");
        }
    }

    Ok(())
}

fn cmd_lint(inputs: &[String]) -> Result<(), String> {
    if inputs.is_empty() {
        return Err("No input files specified".to_string());
    }

    let (lines, total_lines) = read_inputs(inputs, false)?;
    let result = convert_array(lines, 0, false);

    println!("Checked {} lines from {} files", total_lines, inputs.len());
    println!("  Entries:  {}", result.converted_count);
    println!("  Errors:   {}", result.errors_count);

    for error in &result.errors {
        println!("  {error}");
    }

    if result.errors_count > 0 {
        return Err(format!("{} rules failed to convert", result.errors_count));
    }

    Ok(())
}
