//! CLI entry point for the RV32IM assembler and runner.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
#[cfg(test)]
use tempfile as _;
use thiserror as _;

use rv32_asm::assembler::{assemble_file, AssembleError, Program};
use rv32_asm::encoder::{words_to_le_bytes, words_to_text};
use rv32_asm::errors::render_execution_error;
use rv32_core::{disassemble, CoreConfig, Engine, TraceEvent, TraceSink, DEFAULT_MEMORY_WORDS};
use tracing::debug;
use tracing_subscriber as _;

const DEFAULT_MAX_STEPS: u64 = 1_000_000;

const USAGE_TEXT: &str = "\
Usage: rv32-asm <command> [options]

Commands:
  build <input> [-o <output>] [--text] [--verbose]  Assemble source to machine code
  run   <input> [--max-steps N] [--memory-words N] [--trace] [--verbose]
                                                    Assemble and execute a program

Options:
  -o, --output <file>     Output file path (default: input stem + .bin, or .txt with --text)
  -t, --text              Write one 32-bit binary string per line instead of raw bytes
      --max-steps <n>     Stop after n instructions (default: 1000000)
      --memory-words <n>  Data memory size in 32-bit words (default: 2048)
      --trace             Print every executed instruction to stderr
  -v, --verbose           Print a listing to stderr and enable debug logging
  -h, --help              Show this help message

Logging is controlled by RUST_LOG (for example RUST_LOG=rv32_core=trace).

Examples:
  rv32-asm build program.s
  rv32-asm build program.s -o program.bin
  rv32-asm run program.s --max-steps 500
";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Build(BuildArgs),
    Run(RunArgs),
}

#[derive(Debug, PartialEq, Eq)]
struct BuildArgs {
    input: PathBuf,
    output: Option<PathBuf>,
    text: bool,
    verbose: bool,
}

#[derive(Debug, PartialEq, Eq)]
struct RunArgs {
    input: PathBuf,
    max_steps: u64,
    memory_words: u32,
    trace: bool,
    verbose: bool,
}

#[derive(Debug)]
enum ParseResult {
    Command(Command),
    Help,
}

fn parse_args(mut args: impl Iterator<Item = OsString>) -> Result<ParseResult, String> {
    let first = args.next().ok_or_else(|| "missing command".to_string())?;

    if first == "--help" || first == "-h" {
        return Ok(ParseResult::Help);
    }

    let command_str = first.to_string_lossy().to_string();

    match command_str.as_str() {
        "build" => parse_build_args(args)
            .map(Command::Build)
            .map(ParseResult::Command),
        "run" => parse_run_args(args)
            .map(Command::Run)
            .map(ParseResult::Command),
        other => Err(format!("unknown command: {other}")),
    }
}

fn set_input(input: &mut Option<PathBuf>, arg: OsString) -> Result<(), String> {
    if arg.to_string_lossy().starts_with('-') {
        return Err(format!("unknown option: {}", arg.to_string_lossy()));
    }
    if input.is_some() {
        return Err("multiple input paths provided".to_string());
    }
    *input = Some(PathBuf::from(arg));
    Ok(())
}

fn numeric_value<T: std::str::FromStr>(
    args: &mut impl Iterator<Item = OsString>,
    flag: &str,
) -> Result<T, String> {
    let value = args
        .next()
        .ok_or_else(|| format!("missing value for {flag}"))?;
    value
        .to_string_lossy()
        .parse()
        .map_err(|_| format!("invalid value for {flag}: {}", value.to_string_lossy()))
}

#[allow(clippy::while_let_on_iterator)]
fn parse_build_args(mut args: impl Iterator<Item = OsString>) -> Result<BuildArgs, String> {
    let mut input: Option<PathBuf> = None;
    let mut output: Option<PathBuf> = None;
    let mut text = false;
    let mut verbose = false;

    while let Some(arg) = args.next() {
        if arg == "--help" || arg == "-h" {
            return Err(USAGE_TEXT.to_string());
        }

        if arg == "--verbose" || arg == "-v" {
            verbose = true;
            continue;
        }

        if arg == "--text" || arg == "-t" {
            text = true;
            continue;
        }

        if arg == "-o" || arg == "--output" {
            let value = args
                .next()
                .ok_or_else(|| "missing value for -o".to_string())?;
            output = Some(PathBuf::from(value));
            continue;
        }

        set_input(&mut input, arg)?;
    }

    let input = input.ok_or_else(|| "missing input path".to_string())?;
    Ok(BuildArgs {
        input,
        output,
        text,
        verbose,
    })
}

#[allow(clippy::while_let_on_iterator)]
fn parse_run_args(mut args: impl Iterator<Item = OsString>) -> Result<RunArgs, String> {
    let mut input: Option<PathBuf> = None;
    let mut max_steps = DEFAULT_MAX_STEPS;
    let mut memory_words = DEFAULT_MEMORY_WORDS;
    let mut trace = false;
    let mut verbose = false;

    while let Some(arg) = args.next() {
        if arg == "--help" || arg == "-h" {
            return Err(USAGE_TEXT.to_string());
        }

        if arg == "--verbose" || arg == "-v" {
            verbose = true;
            continue;
        }

        if arg == "--trace" {
            trace = true;
            continue;
        }

        if arg == "--max-steps" {
            max_steps = numeric_value(&mut args, "--max-steps")?;
            continue;
        }

        if arg == "--memory-words" {
            memory_words = numeric_value(&mut args, "--memory-words")?;
            continue;
        }

        set_input(&mut input, arg)?;
    }

    let input = input.ok_or_else(|| "missing input path".to_string())?;
    Ok(RunArgs {
        input,
        max_steps,
        memory_words,
        trace,
        verbose,
    })
}

fn init_logging(verbose: bool) {
    if let Err(error) = rv32_asm::logging::init(verbose) {
        eprintln!("warning: logging unavailable: {error}");
    }
}

fn default_output_path(input: &Path, text: bool) -> PathBuf {
    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("out");

    let parent = input.parent().unwrap_or_else(|| Path::new(""));

    let extension = if text { "txt" } else { "bin" };
    parent.join(format!("{stem}.{extension}"))
}

fn load_program(input: &Path) -> Result<Program, i32> {
    assemble_file(input).map_err(|error| {
        match &error {
            AssembleError::Io { .. } => eprintln!("error: {error}"),
            AssembleError::Parse(failure) => {
                eprintln!("{}: {}", input.display(), failure.format_for_stderr());
            }
        }
        1
    })
}

fn run_build(args: BuildArgs) -> Result<(), i32> {
    let program = load_program(&args.input)?;

    let output_path = args
        .output
        .unwrap_or_else(|| default_output_path(&args.input, args.text));

    let contents = if args.text {
        words_to_text(&program.words).into_bytes()
    } else {
        words_to_le_bytes(&program.words)
    };

    if let Err(e) = fs::write(&output_path, &contents) {
        eprintln!("error: failed to write output: {e}");
        return Err(1);
    }

    if args.verbose {
        print_listing(&program);
    }

    println!(
        "Assembled {} ({} instructions) -> {}",
        args.input.display(),
        program.words.len(),
        output_path.display()
    );

    Ok(())
}

fn print_listing(program: &Program) {
    for entry in &program.listing {
        eprintln!(
            "{:08X}: {:08X}  {:<28} ; line {}",
            entry.address, entry.word, entry.source, entry.source_line
        );
    }
}

struct StderrTrace;

impl TraceSink for StderrTrace {
    fn on_event(&mut self, event: TraceEvent) {
        match event {
            TraceEvent::InstructionStart { pc, raw_word } => {
                let text = disassemble(raw_word).unwrap_or_else(|| "<unsupported>".to_string());
                eprintln!("[{pc:08X}] {raw_word:08X}  {text}");
            }
            TraceEvent::RegisterWrite { reg, value } => eprintln!("           {reg} <- {value:#010x}"),
            TraceEvent::MemoryWrite { address, value } => {
                eprintln!("           mem[{address:#010x}] <- {value:#010x}");
            }
            TraceEvent::InstructionRetired { .. } => {}
            TraceEvent::ErrorRaised { error, pc } => eprintln!("           {error} at pc {pc:#010x}"),
        }
    }
}

fn run_program(args: &RunArgs) -> Result<(), i32> {
    let program = load_program(&args.input)?;

    let mut engine = Engine::new(CoreConfig {
        memory_words: args.memory_words,
        tracing_enabled: args.trace,
    });
    if args.trace {
        engine.set_trace_sink(Box::new(StderrTrace));
    }
    engine.load_program(&program.words);

    let outcome = engine.run(args.max_steps);
    debug!(steps = outcome.steps, "run finished");

    print_status(&engine);
    println!("steps: {}", outcome.steps);

    match outcome.final_step {
        Some(step) if step.is_terminated() => Ok(()),
        Some(step) => match (step.error, step.error_index) {
            (Some(error), Some(index)) => {
                let line = program.source_line_of(index).unwrap_or(0);
                eprintln!("{}", render_execution_error(error, line));
                Err(1)
            }
            _ => {
                eprintln!("error: step limit of {} reached", args.max_steps);
                Err(1)
            }
        },
        None => {
            eprintln!("error: step limit of {} reached", args.max_steps);
            Err(1)
        }
    }
}

#[allow(clippy::cast_possible_wrap)]
fn print_status(engine: &Engine) {
    let status = engine.status();
    for (index, &value) in status.registers.iter().enumerate() {
        println!("x{index:<2} = {value:#010x} ({})", value as i32);
    }
    println!("pc  = {:#010x}", status.pc);
}

fn main() {
    let exit_code = match parse_args(env::args_os().skip(1)) {
        Ok(ParseResult::Help) => {
            println!("{USAGE_TEXT}");
            0
        }
        Ok(ParseResult::Command(Command::Build(args))) => {
            init_logging(args.verbose);
            match run_build(args) {
                Ok(()) => 0,
                Err(code) => code,
            }
        }
        Ok(ParseResult::Command(Command::Run(args))) => {
            init_logging(args.verbose);
            match run_program(&args) {
                Ok(()) => 0,
                Err(code) => code,
            }
        }
        Err(error) => {
            if error.starts_with("Usage:") {
                println!("{error}");
            } else {
                eprintln!("error: {error}");
                eprintln!("{USAGE_TEXT}");
            }
            1
        }
    };

    std::process::exit(exit_code);
}
