//! Command-line runner for the interpreter.
//!
//! # Usage
//! ```text
//! asm_interpreter <file> [--max-steps <n>]
//! ```
//!
//! Prints the program's output on success. Parse and execution failures are
//! rendered as compiler-style diagnostics on stderr. A program that falls off
//! the end without `END` produces no output and exit code 2.

use asm_interpreter::errors::VmError;
use asm_interpreter::parser::{parse_source, render_diagnostic};
use asm_interpreter::vm::Vm;
use std::env;
use std::fs;
use std::process;

fn print_usage(binary: &str) {
    eprintln!("usage: {binary} <file> [--max-steps <n>]");
    eprintln!();
    eprintln!("options:");
    eprintln!("  --max-steps <n>   abort the run after fetching n lines");
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage(&args[0]);
        process::exit(if args.len() < 2 { 1 } else { 0 });
    }

    let path = &args[1];
    let mut max_steps: Option<u64> = None;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--max-steps" => {
                i += 1;
                match args.get(i).and_then(|v| v.parse().ok()) {
                    Some(value) => max_steps = Some(value),
                    None => {
                        eprintln!("error: --max-steps expects a number");
                        process::exit(1);
                    }
                }
            }
            other => {
                eprintln!("error: unknown option `{other}`");
                print_usage(&args[0]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            let err = VmError::IoError {
                path: path.clone(),
                reason: err.to_string(),
            };
            eprintln!("error: {err}");
            process::exit(1);
        }
    };

    let program = match parse_source(&source) {
        Ok(program) => program,
        Err(err) => {
            eprint!("{}", render_diagnostic(path, &source, &err));
            process::exit(1);
        }
    };

    let mut vm = Vm::new(&program);
    if let Some(limit) = max_steps {
        vm = vm.step_limit(limit);
    }

    match vm.run() {
        Ok(Some(output)) => println!("{output}"),
        Ok(None) => {
            eprintln!("{path}: program ended without END; no output produced");
            process::exit(2);
        }
        Err(err) => {
            eprint!("{}", render_diagnostic(path, &source, &err));
            process::exit(1);
        }
    }
}
