use std::io::{self, Write};
use std::process::ExitCode;

use minidyn::value::Value;
use minidyn::{FsModuleLoader, Interpreter};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 {
        let path = &args[1];
        let source = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Error reading {path}: {e}");
                return ExitCode::FAILURE;
            }
        };
        let program = match minidyn::parser::parse(&source, path) {
            Ok(p) => p,
            Err(err) => {
                eprintln!("{err}");
                return ExitCode::FAILURE;
            }
        };
        let mut interp = Interpreter::new(Box::new(FsModuleLoader));
        if let Err(err) = interp.run_program(&program, path) {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
        return ExitCode::SUCCESS;
    }

    let mut interp = Interpreter::new(Box::new(FsModuleLoader));
    let mut source = String::new();

    loop {
        let prompt = if source.is_empty() { ">>> " } else { "... " };
        let Some(line) = read_line(prompt) else {
            println!();
            break;
        };

        if source.is_empty() && line.trim().is_empty() {
            continue;
        }

        if !source.is_empty() {
            source.push('\n');
        }
        source.push_str(&line);

        if needs_more_input(&source) {
            continue;
        }

        match minidyn::parser::parse(&source, "<stdin>") {
            Ok(program) => match interp.run_program(&program, "<stdin>") {
                Ok(Value::Nil) => {}
                Ok(value) => println!("{}", value.stringify()),
                Err(err) => eprintln!("{err}"),
            },
            Err(err) => eprintln!("{err}"),
        }
        source.clear();
    }

    ExitCode::SUCCESS
}

/// Heuristic multiline detector for interactive input: an unbalanced
/// bracket or a trailing backslash both mean the snippet isn't finished.
fn needs_more_input(source: &str) -> bool {
    let trimmed = source.trim_end();
    if trimmed.ends_with('\\') {
        return true;
    }

    let mut balance = 0i32;
    for ch in trimmed.chars() {
        match ch {
            '(' | '[' | '{' => balance += 1,
            ')' | ']' | '}' => balance -= 1,
            _ => {}
        }
    }
    balance > 0
}

/// Reads one line from stdin after printing a prompt. Returns `None` on EOF
/// (Ctrl+D).
fn read_line(prompt: &str) -> Option<String> {
    print!("{prompt}");
    if io::stdout().flush().is_err() {
        return None;
    }
    let mut input = String::new();
    let read = io::stdin().read_line(&mut input).ok()?;
    if read == 0 {
        return None;
    }
    Some(input.trim_end_matches(['\r', '\n']).to_owned())
}
