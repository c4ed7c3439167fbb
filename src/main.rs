//! Command-line driver: evaluates an expression against JSON read from a
//! file or standard input, or prints the parsed tree with `--ast`.

use std::fs;
use std::io::Read;
use std::process::ExitCode;

use clap::Parser;
use serde_json::Value;

use jmespath::Error;

#[derive(Parser)]
#[command(name = "jp", about = "Evaluate a JMESPath expression against JSON data.")]
struct Cli {
    /// The expression to compile and evaluate.
    expression: String,

    /// Print the parsed expression tree and exit.
    #[arg(long)]
    ast: bool,

    /// File containing the JSON data to search. Reads standard input when
    /// not given.
    #[arg(long, value_name = "PATH")]
    input: Option<String>,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let query = jmespath::compile(&cli.expression).map_err(|e| match e {
        Error::Syntax(syntax) => format!("{syntax}\n{}", syntax.highlight()),
        other => other.to_string(),
    })?;

    if cli.ast {
        println!("{}", query.ast());
        return Ok(());
    }

    let raw = match &cli.input {
        Some(path) => {
            fs::read_to_string(path).map_err(|e| format!("error loading file {path}: {e}"))?
        }
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| format!("error reading from stdin: {e}"))?;
            buffer
        }
    };
    let data: Value =
        serde_json::from_str(&raw).map_err(|e| format!("invalid input JSON: {e}"))?;

    let result = query
        .search(&data)
        .map_err(|e| format!("error executing expression: {e}"))?;
    let rendered = serde_json::to_string_pretty(&result)
        .map_err(|e| format!("error serializing result to JSON: {e}"))?;
    println!("{rendered}");
    Ok(())
}
