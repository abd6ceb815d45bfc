use clap::{crate_version, App, Arg};
use std::fs;
use std::io::{self, BufRead, Write};
use std::process;
use tlox::lox::{Lox, Status};
use tracing::debug;

fn main() {
    let matches = App::new("tlox")
        .version(crate_version!())
        .about("Tree-walking interpreter for Lox")
        .arg(
            Arg::with_name("script")
                .help("Script to run; starts an interactive prompt when omitted")
                .index(1),
        )
        .arg(
            Arg::with_name("print-ast")
                .long("print-ast")
                .help("Print each parsed statement as a parenthesized tree"),
        )
        .get_matches();

    init_tracing();

    let lox = Lox::stdio().print_ast(matches.is_present("print-ast"));
    let code = match matches.value_of("script") {
        Some(path) => run_file(lox, path),
        None => run_prompt(lox),
    };
    process::exit(code);
}

/// Installs a stderr subscriber, but only when `RUST_LOG` asks for one.
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(io::stderr).with_target(true))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn run_file(mut lox: Lox<io::Stdout, io::Stderr>, path: &str) -> i32 {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Could not read '{}': {}", path, e);
            return 66;
        }
    };
    let contents = match String::from_utf8(bytes) {
        Ok(contents) => contents,
        Err(e) => {
            eprintln!("'{}' is not valid UTF-8: {}", path, e);
            return Status::SyntaxError.exit_code();
        }
    };
    match lox.run(&contents) {
        Ok(status) => {
            debug!(%status, "script finished");
            status.exit_code()
        }
        Err(e) => {
            eprintln!("{}", e);
            74
        }
    }
}

fn run_prompt(mut lox: Lox<io::Stdout, io::Stderr>) -> i32 {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    loop {
        print!("> ");
        if let Err(e) = io::stdout().flush() {
            eprintln!("{}", e);
            return 74;
        }
        let mut line = String::new();
        match input.read_line(&mut line) {
            Ok(0) => {
                println!();
                return 0;
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}", e);
                return 74;
            }
        }
        // Errors are already reported; the session carries on either way.
        if let Err(e) = lox.run(&line) {
            eprintln!("{}", e);
            return 74;
        }
    }
}
