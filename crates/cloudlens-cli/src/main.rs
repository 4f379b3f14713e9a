use std::path::Path;

use clap::{Parser, Subcommand};
use cloudlens::{Source, Stream};

#[derive(Parser)]
#[command(
    name = "cloudlens",
    about = "CloudLens — stream and reshape structured log records"
)]
struct Cli {
    /// Show diagnostic detail on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Keep only records whose key matches a pattern
    Grep {
        file: String,
        pattern: String,
        #[arg(long, default_value = "message")]
        key: String,
    },
    /// Count matches of a pattern
    Count {
        file: String,
        pattern: String,
        #[arg(long, default_value = "message")]
        key: String,
    },
    /// Bind a pattern's named captures onto matching records
    Annotate {
        file: String,
        pattern: String,
        #[arg(long, default_value = "message")]
        key: String,
    },
}

fn open_stream(file: &str, verbose: bool) -> anyhow::Result<Stream> {
    let path = Path::new(file);
    let is_json = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("json") | Some("jsonl")
    );
    if verbose {
        eprintln!(
            "[cloudlens] opening {file} as {}",
            if is_json { "json" } else { "text" }
        );
    }
    let stream = if is_json {
        Stream::from_json_file(path)?
    } else {
        Stream::from_text_file(path)?
    };
    Ok(stream)
}

fn cmd_grep(file: &str, pattern: &str, key: &str, verbose: bool) -> anyhow::Result<i32> {
    let mut stream = open_stream(file, verbose)?
        .process_matching_at(key, pattern, |_| {})?;
    while let Some(record) = stream.next() {
        println!("{record}");
    }
    Ok(0)
}

fn cmd_count(file: &str, pattern: &str, key: &str, verbose: bool) -> anyhow::Result<i32> {
    let count = std::rc::Rc::new(std::cell::RefCell::new(0u64));
    let count_clone = std::rc::Rc::clone(&count);
    let count_for_report = std::rc::Rc::clone(&count);

    let mut stream = open_stream(file, verbose)?
        .process_matching_at(key, pattern, move |_| {
            *count_clone.borrow_mut() += 1;
        })?
        .at_end(move |_scratch| {
            let n = *count_for_report.borrow();
            println!("{n} match{}", if n == 1 { "" } else { "es" });
        });

    while stream.next().is_some() {}
    Ok(0)
}

fn cmd_annotate(file: &str, pattern: &str, key: &str, verbose: bool) -> anyhow::Result<i32> {
    let mut stream = open_stream(file, verbose)?.annotate_at(key, pattern)?;
    while let Some(record) = stream.next() {
        println!("{record}");
    }
    Ok(0)
}

fn main() {
    let cli = Cli::parse();
    let result = match &cli.command {
        Commands::Grep { file, pattern, key } => cmd_grep(file, pattern, key, cli.verbose),
        Commands::Count { file, pattern, key } => cmd_count(file, pattern, key, cli.verbose),
        Commands::Annotate { file, pattern, key } => cmd_annotate(file, pattern, key, cli.verbose),
    };

    let exit_code = result.unwrap_or_else(|e| {
        eprintln!("[cloudlens] error: {e:#}");
        1
    });
    std::process::exit(exit_code);
}
