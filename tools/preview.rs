//! Preview: interactive generation shell for testing template documents.
//!
//! Usage: preview [<document>...] [--settings <ron>] [--seed <n>]
//!
//! Commands:
//!   gen <name> [n]       generate n values (default: settings count) as one batch
//!   bulk <name> <n>      generate n values and report variety statistics
//!   set <param> <value>  set a text parameter
//!   unset <param>        remove a parameter
//!   params               list parameters
//!   seed <n>             reset the stream with a new seed
//!   list                 list declared generators
//!   help                 list commands
//!   quit                 exit

use procgen_engine::core::config::GenerationSettings;
use procgen_engine::core::symbol::Symbol;
use procgen_engine::{Generators, Stream, Value};
use std::collections::HashSet;
use std::io::{self, BufRead, Write};
use std::path::Path;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    let mut documents = Vec::new();
    let mut settings_path = None;
    let mut seed_override = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--settings" if i + 1 < args.len() => {
                i += 1;
                settings_path = Some(args[i].clone());
            }
            "--seed" if i + 1 < args.len() => {
                i += 1;
                match args[i].parse::<u64>() {
                    Ok(s) => seed_override = Some(s),
                    Err(_) => {
                        eprintln!("Invalid seed: {}", args[i]);
                        std::process::exit(1);
                    }
                }
            }
            arg if arg.starts_with("--") => {
                eprintln!("Unknown argument: {}", arg);
                print_usage();
                std::process::exit(1);
            }
            document => documents.push(document.to_string()),
        }
        i += 1;
    }

    let mut settings = match settings_path {
        Some(ref path) => match GenerationSettings::load_from_ron(Path::new(path)) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("ERROR: Failed to load settings {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => GenerationSettings::default(),
    };
    if let Some(seed) = seed_override {
        settings.seed = seed;
    }

    let mut generators = match Generators::from_settings(&settings) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };
    for document in &documents {
        match Generators::load_from_file(Path::new(document)) {
            Ok(g) => {
                println!("Loaded: {}", document);
                generators.merge(g);
            }
            Err(e) => {
                eprintln!("ERROR loading {}: {}", document, e);
                std::process::exit(1);
            }
        }
    }

    println!("Loaded {} generators", generators.len());
    println!("Seed: {}", settings.seed);
    println!("Type 'help' for commands.\n");

    let mut parameters = settings.parameters();
    let mut current_seed = settings.seed;
    let mut stream = Stream::new(current_seed);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("preview> ");
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        let cmd = parts[0].to_lowercase();

        match cmd.as_str() {
            "quit" | "exit" | "q" => {
                println!("Goodbye.");
                break;
            }
            "help" | "h" | "?" => {
                print_help();
            }
            "gen" | "g" => {
                if parts.len() < 2 {
                    println!("Usage: gen <name> [n]");
                    continue;
                }
                let count = match parts.get(2).map(|n| n.parse::<usize>()) {
                    None => settings.count,
                    Some(Ok(n)) => n,
                    Some(Err(_)) => {
                        println!("Invalid count: {}", parts[2]);
                        continue;
                    }
                };
                match generators.get_batch::<String, _>(parts[1], &parameters, &mut stream, count) {
                    Ok(values) => {
                        for value in values {
                            println!("{}", value);
                        }
                    }
                    Err(e) => println!("ERROR: {}", e),
                }
            }
            "bulk" => {
                if parts.len() < 3 {
                    println!("Usage: bulk <name> <n>");
                    continue;
                }
                let count: usize = match parts[2].parse() {
                    Ok(n) if n > 0 => n,
                    _ => {
                        println!("Invalid count: {}", parts[2]);
                        continue;
                    }
                };
                match generators.get_batch::<String, _>(parts[1], &parameters, &mut stream, count) {
                    Ok(values) => print_variety(&values),
                    Err(e) => println!("ERROR: {}", e),
                }
            }
            "set" => {
                if parts.len() < 3 {
                    println!("Usage: set <param> <value>");
                    continue;
                }
                let value = parts[2..].join(" ");
                parameters.insert(Symbol::new(parts[1]), Value::from(value.as_str()));
                println!("{} = {}", parts[1], value);
            }
            "unset" => {
                if parts.len() < 2 {
                    println!("Usage: unset <param>");
                    continue;
                }
                if parameters.remove(parts[1]).is_none() {
                    println!("Parameter '{}' is not set", parts[1]);
                }
            }
            "params" => {
                if parameters.is_empty() {
                    println!("No parameters set.");
                }
                let mut entries: Vec<(&Symbol, &Value)> = parameters.iter().collect();
                entries.sort_by(|a, b| a.0.cmp(b.0));
                for (name, value) in entries {
                    println!("  {} = {}", name, value);
                }
            }
            "seed" => {
                if parts.len() < 2 {
                    println!("Current seed: {}", current_seed);
                    continue;
                }
                match parts[1].parse::<u64>() {
                    Ok(s) => {
                        current_seed = s;
                        stream = Stream::new(current_seed);
                        println!("Seed set to {}", current_seed);
                    }
                    Err(_) => {
                        println!("Invalid seed: {}", parts[1]);
                    }
                }
            }
            "list" | "ls" => {
                for name in generators.names() {
                    println!("  {}", name);
                }
            }
            _ => {
                println!("Unknown command: {}. Type 'help' for commands.", cmd);
            }
        }
    }
}

fn print_variety(values: &[String]) {
    let unique: HashSet<&String> = values.iter().collect();
    let total_len: usize = values.iter().map(|v| v.chars().count()).sum();

    println!("\n=== Bulk Generation Report ===");
    println!("Values: {}", values.len());
    println!("Unique: {} / {}", unique.len(), values.len());
    println!(
        "Average length: {:.1} characters",
        total_len as f64 / values.len() as f64
    );
    println!("Samples:");
    for value in values.iter().take(5) {
        println!("  {}", value);
    }
    println!();
}

fn print_usage() {
    println!("Usage: preview [<document>...] [--settings <ron>] [--seed <n>]");
    println!();
    println!("Loads template documents and opens an interactive generation shell.");
}

fn print_help() {
    println!("Commands:");
    println!("  gen <name> [n]              Generate n values as one batch");
    println!("  bulk <name> <n>             Generate n values with variety statistics");
    println!("  set <param> <value>         Set a text parameter");
    println!("  unset <param>               Remove a parameter");
    println!("  params                      List parameters");
    println!("  seed <n>                    Reset the stream with a new seed");
    println!("  list                        List declared generators");
    println!("  help                        Show this help");
    println!("  quit                        Exit");
}
