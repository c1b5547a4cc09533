/// Template Linter: static checks over template documents.
///
/// Usage: template_linter <file_or_dir>

use procgen_engine::{Generator, Generators};
use std::path::Path;
use std::process;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: template_linter <file_or_dir>");
        process::exit(0);
    }

    let target = &args[1];
    let mut generators = Generators::new();
    let mut load_errors = 0;
    let target_path = Path::new(target);

    if target_path.is_file() {
        match Generators::load_from_file(target_path) {
            Ok(g) => generators.merge(g),
            Err(e) => {
                eprintln!("ERROR: Failed to load template file: {}", e);
                process::exit(1);
            }
        }
    } else if target_path.is_dir() {
        load_documents_recursive(target_path, &mut generators, &mut load_errors);
    } else {
        eprintln!("ERROR: Path '{}' does not exist", target);
        process::exit(1);
    }

    println!("Loaded {} declarations", generators.len());

    let (mut errors, warnings) = lint_generators(&generators);
    if load_errors > 0 {
        errors.push(format!("{} document(s) failed to load", load_errors));
    }

    println!("\n=== Template Lint Report ===\n");

    if errors.is_empty() && warnings.is_empty() {
        println!("All checks passed!");
    }

    for warning in &warnings {
        println!("WARNING: {}", warning);
    }

    for error in &errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nSummary: {} errors, {} warnings",
        errors.len(),
        warnings.len()
    );

    if errors.is_empty() {
        process::exit(0);
    } else {
        process::exit(1);
    }
}

fn load_documents_recursive(dir: &Path, generators: &mut Generators, failures: &mut usize) {
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                load_documents_recursive(&path, generators, failures);
            } else if path.extension().and_then(|s| s.to_str()) == Some("gen") {
                match Generators::load_from_file(&path) {
                    Ok(g) => {
                        println!("  Loaded: {}", path.display());
                        generators.merge(g);
                    }
                    Err(e) => {
                        eprintln!("  ERROR loading {}: {}", path.display(), e);
                        *failures += 1;
                    }
                }
            }
        }
    }
}

fn lint_generators(generators: &Generators) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for name in generators.names() {
        let Some(generator) = generators.generator(name) else {
            continue;
        };

        // References to names nobody declares fall back to their own text.
        let mut reported = Vec::new();
        for reference in generator.references() {
            let reference = reference.as_str();
            if !generators.contains(reference) && !reported.contains(&reference) {
                warnings.push(format!(
                    "'{}' references undeclared name '{}' (it must be supplied as a parameter)",
                    name, reference
                ));
                reported.push(reference);
            }
        }

        let mut single = 0;
        count_single_option_tables(generator, &mut single);
        if single > 0 {
            warnings.push(format!(
                "'{}' has {} bracket(s) with a single alternative",
                name, single
            ));
        }

        if always_recurses(generator, name) {
            errors.push(format!(
                "'{}' has no non-recursive alternative (infinite recursion)",
                name
            ));
        }
    }

    (errors, warnings)
}

/// True when every way of evaluating `generator` reads `name`.
fn always_recurses(generator: &Generator, name: &str) -> bool {
    match generator {
        Generator::Constant(_) => false,
        Generator::Parameter(p) => p.id.as_str() == name,
        Generator::Concatenate(c) => c.parts.iter().any(|part| always_recurses(part, name)),
        Generator::Combine(c) => always_recurses(&c.left, name) || always_recurses(&c.right, name),
        Generator::Table(t) => {
            !t.table.is_empty()
                && t.table
                    .entries()
                    .iter()
                    .all(|entry| always_recurses(&entry.item, name))
        }
    }
}

fn count_single_option_tables(generator: &Generator, count: &mut usize) {
    match generator {
        Generator::Constant(_) | Generator::Parameter(_) => {}
        Generator::Concatenate(c) => {
            for part in &c.parts {
                count_single_option_tables(part, count);
            }
        }
        Generator::Combine(c) => {
            count_single_option_tables(&c.left, count);
            count_single_option_tables(&c.right, count);
        }
        Generator::Table(t) => {
            if t.table.len() == 1 {
                *count += 1;
            }
            for entry in t.table.entries() {
                count_single_option_tables(&entry.item, count);
            }
        }
    }
}
