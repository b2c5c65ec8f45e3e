use std::path::PathBuf;
use std::process;

use bazaar_interchange::ResourceRef;
use bazaar_store::{Entity, Strictness};

use super::load_store;
use crate::config::Config;
use crate::{report_error, OutputFormat};

/// Parse a `type/id` argument.
pub(crate) fn parse_ref(arg: &str) -> Result<ResourceRef, String> {
    match arg.split_once('/') {
        Some((kind, id)) if !kind.is_empty() && !id.is_empty() => Ok(ResourceRef::new(kind, id)),
        _ => Err(format!("invalid reference '{}': expected TYPE/ID", arg)),
    }
}

pub(crate) fn cmd_resolve(
    responses: &[PathBuf],
    ref_args: &[String],
    strict: bool,
    config: &Config,
    output: OutputFormat,
    quiet: bool,
) {
    let mut refs = Vec::with_capacity(ref_args.len());
    for arg in ref_args {
        match parse_ref(arg) {
            Ok(r) => refs.push(r),
            Err(msg) => {
                report_error(&msg, output, quiet);
                process::exit(1);
            }
        }
    }

    let allow = config.allow_list();
    let (store, last) = load_store(responses, allow.as_ref(), output, quiet);
    if refs.is_empty() {
        refs = last.data;
    }

    let strictness = if strict {
        Strictness::Strict
    } else {
        Strictness::Tolerant
    };
    let resolution = match store.resolve(&refs, strictness) {
        Ok(r) => r,
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    };

    match output {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&resolution.to_json()).unwrap_or_default()
            );
        }
        OutputFormat::Text => {
            for (reference, entity) in refs.iter().zip(resolution.entities()) {
                match entity {
                    Some(entity) => print_entity(&entity),
                    None => println!("{} (not found)", reference),
                }
            }
        }
    }
}

fn print_entity(entity: &Entity<'_>) {
    println!("{}", entity.reference());
    for (key, value) in entity.attributes() {
        println!("  {} = {}", key, value.to_json());
    }
    for name in entity.relationship_names() {
        if let Some(related) = entity.related(name) {
            println!("  {} -> {}", name, related.reference());
            continue;
        }
        let many = entity.related_many(name);
        if many.is_empty() {
            println!("  {} -> (none)", name);
        } else {
            let targets: Vec<String> = many.iter().map(|e| e.reference().to_string()).collect();
            println!("  {} -> [{}]", name, targets.join(", "));
        }
    }
}
