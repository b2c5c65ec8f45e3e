use std::process;

use bazaar_process::ProcessDefinition;
use serde_json::json;

use crate::config::Config;
use crate::{report_error, OutputFormat};

pub(crate) fn cmd_processes(config: &Config, output: OutputFormat, quiet: bool) {
    let registry = match config.registry() {
        Ok(r) => r,
        Err(e) => {
            report_error(&format!("invalid process configuration: {}", e), output, quiet);
            process::exit(1);
        }
    };

    let aliases_of = |name: &str| -> Vec<String> {
        registry
            .aliases()
            .filter(|(_, current)| *current == name)
            .map(|(alias, _)| alias.to_string())
            .collect()
    };

    match output {
        OutputFormat::Json => {
            let list: Vec<serde_json::Value> = registry
                .definitions()
                .map(|def| {
                    json!({
                        "name": def.name,
                        "kind": def.kind,
                        "aliases": aliases_of(&def.name),
                        "initialState": def.initial_state,
                        "terminalStates": def.terminal_states,
                        "transitions": def.transitions.values().collect::<Vec<_>>(),
                    })
                })
                .collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&list).unwrap_or_default()
            );
        }
        OutputFormat::Text => {
            for (i, def) in registry.definitions().enumerate() {
                if i > 0 {
                    println!();
                }
                print_definition(def, &aliases_of(&def.name));
            }
        }
    }
}

fn print_definition(def: &ProcessDefinition, aliases: &[String]) {
    println!("{}", def.name);
    if !aliases.is_empty() {
        println!("  aliases: {}", aliases.join(", "));
    }
    let terminal: Vec<&str> = def.terminal_states.iter().map(|s| s.as_str()).collect();
    println!("  terminal: {}", terminal.join(", "));
    for t in def.transitions.values() {
        let from: Vec<&str> = t.from.iter().map(|s| s.as_str()).collect();
        println!(
            "  {}: {} -> {} ({}{})",
            t.name,
            from.join("|"),
            t.to,
            t.actor,
            if t.privileged { ", privileged" } else { "" }
        );
    }
}
