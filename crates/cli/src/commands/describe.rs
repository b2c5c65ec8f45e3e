use std::path::PathBuf;
use std::process;

use bazaar_interchange::ResourceRef;
use bazaar_process::{check_totals, Description, Lifecycle, Role, Transaction};
use bazaar_store::Strictness;

use super::load_store;
use crate::config::Config;
use crate::{report_error, OutputFormat};

pub(crate) fn cmd_describe(
    responses: &[PathBuf],
    tx_id: &str,
    role: Role,
    config: &Config,
    output: OutputFormat,
    quiet: bool,
) {
    let registry = match config.registry() {
        Ok(r) => r,
        Err(e) => {
            report_error(&format!("invalid process configuration: {}", e), output, quiet);
            process::exit(1);
        }
    };

    let allow = config.allow_list();
    let (store, _) = load_store(responses, allow.as_ref(), output, quiet);

    let reference = ResourceRef::new("transaction", tx_id);
    let resolution = match store.resolve(std::slice::from_ref(&reference), Strictness::Tolerant) {
        Ok(r) => r,
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    };
    let Some(entity) = resolution.first() else {
        report_error(&format!("transaction '{}' not found", tx_id), output, quiet);
        process::exit(1);
    };
    let tx = match Transaction::from_entity(&entity) {
        Ok(tx) => tx,
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    };

    let description = Lifecycle::new(&registry).describe(&tx, role);
    let totals_ok = match check_totals(&tx) {
        Ok(check) => Some(check.is_consistent()),
        Err(e) => {
            tracing::warn!(transaction = %tx.reference, error = %e, "could not sum line items");
            None
        }
    };

    match output {
        OutputFormat::Json => {
            let mut json = serde_json::to_value(&description).unwrap_or_default();
            if let Some(obj) = json.as_object_mut() {
                obj.insert("transaction".to_string(), tx_id.into());
                obj.insert("totalsConsistent".to_string(), totals_ok.into());
            }
            println!("{}", serde_json::to_string_pretty(&json).unwrap_or_default());
        }
        OutputFormat::Text => match &description {
            Description::Supported {
                process_name,
                state,
                action_needed,
                is_final,
            } => {
                println!("transaction:   {}", tx_id);
                println!("process:       {}", process_name);
                println!("state:         {}", state);
                println!("action needed: {}", yes_no(*action_needed));
                println!("final:         {}", yes_no(*is_final));
                if let Some(ok) = totals_ok {
                    if !tx.line_items.is_empty() {
                        println!("totals:        {}", if ok { "consistent" } else { "MISMATCH" });
                    }
                }
            }
            Description::Unsupported { process_name } => {
                println!("transaction:   {}", tx_id);
                println!("process:       {} (unsupported)", process_name);
            }
            Description::OutOfDate {
                process_name,
                transition,
            } => {
                println!("transaction:   {}", tx_id);
                println!(
                    "process:       {} (transition table out of date: {})",
                    process_name, transition
                );
            }
        },
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
