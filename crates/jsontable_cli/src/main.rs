//! Inspection CLI for jsontable documents.
//!
//! # Responsibility
//! - Print the core version when run without arguments.
//! - List tables with record counts, or dump one table as pretty JSON.
//! - Never modify the document.

use jsontable_core::{DocumentStore, StoreOptions};
use std::process::ExitCode;

const USAGE: &str = "usage: jsontable_cli [tables <path> | dump <path> <table>]";

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> Result<(), String> {
    match args {
        [] => {
            println!("jsontable_core version={}", jsontable_core::core_version());
            Ok(())
        }
        [command, path] if command == "tables" => {
            let document = open(path)?.load_document().map_err(|err| err.to_string())?;
            for entry in document.tables() {
                println!("{}\t{}", entry.name, entry.records.len());
            }
            Ok(())
        }
        [command, path, table] if command == "dump" => {
            let document = open(path)?.load_document().map_err(|err| err.to_string())?;
            let entry = document
                .table(table)
                .ok_or_else(|| format!("table `{table}` does not exist"))?;
            let text =
                serde_json::to_string_pretty(&entry.records).map_err(|err| err.to_string())?;
            println!("{text}");
            Ok(())
        }
        _ => Err(USAGE.to_string()),
    }
}

fn open(path: &str) -> Result<DocumentStore, String> {
    DocumentStore::open(StoreOptions::new(path)).map_err(|err| err.to_string())
}
