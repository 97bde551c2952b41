use clap::{Parser, Subcommand};
use std::fs;
use std::process;

use serde_json::Value;
use vellum_model::{basic, Node};
use vellum_transform::{Mapping, Step, Transform};

#[derive(Debug, Parser)]
#[command(name = "vellum", version, about = "Vellum document engine CLI")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate a document JSON against the basic schema.
    Check {
        /// Input document JSON path
        input: String,
    },
    /// Apply a JSON array of steps to a document.
    Apply {
        /// Input document JSON path
        input: String,
        /// Steps JSON path (array of step objects)
        steps: String,
        /// Output minified JSON
        #[arg(long)]
        min: bool,
    },
    /// Map a position through the maps of a JSON array of steps.
    Map {
        /// Steps JSON path (array of step objects)
        steps: String,
        /// Position in the document the steps started from
        pos: usize,
        /// Side the position sticks to: 1 or -1
        #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
        assoc: i8,
    },
}

fn read_json(path: &str) -> Value {
    let s = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };
    match serde_json::from_str(&s) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    }
}

fn read_doc(path: &str) -> Node {
    let json = read_json(path);
    match Node::from_json(basic::schema(), &json) {
        Ok(doc) => doc,
        Err(e) => {
            // Exact error string, stable for CI / integrations.
            eprintln!("{e}");
            process::exit(2);
        }
    }
}

fn read_steps(path: &str) -> Vec<Step> {
    let json = read_json(path);
    let arr = match json.as_array() {
        Some(arr) => arr,
        None => {
            eprintln!("steps file must hold a JSON array");
            process::exit(1);
        }
    };
    arr.iter()
        .map(|value| match Step::from_json(basic::schema(), value) {
            Ok(step) => step,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        })
        .collect()
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.cmd {
        Command::Check { input } => {
            let doc = read_doc(&input);
            if let Err(e) = doc.check() {
                eprintln!("{e}");
                process::exit(2);
            }
            println!("OK {}", doc.node_size());
        }
        Command::Apply { input, steps, min } => {
            let doc = read_doc(&input);
            let mut tr = Transform::new(doc);
            for step in read_steps(&steps) {
                if let Err(e) = tr.step(step) {
                    eprintln!("{e}");
                    process::exit(2);
                }
            }
            let json = tr.doc().to_json();
            let out = if min {
                serde_json::to_string(&json)?
            } else {
                serde_json::to_string_pretty(&json)?
            };
            println!("{out}");
        }
        Command::Map { steps, pos, assoc } => {
            let mut mapping = Mapping::new();
            for step in read_steps(&steps) {
                mapping.append_map(step.get_map(), None);
            }
            let result = mapping.map_result(pos, assoc);
            if result.deleted() {
                println!("{} deleted", result.pos());
            } else {
                println!("{}", result.pos());
            }
        }
    }

    Ok(())
}
