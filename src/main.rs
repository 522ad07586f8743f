use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use paramforge::store::DEFAULT_FILE;
use paramforge::{Error, Map, ParameterStore, Result, StoreError, Value};
use tracing_subscriber::EnvFilter;

/// Longest value `show` prints before truncating.
const SHOW_WIDTH: usize = 60;

/// Reusable prompt templates driven by simple YAML parameters.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Log engine activity to stderr (`PARAMFORGE_LOG` takes precedence)
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new YAML parameters file
    Init {
        #[arg(default_value = DEFAULT_FILE)]
        filepath: PathBuf,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        company: Option<String>,
    },
    /// Show all parameters from a YAML file
    Show { params_file: PathBuf },
    /// Render a template using YAML parameters
    Render {
        /// Template file, or template text with --inline
        template: String,
        params_file: PathBuf,
        /// Write the result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Extra parameter as key=value; overrides the file
        #[arg(short = 'p', long = "param")]
        params: Vec<String>,
        /// Treat TEMPLATE as template text rather than a path
        #[arg(long)]
        inline: bool,
    },
    /// Add or update a parameter (VALUE is parsed as JSON when possible)
    Add {
        params_file: PathBuf,
        #[arg(short, long)]
        key: String,
        #[arg(short, long)]
        value: String,
    },
    /// Remove a parameter
    Remove { params_file: PathBuf, key: String },
    /// Print the value of one parameter
    Get { params_file: PathBuf, key: String },
    /// Merge SOURCE_FILE into TARGET_FILE; SOURCE_FILE wins on conflicts
    Merge {
        target_file: PathBuf,
        source_file: PathBuf,
    },
}

fn main() {
    // Parse CLI arguments.
    let args = Args::parse();
    init_tracing(args.verbose);

    if let Err(e) = run(args.command) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("PARAMFORGE_LOG")
        .unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Init {
            filepath,
            name,
            email,
            role,
            company,
        } => {
            if name.is_none() && email.is_none() && role.is_none() && company.is_none() {
                ParameterStore::create_default(&filepath)?;
            } else {
                let mut store = ParameterStore::new();
                store.set("name", name.unwrap_or_default());
                store.set("email", email.unwrap_or_default());
                for (key, value) in [("role", role), ("company", company)] {
                    if let Some(value) = value.filter(|v| !v.is_empty()) {
                        store.set(key, value);
                    }
                }
                store.save(&filepath, true)?;
            }
            println!("Parameters file created: {}", filepath.display());
            println!("You can edit it manually to add more parameters.");
        }
        Command::Show { params_file } => show(&params_file)?,
        Command::Render {
            template,
            params_file,
            output,
            params,
            inline,
        } => {
            let store = ParameterStore::load(&params_file)?;
            let overrides = parse_overrides(&params)?;
            let result = if inline {
                store.render(&template, &overrides)?
            } else {
                store.render_file(&template, &overrides)?
            };
            match output {
                Some(path) => {
                    fs::write(&path, &result).map_err(|source| StoreError::Io {
                        path: path.clone(),
                        source,
                    })?;
                    println!("Output saved to: {}", path.display());
                }
                None => println!("{result}"),
            }
        }
        Command::Add {
            params_file,
            key,
            value,
        } => {
            let added = add_param(&params_file, key, value)?;
            println!("Parameter added: {added}");
        }
        Command::Remove { params_file, key } => {
            let mut store = ParameterStore::load(&params_file)?;
            if store.remove(&key).is_none() {
                println!("Parameter '{key}' does not exist");
                return Ok(());
            }
            store.save(&params_file, true)?;
            println!("Parameter removed: {key}");
        }
        Command::Get { params_file, key } => {
            let store = ParameterStore::load(&params_file)?;
            match store.get(&key) {
                Some(value) => println!("{key}: {value}"),
                None => println!("Parameter '{key}' not found"),
            }
        }
        Command::Merge {
            target_file,
            source_file,
        } => {
            let mut store = ParameterStore::load(&target_file)?;
            let added = store.merge_file(&source_file)?;
            store.save(&target_file, true)?;
            println!("Files merged");
            println!("New parameters added: {added}");
        }
    }
    Ok(())
}

fn show(params_file: &Path) -> Result<()> {
    let store = ParameterStore::load(params_file)?;
    println!("Parameters in {}:", params_file.display());
    println!();
    if store.is_empty() {
        println!("  (empty)");
        return Ok(());
    }
    let width = store
        .params()
        .keys()
        .map(|k| k.chars().count())
        .max()
        .unwrap_or(0);
    for (key, value) in store.params() {
        let mut text = value.to_string();
        if text.chars().count() > SHOW_WIDTH {
            text = text.chars().take(SHOW_WIDTH - 3).collect::<String>() + "...";
        }
        println!("  {key:<width$} → {text}");
    }
    println!();
    println!("Total: {} parameters", store.len());
    Ok(())
}

/// Store `key` (VALUE parsed as JSON when possible) and save. Returns the
/// `key = value` line to report once the file is written.
fn add_param(params_file: &Path, key: String, value: String) -> Result<String> {
    let mut store = ParameterStore::load(params_file)?;
    let parsed = serde_json::from_str::<serde_json::Value>(&value)
        .map(Value::from)
        .unwrap_or(Value::String(value));
    let added = format!("{key} = {parsed}");
    store.set(key, parsed);
    store.save(params_file, true)?;
    Ok(added)
}

/// `key=value` pairs from `-p`; values stay strings.
fn parse_overrides(pairs: &[String]) -> Result<Map> {
    pairs
        .iter()
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => Ok((key.to_string(), Value::from(value))),
            None => Err(Error::InvalidParam(pair.clone())),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn add_param_saves_before_reporting() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.yaml");
        ParameterStore::create_default(&path).unwrap();

        let added = add_param(&path, "limits".to_string(), "[1, 2]".to_string()).unwrap();
        assert_eq!(added, "limits = [1,2]");
        let added = add_param(&path, "tone".to_string(), "casual".to_string()).unwrap();
        assert_eq!(added, "tone = casual");

        let store = ParameterStore::load(&path).unwrap();
        assert_eq!(store.get("limits"), Some(&Value::from(vec![1, 2])));
        assert_eq!(store.get("tone"), Some(&Value::from("casual")));
    }

    #[test]
    fn add_param_to_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = add_param(&dir.path().join("absent.yaml"), "k".to_string(), "v".to_string())
            .unwrap_err();
        assert!(matches!(err, Error::Store(StoreError::Io { .. })));
    }

    #[test]
    fn overrides_split_at_first_equals() {
        let map = parse_overrides(&["tone=casual".to_string(), "query=a=b=c".to_string()]).unwrap();
        assert_eq!(map.get("tone"), Some(&Value::from("casual")));
        assert_eq!(map.get("query"), Some(&Value::from("a=b=c")));
    }

    #[test]
    fn overrides_keep_values_as_strings() {
        let map = parse_overrides(&["n=42".to_string(), "empty=".to_string()]).unwrap();
        assert_eq!(map.get("n"), Some(&Value::from("42")));
        assert_eq!(map.get("empty"), Some(&Value::from("")));
    }

    #[test]
    fn override_without_equals_is_rejected() {
        let err = parse_overrides(&["ok=1".to_string(), "broken".to_string()]).unwrap_err();
        assert!(matches!(err, Error::InvalidParam(ref pair) if pair == "broken"));
        assert_eq!(err.to_string(), "parameter must be in key=value format: broken");
    }
}
