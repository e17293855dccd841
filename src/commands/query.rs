//! `nodewatch query` — query a nodewatch daemon via its REST API.

use anyhow::Result;
use clap::Subcommand;

use crate::client::NodewatchClient;

#[derive(Subcommand)]
pub enum QueryCommands {
    /// Daemon health check
    Health,
    /// Latest cluster compatibility report
    Compatibility,
}

pub fn run(url: &str, format: &str, command: &QueryCommands) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_async(url, format, command))
}

async fn run_async(url: &str, format: &str, command: &QueryCommands) -> Result<()> {
    let client = NodewatchClient::new(url)?;

    match command {
        QueryCommands::Health => {
            let data = client.health().await?;
            print_output(format, &data)
        }
        QueryCommands::Compatibility => {
            let data = client.compatibility().await?;
            print_output(format, &data)
        }
    }
}

pub fn print_output<T: serde::Serialize>(format: &str, data: &T) -> Result<()> {
    match format {
        "json" => {
            let json = serde_json::to_string_pretty(data)?;
            println!("{}", json);
        }
        "yaml" => {
            print!("{}", serde_yaml::to_string(data)?);
        }
        _ => {
            // Table format: recursive key-value from serde_json::Value
            let value = serde_json::to_value(data)?;
            print_value(&value, 0);
        }
    }
    Ok(())
}

fn print_value(value: &serde_json::Value, indent: usize) {
    let pad = "  ".repeat(indent);
    match value {
        serde_json::Value::Object(map) => {
            for (key, val) in map {
                match val {
                    serde_json::Value::Object(_) => {
                        println!("{}{}:", pad, key);
                        print_value(val, indent + 1);
                    }
                    serde_json::Value::Array(arr) if arr.is_empty() => {
                        println!("{}{}: []", pad, key);
                    }
                    serde_json::Value::Array(_) => {
                        println!("{}{}:", pad, key);
                        print_value(val, indent + 1);
                    }
                    _ => println!("{}{}: {}", pad, key, format_scalar(val)),
                }
            }
        }
        serde_json::Value::Array(arr) => {
            for (i, item) in arr.iter().enumerate() {
                if item.is_object() {
                    println!("{}[{}]:", pad, i);
                    print_value(item, indent + 1);
                } else {
                    println!("{}- {}", pad, format_scalar(item));
                }
            }
        }
        _ => println!("{}{}", pad, format_scalar(value)),
    }
}

fn format_scalar(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}
