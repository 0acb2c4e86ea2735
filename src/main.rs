use anyhow::{anyhow, bail, Context, Result};
use origo_lib::api::{export_report, OrigoService};
use origo_lib::models::{AnalyzeRequest, Dimension};
use origo_lib::services::config_store::{ConfigStore, ModelServerConfig};
use origo_lib::services::providers::ScoringPrimitives;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::PathBuf;
use tracing::info;

fn parse_arg_value(args: &[String], key: &str) -> Option<String> {
    args.iter()
        .position(|a| a == key)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn has_flag(args: &[String], key: &str) -> bool {
    args.iter().any(|a| a == key)
}

const VALUE_FLAGS: &[&str] = &["--disable", "--model-url", "--config-dir", "--out"];

/// First argument that is neither a flag nor a flag's value. `-` means stdin.
fn input_path(args: &[String]) -> Option<String> {
    let mut rest = args.iter().skip(1);
    while let Some(arg) = rest.next() {
        if VALUE_FLAGS.contains(&arg.as_str()) {
            rest.next();
        } else if arg == "-" || !arg.starts_with("--") {
            return Some(arg.clone());
        }
    }
    None
}

fn parse_disabled(list: &str) -> Result<BTreeMap<Dimension, bool>> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<Dimension>()
                .map(|d| (d, false))
                .map_err(|e| anyhow!(e))
        })
        .collect()
}

fn read_input(path: &str) -> Result<String> {
    if path == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("read stdin failed")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("read {} failed", path))
}

fn build_service(args: &[String]) -> Result<OrigoService> {
    let config_dir = match parse_arg_value(args, "--config-dir") {
        Some(dir) => PathBuf::from(dir),
        None => ConfigStore::default_config_dir()
            .ok_or_else(|| anyhow!("no config directory available; pass --config-dir"))?,
    };
    let store = ConfigStore::new(config_dir);
    let mut config = store
        .load()
        .map_err(|e| anyhow!("{}: {}", store.config_file().display(), e))?;
    info!("[CLI] config: {}", store.config_file().display());

    if let Some(url) = parse_arg_value(args, "--model-url") {
        config.model_server = Some(ModelServerConfig {
            base_url: url,
            ..ModelServerConfig::default()
        });
    }

    let primitives = ScoringPrimitives::from_config(&config)?;
    Ok(OrigoService::new(&config, primitives, Some(store)))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 || has_flag(&args, "--help") {
        eprintln!(
            "Usage:\n  origo <path.txt|-> [--disable <dim,dim>] [--model-url <url>] [--config-dir <dir>] [--export] [--out <json_path>]\n  origo --dimensions\n  origo --weights\n\nDimensions: {}",
            Dimension::ALL.map(|d| d.as_str()).join(", ")
        );
        eprintln!("\nThe input path may come before or after the options; `-` reads stdin.");
        return Ok(());
    }

    origo_lib::init_logging();
    let service = build_service(&args)?;

    let json = if has_flag(&args, "--dimensions") {
        serde_json::to_string_pretty(&service.dimensions_info())?
    } else if has_flag(&args, "--weights") {
        serde_json::to_string_pretty(&service.get_weights()?)?
    } else {
        let path = input_path(&args).ok_or_else(|| anyhow!("missing input path (use - for stdin)"))?;
        let text = read_input(&path)?;
        let mut request = AnalyzeRequest::new(text);
        if let Some(list) = parse_disabled_arg(&args)? {
            request.enabled_dimensions = Some(list);
        }

        let result = service.analyze(request).await?;
        info!(
            "[CLI] overall score {:.3} over {} dimensions",
            result.overall_score,
            result.active_dimensions.len()
        );

        if has_flag(&args, "--export") {
            serde_json::to_string_pretty(&export_report(&result))?
        } else {
            serde_json::to_string_pretty(&result)?
        }
    };

    match parse_arg_value(&args, "--out") {
        Some(out_path) => {
            std::fs::write(&out_path, json).with_context(|| format!("write {} failed", out_path))?;
            eprintln!("Wrote JSON: {}", out_path);
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn parse_disabled_arg(args: &[String]) -> Result<Option<BTreeMap<Dimension, bool>>> {
    match parse_arg_value(args, "--disable") {
        Some(list) => {
            let map = parse_disabled(&list)?;
            if map.is_empty() {
                bail!("--disable needs at least one dimension");
            }
            Ok(Some(map))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_input_path_after_options() {
        let a = args(&["origo", "--disable", "perplexity", "--export", "file.txt"]);
        assert_eq!(input_path(&a).as_deref(), Some("file.txt"));
    }

    #[test]
    fn test_input_path_first_or_stdin() {
        let a = args(&["origo", "essay.txt", "--out", "result.json"]);
        assert_eq!(input_path(&a).as_deref(), Some("essay.txt"));

        let a = args(&["origo", "--config-dir", "cfg", "-"]);
        assert_eq!(input_path(&a).as_deref(), Some("-"));

        let a = args(&["origo", "--out", "result.json", "--export"]);
        assert_eq!(input_path(&a), None);
    }

    #[test]
    fn test_parse_disabled_list() {
        let map = parse_disabled("perplexity, ngram-repetition").unwrap();
        assert_eq!(map.len(), 2);
        assert!(!map[&Dimension::NgramRepetition]);
        assert!(parse_disabled("perplexity,nonsense").is_err());
    }
}
