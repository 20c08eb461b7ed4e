use std::{env, path::PathBuf, process, str::FromStr};

use anyhow::{bail, Context};
use log::info;

use capital_estimator::{
    config, correlation_matrix, format_rupiah, scatter_table, train, BusinessProfile, Dataset,
    ModelArtifact, TrainingConfig, SCATTER_SERIES,
};

const USAGE: &str = "\
usage:
  capital-estimator train [DATA_PATH] [MODEL_PATH]
  capital-estimator predict <BUSINESS_TYPE> <LOCATION> <EMPLOYEES> <MATERIAL_COST> <PRODUCTION_TARGET> <REVENUE>
  capital-estimator categories [MODEL_PATH]
  capital-estimator stats [--scatter] [DATA_PATH]

CAPITAL_DATA_PATH and CAPITAL_MODEL_PATH override the default paths.";

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    if let Err(e) = run(&args) {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn run(args: &[String]) -> anyhow::Result<()> {
    let Some((command, rest)) = args.split_first() else {
        bail!("missing command\n\n{USAGE}");
    };

    match command.as_str() {
        "train" => run_train(rest),
        "predict" => run_predict(rest),
        "categories" => run_categories(rest),
        "stats" => run_stats(rest),
        "-h" | "--help" | "help" => {
            println!("{USAGE}");
            Ok(())
        }
        other => bail!("unknown command '{other}'\n\n{USAGE}"),
    }
}

fn run_train(args: &[String]) -> anyhow::Result<()> {
    let mut config = TrainingConfig::from_env();
    if let Some(path) = args.first() {
        config.data_path = PathBuf::from(path);
    }
    if let Some(path) = args.get(1) {
        config.model_path = PathBuf::from(path);
    }

    info!("training on {}", config.data_path.display());
    let report = train(&config).with_context(|| {
        format!(
            "training on '{}' failed, no model was written",
            config.data_path.display()
        )
    })?;

    println!("Dataset loaded: {} rows", report.rows);
    println!("{}", report.preview);
    println!("{}", "=".repeat(30));
    println!("Model training complete!");
    println!("MAE: {:.2}", report.mae);
    println!("R2 Score: {:.2}", report.r2);
    println!("{}", "=".repeat(30));
    println!("Model saved to {}", report.model_path.display());

    Ok(())
}

fn run_predict(args: &[String]) -> anyhow::Result<()> {
    let [business_type, location, employees, material_cost, production_target, revenue] = args
    else {
        bail!("predict takes exactly 6 arguments\n\n{USAGE}");
    };

    let profile = BusinessProfile {
        business_type: business_type.clone(),
        location: location.clone(),
        employees: parse_arg("EMPLOYEES", employees)?,
        material_cost: parse_arg("MATERIAL_COST", material_cost)?,
        production_target: parse_arg("PRODUCTION_TARGET", production_target)?,
        revenue: parse_arg("REVENUE", revenue)?,
    };

    let model_path = config::model_path_from_env();
    let artifact = ModelArtifact::load(&model_path)
        .with_context(|| format!("cannot load model from '{}'", model_path.display()))?;
    let estimate = artifact.predict(&profile)?;

    info!("estimate for {profile:?}: {estimate}");
    println!("Estimated capital: {}", format_rupiah(estimate));

    Ok(())
}

fn run_categories(args: &[String]) -> anyhow::Result<()> {
    let model_path = args
        .first()
        .map(PathBuf::from)
        .unwrap_or_else(config::model_path_from_env);
    let artifact = ModelArtifact::load(&model_path)
        .with_context(|| format!("cannot load model from '{}'", model_path.display()))?;

    println!("Business types:");
    for label in artifact.business_type_encoder().classes() {
        println!("  {label}");
    }
    println!("Locations:");
    for label in artifact.location_encoder().classes() {
        println!("  {label}");
    }

    Ok(())
}

fn run_stats(args: &[String]) -> anyhow::Result<()> {
    let (flags, paths): (Vec<&String>, Vec<&String>) =
        args.iter().partition(|a| a.starts_with("--"));

    let mut scatter = false;
    for flag in flags {
        match flag.as_str() {
            "--scatter" => scatter = true,
            other => bail!("unknown stats option '{other}'\n\n{USAGE}"),
        }
    }

    let data_path = paths
        .first()
        .map(|p| PathBuf::from(p.as_str()))
        .unwrap_or_else(config::data_path_from_env);
    let dataset = Dataset::from_path(&data_path)
        .with_context(|| format!("cannot read dataset '{}'", data_path.display()))?;

    println!("Correlation matrix ({} rows):", dataset.len());
    print!("{}", correlation_matrix(&dataset));

    if scatter {
        for (x, y) in SCATTER_SERIES {
            println!();
            println!("{} vs {}:", x.name(), y.name());
            print!("{}", scatter_table(&dataset, x, y));
        }
    }

    Ok(())
}

fn parse_arg<T>(name: &str, value: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .with_context(|| format!("{name} must be a number, got '{value}'"))
}
