mod cli;
mod log;
mod settings;
use ::log::{debug, warn};
use anyhow::Context;
use cli::{Cli, ConfigurationFormat};
use docrule_engine::valu3::value::Value;
use docrule_engine::{LogAction, RuleEngine, YamlConverterProvider};
use crate::log::init_logger;
use settings::Settings;
use std::sync::Arc;

fn main() {
    init_logger();

    debug!("Starting docrule");

    let settings = Settings::load();

    let cli = match Cli::load() {
        Ok(cli) => cli,
        Err(err) => {
            eprintln!("{}", err);
            std::process::exit(2);
        }
    };

    if let Err(err) = run(cli, settings) {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}

fn run(cli: Cli, settings: Settings) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(&cli.config_path)
        .with_context(|| format!("Failed to read {}", cli.config_path))?;

    let mut engine = RuleEngine::new();

    if cli.format == ConfigurationFormat::Yaml {
        engine.set_converter_provider(Box::new(YamlConverterProvider));
    }

    engine.register_action("Log", Arc::new(LogAction::default()));
    engine
        .set_json_configuration(&text)
        .with_context(|| format!("Failed to load {}", cli.config_path))?;

    if cli.insecure || !settings.secure {
        warn!("Running in open mode, host functions are available to rules");
        engine.disable_security();
    }

    if cli.monitor || settings.monitor {
        engine.enable_performance_monitoring();
    }

    if cli.show_script {
        println!("{}", engine.compiled_script()?);
    }

    if cli.params.is_empty() {
        if Value::json_to_value(&cli.input).is_err() {
            warn!("Input is not valid JSON, rules will pass it through untouched");
        }

        engine.execute_json_input(&cli.input)?;
    } else {
        engine.execute_rules_with_string_input(cli.params)?;
    }

    println!("{}", engine.json_document_pretty_printed()?);

    if !engine.performance_monitoring().is_empty() {
        engine.print_performance_monitoring();
    }

    Ok(())
}
