use clap::{Arg, ArgAction, ArgMatches, Command};
use std::{collections::HashMap, fmt::Display};

#[derive(Debug, PartialEq)]
pub enum Error {
    ConfigurationNotFound(String),
    InvalidParameter(String),
    Arguments(String),
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::ConfigurationNotFound(path) => write!(f, "Configuration not found: {}", path),
            Error::InvalidParameter(param) => {
                write!(f, "Invalid parameter {:?}, expected key=value", param)
            }
            Error::Arguments(message) => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for Error {}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigurationFormat {
    Json,
    Yaml,
}

impl From<&str> for ConfigurationFormat {
    fn from(extension: &str) -> Self {
        match extension {
            "yaml" => ConfigurationFormat::Yaml,
            "yml" => ConfigurationFormat::Yaml,
            _ => ConfigurationFormat::Json,
        }
    }
}

#[derive(Debug)]
pub struct Cli {
    pub config_path: String,
    pub format: ConfigurationFormat,
    pub input: String,
    pub params: HashMap<String, String>,
    pub insecure: bool,
    pub monitor: bool,
    pub show_script: bool,
}

fn command() -> Command {
    Command::new("docrule")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Runs a rule configuration against JSON input and prints the resulting document")
        .arg(
            Arg::new("config")
                .help("Rule configuration file (.json, .yaml or .yml)")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("input")
                .long("input")
                .short('i')
                .help("JSON input passed to the rules")
                .default_value("{}")
                .conflicts_with("param"),
        )
        .arg(
            Arg::new("param")
                .long("param")
                .short('p')
                .help("Input parameter as key=value, coerced to its declared type")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("insecure")
                .long("insecure")
                .help("Allow host functions such as env() and now()")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("monitor")
                .long("monitor")
                .short('m')
                .help("Print performance markers")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("show_script")
                .long("show-script")
                .help("Print the compiled script before running it")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .short('f')
                .help("Configuration format, taken from the file extension when omitted")
                .value_parser(["json", "yaml"]),
        )
}

impl Cli {
    pub fn load() -> Result<Cli, Error> {
        let matches = command().get_matches();
        Self::from_matches(&matches)
    }

    pub fn try_load_from<I, T>(args: I) -> Result<Cli, Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let matches = command()
            .try_get_matches_from(args)
            .map_err(|err| Error::Arguments(err.to_string()))?;
        Self::from_matches(&matches)
    }

    fn from_matches(matches: &ArgMatches) -> Result<Cli, Error> {
        let config_path = match matches.get_one::<String>("config") {
            Some(path) => path.clone(),
            None => return Err(Error::ConfigurationNotFound(String::new())),
        };

        if !std::path::Path::new(&config_path).is_file() {
            return Err(Error::ConfigurationNotFound(config_path));
        }

        let format = match matches.get_one::<String>("format") {
            Some(format) => ConfigurationFormat::from(format.as_str()),
            None => match config_path.rsplit('.').next() {
                Some(extension) => ConfigurationFormat::from(extension),
                None => ConfigurationFormat::Json,
            },
        };

        let input = matches
            .get_one::<String>("input")
            .cloned()
            .unwrap_or_else(|| "{}".to_string());

        let mut params = HashMap::new();
        if let Some(values) = matches.get_many::<String>("param") {
            for value in values {
                match value.split_once('=') {
                    Some((key, param)) if !key.is_empty() => {
                        params.insert(key.to_string(), param.to_string());
                    }
                    _ => return Err(Error::InvalidParameter(value.clone())),
                }
            }
        }

        Ok(Cli {
            config_path,
            format,
            input,
            params,
            insecure: matches.get_flag("insecure"),
            monitor: matches.get_flag("monitor"),
            show_script: matches.get_flag("show_script"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> String {
        format!("{}/Cargo.toml", env!("CARGO_MANIFEST_DIR"))
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_load_from(["docrule", manifest().as_str()]).unwrap();

        assert_eq!(cli.input, "{}");
        assert_eq!(cli.format, ConfigurationFormat::Json);
        assert!(cli.params.is_empty());
        assert!(!cli.insecure);
        assert!(!cli.monitor);
        assert!(!cli.show_script);
    }

    #[test]
    fn test_params_and_flags() {
        let cli = Cli::try_load_from([
            "docrule",
            manifest().as_str(),
            "-p",
            "age=30",
            "--param",
            "query=a=b",
            "--insecure",
            "--monitor",
            "--show-script",
            "--format",
            "yaml",
        ])
        .unwrap();

        assert_eq!(cli.params.get("age").map(|v| v.as_str()), Some("30"));
        assert_eq!(cli.params.get("query").map(|v| v.as_str()), Some("a=b"));
        assert_eq!(cli.format, ConfigurationFormat::Yaml);
        assert!(cli.insecure && cli.monitor && cli.show_script);
    }

    #[test]
    fn test_invalid_param() {
        let result = Cli::try_load_from(["docrule", manifest().as_str(), "-p", "novalue"]);
        assert_eq!(
            result.unwrap_err(),
            Error::InvalidParameter("novalue".to_string())
        );
    }

    #[test]
    fn test_missing_configuration() {
        let result = Cli::try_load_from(["docrule", "does/not/exist.yaml"]);
        assert_eq!(
            result.unwrap_err(),
            Error::ConfigurationNotFound("does/not/exist.yaml".to_string())
        );
    }

    #[test]
    fn test_input_conflicts_with_params() {
        let result = Cli::try_load_from([
            "docrule",
            manifest().as_str(),
            "--input",
            "{}",
            "-p",
            "a=1",
        ]);
        assert!(matches!(result, Err(Error::Arguments(_))));
    }

    #[test]
    fn test_extension_format() {
        assert_eq!(ConfigurationFormat::from("yml"), ConfigurationFormat::Yaml);
        assert_eq!(ConfigurationFormat::from("json"), ConfigurationFormat::Json);
        assert_eq!(ConfigurationFormat::from("toml"), ConfigurationFormat::Json);
    }
}
