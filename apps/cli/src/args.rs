use std::env;
use std::path::PathBuf;

#[derive(Debug, Default, PartialEq)]
pub struct CliArgs {
    pub port: Option<u16>,
    pub config: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub verbose: bool,
}

pub fn parse_args() -> Result<CliArgs, String> {
    parse_from(env::args().skip(1))
}

fn parse_from(args: impl IntoIterator<Item = String>) -> Result<CliArgs, String> {
    let mut args = args.into_iter();
    let mut parsed = CliArgs::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--port" => {
                let value = args
                    .next()
                    .ok_or_else(|| "missing value for --port".to_string())?;
                let port = value
                    .parse::<u16>()
                    .map_err(|_| format!("invalid port value: {value}"))?;
                parsed.port = Some(port);
            }
            "--config" => {
                let value = args
                    .next()
                    .ok_or_else(|| "missing value for --config".to_string())?;
                parsed.config = Some(PathBuf::from(value));
            }
            "--data-dir" => {
                let value = args
                    .next()
                    .ok_or_else(|| "missing value for --data-dir".to_string())?;
                parsed.data_dir = Some(PathBuf::from(value));
            }
            "--verbose" | "-v" => {
                parsed.verbose = true;
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => {
                return Err(format!("unknown argument: {arg}"));
            }
        }
    }

    Ok(parsed)
}

pub fn print_help() {
    println!(
        "API Watchdog\n\n\
Usage:\n  api-watchdog [--port <port>] [--config <file>] [--data-dir <dir>] [-v]\n\n\
Options:\n  --port <port>     Override the configured port for this run only\n  --config <file>   Read settings from this TOML file\n  --data-dir <dir>  Store the database here (default: $WATCHDOG_DATA_DIR or ~/.api-watchdog)\n  -v, --verbose     Log at debug level\n  -h, --help        Show this help message\n"
    );
}
