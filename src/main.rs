use chrono::Local;
use flexi_logger::{Duplicate, FileSpec, Logger, LoggerHandle};
use gafs::api::{self, RequestKind};
use gafs::param::{self, Param};
use log::{error, info};
use std::env;
use std::error::Error;
use std::process;

const USAGE: &str = "Usage: gafs <ga|variance|compare> <request.json> [param.yaml]";

fn main() {
    if let Err(e) = run() {
        eprintln!("{}", e);
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        return Err(USAGE.into());
    }

    let kind: RequestKind = args[1].parse()?;
    let param = match args.get(3) {
        Some(param_file) => param::get(param_file.clone())?,
        None => {
            let mut param = Param::default();
            param::validate(&mut param)?;
            param
        }
    };

    let _logger = init_logger(&param)?;
    info!("gafs v{}", gafs::experiment::version());

    let request: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&args[2])?)?;
    let response = api::handle(kind, &request, &param);
    println!("{}", serde_json::to_string_pretty(&response)?);

    if let Some(message) = response.get("error") {
        error!("{} failed: {}", kind, message);
        process::exit(2);
    }
    Ok(())
}

/// Logs to `{log_base}_{timestamp}.{log_suffix}` (duplicated on stderr) when a
/// log base is configured, to stderr otherwise.
fn init_logger(param: &Param) -> Result<LoggerHandle, Box<dyn Error>> {
    let logger = Logger::try_with_str(&param.general.log_level)?;
    let handle = if param.general.log_base.is_empty() {
        logger.start()?
    } else {
        let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();
        logger
            .log_to_file(
                FileSpec::default()
                    .basename(param.general.log_base.clone())
                    .suppress_timestamp()
                    .discriminant(timestamp)
                    .suffix(param.general.log_suffix.clone()),
            )
            .duplicate_to_stderr(Duplicate::Info)
            .start()?
    };
    Ok(handle)
}
