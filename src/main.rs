use std::path::PathBuf;

use good_vibes_tui::app::RunOptions;

const HELP: &str = "Good Vibes - a kiosk carousel of recognition messages.

Usage: good-vibes [OPTIONS]

  --config <PATH>      Read configuration from PATH
  --demo               Run against built-in demo data instead of the backend
  --version, -V        Show version and exit
  --help,    -h        Show this help message";

enum Cli {
    Run(RunOptions),
    Exit,
}

fn main() {
    let options = match parse_args(std::env::args().skip(1)) {
        Ok(Cli::Run(options)) => options,
        Ok(Cli::Exit) => return,
        Err(message) => {
            eprintln!("error: {message}\n\n{HELP}");
            std::process::exit(2);
        }
    };

    if let Err(err) = good_vibes_tui::run(options) {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Cli, String> {
    let mut options = RunOptions::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("Good Vibes {}", good_vibes_tui::VERSION);
                return Ok(Cli::Exit);
            }
            "--help" | "-h" => {
                println!("{HELP}");
                return Ok(Cli::Exit);
            }
            "--demo" => options.demo = true,
            "--config" => {
                let path = args
                    .next()
                    .ok_or_else(|| "--config requires a path".to_string())?;
                options.config_file = Some(PathBuf::from(path));
            }
            other => {
                if let Some(path) = other.strip_prefix("--config=") {
                    options.config_file = Some(PathBuf::from(path));
                } else {
                    return Err(format!("unknown argument {other:?}"));
                }
            }
        }
    }
    Ok(Cli::Run(options))
}
