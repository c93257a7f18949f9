use anyhow::Context;
use log::LevelFilter;
use std::path::Path;
use std::process;
use yate::bundle::{self, config::BuildConfig, config::YATE_TOML};
use yate::common::args;
use yate::common::colors::{NC, RED, YELLOW};

/// CLI entry point. Compiles the given template files into one
/// artifact on stdout. Settings from yate.toml apply unless a
/// flag turns them on.
///
fn main() {
    let args = match args::parse() {
        Ok(args) => args,
        Err(unknown) => {
            eprintln!("{}Unknown arguments: {:?}{}", RED, unknown, NC);
            process::exit(1);
        }
    };

    env_logger::Builder::from_default_env()
        .filter_level(if args.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        })
        .init();

    if args.files.is_empty() {
        println!("{}", args::usage());
        eprintln!("{}Error: No input files provided.{}", RED, NC);
        eprintln!(
            "{}Please provide at least one .yat file to process.{}",
            YELLOW, NC
        );
        process::exit(1);
    }

    let config = BuildConfig::load(Path::new(YATE_TOML)).with_flags(args.module, args.bundle);

    match run(&args.files, config) {
        Ok(output) => print!("{}", output),
        Err(err) => {
            eprintln!("{}Error: {:#}{}", RED, err, NC);
            process::exit(1);
        }
    }
}

fn run(files: &[String], config: BuildConfig) -> anyhow::Result<String> {
    let built = bundle::build(files, config.format())
        .with_context(|| format!("building {} template file(s)", files.len()))?;

    if config.bundle {
        Ok(format!("{}\n{}", bundle::runtime_source(), built))
    } else {
        Ok(built)
    }
}
