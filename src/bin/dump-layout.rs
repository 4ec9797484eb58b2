use clap::Parser;
use std::process::ExitCode;
use vtmem::{resolve_config, Runtime};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Dump the layout of every fixture type under a configuration"
)]
struct Args {
    /// Runtime options, e.g. -Xcompressedrefs -XX:+EnableArrayFlattening
    #[arg(allow_hyphen_values = true)]
    options: Vec<String>,
}

fn main() -> ExitCode {
    vtmem::init_tracing();
    let args = Args::parse();

    let config = match resolve_config(&args.options) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error parsing options: {}", e);
            return ExitCode::from(1);
        }
    };
    let (runtime, fixtures) = match Runtime::with_fixtures(config) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error defining fixture types: {}", e);
            return ExitCode::from(1);
        }
    };

    eprintln!("Config: {}, Types: {}", config, runtime.registry().len());
    for ty in fixtures.all() {
        match runtime.layout_report(ty) {
            Ok(report) => println!("{}", report),
            Err(e) => {
                eprintln!("Layout of '{}' failed: {}", ty.name, e);
                return ExitCode::from(1);
            }
        }
    }

    println!("{}", runtime.engine().cache_statistics());
    ExitCode::SUCCESS
}
