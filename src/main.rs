use std::process::ExitCode;

fn main() -> ExitCode {
    vtmem::run_cli()
}
