use std::process::ExitCode;

fn main() -> ExitCode {
    shiptrack_cli::run()
}
