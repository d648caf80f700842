use std::process::ExitCode;

fn main() -> ExitCode {
    dayplanner::run()
}
