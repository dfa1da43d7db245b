use std::process::ExitCode;

fn main() -> ExitCode {
    focusdesk::run()
}
