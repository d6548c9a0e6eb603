fn main() -> std::process::ExitCode {
    weldmate::run()
}
