fn main() {
    if let Err(e) = launchbench::run() {
        eprintln!("launchbench: {e:#}");
        std::process::exit(1);
    }
}
