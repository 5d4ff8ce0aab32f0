fn main() {
    if handle_cli_flags() {
        return;
    }

    if let Err(err) = betterdc::run(std::env::args().skip(1)) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn handle_cli_flags() -> bool {
    let mut saw_flag = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("BetterDC {}", betterdc::VERSION);
                saw_flag = true;
            }
            "--help" | "-h" => {
                println!(
                    "BetterDC - prev/next navigation for recommended posts on DCInside galleries.\n\n  betterdc [--html] <post-url>   Print the previous/next links for a post\n  --settings                     Show stored settings and the volume cookie\n  --volume <0-100>               Store the default video volume\n  --filter on|off                Store whether media starts blurred\n  --version, -V                  Show version and exit\n  --help,    -h                  Show this help message\n\nLog level is read from BETTERDC_LOG (default: warn)."
                );
                saw_flag = true;
            }
            _ => {}
        }
    }
    saw_flag
}
