fn main() {
    #[cfg(feature = "cli")]
    linkpress::cli::run();

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("linkpress: CLI not enabled. Rebuild with `--features cli`.");
        std::process::exit(1);
    }
}
