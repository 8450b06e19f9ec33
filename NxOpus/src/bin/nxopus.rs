fn main() -> anyhow::Result<()> {
    nxopus::cli::run_cli()
}
