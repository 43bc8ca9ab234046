use json_views::{cli, logging};

fn main() -> anyhow::Result<()> {
    logging::init_tracing();
    cli::CommandLineInterface::load().run()
}
