use std::io::Write;

use clap::Parser;
use miette::{Context, IntoDiagnostic, Result};
use preview_card::{render_preview_img_with, RenderConfig};

mod cli;

use cli::{Cli, Commands};

fn write_schemas(out_dir: &std::path::Path) -> Result<()> {
    std::fs::create_dir_all(out_dir)
        .into_diagnostic()
        .wrap_err("failed to create schema folder")?;
    let path = out_dir.join("render-config.schema.json");
    let mut file = std::fs::File::create(&path)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to open {} for writing", path.display()))?;
    file.write_all(RenderConfig::json_schema()?.as_bytes())
        .into_diagnostic()?;
    tracing::info!(path = %path.display(), "wrote schema");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Render {
            size,
            image,
            title,
            subtitle,
            out,
            config,
        } => {
            let config = match config {
                Some(path) => RenderConfig::load(&path)?,
                None => RenderConfig::default(),
            };
            render_preview_img_with(&config, size, &image, &title, &subtitle, &out).await
        }
        Commands::Schema { out_dir } => write_schemas(&out_dir),
    }
}
