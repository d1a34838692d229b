//! CLI entry point for knowledge-render

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use knowledge_render::config::{RenderConfig, UrlPrefix};
use knowledge_render::converter::{PrefixMapper, UrlMapper};
use knowledge_render::markdown::{Highlighter, EXTENSIONS};
use knowledge_render::{HtmlConverter, RenderOptions};

#[derive(Parser)]
#[command(name = "knowledge-render")]
#[command(version)]
#[command(about = "Render knowledge posts to HTML", long_about = None)]
struct Cli {
    /// Config file (defaults to render.yml in the current directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a post file or post directory to HTML
    #[command(alias = "r")]
    Render {
        /// Markdown file, or directory holding knowledge.md and images/
        path: PathBuf,

        /// Leave out the title/author/TLDR block
        #[arg(long)]
        skip_headers: bool,

        /// Keep image URLs instead of inlining images as data URIs
        #[arg(long)]
        no_embed_images: bool,

        /// Rewrite URLs starting with FROM to start with TO (repeatable)
        #[arg(long = "map-prefix", value_name = "FROM=TO")]
        map_prefix: Vec<UrlPrefix>,

        /// Write HTML to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the markdown extensions in the order they are declared
    Extensions,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "knowledge_render=debug,info"
    } else {
        "knowledge_render=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match &cli.config {
        Some(path) => RenderConfig::load(path)
            .with_context(|| format!("Failed to load config {:?}", path))?,
        None => RenderConfig::load_or_default(std::env::current_dir()?)?,
    };

    match cli.command {
        Commands::Render {
            path,
            skip_headers,
            no_embed_images,
            map_prefix,
            output,
        } => {
            let post = knowledge_render::load_post(&path)
                .with_context(|| format!("Failed to load post {:?}", path))?;

            let options = RenderOptions {
                skip_headers: skip_headers || config.skip_headers,
                embed_images: config.embed_images && !no_embed_images,
            };

            let prefix_mappers: Vec<PrefixMapper> = map_prefix
                .into_iter()
                .chain(config.url_prefixes.iter().cloned())
                .map(PrefixMapper::new)
                .collect();
            let mappers: Vec<&dyn UrlMapper> =
                prefix_mappers.iter().map(|m| m as &dyn UrlMapper).collect();

            let highlighter =
                Highlighter::with_options(&config.highlight.theme, config.highlight.line_numbers);
            tracing::info!("Rendering {:?}", path);
            let html = HtmlConverter::with_highlighter(highlighter)
                .render(&post, &options, &mappers)
                .with_context(|| format!("Failed to render {:?}", path))?;

            match output {
                Some(out) => {
                    fs::write(&out, html).with_context(|| format!("Failed to write {:?}", out))?;
                    tracing::info!("Wrote {:?}", out);
                }
                None => println!("{}", html),
            }
        }

        Commands::Extensions => {
            for (i, ext) in EXTENSIONS.iter().enumerate() {
                println!("{:2}. {}", i + 1, ext);
            }
        }
    }

    Ok(())
}
