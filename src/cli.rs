use std::path::PathBuf;

use clap::{Parser, Subcommand};

use simlab::Category;

#[derive(Parser, Debug, Clone)]
#[command(name = "simlab", about = "Run content simulations and capture their output", version)]
pub struct Cli {
    /// Root directory of project content.
    #[arg(long = "projects-dir", global = true)]
    pub projects_dir: Option<PathBuf>,

    /// Root directory of blog posts.
    #[arg(long = "blog-dir", global = true)]
    pub blog_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the simulation attached to a project or post.
    Run {
        /// Content category: project or post.
        #[arg(value_parser = parse_category)]
        category: Category,

        /// Content identifier (directory name under the category root).
        identifier: String,

        /// Print the JSON wire form even on a terminal.
        #[arg(long)]
        json: bool,

        /// Wall-clock limit in seconds (0 disables).
        #[arg(long)]
        timeout: Option<u64>,

        /// Rasterization resolution for figures (1-1200).
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=1200))]
        dpi: Option<u32>,
    },

    /// Show which simulation file a content item resolves to.
    Locate {
        #[arg(value_parser = parse_category)]
        category: Category,

        identifier: String,
    },
}

fn parse_category(s: &str) -> Result<Category, String> {
    s.parse()
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}
