//! bdep - build-dependency closures for package repositories
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
//!
//! Answers "what has to be built before these packages" over a snapshot of
//! a repository branch, with cycles grouped and the result in build order.
//!
//! # Files
//!
//! ```text
//! ~/.bdep/
//! ├── config.toml     # Engine configuration (optional)
//! └── universe.json   # Default universe snapshot
//! ```

pub mod cmd;

use bdep_core::{FilterRequest, ScopeRequest};
use bdep_schema::DependencyType;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "bdep")]
#[command(author, version, about = "bdep - build-dependency closures and build order")]
pub struct Cli {
    /// Universe snapshot (JSON); defaults to ~/.bdep/universe.json
    #[arg(long, global = true, env = "BDEP_UNIVERSE")]
    pub universe: Option<PathBuf>,

    /// Engine configuration file; defaults to ~/.bdep/config.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print the result as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build dependencies of source packages, up to a depth
    #[command(name = "build-deps")]
    BuildDeps(BuildDepsArgs),
    /// Everything the packages need, however deep
    #[command(name = "full-deps")]
    FullDeps(FullDepsArgs),
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Debug, Args)]
pub struct BuildDepsArgs {
    /// Source package name(s)
    #[arg(required = true)]
    pub packages: Vec<String>,

    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Levels to expand, the packages themselves being level 1
    #[arg(long, short, default_value_t = 1)]
    pub depth: u32,

    /// Go three levels deep, keeping at the last level only what the
    /// second-level sources themselves need to build (overrides --depth)
    #[arg(long)]
    pub half_step: bool,

    #[command(flatten)]
    pub filters: FilterArgs,
}

#[derive(Debug, Args)]
pub struct FullDepsArgs {
    /// Source or binary package name(s)
    #[arg(required = true)]
    pub packages: Vec<String>,

    #[command(flatten)]
    pub scope: ScopeArgs,

    #[command(flatten)]
    pub filters: FilterArgs,
}

#[derive(Debug, Args)]
pub struct ScopeArgs {
    /// Branch (package set) name
    #[arg(long, short)]
    pub branch: String,

    /// Architecture(s); noarch is always added
    #[arg(long = "arch", short, value_delimiter = ',')]
    pub archs: Vec<String>,

    /// Which requirements to follow: source, binary or both
    #[arg(long, default_value = "both")]
    pub dptype: DependencyType,
}

#[derive(Debug, Args)]
pub struct FilterArgs {
    /// Keep only what this package requires, transitively
    #[arg(long)]
    pub leaf: Option<String>,

    /// Keep only packages nothing else in the result requires
    #[arg(long)]
    pub finite: bool,

    /// Keep packages requiring something these binaries provide
    #[arg(long, value_delimiter = ',')]
    pub filter_by_package: Vec<String>,

    /// Keep packages requiring something a binary of this source provides
    #[arg(long)]
    pub filter_by_source: Option<String>,
}

impl ScopeArgs {
    pub fn to_request(&self) -> ScopeRequest {
        ScopeRequest {
            branch: self.branch.clone(),
            archs: self.archs.clone(),
            dependency_type: self.dptype,
        }
    }
}

impl FilterArgs {
    pub fn to_request(&self) -> FilterRequest {
        FilterRequest {
            leaf: self.leaf.clone(),
            finite_package: self.finite,
            filter_by_package: self.filter_by_package.clone(),
            filter_by_source: self.filter_by_source.clone(),
        }
    }
}
