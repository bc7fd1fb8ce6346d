//! catdiff - operator catalog diff generator
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Computes the minimal set of operator bundles to mirror into a
//! disconnected registry.
//!
//! # Overview
//!
//! A run loads the full current catalog (`--new`) and, optionally, the
//! catalog mirrored last time (`--old`). The diff generator keeps only what
//! changed, narrowed by the packages named in the mirror configuration,
//! optionally reduced to channel heads, then closed over bundle
//! dependencies. The result is written as a declarative-config `index.json`.
//!
//! # Mirror configuration
//!
//! ```text
//! headsOnly: true
//! additive: false
//! skipDependencies: false
//! fallbackChannel: stable
//! packages:
//!   - name: etcd
//!     channels:
//!       - name: stable
//!         minVersion: 0.9.2
//! ```
//!
//! Files ending in `.toml` are read as TOML, anything else as YAML.

pub mod cmd;
pub mod config;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "catdiff")]
#[command(author, version, about = "catdiff - operator catalog diff generator")]
pub struct Cli {
    /// Log every selection decision
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Compute the catalog subset to mirror
    Diff {
        /// Current catalog (file or directory); repeat to overlay catalogs
        #[arg(long, required = true)]
        new: Vec<PathBuf>,
        /// Catalog mirrored by the previous run
        #[arg(long)]
        old: Option<PathBuf>,
        /// Mirror configuration file (YAML or TOML)
        #[arg(long, short, env = "CATDIFF_CONFIG")]
        config: Option<PathBuf>,
        /// Keep only channel heads plus dependencies
        #[arg(long)]
        heads_only: bool,
        /// Keep the heads of every package alongside explicitly requested versions
        #[arg(long)]
        additive: bool,
        /// Do not pull in required packages and APIs
        #[arg(long)]
        skip_deps: bool,
        /// Channel suggested when a default channel cannot be chosen
        #[arg(long)]
        fallback_channel: Option<String>,
        /// Directory to write index.json into (stdout if omitted)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// List bundle and related images of a catalog
    Images {
        /// Catalog file or directory
        path: PathBuf,
    },
    /// Check that a catalog is a valid upgrade graph
    Validate {
        /// Catalog file or directory
        path: PathBuf,
    },
    /// Manage include configs between runs
    Include {
        #[command(subcommand)]
        command: IncludeCommands,
    },
}

#[derive(Debug, Subcommand)]
pub enum IncludeCommands {
    /// Print an include config starting at each channel's lowest version
    Init {
        /// Catalog file or directory
        path: PathBuf,
    },
    /// Refresh a previous include config against a catalog
    Update {
        /// Catalog file or directory
        path: PathBuf,
        /// Include config written by a previous run
        #[arg(long)]
        previous: PathBuf,
    },
}
