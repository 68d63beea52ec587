//! Command line of the E2E harness

#![allow(dead_code)]

use std::path::PathBuf;
use clap::{ArgAction, Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NavigatorArg {
    Playwright,
    Http,
}

#[derive(Parser, Debug)]
#[command(name = "siteprobe-e2e")]
#[command(about = "Site audit and API validation suite")]
pub struct Args {
    /// Suite file (the built-in suite is used when neither --suite nor --suites is given)
    #[arg(long)]
    pub suite: Option<PathBuf>,

    /// Directory of suite files to run one after another
    #[arg(long)]
    pub suites: Option<PathBuf>,

    /// Run only the scenario with this name
    #[arg(short, long)]
    pub name: Option<String>,

    /// Override the suite's target URL
    #[arg(long)]
    pub target_url: Option<String>,

    /// Override the remote debugging port used for Lighthouse
    #[arg(long)]
    pub debugging_port: Option<u16>,

    /// How pages are loaded for the resource scan
    #[arg(long, value_enum, default_value = "playwright")]
    pub navigator: NavigatorArg,

    /// Run the browser headless (`--headless false` shows the window)
    #[arg(long, action = ArgAction::Set, default_value_t = true)]
    pub headless: bool,

    /// Directory holding node_modules with playwright and lighthouse
    #[arg(long, default_value = ".")]
    pub node_project_dir: PathBuf,

    /// Directory for JSON report files
    #[arg(long, default_value = "reports")]
    pub reports_dir: PathBuf,

    /// Output directory for results
    #[arg(short, long, default_value = "test-results")]
    pub output: PathBuf,
}
