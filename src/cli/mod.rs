/// Command-line option parsing
use clap::error::ErrorKind;
use clap::{ArgAction, CommandFactory, FromArgMatches, Parser};
use std::ffi::OsString;

use crate::config::InstallParams;
use crate::error::InstallError;
use crate::utils::checks::require_argument;

/// Install the Istio service mesh onto a GKE cluster
#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
#[command(name = "mesh-installer")]
#[command(about = "Install the Istio service mesh onto a GKE cluster", long_about = None)]
#[command(disable_help_flag = true, args_override_self = true)]
pub struct Cli {
    /// Name of the GKE cluster
    #[arg(short = 'n', long = "cluster-name", value_name = "NAME")]
    pub cluster_name: Option<String>,

    /// Region the cluster runs in
    #[arg(short = 'r', long = "cluster-region", value_name = "REGION")]
    pub cluster_region: Option<String>,

    /// Google Cloud project that owns the cluster
    #[arg(short = 'p', long = "google-cloud-project", value_name = "PROJECT")]
    pub google_cloud_project: Option<String>,

    /// Print this help
    #[arg(short = 'h', long = "help", action = ArgAction::Help)]
    pub(crate) help: Option<bool>,
}

/// Option syntax accepted on the host platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Short and long options (GNU getopt)
    Gnu,
    /// Short options only (BSD getopt)
    Bsd,
}

/// What the caller should do after parsing
#[derive(Debug, PartialEq, Eq)]
pub enum ParseOutcome {
    /// Print the usage text and exit successfully
    Usage(String),
    /// Proceed with the parsed flags
    Run(Cli),
}

const OPTION_IDS: [&str; 4] = [
    "cluster_name",
    "cluster_region",
    "google_cloud_project",
    "help",
];

impl Cli {
    /// Validate the parsed flags into immutable install parameters
    pub fn into_params(self) -> Result<InstallParams, InstallError> {
        let cluster_name = require_argument(self.cluster_name, "cluster name (-n)")?;
        let cluster_region = require_argument(self.cluster_region, "cluster region (-r)")?;
        let project = require_argument(self.google_cloud_project, "Google Cloud project (-p)")?;

        Ok(InstallParams {
            cluster_name,
            cluster_region,
            project,
        })
    }
}

/// Build the clap command for a parse mode
pub fn command(mode: ParseMode) -> clap::Command {
    let cmd = Cli::command();
    match mode {
        ParseMode::Gnu => cmd,
        ParseMode::Bsd => OPTION_IDS
            .iter()
            .fold(cmd, |cmd, id| cmd.mut_arg(*id, |arg| arg.long(None::<&'static str>))),
    }
}

/// Parse process arguments (including the program name)
pub fn parse<I, T>(args: I, mode: ParseMode) -> Result<ParseOutcome, InstallError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let mut cmd = command(mode);

    match cmd.try_get_matches_from_mut(args) {
        Ok(matches) => Cli::from_arg_matches(&matches)
            .map(ParseOutcome::Run)
            .map_err(|e| InstallError::ArgumentEvaluation(first_line(&e))),
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::UnknownArgument => {
                Ok(ParseOutcome::Usage(cmd.render_help().to_string()))
            }
            _ => Err(InstallError::ArgumentEvaluation(first_line(&e))),
        },
    }
}

fn first_line(err: &clap::Error) -> String {
    let rendered = err.to_string();
    rendered
        .lines()
        .next()
        .unwrap_or_default()
        .trim_start_matches("error: ")
        .to_string()
}
