use api_version_bump::{
    config::Settings,
    config::GitLabSettings,
    runner::ApiVersionUpdater,
    types::Outcome,
};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Exit status when the manifest already records the latest version.
const EXIT_UP_TO_DATE: u8 = 3;

#[derive(Parser)]
#[command(name = "api-version-bump")]
#[command(version, about = "Update sourceApiVersion in sfdx-project.json to the latest API version")]
struct Cli {
    /// URL listing all supported API versions, e.g. https://org.my.salesforce.com/services/data
    #[arg(short, long)]
    url: Option<String>,

    /// Project manifest to check and update [default: ./sfdx-project.json]
    #[arg(short, long, value_name = "FILE")]
    file: Option<PathBuf>,

    /// YAML file providing defaults for any of these options
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// GitLab host used to open a merge request with the update
    #[arg(short, long)]
    server: Option<String>,

    /// Numeric GitLab project id
    #[arg(short, long)]
    project: Option<u64>,

    /// GitLab private access token
    #[arg(short, long)]
    token: Option<String>,

    /// Branch the update branch is cut from and merged back into
    #[arg(short, long)]
    branch: Option<String>,

    /// HTTP timeout in seconds (none by default)
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Log debug output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn settings(&self) -> Settings {
        Settings {
            url: self.url.clone(),
            file: self.file.clone(),
            timeout_secs: self.timeout,
            gitlab: GitLabSettings {
                server: self.server.clone(),
                project: self.project,
                token: self.token.clone(),
                branch: self.branch.clone(),
            },
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "api_version_bump=debug" } else { "api_version_bump=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(false)
        .without_time()
        .init();
}

async fn run(cli: &Cli) -> anyhow::Result<Outcome> {
    let base = match &cli.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::default(),
    };
    let config = base.merge(cli.settings()).resolve()?;
    let updater = ApiVersionUpdater::new(config)?;
    updater.run().await
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli).await {
        Ok(outcome @ Outcome::Updated { .. }) => {
            println!("{}", outcome.latest());
            ExitCode::SUCCESS
        }
        Ok(Outcome::UpToDate { .. }) => ExitCode::from(EXIT_UP_TO_DATE),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
