pub mod judge;
pub mod run;
pub mod status;

#[derive(Debug, clap::Parser)]
#[command(author, version, about, long_about = None)]
pub struct GlobalArgs {
    #[command(subcommand)]
    pub subcmd: Subcommand,

    /// Allow the unconfined local process runner (debug/demo use
    /// only; equivalent to BELAY_REQUIRE_SECURE=false).
    #[arg(long, global = true)]
    pub insecure: bool,
}

#[derive(Debug, clap::Subcommand)]
pub enum Subcommand {
    #[command(alias("j"))]
    Judge(judge::Args),

    Run(run::Args),

    Status(status::Args),
}

pub type SubcmdResult = anyhow::Result<()>;

impl GlobalArgs {
    pub async fn exec_subcmd(&self) -> SubcmdResult {
        use Subcommand::*;
        match &self.subcmd {
            Judge(args) => judge::exec(args, self).await,
            Run(args) => run::exec(args, self).await,
            Status(args) => status::exec(args, self).await,
        }
    }
}
