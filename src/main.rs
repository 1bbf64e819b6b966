use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};

use dotprof::{
    commands, logging,
    paths::Paths,
    reconciler::{Options, Ownership},
    ui::{ColorMode, Ui},
};

#[derive(Parser)]
#[command(name = "dotprof")]
#[command(about = "Dotfile profile switcher - link a profile's files into your home directory")]
#[command(version)]
struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// When to use colors: always, auto, never
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: ColorMode,

    #[command(flatten)]
    mode: ModeArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ModeArgs {
    /// Report what would change without touching the filesystem
    #[arg(long, short = 'n', global = true)]
    dry_run: bool,

    /// Report every link as it is changed
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List all available profiles
    List,

    /// Show the active profile and the state of its links
    Current,

    /// Show the links a profile would create and what is there now
    Plan {
        /// Name of the profile to plan
        name: String,
    },

    /// Switch to a profile (activate it)
    Use {
        /// Name of the profile to activate
        name: String,

        /// Replace real files in the way (they are backed up first)
        #[arg(long)]
        overwrite: bool,

        /// Treat any link whose target contains the previous profile's name as its own
        #[arg(long)]
        match_name: bool,
    },

    /// Re-create the active profile's links
    Link {
        /// Replace real files in the way (they are backed up first)
        #[arg(long)]
        overwrite: bool,
    },

    /// Delete a profile and the links that still point into it
    Remove {
        /// Name of the profile to remove
        name: String,

        /// Treat any link whose target contains the profile name as its own
        #[arg(long)]
        match_name: bool,
    },

    /// Run diagnostics on the dotprof setup
    Doctor,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

impl ModeArgs {
    fn options(&self, paths: &Paths, overwrite: bool, match_name: bool) -> Options {
        Options {
            dry_run: self.dry_run,
            verbose: self.verbose,
            overwrite,
            ownership: if match_name {
                Ownership::NameSubstring
            } else {
                Ownership::Prefix
            },
            backups_dir: Some(paths.backups_dir.clone()),
        }
    }
}

fn run(cli: Cli, ui: &Ui) -> Result<()> {
    let paths = Paths::new()?;
    let mode = &cli.mode;

    match cli.command {
        Commands::List => commands::list(&paths, ui),
        Commands::Current => commands::current(&paths, ui),
        Commands::Plan { name } => commands::show_plan(&paths, &name, ui),
        Commands::Use {
            name,
            overwrite,
            match_name,
        } => commands::use_profile(&paths, &name, &mode.options(&paths, overwrite, match_name), ui),
        Commands::Link { overwrite } => {
            commands::link(&paths, &mode.options(&paths, overwrite, false), ui)
        }
        Commands::Remove { name, match_name } => {
            commands::remove(&paths, &name, &mode.options(&paths, false, match_name), ui)
        }
        Commands::Doctor => commands::doctor(&paths, ui),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "dotprof", &mut std::io::stdout());
            Ok(())
        }
    }
}

fn main() {
    let cli = Cli::parse();
    logging::init();
    let ui = Ui::new(cli.color, cli.no_color);

    if let Err(e) = run(cli, &ui) {
        ui.err(format!("{:#}", e));
        std::process::exit(1);
    }
}
