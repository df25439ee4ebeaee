use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use diffstage::{Config, Stager, StagingOperationResult, format_diff};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "diffstage", version)]
#[command(about = "Inspect git status and diffs, stage and unstage files or hunks")]
struct Cli {
    /// Repository to operate on
    #[arg(long, global = true, default_value = ".")]
    repo: PathBuf,

    /// git executable to run
    #[arg(long, global = true, default_value = "git")]
    git: String,

    /// How long a status snapshot is reused, in milliseconds
    #[arg(long, global = true, default_value_t = 1000)]
    cache_ms: u64,

    /// Log git invocations and cache activity (overridden by DIFFSTAGE_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List changed files in porcelain form
    Status,
    /// Count staged, unstaged, untracked and conflicted files
    Summary,
    /// Show the diff with line numbers
    Diff {
        /// Compare the index with HEAD instead of the worktree with the index
        #[arg(long)]
        staged: bool,
        paths: Vec<String>,
    },
    /// Stage files
    Stage {
        /// Skip files whose changes are already staged
        #[arg(long)]
        smart: bool,
        #[arg(required = true)]
        paths: Vec<String>,
    },
    /// Unstage files
    Unstage {
        /// Skip files with nothing staged
        #[arg(long)]
        smart: bool,
        #[arg(required = true)]
        paths: Vec<String>,
    },
    /// Unstage staged files and stage the rest
    Toggle {
        #[arg(required = true)]
        paths: Vec<String>,
    },
    /// Stage every changed, untracked or conflicted file
    StageAll,
    /// Unstage everything
    UnstageAll,
    /// Stage changes to tracked files only
    StageModified,
    /// Stage untracked files only
    StageUntracked,
    /// Stage one hunk of a file's unstaged diff
    StageHunk {
        path: String,
        /// Zero-based hunk index as listed by `diff`
        index: usize,
    },
    /// Unstage one hunk of a file's staged diff
    UnstageHunk { path: String, index: usize },
    /// Print shell completions
    Completions { shell: Shell },
    /// Print the man page
    Man,
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_env("DIFFSTAGE_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "diffstage=debug" } else { "warn" })
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn report(result: &StagingOperationResult) -> ExitCode {
    for path in &result.successful_files {
        println!("{}: {}", result.operation, path);
    }
    for path in &result.skipped_files {
        println!("skipped: {}", path);
    }
    for (path, error) in &result.errors {
        eprintln!("failed: {}: {}", path, error);
    }

    if result.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::new(&cli.repo)
        .with_git_program(&cli.git)
        .with_cache_validity(Duration::from_millis(cli.cache_ms));
    let mut status = diffstage::open(&config);

    let code = match cli.command {
        Commands::Status => {
            for entry in status.detailed_status(true)? {
                println!("{}", entry);
            }
            ExitCode::SUCCESS
        }
        Commands::Summary => {
            let summary = status.status_summary()?;
            println!("total:      {}", summary.total_files);
            println!("staged:     {}", summary.staged_files);
            println!("unstaged:   {}", summary.unstaged_files);
            println!("untracked:  {}", summary.untracked_files);
            println!("conflicted: {}", summary.conflicted_files);
            ExitCode::SUCCESS
        }
        Commands::Diff { staged, paths } => {
            let diff = status.diff(&paths, staged)?;
            for diagnostic in &diff.diagnostics {
                tracing::warn!(
                    line = diagnostic.line_number,
                    kind = ?diagnostic.kind,
                    "skipped diff line"
                );
            }
            println!("{}", format_diff(&diff));
            ExitCode::SUCCESS
        }
        Commands::Stage { smart, paths } => {
            let mut stager = Stager::new(&mut status);
            report(&if smart {
                stager.smart_stage_files(&paths)
            } else {
                stager.stage_files(&paths)
            })
        }
        Commands::Unstage { smart, paths } => {
            let mut stager = Stager::new(&mut status);
            report(&if smart {
                stager.smart_unstage_files(&paths)
            } else {
                stager.unstage_files(&paths)
            })
        }
        Commands::Toggle { paths } => {
            report(&Stager::new(&mut status).toggle_files_staging(&paths))
        }
        Commands::StageAll => report(&Stager::new(&mut status).stage_all()?),
        Commands::UnstageAll => report(&Stager::new(&mut status).unstage_all()?),
        Commands::StageModified => report(&Stager::new(&mut status).stage_modified()?),
        Commands::StageUntracked => report(&Stager::new(&mut status).stage_untracked()?),
        Commands::StageHunk { path, index } => {
            Stager::new(&mut status).stage_hunk(&path, index)?;
            println!("staged hunk {} of {}", index, path);
            ExitCode::SUCCESS
        }
        Commands::UnstageHunk { path, index } => {
            Stager::new(&mut status).unstage_hunk(&path, index)?;
            println!("unstaged hunk {} of {}", index, path);
            ExitCode::SUCCESS
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "diffstage", &mut io::stdout());
            ExitCode::SUCCESS
        }
        Commands::Man => {
            clap_mangen::Man::new(Cli::command()).render(&mut io::stdout())?;
            ExitCode::SUCCESS
        }
    };

    Ok(code)
}
