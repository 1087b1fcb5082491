use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cv::config::Config;
use cv::drafting::{DraftProvider, ManualProvider, NoopProvider};
use cv::errors::{has_errors, Issue};
use cv::grounding::check_draft;
use cv::ingest::ingest_pdf;
use cv::layout::default_page_config;
use cv::loader::{list_job_files, load_canonical_data};
use cv::pipeline::{build_cv, build_from_markdown, explain_selection, lint_inputs, BuildRequest};
use cv::provenance::SystemClock;
use cv::selection::format_selection_explanation;

#[derive(Parser, Debug)]
#[command(name = "cv", about = "Compile canonical career facts into an ATS-safe CV", version)]
struct Cli {
    /// Show every finding, including non-ASCII input warnings
    #[arg(long, global = true, default_value_t = false)]
    debug: bool,

    /// Data directory (overrides CV_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build markdown and PDF artifacts
    Build(BuildArgs),
    /// Lint canonical inputs without building
    Lint,
    /// Print the selection decision for every candidate
    Explain {
        /// Job id (resolved under the jobs directory) or path to a job file
        #[arg(long)]
        job: Option<String>,
        /// Print the selection as JSON instead of text
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Dry-run grounding checks over a saved model response
    CheckDraft {
        /// File holding the raw model response
        response: PathBuf,
    },
    /// Bootstrap data files from an existing PDF CV
    Ingest {
        /// PDF to import (default: <data-dir>/cv.pdf)
        pdf: Option<PathBuf>,
        /// Replace existing data files
        #[arg(long, default_value_t = false)]
        overwrite: bool,
        /// Drafting provider
        #[arg(long, value_enum, default_value_t = ProviderKind::Manual)]
        provider: ProviderKind,
        /// Directory for manual request/response files (default: <data-dir>)
        #[arg(long)]
        exchange_dir: Option<PathBuf>,
    },
}

#[derive(clap::Args, Debug)]
struct BuildArgs {
    /// Output directory (overrides CV_OUT_DIR)
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Job id (resolved under the jobs directory) or path to a job file
    #[arg(long, conflicts_with = "all_jobs")]
    job: Option<String>,

    /// Build once per job file in the jobs directory
    #[arg(long, default_value_t = false)]
    all_jobs: bool,

    /// Ask the drafting provider for experience entries grounded in projects
    #[arg(long, default_value_t = false)]
    generate_experience: bool,

    /// Archive hand-authored experience files before writing generated ones
    #[arg(long, default_value_t = false, requires = "generate_experience")]
    experience_regenerate: bool,

    /// Ask the drafting provider which skills to emphasize
    #[arg(long, default_value_t = false)]
    highlight_skills: bool,

    /// Drafting provider
    #[arg(long, value_enum, default_value_t = ProviderKind::Manual)]
    provider: ProviderKind,

    /// Directory for manual request/response files (default: <out-dir>/llm)
    #[arg(long)]
    exchange_dir: Option<PathBuf>,

    /// Re-render a hand-edited markdown file to PDF instead of building from facts
    #[arg(long, conflicts_with_all = ["job", "all_jobs", "generate_experience", "highlight_skills"])]
    from_markdown: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ProviderKind {
    Noop,
    Manual,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }

    // Logs go to stderr; stdout carries only output paths and reports.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("cv v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Build(args) => run_build(&config, args, cli.debug),
        Command::Lint => {
            let issues = lint_inputs(&config.data_dir)?;
            report(&issues, cli.debug);
            if has_errors(&issues) {
                bail!("lint found errors");
            }
            Ok(())
        }
        Command::Explain { job, json } => {
            let job_path = job.map(|j| resolve_job(&config.jobs_dir, &j));
            let selection =
                explain_selection(&config.data_dir, job_path.as_deref(), &config.selection)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&selection)?);
            } else {
                print!("{}", format_selection_explanation(&selection));
            }
            Ok(())
        }
        Command::CheckDraft { response } => {
            let text = fs::read_to_string(&response)
                .with_context(|| format!("Failed to read {}", response.display()))?;
            let data = load_canonical_data(&config.data_dir)?;
            let issues = check_draft(&text, &data.projects, &config.grounding);
            report(&issues, cli.debug);
            if has_errors(&issues) {
                bail!("draft would be rejected");
            }
            println!("draft ok");
            Ok(())
        }
        Command::Ingest {
            pdf,
            overwrite,
            provider,
            exchange_dir,
        } => {
            let pdf = pdf.unwrap_or_else(|| config.data_dir.join("cv.pdf"));
            let provider = make_provider(
                provider,
                exchange_dir.unwrap_or_else(|| config.data_dir.clone()),
            );
            let result = ingest_pdf(&config.data_dir, &pdf, provider.as_ref(), overwrite)
                .with_context(|| format!("Failed to import {}", pdf.display()))?;
            for warning in &result.warnings {
                eprintln!("WARNING INGEST: {warning}");
            }
            for path in &result.written_paths {
                println!("{}", path.display());
            }
            Ok(())
        }
    }
}

fn run_build(config: &Config, args: BuildArgs, debug: bool) -> Result<()> {
    let out_dir = args.out_dir.clone().unwrap_or_else(|| config.out_dir.clone());
    let page = default_page_config();

    if let Some(source) = &args.from_markdown {
        let result = build_from_markdown(source, &out_dir, &page)?;
        report(&result.issues, debug);
        if let Some(pdf) = &result.pdf_path {
            println!("{}", pdf.display());
        }
        return Ok(());
    }

    let provider = make_provider(
        args.provider,
        args.exchange_dir
            .clone()
            .unwrap_or_else(|| out_dir.join("llm")),
    );

    let jobs: Vec<Option<PathBuf>> = if args.all_jobs {
        list_job_files(&config.jobs_dir)?.into_iter().map(Some).collect()
    } else {
        vec![args.job.as_deref().map(|j| resolve_job(&config.jobs_dir, j))]
    };

    let mut failed = false;
    for job_path in jobs {
        let request = BuildRequest {
            data_dir: config.data_dir.clone(),
            out_dir: out_dir.clone(),
            backup_dir: config.backup_dir.clone(),
            job_path,
            generate_experience: args.generate_experience,
            experience_regenerate: args.experience_regenerate,
            highlight_skills: args.highlight_skills,
            selection: config.selection.clone(),
            grounding: config.grounding,
            max_skills_per_category: config.max_skills_per_category,
            page: page.clone(),
        };
        let result = build_cv(&request, provider.as_ref(), &SystemClock)?;
        report(&result.issues, debug);
        failed |= result.has_errors();
        for path in [&result.markdown_path, &result.pdf_path].into_iter().flatten() {
            println!("{}", path.display());
        }
    }

    if failed {
        bail!("build failed; see errors above");
    }
    Ok(())
}

fn make_provider(kind: ProviderKind, exchange_dir: PathBuf) -> Box<dyn DraftProvider> {
    match kind {
        ProviderKind::Noop => Box::new(NoopProvider),
        ProviderKind::Manual => Box::new(ManualProvider::new(exchange_dir)),
    }
}

/// A bare id maps to `<jobs_dir>/<id>.md`; anything that looks like a path is used as given.
fn resolve_job(jobs_dir: &Path, job: &str) -> PathBuf {
    let as_path = Path::new(job);
    if as_path.extension().is_some() || as_path.components().count() > 1 {
        as_path.to_path_buf()
    } else {
        jobs_dir.join(format!("{job}.md"))
    }
}

fn report(issues: &[Issue], debug: bool) {
    for issue in issues {
        if !debug && issue.code == "UNICODE_NON_ASCII" {
            continue;
        }
        eprintln!("{issue}");
    }
}
