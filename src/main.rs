mod audit;
mod config;
mod coverage;
mod crosssite;
mod error;
mod insertion;
mod linker;
mod model;
mod report;
mod scan;
mod similarity;
mod themes;
mod topics;

use audit::{run_audit, Enricher};
use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::Colorize;
use config::Config;
use error::Result;
use insertion::InsertionSelector;
use linker::{Linker, Outcome, BACKUP_DIR_PREFIX, LINKS_REPORT_FILE};
use model::Priority;
use rand::rngs::StdRng;
use rand::SeedableRng;
use report::AuditData;
use scan::Scanner;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// crosslink - Internal and cross-site link opportunity finder
#[derive(Parser)]
#[command(name = "crosslink")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true, default_value = ".crosslink.toml")]
    config: PathBuf,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan every site, score link opportunities and write the audit reports
    Audit {
        /// Directory holding one subdirectory per site domain
        #[arg(default_value = ".")]
        root: PathBuf,

        /// Output directory for the JSON data and markdown report
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Print the audit data as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Add missing pillar links to blog posts (dry run unless --execute)
    Insert {
        /// Directory containing the audit data
        #[arg(short = 'd', long, default_value = ".")]
        audit_dir: PathBuf,

        /// Scan root the audit's file paths are relative to (defaults to the recorded root)
        #[arg(long)]
        root: Option<PathBuf>,

        /// Modify files (originals are backed up first)
        #[arg(long)]
        execute: bool,

        /// Seed for link sentence selection
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Show extracted topics and themes for one content file
    Topics {
        /// Markdown post or Astro page
        file: PathBuf,

        /// Maximum topics to show
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },

    /// Score the similarity of two content files
    Similar {
        file_a: PathBuf,
        file_b: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let result = Config::load(&cli.config).and_then(|config| match cli.command {
        Commands::Audit { root, output, json } => cmd_audit(&root, &output, json, &config, cli.quiet),
        Commands::Insert { audit_dir, root, execute, seed } => {
            cmd_insert(&audit_dir, root, execute, seed, &config, cli.quiet)
        }
        Commands::Topics { file, limit } => cmd_topics(&file, limit, &config),
        Commands::Similar { file_a, file_b } => cmd_similar(&file_a, &file_b, &config),
    });

    if let Err(e) = result {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn cmd_audit(root: &Path, output: &Path, json: bool, config: &Config, quiet: bool) -> Result<()> {
    let start = Instant::now();

    if !quiet && !json {
        println!("{} {}", "Scanning".cyan().bold(), root.display());
    }

    let records = Scanner::new(config)?.scan_sites(root);
    let items = Enricher::new(config)?.enrich_all(records);
    let analysis = run_audit(&items, config);

    let now = Utc::now();
    let scan_root = fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
    let data = AuditData::build(&items, &analysis, config, &scan_root, now.to_rfc3339());
    let (data_path, report_path) = report::write_reports(output, &data, &now.format("%Y-%m-%d").to_string())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }
    if quiet {
        return Ok(());
    }

    println!();
    println!("{}", "Content Inventory".green().bold());
    for (site, count) in &data.metadata.sites {
        println!("  {:>24}  {}", site.cyan(), count);
    }
    println!();

    let high = analysis
        .cross_site
        .iter()
        .filter(|o| o.priority == Priority::High)
        .count();

    println!("{}", "Summary".green().bold());
    println!("  Total items:            {}", items.len().to_string().cyan());
    println!("  Internal opportunities: {}", analysis.internal_opportunities().to_string().cyan());
    println!("  Missing pillar links:   {}", analysis.orphaned_blog_total().to_string().cyan());
    println!("  Related content gaps:   {}", analysis.content_gaps.len().to_string().cyan());
    println!(
        "  Cross-site links:       {} ({} high priority)",
        analysis.cross_site.len().to_string().cyan(),
        high
    );
    println!("  Orphan pages:           {}", analysis.orphans.len().to_string().cyan());
    println!();
    println!("  {} {}", "Data:".dimmed(), data_path.display());
    println!("  {} {}", "Report:".dimmed(), report_path.display());
    println!("  {}", format!("Done in {:.2?}", start.elapsed()).dimmed());

    Ok(())
}

fn cmd_insert(
    audit_dir: &Path,
    root: Option<PathBuf>,
    execute: bool,
    seed: Option<u64>,
    config: &Config,
    quiet: bool,
) -> Result<()> {
    let data = AuditData::load(audit_dir)?;

    let selector = InsertionSelector::new(
        &config.insertion_keywords,
        config.scoring.min_paragraph_chars,
        config.scoring.min_insertion_score,
    )?;
    let root = root.unwrap_or_else(|| PathBuf::from(&data.metadata.root));
    let linker = Linker::new(selector, config.scoring.max_insertions_per_pillar, root.clone());
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    if !quiet {
        let mode = if execute {
            "EXECUTE (files will be modified)".red().bold()
        } else {
            "DRY RUN (no changes will be made)".yellow().bold()
        };
        println!("{} {}\n", "Mode:".bold(), mode);
    }

    let plan = linker.plan(&data, &mut rng);

    if !quiet {
        for pillar in &plan.pillars {
            if pillar.blogs.is_empty() {
                continue;
            }
            println!("{} ({})", pillar.pillar.title.green().bold(), pillar.pillar.url.cyan());
            for blog in &pillar.blogs {
                match &blog.outcome {
                    Outcome::Added(m) => {
                        println!("  {} {}", "+".green(), blog.blog_title);
                        println!("    ...{}{}", m.preview.dimmed(), m.link_sentence);
                    }
                    Outcome::Skipped(reason) => {
                        println!("  {} {}: {}", "-".dimmed(), blog.blog_title, reason.dimmed());
                    }
                    Outcome::Failed(reason) => {
                        println!("  {} {}: {}", "!".yellow(), blog.blog_title, reason.yellow());
                    }
                }
            }
            println!();
        }
    }

    let added = plan.modifications().count();
    let report_path = audit_dir.join(LINKS_REPORT_FILE);
    fs::write(&report_path, linker::render_report(&plan, &Utc::now().format("%Y-%m-%d").to_string()))?;

    if execute {
        let backup_dir = root.join("backups").join(format!("{}{}", BACKUP_DIR_PREFIX, Utc::now().timestamp()));
        let written = plan.apply(&backup_dir)?;
        if !quiet {
            println!("{} {} files", "Modified".green().bold(), written);
            println!("  {} {}", "Backups:".dimmed(), backup_dir.display());
        }
    }

    if !quiet {
        println!("{}", "Summary".green().bold());
        println!("  Links to add:   {}", added.to_string().cyan());
        println!("  Files affected: {}", plan.files_affected().to_string().cyan());
        println!("  {} {}", "Report:".dimmed(), report_path.display());
        if !execute && added > 0 {
            println!();
            println!("{}", "Run with --execute to apply these changes.".yellow());
        }
    }

    Ok(())
}

fn cmd_topics(file: &Path, limit: usize, config: &Config) -> Result<()> {
    let mut config = config.clone();
    config.scoring.top_topics = limit;

    let record = Scanner::new(&config)?.scan_file(file)?;
    let item = Enricher::new(&config)?.enrich(record);

    println!("{} ({}, {} words)", item.title().green().bold(), item.content_type(), item.word_count());
    println!("  {}", item.url().cyan());
    println!();

    if item.topics().is_empty() {
        println!("{}", "No topics found.".yellow());
    } else {
        println!("{:>7}  {}", "Score", "Topic");
        println!("{}", "-".repeat(40));
        for topic in item.topics() {
            println!("{:>7.3}  {}", topic.score, topic.phrase);
        }
    }

    println!();
    let themes = if item.themes().is_empty() {
        "none".dimmed().to_string()
    } else {
        item.themes().join(", ")
    };
    println!("{} {}", "Themes:".bold(), themes);

    Ok(())
}

fn cmd_similar(file_a: &Path, file_b: &Path, config: &Config) -> Result<()> {
    let scanner = Scanner::new(config)?;
    let enricher = Enricher::new(config)?;
    let a = enricher.enrich(scanner.scan_file(file_a)?);
    let b = enricher.enrich(scanner.scan_file(file_b)?);

    let sim = similarity::similarity(&a, &b);
    let pct = (sim.score * 100.0).round() as u32;

    println!("{} <-> {}", a.title().cyan(), b.title().cyan());
    println!();
    println!("  Score:    {}%", pct.to_string().green().bold());
    println!("  Priority: {:?}", Priority::from_confidence(sim.score));
    println!("  Theme:    {}", sim.primary_theme.as_deref().unwrap_or("General"));
    if !sim.reason.is_empty() {
        println!("  Reason:   {}", sim.reason.dimmed());
    }
    if a.site() != b.site() && sim.score >= config.scoring.cross_site_min_confidence {
        println!();
        println!("{}", "Qualifies as a cross-site link opportunity.".green());
    }

    Ok(())
}
