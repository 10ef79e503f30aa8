//! skillscan CLI — scan agent skills, browser/IDE extensions, and MCP servers for
//! security findings, with no server overhead: calls into `skillscan-core` directly.

use clap::{Parser, Subcommand};
use skillscan_core::orchestrator::{Engine, NoopProgressSink};
use skillscan_core::types::{ScanOptions, Severity, Target};
use skillscan_core::{config, report, store, targets};
use std::path::PathBuf;

/// skillscan — static security scanner for agent skills, extensions, and MCP servers.
#[derive(Parser)]
#[command(name = "skillscan", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a project config file (default: <root>/.skillscan.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan one or more targets and report findings
    Scan {
        /// Project root to scan as a plain path target (default: current directory)
        #[arg(long)]
        root: Option<PathBuf>,

        /// Discover SKILL.md-rooted directories under root and scan each as a target
        #[arg(long)]
        skills: bool,

        /// .mcp.json / claude_desktop_config.json files to parse as MCP targets
        #[arg(long = "mcp-config")]
        mcp_configs: Vec<PathBuf>,

        /// Additional directories of YAML rule files (default: ./rules)
        #[arg(long = "rules")]
        rule_dirs: Vec<PathBuf>,

        /// Output format
        #[arg(long, default_value = "json")]
        format: ReportFormat,

        /// Exit with status 2 if any finding meets or exceeds this severity
        #[arg(long = "fail-on")]
        fail_on: Option<SeverityArg>,

        /// Drop findings below this confidence score
        #[arg(long = "min-confidence")]
        min_confidence: Option<f64>,

        /// Disable the on-disk scan cache
        #[arg(long)]
        no_cache: bool,

        /// Apply narrow auto-fixes (comment out matched lines) for signature findings
        #[arg(long)]
        fix: bool,

        /// Persist this scan to the result history store
        #[arg(long)]
        save: bool,
    },
    /// Validate or list the compiled rule corpus
    Rules {
        /// Directories of YAML rule files (default: ./rules)
        #[arg(long = "rules")]
        rule_dirs: Vec<PathBuf>,

        /// List every compiled rule instead of just validating the corpus
        #[arg(long)]
        list: bool,
    },
    /// Inspect persisted scan history
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
    /// Generate shell completion scripts
    Completions { shell: clap_complete::Shell },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// List persisted scans, newest first
    List,
    /// Show one persisted scan by id
    Show { id: String },
    /// Diff two persisted scans by id
    Diff { baseline: String, current: String },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum ReportFormat {
    Json,
    Sarif,
}

#[derive(Clone, Copy)]
struct SeverityArg(Severity);

impl std::str::FromStr for SeverityArg {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Severity::parse(s)
            .map(SeverityArg)
            .ok_or_else(|| format!("invalid severity: {s}"))
    }
}

fn resolve_root(root: Option<PathBuf>) -> PathBuf {
    root.unwrap_or_else(|| std::env::current_dir().expect("could not determine current directory"))
        .canonicalize()
        .expect("path not found")
}

fn history_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("skillscan")
        .join("history.json")
}

fn default_rule_dirs(explicit: &[PathBuf], config_paths: &[PathBuf]) -> Vec<PathBuf> {
    if !explicit.is_empty() {
        return explicit.to_vec();
    }
    if !config_paths.is_empty() {
        return config_paths.to_vec();
    }
    let fallback = PathBuf::from("rules");
    if fallback.is_dir() {
        vec![fallback]
    } else {
        Vec::new()
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("skillscan=warn".parse().unwrap()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            root,
            skills,
            mcp_configs,
            rule_dirs,
            format,
            fail_on,
            min_confidence,
            no_cache,
            fix,
            save,
        } => {
            let root = resolve_root(root);
            let project_config = config::ScanConfig::load_from(&root, cli.config.as_deref());

            let scan_roots: Vec<PathBuf> = if project_config.scan_dirs.is_empty() {
                vec![root.clone()]
            } else {
                project_config
                    .scan_dirs
                    .iter()
                    .map(|dir| root.join(dir))
                    .collect()
            };

            let mut scan_targets: Vec<Target> = Vec::new();
            for scan_root in &scan_roots {
                if skills {
                    scan_targets.extend(targets::discover_skills(
                        scan_root,
                        &project_config.skip_dirs,
                    ));
                } else {
                    scan_targets.push(targets::discover_path(scan_root));
                }
            }
            scan_targets.extend(targets::discover_mcp_configs(&mcp_configs));

            if scan_targets.is_empty() {
                eprintln!("no targets to scan");
                std::process::exit(1);
            }

            let rule_dirs = default_rule_dirs(&rule_dirs, &project_config.rule_paths);
            if rule_dirs.is_empty() {
                eprintln!("warning: no rule directories found; only heuristic analyzers will run");
            }

            let mcp_scan = project_config
                .mcp_scan
                .iter()
                .filter_map(|kind| skillscan_core::types::McpScanKind::parse(kind))
                .collect();

            let options = ScanOptions {
                use_behavioral: project_config.use_behavioral,
                use_cache: !no_cache,
                cache_ttl_secs: project_config.cache_ttl_secs,
                min_confidence,
                max_workers: project_config.max_workers,
                fix,
                mcp_scan,
                ..ScanOptions::default()
            };

            let engine = match Engine::new(&rule_dirs, &options) {
                Ok(engine) => engine,
                Err(err) => {
                    eprintln!("failed to compile rule corpus: {err}");
                    std::process::exit(1);
                }
            };

            let result = engine.scan(&scan_targets, &options, &NoopProgressSink);

            if fix {
                match skillscan_core::fix::apply_fixes(&result.findings) {
                    Ok(fixes) => {
                        let files_fixed = fixes.iter().filter(|f| f.lines_fixed > 0).count();
                        eprintln!("fixed {files_fixed} file(s)");
                    }
                    Err(err) => eprintln!("fix mode failed: {err}"),
                }
            }

            if save {
                let mut result_store = store::ResultStore::load(&history_path());
                match result_store.save(result.clone(), 50) {
                    Ok(id) => eprintln!("saved scan {id}"),
                    Err(err) => eprintln!("failed to save scan history: {err}"),
                }
            }

            let rendered = match format {
                ReportFormat::Json => report::render_json(&result),
                ReportFormat::Sarif => report::render_sarif(&result),
            };
            println!("{}", serde_json::to_string_pretty(&rendered).unwrap());

            if let Some(SeverityArg(floor)) = fail_on {
                if store::any_meets_severity(&result.findings, floor) {
                    std::process::exit(2);
                }
            }
        }
        Commands::Rules { rule_dirs, list } => {
            let rule_dirs = default_rule_dirs(&rule_dirs, &[]);
            if rule_dirs.is_empty() {
                eprintln!("no rule directories found (pass --rules or create ./rules)");
                std::process::exit(1);
            }
            let mut corpus = Vec::new();
            for dir in &rule_dirs {
                match skillscan_core::rules::compile_directory(dir) {
                    Ok(rules) => corpus.extend(rules),
                    Err(err) => {
                        eprintln!("failed to compile rules in {}: {err}", dir.display());
                        std::process::exit(1);
                    }
                }
            }
            println!(
                "compiled {} rule(s), rule_version={}",
                corpus.len(),
                skillscan_core::rules::rule_version(&corpus)
            );
            if list {
                for rule in &corpus {
                    println!("  {:<32} {:<10} {}", rule.id, rule.severity, rule.category);
                }
            }
        }
        Commands::History { action } => match action {
            HistoryAction::List => {
                let result_store = store::ResultStore::load(&history_path());
                for scan in result_store.list() {
                    println!(
                        "{}  {} finding(s)  {} file(s) scanned",
                        scan.id,
                        scan.result.findings.len(),
                        scan.result.scanned_files
                    );
                }
            }
            HistoryAction::Show { id } => {
                let result_store = store::ResultStore::load(&history_path());
                match result_store.get(&id) {
                    Some(scan) => {
                        let rendered = report::render_json(&scan.result);
                        println!("{}", serde_json::to_string_pretty(&rendered).unwrap());
                    }
                    None => {
                        eprintln!("no such scan: {id}");
                        std::process::exit(1);
                    }
                }
            }
            HistoryAction::Diff { baseline, current } => {
                let result_store = store::ResultStore::load(&history_path());
                let (Some(baseline_scan), Some(current_scan)) =
                    (result_store.get(&baseline), result_store.get(&current))
                else {
                    eprintln!("baseline or current scan id not found");
                    std::process::exit(1);
                };
                let diff_report = store::diff(&baseline_scan.result, &current_scan.result);
                println!("{}", serde_json::to_string_pretty(&diff_report).unwrap());
            }
        },
        Commands::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
        }
    }
}
