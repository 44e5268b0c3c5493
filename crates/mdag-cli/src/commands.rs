use std::io::Write;
use std::path::Path;

use anyhow::Context as _;
use colored::Colorize;
use tracing::info;

use mdag_crypto::Blake3Factory;
use mdag_dag::{
    materialize, DagBuilder, DagConfig, DagReader, FsNode, Link, LinkKind, VerifyReport,
};
use mdag_store::FileStore;
use mdag_types::Digest;

use crate::cli::*;

/// Everything a command needs: where objects live and how DAGs are shaped.
struct Context {
    store: std::path::PathBuf,
    config: DagConfig,
    format: OutputFormat,
}

impl Context {
    fn from_cli(cli: &Cli) -> anyhow::Result<Self> {
        let config = match &cli.config {
            Some(path) => DagConfig::load(path)?,
            None => DagConfig::default(),
        };
        Ok(Self {
            store: cli.store.clone(),
            config,
            format: cli.format,
        })
    }

    fn builder(&self) -> anyhow::Result<DagBuilder<FileStore, Blake3Factory>> {
        let store = FileStore::open(&self.store)
            .with_context(|| format!("opening store {}", self.store.display()))?;
        Ok(DagBuilder::new(store, Blake3Factory::OBJECT, self.config.clone())?)
    }

    fn reader(&self) -> anyhow::Result<DagReader<FileStore, Blake3Factory>> {
        let store = FileStore::open_read_only(&self.store)
            .with_context(|| format!("opening store {}", self.store.display()))?;
        Ok(DagReader::new(store, Blake3Factory::OBJECT, self.config.clone())?)
    }

    fn json(&self) -> bool {
        self.format == OutputFormat::Json
    }
}

fn parse_digest(s: &str) -> anyhow::Result<Digest> {
    s.parse().with_context(|| format!("invalid digest {s:?}"))
}

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let ctx = Context::from_cli(&cli)?;
    match cli.command {
        Command::Add(args) => cmd_add(&ctx, &args.path),
        Command::Cat(args) => cmd_cat(&ctx, &args.digest),
        Command::Get(args) => cmd_get(&ctx, &args.digest, &args.out),
        Command::Ls(args) => cmd_ls(&ctx, &args.digest),
        Command::Verify(args) => cmd_verify(&ctx, &args.digest),
        Command::Config => cmd_config(&ctx),
    }
}

fn add(ctx: &Context, path: &Path) -> anyhow::Result<Link> {
    let node = FsNode::open(path).with_context(|| format!("reading {}", path.display()))?;
    let link = ctx.builder()?.build(&node)?;
    info!(path = %path.display(), root = %link.digest.short_hex(), "added");
    Ok(link)
}

fn cmd_add(ctx: &Context, path: &Path) -> anyhow::Result<()> {
    let link = add(ctx, path)?;
    if ctx.json() {
        println!("{}", serde_json::to_string_pretty(&link)?);
    } else {
        println!(
            "{} added {} ({}, {} bytes)",
            "✓".green().bold(),
            path.display().to_string().bold(),
            link.kind.to_string().cyan(),
            link.size
        );
        println!("  {}", link.digest.to_string().yellow());
    }
    Ok(())
}

fn cmd_cat(ctx: &Context, digest: &str) -> anyhow::Result<()> {
    let digest = parse_digest(digest)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    ctx.reader()?.write_file(&digest, &mut out)?;
    out.flush()?;
    Ok(())
}

fn cmd_get(ctx: &Context, digest: &str, out: &Path) -> anyhow::Result<()> {
    let digest = parse_digest(digest)?;
    let content = ctx.reader()?.reconstruct(&digest)?;
    materialize(&content, out).with_context(|| format!("writing {}", out.display()))?;
    if ctx.json() {
        let summary = serde_json::json!({
            "root": digest,
            "path": out.display().to_string(),
            "size": content.size(),
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "{} restored {} to {} ({} bytes)",
            "✓".green().bold(),
            digest.short_hex().yellow(),
            out.display().to_string().bold(),
            content.size()
        );
    }
    Ok(())
}

fn cmd_ls(ctx: &Context, digest: &str) -> anyhow::Result<()> {
    let digest = parse_digest(digest)?;
    let links = ctx.reader()?.list(&digest)?;
    if ctx.json() {
        println!("{}", serde_json::to_string_pretty(&links)?);
        return Ok(());
    }
    for link in &links {
        let name = link.name.as_deref().unwrap_or("");
        let name = if link.kind == LinkKind::Tree {
            format!("{name}/").blue().bold()
        } else {
            name.normal()
        };
        println!(
            "{} {:>5} {:>12}  {}",
            link.digest.short_hex().dimmed(),
            link.kind.to_string(),
            link.size,
            name
        );
    }
    Ok(())
}

fn cmd_verify(ctx: &Context, digest: &str) -> anyhow::Result<()> {
    let digest = parse_digest(digest)?;
    let report: VerifyReport = ctx.reader()?.verify(&digest)?;
    if ctx.json() {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    println!("{} DAG integrity verified", "✓".green().bold());
    println!("  Root: {}", report.root.to_string().yellow());
    println!(
        "  Objects: {} ({} blobs, {} lists, {} trees)",
        report.objects.to_string().bold(),
        report.blobs,
        report.lists,
        report.trees
    );
    println!("  Bytes: {}", report.total_bytes);
    println!("  Largest leaf: {} bytes", report.max_payload);
    println!("  Widest node: {} links", report.max_links);
    Ok(())
}

fn cmd_config(ctx: &Context) -> anyhow::Result<()> {
    if ctx.json() {
        println!("{}", serde_json::to_string_pretty(&ctx.config)?);
    } else {
        print!("{}", ctx.config.to_toml_string()?);
    }
    Ok(())
}
