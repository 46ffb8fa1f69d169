//! tankobon - read comic and manga archives page by page

mod cli;

use crate::cli::{Cli, Command};
use clap::Parser;
use derive_more::{Display, Error};
use exn::ResultExt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};
use tankobon_archive::{PageSource, open};
use tankobon_config::Config;
use tankobon_library::{Context, ReaderSession, scan_folder, thumbnail};
use tracing_subscriber::EnvFilter;

type Result<T> = std::result::Result<T, exn::Exn<ErrorKind>>;

#[derive(Debug, Display, Error)]
enum ErrorKind {
    #[display("failed to load configuration")]
    Config,
    #[display("cannot read {}", _0.display())]
    Book(#[error(not(source))] PathBuf),
    #[display("cannot write {}", _0.display())]
    Output(#[error(not(source))] PathBuf),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:?}");
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load_from(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    let ctx = Context::new(&config).or_raise(|| ErrorKind::Config)?;
    match cli.command {
        Command::Info { path } => info(&path, &ctx),
        Command::Page { path, index, output } => page(&path, index, output.as_deref(), &ctx),
        Command::Thumbnail { path, output } => cover(&path, &output, &ctx),
        Command::Scan { root } => scan(&root),
        Command::Read { path, start, pages, delay } => {
            read(&path, start, pages, Duration::from_millis(delay), &ctx).await
        },
    }
}

fn info(path: &Path, ctx: &Context) -> Result<()> {
    let source = open(path, &ctx.extract).or_raise(|| ErrorKind::Book(path.to_path_buf()))?;
    let title = path.file_stem().unwrap_or(path.as_os_str()).to_string_lossy();
    println!("Title: {title}");
    println!("Type:  {}", source.kind());
    println!("Pages: {}", source.page_count());
    for (index, entry) in source.entries().iter().enumerate() {
        println!("{index:>5}  {}", entry.name);
    }
    source.close();
    Ok(())
}

fn page(path: &Path, index: usize, output: Option<&Path>, ctx: &Context) -> Result<()> {
    let source = open(path, &ctx.extract).or_raise(|| ErrorKind::Book(path.to_path_buf()))?;
    let fetched = source.fetch_page(index);
    source.close();
    let bytes = fetched.or_raise(|| ErrorKind::Book(path.to_path_buf()))?;
    match output {
        Some(output) => std::fs::write(output, &bytes).or_raise(|| ErrorKind::Output(output.to_path_buf())),
        None => std::io::stdout().lock().write_all(&bytes).or_raise(|| ErrorKind::Output(PathBuf::from("-"))),
    }
}

fn cover(path: &Path, output: &Path, ctx: &Context) -> Result<()> {
    let source = open(path, &ctx.extract).or_raise(|| ErrorKind::Book(path.to_path_buf()))?;
    let rendered = thumbnail(source.as_ref(), &ctx.thumbnail);
    source.close();
    let bytes = rendered.or_raise(|| ErrorKind::Book(path.to_path_buf()))?;
    std::fs::write(output, &bytes).or_raise(|| ErrorKind::Output(output.to_path_buf()))?;
    tracing::info!(path = %output.display(), bytes = bytes.len(), "Wrote thumbnail");
    Ok(())
}

fn scan(root: &Path) -> Result<()> {
    let books = scan_folder(root).or_raise(|| ErrorKind::Book(root.to_path_buf()))?;
    for book in &books {
        println!("{:<6}  {}", book.book_type, book.path.display());
    }
    tracing::info!(count = books.len(), "Scan complete");
    Ok(())
}

async fn read(path: &Path, start: usize, pages: usize, delay: Duration, ctx: &Context) -> Result<()> {
    let mut session = ReaderSession::open(path, ctx, start).or_raise(|| ErrorKind::Book(path.to_path_buf()))?;
    println!("{} ({}, {} pages)", session.title(), session.book_type(), session.page_count());
    for _ in 0..pages {
        let current = session.current_page();
        let cached = session.cache().contains(current);
        let started = Instant::now();
        match session.current_image().await {
            Ok(image) => {
                let source = if cached { "cache" } else { "disk" };
                println!(
                    "page {current:>5}  {:>5}x{:<5}  {source:<5}  {:?}",
                    image.width(),
                    image.height(),
                    started.elapsed()
                );
            },
            Err(err) => println!("page {current:>5}  {}", *err),
        }
        if !session.next(1) {
            break;
        }
        tokio::time::sleep(delay).await;
    }
    println!("{} pages cached, {} bytes", session.cache().len(), session.cache().total_cost());
    session.close().await;
    Ok(())
}
