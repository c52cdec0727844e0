// BookBinder - Chaptered audiobook assembly
// Copyright (C) 2025 Henning Berge
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


use anyhow::{bail, Context};
use bookbinder::audio::AdtsParser;
use bookbinder::binder::{bind_book, validate_chapters, BookBinder};
use bookbinder::config::Settings;
use bookbinder::jobs::{binder_from_reports, JobList, JobReport, JobRunner};
use bookbinder::mp4::{read_artwork, BookTags};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "bookbinder-cli")]
#[command(about = "BookBinder CLI - Encode chapters and bind them into an M4B audiobook", long_about = None)]
struct Cli {
    /// Settings file (defaults apply when missing)
    #[arg(short, long, global = true, default_value = "bookbinder.json")]
    settings: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Dump the frames of an ADTS file
    Inspect {
        file: PathBuf,
        /// Stop after this many frames
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Validate the chapters of a binder file without writing anything
    Scan {
        binder: PathBuf,
    },
    /// Assemble a binder file into an M4B
    Bind {
        binder: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// ISO 639-2/T code of the chapter track (overrides settings)
        #[arg(short, long)]
        language: Option<String>,
        /// Tag file (title, author, cover image, ...)
        #[arg(short, long)]
        tags: Option<PathBuf>,
    },
    /// Run the encode jobs of a job list and write a binder file
    Encode {
        jobs: PathBuf,
        /// Binder file to write for the encoded chapters
        #[arg(short, long, default_value = "binder.json")]
        binder: PathBuf,
        /// Override the number of concurrent jobs
        #[arg(short = 'j', long)]
        threads: Option<usize>,
    },
    /// Print the tags of an M4B file as JSON, optionally updating them first
    Tag {
        file: PathBuf,
        /// Tag file whose non-empty fields are written into the M4B
        #[arg(short, long)]
        set: Option<PathBuf>,
        /// Save the cover image here (the extension follows the image type)
        #[arg(long)]
        export_cover: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .try_init();

    let cli = Cli::parse();
    let mut settings = Settings::load(&cli.settings)
        .with_context(|| format!("Failed to load settings from {}", cli.settings.display()))?;

    let worked_on = run(cli.command, &settings).await?;
    if settings.remember_directory(&worked_on) {
        if let Err(e) = settings.save(&cli.settings) {
            tracing::warn!("Failed to save settings: {}", e);
        }
    }
    Ok(())
}

/// Run one command, returning the file it worked on
async fn run(command: Commands, settings: &Settings) -> anyhow::Result<PathBuf> {
    match command {
        Commands::Inspect { file, limit } => {
            let file = settings.resolve_input(&file);
            inspect(&file, limit)?;
            Ok(file)
        }
        Commands::Scan { binder } => {
            let path = settings.resolve_input(&binder);
            let binder = BookBinder::load(&path)?;
            let book = validate_chapters(&binder.chapters, settings.padding_tolerance)
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;
            println!(
                "{} chapters, {} samples at {} Hz",
                book.chapters.len(),
                book.total_duration(),
                book.time_scale
            );
            Ok(path)
        }
        Commands::Bind {
            binder,
            output,
            language,
            tags,
        } => {
            let binder = BookBinder::load(&settings.resolve_input(&binder))?;
            let mut options = settings.assemble_options();
            if language.is_some() {
                options.language = language;
            }
            if let Some(tags) = tags {
                options.tags = Some(
                    BookTags::load(&tags).with_context(|| format!("Failed to load tags from {}", tags.display()))?,
                );
            }
            bind_book(&output, &binder.chapters, &options).map_err(|e| anyhow::anyhow!(e.user_message()))?;
            Ok(output)
        }
        Commands::Encode { jobs, binder, threads } => {
            let jobs = settings.resolve_input(&jobs);
            let list = JobList::load(&jobs)?;
            let mut pool_settings = settings.clone();
            if let Some(threads) = threads {
                pool_settings.num_threads = threads;
            }

            let runner = JobRunner::new(&pool_settings, list.encoder).with_callback(Arc::new(|report: &JobReport| {
                if let Some(error) = &report.error {
                    eprintln!("#{:03} {}: {}", report.position, report.title, error);
                }
            }));
            let cancel = runner.cancel_handle();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Cancelling jobs that have not started");
                    cancel.cancel();
                }
            });

            let reports = runner.run(list.jobs(pool_settings.rename_input)).await;
            let chapters = binder_from_reports(&reports).map_err(|e| anyhow::anyhow!(e.user_message()))?;
            chapters.save(&binder)?;
            println!("Wrote {} chapters to {}", chapters.len(), binder.display());
            Ok(binder)
        }
        Commands::Tag {
            file,
            set,
            export_cover,
        } => {
            let file = settings.resolve_input(&file);
            tag(&file, set, export_cover)?;
            Ok(file)
        }
    }
}

fn tag(file: &Path, set: Option<PathBuf>, export_cover: Option<PathBuf>) -> anyhow::Result<()> {
    if let Some(set) = set {
        let tags = BookTags::load(&set).with_context(|| format!("Failed to load tags from {}", set.display()))?;
        tags.write_to(file)?;
    }

    let tags = BookTags::read_from(file)?;
    println!("{}", serde_json::to_string_pretty(&tags)?);

    if let Some(target) = export_cover {
        match read_artwork(file)? {
            Some((kind, data)) => {
                let path = target.with_extension(kind.extension());
                std::fs::write(&path, data).with_context(|| format!("Failed to write {}", path.display()))?;
                println!("Cover written to {}", path.display());
            }
            None => println!("No cover image in {}", file.display()),
        }
    }
    Ok(())
}

fn inspect(file: &Path, limit: Option<usize>) -> anyhow::Result<()> {
    let mut parser = AdtsParser::from_file(file)?;
    if !parser.has_frame() {
        bail!("No ADTS frames in {}", file.display());
    }

    let mut index = 0usize;
    while let Some(frame) = parser.frame() {
        if limit.is_some_and(|limit| index >= limit) {
            break;
        }
        let head: Vec<String> = frame.data.iter().take(8).map(|b| format!("{:02x}", b)).collect();
        let config = frame
            .config
            .map_or_else(|| "invalid config".to_string(), |c| c.to_string());
        println!(
            "#{:<6} @{:<10} blocks={} size={:<5} {:?} {} [{}]",
            index,
            frame.offset,
            frame.aac_frame_count,
            frame.data.len(),
            frame.version,
            config,
            head.join(" ")
        );
        index += 1;
        if !parser.next_frame() {
            break;
        }
    }
    println!("{} frames", parser.count_frames());
    Ok(())
}
