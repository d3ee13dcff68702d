use crate::cli::ConvertArgs;
use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use futures::StreamExt;
use std::path::Path;
use std::sync::Arc;
use zimdb_archive::{ArchiveHandle, ArchiveOpener, ZimOpener};
use zimdb_assets::{AssetPolicy, ImageMagick, Rewriter};
use zimdb_config::Config;
use zimdb_convert::{ConvertEvent, Converter, Options, Stats, convert_sharded, read_titles};
use zimdb_store::{Database, Schema, Writer};

pub async fn run(args: ConvertArgs, mut config: Config) -> Result<()> {
    if let Some(workers) = args.workers {
        config.convert.workers = usize::from(workers);
    }
    config.assets.inline_images |= args.inline_images;
    config.assets.inline_stylesheets |= args.inline_stylesheets;
    if args.recompress.is_some() {
        config.assets.recompress = args.recompress;
    }
    let options = options(&config);

    // Everything that can fail up front does so before the output exists.
    if !args.archive.is_file() {
        exn::bail!(ErrorKind::ArchiveMissing(args.archive));
    }
    let rewriter = Arc::new(rewriter(&config)?);
    let titles = match &args.titles {
        Some(path) => Some(read_titles(path).await.or_raise(|| ErrorKind::Convert)?),
        None => None,
    };
    let opener = Arc::new(ZimOpener::new(&args.archive));
    let archive = open(Arc::clone(&opener)).await?;
    tracing::info!(archive = %args.archive.display(), entries = archive.entry_count(), "Opened archive");
    prepare_output(&args.output, args.overwrite).await?;

    let db = Database::connect(&args.output, Schema::Articles).await.or_raise(|| ErrorKind::Store)?;
    let stats = match titles {
        Some(titles) => {
            let mut writer = Writer::new(&db, options.commit_interval);
            let converter = Converter::new(archive, &options, rewriter);
            let stats = converter.convert_titles(&mut writer, &titles).await.or_raise(|| ErrorKind::Convert)?;
            writer.finish().await.or_raise(|| ErrorKind::Store)?;
            stats
        },
        None if options.workers == 1 => {
            let mut writer = Writer::new(&db, options.commit_interval);
            let converter = Converter::new(archive, &options, rewriter);
            let stats = converter.convert_range(&mut writer, 0..u32::MAX).await.or_raise(|| ErrorKind::Convert)?;
            writer.finish().await.or_raise(|| ErrorKind::Store)?;
            stats
        },
        None => {
            drop(archive);
            sharded(opener, &db, &args.output, &options, rewriter).await?
        },
    };
    db.close().await;
    tracing::info!(articles = stats.articles, redirects = stats.redirects, errors = stats.errors, "Conversion finished");
    println!("{stats}");
    Ok(())
}

fn options(config: &Config) -> Options {
    let convert = &config.convert;
    Options {
        article_prefix: convert.article_prefix.clone(),
        internal_prefixes: convert.internal_prefixes.clone(),
        min_title_length: convert.min_title_length,
        min_content_length: convert.min_content_length,
        batch_size: convert.batch_size,
        commit_interval: convert.commit_interval,
        workers: convert.workers,
    }
}

fn rewriter(config: &Config) -> Result<Rewriter> {
    let assets = &config.assets;
    let policy = assets.policy();
    let mut rewriter = Rewriter::new(policy)
        .with_max_inline_bytes(assets.max_inline_bytes)
        .with_timeout(assets.recompress_timeout())
        .with_stylesheets(assets.inline_stylesheets);
    if let AssetPolicy::Recompress(profile) = policy {
        let magick = ImageMagick::discover(assets.tool.as_deref()).or_raise(|| ErrorKind::Tool)?;
        tracing::info!(tool = %magick.path().display(), %profile, "Recompressing large images");
        rewriter = rewriter.with_recompressor(Arc::new(magick));
    }
    Ok(rewriter)
}

async fn open(opener: Arc<ZimOpener>) -> Result<ArchiveHandle> {
    tokio::task::spawn_blocking(move || opener.open())
        .await
        .or_raise(|| ErrorKind::Archive)?
        .or_raise(|| ErrorKind::Archive)
}

/// Refuse to touch an existing output unless asked to, then clear it.
async fn prepare_output(output: &Path, overwrite: bool) -> Result<()> {
    if !output.exists() {
        return Ok(());
    }
    if !overwrite {
        exn::bail!(ErrorKind::OutputExists(output.to_path_buf()));
    }
    tracing::info!(output = %output.display(), "Replacing existing database");
    tokio::fs::remove_file(output).await.or_raise(|| ErrorKind::Store)?;
    let mut journal = output.as_os_str().to_owned();
    journal.push("-journal");
    match tokio::fs::remove_file(&journal).await {
        Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err).or_raise(|| ErrorKind::Store),
        _ => Ok(()),
    }
}

async fn sharded(
    opener: Arc<ZimOpener>,
    db: &Database,
    output: &Path,
    options: &Options,
    rewriter: Arc<Rewriter>,
) -> Result<Stats> {
    let opener: Arc<dyn ArchiveOpener> = opener;
    let mut events = std::pin::pin!(convert_sharded(opener, db, output, options, rewriter));
    let mut shards = 0;
    let mut merged = 0;
    let mut total = None;
    while let Some(event) = events.next().await {
        match event.or_raise(|| ErrorKind::Convert)? {
            ConvertEvent::Planned { entries, shards: planned } => {
                shards = planned;
                tracing::info!(entries, shards, workers = options.workers, "Planned shards");
            },
            ConvertEvent::ShardMerged { range, stats, merged: rows } => {
                merged += 1;
                tracing::info!(
                    start = range.start,
                    end = range.end,
                    articles = stats.articles,
                    merged_articles = rows.articles,
                    merged_titles = rows.titles,
                    "Shard {merged}/{shards} merged",
                );
            },
            ConvertEvent::Complete(stats) => total = Some(stats),
        }
    }
    total.ok_or_raise(|| ErrorKind::Convert)
}

#[cfg(test)]
mod tests {
    use super::*;
    use zimdb_assets::Profile;

    #[tokio::test]
    async fn existing_outputs_need_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.db");
        std::fs::write(&output, b"old").unwrap();

        let err = prepare_output(&output, false).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::OutputExists(_)));
        assert!(output.exists());

        prepare_output(&output, true).await.unwrap();
        assert!(!output.exists());
    }

    #[test]
    fn missing_tools_fail_before_any_work() {
        let mut config = Config::default();
        config.assets.recompress = Some(Profile::Moderate);
        config.assets.tool = Some("/nonexistent/magick".into());
        let Err(err) = rewriter(&config) else { panic!("recompression without a tool was accepted") };
        assert!(matches!(&*err, ErrorKind::Tool));

        config.assets.recompress = None;
        config.assets.inline_images = true;
        assert_eq!(rewriter(&config).unwrap().policy(), AssetPolicy::Inline);
    }

    #[test]
    fn options_follow_the_config() {
        let mut config = Config::default();
        config.convert.workers = 6;
        config.convert.article_prefix = "C/".to_string();
        let options = options(&config);
        assert_eq!(options.workers, 6);
        assert_eq!(options.article_prefix, "C/");
        assert_eq!(options.batch_size, 5000);
    }
}
