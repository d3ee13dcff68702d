use crate::cli::PageviewsArgs;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use zimdb_config::Config;
use zimdb_pageviews::{ImportOptions, Source, import};
use zimdb_store::{Database, Schema};

pub async fn run(args: PageviewsArgs, mut config: Config) -> Result<()> {
    if let Some(min_views) = args.min_views {
        config.pageviews.min_monthly_views = min_views;
    }
    if !args.domains.is_empty() {
        config.pageviews.domains = args.domains;
    }
    let source = Source::from_arg(args.input);
    if let Source::File(path) = &source
        && !path.is_file()
    {
        exn::bail!(ErrorKind::InputMissing(path.clone()));
    }
    let options = options(&config);

    let db = Database::connect(&args.database, Schema::Pageviews).await.or_raise(|| ErrorKind::Store)?;
    let summary = import(source, &db, &options).await.or_raise(|| ErrorKind::Pageviews)?;
    db.close().await;
    println!("{summary}");
    Ok(())
}

fn options(config: &Config) -> ImportOptions {
    let pageviews = &config.pageviews;
    ImportOptions {
        min_monthly_views: i64::try_from(pageviews.min_monthly_views).unwrap_or(i64::MAX),
        domains: pageviews.domains.iter().cloned().collect(),
        commit_interval: pageviews.commit_interval,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_follow_the_config() {
        let mut config = Config::default();
        config.pageviews.min_monthly_views = u64::MAX;
        config.pageviews.domains.push("de.wikipedia".to_string());
        let options = options(&config);
        assert_eq!(options.min_monthly_views, i64::MAX);
        assert!(options.domains.contains("de.wikipedia"));
        assert!(options.domains.contains("en.wikipedia"));
    }
}
