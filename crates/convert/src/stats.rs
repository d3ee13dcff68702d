use std::fmt::{self, Display, Formatter};
use std::ops::AddAssign;
use zimdb_assets::RewriteReport;

/// What happened to one entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Special,
    Redirect,
    Article,
    Binary,
    Other,
    /// An article dropped for a short title or body.
    Filtered,
    /// Unreadable, undecodable, or rejected by the database.
    Failed,
}

/// Run counters.
///
/// Every processed entry lands in exactly one of the outcome counters, so
/// they always add up to [`entries`](Self::entries).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub entries: u64,
    pub special: u64,
    pub redirects: u64,
    pub articles: u64,
    pub binary: u64,
    pub other: u64,
    pub filtered: u64,
    pub errors: u64,
    /// Uncompressed size of stored bodies, after rewriting.
    pub body_bytes: u64,
    pub stored_bytes: u64,
    pub assets: RewriteReport,
}

impl Stats {
    pub fn record(&mut self, outcome: Outcome) {
        self.entries += 1;
        let counter = match outcome {
            Outcome::Special => &mut self.special,
            Outcome::Redirect => &mut self.redirects,
            Outcome::Article => &mut self.articles,
            Outcome::Binary => &mut self.binary,
            Outcome::Other => &mut self.other,
            Outcome::Filtered => &mut self.filtered,
            Outcome::Failed => &mut self.errors,
        };
        *counter += 1;
    }

    pub fn outcomes(&self) -> u64 {
        self.special + self.redirects + self.articles + self.binary + self.other + self.filtered + self.errors
    }
}

impl AddAssign for Stats {
    fn add_assign(&mut self, other: Self) {
        self.entries += other.entries;
        self.special += other.special;
        self.redirects += other.redirects;
        self.articles += other.articles;
        self.binary += other.binary;
        self.other += other.other;
        self.filtered += other.filtered;
        self.errors += other.errors;
        self.body_bytes += other.body_bytes;
        self.stored_bytes += other.stored_bytes;
        self.assets += other.assets;
    }
}

impl Display for Stats {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "entries processed:  {}", self.entries)?;
        writeln!(f, "  articles:         {}", self.articles)?;
        writeln!(f, "  redirects:        {}", self.redirects)?;
        writeln!(f, "  filtered:         {}", self.filtered)?;
        writeln!(f, "  special:          {}", self.special)?;
        writeln!(f, "  binary:           {}", self.binary)?;
        writeln!(f, "  other:            {}", self.other)?;
        writeln!(f, "  errors:           {}", self.errors)?;
        write!(f, "stored:             {} bytes ({} uncompressed)", self.stored_bytes, self.body_bytes)?;
        let assets = &self.assets;
        if assets.inlined + assets.stylesheets + assets.oversize + assets.unresolved > 0 {
            writeln!(f)?;
            write!(
                f,
                "assets:             {} inlined ({} recompressed), {} stylesheets, {} oversize, {} unresolved, {} recompression failures",
                assets.inlined,
                assets.recompressed,
                assets.stylesheets,
                assets.oversize,
                assets.unresolved,
                assets.recompress_failed,
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcomes_add_up() {
        let mut stats = Stats::default();
        for outcome in [Outcome::Article, Outcome::Redirect, Outcome::Failed, Outcome::Filtered, Outcome::Article] {
            stats.record(outcome);
        }
        assert_eq!(stats.entries, 5);
        assert_eq!(stats.articles, 2);
        assert_eq!(stats.outcomes(), stats.entries);
    }

    #[test]
    fn shards_sum() {
        let mut total = Stats::default();
        let mut shard = Stats::default();
        shard.record(Outcome::Binary);
        shard.assets.inlined = 3;
        total += shard;
        total += shard;
        assert_eq!(total.binary, 2);
        assert_eq!(total.assets.inlined, 6);
        assert_eq!(total.outcomes(), total.entries);
    }

    #[test]
    fn display_skips_empty_asset_line() {
        let rendered = Stats::default().to_string();
        assert!(rendered.starts_with("entries processed:  0"));
        assert!(!rendered.contains("assets:"));
    }
}
