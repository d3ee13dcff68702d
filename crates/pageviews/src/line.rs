/// One useful line of a monthly page-view dump.
///
/// Dump lines look like `en.wikipedia Dog 4269 desktop 31337 A1B2`: domain,
/// page title, page id, access method, monthly total, hourly breakdown.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageviewLine<'a> {
    pub domain: &'a str,
    pub title: &'a str,
    pub page_id: i64,
    pub views: i64,
}

impl PageviewLine<'_> {
    /// `{domain}-{page_id}`, the key both tables are indexed by.
    pub fn key(&self) -> String {
        format!("{}-{}", self.domain, self.page_id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Parsed<'a> {
    Line(PageviewLine<'a>),
    /// Pages without an id, such as deleted pages, cannot be keyed.
    NullId,
    Malformed,
}

/// Fields are separated by single spaces; the monthly total is always the
/// second-to-last field, whatever sits between it and the page id.
pub fn parse_line(line: &str) -> Parsed<'_> {
    let parts: Vec<&str> = line.trim_end_matches(['\n', '\r']).split(' ').collect();
    if parts.len() < 4 {
        return Parsed::Malformed;
    }
    let Ok(views) = parts[parts.len() - 2].parse::<i64>() else {
        return Parsed::Malformed;
    };
    if parts[2] == "null" {
        return Parsed::NullId;
    }
    match parts[2].parse::<i64>() {
        Ok(page_id) => Parsed::Line(PageviewLine { domain: parts[0], title: parts[1], page_id, views }),
        Err(_) => Parsed::Malformed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn parses_dump_lines() {
        let Parsed::Line(line) = parse_line("en.wikipedia Dog 4269 desktop 31337 A1B2\n") else {
            panic!("line should parse");
        };
        assert_eq!(line, PageviewLine { domain: "en.wikipedia", title: "Dog", page_id: 4269, views: 31337 });
        assert_eq!(line.key(), "en.wikipedia-4269");
    }

    #[test]
    fn total_is_second_to_last() {
        let Parsed::Line(line) = parse_line("de.wikipedia Hund 7 mobile-web extra 900 Z1") else {
            panic!("line should parse");
        };
        assert_eq!(line.views, 900);
    }

    #[rstest]
    #[case("en.wikipedia Dog 4269 desktop 501 A1", Parsed::Line(PageviewLine { domain: "en.wikipedia", title: "Dog", page_id: 4269, views: 501 }))]
    #[case("en.wikipedia Dog null desktop 501 A1", Parsed::NullId)]
    #[case("en.wikipedia Dog 4269", Parsed::Malformed)]
    #[case("", Parsed::Malformed)]
    #[case("en.wikipedia Dog 4269 desktop many A1", Parsed::Malformed)]
    #[case("en.wikipedia Dog abc desktop 501 A1", Parsed::Malformed)]
    fn classifies_lines(#[case] input: &str, #[case] expected: Parsed<'static>) {
        assert_eq!(parse_line(input), expected);
    }
}
