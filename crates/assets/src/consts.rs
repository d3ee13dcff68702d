use regex::Regex;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

// `<img ... src="...">`, but not `data-src`; group 1 is everything up to the value, 2/3 the double/single quoted value.
regex!(IMG_SRC_REGEX, r#"(?i)(<img\b[^>]*?\ssrc\s*=\s*)(?:"([^"]*)"|'([^']*)')"#);
regex!(LINK_TAG_REGEX, r"(?i)<link\b[^>]*>");
regex!(STYLESHEET_REL_REGEX, r#"(?i)\srel\s*=\s*["']?stylesheet\b"#);
regex!(HREF_REGEX, r#"(?i)\shref\s*=\s*(?:"([^"]*)"|'([^']*)')"#);
regex!(EXTERNAL_REGEX, r"(?i)^(?:[a-z][a-z0-9+.-]*:|//)");
