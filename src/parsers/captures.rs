//! Named capture groups as an ordered list of (name, value) pairs

use regex::{Captures, Regex};

use super::ParseError;

/// Named groups of a single regex match, in pattern order
#[derive(Debug, Clone)]
pub struct NamedCaptures<'r, 't> {
    matched: &'t str,
    groups: Vec<(&'r str, Option<&'t str>)>,
}

impl<'r, 't> NamedCaptures<'r, 't> {
    /// Build the capture list for `captures`, which must come from `re`.
    ///
    /// Returns [`ParseError::NoMatch`] when there is no match.
    pub fn from_match(re: &'r Regex, captures: Option<Captures<'t>>) -> Result<Self, ParseError> {
        let captures = captures.ok_or(ParseError::NoMatch)?;
        let matched = captures.get(0).ok_or(ParseError::NoMatch)?.as_str();

        let groups = re
            .capture_names()
            .enumerate()
            .filter_map(|(idx, name)| {
                name.map(|name| (name, captures.get(idx).map(|m| m.as_str())))
            })
            .collect();

        Ok(Self { matched, groups })
    }

    /// Full text of the match
    pub fn matched(&self) -> &'t str {
        self.matched
    }

    /// Value of a named group, `None` if the group did not participate
    pub fn get(&self, name: &str) -> Option<&'t str> {
        self.groups
            .iter()
            .find(|(group, _)| *group == name)
            .and_then(|(_, value)| *value)
    }

    /// Value of a named group, `None` if it is absent or empty
    pub fn non_empty(&self, name: &str) -> Option<&'t str> {
        self.get(name).filter(|value| !value.is_empty())
    }

    /// All named groups with their values, in pattern order
    pub fn iter(&self) -> impl Iterator<Item = (&'r str, Option<&'t str>)> + '_ {
        self.groups.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groups_in_pattern_order() {
        let re = Regex::new(r"(?P<key>\w+)(?:=(?P<value>\w+))?;").unwrap();
        let caps = NamedCaptures::from_match(&re, re.captures("x a=1; y")).unwrap();

        assert_eq!(caps.matched(), "a=1;");
        let groups: Vec<_> = caps.iter().collect();
        assert_eq!(groups, vec![("key", Some("a")), ("value", Some("1"))]);
    }

    #[test]
    fn test_absent_group() {
        let re = Regex::new(r"(?P<key>\w+)(?:=(?P<value>\w+))?;").unwrap();
        let caps = NamedCaptures::from_match(&re, re.captures("flag;")).unwrap();

        assert_eq!(caps.get("key"), Some("flag"));
        assert_eq!(caps.get("value"), None);
        assert_eq!(caps.get("unknown"), None);
    }

    #[test]
    fn test_empty_group_is_not_non_empty() {
        let re = Regex::new(r#""(?P<inner>[^"]*)""#).unwrap();
        let caps = NamedCaptures::from_match(&re, re.captures(r#"x = """#)).unwrap();

        assert_eq!(caps.get("inner"), Some(""));
        assert_eq!(caps.non_empty("inner"), None);
    }

    #[test]
    fn test_no_match_is_an_error() {
        let re = Regex::new(r"import").unwrap();
        let result = NamedCaptures::from_match(&re, re.captures("package main"));
        assert_eq!(result.unwrap_err(), ParseError::NoMatch);
    }
}
