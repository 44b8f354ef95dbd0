//! Attaching comment lines to the fields they describe.

use indexmap::IndexMap;

use crate::classify::LineKind;

/// Comment and blank lines attached to each field of a record, keyed by field name.
///
/// Each entry holds the lines immediately preceding the field, followed by
/// any comment lines embedded inside the field's value (e.g. between list
/// items).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CommentMap(IndexMap<String, Vec<String>>);

impl CommentMap {
    /// Returns the comment lines attached to `field`, if any.
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Iterate over `(field, lines)` pairs in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Walk a record's classified lines and attach comments to fields.
///
/// Consecutive blank and comment lines are buffered. A field line takes the
/// whole buffer as its comments, replacing anything recorded for a repeated
/// key. Nested content appends only the buffered *comment* lines to the
/// field currently open; with no open field they are dropped, since there is
/// nothing to attach them to. Lines left in the buffer at the end of the
/// record are trailing lines and aren't attached to anything.
pub fn associate_comments(lines: &[&str], kinds: &[LineKind<'_>]) -> CommentMap {
    let mut map: IndexMap<String, Vec<String>> = IndexMap::new();
    let mut buffer: Vec<(&str, LineKind<'_>)> = vec![];
    let mut current: Option<&str> = None;

    for (line, kind) in lines.iter().zip(kinds) {
        match kind {
            LineKind::Blank | LineKind::Comment => buffer.push((*line, *kind)),
            LineKind::Field(name) => {
                let comments = buffer.drain(..).map(|(line, _)| line.to_string()).collect();
                map.insert(name.to_string(), comments);
                current = Some(*name);
            }
            LineKind::ListItem | LineKind::Content => {
                match current.and_then(|name| map.get_mut(name)) {
                    Some(comments) => comments.extend(
                        buffer
                            .iter()
                            .filter(|(_, kind)| *kind == LineKind::Comment)
                            .map(|(line, _)| line.to_string()),
                    ),
                    None => {
                        if buffer.iter().any(|(_, kind)| *kind == LineKind::Comment) {
                            tracing::debug!("dropping comments with no field to attach to");
                        }
                    }
                }
                buffer.clear();
            }
        }
    }

    CommentMap(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify_record;

    fn associate(text: &str) -> CommentMap {
        let lines = text.lines().collect::<Vec<_>>();
        let (kinds, _) = classify_record(&lines);
        associate_comments(&lines, &kinds)
    }

    #[test]
    fn leading_comments_attach_to_next_field() {
        let map = associate("id: 1\n# important\n\nname: Foo\nplatform: Web\n");

        assert_eq!(map.get("id"), Some(&[][..]));
        assert_eq!(
            map.get("name"),
            Some(&["# important".to_string(), String::new()][..])
        );
        assert_eq!(map.get("platform"), Some(&[][..]));
    }

    #[test]
    fn embedded_comments_append_to_open_field() {
        let map = associate("id: 1\n# tags\ntags:\n  - a\n  # b is new\n\n  - b\n");

        assert_eq!(
            map.get("tags"),
            Some(&["# tags".to_string(), "  # b is new".to_string()][..])
        );
    }

    #[test]
    fn unattributable_comments_are_dropped() {
        let map = associate("---\n# orphan\nstray content\nid: 1\n");

        assert_eq!(map.len(), 1);
        assert_eq!(map.get("id"), Some(&[][..]));
        assert!(map.iter().all(|(_, lines)| !lines.iter().any(|l| l == "# orphan")));
    }

    #[test]
    fn repeated_field_overwrites() {
        let map = associate("id: 1\n# first\nname: a\n# second\nname: b\n");

        assert_eq!(map.get("name"), Some(&["# second".to_string()][..]));
    }
}
