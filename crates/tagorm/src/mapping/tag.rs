//! Field tag parsing.
//!
//! Column tags look like `"name,key,auto"`: the column name first, then
//! comma-separated options. Nested tags look like `"prefix,rel=name"`.

/// Parsed column tag.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnTag {
    pub column: String,
    pub is_key: bool,
    pub is_auto: bool,
    pub is_oplock: bool,
}

/// Parsed nested-record tag.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NestedTag {
    pub prefix: String,
    pub relation: Option<String>,
}

/// Parse a column tag.
pub fn parse_column_tag(tag: &str) -> Result<ColumnTag, String> {
    let mut parts = tag.split(',').map(str::trim);
    let column = parts.next().unwrap_or_default();
    if column.is_empty() {
        return Err(format!("empty column name in tag \"{tag}\""));
    }

    let mut parsed = ColumnTag {
        column: column.to_string(),
        ..ColumnTag::default()
    };
    for option in parts {
        match option {
            "key" => parsed.is_key = true,
            "auto" => parsed.is_auto = true,
            "oplock" => parsed.is_oplock = true,
            "" => {}
            other => return Err(format!("unknown tag option \"{other}\"")),
        }
    }
    Ok(parsed)
}

/// Parse a nested-record tag. The prefix may be empty.
pub fn parse_nested_tag(tag: &str) -> Result<NestedTag, String> {
    let mut parts = tag.split(',').map(str::trim);
    let mut parsed = NestedTag {
        prefix: parts.next().unwrap_or_default().to_string(),
        relation: None,
    };
    for option in parts {
        match option.split_once('=') {
            Some(("rel", name)) if !name.trim().is_empty() => {
                parsed.relation = Some(name.trim().to_string());
            }
            Some(("rel", _)) => return Err(format!("empty relation name in tag \"{tag}\"")),
            _ if option.is_empty() => {}
            _ => return Err(format!("unknown nested tag option \"{option}\"")),
        }
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_tag_with_flags() {
        let tag = parse_column_tag("id, key, auto").expect("tag");
        assert_eq!(tag.column, "id");
        assert!(tag.is_key && tag.is_auto && !tag.is_oplock);
    }

    #[test]
    fn empty_column_name_is_rejected() {
        assert!(parse_column_tag("").is_err());
        assert!(parse_column_tag(",key").is_err());
    }

    #[test]
    fn unknown_option_is_rejected() {
        assert!(parse_column_tag("id,primary").is_err());
    }

    #[test]
    fn nested_tag_with_relation() {
        let tag = parse_nested_tag("author_,rel=a").expect("tag");
        assert_eq!(tag.prefix, "author_");
        assert_eq!(tag.relation.as_deref(), Some("a"));

        let bare = parse_nested_tag("").expect("tag");
        assert_eq!(bare, NestedTag::default());
        assert!(parse_nested_tag("x,rel=").is_err());
    }
}
