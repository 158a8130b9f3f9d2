//! Run-list entries (`recipe[nginx]`, `role[base]`).

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RunListItem {
    Recipe(String),
    Role(String),
}

impl RunListItem {
    /// Parses an entry. A bare name is a recipe; any other `kind[...]` is rejected.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let Some(open) = trimmed.find('[') else {
            return Some(Self::Recipe(trimmed.to_string()));
        };
        let inner = trimmed[open + 1..].strip_suffix(']')?;
        if inner.is_empty() || inner.contains(['[', ']']) {
            return None;
        }
        match &trimmed[..open] {
            "recipe" => Some(Self::Recipe(inner.to_string())),
            "role" => Some(Self::Role(inner.to_string())),
            _ => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Recipe(name) | Self::Role(name) => name.as_str(),
        }
    }
}

impl fmt::Display for RunListItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recipe(name) => write!(f, "recipe[{name}]"),
            Self::Role(name) => write!(f, "role[{name}]"),
        }
    }
}
