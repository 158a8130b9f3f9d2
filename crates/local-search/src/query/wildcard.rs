//! Glob patterns over whole field values (`web*`, `db-0?`).

/// One element of a compiled glob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobToken {
    Literal(char),
    /// `?`: exactly one character.
    AnyChar,
    /// `*`: any run of characters, including none.
    AnyRun,
}

/// A glob compiled from an unquoted query value.
///
/// Escaped `\*` and `\?` arrive here as literals, so the pattern never has to
/// re-interpret the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobPattern {
    tokens: Vec<GlobToken>,
}

impl GlobPattern {
    pub fn new(tokens: Vec<GlobToken>) -> Self {
        Self { tokens }
    }

    pub fn tokens(&self) -> &[GlobToken] {
        &self.tokens
    }

    pub fn has_wildcards(&self) -> bool {
        self.tokens
            .iter()
            .any(|token| !matches!(token, GlobToken::Literal(_)))
    }

    /// Returns the literal text when the pattern has no wildcards.
    pub fn as_literal(&self) -> Option<String> {
        self.tokens
            .iter()
            .map(|token| match token {
                GlobToken::Literal(ch) => Some(*ch),
                _ => None,
            })
            .collect()
    }

    /// Matches the whole candidate, with backtracking on the last `*` seen.
    pub fn matches(&self, candidate: &str) -> bool {
        let pattern = self.tokens.as_slice();
        let candidate_chars = candidate.chars().collect::<Vec<_>>();

        let mut pattern_index = 0usize;
        let mut candidate_index = 0usize;
        let mut star_index: Option<usize> = None;
        let mut star_candidate_index = 0usize;

        while candidate_index < candidate_chars.len() {
            let current = pattern.get(pattern_index).copied();
            let single_match = match current {
                Some(GlobToken::AnyChar) => true,
                Some(GlobToken::Literal(ch)) => ch == candidate_chars[candidate_index],
                _ => false,
            };
            if single_match {
                pattern_index += 1;
                candidate_index += 1;
                continue;
            }

            if current == Some(GlobToken::AnyRun) {
                star_index = Some(pattern_index);
                pattern_index += 1;
                star_candidate_index = candidate_index;
                continue;
            }

            if let Some(last_star_index) = star_index {
                pattern_index = last_star_index + 1;
                star_candidate_index += 1;
                candidate_index = star_candidate_index;
                continue;
            }

            return false;
        }

        while pattern.get(pattern_index) == Some(&GlobToken::AnyRun) {
            pattern_index += 1;
        }

        pattern_index == pattern.len()
    }
}

impl std::fmt::Display for GlobPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for token in &self.tokens {
            match token {
                GlobToken::Literal(ch) => {
                    if matches!(ch, '*' | '?' | '\\') {
                        write!(f, "\\")?;
                    }
                    write!(f, "{ch}")?;
                }
                GlobToken::AnyChar => write!(f, "?")?,
                GlobToken::AnyRun => write!(f, "*")?,
            }
        }
        Ok(())
    }
}
