//! SMILES tokens, the REINVENT prior allow-list and string-level normalisation.

use fancy_regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;

/// Atom-level tokenization pattern: bracket atoms, `Br`/`Cl`, two-digit ring
/// closures and the single-character SMILES symbols.
pub const SMILES_ATOM_PATTERN: &str = r"(\[[^\]]+]|Br?|Cl?|N|O|S|P|F|I|b|c|n|o|s|p|\(|\)|\.|=|#|-|\+|\\|\/|:|~|@|\?|>|\*|\$|\%[0-9]{2}|[0-9])";

/// Vocabulary of the stock REINVENT prior. Molecules with any other token
/// cannot be encoded by the model and are filtered out before training.
pub const REINVENT_PRIOR_TOKENS: &[&str] = &[
    "[S+]", "[N+]", "[N-]", "[O-]", "[n+]", "[nH]", "%10", "Cl", ")", "S", "^", "2", "O", "4",
    "=", "C", "1", "9", "6", "s", "5", "Br", "o", "7", "(", "n", "-", "8", "N", "F", "3", "c",
    "#", "$",
];

fn pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(SMILES_ATOM_PATTERN).expect("Invalid SMILES pattern"))
}

/// Split a SMILES string into atom-level tokens.
///
/// Returns `None` when some character is not covered by any token, e.g. a
/// lowercase `l` or an explicit `H` outside brackets.
pub fn tokenize(smiles: &str) -> Option<Vec<&str>> {
    let mut tokens = Vec::new();
    let mut end = 0;
    for m in pattern().find_iter(smiles) {
        let m = m.ok()?;
        if m.start() != end {
            return None;
        }
        end = m.end();
        tokens.push(m.as_str());
    }
    if end != smiles.len() {
        return None;
    }
    Some(tokens)
}

/// Granularity of the allow-list check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenCheck {
    /// Every single character must be in the list. Bracket atoms and
    /// two-letter elements never pass.
    #[default]
    Character,
    /// Every atom-level token from [`tokenize`] must be in the list
    Token,
}

/// Set of tokens a downstream model can encode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedTokens {
    tokens: HashSet<String>,
    check: TokenCheck,
}

impl AllowedTokens {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
            check: TokenCheck::default(),
        }
    }

    pub fn with_check(mut self, check: TokenCheck) -> Self {
        self.check = check;
        self
    }

    pub fn check(&self) -> TokenCheck {
        self.check
    }

    pub fn reinvent_prior() -> Self {
        Self::new(REINVENT_PRIOR_TOKENS.iter().copied())
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// True when every character (or every token, see [`TokenCheck`]) is allowed
    pub fn permits(&self, smiles: &str) -> bool {
        if smiles.is_empty() {
            return false;
        }
        match self.check {
            TokenCheck::Character => {
                let mut buf = [0u8; 4];
                smiles
                    .chars()
                    .all(|c| self.contains(c.encode_utf8(&mut buf)))
            }
            TokenCheck::Token => match tokenize(smiles) {
                Some(tokens) => tokens.iter().all(|t| self.contains(t)),
                None => false,
            },
        }
    }
}

fn is_atom(token: &str) -> bool {
    token.starts_with('[') || token.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
}

fn is_ring_label(token: &str) -> bool {
    token.starts_with('%') || token.chars().all(|c| c.is_ascii_digit())
}

/// Drop stereo markers from a bracket atom. A tetrahedral carbon with at most
/// one explicit hydrogen and no charge is valid as a plain organic-subset `C`.
fn strip_bracket_stereo(token: &str) -> String {
    if !token.contains('@') {
        return token.to_string();
    }
    let inner: String = token[1..token.len() - 1]
        .chars()
        .filter(|c| *c != '@')
        .collect();
    match inner.as_str() {
        "C" | "CH" => "C".to_string(),
        _ => format!("[{inner}]"),
    }
}

/// Structural sanity check: balanced branches, closed rings, starts with an atom.
fn is_well_formed(tokens: &[String]) -> bool {
    let Some(first) = tokens.first() else {
        return false;
    };
    if !is_atom(first) {
        return false;
    }

    let mut depth: i32 = 0;
    let mut open_rings: HashSet<&str> = HashSet::new();
    for token in tokens {
        match token.as_str() {
            "(" => depth += 1,
            ")" => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            t if is_ring_label(t) => {
                if !open_rings.remove(t) {
                    open_rings.insert(t);
                }
            }
            _ => {}
        }
    }
    depth == 0 && open_rings.is_empty()
}

/// String-level standardization used when no chemistry toolkit is available.
///
/// Removes stereochemistry (non-isomeric output), keeps the largest
/// disconnected fragment and rejects malformed strings. Returns `None` on failure.
pub fn normalize_lexical(smiles: &str) -> Option<String> {
    let trimmed = smiles.trim();
    if trimmed.is_empty() || trimmed.contains(char::is_whitespace) {
        return None;
    }

    let tokens = tokenize(trimmed)?;
    let fragment = tokens
        .split(|t| *t == ".")
        .max_by_key(|frag| frag.iter().filter(|t| is_atom(t)).count())?;

    let cleaned: Vec<String> = fragment
        .iter()
        .filter(|t| **t != "/" && **t != "\\")
        .map(|t| {
            if t.starts_with('[') {
                strip_bracket_stereo(t)
            } else {
                (*t).to_string()
            }
        })
        .collect();

    if !is_well_formed(&cleaned) {
        return None;
    }
    Some(cleaned.concat())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_multi_char_tokens() {
        let tokens = tokenize("ClC(=O)c1cc[nH]c1Br").unwrap();
        assert_eq!(
            tokens,
            vec!["Cl", "C", "(", "=", "O", ")", "c", "1", "c", "c", "[nH]", "c", "1", "Br"]
        );
    }

    #[test]
    fn test_tokenize_two_digit_ring() {
        assert_eq!(tokenize("C%10CC%10").unwrap(), vec!["C", "%10", "C", "C", "%10"]);
    }

    #[test]
    fn test_tokenize_rejects_uncovered_characters() {
        assert!(tokenize("CCl l").is_none());
        assert!(tokenize("CHC").is_none());
        assert_eq!(tokenize("").unwrap(), Vec::<&str>::new());
    }

    #[test]
    fn test_allow_list_has_prior_vocabulary() {
        let allowed = AllowedTokens::reinvent_prior();
        assert_eq!(allowed.len(), REINVENT_PRIOR_TOKENS.len());
        assert!(allowed.contains("[nH]"));
        assert!(!allowed.contains("[C@@H]"));
    }

    #[test]
    fn test_character_check_is_the_default() {
        let allowed = AllowedTokens::reinvent_prior();
        assert_eq!(allowed.check(), TokenCheck::Character);
        assert!(allowed.permits("CC(=O)Nc1ccc(O)cc1"));
        assert!(allowed.permits("N#Cc1ccsc1"));
        // multi-character tokens fall apart into disallowed characters
        for smiles in ["Clc1ccc(Cl)cc1", "c1ccc2[nH]ccc2c1", "BrCCBr", "C%10CCCCCCCCC%10"] {
            assert!(!allowed.permits(smiles), "{smiles} should be rejected");
        }
        assert!(!allowed.permits("CCI"));
        assert!(!allowed.permits(""));
    }

    #[test]
    fn test_token_check_accepts_multi_char_tokens() {
        let allowed = AllowedTokens::reinvent_prior().with_check(TokenCheck::Token);
        for smiles in ["Clc1ccc(Cl)cc1", "c1ccc2[nH]ccc2c1", "BrCCBr", "C%10CCCCCCCCC%10"] {
            assert!(allowed.permits(smiles), "{smiles} should be kept");
        }
        assert!(allowed.permits("C[N+](C)(C)CC[O-]"));
        // iodine and stereo atoms are outside the prior vocabulary
        assert!(!allowed.permits("CCI"));
        assert!(!allowed.permits("C[C@@H](O)C"));
        assert!(!allowed.permits("C/C=C/C"));
        assert!(!allowed.permits(""));
    }

    #[test]
    fn test_normalize_strips_stereo() {
        assert_eq!(normalize_lexical("C[C@@H](O)CC").as_deref(), Some("CC(O)CC"));
        assert_eq!(normalize_lexical("F/C=C/F").as_deref(), Some("FC=CF"));
        assert_eq!(
            normalize_lexical("[N@@H+](C)(C)C").as_deref(),
            Some("[NH+](C)(C)C")
        );
    }

    #[test]
    fn test_normalize_keeps_largest_fragment() {
        assert_eq!(normalize_lexical("CCOCC.Cl").as_deref(), Some("CCOCC"));
        assert_eq!(normalize_lexical(" c1ccccc1 ").as_deref(), Some("c1ccccc1"));
    }

    #[test]
    fn test_normalize_rejects_malformed() {
        assert_eq!(normalize_lexical(""), None);
        assert_eq!(normalize_lexical("CC(C"), None);
        assert_eq!(normalize_lexical("CC)C"), None);
        assert_eq!(normalize_lexical("C1CC"), None);
        assert_eq!(normalize_lexical("(C)C"), None);
        assert_eq!(normalize_lexical("CCO ethanol"), None);
    }
}
