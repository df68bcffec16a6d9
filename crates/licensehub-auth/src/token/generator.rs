//! Token generation and prefix dispatch.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use licensehub_core::traits::RandomSource;

/// Random bytes per token.
const TOKEN_BYTES: usize = 32;

/// Which credential family a token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Short-lived login session.
    Session,
    /// Long-lived scoped API token.
    Api,
}

impl TokenKind {
    /// The prefix every token of this kind starts with.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Session => "st_",
            Self::Api => "lt_",
        }
    }

    /// Dispatch on the token prefix.
    pub fn of(token: &str) -> Option<Self> {
        [Self::Session, Self::Api]
            .into_iter()
            .find(|kind| token.starts_with(kind.prefix()))
    }
}

/// Generate a fresh token of the given kind.
pub fn generate_token(random: &dyn RandomSource, kind: TokenKind) -> String {
    let bytes = random.bytes(TOKEN_BYTES);
    format!("{}{}", kind.prefix(), URL_SAFE_NO_PAD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use licensehub_core::traits::OsRandom;

    #[test]
    fn test_generated_tokens_carry_prefix() {
        let session = generate_token(&OsRandom, TokenKind::Session);
        let api = generate_token(&OsRandom, TokenKind::Api);
        assert!(session.starts_with("st_"));
        assert!(api.starts_with("lt_"));
        assert_eq!(session.len(), 3 + 43);
        assert_eq!(TokenKind::of(&session), Some(TokenKind::Session));
        assert_eq!(TokenKind::of(&api), Some(TokenKind::Api));
    }

    #[test]
    fn test_unknown_prefix() {
        assert_eq!(TokenKind::of("xx_abcdef"), None);
        assert_eq!(TokenKind::of(""), None);
    }
}
