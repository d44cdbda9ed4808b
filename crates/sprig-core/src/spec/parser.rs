//! Recursive-descent parser for spec strings.
//!
//! ```text
//! specs   := ( ID node | '^' ID node )*
//! node    := ( '@' list | '+' ID | ('-' | '~') ID | '%' ID ['@' list] | '=' ID )*
//! list    := range ( ',' range )*
//! range   := ID | ID? ':' ID?
//! ```
//!
//! A `^` dependency attaches to the most recent top-level spec, so
//! `mvapich ^foo ^bar` yields one spec with two direct dependencies.

use sprig_util::errors::{SprigError, SprigResult};

use super::lexer::{lex, Token, TokenKind};
use super::{Architecture, CompilerSpec, Spec};
use crate::version::{Version, VersionList, VersionRange};

/// Parse spec text into its top-level specs, in order of appearance.
pub fn parse(input: &str) -> SprigResult<Vec<Spec>> {
    let tokens = lex(input)?;
    Parser::new(input, tokens).specs()
}

/// Parse a `when` clause for `package`.
///
/// The package name may be omitted (`@2.1.0:`, `+debug`, `%gcc`,
/// `^mpich`); it is filled in. A clause naming another package is rejected.
pub fn parse_anonymous(input: &str, package: &str) -> SprigResult<Spec> {
    let spec = match Spec::parse(input) {
        Ok(spec) => spec,
        Err(SprigError::Parse { .. }) => Spec::parse(&format!("{package}{input}"))?,
        Err(e) => return Err(e),
    };
    if spec.name() != package {
        return Err(SprigError::InvalidWhen {
            package: package.to_string(),
            spec: input.to_string(),
        });
    }
    Ok(spec)
}

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str, tokens: Vec<Token>) -> Self {
        Self {
            input,
            tokens,
            pos: 0,
        }
    }

    fn peek(&self) -> &Token {
        // `lex` always ends the stream with Eof and `advance` never moves past it.
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn accept(&mut self, kind: TokenKind) -> Option<Token> {
        (self.peek().kind == kind).then(|| self.advance())
    }

    fn expect(&mut self, kind: TokenKind) -> SprigResult<Token> {
        match self.accept(kind) {
            Some(token) => Ok(token),
            None => {
                let found = self.peek();
                Err(self.error_at(found, format!("Expected {kind}, found {}", found.kind)))
            }
        }
    }

    fn error_at(&self, token: &Token, message: impl Into<String>) -> SprigError {
        SprigError::Parse {
            message: message.into(),
            input: self.input.to_string(),
            span: token.span.clone().into(),
        }
    }

    fn specs(mut self) -> SprigResult<Vec<Spec>> {
        let mut specs: Vec<Spec> = Vec::new();
        loop {
            let token = self.advance();
            match token.kind {
                TokenKind::Eof => break,
                TokenKind::Id => specs.push(self.node(token)?),
                TokenKind::Caret => {
                    if specs.is_empty() {
                        return Err(self.error_at(&token, "Dependency has no package"));
                    }
                    let name = self.expect(TokenKind::Id)?;
                    let dependency = self.node(name)?;
                    if let Some(root) = specs.last_mut() {
                        root.add_dependency(dependency)?;
                    }
                }
                kind => {
                    return Err(self.error_at(&token, format!("Unexpected token {kind}")));
                }
            }
        }
        tracing::trace!("parsed {} spec(s) from {:?}", specs.len(), self.input);
        Ok(specs)
    }

    fn node(&mut self, name: Token) -> SprigResult<Spec> {
        let mut spec = Spec::new(name.text);
        let mut ranges = Vec::new();

        loop {
            match self.peek().kind {
                TokenKind::At => {
                    self.advance();
                    ranges.extend(self.version_list()?);
                }
                TokenKind::On => {
                    self.advance();
                    let variant = self.expect(TokenKind::Id)?;
                    spec.add_variant(variant.text, true)?;
                }
                TokenKind::Off => {
                    self.advance();
                    let variant = self.expect(TokenKind::Id)?;
                    spec.add_variant(variant.text, false)?;
                }
                TokenKind::Percent => {
                    self.advance();
                    let compiler = self.compiler()?;
                    spec.set_compiler(compiler)?;
                }
                TokenKind::Eq => {
                    self.advance();
                    let arch = self.expect(TokenKind::Id)?;
                    spec.set_architecture(Architecture::new(arch.text))?;
                }
                _ => break,
            }
        }

        if !ranges.is_empty() {
            spec.set_versions(VersionList::from_ranges(ranges))?;
        }
        Ok(spec)
    }

    fn compiler(&mut self) -> SprigResult<CompilerSpec> {
        let name = self.expect(TokenKind::Id)?;
        let mut compiler = CompilerSpec::new(name.text);
        if self.accept(TokenKind::At).is_some() {
            compiler.set_versions(VersionList::from_ranges(self.version_list()?))?;
        }
        Ok(compiler)
    }

    fn version_list(&mut self) -> SprigResult<Vec<VersionRange>> {
        let mut ranges = vec![self.version_range()?];
        while self.accept(TokenKind::Comma).is_some() {
            ranges.push(self.version_range()?);
        }
        Ok(ranges)
    }

    fn version_range(&mut self) -> SprigResult<VersionRange> {
        let start = self.accept(TokenKind::Id);

        let Some(colon) = self.accept(TokenKind::Colon) else {
            return match start {
                Some(token) => Ok(VersionRange::exact(self.version(&token)?)),
                None => Err(self.error_at(self.peek(), "Invalid version specifier")),
            };
        };

        let end = self.accept(TokenKind::Id);
        let low = start.as_ref().map(|t| self.version(t)).transpose()?;
        let high = end.as_ref().map(|t| self.version(t)).transpose()?;
        VersionRange::new(low, high).map_err(|e| {
            let anchor = end.as_ref().unwrap_or(&colon);
            self.error_at(anchor, e.to_string())
        })
    }

    fn version(&self, token: &Token) -> SprigResult<Version> {
        Version::parse(&token.text).map_err(|e| self.error_at(token, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependencies_attach_to_last_root() {
        let specs = parse("mvapich ^foo openmpi ^bar ^baz").unwrap();
        assert_eq!(specs.len(), 2);
        assert!(specs[0].dependency("foo").is_some());
        assert_eq!(specs[1].dependencies().len(), 2);
    }

    #[test]
    fn leading_caret_has_no_package() {
        let err = parse("^foo").unwrap_err();
        assert!(err.to_string().contains("Dependency has no package"));
    }

    #[test]
    fn open_range_is_unconstrained() {
        let spec = Spec::parse("x@:").unwrap();
        assert!(spec.versions().is_any());
    }

    #[test]
    fn inverted_range_rejected() {
        assert!(matches!(
            parse("x@2:1"),
            Err(SprigError::Parse { .. })
        ));
    }

    #[test]
    fn anonymous_fills_in_package() {
        let spec = parse_anonymous("@2.1.0:", "stat").unwrap();
        assert_eq!(spec.to_string(), "stat@2.1.0:");
        let spec = parse_anonymous("^mpich", "stat").unwrap();
        assert!(spec.dependency("mpich").is_some());
        let spec = parse_anonymous("stat+debug", "stat").unwrap();
        assert_eq!(spec.to_string(), "stat+debug");
    }

    #[test]
    fn anonymous_rejects_other_package() {
        assert!(matches!(
            parse_anonymous("mpich@1", "stat"),
            Err(SprigError::InvalidWhen { .. })
        ));
    }
}
