use crate::lexer::tokenize;
use crate::{Code, ErrorKind, TokenKind};

fn kinds(source: &str) -> Vec<TokenKind> {
    tokenize(&Code::from(source))
        .unwrap()
        .iter()
        .map(|token| token.kind)
        .collect()
}

#[test]
fn keywords_win_over_identifiers() {
    assert_eq!(
        kinds("class classes Classy"),
        vec![TokenKind::Class, TokenKind::Identifier, TokenKind::Identifier]
    );
    assert_eq!(kinds("if elif else end"), vec![
        TokenKind::If,
        TokenKind::Elif,
        TokenKind::Else,
        TokenKind::End
    ]);
}

#[test]
fn longest_operator_wins() {
    assert_eq!(
        kinds("a<=b//c"),
        vec![
            TokenKind::Identifier,
            TokenKind::Le,
            TokenKind::Identifier,
            TokenKind::FloorDiv,
            TokenKind::Identifier
        ]
    );
    assert_eq!(kinds("= == ->-"), vec![
        TokenKind::Assign,
        TokenKind::Eq,
        TokenKind::Returns,
        TokenKind::Sub
    ]);
}

#[test]
fn byte_ranges_are_half_open() {
    let tokens = tokenize(&Code::from("ab cd")).unwrap();
    assert_eq!((tokens[0].start, tokens[0].end), (0, 2));
    assert_eq!((tokens[1].start, tokens[1].end), (3, 5));
}

#[test]
fn span_concatenation_reconstructs_source() {
    let source = "x = 1 # note\ny\n";
    let tokens = tokenize(&Code::from(source)).unwrap();

    let rebuilt: String = tokens
        .iter()
        .filter(|token| {
            // Drop the newline tokens generated by comments.
            !(token.kind == TokenKind::Newline
                && token.data.as_deref().map_or(false, |d| d.starts_with('#')))
        })
        .map(|token| &source[token.start..token.end])
        .collect();
    assert_eq!(rebuilt, "x=1y\n");
}

#[test]
fn integer_underscore_rules() {
    let tokens = tokenize(&Code::from("1_000_000")).unwrap();
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].kind, TokenKind::Integer);
    assert_eq!(tokens[0].data.as_deref(), Some("1_000_000"));

    let error = tokenize(&Code::from("1_")).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::UnexpectedCharacter);
    let error = tokenize(&Code::from("1_ 2")).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::UnexpectedCharacter);
}

#[test]
fn leading_underscore_is_an_identifier() {
    let tokens = tokenize(&Code::from("_1")).unwrap();
    assert_eq!(tokens[0].kind, TokenKind::Identifier);
    assert_eq!(tokens[0].data.as_deref(), Some("_1"));
}

#[test]
fn format_strings_strip_quotes_only() {
    let tokens = tokenize(&Code::from(r#""a\nb""#)).unwrap();
    assert_eq!(tokens[0].kind, TokenKind::FormatString);
    // Escape decoding is the parser's job; the lexer keeps the raw text.
    assert_eq!(tokens[0].data.as_deref(), Some(r"a\nb"));
    assert_eq!((tokens[0].start, tokens[0].end), (0, 6));
}

#[test]
fn raw_strings_are_verbatim() {
    let tokens = tokenize(&Code::from("`a\\nb`")).unwrap();
    assert_eq!(tokens[0].kind, TokenKind::String);
    assert_eq!(tokens[0].data.as_deref(), Some("a\\nb"));
}

#[test]
fn escaped_quote_stays_inside_the_string() {
    let tokens = tokenize(&Code::from(r#""say \"hi\"""#)).unwrap();
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].kind, TokenKind::FormatString);
}

#[test]
fn comments_lex_as_newlines() {
    let tokens = tokenize(&Code::from("a # rest of line\nb")).unwrap();
    let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![TokenKind::Identifier, TokenKind::Newline, TokenKind::Identifier]
    );
    // The comment newline spans from the hash through the line feed.
    assert_eq!((tokens[1].start, tokens[1].end), (2, 17));
}

#[test]
fn comment_at_end_of_input_still_terminates() {
    let tokens = tokenize(&Code::from("a # trailing")).unwrap();
    let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
    assert_eq!(kinds, vec![TokenKind::Identifier, TokenKind::Newline]);
}

#[test]
fn unexpected_character_fails() {
    let error = tokenize(&Code::from("a @ b")).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::UnexpectedCharacter);
}

#[test]
fn unterminated_string_fails() {
    let error = tokenize(&Code::from("`never closed")).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::UnexpectedCharacter);
}

#[test]
fn empty_and_blank_input_produce_nothing() {
    assert_eq!(kinds(""), Vec::<TokenKind>::new());
    assert_eq!(kinds("   \t  "), Vec::<TokenKind>::new());
}

#[test]
fn tokens_position_and_annotate_against_the_source() {
    let code = Code::from("a = 1\nbb = 22\n");
    let tokens = tokenize(&code).unwrap();

    // The `22` literal sits on line 2, column 6.
    let literal = &tokens[6];
    assert_eq!(literal.kind, TokenKind::Integer);
    let position = code.position_of(literal);
    assert_eq!((position.line, position.column), (2, 6));
    assert_eq!(code.annotate(literal), "bb = 22\n     ^^");

    // A newline token marks the spot just past its line.
    let newline = &tokens[3];
    assert_eq!(newline.kind, TokenKind::Newline);
    assert_eq!(code.annotate(newline), "a = 1\n     ^");
}
